//! The method engine: builds a [`DavEngine`] from a [`Backend`] plus the
//! collaborators named in SPEC_FULL.md §2 (ACL, property, lock, index
//! providers), and dispatches each request to the matching handler.
//!
//! Mirrors the teacher's `DavBuilder`/`DavHandler` split: a builder with
//! sensible defaults, producing a cheap-to-`Clone` (`Arc`-backed)
//! handler that owns no per-request state.

mod handle_copymove;
mod handle_get;
mod handle_lock;
mod handle_mkcol;
mod handle_options;
mod handle_propfind;
mod handle_proppatch;
mod handle_put_delete;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use bytes::{Buf, Bytes};
use http::{Request, Response};
use http_body::Body as HttpBody;
use log::debug;

use crate::acl::{AclProvider, ReadOnlyAcl};
use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::index::{DefaultIndex, DirectoryIndexRenderer};
use crate::lock::{LockManager, NullLockManager};
use crate::props::{LiveProperties, PropertyProvider};
use crate::request::DavRequest;
use crate::resource::Backend;
use crate::util::{dav_method, dav_xml_error, DavMethod};

/// Chunk size for streaming GET response bodies. Not named in the
/// pruned pack (the teacher's own default lived in a module the
/// retrieval didn't keep); 64 KiB is a conventional choice for the same
/// job.
const DEFAULT_READ_BUF_SIZE: usize = 64 * 1024;

struct Inner {
    backend: Arc<dyn Backend>,
    acl: Arc<dyn AclProvider>,
    props: Arc<dyn PropertyProvider>,
    locks: Arc<dyn LockManager>,
    index: Arc<dyn DirectoryIndexRenderer>,
    prefix: String,
    allowed_methods: DavMethod,
    principal: Option<String>,
    read_buf_size: usize,
}

/// Builds a [`DavEngine`]. The only required input is a [`Backend`];
/// everything else defaults the same way the original server did:
/// read-only ACL, live properties only, a no-op lock manager, and a
/// bare-bones directory index.
pub struct EngineBuilder {
    backend: Arc<dyn Backend>,
    acl: Arc<dyn AclProvider>,
    props: Arc<dyn PropertyProvider>,
    locks: Arc<dyn LockManager>,
    index: Arc<dyn DirectoryIndexRenderer>,
    prefix: String,
    allowed_methods: DavMethod,
    principal: Option<String>,
    read_buf_size: usize,
}

impl EngineBuilder {
    pub fn new(backend: impl Backend + 'static) -> EngineBuilder {
        EngineBuilder {
            backend: Arc::new(backend),
            acl: Arc::new(ReadOnlyAcl),
            props: Arc::new(LiveProperties),
            locks: Arc::new(NullLockManager),
            index: Arc::new(DefaultIndex),
            prefix: String::new(),
            allowed_methods: DavMethod::all(),
            principal: None,
            read_buf_size: DEFAULT_READ_BUF_SIZE,
        }
    }

    pub fn acl(mut self, acl: impl AclProvider + 'static) -> EngineBuilder {
        self.acl = Arc::new(acl);
        self
    }

    pub fn properties(mut self, props: impl PropertyProvider + 'static) -> EngineBuilder {
        self.props = Arc::new(props);
        self
    }

    pub fn locks(mut self, locks: impl LockManager + 'static) -> EngineBuilder {
        self.locks = Arc::new(locks);
        self
    }

    pub fn index(mut self, index: impl DirectoryIndexRenderer + 'static) -> EngineBuilder {
        self.index = Arc::new(index);
        self
    }

    /// The path prefix this engine is routed under, stripped from every
    /// incoming request path before resolution (e.g. `/dav`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> EngineBuilder {
        self.prefix = prefix.into();
        self
    }

    /// Restrict which methods this engine answers; anything else gets
    /// 405 before dispatch. Defaults to every method this engine knows.
    pub fn methods(mut self, allow: DavMethod) -> EngineBuilder {
        self.allowed_methods = allow;
        self
    }

    /// The webdav principal: the owner attributed to any lock this
    /// engine's `LockManager` grants, absent a per-request principal
    /// (authentication is out of scope here, so there never is one).
    pub fn principal(mut self, principal: impl Into<String>) -> EngineBuilder {
        self.principal = Some(principal.into());
        self
    }

    /// Chunk size used when streaming a GET response body.
    pub fn read_buf_size(mut self, size: usize) -> EngineBuilder {
        self.read_buf_size = size;
        self
    }

    pub fn build(self) -> DavEngine {
        DavEngine {
            inner: Arc::new(Inner {
                backend: self.backend,
                acl: self.acl,
                props: self.props,
                locks: self.locks,
                index: self.index,
                prefix: self.prefix,
                allowed_methods: self.allowed_methods,
                principal: self.principal,
                read_buf_size: self.read_buf_size,
            }),
        }
    }
}

/// Dispatches HTTP requests to WebDAV method handlers. Cloning is cheap:
/// all shared state lives behind an `Arc`.
#[derive(Clone)]
pub struct DavEngine {
    inner: Arc<Inner>,
}

impl DavEngine {
    /// Handles a request whose body has already been collected into a
    /// contiguous buffer. Use this when the embedder owns the transport
    /// and has no streaming requirement (e.g. tests, small request
    /// bodies).
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Body> {
        let base_url = base_url_from_headers(&req);
        let (parts, body) = req.into_parts();
        match self.handle_inner(parts, body, &base_url).await {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        }
    }

    /// Handles a request whose body arrives as an [`http_body::Body`]
    /// stream, collecting it before dispatch. PUT is the only handler
    /// that needs the raw bytes; a future streaming PUT path would read
    /// directly from `ReqBody` instead of buffering here.
    pub async fn handle_stream<ReqBody, ReqData, ReqError>(
        &self,
        req: Request<ReqBody>,
    ) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Unpin,
        ReqData: Buf,
    {
        let base_url = base_url_from_headers(&req);
        let (parts, mut body) = req.into_parts();
        let mut collected = Vec::new();
        loop {
            match futures_util::future::poll_fn(|cx| std::pin::Pin::new(&mut body).poll_data(cx))
                .await
            {
                Some(Ok(mut data)) => {
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        let n = chunk.len();
                        collected.extend_from_slice(chunk);
                        data.advance(n);
                    }
                }
                Some(Err(_)) => {
                    return error_response(DavError::BadRequest("failed to read request body"))
                }
                None => break,
            }
        }
        match self
            .handle_inner(parts, Bytes::from(collected), &base_url)
            .await
        {
            Ok(resp) => resp,
            Err(e) => error_response(e),
        }
    }

    async fn handle_inner(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        base_url: &str,
    ) -> DavResult<Response<Body>> {
        let method = dav_method(&parts.method)?;
        if !self.inner.allowed_methods.contains(method) {
            return Err(DavError::Status(http::StatusCode::METHOD_NOT_ALLOWED));
        }
        let dav_req = DavRequest::new(
            parts.method.clone(),
            parts.headers.clone(),
            parts.uri.path(),
            &self.inner.prefix,
            base_url,
        )?;

        debug!("== START REQUEST {} {}", parts.method, dav_req.path);

        let resp = match method {
            DavMethod::GET => handle_get::handle_get(self, &dav_req, true).await,
            DavMethod::HEAD => handle_get::handle_get(self, &dav_req, false).await,
            DavMethod::POST => Err(DavError::Status(http::StatusCode::METHOD_NOT_ALLOWED)),
            DavMethod::PUT => handle_put_delete::handle_put(self, &dav_req, body).await,
            DavMethod::DELETE => handle_put_delete::handle_delete(self, &dav_req).await,
            DavMethod::MKCOL => handle_mkcol::handle_mkcol(self, &dav_req, body).await,
            DavMethod::COPY => handle_copymove::handle_copy_or_move(self, &dav_req, false).await,
            DavMethod::MOVE => handle_copymove::handle_copy_or_move(self, &dav_req, true).await,
            DavMethod::OPTIONS => handle_options::handle_options(self, &dav_req).await,
            DavMethod::PROPFIND => handle_propfind::handle_propfind(self, &dav_req, body).await,
            DavMethod::PROPPATCH => handle_proppatch::handle_proppatch(self, &dav_req).await,
            DavMethod::LOCK => handle_lock::handle_lock(self, &dav_req).await,
            DavMethod::UNLOCK => handle_lock::handle_unlock(self, &dav_req).await,
            _ => Err(DavError::NotImplemented),
        };

        debug!("== END REQUEST");
        resp
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    pub(crate) fn acl(&self) -> &dyn AclProvider {
        self.inner.acl.as_ref()
    }

    pub(crate) fn props(&self) -> &dyn PropertyProvider {
        self.inner.props.as_ref()
    }

    pub(crate) fn locks(&self) -> &dyn LockManager {
        self.inner.locks.as_ref()
    }

    pub(crate) fn index(&self) -> &dyn DirectoryIndexRenderer {
        self.inner.index.as_ref()
    }

    pub(crate) fn allowed_methods(&self) -> DavMethod {
        self.inner.allowed_methods
    }

    pub(crate) fn principal(&self) -> Option<&str> {
        self.inner.principal.as_deref()
    }

    pub(crate) fn read_buf_size(&self) -> usize {
        self.inner.read_buf_size
    }
}

fn base_url_from_headers<B>(req: &Request<B>) -> String {
    let scheme = req.uri().scheme_str().unwrap_or("http");
    let host = req
        .headers()
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

fn error_response(e: DavError) -> Response<Body> {
    let status = e.status_code();
    let body = if status.is_client_error() || status.is_server_error() {
        dav_xml_error(&format!("<D:message>{e}</D:message>"))
    } else {
        Body::empty()
    };
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/xml; charset=utf-8")
        .body(body)
        .expect("status and headers are always valid")
}
