//! GET/HEAD (SPEC_FULL.md §4.5). Grounded on the original `doGET`/`doHEAD`:
//! a plain byte stream for files, the configured index renderer for
//! collections, 404 if the resource doesn't exist. `list` and `read` are
//! independent permissions gating the collection and non-collection
//! branches respectively, checked only once the resource kind is known.

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::request::DavRequest;
use crate::util::systemtime_to_httpdate;

use super::DavEngine;

pub async fn handle_get(
    engine: &DavEngine,
    req: &DavRequest,
    with_body: bool,
) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    if !resource.exists().await.map_err(DavError::from)? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }

    let is_collection = resource.is_collection().await.map_err(DavError::from)?;
    let acl = engine.acl().access(None, &resource.abs_path());
    if is_collection {
        if !acl.list {
            return Err(DavError::Forbidden);
        }
    } else if !acl.read {
        return Err(DavError::Forbidden);
    }

    let mtime = resource.mtime().await.map_err(DavError::from)?;
    let last_modified = systemtime_to_httpdate(
        std::time::UNIX_EPOCH + std::time::Duration::from_secs(mtime.max(0) as u64),
    );

    if is_collection {
        let html = engine.index().render(resource.as_ref()).await;
        let body = if with_body { Body::from(html) } else { Body::empty() };
        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(http::header::LAST_MODIFIED, last_modified);
        if !req.path.is_collection() {
            // Requested without a trailing slash but resolves to a
            // collection: point the client at the canonical URL.
            let canonical_url = format!("{}/", req.url_for(&req.path));
            builder = builder.header(http::header::CONTENT_LOCATION, canonical_url);
        }
        return Ok(builder
            .body(body)
            .expect("static headers are always valid"));
    }

    let etag = resource.etag().await.map_err(DavError::from)?;
    let size = resource.size().await.map_err(DavError::from)?;
    let mime = mime_guess::from_path(resource.path().as_str())
        .first_or_octet_stream()
        .to_string();

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(http::header::CONTENT_TYPE, mime)
        .header(http::header::CONTENT_LENGTH, size)
        .header(http::header::ETAG, format!("\"{etag}\""))
        .header(http::header::LAST_MODIFIED, last_modified);

    let body = if with_body {
        let reader = resource.open_read().await.map_err(DavError::from)?;
        let buf_size = engine.read_buf_size();
        Body::stream(async_stream::stream! {
            let mut reader = reader;
            let mut buf = vec![0u8; buf_size];
            loop {
                match tokio::io::AsyncReadExt::read(&mut reader, &mut buf).await {
                    Ok(0) => break,
                    Ok(n) => yield Ok(bytes::Bytes::copy_from_slice(&buf[..n])),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        })
    } else {
        Body::empty()
    };

    Ok(builder
        .body(body)
        .map_err(|_| DavError::Status(StatusCode::INTERNAL_SERVER_ERROR))?)
}
