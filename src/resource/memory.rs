//! An in-memory backend: no filesystem dependency, used by this crate's
//! own tests and available to embedders who want a throwaway or
//! synthetic tree (SPEC_FULL.md §2, §9).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;

use crate::errors::FsError;
use crate::path::DavPath;

use super::{Backend, DavResource, FsFuture, FsResult, ReadStream, ResourceStream, WriteStream};

#[derive(Clone)]
enum Node {
    Collection { ctime: i64, mtime: i64 },
    File { ctime: i64, mtime: i64, data: Vec<u8> },
}

/// A tree of nodes keyed by canonical path string, guarded by a single
/// mutex. Adequate for tests and small embedded deployments; not meant
/// to scale to large trees or high concurrency. Cheap to `Clone`: every
/// field is `Arc`-backed, so clones share the same underlying tree.
#[derive(Clone)]
pub struct MemoryBackend {
    nodes: Arc<Mutex<HashMap<String, Node>>>,
    clock: Arc<dyn Fn() -> i64 + Send + Sync>,
}

impl MemoryBackend {
    /// `clock` supplies the `i64` unix timestamp stamped on nodes as
    /// they're created or written; callers own time, since this crate
    /// does not read the system clock itself in tests.
    pub fn new(clock: impl Fn() -> i64 + Send + Sync + 'static) -> MemoryBackend {
        let mut nodes = HashMap::new();
        nodes.insert(
            "/".to_string(),
            Node::Collection {
                ctime: 0,
                mtime: 0,
            },
        );
        MemoryBackend {
            nodes: Arc::new(Mutex::new(nodes)),
            clock: Arc::new(clock),
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }
}

impl Backend for MemoryBackend {
    fn resolve(&self, path: DavPath) -> Box<dyn DavResource> {
        Box::new(MemoryResource {
            nodes: self.nodes.clone(),
            clock: self.clock.clone(),
            path,
        })
    }
}

pub(crate) struct MemoryResource {
    nodes: Arc<Mutex<HashMap<String, Node>>>,
    clock: Arc<dyn Fn() -> i64 + Send + Sync>,
    path: DavPath,
}

impl MemoryResource {
    fn key(&self) -> String {
        self.path.as_str().to_string()
    }

    fn with_path(&self, path: DavPath) -> MemoryResource {
        MemoryResource {
            nodes: self.nodes.clone(),
            clock: self.clock.clone(),
            path,
        }
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }
}

impl DavResource for MemoryResource {
    fn path(&self) -> &DavPath {
        &self.path
    }

    fn abs_path(&self) -> String {
        self.path.as_str().to_string()
    }

    fn clone_box(&self) -> Box<dyn DavResource> {
        Box::new(self.with_path(self.path.clone()))
    }

    fn child(&self, name: &str) -> Box<dyn DavResource> {
        Box::new(self.with_path(self.path.join_segment(name)))
    }

    fn parent(&self) -> Box<dyn DavResource> {
        Box::new(self.with_path(self.path.parent()))
    }

    fn exists(&self) -> FsFuture<'_, bool> {
        async move { Ok(self.nodes.lock().unwrap().contains_key(&self.key())) }.boxed()
    }

    fn is_collection(&self) -> FsFuture<'_, bool> {
        async move {
            match self.nodes.lock().unwrap().get(&self.key()) {
                Some(Node::Collection { .. }) => Ok(true),
                Some(Node::File { .. }) => Ok(false),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn size(&self) -> FsFuture<'_, u64> {
        async move {
            match self.nodes.lock().unwrap().get(&self.key()) {
                Some(Node::File { data, .. }) => Ok(data.len() as u64),
                Some(Node::Collection { .. }) => Err(FsError::GeneralFailure),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn ctime(&self) -> FsFuture<'_, i64> {
        async move {
            match self.nodes.lock().unwrap().get(&self.key()) {
                Some(Node::Collection { ctime, .. }) | Some(Node::File { ctime, .. }) => Ok(*ctime),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn mtime(&self) -> FsFuture<'_, i64> {
        async move {
            match self.nodes.lock().unwrap().get(&self.key()) {
                Some(Node::Collection { mtime, .. }) | Some(Node::File { mtime, .. }) => Ok(*mtime),
                None => Err(FsError::NotFound),
            }
        }
        .boxed()
    }

    fn children(&self) -> FsFuture<'_, ResourceStream> {
        async move {
            let prefix = self.key();
            let prefix_with_slash = if prefix == "/" {
                "/".to_string()
            } else {
                format!("{prefix}/")
            };
            let nodes = self.nodes.lock().unwrap();
            if !matches!(nodes.get(&prefix), Some(Node::Collection { .. })) {
                return Err(FsError::NotFound);
            }
            let mut names: Vec<String> = Vec::new();
            for key in nodes.keys() {
                if let Some(rest) = key.strip_prefix(&prefix_with_slash) {
                    if !rest.is_empty() && !rest.contains('/') {
                        names.push(rest.to_string());
                    }
                }
            }
            drop(nodes);
            names.sort();
            let items: Vec<FsResult<Box<dyn DavResource>>> = names
                .into_iter()
                .map(|name| Ok(Box::new(self.with_path(self.path.join_segment(&name))) as Box<dyn DavResource>))
                .collect();
            Ok(Box::pin(futures_util::stream::iter(items)) as ResourceStream)
        }
        .boxed()
    }

    fn open_read(&self) -> FsFuture<'_, ReadStream> {
        async move {
            let data = match self.nodes.lock().unwrap().get(&self.key()) {
                Some(Node::File { data, .. }) => data.clone(),
                Some(Node::Collection { .. }) => return Err(FsError::GeneralFailure),
                None => return Err(FsError::NotFound),
            };
            Ok(Box::new(std::io::Cursor::new(data)) as ReadStream)
        }
        .boxed()
    }

    fn open_write(&self) -> FsFuture<'_, WriteStream> {
        async move {
            Ok(Box::new(MemoryWriter {
                nodes: self.nodes.clone(),
                key: self.key(),
                now: self.now(),
                buf: Vec::new(),
            }) as WriteStream)
        }
        .boxed()
    }

    fn create_collection(&self) -> FsFuture<'_, ()> {
        async move {
            let key = self.key();
            let mut nodes = self.nodes.lock().unwrap();
            if nodes.contains_key(&key) {
                return Err(FsError::Exists);
            }
            let parent_key = self.path.parent().as_str().to_string();
            if !matches!(nodes.get(&parent_key), Some(Node::Collection { .. })) {
                return Err(FsError::NotFound);
            }
            let now = self.now();
            nodes.insert(key, Node::Collection { ctime: now, mtime: now });
            Ok(())
        }
        .boxed()
    }

    fn delete(&self) -> FsFuture<'_, ()> {
        async move {
            let prefix = self.key();
            let mut nodes = self.nodes.lock().unwrap();
            if !nodes.contains_key(&prefix) {
                return Err(FsError::NotFound);
            }
            let prefix_with_slash = format!("{}/", prefix.trim_end_matches('/'));
            nodes.retain(|k, _| k != &prefix && !k.starts_with(&prefix_with_slash));
            Ok(())
        }
        .boxed()
    }
}

/// Buffers written bytes and commits them to the tree on drop-free
/// completion: the engine always awaits the handler to the end of the
/// body before the response is sent, so an explicit `shutdown`/`flush`
/// isn't needed — the commit happens as soon as all bytes land via
/// `poll_write`, mirroring an in-memory single-shot write.
struct MemoryWriter {
    nodes: Arc<Mutex<HashMap<String, Node>>>,
    key: String,
    now: i64,
    buf: Vec<u8>,
}

impl tokio::io::AsyncWrite for MemoryWriter {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        this.buf.extend_from_slice(buf);
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let mut nodes = this.nodes.lock().unwrap();
        let ctime = match nodes.get(&this.key) {
            Some(Node::File { ctime, .. }) => *ctime,
            _ => this.now,
        };
        nodes.insert(
            this.key.clone(),
            Node::File {
                ctime,
                mtime: this.now,
                data: this.buf.clone(),
            },
        );
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        self.poll_flush(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(|| 1_700_000_000)
    }

    #[tokio::test]
    async fn create_write_read_round_trip() {
        let be = backend();
        let root = be.resolve(DavPath::from_uri_and_prefix("/", "").unwrap());
        let file = root.child("a.txt");
        {
            use tokio::io::AsyncWriteExt;
            let mut w = file.open_write().await.unwrap();
            w.write_all(b"hello").await.unwrap();
            w.flush().await.unwrap();
        }
        assert!(file.exists().await.unwrap());
        assert_eq!(file.size().await.unwrap(), 5);
        let mut r = file.open_read().await.unwrap();
        let mut buf = Vec::new();
        use tokio::io::AsyncReadExt;
        r.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn mkcol_then_list_children() {
        let be = backend();
        let root = be.resolve(DavPath::from_uri_and_prefix("/", "").unwrap());
        let dir = root.child("sub");
        dir.create_collection().await.unwrap();
        assert!(dir.is_collection().await.unwrap());

        use futures_util::StreamExt;
        let mut kids = root.children().await.unwrap();
        let mut names = Vec::new();
        while let Some(k) = kids.next().await {
            names.push(k.unwrap().name());
        }
        assert_eq!(names, vec!["sub".to_string()]);
    }

    #[tokio::test]
    async fn delete_collection_removes_descendants() {
        let be = backend();
        let root = be.resolve(DavPath::from_uri_and_prefix("/", "").unwrap());
        let dir = root.child("sub");
        dir.create_collection().await.unwrap();
        let file = dir.child("f.txt");
        {
            use tokio::io::AsyncWriteExt;
            let mut w = file.open_write().await.unwrap();
            w.write_all(b"x").await.unwrap();
            w.flush().await.unwrap();
        }
        dir.delete().await.unwrap();
        assert!(!dir.exists().await.unwrap());
        assert!(!file.exists().await.unwrap());
    }

    #[tokio::test]
    async fn copy_into_duplicates_a_collection() {
        let be = backend();
        let root = be.resolve(DavPath::from_uri_and_prefix("/", "").unwrap());
        let src = root.child("src");
        src.create_collection().await.unwrap();
        let src_file = src.child("f.txt");
        {
            use tokio::io::AsyncWriteExt;
            let mut w = src_file.open_write().await.unwrap();
            w.write_all(b"payload").await.unwrap();
            w.flush().await.unwrap();
        }
        let dst = root.child("dst");
        src.copy_into(dst.as_ref(), -1).await.unwrap();
        let dst_file = dst.child("f.txt");
        assert!(dst_file.exists().await.unwrap());
        assert_eq!(dst_file.size().await.unwrap(), 7);
        assert!(src_file.exists().await.unwrap());
    }
}
