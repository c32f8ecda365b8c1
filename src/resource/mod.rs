//! The resource abstraction: a polymorphic handle over one node in the
//! exported tree, plus the capability set (§4.2) that any backend —
//! local disk, virtual storage — must honor identically.
//!
//! Handles are ephemeral: a [`Backend`] resolves a fresh [`DavResource`]
//! per request, and the underlying storage is the only thing that
//! persists across requests.

pub mod local;
pub mod memory;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::errors::FsError;
use crate::path::DavPath;

pub type FsResult<T> = Result<T, FsError>;
pub type FsFuture<'a, T> = BoxFuture<'a, FsResult<T>>;
pub type ResourceStream = Pin<Box<dyn Stream<Item = FsResult<Box<dyn DavResource>>> + Send>>;

/// A readable byte stream released when dropped.
pub type ReadStream = Box<dyn AsyncRead + Send + Unpin>;
/// A writable byte stream released when dropped.
pub type WriteStream = Box<dyn AsyncWrite + Send + Unpin>;

/// One node in the exported tree: identity, observed attributes, and
/// the mutating operations the method engine drives.
///
/// Attributes (`exists`, `is_collection`, `size`, ...) are observed
/// fresh on every call, never cached on the handle — the backend is
/// the only source of truth.
pub trait DavResource: Send + Sync {
    /// The canonical request path this handle was resolved for.
    fn path(&self) -> &DavPath;

    /// `safe_join(root, path)` — an implementation detail that leaks
    /// into the wire via `etag()` (see SPEC_FULL.md §9), kept for
    /// compatibility.
    fn abs_path(&self) -> String;

    /// A fresh handle for the same node (backends hold only cheap,
    /// cloneable state: a root path, or a shared tree handle).
    fn clone_box(&self) -> Box<dyn DavResource>;

    /// A handle for the direct child named `name`.
    fn child(&self, name: &str) -> Box<dyn DavResource>;

    /// A handle for this node's parent. The parent of the root is itself.
    fn parent(&self) -> Box<dyn DavResource>;

    fn name(&self) -> String {
        let n = self.path().file_name();
        if n.is_empty() {
            "/".to_string()
        } else {
            n.to_string()
        }
    }

    fn exists(&self) -> FsFuture<'_, bool>;
    fn is_collection(&self) -> FsFuture<'_, bool>;

    fn is_non_collection(&self) -> FsFuture<'_, bool> {
        Box::pin(async move {
            if !self.exists().await? {
                return Ok(false);
            }
            Ok(!self.is_collection().await?)
        })
    }

    /// Size in bytes. Fails if absent or a collection.
    fn size(&self) -> FsFuture<'_, u64>;
    fn ctime(&self) -> FsFuture<'_, i64>;
    fn mtime(&self) -> FsFuture<'_, i64>;

    /// Direct children only, in backend-defined order.
    fn children(&self) -> FsFuture<'_, ResourceStream>;

    /// A depth-limited pre-order walk. `depth = -1` is infinity;
    /// `depth = 0` yields only `self` (if `include_self`).
    ///
    /// The default implementation lazily expands one directory at a
    /// time via an explicit stack, so memory use is bounded by the
    /// number of siblings at any single level, not the whole subtree.
    fn descendants(&self, depth: i32, include_self: bool) -> ResourceStream {
        let start = self.clone_box();
        Box::pin(async_stream::stream! {
            let mut stack: Vec<(Box<dyn DavResource>, i32, bool)> = vec![(start, depth, include_self)];
            while let Some((node, remaining, yield_node)) = stack.pop() {
                if yield_node {
                    yield Ok(node.clone_box());
                }
                if remaining == 0 {
                    continue;
                }
                let next_depth = if remaining < 0 { -1 } else { remaining - 1 };
                match node.children().await {
                    Ok(mut kids) => {
                        let mut buf = Vec::new();
                        while let Some(kid) = kids.next().await {
                            match kid {
                                Ok(kid) => buf.push(kid),
                                Err(e) => yield Err(e),
                            }
                        }
                        for kid in buf.into_iter().rev() {
                            stack.push((kid, next_depth, true));
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    fn open_read(&self) -> FsFuture<'_, ReadStream>;
    fn open_write(&self) -> FsFuture<'_, WriteStream>;

    /// Fails if the node already exists or its parent is absent.
    fn create_collection(&self) -> FsFuture<'_, ()>;

    /// Recursive for collections. Caller ensures the node exists.
    fn delete(&self) -> FsFuture<'_, ()>;

    /// See SPEC_FULL.md §4.2 / §9: delete a conflicting destination
    /// kind first, then create-or-overwrite. The default algorithm is
    /// backend-agnostic (built only from the other trait methods);
    /// backends may override for a native fast path.
    fn copy_into<'a>(&'a self, destination: &'a dyn DavResource, depth: i32) -> FsFuture<'a, ()> {
        Box::pin(async move {
            if self.is_collection().await? {
                if destination.exists().await? && destination.is_non_collection().await? {
                    destination.delete().await?;
                }
                if !destination.exists().await? {
                    destination.create_collection().await?;
                }
                if depth != 0 {
                    let next_depth = if depth < 0 { -1 } else { depth - 1 };
                    let mut children = self.children().await?;
                    while let Some(child) = children.next().await {
                        let child = child?;
                        let dest_child = destination.child(&child.name());
                        child.copy_into(dest_child.as_ref(), next_depth).await?;
                    }
                }
            } else {
                if destination.exists().await? && destination.is_collection().await? {
                    destination.delete().await?;
                }
                let mut reader = self.open_read().await?;
                let mut writer = destination.open_write().await?;
                tokio::io::copy(&mut reader, &mut writer)
                    .await
                    .map_err(FsError::from)?;
            }
            Ok(())
        })
    }

    /// MOVE is always depth-infinity for collections; see SPEC_FULL.md §4.2.
    fn move_into<'a>(&'a self, destination: &'a dyn DavResource) -> FsFuture<'a, ()> {
        Box::pin(async move {
            if destination.exists().await? {
                destination.delete().await?;
            }
            if self.is_collection().await? {
                destination.create_collection().await?;
                let mut children = self.children().await?;
                while let Some(child) = children.next().await {
                    let child = child?;
                    let dest_child = destination.child(&child.name());
                    child.move_into(dest_child.as_ref()).await?;
                }
                self.delete().await?;
            } else {
                let mut reader = self.open_read().await?;
                let mut writer = destination.open_write().await?;
                tokio::io::copy(&mut reader, &mut writer)
                    .await
                    .map_err(FsError::from)?;
                self.delete().await?;
            }
            Ok(())
        })
    }

    /// 128-bit hex digest of `abs_path ⊕ mtime ⊕ size`. A correctness
    /// hint, not a cryptographic commitment (SPEC_FULL.md §9).
    fn etag(&self) -> FsFuture<'_, String> {
        Box::pin(async move {
            let mtime = self.mtime().await?;
            let size = if self.is_collection().await? {
                0
            } else {
                self.size().await?
            };
            Ok(compute_etag(&self.abs_path(), mtime, size))
        })
    }
}

/// A non-cryptographic 128-bit digest: two differently-salted 64-bit
/// hashes of `abs_path ⊕ mtime ⊕ size`, concatenated as 32 hex digits.
pub(crate) fn compute_etag(abs_path: &str, mtime: i64, size: u64) -> String {
    let mut lo = DefaultHasher::new();
    abs_path.hash(&mut lo);
    mtime.hash(&mut lo);
    size.hash(&mut lo);

    let mut hi = DefaultHasher::new();
    0xe7a6_u64.hash(&mut hi);
    size.hash(&mut hi);
    mtime.hash(&mut hi);
    abs_path.hash(&mut hi);

    format!("{:016x}{:016x}", lo.finish(), hi.finish())
}

/// Constructs [`DavResource`] handles rooted at a configured location.
/// Handles are ephemeral and stateless; the backend itself holds
/// whatever shared state (a root path, an in-memory tree) backs them.
pub trait Backend: Send + Sync {
    fn resolve(&self, path: DavPath) -> Box<dyn DavResource>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_is_stable_for_same_inputs() {
        let a = compute_etag("/root/a.txt", 100, 5);
        let b = compute_etag("/root/a.txt", 100, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn etag_changes_when_mtime_or_size_changes() {
        let base = compute_etag("/root/a.txt", 100, 5);
        assert_ne!(base, compute_etag("/root/a.txt", 101, 5));
        assert_ne!(base, compute_etag("/root/a.txt", 100, 6));
        assert_ne!(base, compute_etag("/root/b.txt", 100, 5));
    }
}
