//! Directory-index rendering contract (SPEC_FULL.md §1 Non-goals): full
//! HTML directory browsing is explicitly out of scope for this engine,
//! but GET on a collection still needs *something* to send when no
//! outer layer intercepts it first. [`DirectoryIndexRenderer`] is the
//! seam; [`DefaultIndex`] is a minimal, dependency-light filler, not a
//! feature this crate aims to own.

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use htmlescape::encode_minimal;

use crate::resource::DavResource;

pub trait DirectoryIndexRenderer: Send + Sync {
    fn render<'a>(&'a self, resource: &'a dyn DavResource) -> BoxFuture<'a, String>;
}

/// A bare `<ul>` of child names, each escaped and linked relative to the
/// current path. No styling, no sorting beyond what the backend already
/// returns, no metadata columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIndex;

impl DirectoryIndexRenderer for DefaultIndex {
    fn render<'a>(&'a self, resource: &'a dyn DavResource) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let title = encode_minimal(resource.path().as_str());
            let mut body = format!(
                "<!DOCTYPE html>\n<html><head><title>{title}</title></head><body>\n<h1>{title}</h1>\n<ul>\n"
            );
            match resource.children().await {
                Ok(mut children) => {
                    while let Some(child) = children.next().await {
                        let Ok(child) = child else { continue };
                        let name = encode_minimal(&child.name());
                        let is_dir = child.is_collection().await.unwrap_or(false);
                        let suffix = if is_dir { "/" } else { "" };
                        body.push_str(&format!(
                            "<li><a href=\"{name}{suffix}\">{name}{suffix}</a></li>\n"
                        ));
                    }
                }
                Err(_) => body.push_str("<li><em>unable to list directory</em></li>\n"),
            }
            body.push_str("</ul>\n</body></html>\n");
            body
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::DavPath;
    use crate::resource::memory::MemoryBackend;
    use crate::resource::Backend;

    #[tokio::test]
    async fn renders_child_links() {
        let be = MemoryBackend::new(|| 1_700_000_000);
        let root = be.resolve(DavPath::from_uri_and_prefix("/", "").unwrap());
        {
            use tokio::io::AsyncWriteExt;
            let mut w = root.child("a.txt").open_write().await.unwrap();
            w.write_all(b"x").await.unwrap();
            w.flush().await.unwrap();
        }
        let html = DefaultIndex.render(root.as_ref()).await;
        assert!(html.contains("a.txt"));
    }
}
