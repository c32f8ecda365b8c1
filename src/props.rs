//! The live-property model (SPEC_FULL.md §4.3): computing `{DAV:}getetag`
//! and friends from a [`DavResource`], independent of PROPFIND's XML
//! framing.

use futures_util::future::BoxFuture;

use crate::path::{clark_join, rfc3339};
use crate::resource::DavResource;

/// A resolved property value, or the information that it's absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// Plain text content for the property element.
    Text(String),
    /// A pre-built XML fragment, inserted verbatim as the property
    /// element's children (used for `{DAV:}resourcetype`, whose value
    /// is itself an element, not text).
    Xml(String),
}

impl PropValue {
    pub fn text(s: impl Into<String>) -> PropValue {
        PropValue::Text(s.into())
    }
}

/// One property, named in Clark notation, paired with its outcome.
pub struct PropResult {
    pub name: String,
    pub value: Option<PropValue>,
}

/// Computes live properties for a resource. The engine's PROPFIND
/// handler is the only caller; `{DAV:}href` is framed separately by
/// the handler itself, not served through this trait (SPEC_FULL.md §4.3).
pub trait PropertyProvider: Send + Sync {
    /// Resolve specific properties, named in Clark notation. When
    /// `names_only` is set (a `{DAV:}propname` query), every name in the
    /// live set resolves to present with no computed value, regardless
    /// of resource kind — per §4.3, `names_only` short-circuits the
    /// per-kind rules (e.g. `getcontentlength` being absent on
    /// collections) that apply only when a value is actually wanted.
    fn get_properties<'a>(
        &'a self,
        resource: &'a dyn DavResource,
        names: &'a [String],
        names_only: bool,
    ) -> BoxFuture<'a, Vec<PropResult>>;

    /// All live properties this provider knows about, for `allprop`.
    fn all_property_names(&self) -> Vec<String>;

    /// A convenience for callers building their own responses outside
    /// the engine's PROPFIND handler, which always frames `{DAV:}href`
    /// itself rather than calling this (SPEC_FULL.md §9).
    fn href(&self, base_url: &str, resource: &dyn DavResource) -> String {
        crate::path::url_join(base_url, [resource.path().as_str()])
    }
}

/// The five live properties the original `DavProperties.get_properties`
/// computes, plus `displayname`. No dead-property storage: anything not
/// in this fixed set resolves to "missing" (SPEC_FULL.md §4.3 Non-goals).
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveProperties;

const NS: &str = "DAV:";

impl LiveProperties {
    fn known_names() -> [&'static str; 6] {
        [
            "getetag",
            "getcontentlength",
            "creationdate",
            "getlastmodified",
            "resourcetype",
            "displayname",
        ]
    }

    /// Resolves one live property. When `names_only`, every name in the
    /// live set is present-but-unevaluated: the per-kind rules below
    /// (e.g. `getcontentlength` requiring a non-collection) only apply
    /// once a value is actually being computed.
    async fn resolve_one(resource: &dyn DavResource, local: &str, names_only: bool) -> Option<PropValue> {
        if names_only {
            return if Self::known_names().contains(&local) {
                Some(PropValue::Text(String::new()))
            } else {
                None
            };
        }
        match local {
            "getetag" => resource.etag().await.ok().map(PropValue::text),
            "getcontentlength" => {
                if resource.is_collection().await.ok()? {
                    None
                } else {
                    resource.size().await.ok().map(|n| PropValue::text(n.to_string()))
                }
            }
            "creationdate" => {
                let ctime = resource.ctime().await.ok()?;
                Some(PropValue::text(rfc3339(Some(ctime))))
            }
            "getlastmodified" => {
                let mtime = resource.mtime().await.ok()?;
                Some(PropValue::text(
                    crate::util::systemtime_to_httpdate(
                        std::time::UNIX_EPOCH + std::time::Duration::from_secs(mtime.max(0) as u64),
                    ),
                ))
            }
            "resourcetype" => {
                if resource.is_collection().await.ok()? {
                    Some(PropValue::Xml("<D:collection xmlns:D=\"DAV:\"/>".to_string()))
                } else {
                    Some(PropValue::Xml(String::new()))
                }
            }
            "displayname" => Some(PropValue::text(resource.name())),
            _ => None,
        }
    }
}

impl PropertyProvider for LiveProperties {
    fn get_properties<'a>(
        &'a self,
        resource: &'a dyn DavResource,
        names: &'a [String],
        names_only: bool,
    ) -> BoxFuture<'a, Vec<PropResult>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                let (ns, local) = crate::path::clark_split(name);
                let value = if ns.is_empty() || ns == NS {
                    Self::resolve_one(resource, local, names_only).await
                } else {
                    None
                };
                out.push(PropResult {
                    name: name.clone(),
                    value,
                });
            }
            out
        })
    }

    fn all_property_names(&self) -> Vec<String> {
        Self::known_names()
            .iter()
            .map(|n| clark_join(NS, n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::memory::MemoryBackend;
    use crate::resource::Backend;

    #[tokio::test]
    async fn getcontentlength_absent_for_collections() {
        let be = MemoryBackend::new(|| 1_700_000_000);
        let root = be.resolve(crate::path::DavPath::from_uri_and_prefix("/", "").unwrap());
        let names = vec![clark_join(NS, "getcontentlength")];
        let results = LiveProperties.get_properties(root.as_ref(), &names, false).await;
        assert!(results[0].value.is_none());
    }

    #[tokio::test]
    async fn getcontentlength_present_for_collections_in_names_only_mode() {
        let be = MemoryBackend::new(|| 1_700_000_000);
        let root = be.resolve(crate::path::DavPath::from_uri_and_prefix("/", "").unwrap());
        let names = vec![clark_join(NS, "getcontentlength")];
        let results = LiveProperties.get_properties(root.as_ref(), &names, true).await;
        assert!(results[0].value.is_some());
    }

    #[tokio::test]
    async fn propname_query_reports_every_live_name_as_present() {
        let be = MemoryBackend::new(|| 1_700_000_000);
        let root = be.resolve(crate::path::DavPath::from_uri_and_prefix("/", "").unwrap());
        let names = LiveProperties.all_property_names();
        let results = LiveProperties.get_properties(root.as_ref(), &names, true).await;
        assert!(results.iter().all(|r| r.value.is_some()));
    }

    #[tokio::test]
    async fn resourcetype_marks_collections() {
        let be = MemoryBackend::new(|| 1_700_000_000);
        let root = be.resolve(crate::path::DavPath::from_uri_and_prefix("/", "").unwrap());
        let names = vec![clark_join(NS, "resourcetype")];
        let results = LiveProperties.get_properties(root.as_ref(), &names, false).await;
        match &results[0].value {
            Some(PropValue::Xml(s)) => assert!(s.contains("collection")),
            _ => panic!("expected resourcetype xml fragment"),
        }
    }

    #[test]
    fn unknown_namespace_properties_are_missing() {
        let (ns, local) = crate::path::clark_split("{urn:other}foo");
        assert_eq!(ns, "urn:other");
        assert_eq!(local, "foo");
    }
}
