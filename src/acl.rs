//! The ACL value and the provider interface the engine consults exactly
//! once per request, before any mutating backend call.

/// A flat permission record for one (principal, path) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acl {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub create: bool,
    pub relocate: bool,
    pub list: bool,
}

impl Acl {
    /// Every permission on or off.
    pub fn all(value: bool) -> Acl {
        Acl {
            read: value,
            write: value,
            delete: value,
            create: value,
            relocate: value,
            list: value,
        }
    }
}

/// Resolves the permissions a principal holds over a path.
///
/// The engine calls `access` exactly once per request, before any
/// mutating operation, and trusts the result for the remainder of the
/// request.
pub trait AclProvider: Send + Sync {
    fn access(&self, principal: Option<&str>, abs_path: &str) -> Acl;
}

/// Default provider: read-only access (`list`, `read` on; everything
/// else off), matching the original source's `DavFileSystem.access`
/// default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyAcl;

impl AclProvider for ReadOnlyAcl {
    fn access(&self, _principal: Option<&str>, _abs_path: &str) -> Acl {
        Acl {
            read: true,
            list: true,
            ..Acl::all(false)
        }
    }
}

/// Grants every permission to every principal. Useful for tests and for
/// embedders who enforce authorization upstream of this engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllAcl;

impl AclProvider for AllowAllAcl {
    fn access(&self, _principal: Option<&str>, _abs_path: &str) -> Acl {
        Acl::all(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_acl_grants_list_and_read_only() {
        let acl = ReadOnlyAcl.access(None, "/a");
        assert!(acl.read);
        assert!(acl.list);
        assert!(!acl.write);
        assert!(!acl.delete);
        assert!(!acl.create);
        assert!(!acl.relocate);
    }

    #[test]
    fn allow_all_grants_everything() {
        let acl = AllowAllAcl.access(Some("alice"), "/a");
        assert_eq!(acl, Acl::all(true));
    }
}
