//! Path utilities: joining/normalizing hierarchical paths, Clark-notation
//! tag splitting, and the `DavPath` newtype that owns URL-decoding and
//! collection-suffix bookkeeping for the rest of the engine.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::errors::{DavError, DavResult};

/// Join `root` with zero or more path segments, the way the original
/// `safe_join` does: always anchor the result at `/`, strip any trailing
/// slash from the accumulator before appending, and strip any leading
/// slash from each segment being appended. Never produces `//`, and never
/// hands back `root` unchanged if at least one segment was given.
pub fn safe_join<S: AsRef<str>>(root: &str, paths: impl IntoIterator<Item = S>) -> String {
    let mut out = if root.starts_with('/') {
        root.to_string()
    } else {
        format!("/{root}")
    };
    for p in paths {
        while out.ends_with('/') {
            out.pop();
        }
        let mut seg = p.as_ref();
        while let Some(rest) = seg.strip_prefix('/') {
            seg = rest;
        }
        out.push('/');
        out.push_str(seg);
    }
    out
}

/// Join a `base` (scheme+host+optional-prefix) with path segments: the
/// segments are `safe_join`-ed together, then appended to `base` with
/// its own trailing slash stripped.
pub fn url_join<S: AsRef<str>>(base: &str, paths: impl IntoIterator<Item = S>) -> String {
    let joined = safe_join("", paths);
    let mut base = base;
    while base.ends_with('/') {
        base = &base[..base.len() - 1];
    }
    format!("{base}{joined}")
}

/// Split a Clark-notation tag `{ns}local` into `(ns, local)`. Tags with no
/// `{...}` prefix return an empty namespace.
pub fn clark_split(tag: &str) -> (&str, &str) {
    if let Some(rest) = tag.strip_prefix('{') {
        if let Some(end) = rest.find('}') {
            return (&rest[..end], &rest[end + 1..]);
        }
    }
    ("", tag)
}

/// Build a Clark-notation tag from a namespace and local name.
pub fn clark_join(ns: &str, local: &str) -> String {
    if ns.is_empty() {
        local.to_string()
    } else {
        format!("{{{ns}}}{local}")
    }
}

/// Render a unix timestamp as `YYYY-MM-DDTHH:MM:SSZ`, applying the local
/// UTC offset before stamping the result `Z`. This reproduces the
/// source's `rfc3339_date` quirk verbatim (see SPEC_FULL.md §9): the
/// value is *not* true UTC, it is local wall-clock time with a `Z`
/// suffix, kept for wire compatibility with existing clients.
pub fn rfc3339(ts: Option<i64>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    let utc = match time::OffsetDateTime::from_unix_timestamp(ts) {
        Ok(t) => t,
        Err(_) => return String::new(),
    };
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let local = utc.to_offset(offset);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        local.year(),
        u8::from(local.month()),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
    )
}

/// A canonicalized, percent-decoded, leading-slash request path.
///
/// Holds whether the *original* (pre-canonicalization) request path
/// ended in a slash, since that distinguishes `/dir` from `/dir/` for
/// collection-redirect purposes even after both canonicalize to the
/// same stored path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavPath {
    path: String,
    had_trailing_slash: bool,
    star: bool,
}

impl DavPath {
    /// Build a `DavPath` from the full request path and the prefix that
    /// the router already consumed to reach this handler.
    pub fn from_uri_and_prefix(uri_path: &str, prefix: &str) -> DavResult<DavPath> {
        if uri_path == "*" {
            return Ok(DavPath {
                path: String::new(),
                had_trailing_slash: false,
                star: true,
            });
        }
        let tail = uri_path.strip_prefix(prefix).unwrap_or(uri_path);
        let decoded = percent_decode_str(tail)
            .decode_utf8()
            .map_err(|_| DavError::BadRequest("request path is not valid UTF-8"))?;
        if decoded.contains('\0') {
            return Err(DavError::BadRequest("request path contains NUL"));
        }
        let had_trailing_slash = decoded.len() > 1 && decoded.ends_with('/');

        let mut segments = Vec::new();
        for seg in decoded.split('/') {
            match seg {
                "" | "." => {}
                ".." => return Err(DavError::BadRequest("request path escapes root")),
                s => segments.push(s),
            }
        }
        let path = safe_join("", segments);
        Ok(DavPath {
            path,
            had_trailing_slash,
            star: false,
        })
    }

    /// The canonical path string, e.g. `/a/b`. Root is `/`.
    pub fn as_str(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }

    /// True if the caller's original request path ended in `/`, or the
    /// path has since been marked as one via `add_slash`.
    pub fn is_collection(&self) -> bool {
        self.had_trailing_slash || self.path.is_empty()
    }

    /// Mark this path as referring to a collection, appending the
    /// bookkeeping slash that `is_collection` reports from then on.
    pub fn add_slash(&mut self) {
        self.had_trailing_slash = true;
    }

    /// True for the literal `*` request target (OPTIONS asterisk-form).
    pub fn is_star(&self) -> bool {
        self.star
    }

    /// The parent of this path. The parent of `/` is `/`.
    pub fn parent(&self) -> DavPath {
        let trimmed = self.path.trim_end_matches('/');
        let parent = match trimmed.rfind('/') {
            Some(0) => "",
            Some(i) => &trimmed[..i],
            None => "",
        };
        DavPath {
            path: parent.to_string(),
            had_trailing_slash: true,
            star: false,
        }
    }

    /// The final path segment, or empty for the root.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Build a child path by joining this path with a single segment.
    pub fn join_segment(&self, segment: &str) -> DavPath {
        DavPath {
            path: safe_join(&self.path, [segment]),
            had_trailing_slash: false,
            star: false,
        }
    }
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_join_anchors_and_dedups_slashes() {
        assert_eq!(safe_join("/root", ["a", "b"]), "/root/a/b");
        assert_eq!(safe_join("root/", ["/a/"]), "/root/a/");
        assert_eq!(safe_join("/", Vec::<&str>::new()), "/");
        assert!(!safe_join("/root", ["a"]).contains("//"));
    }

    #[test]
    fn safe_join_is_idempotent_under_normalization() {
        let a = "/root";
        let once = safe_join(&safe_join(a, ["b"]), ["c"]);
        let direct = safe_join(a, ["b", "c"]);
        assert_eq!(once, direct);
        assert!(once.starts_with('/'));
        assert!(!once.contains("//"));
    }

    #[test]
    fn safe_join_never_returns_left_unchanged_with_segments() {
        assert_ne!(safe_join("/root", ["a"]), "/root");
    }

    #[test]
    fn url_join_strips_base_trailing_slash() {
        assert_eq!(url_join("http://host/", ["a", "b"]), "http://host/a/b");
        assert_eq!(url_join("http://host", ["/a"]), "http://host/a");
    }

    #[test]
    fn clark_split_splits_namespace() {
        assert_eq!(clark_split("{DAV:}getetag"), ("DAV:", "getetag"));
        assert_eq!(clark_split("bare"), ("", "bare"));
        assert_eq!(clark_join("DAV:", "getetag"), "{DAV:}getetag");
    }

    #[test]
    fn rfc3339_empty_on_none() {
        assert_eq!(rfc3339(None), "");
    }

    #[test]
    fn rfc3339_formats_epoch_shape() {
        let s = rfc3339(Some(0));
        assert_eq!(s.len(), "YYYY-MM-DDTHH:MM:SSZ".len());
        assert!(s.ends_with('Z'));
    }

    #[test]
    fn davpath_strips_prefix_and_decodes() {
        let p = DavPath::from_uri_and_prefix("/dav/a%20b/c", "/dav").unwrap();
        assert_eq!(p.as_str(), "/a b/c");
        assert!(!p.is_collection());
    }

    #[test]
    fn davpath_tracks_trailing_slash_for_collections() {
        let p = DavPath::from_uri_and_prefix("/dir1/", "").unwrap();
        assert_eq!(p.as_str(), "/dir1");
        assert!(p.is_collection());
    }

    #[test]
    fn davpath_rejects_dotdot_escape() {
        assert!(DavPath::from_uri_and_prefix("/a/../../etc/passwd", "").is_err());
    }

    #[test]
    fn davpath_parent_and_file_name() {
        let p = DavPath::from_uri_and_prefix("/a/b/c", "").unwrap();
        assert_eq!(p.file_name(), "c");
        assert_eq!(p.parent().as_str(), "/a/b");
        let root = DavPath::from_uri_and_prefix("/", "").unwrap();
        assert_eq!(root.parent().as_str(), "/");
    }

    #[test]
    fn davpath_star_is_recognized() {
        let p = DavPath::from_uri_and_prefix("*", "").unwrap();
        assert!(p.is_star());
    }
}
