//! Adapts an incoming `http::Request` to what the method engine needs:
//! the resolved [`DavPath`], the headers it consumes (SPEC_FULL.md §6),
//! and the base URL used to build `Destination`-relative and `href`
//! values in responses.
//!
//! Grounded on the original `DavRequest.get_root`/`get_base`/
//! `get_base_url`: the "base" is the portion of the routed URL that
//! came before the part this engine owns (`PATH_INFO[:-len(path)]` in
//! the source), so that responses built from `url_join(base, ...)`
//! round-trip through whatever outer routing placed this engine at a
//! sub-path.

use http::{HeaderMap, Method};

use crate::errors::{DavError, DavResult};
use crate::path::DavPath;

/// The subset of an HTTP request the method engine cares about. An
/// embedder owning actual transport builds one of these per request;
/// this crate never reads a socket itself (SPEC_FULL.md §1 Non-goals).
pub struct DavRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub path: DavPath,
    base: String,
}

impl DavRequest {
    /// `uri_path` is the full request-target path; `prefix` is the
    /// portion of it this engine is mounted under (possibly empty);
    /// `base_url` is the scheme+host (and any further outer prefix) to
    /// prepend when building absolute response URLs.
    pub fn new(
        method: Method,
        headers: HeaderMap,
        uri_path: &str,
        prefix: &str,
        base_url: &str,
    ) -> DavResult<DavRequest> {
        let path = DavPath::from_uri_and_prefix(uri_path, prefix)?;
        Ok(DavRequest {
            method,
            headers,
            path,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// scheme+host+prefix this engine is mounted at, with no trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Builds an absolute URL for a path rooted at this engine's mount point.
    pub fn url_for(&self, path: &DavPath) -> String {
        crate::path::url_join(&self.base, [path.as_str()])
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Depth` header, parsed per SPEC_FULL.md §4.2/§4.5:
    /// `0`/`1` literally, `infinity` (or absent, where `default_infinity`
    /// is true) as `-1`. Any other value is a protocol error.
    pub fn depth(&self, default_infinity: bool) -> DavResult<i32> {
        match self.header("depth") {
            None if default_infinity => Ok(-1),
            None => Ok(0),
            Some("0") => Ok(0),
            Some("1") => Ok(1),
            Some(s) if s.eq_ignore_ascii_case("infinity") => Ok(-1),
            Some(_) => Err(DavError::BadRequest("illegal Depth header")),
        }
    }

    /// The `Overwrite` header: `T` or absent means true, `F` means
    /// false, anything else is a protocol error.
    pub fn overwrite(&self) -> DavResult<bool> {
        match self.header("overwrite") {
            None => Ok(true),
            Some("T") => Ok(true),
            Some("F") => Ok(false),
            Some(_) => Err(DavError::BadRequest("illegal Overwrite header")),
        }
    }
}
