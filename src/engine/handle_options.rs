//! OPTIONS (SPEC_FULL.md §4.5). Grounded on the original `doOPTIONS`:
//! a bare response for `*`, a minimal `Allow` for an unmapped path with
//! an existing parent, and distinct verb sets for an existing
//! collection (no `PUT`) versus an existing non-collection (`PUT`
//! added); `MKCOL` only ever appears for a non-existent target with an
//! existing parent, never for an already-existing resource.
//! `Accept-Ranges: bytes` is added for files, a supplement over the
//! original (see SPEC_FULL.md §9). Every verb offered is also filtered
//! through the engine's configured `methods` allow-set, so `Allow`
//! never advertises a method that dispatch would then reject with 405.

use http::{HeaderValue, Response, StatusCode};

use crate::body::Body;
use crate::errors::DavResult;
use crate::request::DavRequest;
use crate::util::DavMethod;

use super::DavEngine;

const DAV_HEADER: &str = "1,2";

// Ordered to match SPEC_FULL.md §4.5's literal `Allow` string for an
// existing collection ("OPTIONS HEAD GET DELETE PROPFIND PROPPATCH COPY
// MOVE LOCK UNLOCK"), with PUT and MKCOL appended after — PUT only
// applies to non-collections, MKCOL only to a non-existent target.
const NAMED_METHODS: &[(&str, DavMethod)] = &[
    ("OPTIONS", DavMethod::OPTIONS),
    ("HEAD", DavMethod::HEAD),
    ("GET", DavMethod::GET),
    ("DELETE", DavMethod::DELETE),
    ("PROPFIND", DavMethod::PROPFIND),
    ("PROPPATCH", DavMethod::PROPPATCH),
    ("COPY", DavMethod::COPY),
    ("MOVE", DavMethod::MOVE),
    ("LOCK", DavMethod::LOCK),
    ("UNLOCK", DavMethod::UNLOCK),
    ("PUT", DavMethod::PUT),
    ("MKCOL", DavMethod::MKCOL),
];

/// Names the subset of `wanted` that's both in `NAMED_METHODS` and
/// allowed by the engine's configured method set, in `NAMED_METHODS`
/// order.
fn allow_header(engine: &DavEngine, wanted: DavMethod) -> String {
    NAMED_METHODS
        .iter()
        .filter(|(_, m)| wanted.contains(*m) && engine.allowed_methods().contains(*m))
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn handle_options(engine: &DavEngine, req: &DavRequest) -> DavResult<Response<Body>> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("DAV", DAV_HEADER)
        .header("MS-Author-Via", "DAV");

    if req.path.is_star() {
        return Ok(builder
            .body(Body::empty())
            .expect("static headers are always valid"));
    }

    let resource = engine.backend().resolve(req.path.clone());
    let exists = resource.exists().await?;

    if !exists {
        let allow = if resource.parent().exists().await? {
            allow_header(engine, DavMethod::OPTIONS | DavMethod::PUT | DavMethod::MKCOL)
        } else {
            allow_header(engine, DavMethod::OPTIONS)
        };
        builder = builder.header(http::header::ALLOW, allow);
        return Ok(builder
            .body(Body::empty())
            .expect("static headers are always valid"));
    }

    let is_collection = resource.is_collection().await?;
    let collection_methods = DavMethod::OPTIONS
        | DavMethod::HEAD
        | DavMethod::GET
        | DavMethod::DELETE
        | DavMethod::PROPFIND
        | DavMethod::PROPPATCH
        | DavMethod::COPY
        | DavMethod::MOVE
        | DavMethod::LOCK
        | DavMethod::UNLOCK;
    let wanted = if is_collection {
        collection_methods
    } else {
        collection_methods | DavMethod::PUT
    };

    builder = builder.header(http::header::ALLOW, allow_header(engine, wanted));
    if !is_collection {
        builder = builder.header("Accept-Ranges", HeaderValue::from_static("bytes"));
    }

    Ok(builder
        .body(Body::empty())
        .expect("static headers are always valid"))
}
