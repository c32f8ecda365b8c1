//! PROPPATCH (SPEC_FULL.md §9 Non-goals: no dead-property storage).
//! The original's `doPROPPATCH` silently no-ops; this engine is explicit
//! about the limitation instead and answers 501, so a client can tell
//! the difference between "accepted, nothing changed" and "not
//! supported here".

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::request::DavRequest;

use super::DavEngine;

pub async fn handle_proppatch(engine: &DavEngine, req: &DavRequest) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    if !resource.exists().await? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }
    Err(DavError::NotImplemented)
}
