//! MKCOL (SPEC_FULL.md §4.3). Grounded on the original `doMKCOL`: 405 if
//! the target already exists, 409 if the parent is missing, 201 on
//! success.

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult, FsError};
use crate::request::DavRequest;

use super::DavEngine;

pub async fn handle_mkcol(
    engine: &DavEngine,
    req: &DavRequest,
    body: bytes::Bytes,
) -> DavResult<Response<Body>> {
    if !body.iter().all(u8::is_ascii_whitespace) {
        return Err(DavError::Status(StatusCode::UNSUPPORTED_MEDIA_TYPE));
    }

    let resource = engine.backend().resolve(req.path.clone());

    let acl = engine.acl().access(None, &resource.abs_path());
    if !acl.create {
        return Err(DavError::Forbidden);
    }

    match resource.create_collection().await {
        Ok(()) => {
            let mut builder = Response::builder().status(StatusCode::CREATED);
            if !req.path.is_collection() {
                let canonical_url = format!("{}/", req.url_for(&req.path));
                builder = builder.header(http::header::CONTENT_LOCATION, canonical_url);
            }
            Ok(builder
                .body(Body::empty())
                .expect("static headers are always valid"))
        }
        Err(FsError::Exists) => Err(DavError::Status(StatusCode::METHOD_NOT_ALLOWED)),
        Err(FsError::NotFound) => Err(DavError::Status(StatusCode::CONFLICT)),
        Err(e) => Err(DavError::Fs(e)),
    }
}
