//! LOCK/UNLOCK (SPEC_FULL.md §9 Non-goals: no lock persistence or
//! enforcement). Grounded on the original's no-op `DavLock.acquire`/
//! `release`: this engine consults the configured [`crate::lock::LockManager`]
//! but, with the default [`crate::lock::NullLockManager`], both always
//! answer 501.

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::request::DavRequest;

use super::DavEngine;

pub async fn handle_lock(engine: &DavEngine, req: &DavRequest) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    if !resource.exists().await? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }
    if engine.locks().acquire(&resource.abs_path(), engine.principal()) {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .expect("static headers are always valid"))
    } else {
        Err(DavError::NotImplemented)
    }
}

pub async fn handle_unlock(engine: &DavEngine, req: &DavRequest) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    let token = req.header("lock-token").unwrap_or_default();
    if engine.locks().release(&resource.abs_path(), token) {
        Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .expect("static headers are always valid"))
    } else {
        Err(DavError::NotImplemented)
    }
}
