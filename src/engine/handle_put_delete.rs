//! PUT and DELETE (SPEC_FULL.md §4.3, §4.4). Grounded on the original
//! `doPUT`/`doDELETE`: PUT refuses to write over a collection and 404s
//! if the parent is missing, reporting 201 for a fresh write and 204 for
//! an overwrite; DELETE 404s on an absent resource and is otherwise
//! unconditionally recursive.

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::request::DavRequest;

use super::DavEngine;

pub async fn handle_put(
    engine: &DavEngine,
    req: &DavRequest,
    body: bytes::Bytes,
) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    let abs_path = resource.abs_path();

    if resource.exists().await? && resource.is_collection().await? {
        return Err(DavError::Status(StatusCode::METHOD_NOT_ALLOWED));
    }

    let parent = resource.parent();
    if !parent.exists().await? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }

    let acl = engine.acl().access(None, &abs_path);
    if !acl.write {
        return Err(DavError::Forbidden);
    }

    let created = !resource.exists().await?;

    let mut writer = resource.open_write().await?;
    tokio::io::AsyncWriteExt::write_all(&mut writer, &body).await?;
    tokio::io::AsyncWriteExt::flush(&mut writer).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    };

    Ok(Response::builder()
        .status(status)
        .body(Body::empty())
        .expect("static headers are always valid"))
}

pub async fn handle_delete(engine: &DavEngine, req: &DavRequest) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    if !resource.exists().await? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }

    let acl = engine.acl().access(None, &resource.abs_path());
    if !acl.delete {
        return Err(DavError::Forbidden);
    }

    resource.delete().await?;

    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())
        .expect("static headers are always valid"))
}
