//! PROPFIND (SPEC_FULL.md §4.5). Grounded on the original `doPROPFIND`:
//! 404 if the target is absent, an ACL `list` check, `Depth` parsed the
//! same way as COPY/MOVE (default infinity here, not 0), and a
//! `{DAV:}multistatus` body built by walking the depth-limited
//! descendant set and asking the property provider for each one's
//! properties.

use http::{Response, StatusCode};

use crate::body::Body;
use crate::errors::{DavError, DavResult};
use crate::props::PropertyProvider;
use crate::request::DavRequest;
use crate::resource::DavResource;
use crate::xml::{parse_propfind, write_multistatus, PropfindQuery, ResponseEntry};

use super::DavEngine;

pub async fn handle_propfind(
    engine: &DavEngine,
    req: &DavRequest,
    body: bytes::Bytes,
) -> DavResult<Response<Body>> {
    let resource = engine.backend().resolve(req.path.clone());
    if !resource.exists().await? {
        return Err(DavError::Status(StatusCode::NOT_FOUND));
    }

    let acl = engine.acl().access(None, &resource.abs_path());
    if !acl.list {
        return Err(DavError::Forbidden);
    }

    let depth = req.depth(true)?;
    let query = parse_propfind(&body)?;

    let mut entries = Vec::new();
    let mut walk = resource.descendants(depth, true);
    use futures_util::StreamExt;
    while let Some(node) = walk.next().await {
        let node = node?;
        let entry = build_entry(engine, req, node.as_ref(), &query).await?;
        entries.push(entry);
    }

    let xml = write_multistatus(&entries);
    Ok(Response::builder()
        .status(StatusCode::MULTI_STATUS)
        .header(http::header::CONTENT_TYPE, "application/xml; charset=utf-8")
        .body(Body::from(xml))
        .expect("static headers are always valid"))
}

async fn build_entry(
    engine: &DavEngine,
    req: &DavRequest,
    resource: &dyn DavResource,
    query: &PropfindQuery,
) -> DavResult<ResponseEntry> {
    let href = req.url_for(resource.path());
    let (names, names_only) = match query {
        PropfindQuery::AllProp => (engine.props().all_property_names(), false),
        PropfindQuery::PropName => (engine.props().all_property_names(), true),
        PropfindQuery::Props(names) => (names.clone(), false),
    };

    let results = engine.props().get_properties(resource, &names, names_only).await;
    let found = results.into_iter().map(|r| (r.name, r.value)).collect();

    Ok(ResponseEntry {
        href,
        found,
        names_only,
    })
}
