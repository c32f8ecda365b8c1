//! End-to-end scenarios against the method engine, run over the
//! in-memory backend. These exercise the literal inputs from
//! SPEC_FULL.md §8, not just unit-level pieces.

use bytes::Bytes;
use futures_util::StreamExt;
use http::{Method, Request, StatusCode};

use crate::acl::{Acl, AclProvider, AllowAllAcl};
use crate::engine::EngineBuilder;
use crate::resource::memory::MemoryBackend;
use crate::util::DavMethod;

async fn body_text(mut body: crate::body::Body) -> String {
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(chunk.unwrap().as_ref());
    }
    String::from_utf8(buf).unwrap()
}

fn engine() -> super::DavEngine {
    EngineBuilder::new(MemoryBackend::new(|| 1_700_000_000))
        .acl(AllowAllAcl)
        .build()
}

fn request(method: Method, path: &str, headers: &[(&str, &str)], body: &'static [u8]) -> Request<Bytes> {
    let mut builder = Request::builder().method(method).uri(path);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(Bytes::from_static(body)).unwrap()
}

#[tokio::test]
async fn scenario_1_propfind_depth_0_on_collection() {
    let engine = engine();
    engine
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;
    engine
        .handle(request(Method::PUT, "/dir1/a.txt", &[], b"hello"))
        .await;

    let resp = engine
        .handle(request(
            Method::from_bytes(b"PROPFIND").unwrap(),
            "/dir1/",
            &[("depth", "0")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(resp.into_body()).await;
    assert_eq!(xml.matches("<D:response>").count(), 1);
    assert!(xml.contains("/dir1"));
    assert!(xml.contains("<D:collection"));
}

#[tokio::test]
async fn scenario_2_propfind_depth_1_propname() {
    let engine = engine();
    engine
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;
    engine
        .handle(request(Method::PUT, "/dir1/a.txt", &[], b"hello"))
        .await;

    let body = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:propname/></D:propfind>"#;
    let resp = engine
        .handle(request(
            Method::from_bytes(b"PROPFIND").unwrap(),
            "/dir1/",
            &[("depth", "1")],
            body,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(resp.into_body()).await;
    assert_eq!(xml.matches("<D:response>").count(), 2);
    assert!(xml.contains("D:getetag"));
    assert!(xml.contains("D:displayname"));
}

/// The names-only invariant (SPEC_FULL.md §8): a `{DAV:}propname` query
/// on a collection must report every live name as found, including
/// `getcontentlength`, which is only ever absent when a value is
/// actually being computed.
#[tokio::test]
async fn scenario_2b_propname_on_collection_reports_getcontentlength_as_found() {
    let engine = engine();
    engine
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;

    let body = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:propname/></D:propfind>"#;
    let resp = engine
        .handle(request(
            Method::from_bytes(b"PROPFIND").unwrap(),
            "/dir1/",
            &[("depth", "0")],
            body,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(resp.into_body()).await;
    let dir_response = xml.split("<D:response>").nth(1).unwrap();
    assert!(dir_response.contains("getcontentlength"));
    assert!(!dir_response.contains("HTTP/1.1 404"));
}

#[tokio::test]
async fn scenario_3_put_then_get_round_trips() {
    let engine = engine();
    let resp = engine
        .handle(request(Method::PUT, "/new.txt", &[], b"hello"))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = engine.handle(request(Method::GET, "/new.txt", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_LENGTH).unwrap(),
        "5"
    );
    assert!(resp.headers().get(http::header::ETAG).is_some());
    let text = body_text(resp.into_body()).await;
    assert_eq!(text, "hello");
}

#[tokio::test]
async fn scenario_4_copy_depth_0_leaves_source_and_creates_destination() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;

    let resp = engine
        .handle(request(
            Method::from_bytes(b"COPY").unwrap(),
            "/a.txt",
            &[("destination", "http://localhost/b.txt"), ("depth", "0"), ("overwrite", "T")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let a = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(a.status(), StatusCode::OK);
    let b = engine.handle(request(Method::GET, "/b.txt", &[], b"")).await;
    assert_eq!(b.status(), StatusCode::OK);
    assert_eq!(body_text(b.into_body()).await, "hello");
}

#[tokio::test]
async fn scenario_5_move_overwrite_false_against_existing_destination() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;
    engine.handle(request(Method::PUT, "/b.txt", &[], b"world")).await;

    let resp = engine
        .handle(request(
            Method::from_bytes(b"MOVE").unwrap(),
            "/a.txt",
            &[("destination", "http://localhost/b.txt"), ("overwrite", "F")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

    let a = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    let b = engine.handle(request(Method::GET, "/b.txt", &[], b"")).await;
    assert_eq!(body_text(a.into_body()).await, "hello");
    assert_eq!(body_text(b.into_body()).await, "world");
}

/// SPEC_FULL.md §4.5's destination-parent precondition: COPY/MOVE to a
/// path whose parent collection doesn't exist is 409, not a pass-through
/// to the backend.
#[tokio::test]
async fn scenario_5b_copy_to_missing_destination_parent_is_409() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;

    let resp = engine
        .handle(request(
            Method::from_bytes(b"COPY").unwrap(),
            "/a.txt",
            &[("destination", "http://localhost/nosuchdir/b.txt")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = engine
        .handle(request(
            Method::from_bytes(b"MOVE").unwrap(),
            "/a.txt",
            &[("destination", "http://localhost/nosuchdir/b.txt")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // MOVE above must not have touched the source.
    let a = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(a.status(), StatusCode::OK);
}

#[tokio::test]
async fn scenario_6_options_on_nonexistent_path_under_root() {
    let engine = engine();
    let resp = engine
        .handle(request(Method::OPTIONS, "/nonexistent", &[], b""))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("DAV").unwrap(), "1,2");
    assert_eq!(resp.headers().get(http::header::ALLOW).unwrap(), "OPTIONS PUT MKCOL");
}

/// SPEC_FULL.md §4.5: the default (unrestricted) method set's `Allow`
/// header differs by resource kind — collections never advertise `PUT`,
/// files do; both advertise `PROPPATCH`, neither advertises `MKCOL`.
#[tokio::test]
async fn scenario_6b_options_allow_differs_for_collection_vs_file_by_default() {
    let engine = engine();
    engine
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;

    let dir_resp = engine
        .handle(request(Method::OPTIONS, "/dir1/", &[], b""))
        .await;
    let dir_allow = dir_resp.headers().get(http::header::ALLOW).unwrap().to_str().unwrap();
    assert!(!dir_allow.contains("PUT"));
    assert!(!dir_allow.contains("MKCOL"));
    assert!(dir_allow.contains("PROPPATCH"));
    assert!(dir_allow.contains("PROPFIND"));

    let file_resp = engine
        .handle(request(Method::OPTIONS, "/a.txt", &[], b""))
        .await;
    let file_allow = file_resp.headers().get(http::header::ALLOW).unwrap().to_str().unwrap();
    assert!(file_allow.contains("PUT"));
    assert!(!file_allow.contains("MKCOL"));
    assert!(file_allow.contains("PROPPATCH"));
}

#[tokio::test]
async fn boundary_delete_is_idempotent_in_kind() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"x")).await;
    let first = engine.handle(request(Method::DELETE, "/a.txt", &[], b"")).await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);
    let second = engine.handle(request(Method::DELETE, "/a.txt", &[], b"")).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn boundary_mkcol_on_existing_is_405_and_with_body_is_415() {
    let engine = engine();
    let mkcol = Method::from_bytes(b"MKCOL").unwrap();
    let first = engine.handle(request(mkcol.clone(), "/dir", &[], b"")).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = engine.handle(request(mkcol.clone(), "/dir", &[], b"")).await;
    assert_eq!(second.status(), StatusCode::METHOD_NOT_ALLOWED);

    let with_body = engine.handle(request(mkcol, "/dir2", &[], b"<not-empty/>")).await;
    assert_eq!(with_body.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn boundary_copy_cross_origin_destination_is_502() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;
    let resp = engine
        .handle(request(
            Method::from_bytes(b"COPY").unwrap(),
            "/a.txt",
            &[("destination", "http://other-host/b.txt")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn boundary_move_depth_1_is_400() {
    let engine = engine();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;
    let resp = engine
        .handle(request(
            Method::from_bytes(b"MOVE").unwrap(),
            "/a.txt",
            &[("destination", "http://localhost/b.txt"), ("depth", "1")],
            b"",
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_creates_then_overwrites_with_no_content() {
    let engine = engine();
    let created = engine.handle(request(Method::PUT, "/a.txt", &[], b"one")).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let overwritten = engine.handle(request(Method::PUT, "/a.txt", &[], b"two")).await;
    assert_eq!(overwritten.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn disallowed_method_is_rejected_before_dispatch() {
    let engine = EngineBuilder::new(MemoryBackend::new(|| 1_700_000_000))
        .acl(AllowAllAcl)
        .methods(DavMethod::WEBDAV_RO)
        .build();

    let resp = engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn options_allow_header_reflects_configured_methods() {
    let engine = EngineBuilder::new(MemoryBackend::new(|| 1_700_000_000))
        .acl(AllowAllAcl)
        .methods(DavMethod::WEBDAV_RO)
        .build();
    engine.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;

    let resp = engine
        .handle(request(Method::OPTIONS, "/", &[], b""))
        .await;
    let allow = resp.headers().get(http::header::ALLOW).unwrap().to_str().unwrap();
    assert!(allow.contains("GET"));
    assert!(!allow.contains("PUT"));
}

#[tokio::test]
async fn post_is_always_method_not_allowed() {
    let engine = engine();
    let resp = engine.handle(request(Method::POST, "/", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unrecognized_method_is_404() {
    let engine = engine();
    let resp = engine
        .handle(request(Method::from_bytes(b"FROBNICATE").unwrap(), "/", &[], b""))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_streams_full_content_with_small_read_buffer() {
    let engine = EngineBuilder::new(MemoryBackend::new(|| 1_700_000_000))
        .acl(AllowAllAcl)
        .read_buf_size(4)
        .build();
    let payload = b"hello, world! this is longer than four bytes";
    engine.handle(request(Method::PUT, "/a.txt", &[], payload)).await;

    let resp = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp.into_body()).await;
    assert_eq!(body.as_bytes(), payload);
}

/// `list` and `read` are independent permissions (SPEC_FULL.md §4.5):
/// a principal with `list` but not `read` can GET a collection (the
/// index render) but not a file, and vice versa.
struct ListOnlyAcl;

impl AclProvider for ListOnlyAcl {
    fn access(&self, _principal: Option<&str>, _abs_path: &str) -> Acl {
        Acl {
            list: true,
            ..Acl::all(false)
        }
    }
}

struct ReadOnlyNoListAcl;

impl AclProvider for ReadOnlyNoListAcl {
    fn access(&self, _principal: Option<&str>, _abs_path: &str) -> Acl {
        Acl {
            read: true,
            ..Acl::all(false)
        }
    }
}

#[tokio::test]
async fn get_list_permission_gates_collections_independently_of_read() {
    let backend = MemoryBackend::new(|| 1_700_000_000);
    let setup = EngineBuilder::new(backend.clone()).acl(AllowAllAcl).build();
    setup
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;

    let engine = EngineBuilder::new(backend).acl(ListOnlyAcl).build();
    let resp = engine
        .handle(request(Method::GET, "/dir1/", &[], b""))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_read_permission_gates_files_independently_of_list() {
    let backend = MemoryBackend::new(|| 1_700_000_000);
    let setup = EngineBuilder::new(backend.clone()).acl(AllowAllAcl).build();
    setup.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;

    let engine = EngineBuilder::new(backend).acl(ReadOnlyNoListAcl).build();
    let resp = engine.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_list_only_forbids_files_and_read_only_forbids_collections() {
    let backend = MemoryBackend::new(|| 1_700_000_000);
    let setup = EngineBuilder::new(backend.clone()).acl(AllowAllAcl).build();
    setup.handle(request(Method::PUT, "/a.txt", &[], b"hello")).await;
    setup
        .handle(request(Method::from_bytes(b"MKCOL").unwrap(), "/dir1", &[], b""))
        .await;

    let list_only = EngineBuilder::new(backend.clone()).acl(ListOnlyAcl).build();
    let resp = list_only.handle(request(Method::GET, "/a.txt", &[], b"")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let read_only_no_list = EngineBuilder::new(backend).acl(ReadOnlyNoListAcl).build();
    let resp = read_only_no_list
        .handle(request(Method::GET, "/dir1/", &[], b""))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
