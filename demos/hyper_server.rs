//! Minimal smoke-test binary: serves a directory over WebDAV using
//! `hyper` as the transport. Not part of the published library surface —
//! binding to a concrete HTTP server is a caller concern (SPEC_FULL.md
//! §1 Non-goals). Analogous to the teacher's own `examples/hyper.rs`.
//!
//! Run with: `cargo run --example hyper-server -- <root-dir> <port>`

use std::convert::Infallible;
use std::net::SocketAddr;

use dav_engine::engine::{DavEngine, EngineBuilder};
use dav_engine::resource::local::LocalBackend;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};

async fn handle(engine: DavEngine, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let resp = engine.handle_stream(req).await;
    let (parts, body) = resp.into_parts();
    Ok(Response::from_parts(parts, Body::wrap_stream(body)))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| ".".to_string());
    let port: u16 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4918);

    let engine = EngineBuilder::new(LocalBackend::new(root, false)).build();

    let make_svc = make_service_fn(move |_conn| {
        let engine = engine.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(engine.clone(), req))) }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let server = Server::bind(&addr).serve(make_svc);
    log::info!("listening on {addr}");
    if let Err(e) = server.await {
        log::error!("server error: {e}");
    }
}
