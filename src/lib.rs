//! ## Async WebDAV (RFC 4918) method engine
//!
//! WebDAV is HTTP (GET/HEAD/PUT/DELETE) plus a set of extension methods
//! (PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK) for managing
//! collections, inspecting properties, and relocating resources. This
//! crate implements the dispatch and status-code logic for those
//! methods (DAV classes 1 and 2) against a pluggable resource backend,
//! without owning the HTTP transport, authentication, or directory-index
//! rendering itself.
//!
//! ## Shape
//!
//! - [`resource`]: the [`resource::DavResource`] trait — one handle per
//!   node in the exported tree — and the [`resource::Backend`] that
//!   resolves paths to handles. A local-filesystem backend
//!   ([`resource::local::LocalBackend`]) and an in-memory one
//!   ([`resource::memory::MemoryBackend`]) are included.
//! - [`engine`]: [`engine::EngineBuilder`]/[`engine::DavEngine`], the
//!   request dispatcher. `DavEngine::handle` takes an `http::Request`
//!   with a collected body; `DavEngine::handle_stream` takes one whose
//!   body is an [`http_body::Body`].
//! - [`acl`]: the permission model consulted once per request.
//! - [`props`]: the live-property provider (`getetag`, `getcontentlength`,
//!   `creationdate`, `getlastmodified`, `resourcetype`, `displayname`).
//!   No dead-property storage.
//! - [`lock`]: a `LockManager` seam; the shipped implementation is a
//!   no-op, matching DAV class 2's LOCK/UNLOCK surface without
//!   persistence or enforcement.
//! - [`path`]: path joining, Clark-notation helpers, and [`path::DavPath`].
//! - [`xml`]: PROPFIND request parsing and multi-status response framing.
//! - [`index`]: the directory-index rendering seam (full HTML browsing
//!   is out of scope; this is just enough to answer GET on a collection).
//! - [`request`]: adapts an `http::Request`'s parts into what handlers need.
//! - [`body`]: the `Body` type handlers return, implementing both
//!   [`futures_util::Stream`] and [`http_body::Body`].
//!
//! ## Example
//!
//! ```no_run
//! use dav_engine::engine::EngineBuilder;
//! use dav_engine::resource::local::LocalBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = EngineBuilder::new(LocalBackend::new("/srv/share", false)).build();
//!     // engine.handle(request).await inside your HTTP server's request loop.
//!     let _ = engine;
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod acl;
pub mod body;
pub mod engine;
pub mod errors;
pub mod index;
pub mod lock;
pub mod path;
pub mod props;
pub mod request;
pub mod resource;
mod util;
pub mod xml;

pub use crate::engine::{DavEngine, EngineBuilder};
pub use crate::errors::{DavError, DavResult};
pub use crate::path::DavPath;
pub use crate::util::DavMethod;
