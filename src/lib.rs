//! Trellis is a small, synchronous HTTP routing and dispatch framework.
//! It resolves a request's method and path against an ordered table of
//! regular-expression routes, runs the matching route's middleware chain
//! over a fresh request context, and hands the result to the route's
//! handler, which builds a [`Response`] in one of three formats: `raw`,
//! `html`, or `json` (wrapped in a status envelope).
//!
//! Trellis does not own a socket.  The host hands it a method and a URI (or
//! an [`http::Request`]), and writes out the [`Response`] it gets back,
//! either through [`Response::emit`] or by converting it into an
//! [`http::Response`].
//!
//! # Getting Started
//! ```toml
//! trellis = "0.1.0"
//! ```
//!
//! # Examples
//! ```rust
//! use trellis::*;
//!
//! fn show_user(params: Params) -> Result<Response, anyhow::Error> {
//!     let id = params.parse::<u64>("id").ok_or_else(|| {
//!         TrellisError::http(http::StatusCode::BAD_REQUEST, "invalid id")
//!     })?;
//!     Ok(Response::json(&serde_json::json!({ "id": id }))?)
//! }
//!
//! fn main() -> Result<(), anyhow::Error> {
//!     let mut app = trellis::app();
//!     app.router_mut()
//!         .get("/", |_: Params| Response::html("<h1>hello</h1>"), ())?
//!         .get("/users/{id}", show_user, ())?;
//!     app.prepare()?;
//!
//!     let mut out = vec![];
//!     app.serve("GET", "/users/12?expand=true", &mut out)?;
//!     assert!(String::from_utf8(out)?.ends_with(r#"{"status":"success","data":{"id":12}}"#));
//!
//!     let response = app.handle("GET", "/users/twelve")?;
//!     assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
//!     Ok(())
//! }
//! ```
#![deny(clippy::correctness)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod app;
mod config;
pub mod endpoint;
mod error;
mod method;
pub mod middleware;
mod request;
mod response;
mod router;

pub use self::app::App;
pub use self::config::{Config, DEBUG_MODE};
pub use self::endpoint::{Controllers, Endpoint, IntoHandler};
pub use self::error::TrellisError;
pub use self::method::{Method, UnsupportedMethod};
pub use self::middleware::{IntoMiddlewareChain, Middleware, MiddlewareRef, Middlewares};
pub use self::request::{Params, Request, RESERVED_KEY};
pub use self::response::{view, Format, IntoResponse, Response};
pub use self::router::{Dispatcher, Resolved, Route, Router};
pub use ::http;

/// The result type for endpoints.  This is a shortcut for
/// `Result<Response, anyhow::Error>`.
pub type Result<R = Response, E = anyhow::Error> = std::result::Result<R, E>;

#[must_use]
#[inline]
/// This creates a new application, in production mode.  This is a shortcut
/// for [`App::default`].
pub fn app() -> App {
    App::default()
}
