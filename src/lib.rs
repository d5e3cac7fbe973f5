//! # aurora
//!
//! A small web framework built around a bidirectional URL mapper.
//!
//! Paths are mapped to named characteristics by [`mapping`] rules, and the
//! same rules turn characteristics back into URLs. An [`Application`] tags
//! each rule with the name of the handler it dispatches to, so generating a
//! link to a handler is one [`Request::url_for`] call away.
//!
//! Around that core sit thin components over established crates:
//!
//! - [`Server`]: hyper + tokio, graceful shutdown
//! - [`Views`]: Tera templates looked up by name
//! - [`Layout`]: page fragments rendered inside a shared layout
//! - [`SessionProvider`]: signed-cookie sessions with server-side data
//! - [`Assets`]: static files served in development, URLs in production
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aurora::mapping::{Characteristics, Route};
//! use aurora::{Application, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Application::new()
//!         .route(Route::new("/").unwrap(), "index", index)
//!         .route(Route::new(r"/posts/(?P<id>\d+)").unwrap(), "show_post", show_post);
//!
//!     Server::bind("0.0.0.0:8008").unwrap().serve(app).await.unwrap();
//! }
//!
//! async fn index(req: Request) -> Response {
//!     let link = req.url_for(&Characteristics::from([("_handler", "show_post"), ("id", "1")]));
//!     Response::html(format!(r#"<a href="{}">first post</a>"#, link.unwrap_or_default()))
//! }
//!
//! async fn show_post(req: Request) -> Response {
//!     Response::text(format!("post {}", req.param("id").unwrap_or("?")))
//! }
//! ```

mod application;
mod assets;
mod config;
mod error;
mod handler;
mod layout;
mod request;
mod response;
mod server;
mod session;
mod views;

pub mod mapping;

pub use application::{Application, HANDLER, NOT_FOUND};
pub use assets::{AssetRule, Assets, FILENAME};
pub use config::{AssetsConfig, Config, SessionConfig, ViewsConfig};
pub use error::Error;
pub use handler::{Handler, ResponseFuture};
pub use layout::{Layout, PARTIAL, partial};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;
pub use session::{Session, SessionProvider};
pub use views::{Context, DEFAULT_MIME_TYPE, Engine, TeraEngine, Views};
