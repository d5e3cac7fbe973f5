//! Static assets: the files that are a functional part of the application
//! (stylesheets, scripts, images).
//!
//! During development [`Assets`] serves them itself: its [`rule`](Assets::rule)
//! matches any path naming an existing file and its
//! [`handler`](Assets::handler) streams it. In production a fronting proxy
//! usually serves the directory and the application only needs the rule to
//! assemble asset URLs, optionally onto a CDN `base_path`.

use std::path::PathBuf;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, warn};

use crate::handler::Handler;
use crate::mapping::{Characteristics, Rule};
use crate::request::Request;
use crate::response::Response;
use crate::views::{blocking, normalize};

/// Characteristic carrying the asset path.
pub const FILENAME: &str = "filename";

/// Static asset directories plus the base URL assets are published under.
#[derive(Debug, Default)]
pub struct Assets {
    base_path: String,
    paths: Vec<PathBuf>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix for assembled asset URLs, e.g. `/static` or
    /// `https://cdn.example.com/app`. Empty by default.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Adds a directory of asset files. Directories added later shadow
    /// earlier ones.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Maps a request path onto an existing file, newest directory first.
    /// Paths that try to climb out of a directory resolve to nothing.
    pub fn resolve(&self, path_info: &str) -> Option<PathBuf> {
        let relative = normalize(path_info)?;
        self.paths
            .iter()
            .rev()
            .map(|dir| dir.join(&relative))
            .find(|file| file.is_file())
    }

    /// The public URL of asset `filename`.
    pub fn url(&self, filename: &str) -> String {
        if self.base_path.is_empty() {
            return filename.to_owned();
        }
        format!("{}/{}", self.base_path.trim_end_matches('/'), filename.trim_start_matches('/'))
    }

    /// A rule matching every path that names an asset.
    pub fn rule(self: &Arc<Self>) -> AssetRule {
        AssetRule { assets: Arc::clone(self) }
    }

    /// A handler serving the asset named by the `filename` parameter.
    pub fn handler(self: &Arc<Self>) -> impl Handler + use<> {
        let assets = Arc::clone(self);
        move |req: Request| {
            let assets = Arc::clone(&assets);
            async move { assets.serve(req).await }
        }
    }

    /// Responds with the asset file, its guessed content type, length and
    /// modification date. `404` if the file cannot be resolved or read.
    pub async fn serve(&self, req: Request) -> Response {
        let Some(file) = req.param(FILENAME).and_then(|name| blocking(|| self.resolve(name))) else {
            return Response::status(StatusCode::NOT_FOUND);
        };

        let body = match tokio::fs::read(&file).await {
            Ok(body) => body,
            Err(e) => {
                warn!(file = %file.display(), "asset read failed: {e}");
                return Response::status(StatusCode::NOT_FOUND);
            }
        };
        debug!(file = %file.display(), bytes = body.len(), "serving asset");

        let content_type = mime_guess::from_path(&file).first_or_octet_stream();
        let mut builder = Response::builder().header("content-length", &body.len().to_string());
        if let Ok(modified) = tokio::fs::metadata(&file).await.and_then(|m| m.modified()) {
            builder = builder.header("last-modified", &httpdate::fmt_http_date(modified));
        }
        builder.typed(content_type.essence_str(), body)
    }
}

/// [`Rule`] mapping asset paths to `{filename: path}` and back.
pub struct AssetRule {
    assets: Arc<Assets>,
}

impl Rule for AssetRule {
    fn match_path(&self, path: &str) -> Option<Characteristics> {
        blocking(|| self.assets.resolve(path))?;
        Some(Characteristics::new().with(FILENAME, path))
    }

    fn assemble(&self, characteristics: &Characteristics) -> Option<String> {
        characteristics.get(FILENAME).map(|filename| self.assets.url(filename))
    }
}
