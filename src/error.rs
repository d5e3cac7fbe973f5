//! Unified error type.

use std::path::PathBuf;

/// The error type returned by aurora's fallible operations.
///
/// Application-level failures (404, 500, ...) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// failures while building an application or serving it: invalid rule
/// patterns, missing or broken templates, bad configuration and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid path template `{template}`: {source}")]
    PathTemplate {
        template: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("rendering `{}`: {source}", .file.display())]
    Render {
        file: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}
