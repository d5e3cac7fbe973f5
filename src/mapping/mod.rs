//! Bidirectional URL mapping.
//!
//! A [`Rule`] maps a request path to a set of named [`Characteristics`] and
//! back again. [`Route`] does it with a regular expression, [`Template`] with
//! a `{name}` path template, and [`DefaultRule`] catches everything. A
//! [`Mapper`] strings rules together, tags each with metadata, and tries them
//! newest first:
//!
//! ```rust
//! use aurora::mapping::{Characteristics, Mapper, Route, Rule};
//!
//! let mut mapper = Mapper::new();
//! mapper.add_rule(Route::new("/").unwrap(), Characteristics::from([("_name", "index")]));
//! mapper.add_rule(Route::new(r"/(?P<id>\d+)").unwrap(), Characteristics::from([("_name", "post")]));
//!
//! let matched = mapper.match_path("/7").unwrap();
//! assert_eq!(matched.get("id"), Some("7"));
//! assert_eq!(matched.get("_name"), Some("post"));
//!
//! let path = mapper.assemble(&Characteristics::from([("_name", "post"), ("id", "7")]));
//! assert_eq!(path.as_deref(), Some("/7"));
//! ```

mod characteristics;
mod default;
mod mapper;
mod route;
mod template;

pub use characteristics::Characteristics;
pub use default::DefaultRule;
pub use mapper::Mapper;
pub use route::Route;
pub use template::Template;

/// Maps a request path and its characteristics back and forth.
///
/// Both directions report failure with `None`: a path the rule does not
/// recognise, or characteristics it cannot turn into a path.
pub trait Rule: Send + Sync {
    /// Maps a request path into the characteristics that identify it.
    fn match_path(&self, path: &str) -> Option<Characteristics>;

    /// Maps characteristics back into a request path.
    fn assemble(&self, characteristics: &Characteristics) -> Option<String>;
}

/// Appends leftover characteristics to `path` as a query string.
pub(crate) fn with_query(mut path: String, rest: &Characteristics) -> String {
    if !rest.is_empty() {
        path.push('?');
        path.push_str(&rest.to_query());
    }
    path
}
