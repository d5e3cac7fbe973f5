//! Regular-expression rules.

use std::sync::LazyLock;

use regex::Regex;

use super::{Characteristics, Rule, with_query};
use crate::error::Error;

/// Group syntax a [`Route`] can substitute back into a path: `(?P<name>\w+)`,
/// `(?P<name>\d+)` and any other single class escape followed by `+`.
static DIALECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\?P<(\w+)>\\(\w+)\+\)").expect("dialect pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(String),
}

/// A rule backed by a regular expression.
///
/// The pattern is split at the first dialect group: everything before it is a
/// literal prefix compared verbatim, everything after it is compiled as a
/// regex anchored to the whole remaining path. Named groups become
/// characteristics; `defaults` fill groups that are absent or empty.
///
/// Only groups written in the dialect (`(?P<name>\w+)`, `(?P<name>\d+)`, ...)
/// can be filled back in by [`assemble`](Rule::assemble). Other regex syntax
/// in the pattern still matches but is copied literally when assembling, so
/// a route using it will not round-trip.
///
/// ```rust
/// use aurora::mapping::{Characteristics, Route, Rule};
///
/// let route = Route::with_defaults(
///     r"/(?P<id>\d+)/(?P<name>\w+)",
///     Characteristics::from([("name", "name")]),
/// ).unwrap();
///
/// assert_eq!(route.assemble(&Characteristics::from([("id", "1")])).as_deref(), Some("/1/name"));
/// assert!(route.match_path("/a/111").is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Route {
    prefix: String,
    matcher: Regex,
    segments: Vec<Segment>,
    defaults: Characteristics,
}

impl Route {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Self::with_defaults(pattern, Characteristics::new())
    }

    /// Compiles `pattern`; `defaults` supply values for optional groups.
    pub fn with_defaults(pattern: &str, defaults: Characteristics) -> Result<Self, Error> {
        let split = DIALECT.find(pattern).map_or(pattern.len(), |m| m.start());
        let (prefix, suffix) = pattern.split_at(split);

        let matcher = Regex::new(&format!("^(?:{suffix})$"))
            .map_err(|source| Error::Pattern { pattern: pattern.to_owned(), source })?;

        let template = suffix.trim_matches(|c| matches!(c, '^' | '$' | '*'));
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in DIALECT.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
            if whole.start() > last {
                segments.push(Segment::Literal(unescape(&template[last..whole.start()])));
            }
            segments.push(Segment::Group(name.as_str().to_owned()));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(unescape(&template[last..])));
        }

        Ok(Self { prefix: unescape(prefix), matcher, segments, defaults })
    }

    /// The literal leading part of the pattern.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Rule for Route {
    fn match_path(&self, path: &str) -> Option<Characteristics> {
        // Cheap literal check before running the regex.
        let rest = path.strip_prefix(self.prefix.as_str())?;
        let caps = self.matcher.captures(rest)?;

        let mut chars = self.defaults.clone();
        for name in self.matcher.capture_names().flatten() {
            match caps.name(name) {
                Some(m) if !m.as_str().is_empty() => {
                    chars.insert(name, m.as_str());
                }
                _ => {}
            }
        }
        Some(chars)
    }

    fn assemble(&self, characteristics: &Characteristics) -> Option<String> {
        let mut rest = self.defaults.clone();
        rest.merge(characteristics);

        let mut path = self.prefix.clone();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Group(name) => path.push_str(&rest.remove(name)?),
            }
        }
        Some(with_query(path, &rest))
    }
}

/// Drops the backslash from escaped punctuation (`\.` → `.`).
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Route {
        Route::with_defaults(
            r"/(?P<id>\d+)/(?P<name>\w+)",
            Characteristics::from([("name", "name")]),
        )
        .unwrap()
    }

    #[test]
    fn match_success() {
        assert_eq!(
            route().match_path("/1/name"),
            Some(Characteristics::from([("id", "1"), ("name", "name")])),
        );
    }

    #[test]
    fn match_invalid_type() {
        let route = route();
        assert_eq!(route.match_path("/a/111"), None);
        assert_eq!(route.match_path("/1/1 11"), None);
        assert_eq!(route.match_path("/1/a aaa"), None);
    }

    #[test]
    fn match_requires_prefix() {
        let route = Route::new(r"/posts/(?P<id>\d+)").unwrap();
        assert_eq!(route.prefix(), "/posts/");
        assert_eq!(route.match_path("/pages/1"), None);
        assert_eq!(route.match_path("/posts/1"), Some(Characteristics::from([("id", "1")])));
    }

    #[test]
    fn match_is_anchored_at_the_end() {
        let route = Route::new(r"/(?P<id>\d+)").unwrap();
        assert_eq!(route.match_path("/1/extra"), None);
    }

    #[test]
    fn empty_capture_keeps_default() {
        let route = Route::with_defaults(
            r"/(?P<id>\d+)(?P<format>\.?\w*)",
            Characteristics::from([("format", ".html")]),
        )
        .unwrap();
        assert_eq!(
            route.match_path("/7"),
            Some(Characteristics::from([("id", "7"), ("format", ".html")])),
        );
        assert_eq!(
            route.match_path("/7.json"),
            Some(Characteristics::from([("id", "7"), ("format", ".json")])),
        );
    }

    #[test]
    fn literal_pattern_matches_exactly() {
        let route = Route::new("/").unwrap();
        assert_eq!(route.match_path("/"), Some(Characteristics::new()));
        assert_eq!(route.match_path("/1"), None);
        assert_eq!(route.assemble(&Characteristics::new()).as_deref(), Some("/"));
    }

    #[test]
    fn assemble_missing_argument() {
        assert_eq!(route().assemble(&Characteristics::from([("name", "name")])), None);
    }

    #[test]
    fn assemble_with_default_arguments() {
        assert_eq!(
            route().assemble(&Characteristics::from([("id", "1")])).as_deref(),
            Some("/1/name"),
        );
    }

    #[test]
    fn assemble_appends_extra_characteristics_as_query() {
        let chars = Characteristics::new()
            .with("name", "r2")
            .with("id", 2)
            .with("extra", "extra_value");
        assert_eq!(route().assemble(&chars).as_deref(), Some("/2/r2?extra=extra_value"));
    }

    #[test]
    fn assemble_unescapes_literals() {
        let route = Route::new(r"/feed/(?P<kind>\w+)\.xml").unwrap();
        assert_eq!(route.match_path("/feed/atom.xml"), Some(Characteristics::from([("kind", "atom")])));
        assert_eq!(
            route.assemble(&Characteristics::from([("kind", "rss")])).as_deref(),
            Some("/feed/rss.xml"),
        );
    }

    #[test]
    fn assemble_reverses_match() {
        let route = route();
        for path in ["/1/name", "/42/hello_world"] {
            let chars = route.match_path(path).unwrap();
            assert_eq!(route.assemble(&chars).as_deref(), Some(path));
        }
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(matches!(Route::new(r"/(?P<id>\d+)/(unclosed"), Err(Error::Pattern { .. })));
    }
}
