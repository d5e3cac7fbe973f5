//! Path-template rules.

use matchit::Router as MatchitRouter;

use super::{Characteristics, Rule, with_query};
use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A rule backed by a path template such as `/posts/{id}` or
/// `/static/{*path}`.
///
/// The template is compiled once into a [`matchit`] matcher and a list of
/// segments for assembly, so unlike [`Route`](super::Route) every placeholder
/// round-trips. `{{` and `}}` stand for literal braces.
///
/// ```rust
/// use aurora::mapping::{Characteristics, Rule, Template};
///
/// let rule = Template::new("/posts/{id}").unwrap();
/// let chars = rule.match_path("/posts/9").unwrap();
/// assert_eq!(chars.get("id"), Some("9"));
/// assert_eq!(rule.assemble(&chars).as_deref(), Some("/posts/9"));
/// ```
pub struct Template {
    matcher: MatchitRouter<()>,
    segments: Vec<Segment>,
    defaults: Characteristics,
}

impl Template {
    pub fn new(template: &str) -> Result<Self, Error> {
        Self::with_defaults(template, Characteristics::new())
    }

    pub fn with_defaults(template: &str, defaults: Characteristics) -> Result<Self, Error> {
        let mut matcher = MatchitRouter::new();
        matcher
            .insert(template, ())
            .map_err(|source| Error::PathTemplate { template: template.to_owned(), source })?;
        Ok(Self { matcher, segments: parse(template), defaults })
    }
}

impl Rule for Template {
    fn match_path(&self, path: &str) -> Option<Characteristics> {
        let matched = self.matcher.at(path).ok()?;
        let mut chars = self.defaults.clone();
        for (key, value) in matched.params.iter() {
            chars.insert(key, value);
        }
        Some(chars)
    }

    fn assemble(&self, characteristics: &Characteristics) -> Option<String> {
        let mut rest = self.defaults.clone();
        rest.merge(characteristics);

        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Param(name) => path.push_str(&rest.remove(name)?),
            }
        }
        Some(with_query(path, &rest))
    }
}

/// Splits a matchit template into literal text and parameter names.
fn parse(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                literal.push(c);
                chars.next();
            }
            ('{', _) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                segments.push(Segment::Param(name.trim_start_matches('*').to_owned()));
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_params_and_escapes() {
        assert_eq!(
            parse("/a/{id}/b{{x}}/{*rest}"),
            vec![
                Segment::Literal("/a/".into()),
                Segment::Param("id".into()),
                Segment::Literal("/b{x}/".into()),
                Segment::Param("rest".into()),
            ],
        );
    }

    #[test]
    fn matches_params() {
        let rule = Template::new("/users/{id}/posts/{post}").unwrap();
        assert_eq!(
            rule.match_path("/users/4/posts/hello"),
            Some(Characteristics::from([("id", "4"), ("post", "hello")])),
        );
        assert_eq!(rule.match_path("/users/4"), None);
    }

    #[test]
    fn catch_all_round_trips() {
        let rule = Template::new("/static/{*path}").unwrap();
        let chars = rule.match_path("/static/css/site.css").unwrap();
        assert_eq!(chars.get("path"), Some("css/site.css"));
        assert_eq!(rule.assemble(&chars).as_deref(), Some("/static/css/site.css"));
    }

    #[test]
    fn assemble_uses_defaults_and_renders_query() {
        let rule = Template::with_defaults(
            "/archive/{year}",
            Characteristics::from([("year", "2024")]),
        )
        .unwrap();
        assert_eq!(rule.assemble(&Characteristics::new()).as_deref(), Some("/archive/2024"));
        assert_eq!(
            rule.assemble(&Characteristics::from([("year", "2011"), ("page", "2")])).as_deref(),
            Some("/archive/2011?page=2"),
        );
    }

    #[test]
    fn assemble_missing_param() {
        let rule = Template::new("/posts/{id}").unwrap();
        assert_eq!(rule.assemble(&Characteristics::new()), None);
    }

    #[test]
    fn invalid_template_is_an_error() {
        assert!(matches!(Template::new("/{*rest}/more"), Err(Error::PathTemplate { .. })));
    }
}
