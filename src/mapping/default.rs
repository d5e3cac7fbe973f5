//! The catch-all rule.

use super::{Characteristics, Rule};

/// A rule that matches every path and never assembles one.
///
/// Register it first on a [`Mapper`](super::Mapper) so every more specific
/// rule shadows it. [`Application`](crate::Application) uses it to route
/// unmapped requests to the `not_found` handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRule;

impl Rule for DefaultRule {
    fn match_path(&self, _path: &str) -> Option<Characteristics> {
        Some(Characteristics::new())
    }

    fn assemble(&self, _characteristics: &Characteristics) -> Option<String> {
        None
    }
}
