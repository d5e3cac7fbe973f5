//! Ordered rule aggregation with metadata dispatch.

use super::{Characteristics, Rule};

/// Maps paths and characteristics through many rules at once.
///
/// Each rule is registered with a set of metadata characteristics. Rules are
/// evaluated newest first, so generic rules must be added before specific
/// ones. A `Mapper` is itself a [`Rule`] and can be nested.
#[derive(Default)]
pub struct Mapper {
    rules: Vec<(Box<dyn Rule>, Characteristics)>,
}

impl Mapper {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds `rule` tagged with `metadata`. It takes priority over every rule
    /// added before it.
    pub fn add_rule(&mut self, rule: impl Rule + 'static, metadata: Characteristics) {
        self.rules.push((Box::new(rule), metadata));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules with their metadata, highest priority first.
    fn by_priority(&self) -> impl Iterator<Item = &(Box<dyn Rule>, Characteristics)> {
        self.rules.iter().rev()
    }
}

impl Rule for Mapper {
    /// The first rule that matches wins; its metadata is merged over the
    /// matched characteristics.
    fn match_path(&self, path: &str) -> Option<Characteristics> {
        self.by_priority().find_map(|(rule, metadata)| {
            let mut chars = rule.match_path(path)?;
            chars.merge(metadata);
            Some(chars)
        })
    }

    /// A rule is tried only if every metadata entry is present in
    /// `characteristics` with the same value. Metadata is stripped before the
    /// rule assembles the rest.
    fn assemble(&self, characteristics: &Characteristics) -> Option<String> {
        self.by_priority().find_map(|(rule, metadata)| {
            let mut rest = characteristics.clone();
            for (key, value) in metadata.iter() {
                if rest.get(key) != Some(value) {
                    return None;
                }
                rest.remove(key);
            }
            rule.assemble(&rest)
        })
    }
}
