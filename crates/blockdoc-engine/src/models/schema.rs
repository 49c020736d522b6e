use std::collections::{HashMap, HashSet};

use super::document::Document;
use super::position::Position;

/// Block type names every default container accepts.
const DEFAULT_BLOCKS: &[&str] = &[
    "paragraph",
    "heading1",
    "heading2",
    "heading3",
    "heading4",
    "heading5",
    "heading6",
    "listItem",
    "codeBlock",
];

/// Rules deciding which node types may appear inside which containers.
///
/// Rules are keyed by schema names (see [`NodeKind::schema_name`]), so a
/// schema can also be assembled from configuration.
///
/// [`NodeKind::schema_name`]: super::NodeKind::schema_name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    allowed_in: HashMap<String, HashSet<String>>,
}

impl Schema {
    /// A schema that allows nothing anywhere.
    pub fn empty() -> Self {
        Self {
            allowed_in: HashMap::new(),
        }
    }

    /// Build a schema from `(container, [children])` rules.
    pub fn from_rules<I, C, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = (C, Vec<S>)>,
        C: Into<String>,
        S: Into<String>,
    {
        let mut schema = Self::empty();
        for (container, children) in rules {
            let container = container.into();
            for child in children {
                schema.allow(child, container.clone());
            }
        }
        schema
    }

    pub fn allow(&mut self, child: impl Into<String>, inside: impl Into<String>) -> &mut Self {
        self.allowed_in
            .entry(inside.into())
            .or_default()
            .insert(child.into());
        self
    }

    pub fn disallow(&mut self, child: &str, inside: &str) -> &mut Self {
        if let Some(children) = self.allowed_in.get_mut(inside) {
            children.remove(child);
        }
        self
    }

    /// Whether `name` may be placed at `position`.
    ///
    /// Positions whose parent is missing from the document or is not a
    /// container are never valid.
    pub fn check(&self, name: &str, position: &Position, doc: &Document) -> bool {
        let Some(parent) = doc.node(position.parent) else {
            return false;
        };
        if !parent.kind().is_container() || position.offset > parent.children().len() {
            return false;
        }
        self.allows(name, parent.kind().schema_name())
    }

    /// Raw rule lookup without a position.
    pub fn allows(&self, name: &str, inside: &str) -> bool {
        self.allowed_in
            .get(inside)
            .is_some_and(|children| children.contains(name))
    }
}

impl Default for Schema {
    fn default() -> Self {
        let mut schema = Self::empty();
        for container in ["$root", "blockQuote"] {
            for block in DEFAULT_BLOCKS {
                schema.allow(*block, container);
            }
            schema.allow("blockQuote", container);
        }
        schema
    }
}
