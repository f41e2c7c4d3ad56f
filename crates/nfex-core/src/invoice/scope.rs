//! Path-tracking cursor over the invoice tree.

use roxmltree::Node;

use crate::error::ExtractionError;
use crate::xml::{element_children, find_by_path, find_child, find_children, local_name, optional_text};

use super::numbers::optional_rounded;

/// An element together with its path from the document container, used in
/// error messages (`det[2]/imposto/ICMS`).
#[derive(Debug, Clone)]
pub(crate) struct Scope<'a, 'input> {
    node: Node<'a, 'input>,
    path: String,
}

impl<'a, 'input> Scope<'a, 'input> {
    pub fn new(node: Node<'a, 'input>, path: impl Into<String>) -> Self {
        Self {
            node,
            path: path.into(),
        }
    }

    pub fn node(&self) -> Node<'a, 'input> {
        self.node
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tag(&self) -> &'a str {
        local_name(self.node)
    }

    fn join(&self, path: &str) -> String {
        format!("{}/{}", self.path, path)
    }

    /// Descendant at `path`, if present.
    pub fn at(&self, path: &str) -> Option<Self> {
        find_by_path(self.node, path).map(|node| Self::new(node, self.join(path)))
    }

    /// Descendant at `path`, or a `MissingElement` error.
    pub fn require(&self, path: &str) -> Result<Self, ExtractionError> {
        self.at(path).ok_or_else(|| self.missing(path))
    }

    /// Children named `tag`, with their 1-based position in the path.
    pub fn children(&self, tag: &'a str) -> impl Iterator<Item = Self> + '_ {
        find_children(self.node, tag)
            .enumerate()
            .map(move |(i, node)| Self::new(node, format!("{}/{}[{}]", self.path, tag, i + 1)))
    }

    /// Optional text at `path`.
    pub fn text(&self, path: &str) -> Option<String> {
        optional_text(find_by_path(self.node, path))
    }

    /// Text at `path`, or a `MissingElement` error.
    pub fn required_text(&self, path: &str) -> Result<String, ExtractionError> {
        self.text(path).ok_or_else(|| self.missing(path))
    }

    /// Optional text at `path`, rounded to `digits`.
    pub fn rounded(&self, path: &str, digits: u32) -> Result<Option<String>, ExtractionError> {
        optional_rounded(find_by_path(self.node, path), digits, &self.join(path))
    }

    /// Optional numeric text at `path`: rounded when `digits` is given,
    /// verbatim otherwise.
    pub fn amount(&self, path: &str, digits: Option<u32>) -> Result<Option<String>, ExtractionError> {
        match digits {
            Some(digits) => self.rounded(path, digits),
            None => Ok(self.text(path)),
        }
    }

    /// All element children, in any namespace.
    pub fn elements(&self) -> impl Iterator<Item = Node<'a, 'input>> + use<'a, 'input> {
        element_children(self.node)
    }

    /// The single element child of a tax container.
    ///
    /// No element children gives `None`; more than one is an error, since the
    /// regime would be ambiguous. Children are counted in any namespace, so a
    /// foreign element next to the regime also makes it ambiguous.
    pub fn single_child(&self) -> Result<Option<Self>, ExtractionError> {
        let children: Vec<_> = self.elements().collect();
        match children.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(Self::new(*only, self.join(local_name(*only))))),
            _ => Err(ExtractionError::MultipleChildren {
                container: self.tag().to_string(),
                path: self.path.clone(),
                tags: children.iter().map(|n| local_name(*n).to_string()).collect(),
            }),
        }
    }

    /// Whether an element child named `tag` exists.
    pub fn has(&self, tag: &str) -> bool {
        find_child(self.node, tag).is_some()
    }

    fn missing(&self, path: &str) -> ExtractionError {
        ExtractionError::MissingElement {
            element: path.to_string(),
            context: self.path.clone(),
        }
    }
}
