//! Namespace-qualified navigation over NF-e DOM trees.
//!
//! Every lookup matches on local name inside the NF-e namespace; elements
//! from other namespaces (e.g. the `ds:Signature` block) are never matched
//! by name.

use roxmltree::Node;

/// Namespace declared by the NF-e schema.
pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

/// Local name of an element, without namespace.
pub fn local_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Whether `node` is the NF-e element `tag`.
pub fn is_nfe(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(NFE_NAMESPACE)
        && local_name(node) == tag
}

/// First child element named `tag`.
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_nfe(*child, tag))
}

/// All child elements named `tag`, in document order.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| is_nfe(*child, tag))
}

/// Descendant reached by a slash-separated path of tag names (`"med/cProdANVISA"`).
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    path.split('/')
        .try_fold(node, |current, part| find_child(current, part))
}

/// All element children, whatever their namespace.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Trimmed text of a present node; a present but empty element gives `""`.
pub fn optional_text(node: Option<Node<'_, '_>>) -> Option<String> {
    node.map(|n| n.text().map(str::trim).unwrap_or_default().to_string())
}
