use tree_sitter::{Language, Node, Parser, Tree};

/// Thin wrapper over the tree-sitter Java grammar. Cheap to clone; a new
/// `tree_sitter::Parser` is created per parse so one instance can be shared
/// across rayon workers.
#[derive(Clone)]
pub struct JavaSyntax {
    language: Language,
}

impl Default for JavaSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaSyntax {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    pub fn parse(&self, source: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&self.language) {
            tracing::error!("Java grammar rejected by tree-sitter: {}", e);
            return None;
        }
        parser.parse(source, None)
    }
}

pub fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// True when `node` sits in `field` of its parent.
pub fn is_field(node: Node, field: &str) -> bool {
    node.parent()
        .and_then(|p| p.child_by_field_name(field))
        .is_some_and(|f| f.id() == node.id())
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

/// Argument count of an `argument_list`, comments excluded.
pub fn argument_count(args: Option<Node>) -> usize {
    args.map(|a| {
        named_children(a)
            .into_iter()
            .filter(|c| !matches!(c.kind(), "line_comment" | "block_comment"))
            .count()
    })
    .unwrap_or(0)
}
