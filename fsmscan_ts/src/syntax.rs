use std::fmt;
use tree_sitter::Node;

/// Node kinds that only wrap an expression without changing what it refers to.
const TRANSPARENT: [&str; 4] = [
    "parenthesized_expression",
    "as_expression",
    "satisfies_expression",
    "non_null_expression",
];

/// A syntax-tree node together with the text it was parsed from.
#[derive(Clone, Copy)]
pub struct Syntax<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> Syntax<'a> {
    pub(crate) fn new(node: Node<'a>, source: &'a str) -> Self {
        Syntax { node, source }
    }

    /// Grammar kind of the node, e.g. `call_expression`.
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Source text spanned by the node.
    pub fn text(&self) -> &'a str {
        self.node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// 1-based line where the node starts.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    pub fn field(&self, name: &str) -> Option<Syntax<'a>> {
        self.node
            .child_by_field_name(name)
            .map(|node| Syntax::new(node, self.source))
    }

    /// Named children, comments excluded.
    pub fn named_children(&self) -> Vec<Syntax<'a>> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .filter(|node| node.kind() != "comment")
            .map(|node| Syntax::new(node, self.source))
            .collect()
    }

    pub fn first_named_child(&self) -> Option<Syntax<'a>> {
        self.named_children().into_iter().next()
    }

    /// Whether one of the direct children, named or not, has the given kind.
    /// Used for keyword tokens such as `static`.
    pub fn has_child(&self, kind: &str) -> bool {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .any(|node| node.kind() == kind)
    }

    /// Looks through parentheses, `as`/`satisfies` casts and non-null assertions.
    pub fn unwrap_transparent(self) -> Syntax<'a> {
        let mut syntax = self;
        while TRANSPARENT.contains(&syntax.kind()) {
            match syntax.first_named_child() {
                Some(inner) => syntax = inner,
                None => break,
            }
        }
        syntax
    }
}

impl fmt::Debug for Syntax<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}` (line {})", self.kind(), self.text(), self.line())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Syntax;
    use crate::SourceFile;

    pub(crate) fn parse(source: &str) -> SourceFile {
        SourceFile::parse("test.ts", source).expect("parse test source")
    }

    /// Initializer of `const <name> = ...` anywhere in the file.
    pub(crate) fn value_of<'a>(file: &'a SourceFile, name: &str) -> Syntax<'a> {
        find_declarator(file.root(), name)
            .and_then(|declarator| declarator.field("value"))
            .unwrap_or_else(|| panic!("no declarator `{name}`"))
    }

    fn find_declarator<'a>(node: Syntax<'a>, name: &str) -> Option<Syntax<'a>> {
        if node.kind() == "variable_declarator"
            && node.field("name").is_some_and(|ident| ident.text() == name)
        {
            return Some(node);
        }
        node.named_children()
            .into_iter()
            .find_map(|child| find_declarator(child, name))
    }
}
