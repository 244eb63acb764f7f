// ABOUTME: Lowers a tree-sitter Python tree into the `SyntaxNode` model.
// ABOUTME: Only import statements are kept; subtrees without imports are dropped.
use tree_sitter::{Node, TreeCursor};

use crate::{ImportTarget, SyntaxNode};

/// Node kinds whose children can be statements. Imports never sit inside
/// expressions, so lowering only descends into these.
const STATEMENT_CONTAINERS: &[&str] = &[
    "module",
    "block",
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "for_statement",
    "while_statement",
    "function_definition",
    "class_definition",
    "decorated_definition",
    "match_statement",
    "case_clause",
];

pub struct ImportLowering<'a> {
    source: &'a [u8],
}

impl<'a> ImportLowering<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source }
    }

    pub fn lower(&self, node: Node) -> SyntaxNode {
        let mut cursor = node.walk();
        self.lower_node(&mut cursor)
    }

    fn lower_node(&self, cursor: &mut TreeCursor) -> SyntaxNode {
        let node = cursor.node();

        match node.kind() {
            "import_statement" => return self.plain_import(node),
            "import_from_statement" => return self.from_import(node),
            kind if !STATEMENT_CONTAINERS.contains(&kind) => {
                return SyntaxNode::other(Vec::new());
            }
            _ => {}
        }

        let mut children = Vec::new();
        if cursor.goto_first_child() {
            loop {
                let child = self.lower_node(cursor);
                if child.contains_imports() {
                    children.push(child);
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }

        SyntaxNode::other(children)
    }

    fn plain_import(&self, node: Node) -> SyntaxNode {
        let mut cursor = node.walk();
        let targets = node
            .named_children(&mut cursor)
            .filter_map(|child| self.target(child))
            .collect();

        SyntaxNode::PlainImport { targets }
    }

    fn from_import(&self, node: Node) -> SyntaxNode {
        let module_node = node.child_by_field_name("module_name");
        let module = module_node.map(|m| self.text(m).to_string());

        let mut cursor = node.walk();
        let targets = node
            .named_children(&mut cursor)
            .filter(|child| Some(child.id()) != module_node.map(|m| m.id()))
            .filter_map(|child| self.target(child))
            .collect();

        let mut cursor = node.walk();
        let mut names: Vec<ImportTarget> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|child| self.target(child))
            .collect();

        let mut cursor = node.walk();
        if node
            .named_children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import")
        {
            names.push(ImportTarget::dotted("*"));
        }

        SyntaxNode::FromImport {
            module,
            targets,
            names,
        }
    }

    fn target(&self, node: Node) -> Option<ImportTarget> {
        match node.kind() {
            "dotted_name" => Some(ImportTarget::dotted(self.text(node))),
            "aliased_import" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or("");
                let alias = node
                    .child_by_field_name("alias")
                    .map(|n| self.text(n))
                    .unwrap_or("");
                Some(ImportTarget::aliased(name, alias))
            }
            _ => None,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }
}
