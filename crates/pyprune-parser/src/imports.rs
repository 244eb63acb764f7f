// ABOUTME: Import Extractor. Walks the syntax model depth-first and emits one `ImportItem`
// ABOUTME: per plain-import target and one per from-import statement, in source order.
use pyprune_core::{ImportItem, Result};
use tree_sitter::Parser;

use crate::{parse_source, ImportTarget, SyntaxNode};

/// Module path used for a from-import that has no module field.
pub const RELATIVE_SENTINEL: &str = ".";

pub fn extract_imports(root: &SyntaxNode) -> Vec<ImportItem> {
    let mut items = Vec::new();
    walk(root, &mut items);
    items
}

fn walk(node: &SyntaxNode, items: &mut Vec<ImportItem>) {
    match node {
        SyntaxNode::PlainImport { targets } => {
            items.extend(
                targets
                    .iter()
                    .filter_map(ImportTarget::resolved)
                    .map(ImportItem::direct),
            );
        }
        SyntaxNode::FromImport {
            module,
            targets,
            names,
        } => {
            let module_path = module
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(RELATIVE_SENTINEL);

            let mut imported = resolved_names(targets);
            if imported.is_empty() {
                imported = resolved_names(names);
            }

            items.push(ImportItem::from_import(module_path, imported));
        }
        SyntaxNode::Other { children } => {
            for child in children {
                walk(child, items);
            }
        }
    }
}

fn resolved_names(targets: &[ImportTarget]) -> Vec<String> {
    targets
        .iter()
        .filter_map(ImportTarget::resolved)
        .map(str::to_string)
        .collect()
}

/// Parse Python source and extract its imports.
pub fn extract_source_imports(parser: &mut Parser, source: &[u8]) -> Result<Vec<ImportItem>> {
    let root = parse_source(parser, source)?;
    Ok(extract_imports(&root))
}
