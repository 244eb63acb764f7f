// ABOUTME: Binds the Python tree-sitter grammar to the configured source extensions.
// ABOUTME: Builds parsers and turns source bytes into the parser-independent syntax model.
use pyprune_core::{PruneError, Result};
use std::path::Path;
use tree_sitter::{Language, Parser};

use crate::{ImportLowering, SyntaxNode};

pub struct LanguageConfig {
    pub language: Language,
    pub file_extensions: Vec<String>,
}

pub struct LanguageRegistry {
    config: LanguageConfig,
}

impl LanguageRegistry {
    pub fn new<I, S>(file_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let file_extensions = file_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .collect();

        Self {
            config: LanguageConfig {
                language: tree_sitter_python::LANGUAGE.into(),
                file_extensions,
            },
        }
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.file_extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    pub fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.config.language)
            .map_err(|e| PruneError::Parse(format!("Failed to load Python grammar: {e}")))?;
        Ok(parser)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new(["py"])
    }
}

/// Parse one file's bytes into the syntax model.
///
/// A tree that tree-sitter could only build through error recovery counts as
/// a parse failure, as does a parser that gives up.
pub fn parse_source(parser: &mut Parser, source: &[u8]) -> Result<SyntaxNode> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| PruneError::Parse("Failed to parse file".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(PruneError::Parse(format!(
            "Syntax error near line {}",
            first_error_line(root)
        )));
    }

    Ok(ImportLowering::new(source).lower(root))
}

fn first_error_line(root: tree_sitter::Node) -> usize {
    let mut node = root;
    while !(node.is_error() || node.is_missing()) {
        let mut cursor = node.walk();
        let next = node
            .children(&mut cursor)
            .find(|child| child.has_error() || child.is_missing());
        match next {
            Some(child) => node = child,
            None => break,
        }
    }
    node.start_position().row + 1
}
