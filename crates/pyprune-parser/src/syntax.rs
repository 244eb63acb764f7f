// ABOUTME: Parser-independent syntax model covering the two Python import statement shapes.
// ABOUTME: Everything else in a file collapses into `Other` nodes that only carry children.

/// One target of an import statement as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// `a.b.c`
    Dotted(String),
    /// `a.b.c as d`. `name` is empty when the parser could not recover it.
    Aliased { name: String, alias: String },
}

impl ImportTarget {
    pub fn dotted(name: impl Into<String>) -> Self {
        Self::Dotted(name.into())
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Aliased {
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// The original dotted name, never the alias. `None` when empty.
    pub fn resolved(&self) -> Option<&str> {
        let name = match self {
            Self::Dotted(name) => name,
            Self::Aliased { name, .. } => name,
        };
        let name = name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Tagged view of a source file's syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// `import a.b.c as d, e`
    PlainImport { targets: Vec<ImportTarget> },
    /// `from a.b import x, y as z`
    FromImport {
        /// Text of the module field; `None` when the statement has none.
        module: Option<String>,
        /// Explicit dotted/aliased children other than the module itself.
        targets: Vec<ImportTarget>,
        /// Generic names list used when `targets` is empty (e.g. `*`).
        names: Vec<ImportTarget>,
    },
    Other { children: Vec<SyntaxNode> },
}

impl SyntaxNode {
    pub fn other(children: Vec<SyntaxNode>) -> Self {
        Self::Other { children }
    }

    /// True if this node is, or has below it, an import statement.
    pub fn contains_imports(&self) -> bool {
        match self {
            Self::PlainImport { .. } | Self::FromImport { .. } => true,
            Self::Other { children } => children.iter().any(SyntaxNode::contains_imports),
        }
    }
}
