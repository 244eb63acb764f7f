// Requirements manifest grammar and lossless line model.
//
// A requirement line looks like `name[extras] [comparator version] [; marker] [# comment]`.
// Every line keeps its raw text and terminator so kept lines are written back byte-for-byte.

use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::{PruneError, Result};

/// Compiled patterns used to read requirement names.
///
/// Built once per run and handed to whatever needs to parse manifest lines
/// or requirement specifiers.
#[derive(Debug, Clone)]
pub struct ManifestGrammar {
    /// Terminates the requirement key (name plus extras).
    key_end: Regex,
    /// Leading distribution name of a requirement specifier.
    leading_name: Regex,
}

impl ManifestGrammar {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PruneError::Config(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            key_end: compile(r"[<>=~!;#@]")?,
            leading_name: compile(r"^\s*([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)")?,
        })
    }

    /// Requirement key of a manifest line: the name including any `[extras]`
    /// suffix. Empty for blank and comment-only lines.
    pub fn requirement_key(&self, line: &str) -> String {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return String::new();
        }
        let key = match self.key_end.find(line) {
            Some(m) => &line[..m.start()],
            None => line,
        };
        key.trim().to_string()
    }

    /// Name of a declared requirement (`Requires-Dist` style) with version
    /// comparators, extras and markers stripped, lower-cased.
    pub fn requirement_name(&self, specifier: &str) -> Option<String> {
        self.leading_name
            .captures(specifier)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    }
}

/// PEP 503 normalised package name: lower-cased, runs of `-`, `_` and `.`
/// collapsed to a single `-`.
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(ch.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Split `name[extra1,extra2]` into the plain name and the extras.
pub fn split_extras(key: &str) -> (&str, Vec<String>) {
    match key.find('[') {
        Some(open) => {
            let name = key[..open].trim();
            let rest = &key[open + 1..];
            let inner = rest.split(']').next().unwrap_or("");
            let extras = inner
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
            (name, extras)
        }
        None => (key.trim(), Vec::new()),
    }
}

/// A manifest line that names a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub raw_line: String,
    pub line_index: usize,
    /// Lookup key, extras suffix included (`pydantic[email]`).
    pub name: String,
    /// Name without extras (`pydantic`).
    pub plain_name: String,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// pip options such as `-r base.txt` or `--index-url ...`
    Directive,
    Requirement(ManifestEntry),
}

/// One logical manifest line. Physical lines joined by a trailing `\` are
/// kept together so they are kept or dropped as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    /// Original text, including the inner terminators of continued lines.
    pub raw: String,
    /// `"\n"`, `"\r\n"` or empty for a final line without newline.
    pub terminator: String,
    pub kind: LineKind,
}

impl ManifestLine {
    pub fn entry(&self) -> Option<&ManifestEntry> {
        match &self.kind {
            LineKind::Requirement(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Parsed requirements file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub lines: Vec<ManifestLine>,
}

impl Manifest {
    pub fn parse(content: &str, grammar: &ManifestGrammar) -> Self {
        let mut physical = content.split_inclusive('\n').map(split_terminator).enumerate();
        let mut lines = Vec::new();

        while let Some((line_index, (first, first_terminator))) = physical.next() {
            let mut raw = first.to_string();
            let mut terminator = first_terminator;
            let mut text = if line_index == 0 {
                first.trim_start_matches(BYTE_ORDER_MARK)
            } else {
                first
            }
            .to_string();

            let mut last = first;
            while is_continued(last) {
                let Some((_, (next, next_terminator))) = physical.next() else {
                    break;
                };
                raw.push_str(terminator);
                raw.push_str(next);
                terminator = next_terminator;
                text.pop();
                text.push(' ');
                text.push_str(next);
                last = next;
            }
            if is_continued(last) {
                text.pop();
            }

            let kind = classify_line(&text, &raw, line_index, grammar);
            lines.push(ManifestLine {
                raw,
                terminator: terminator.to_string(),
                kind,
            });
        }

        Self { lines }
    }

    pub fn read(path: &Path, grammar: &ManifestGrammar) -> Result<Self> {
        if !path.is_file() {
            return Err(PruneError::ManifestNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content, grammar))
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.lines.iter().filter_map(ManifestLine::entry)
    }

    /// Requirement keys in manifest order, duplicates dropped.
    pub fn requirement_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for entry in self.entries() {
            if !keys.contains(&entry.name) {
                keys.push(entry.name.clone());
            }
        }
        keys
    }

    /// Content made of the lines for which `keep(line_index)` holds, each
    /// with its original text and terminator.
    pub fn render<F>(&self, mut keep: F) -> String
    where
        F: FnMut(usize) -> bool,
    {
        let mut out = String::new();
        for (idx, line) in self.lines.iter().enumerate() {
            if keep(idx) {
                out.push_str(&line.raw);
                out.push_str(&line.terminator);
            }
        }
        out
    }
}

fn split_terminator(chunk: &str) -> (&str, &str) {
    if let Some(raw) = chunk.strip_suffix("\r\n") {
        (raw, "\r\n")
    } else if let Some(raw) = chunk.strip_suffix('\n') {
        (raw, "\n")
    } else {
        (chunk, "")
    }
}

const BYTE_ORDER_MARK: char = '\u{feff}';

/// A line ending in `\` outside a comment continues on the next line.
fn is_continued(line: &str) -> bool {
    line.ends_with('\\') && !has_comment(line)
}

/// pip treats `#` as a comment at line start or after whitespace only, so
/// URL fragments like `#egg=` are not comments.
fn has_comment(line: &str) -> bool {
    line.char_indices()
        .any(|(idx, ch)| ch == '#' && (idx == 0 || line[..idx].ends_with(char::is_whitespace)))
}

/// Classify a logical line. `text` is the joined, BOM-free form used for
/// name parsing; `raw` is kept verbatim on the entry.
fn classify_line(text: &str, raw: &str, line_index: usize, grammar: &ManifestGrammar) -> LineKind {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with('#') {
        return LineKind::Comment;
    }
    if trimmed.starts_with('-') {
        return LineKind::Directive;
    }

    let key = grammar.requirement_key(text);
    if key.is_empty() {
        return LineKind::Comment;
    }
    let (plain, extras) = split_extras(&key);
    let plain_name = plain.to_string();
    LineKind::Requirement(ManifestEntry {
        raw_line: raw.to_string(),
        line_index,
        name: key,
        plain_name,
        extras,
    })
}
