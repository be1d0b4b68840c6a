//! Configuration text to raw blocks
//!
//! Parsing only checks the shape of each file: known block types, label
//! counts, a single `mod` block. Expressions stay unevaluated until the run
//! context decodes them.

use hcl::Body;
use mod_fs::SourceFile;

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::name::{Location, ResourceKind};
use crate::registry::BlockRegistry;

/// A top-level block with its unevaluated body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub block_type: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub file: String,
}

impl RawBlock {
    pub fn label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn location(&self) -> Location {
        let block = match self.label() {
            Some(label) => format!("{} \"{label}\"", self.block_type),
            None => self.block_type.clone(),
        };
        Location::new(self.file.clone(), block)
    }
}

/// Every block found in a mod's files.
#[derive(Debug, Clone, Default)]
pub struct ParsedFiles {
    pub mod_block: Option<RawBlock>,
    /// Resource blocks in file then declaration order
    pub blocks: Vec<RawBlock>,
    pub diagnostics: Diagnostics,
}

/// Parse one file into an HCL body.
pub fn parse_body(file: &SourceFile) -> Result<Body> {
    hcl::parse(&file.content).map_err(|e| Error::Syntax {
        path: file.path.to_string(),
        message: e.to_string(),
    })
}

/// Parse a set of files into raw blocks.
///
/// Syntax errors are fatal. Structural problems (unknown block types,
/// wrong label counts, stray attributes) are reported as diagnostics and the
/// offending block is dropped.
pub fn parse_sources(files: &[SourceFile], registry: &BlockRegistry) -> Result<ParsedFiles> {
    let mut parsed = ParsedFiles::default();

    for file in files {
        let body = parse_body(file)?;
        let file_name = file.path.to_string();

        for attribute in body.attributes() {
            parsed.diagnostics.push(
                Diagnostic::error(format!("Unexpected attribute '{}'", attribute.key()))
                    .with_detail("attributes must be declared inside a block")
                    .with_subject(&file_name),
            );
        }

        for block in body.blocks() {
            let raw = RawBlock {
                block_type: block.identifier().to_string(),
                labels: block.labels().iter().map(|l| l.as_str().to_string()).collect(),
                body: block.body().clone(),
                file: file_name.clone(),
            };

            let Some(kind) = registry.block_kind(&raw.block_type) else {
                parsed.diagnostics.push(
                    Diagnostic::error(format!("Unsupported block type '{}'", raw.block_type))
                        .with_subject(raw.location()),
                );
                continue;
            };

            let expected_labels = if kind == ResourceKind::Local { 0 } else { 1 };
            if raw.labels.len() != expected_labels {
                parsed.diagnostics.push(
                    Diagnostic::error(format!(
                        "'{}' blocks take {expected_labels} label(s), found {}",
                        raw.block_type,
                        raw.labels.len()
                    ))
                    .with_subject(raw.location()),
                );
                continue;
            }

            if kind == ResourceKind::Mod {
                if parsed.mod_block.is_some() {
                    parsed.diagnostics.push(
                        Diagnostic::error("Duplicate mod block").with_subject(raw.location()),
                    );
                } else {
                    parsed.mod_block = Some(raw);
                }
                continue;
            }

            parsed.blocks.push(raw);
        }
    }

    tracing::debug!(
        files = files.len(),
        blocks = parsed.blocks.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed mod sources"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, content: &str) -> SourceFile {
        SourceFile::new(name, content)
    }

    #[test]
    fn test_blocks_keep_declaration_order() {
        let files = vec![
            source("a.mp", "mod \"m\" {}\nquery \"q2\" {}\nquery \"q1\" {}\n"),
            source("b.mp", "locals {\n  x = 1\n}\n"),
        ];
        let parsed = parse_sources(&files, &BlockRegistry::with_builtins()).unwrap();

        assert!(parsed.diagnostics.is_empty());
        assert_eq!(parsed.mod_block.unwrap().label(), Some("m"));
        let order: Vec<_> = parsed
            .blocks
            .iter()
            .map(|b| (b.block_type.as_str(), b.label()))
            .collect();
        assert_eq!(
            order,
            vec![("query", Some("q2")), ("query", Some("q1")), ("locals", None)]
        );
    }

    #[test]
    fn test_structural_problems_are_diagnostics() {
        let files = vec![source(
            "main.mp",
            "widget \"w\" {}\nquery {}\nmod \"a\" {}\nmod \"b\" {}\nstray = 1\n",
        )];
        let parsed = parse_sources(&files, &BlockRegistry::with_builtins()).unwrap();

        let summaries: Vec<_> = parsed.diagnostics.iter().map(|d| d.summary.clone()).collect();
        assert_eq!(summaries.len(), 4);
        assert!(summaries.iter().any(|s| s.contains("Unsupported block type 'widget'")));
        assert!(summaries.iter().any(|s| s.contains("take 1 label(s)")));
        assert!(summaries.iter().any(|s| s == "Duplicate mod block"));
        assert!(summaries.iter().any(|s| s.contains("stray")));
        assert!(parsed.blocks.is_empty());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let files = vec![source("bad.mp", "query \"q\" {\n")];
        let err = parse_sources(&files, &BlockRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, Error::Syntax { ref path, .. } if path == "bad.mp"));
    }
}
