//! HTML parsing infrastructure for the school pages.
//!
//! This module provides the trait-based parsing architecture shared by the
//! timetable grid and substitutions bulletin parsers, with structured error
//! handling and fallback selector strategies for the fragile site markup.

pub mod context;
pub mod error;
pub mod lesson_cell;
pub mod substitution_line;
pub mod substitutions_parser;
pub mod text;
pub mod timetable_parser;

// Re-export public types
pub use context::{PostContext, TimetableContext};
pub use error::{ParseError, ParseResult};
pub use substitution_line::{LineOutcome, SubstitutionLine, SubstitutionLineParser};
pub use substitutions_parser::{SubstitutionsParser, DEFAULT_CONTAINER_SELECTORS};
pub use timetable_parser::TimetableParser;

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::warn;

/// Parser trait tying one document kind to its output and context.
pub trait DocumentParser {
    type Output;
    type Context;

    /// Parse a fetched document with contextual information.
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParseResult<Self::Output>;
}

/// Compile a single selector literal.
pub(crate) fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("Failed to compile selector '{}': {}", selector, e))
}

/// Compile a fallback list of selector strings into Selector objects.
///
/// Invalid entries are logged and dropped; the list only fails as a whole
/// when no entry compiles.
pub(crate) fn compile_selectors(selector_strings: &[String]) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{}': {}", selector_str, e));
            }
        }
    }

    if selectors.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid selectors compiled from {} attempts. Errors: {}",
            selector_strings.len(),
            errors.join(", ")
        ));
    }

    Ok(selectors)
}
