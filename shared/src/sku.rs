//! SKU and barcode primitives
//!
//! A structured SKU is `Article-Color-Size` (three non-empty tokens joined
//! by `-`). Anything else is kept as a literal: usable for barcode lookup
//! but never for component-based stock queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator for structured SKU components
pub const SKU_SEPARATOR: char = '-';

#[derive(Debug, Error)]
pub enum SkuError {
    #[error("Empty SKU")]
    Empty,
}

/// A stock keeping unit identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sku {
    /// `Article-Color-Size`, all three tokens non-empty
    Structured {
        article: String,
        color: String,
        size: String,
    },
    /// Unstructured code, only matched literally
    Literal(String),
}

impl Sku {
    /// Parse a raw SKU string.
    ///
    /// Exactly three non-empty `-`-separated tokens produce a structured
    /// SKU; everything else falls back to a literal.
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SkuError::Empty);
        }

        let tokens: Vec<&str> = trimmed.split(SKU_SEPARATOR).collect();
        if tokens.len() == 3 && tokens.iter().all(|t| !t.is_empty()) {
            return Ok(Self::Structured {
                article: tokens[0].to_string(),
                color: tokens[1].to_string(),
                size: tokens[2].to_string(),
            });
        }

        Ok(Self::Literal(trimmed.to_string()))
    }

    /// Whether this SKU has article/color/size components
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured { .. })
    }

    /// The raw text form (`Article-Color-Size` or the literal)
    pub fn raw(&self) -> String {
        match self {
            Self::Structured {
                article,
                color,
                size,
            } => format!("{article}{SKU_SEPARATOR}{color}{SKU_SEPARATOR}{size}"),
            Self::Literal(s) => s.clone(),
        }
    }

    /// Normalized form for comparisons
    pub fn normalized(&self) -> String {
        normalize(&self.raw())
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Normalize a scanned code or stored SKU/barcode for comparison.
///
/// Strips separators (`-`, `/`, `.`, whitespace) and uppercases. Stored
/// codes and scanned codes must always pass through the same rule.
pub fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| !matches!(c, '-' | '/' | '.' | ' ' | '\t'))
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Derive the canonical barcode for the six-digit numeric SKU family.
///
/// `CCMMMM` (2-digit color + 4-digit model) maps to the 13-character
/// barcode `0{CC}{MMMM}100{last digit of MMMM}00`. Returns `None` for any
/// code outside the family; the caller falls through to "unresolved".
pub fn derive_barcode(normalized_sku: &str) -> Option<String> {
    if normalized_sku.len() != 6 || !normalized_sku.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let color = &normalized_sku[..2];
    let model = &normalized_sku[2..];
    let check = &model[3..];

    Some(format!("0{color}{model}100{check}00"))
}
