//! Jargon and complexity analysis payloads.
//!
//! The same `AnalysisResult` shape appears embedded in an analyzed
//! Document and as the response of the standalone simplifier endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Explanation of a single legal term found in a document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JargonInfo {
    /// Plain-language meaning of the term
    pub meaning: String,

    /// How many times the term appears in the text (at least 1)
    pub occurrences: u32,

    /// The term as it appeared in the source text
    pub original_term: String,
}

/// Document-level complexity assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysis {
    /// Complexity label reported by the service (nominally Low/Medium/High,
    /// but kept verbatim since the service owns the vocabulary)
    pub complexity: String,

    /// Jargon density percentage, 0-100. A density, not a probability.
    pub score: f64,

    /// Distinct jargon terms counted by the service
    pub jargon_count: u32,

    /// Total words in the analyzed text
    pub total_words: u32,
}

impl ComplexityAnalysis {
    /// Severity tier for presentation purposes.
    pub fn severity(&self) -> SeverityTier {
        SeverityTier::from_label(&self.complexity)
    }
}

/// Jargon analysis of a single text or document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Detected terms keyed by the (case-sensitive) term itself
    pub jargons_found: HashMap<String, JargonInfo>,

    /// Count of distinct terms detected (not an occurrence sum)
    pub total_jargons: u32,

    /// Source text with terms annotated inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simplified_text: Option<String>,

    /// Human-readable recap of the findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jargon_summary: Option<String>,

    /// Complexity assessment, when the service produced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_analysis: Option<ComplexityAnalysis>,
}

/// Ways an AnalysisResult can disagree with itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisInconsistency {
    #[error("totalJargons is {declared} but {found} distinct terms were found")]
    JargonCountMismatch { declared: u32, found: u32 },

    #[error("complexityAnalysis.jargonCount is {reported} but totalJargons is {declared}")]
    ComplexityCountMismatch { reported: u32, declared: u32 },
}

impl AnalysisResult {
    /// Number of distinct terms actually present (occurrences >= 1).
    pub fn distinct_terms(&self) -> u32 {
        self.jargons_found
            .values()
            .filter(|info| info.occurrences >= 1)
            .count() as u32
    }

    /// Check the count invariants: `total_jargons` must equal the
    /// distinct-term count, and `complexity_analysis.jargon_count` must
    /// agree with `total_jargons` when present.
    pub fn consistency(&self) -> Result<(), AnalysisInconsistency> {
        let found = self.distinct_terms();
        if self.total_jargons != found {
            return Err(AnalysisInconsistency::JargonCountMismatch {
                declared: self.total_jargons,
                found,
            });
        }

        if let Some(ref complexity) = self.complexity_analysis {
            if complexity.jargon_count != self.total_jargons {
                return Err(AnalysisInconsistency::ComplexityCountMismatch {
                    reported: complexity.jargon_count,
                    declared: self.total_jargons,
                });
            }
        }

        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.consistency().is_ok()
    }

    /// Severity tier for presentation purposes. A missing complexity
    /// assessment maps to `Unknown`, never an error.
    pub fn severity(&self) -> SeverityTier {
        self.complexity_analysis
            .as_ref()
            .map(ComplexityAnalysis::severity)
            .unwrap_or(SeverityTier::Unknown)
    }
}

/// Presentation tier derived from a complexity label.
///
/// Read-only styling contract: `Low` maps to mild, `Medium` to
/// moderate, `High` to severe, anything else to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityTier {
    Mild,
    Moderate,
    Severe,
    Unknown,
}

impl SeverityTier {
    /// Map a complexity label to a tier, case-insensitively.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "low" => Self::Mild,
            "medium" => Self::Moderate,
            "high" => Self::Severe,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Unknown => "unknown",
        }
    }
}
