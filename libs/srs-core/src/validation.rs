//! Validation of generated card batches before they enter the store.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Card, CodeReorderCard, ConceptCard};

/// Minimum number of blocks in a code-reordering exercise.
pub const MIN_CODE_BLOCKS: usize = 4;

/// Acceptance rules for a generated batch.
#[derive(Debug, Clone)]
pub struct BatchRules {
    pub min_concept_cards: usize,
    pub min_code_cards: usize,
    /// Unit ids cards may reference. Empty accepts any unit.
    pub known_units: HashSet<String>,
}

impl Default for BatchRules {
    fn default() -> Self {
        Self {
            min_concept_cards: 1,
            min_code_cards: 1,
            known_units: HashSet::new(),
        }
    }
}

/// Check a whole batch; the first violation rejects it.
pub fn validate_batch(cards: &[Card], rules: &BatchRules) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut concept_count = 0;
    let mut code_count = 0;

    for (index, card) in cards.iter().enumerate() {
        let id = card.id();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId { index });
        }
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId(id.to_string()));
        }
        if !rules.known_units.is_empty() && !rules.known_units.contains(card.unit_id()) {
            return Err(ValidationError::UnknownUnit {
                id: id.to_string(),
                unit: card.unit_id().to_string(),
            });
        }

        match card {
            Card::Concept(concept) => {
                validate_concept(concept)?;
                concept_count += 1;
            }
            Card::CodeReorder(code) => {
                validate_code(code)?;
                code_count += 1;
            }
        }
    }

    if concept_count < rules.min_concept_cards {
        return Err(ValidationError::TooFewOfKind {
            kind: "concept",
            found: concept_count,
            min: rules.min_concept_cards,
        });
    }
    if code_count < rules.min_code_cards {
        return Err(ValidationError::TooFewOfKind {
            kind: "code",
            found: code_count,
            min: rules.min_code_cards,
        });
    }
    Ok(())
}

fn validate_concept(card: &ConceptCard) -> Result<(), ValidationError> {
    if card.front.trim().is_empty() || card.back.trim().is_empty() {
        return Err(ValidationError::EmptyConcept(card.id.clone()));
    }
    Ok(())
}

fn validate_code(card: &CodeReorderCard) -> Result<(), ValidationError> {
    if card.blocks.len() < MIN_CODE_BLOCKS {
        return Err(ValidationError::TooFewBlocks {
            id: card.id.clone(),
            count: card.blocks.len(),
            min: MIN_CODE_BLOCKS,
        });
    }

    let block_ids: HashSet<&str> = card.blocks.iter().map(|b| b.id.as_str()).collect();
    if block_ids.len() != card.blocks.len() {
        return Err(ValidationError::DuplicateBlock(card.id.clone()));
    }

    // A permutation of the block ids: same length, each used exactly once.
    let ordered: HashSet<&str> = card.solution_order.iter().map(String::as_str).collect();
    if card.solution_order.len() != card.blocks.len() || ordered != block_ids {
        return Err(ValidationError::SolutionMismatch(card.id.clone()));
    }

    if !is_problem_url(&card.external_url) {
        return Err(ValidationError::InvalidUrl {
            id: card.id.clone(),
            url: card.external_url.clone(),
        });
    }
    Ok(())
}

fn is_problem_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split('/').next().unwrap_or_default();
            host.contains('.') && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}
