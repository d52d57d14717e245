//! Test fixtures and factory functions for creating test data.

use srs_core::{Card, CodeBlock, CodeReorderCard, ConceptCard, Difficulty, Timestamp};

pub const PROBLEM_URL: &str = "https://leetcode.com/problems/binary-search/";

pub fn concept(id: &str) -> Card {
    concept_in(id, "arrays")
}

pub fn concept_in(id: &str, unit: &str) -> Card {
    Card::Concept(ConceptCard {
        id: id.to_string(),
        unit_id: unit.to_string(),
        front: format!("Question {id}?"),
        back: format!("Answer {id}."),
        tags: vec![],
        created_at: None,
    })
}

pub fn concept_created(id: &str, created_at: Timestamp) -> Card {
    match concept(id) {
        Card::Concept(card) => Card::Concept(ConceptCard {
            created_at: Some(created_at),
            ..card
        }),
        other => other,
    }
}

/// A valid code-reordering card with `blocks` lines in reverse solution order.
pub fn code(id: &str, blocks: usize) -> Card {
    let blocks: Vec<CodeBlock> = (0..blocks)
        .map(|i| CodeBlock {
            id: format!("{id}-b{i}"),
            text: format!("line {i}"),
            indent_level: (i % 2) as u32,
        })
        .collect();
    let solution_order = blocks.iter().rev().map(|b| b.id.clone()).collect();

    Card::CodeReorder(CodeReorderCard {
        id: id.to_string(),
        unit_id: "search".to_string(),
        prompt: "Order the binary search".to_string(),
        explanation: "Narrow the window until it is empty.".to_string(),
        external_url: PROBLEM_URL.to_string(),
        difficulty: Difficulty::Medium,
        blocks,
        solution_order,
        created_at: None,
    })
}

/// One concept card and one code card: the smallest batch the default rules accept.
pub fn valid_batch(prefix: &str) -> Vec<Card> {
    vec![
        concept_in(&format!("{prefix}-concept"), "search"),
        code(&format!("{prefix}-code"), 4),
    ]
}

pub fn seed_deck(count: usize) -> Vec<Card> {
    (0..count).map(|i| concept(&format!("c{i}"))).collect()
}
