//! Markdown parser for seed decks.
//!
//! # Format
//! ```markdown
//! ID: arrays-1
//! UNIT: arrays
//! TAGS: basics, memory
//! Q: What is the time complexity of indexing an array?
//! A: O(1).
//!
//! ID: arrays-2
//! Q: Explain amortized push.
//! A: Doubling the capacity makes n pushes cost O(n) total.
//! Multiple lines are supported.
//! ```
//!
//! Every card starts with an `ID:` line. `UNIT:` and `TAGS:` are optional;
//! a missing unit falls back to the deck default.

use std::collections::HashSet;

use crate::error::{ParseError, Result};
use crate::types::{Card, ConceptCard};

/// Parse a markdown seed deck into concept cards.
pub fn parse(content: &str, default_unit: &str) -> Result<Vec<Card>> {
    if content.trim().is_empty() {
        return Ok(vec![]);
    }

    let mut parser = Parser::new(default_unit);
    for (idx, line) in content.lines().enumerate() {
        parser.process_line(line, idx + 1)?;
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Question,
    Answer,
}

struct CardBuilder {
    id: String,
    unit: Option<String>,
    tags: Vec<String>,
    question: Option<String>,
    answer: Option<String>,
    start_line: usize,
}

impl CardBuilder {
    fn new(id: String, start_line: usize) -> Self {
        Self {
            id,
            unit: None,
            tags: Vec::new(),
            question: None,
            answer: None,
            start_line,
        }
    }

    fn build(self, default_unit: &str) -> Result<Card> {
        let front = self.question.ok_or(ParseError::MissingQuestion {
            line: self.start_line,
        })?;
        let back = self.answer.ok_or(ParseError::MissingAnswer {
            line: self.start_line,
        })?;

        Ok(Card::Concept(ConceptCard {
            id: self.id,
            unit_id: self.unit.unwrap_or_else(|| default_unit.to_string()),
            front: front.trim().to_string(),
            back: back.trim().to_string(),
            tags: self.tags,
            created_at: None,
        }))
    }
}

struct Parser<'d> {
    default_unit: &'d str,
    cards: Vec<Card>,
    seen_ids: HashSet<String>,
    current: Option<CardBuilder>,
    current_field: Option<Field>,
    buffer: Vec<String>,
}

impl<'d> Parser<'d> {
    fn new(default_unit: &'d str) -> Self {
        Self {
            default_unit,
            cards: Vec::new(),
            seen_ids: HashSet::new(),
            current: None,
            current_field: None,
            buffer: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<()> {
        match Self::parse_line(line) {
            LineType::Id(id) => self.handle_id(id, line_num)?,
            LineType::Unit(unit) => {
                self.flush_buffer();
                self.current_field = None;
                self.current_mut(line_num)?.unit = Some(unit.to_string());
            }
            LineType::Tags(tags) => {
                self.flush_buffer();
                self.current_field = None;
                self.current_mut(line_num)?.tags = tags
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            LineType::Question(text) => {
                self.flush_buffer();
                self.current_mut(line_num)?;
                self.current_field = Some(Field::Question);
                self.buffer.push(text.to_string());
            }
            LineType::Answer(text) => {
                self.flush_buffer();
                self.current_mut(line_num)?;
                self.current_field = Some(Field::Answer);
                self.buffer.push(text.to_string());
            }
            LineType::Text(text) => {
                if self.current_field.is_none() {
                    return Err(ParseError::UnexpectedText { line: line_num });
                }
                self.buffer.push(text.to_string());
            }
            LineType::Empty => self.buffer.push(String::new()),
        }
        Ok(())
    }

    fn parse_line(line: &str) -> LineType<'_> {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("ID:") {
            LineType::Id(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("UNIT:") {
            LineType::Unit(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("TAGS:") {
            LineType::Tags(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("Q:") {
            LineType::Question(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("A:") {
            LineType::Answer(rest.trim())
        } else if trimmed.is_empty() {
            LineType::Empty
        } else {
            LineType::Text(line)
        }
    }

    fn current_mut(&mut self, line_num: usize) -> Result<&mut CardBuilder> {
        self.current
            .as_mut()
            .ok_or(ParseError::MissingId { line: line_num })
    }

    fn handle_id(&mut self, id: &str, line_num: usize) -> Result<()> {
        if id.is_empty() {
            return Err(ParseError::MissingId { line: line_num });
        }
        self.finish_card()?;

        if !self.seen_ids.insert(id.to_string()) {
            return Err(ParseError::DuplicateId {
                id: id.to_string(),
                line: line_num,
            });
        }
        self.current = Some(CardBuilder::new(id.to_string(), line_num));
        Ok(())
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let content = self.buffer.join("\n");
        self.buffer.clear();

        if let Some(ref mut card) = self.current {
            match self.current_field {
                Some(Field::Question) => card.question = Some(content),
                Some(Field::Answer) => card.answer = Some(content),
                None => {}
            }
        }
    }

    fn finish_card(&mut self) -> Result<()> {
        self.flush_buffer();
        self.current_field = None;
        if let Some(card) = self.current.take() {
            self.cards.push(card.build(self.default_unit)?);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Card>> {
        self.finish_card()?;
        Ok(self.cards)
    }
}

enum LineType<'a> {
    Id(&'a str),
    Unit(&'a str),
    Tags(&'a str),
    Question(&'a str),
    Answer(&'a str),
    Text(&'a str),
    Empty,
}
