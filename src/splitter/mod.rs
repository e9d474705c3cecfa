use crate::tokenizer::{tokenize, QuoteKind, Token};

/// Short-circuit connector between two segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Connector::And => "&&",
            Connector::Or => "||",
        }
    }

    fn from_token(token: &Token) -> Option<Self> {
        if token.quote != QuoteKind::None {
            return None;
        }
        match token.value.as_str() {
            "&&" => Some(Connector::And),
            "||" => Some(Connector::Or),
            _ => None,
        }
    }
}

/// One element of a connector split: either a trimmed chunk of the original
/// command or the connector that joins two chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    Chunk(&'a str),
    Connector(Connector),
}

/// Paren/brace nesting tracker, clamped at zero
#[derive(Debug, Default, Clone, Copy)]
struct Depth {
    paren: usize,
    brace: usize,
}

impl Depth {
    fn observe(&mut self, token: &Token) {
        if token.quote != QuoteKind::None {
            return;
        }
        match token.value.as_str() {
            "(" => self.paren += 1,
            ")" => self.paren = self.paren.saturating_sub(1),
            "{" => self.brace += 1,
            "}" => self.brace = self.brace.saturating_sub(1),
            _ => {}
        }
    }

    fn is_top_level(self) -> bool {
        self.paren == 0 && self.brace == 0
    }
}

/// Split a command line on top-level `&&` / `||`.
///
/// Connectors nested inside parentheses or braces stay in their chunk. Chunks
/// are trimmed slices of the input; empty chunks are dropped.
#[must_use]
pub fn split_by_connectors(command: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut depth = Depth::default();
    let mut chunk_start = 0;

    for token in tokenize(command) {
        depth.observe(&token);
        if !depth.is_top_level() {
            continue;
        }
        if let Some(connector) = Connector::from_token(&token) {
            push_chunk(&mut pieces, &command[chunk_start..token.start]);
            pieces.push(Piece::Connector(connector));
            chunk_start = token.end;
        }
    }
    push_chunk(&mut pieces, &command[chunk_start..]);

    pieces
}

/// Split a segment on top-level `|` into pipeline stages
#[must_use]
pub fn split_by_pipe(segment: &str) -> Vec<&str> {
    let mut stages = Vec::new();
    let mut depth = Depth::default();
    let mut stage_start = 0;

    for token in tokenize(segment) {
        depth.observe(&token);
        if depth.is_top_level() && token.quote == QuoteKind::None && token.value == "|" {
            push_stage(&mut stages, &segment[stage_start..token.start]);
            stage_start = token.end;
        }
    }
    push_stage(&mut stages, &segment[stage_start..]);

    stages
}

fn push_chunk<'a>(pieces: &mut Vec<Piece<'a>>, raw: &'a str) {
    let chunk = raw.trim();
    if !chunk.is_empty() {
        pieces.push(Piece::Chunk(chunk));
    }
}

fn push_stage<'a>(stages: &mut Vec<&'a str>, raw: &'a str) {
    let stage = raw.trim();
    if !stage.is_empty() {
        stages.push(stage);
    }
}
