use crate::tokenizer::{QuoteKind, Token};
use once_cell::sync::Lazy;
use regex::Regex;

/// Redirection-shaped words: `>`, `2>>`, `2>&1`, `<`, `&>`
static REDIRECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d*>>?&?\d*|[<>]{1,2}|&>?)$").expect("redirection pattern is valid")
});

/// Semantic role of a token within its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Operator,
    Command,
    Flag,
    Argument,
}

/// A token annotated with its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleToken {
    pub token: Token,
    pub role: Role,
}

impl RoleToken {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.token.value
    }
}

/// Whether a token value looks like a redirection operator
#[must_use]
pub fn is_redirection(value: &str) -> bool {
    REDIRECTION.is_match(value)
}

/// Whether a word starts with a redirection, fused or not (`>out`, `2>/dev/null`)
#[must_use]
pub fn starts_with_redirection(value: &str) -> bool {
    let rest = value.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.starts_with('>') || rest.starts_with('<') || value.starts_with("&>")
}

/// Assign roles in a single positional pass.
///
/// Redirections are opaque passengers: they are checked before the operator
/// lexemes so that `>`, `<` and their targets never reset command position.
#[must_use]
pub fn tag_roles(tokens: &[Token]) -> Vec<RoleToken> {
    let mut expecting_command = true;

    tokens
        .iter()
        .map(|token| {
            let unquoted = token.quote == QuoteKind::None;
            let role = if unquoted && is_redirection(&token.value) {
                Role::Argument
            } else if token.is_operator() {
                expecting_command = true;
                Role::Operator
            } else if expecting_command {
                expecting_command = false;
                Role::Command
            } else if unquoted && token.value.len() > 1 && token.value.starts_with('-') {
                Role::Flag
            } else {
                Role::Argument
            };
            RoleToken {
                token: token.clone(),
                role,
            }
        })
        .collect()
}
