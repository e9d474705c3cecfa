//! String helpers shared by the rewrite rules.

use crate::tokenizer::{QuoteKind, Token};

/// Unquoted word starting with `-`, longer than the bare dash
pub(super) fn is_flag(token: &Token) -> bool {
    token.quote == QuoteKind::None && token.value.len() > 1 && token.value.starts_with('-')
}

pub(super) fn parse_count(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// The literal text a shell word stands for after quote removal.
///
/// Returns `None` when the word needs expansion (`$`, backticks) since its
/// value is unknown until run time.
pub(super) fn shell_literal(token: &Token) -> Option<String> {
    dequote(&token.value)
}

pub(super) fn dequote(word: &str) -> Option<String> {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => loop {
                match chars.next()? {
                    '\'' => break,
                    inner => out.push(inner),
                }
            },
            '"' => loop {
                match chars.next()? {
                    '"' => break,
                    '$' | '`' => return None,
                    '\\' => match chars.next()? {
                        escaped @ ('$' | '`' | '"' | '\\') => out.push(escaped),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    },
                    inner => out.push(inner),
                }
            },
            '$' | '`' => return None,
            '\\' => out.push(chars.next()?),
            other => out.push(other),
        }
    }
    Some(out)
}

/// Single-quoted PowerShell string literal
pub(super) fn ps_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A path or wildcard as a PowerShell argument, quoted only when needed
pub(super) fn ps_path(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || "._-/\\*?:~+@,=".contains(c));
    if bare {
        value.to_string()
    } else {
        ps_string(value)
    }
}

pub(super) fn regex_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Rewrite a POSIX basic regular expression as a .NET pattern.
///
/// In BRE `\( \) \{ \} \+ \? \|` are the operators and the bare characters
/// are literals; .NET has it the other way round.
pub(super) fn bre_to_dotnet(pattern: &str) -> String {
    const SWAPPED: &str = "(){}+?|";
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if SWAPPED.contains(next) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            c if SWAPPED.contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
