//! Short-circuit emulation for shells without native `&&` / `||`.
//!
//! Windows PowerShell 5 has no pipeline chain operators, so a chain such as
//! `a && b || c` is rewritten into a sequential script that checks the last
//! exit status before every step.

use crate::shell::Dialect;
use crate::splitter::{split_by_connectors, Connector, Piece};
use tracing::trace;

/// Guarded continuation for one chain step in the given dialect
fn guard(dialect: Dialect, connector: Connector, chunk: &str) -> String {
    match (dialect, connector) {
        (Dialect::PowerShell, Connector::And) => format!("; if ($?) {{ {chunk} }}"),
        (Dialect::PowerShell, Connector::Or) => format!("; if (-not $?) {{ {chunk} }}"),
        (Dialect::Cmd, Connector::And) => format!(" & if not errorlevel 1 ({chunk})"),
        (Dialect::Cmd, Connector::Or) => format!(" & if errorlevel 1 ({chunk})"),
        (Dialect::Unix, connector) => format!(" {} {chunk}", connector.as_str()),
    }
}

/// Rewrite a translated connector chain as explicit conditional steps.
///
/// Unix targets and chains without top-level connectors are returned
/// unchanged. A dangling connector at either end is dropped.
#[must_use]
pub fn emulate_connectors(chain: &str, dialect: Dialect) -> String {
    let pieces = split_by_connectors(chain);
    let has_connectors = pieces.iter().any(|p| matches!(p, Piece::Connector(_)));
    if dialect == Dialect::Unix || !has_connectors {
        return chain.to_string();
    }

    let mut script = String::with_capacity(chain.len() + 32);
    let mut pending: Option<Connector> = None;

    for piece in pieces {
        match piece {
            Piece::Connector(connector) => pending = Some(connector),
            Piece::Chunk(chunk) => match pending.take() {
                Some(connector) if !script.is_empty() => {
                    script.push_str(&guard(dialect, connector, chunk));
                }
                _ => script.push_str(chunk),
            },
        }
    }

    trace!("Emulated connectors for {}: {}", dialect, script);
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powershell_emulation() {
        assert_eq!(
            emulate_connectors("echo ok && echo bad || echo fail", Dialect::PowerShell),
            "echo ok; if ($?) { echo bad }; if (-not $?) { echo fail }"
        );
    }

    #[test]
    fn test_cmd_emulation() {
        assert_eq!(
            emulate_connectors("mkdir out && dir out || echo failed", Dialect::Cmd),
            "mkdir out & if not errorlevel 1 (dir out) & if errorlevel 1 (echo failed)"
        );
    }

    #[test]
    fn test_no_connectors_unchanged() {
        let chain = "Get-ChildItem | Select-Object -First 5";
        assert_eq!(emulate_connectors(chain, Dialect::PowerShell), chain);
    }

    #[test]
    fn test_unix_unchanged() {
        let chain = "make && make test";
        assert_eq!(emulate_connectors(chain, Dialect::Unix), chain);
    }

    #[test]
    fn test_nested_connectors_stay_in_chunk() {
        assert_eq!(
            emulate_connectors("(a && b) || c", Dialect::PowerShell),
            "(a && b); if (-not $?) { c }"
        );
    }

    #[test]
    fn test_dangling_connectors() {
        assert_eq!(emulate_connectors("&& a && b", Dialect::PowerShell), "a; if ($?) { b }");
        assert_eq!(emulate_connectors("a ||", Dialect::PowerShell), "a");
    }
}
