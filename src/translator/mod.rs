//! Command line translation between shell dialects.
//!
//! A command is split on top-level `&&`/`||`, each chunk on top-level `|`,
//! and every pipeline stage is translated on its own. A stage that cannot be
//! translated with confidence is kept byte-for-byte. A command with a heredoc
//! and a chunk with a `${...}` expansion are kept whole, since their text runs
//! across pipe boundaries.

mod lint;

pub use lint::LintReport;

use crate::emulation::emulate_connectors;
use crate::mappings::{CommandMapping, MappingRegistry, Rule};
use crate::roles::{is_redirection, starts_with_redirection, tag_roles, Role, RoleToken};
use crate::shell::{detect_dialect, is_cmd_switch, Dialect, ShellCapability};
use crate::splitter::{split_by_connectors, split_by_pipe, Piece};
use crate::tokenizer::{tokenize, QuoteKind, Token};
use tracing::{debug, trace};

/// Outcome of translating one command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated: bool,
    pub original_command: String,
    pub final_command: String,
    pub source: Dialect,
}

/// Translates command lines for one target shell
#[derive(Debug, Clone)]
pub struct Translator<'r> {
    registry: &'r MappingRegistry,
    target: ShellCapability,
    enabled: bool,
}

impl<'r> Translator<'r> {
    #[must_use]
    pub fn new(registry: &'r MappingRegistry, target: ShellCapability) -> Self {
        Self {
            registry,
            target,
            enabled: true,
        }
    }

    /// Enable or disable translation; a disabled translator is the identity
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn target(&self) -> ShellCapability {
        self.target
    }

    /// Translate a whole command line for the target shell
    #[must_use]
    pub fn translate(&self, command: &str) -> TranslationResult {
        let source = detect_dialect(command);
        let unchanged = |source| TranslationResult {
            translated: false,
            original_command: command.to_string(),
            final_command: command.to_string(),
            source,
        };

        if !self.enabled || command.trim().is_empty() {
            return unchanged(source);
        }
        if source == self.target.dialect {
            debug!("Command is already {}, nothing to translate", source);
            return unchanged(source);
        }
        if has_heredoc(&tokenize(command)) {
            debug!("Passing through '{}': heredoc", command);
            return unchanged(source);
        }

        let pieces = split_by_connectors(command);
        let mut changed = false;
        let mut chain = String::with_capacity(command.len() + 16);

        for piece in &pieces {
            match piece {
                Piece::Chunk(chunk) => {
                    if !chain.is_empty() {
                        chain.push(' ');
                    }
                    if has_brace_expansion(chunk) {
                        debug!("Passing through '{}': unresolved ${{...}} expansion", chunk);
                        chain.push_str(chunk);
                        continue;
                    }
                    let stages: Vec<String> = split_by_pipe(chunk)
                        .into_iter()
                        .map(|stage| {
                            let out = self.translate_segment(stage, source);
                            changed |= out != stage;
                            out
                        })
                        .collect();
                    chain.push_str(&stages.join(" | "));
                }
                Piece::Connector(connector) => {
                    chain.push(' ');
                    chain.push_str(connector.as_str());
                }
            }
        }

        let has_connectors = pieces.iter().any(|p| matches!(p, Piece::Connector(_)));
        let needs_emulation = has_connectors && !self.target.native_connectors;

        if !changed && !needs_emulation {
            return unchanged(source);
        }

        let final_command = if needs_emulation {
            emulate_connectors(&chain, self.target.dialect)
        } else {
            chain
        };
        trace!("Translated '{}' -> '{}'", command, final_command);

        TranslationResult {
            translated: true,
            original_command: command.to_string(),
            final_command,
            source,
        }
    }

    /// Translate a single pipeline stage, returning it unchanged when no
    /// confident translation exists
    #[must_use]
    pub fn translate_segment(&self, segment: &str, source: Dialect) -> String {
        match self.rewrite(segment, source) {
            Ok(out) => out,
            Err(reason) => {
                debug!("Passing through '{}': {}", segment, reason);
                segment.to_string()
            }
        }
    }

    fn rewrite(&self, segment: &str, source: Dialect) -> Result<String, &'static str> {
        let target = self.target.dialect;
        let Some(stage) = Stage::parse(segment)? else {
            return Err("empty segment");
        };

        let name = stage.command.value();
        match self.registry.resolve(name, source, target) {
            None => Err("no mapping for command"),
            Some(Rule::Dynamic(rule)) => {
                if stage.has_redirection(source) {
                    return Err("redirection on a rewritten command");
                }
                let inner = |command: &str| self.translate_segment(command, Dialect::Unix);
                rule.apply(&stage.tokens[1..], &self.target, &inner)
                    .ok_or("arguments outside the rule grammar")
            }
            Some(Rule::Static(mapping)) => {
                translate_static(mapping, &stage.tagged[1..], source).ok_or_else(|| {
                    if stage.operand_count(source) == 0 && mapping.requires_arguments {
                        "command requires arguments"
                    } else {
                        "unmapped flag"
                    }
                })
            }
        }
    }
}

/// A guarded, fused and role-tagged pipeline stage
struct Stage {
    tokens: Vec<Token>,
    tagged: Vec<RoleToken>,
    command: RoleToken,
}

impl Stage {
    /// `Ok(None)` for an empty stage, `Err` for constructs that must pass through
    fn parse(segment: &str) -> Result<Option<Self>, &'static str> {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if has_brace_expansion(segment) {
            return Err("unresolved ${...} expansion");
        }
        if trimmed.starts_with('(') || trimmed.starts_with('{') {
            return Err("subshell or brace group");
        }

        let raw = tokenize(segment);
        if has_heredoc(&raw) {
            return Err("heredoc");
        }

        let tokens = merge_constructs(&raw, segment);
        let tagged = tag_roles(&tokens);
        if tagged.iter().any(|t| t.role == Role::Operator) {
            return Err("operator inside segment");
        }

        let command = match tagged.first() {
            Some(first) if first.role == Role::Command => first.clone(),
            _ => return Err("no command word"),
        };
        if command.token.quote != QuoteKind::None || starts_with_redirection(command.value()) {
            return Err("command word is quoted or a redirection");
        }

        Ok(Some(Self {
            tokens,
            tagged,
            command,
        }))
    }

    fn operand_count(&self, source: Dialect) -> usize {
        classify(&self.tagged[1..], source)
            .filter(|(kind, _)| *kind == Kind::Operand)
            .count()
    }

    /// Any redirection after the command word, fused (`>out`) or not
    fn has_redirection(&self, source: Dialect) -> bool {
        classify(&self.tagged[1..], source).any(|(kind, _)| kind == Kind::Passenger)
    }
}

fn has_brace_expansion(text: &str) -> bool {
    text.contains("${")
}

/// Heredoc operator, including one split into two touching `<` tokens
fn has_heredoc(tokens: &[Token]) -> bool {
    let unquoted = |t: &Token| t.quote == QuoteKind::None;
    tokens.iter().any(|t| unquoted(t) && t.value == "<<")
        || tokens.windows(2).any(|pair| {
            unquoted(&pair[0])
                && unquoted(&pair[1])
                && pair[0].value == "<"
                && pair[1].value == "<"
                && pair[0].end == pair[1].start
        })
}

const CONTROL_OPERATORS: &[&str] = &["&&", "||", "|&", "|", ";"];

fn is_control(token: &Token) -> bool {
    token.quote == QuoteKind::None && CONTROL_OPERATORS.contains(&token.value.as_str())
}

fn is_lone_ampersand(token: &Token) -> bool {
    token.quote == QuoteKind::None && token.value == "&"
}

/// Re-fuse constructs the tokenizer split apart.
///
/// Tokens that touch in `source` become one token whose value is the source
/// slice (`2>&1`, `>out`, `$(`, `--k="v w"`). A run opened by `(` or `{`
/// absorbs everything up to its matching closer, whitespace included.
/// Top-level control operators are never fused, and a lone `&` only joins a
/// redirection (`>&`, `&>`).
#[must_use]
pub fn merge_constructs(tokens: &[Token], source: &str) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut depth: usize = 0;

    for token in tokens {
        let fuse = match merged.last() {
            Some(_) if depth > 0 => true,
            Some(last) => {
                last.end == token.start
                    && !is_control(last)
                    && !is_control(token)
                    && (!is_lone_ampersand(token) || last.value.ends_with(['>', '<']))
                    && (!is_lone_ampersand(last) || token.value.starts_with('>'))
            }
            None => false,
        };

        if token.quote == QuoteKind::None {
            match token.value.as_str() {
                "(" | "{" => depth += 1,
                ")" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        match merged.last_mut() {
            Some(last) if fuse => {
                last.end = token.end;
                last.value = source[last.start..last.end].to_string();
                last.quote = QuoteKind::None;
            }
            _ => merged.push(token.clone()),
        }
    }

    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Flag,
    Operand,
    /// Redirection operators and their targets
    Passenger,
}

/// Partition the tokens after the command word
fn classify<'a>(
    tokens: &'a [RoleToken],
    source: Dialect,
) -> impl Iterator<Item = (Kind, &'a RoleToken)> + 'a {
    let mut awaiting_target = false;
    tokens.iter().map(move |token| {
        let value = token.value();
        let unquoted = token.token.quote == QuoteKind::None;
        if awaiting_target {
            awaiting_target = false;
            return (Kind::Passenger, token);
        }
        if unquoted && is_redirection(value) {
            // `>`, `2>>`, `&>` still need their target; `2>&1` and a lone `&` do not
            awaiting_target = value != "&" && !value.ends_with(|c: char| c.is_ascii_digit());
            return (Kind::Passenger, token);
        }
        if unquoted && starts_with_redirection(value) {
            return (Kind::Passenger, token);
        }
        let is_flag = token.role == Role::Flag
            || (source == Dialect::Cmd && unquoted && is_cmd_switch(value));
        if is_flag {
            (Kind::Flag, token)
        } else {
            (Kind::Operand, token)
        }
    })
}

/// Target spellings for one source flag; empty when the flag is dropped
fn translate_flag(mapping: &CommandMapping, flag: &str, source: Dialect) -> Option<Vec<String>> {
    if let Some(spelling) = mapping.flag(flag) {
        return Some(
            Some(spelling)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .into_iter()
                .collect(),
        );
    }

    // Unix short-option cluster: -la => -l -a
    let cluster = flag.strip_prefix('-')?;
    if source != Dialect::Unix || cluster.starts_with('-') || cluster.chars().count() < 2 {
        return None;
    }
    let mut spellings: Vec<String> = Vec::new();
    for c in cluster.chars() {
        let spelling = mapping.flag(&format!("-{c}"))?;
        if !spelling.is_empty() && !spellings.iter().any(|s| s == spelling) {
            spellings.push(spelling.to_string());
        }
    }
    Some(spellings)
}

/// Apply a flat flag table; `None` if any flag is unmapped or a required
/// operand is missing
fn translate_static(
    mapping: &CommandMapping,
    rest: &[RoleToken],
    source: Dialect,
) -> Option<String> {
    let mut parts = vec![mapping.target_name.clone()];
    let mut operands = 0;

    for (kind, token) in classify(rest, source) {
        match kind {
            Kind::Flag => parts.extend(translate_flag(mapping, token.value(), source)?),
            Kind::Operand => {
                operands += 1;
                parts.push(token.value().to_string());
            }
            Kind::Passenger => parts.push(token.value().to_string()),
        }
    }

    if mapping.requires_arguments && operands == 0 {
        return None;
    }
    Some(parts.join(" "))
}
