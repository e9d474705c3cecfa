use super::{
    classify, has_brace_expansion, has_heredoc, translate_flag, Kind, Stage, Translator,
};
use crate::mappings::Rule;
use crate::shell::{detect_dialect, Dialect};
use crate::splitter::{split_by_connectors, split_by_pipe, Piece};
use crate::tokenizer::tokenize;
use serde::Serialize;
use tracing::debug;

const MAX_SUGGESTIONS: usize = 3;

/// Unknown commands, flags and usages found in a command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub unsupported: Vec<String>,
    pub suggestions: Vec<String>,
}

impl LintReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unsupported.is_empty()
    }

    fn suggest(&mut self, names: Vec<&str>) {
        for name in names {
            if !self.suggestions.iter().any(|s| s == name) {
                self.suggestions.push(name.to_string());
            }
        }
    }
}

impl Translator<'_> {
    /// Report what `translate` would pass through instead of translating.
    ///
    /// Stages that are passed through on purpose (heredocs, groups, `${...}`)
    /// are not reported.
    #[must_use]
    pub fn lint(&self, command: &str) -> LintReport {
        let mut report = LintReport::default();
        let source = detect_dialect(command);
        if source == self.target.dialect || has_heredoc(&tokenize(command)) {
            return report;
        }

        for piece in split_by_connectors(command) {
            if let Piece::Chunk(chunk) = piece {
                if has_brace_expansion(chunk) {
                    continue;
                }
                for stage in split_by_pipe(chunk) {
                    self.lint_stage(stage, source, &mut report);
                }
            }
        }
        report
    }

    fn lint_stage(&self, segment: &str, source: Dialect, report: &mut LintReport) {
        let stage = match Stage::parse(segment) {
            Ok(Some(stage)) => stage,
            Ok(None) => return,
            Err(reason) => {
                debug!("Not linting '{}': {}", segment, reason);
                return;
            }
        };

        let name = stage.command.value();
        let target = self.target.dialect;
        match self.registry.resolve(name, source, target) {
            None => {
                report.unsupported.push(format!("command '{name}'"));
                let known = self.registry.known_commands(source, target);
                report.suggest(nearest(name, known));
            }
            Some(Rule::Dynamic(rule)) => {
                let rewritten =
                    rule.apply(&stage.tokens[1..], &self.target, &|inner| inner.to_string());
                if stage.has_redirection(source) || rewritten.is_none() {
                    report.unsupported.push(format!("usage '{}'", segment.trim()));
                }
            }
            Some(Rule::Static(mapping)) => {
                for (kind, token) in classify(&stage.tagged[1..], source) {
                    let flag = token.value();
                    if kind == Kind::Flag && translate_flag(mapping, flag, source).is_none() {
                        report.unsupported.push(format!("flag '{flag}' for '{name}'"));
                        report.suggest(nearest(flag, mapping.flags()));
                    }
                }
                if mapping.requires_arguments && stage.operand_count(source) == 0 {
                    report.unsupported.push(format!("usage '{}'", segment.trim()));
                }
            }
        }
    }
}

/// Comparison key: lower-cased, without leading dashes or slashes
fn key(word: &str) -> String {
    word.trim_start_matches(['-', '/']).to_ascii_lowercase()
}

/// Up to three candidates that contain or are contained in `word`, or whose
/// length differs by at most one and that share its first character.
/// Closest lengths come first.
fn nearest<'a>(word: &str, candidates: Vec<&'a str>) -> Vec<&'a str> {
    let wanted = key(word);
    if wanted.is_empty() {
        return Vec::new();
    }
    let wanted_len = wanted.chars().count();

    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let have = key(candidate);
            if have.is_empty() || have == wanted {
                return None;
            }
            let have_len = have.chars().count();
            let distance = have_len.abs_diff(wanted_len);
            // Single characters are contained in too many names to be useful
            let contained = have_len.min(wanted_len) >= 2
                && (have.contains(&wanted) || wanted.contains(&have));
            let related =
                contained || (distance <= 1 && have.chars().next() == wanted.chars().next());
            related.then_some((distance, candidate))
        })
        .collect();

    scored.sort_unstable();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::MappingRegistry;
    use crate::shell::ShellCapability;

    fn lint(command: &str) -> LintReport {
        let registry = MappingRegistry::builtin();
        Translator::new(&registry, ShellCapability::default()).lint(command)
    }

    #[test]
    fn test_clean_command() {
        let report = lint("ls -la | grep .ts | head -5");
        assert!(report.is_clean());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_unknown_command_with_suggestions() {
        let report = lint("lss -la");
        assert_eq!(report.unsupported, vec!["command 'lss'"]);
        assert!(report.suggestions.contains(&"ls".to_string()));
        assert!(report.suggestions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_unknown_flag() {
        let report = lint("rm -Z build");
        assert_eq!(report.unsupported, vec!["flag '-Z' for 'rm'"]);
    }

    #[test]
    fn test_flag_suggestions() {
        let report = lint("rm --forc x");
        assert_eq!(report.unsupported, vec!["flag '--forc' for 'rm'"]);
        assert_eq!(report.suggestions, vec!["--force"]);
    }

    #[test]
    fn test_dynamic_usage() {
        let report = lint("head --bogus");
        assert_eq!(report.unsupported, vec!["usage 'head --bogus'"]);
    }

    #[test]
    fn test_missing_operand() {
        let report = lint("rm -rf");
        assert_eq!(report.unsupported, vec!["usage 'rm -rf'"]);
    }

    #[test]
    fn test_guarded_stages_are_skipped() {
        assert!(lint("(frob | blip) && cat <<EOF").is_clean());
        assert!(lint("echo ${HOME}").is_clean());
        assert!(lint("echo ${HOME} | frob").is_clean());
        assert!(lint("cat <<EOF | frob\nblip -x\nEOF").is_clean());
    }

    #[test]
    fn test_redirected_dynamic_usage() {
        let report = lint("head -5 2>/dev/null");
        assert_eq!(report.unsupported, vec!["usage 'head -5 2>/dev/null'"]);
    }

    #[test]
    fn test_every_stage_is_checked() {
        let report = lint("frob && ls | blip");
        assert_eq!(report.unsupported, vec!["command 'frob'", "command 'blip'"]);
    }

    #[test]
    fn test_nearest_ordering() {
        let found = nearest("cat", vec!["cut", "cat", "cd", "concat", "tac"]);
        assert_eq!(found, vec!["cut", "cd", "concat"]);
    }

    #[test]
    fn test_nearest_limits_results() {
        let found = nearest("so", vec!["sort", "sed", "ls", "ps", "ssh", "sox"]);
        assert_eq!(found, vec!["sed", "sox", "ssh"]);
    }
}
