//! Shellbridge - translate shell command lines between dialects
//!
//! This library rewrites Unix-style command lines for PowerShell or the
//! Windows command prompt (and back) at the string level. Anything it cannot
//! translate with confidence is returned unchanged.
//!
//! # Modules
//!
//! - [`tokenizer`]: Position-annotated tokens
//! - [`roles`]: Operator/command/flag/argument tagging
//! - [`splitter`]: Nesting-aware connector and pipeline splitting
//! - [`mappings`]: Canonical command table and the process-wide registry
//! - [`rules`]: Per-command rewrites for commands with their own grammar
//! - [`translator`]: Orchestration, reconstruction and linting
//! - [`shell`]: Dialect detection and target shell capability
//! - [`emulation`]: `&&`/`||` emulation for shells without them
//! - [`config`]: Configuration management and serialization

pub mod config;
pub mod emulation;
pub mod error;
pub mod mappings;
pub mod roles;
pub mod rules;
pub mod shell;
pub mod splitter;
pub mod tokenizer;
pub mod translator;

pub use shell::{detect_dialect, detect_shell_capability, Dialect, ShellCapability};
pub use translator::{LintReport, TranslationResult, Translator};

/// Translate a command line for the given target shell using the
/// process-wide mapping registry
#[must_use]
pub fn translate(command: &str, capability: &ShellCapability) -> String {
    Translator::new(mappings::registry(), *capability)
        .translate(command)
        .final_command
}

/// Report unknown commands and flags, as seen from PowerShell 7
#[must_use]
pub fn lint(command: &str) -> LintReport {
    Translator::new(mappings::registry(), ShellCapability::default()).lint(command)
}
