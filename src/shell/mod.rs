//! Shell dialect and capability resolution.
//!
//! [`detect_shell`] decides what the *target* shell can do; [`detect_dialect`]
//! guesses which dialect an arbitrary command string was written in. Both are
//! heuristics over an explicit environment snapshot, never parsers.

use crate::error::ProbeError;
use crate::tokenizer::tokenize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default bound for the PowerShell version probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One of the supported shell syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Unix,
    PowerShell,
    Cmd,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Unix, Dialect::PowerShell, Dialect::Cmd];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Unix => "unix",
            Dialect::PowerShell => "powershell",
            Dialect::Cmd => "cmd",
        }
    }

    /// PowerShell and cmd resolve command names and switches case-insensitively
    #[must_use]
    pub fn is_case_insensitive(self) -> bool {
        !matches!(self, Dialect::Unix)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the target execution environment supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShellCapability {
    pub dialect: Dialect,
    /// Whether `&&` / `||` work natively
    pub native_connectors: bool,
    pub version: Option<u32>,
}

impl ShellCapability {
    #[must_use]
    pub fn unix() -> Self {
        Self {
            dialect: Dialect::Unix,
            native_connectors: true,
            version: None,
        }
    }

    /// PowerShell gained `&&` / `||` in 7.0; an unknown version is treated as legacy
    #[must_use]
    pub fn powershell(version: Option<u32>) -> Self {
        Self {
            dialect: Dialect::PowerShell,
            native_connectors: version.is_some_and(|v| v >= 7),
            version,
        }
    }

    #[must_use]
    pub fn cmd() -> Self {
        Self {
            dialect: Dialect::Cmd,
            native_connectors: true,
            version: None,
        }
    }

    /// Resolve an explicit override name such as `pwsh` or `cmd`
    #[must_use]
    pub fn from_override_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pwsh" | "pwsh.exe" | "powershell7" | "ps7" => Some(Self::powershell(Some(7))),
            "powershell" | "powershell.exe" | "powershell5" | "ps5" | "windows-powershell" => {
                Some(Self::powershell(Some(5)))
            }
            "cmd" | "cmd.exe" => Some(Self::cmd()),
            "bash" | "sh" | "zsh" | "unix" => Some(Self::unix()),
            _ => None,
        }
    }
}

impl Default for ShellCapability {
    fn default() -> Self {
        Self::powershell(Some(7))
    }
}

/// Point-in-time copy of the process environment.
///
/// Keys are upper-cased on Windows, where environment names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
    is_windows: bool,
}

impl EnvSnapshot {
    /// Capture the current process environment
    #[must_use]
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars(), cfg!(windows))
    }

    #[must_use]
    pub fn from_vars<I, K, V>(vars: I, is_windows: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| {
                let key = k.into();
                let key = if is_windows {
                    key.to_ascii_uppercase()
                } else {
                    key
                };
                (key, v.into())
            })
            .collect();
        Self { vars, is_windows }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.is_windows {
            self.vars.get(&key.to_ascii_uppercase()).map(String::as_str)
        } else {
            self.vars.get(key).map(String::as_str)
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.is_windows
    }
}

/// Source of the installed PowerShell major version
pub trait VersionProbe {
    fn powershell_major_version(&self) -> Option<u32>;
}

/// Probe that never finds PowerShell
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl VersionProbe for NoProbe {
    fn powershell_major_version(&self) -> Option<u32> {
        None
    }
}

/// Probe that asks a PowerShell executable for its version, bounded by a timeout
#[derive(Debug, Clone, Copy)]
pub struct ProcessProbe {
    timeout: Duration,
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl ProcessProbe {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run one executable and read `$PSVersionTable.PSVersion.Major`
    ///
    /// # Errors
    /// Returns an error if the executable is missing, cannot be spawned, does
    /// not exit within the timeout, or prints something other than a number
    pub fn probe(&self, program: &'static str) -> Result<u32, ProbeError> {
        let path = which::which(program).map_err(|_| ProbeError::NotFound(program))?;

        let mut child = Command::new(path)
            .args([
                "-NoLogo",
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "$PSVersionTable.PSVersion.Major",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProbeError::Spawn { program, source })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProbeError::Timeout(program));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => return Err(ProbeError::Spawn { program, source }),
            }
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .map_err(|source| ProbeError::Spawn { program, source })?;
        }
        parse_major_version(&output)
    }
}

impl VersionProbe for ProcessProbe {
    fn powershell_major_version(&self) -> Option<u32> {
        for program in ["pwsh", "powershell"] {
            match self.probe(program) {
                Ok(version) => {
                    debug!("{} reports PowerShell {}", program, version);
                    return Some(version);
                }
                Err(e) => debug!("PowerShell probe failed: {}", e),
            }
        }
        None
    }
}

fn parse_major_version(output: &str) -> Result<u32, ProbeError> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse().ok())
        .ok_or_else(|| ProbeError::BadOutput(output.trim().to_string()))
}

/// Determine the target shell capability.
///
/// Decision order: explicit override, then (on Windows) environment markers
/// for a Unix bridge or cmd, then the PowerShell version probe. Non-Windows
/// platforms are assumed to run a POSIX shell.
pub fn detect_shell(
    env: &EnvSnapshot,
    override_name: Option<&str>,
    probe: &dyn VersionProbe,
) -> ShellCapability {
    if let Some(name) = override_name.filter(|n| !n.trim().is_empty()) {
        match ShellCapability::from_override_name(name) {
            Some(capability) => {
                debug!("Using shell override '{}': {:?}", name, capability);
                return capability;
            }
            None => warn!("Ignoring unknown shell override '{}'", name),
        }
    }

    if !env.is_windows() {
        return ShellCapability::unix();
    }

    // Git Bash, MSYS2 and Cygwin all export one of these
    if env.contains("MSYSTEM") || env.contains("SHELL") {
        return ShellCapability::unix();
    }

    let pwsh_marker = env.contains("POWERSHELL_DISTRIBUTION_CHANNEL");
    if env.contains("PROMPT") && !pwsh_marker {
        return ShellCapability::cmd();
    }

    match probe.powershell_major_version() {
        Some(version) => ShellCapability::powershell(Some(version)),
        None if pwsh_marker => ShellCapability::powershell(Some(7)),
        None => {
            debug!("PowerShell version unknown, assuming legacy connectors");
            ShellCapability::powershell(None)
        }
    }
}

static CMDLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Get|Set|New|Remove|Copy|Move|Rename|Select|Where|ForEach|Write|Read|Invoke|Start|Stop|Restart|Test|Out|Measure|Sort|Clear|Add|Import|Export|Format|Join|Split|Resolve|Update|Enable|Disable|ConvertTo|ConvertFrom)-[A-Z][A-Za-z]*\b",
    )
    .expect("cmdlet pattern is valid")
});

static PS_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$env:|\$PSVersionTable|\$PSScriptRoot").expect("variable pattern is valid")
});

static CMD_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[A-Za-z_][A-Za-z0-9_]*%").expect("cmd variable pattern is valid"));

const CMD_BUILTINS: &[&str] = &[
    "dir", "copy", "xcopy", "robocopy", "del", "erase", "move", "ren", "rename", "rd", "rmdir",
    "md", "type", "cls", "findstr", "tasklist", "taskkill", "where", "attrib", "set",
];

/// Whether a word looks like a cmd switch (`/S`, `/Q`, `/?`, `/PID`)
#[must_use]
pub fn is_cmd_switch(word: &str) -> bool {
    word.strip_prefix('/').is_some_and(|rest| {
        (1..=4).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_alphabetic() || c == '?')
    })
}

/// Guess which dialect a command string was written in
#[must_use]
pub fn detect_dialect(command: &str) -> Dialect {
    if CMDLET.is_match(command) || PS_VARIABLE.is_match(command) {
        return Dialect::PowerShell;
    }
    if CMD_VARIABLE.is_match(command) {
        return Dialect::Cmd;
    }

    let tokens = tokenize(command);
    let first_is_builtin = tokens
        .first()
        .is_some_and(|t| CMD_BUILTINS.contains(&t.value.to_ascii_lowercase().as_str()));
    if first_is_builtin && tokens.iter().skip(1).any(|t| is_cmd_switch(&t.value)) {
        return Dialect::Cmd;
    }

    Dialect::Unix
}

/// Capture the environment and resolve the target shell with the process probe
#[must_use]
pub fn detect_shell_capability(override_name: Option<&str>, timeout: Duration) -> ShellCapability {
    detect_shell(&EnvSnapshot::capture(), override_name, &ProcessProbe::new(timeout))
}
