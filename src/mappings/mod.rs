//! Command mapping tables.
//!
//! A single canonical table of [`BidirectionalMapping`] entries names each
//! command and its flags in every dialect. The one-way [`CommandMapping`]
//! views used by the translator are generated from it whenever an entry is
//! registered.

mod builtin;

use crate::error::MappingError;
use crate::rules::DynamicRule;
use crate::shell::Dialect;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Spellings of one flag across dialects.
///
/// `Some("")` drops the flag in that dialect; `None` means it has no equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpec {
    #[serde(default)]
    pub unix: Option<String>,
    #[serde(default)]
    pub powershell: Option<String>,
    #[serde(default)]
    pub cmd: Option<String>,
}

impl FlagSpec {
    #[must_use]
    pub fn spelling(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::Unix => self.unix.as_deref(),
            Dialect::PowerShell => self.powershell.as_deref(),
            Dialect::Cmd => self.cmd.as_deref(),
        }
    }
}

/// One command across all three dialects; also the mapping-extension file schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidirectionalMapping {
    #[serde(default)]
    pub unix: Option<String>,
    #[serde(default)]
    pub powershell: Option<String>,
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub requires_arguments: bool,
    #[serde(default)]
    pub flags: Vec<FlagSpec>,
}

impl BidirectionalMapping {
    #[must_use]
    pub fn name(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::Unix => self.unix.as_deref(),
            Dialect::PowerShell => self.powershell.as_deref(),
            Dialect::Cmd => self.cmd.as_deref(),
        }
        .filter(|name| !name.trim().is_empty())
    }

    fn label(&self) -> String {
        Dialect::ALL
            .iter()
            .find_map(|d| self.name(*d))
            .unwrap_or("<unnamed>")
            .to_string()
    }

    /// Check that the entry names a command in at least two dialects
    ///
    /// # Errors
    /// Returns [`MappingError::Invalid`] for entries that cannot produce any direction
    pub fn validate(&self) -> Result<(), MappingError> {
        let named = Dialect::ALL.iter().filter(|d| self.name(**d).is_some()).count();
        if named < 2 {
            return Err(MappingError::Invalid(
                self.label(),
                "a mapping needs names in at least two dialects",
            ));
        }
        Ok(())
    }

    /// Generate the one-way view from `source` to `target`
    #[must_use]
    pub fn direction(&self, source: Dialect, target: Dialect) -> Option<CommandMapping> {
        if source == target {
            return None;
        }
        let source_name = self.name(source)?;
        let target_name = self.name(target)?;

        let mut flag_table = HashMap::new();
        for flag in &self.flags {
            let (Some(from), Some(to)) = (flag.spelling(source), flag.spelling(target)) else {
                continue;
            };
            if from.is_empty() {
                continue;
            }
            // Several source spellings may share one target spelling; the first listed wins
            flag_table
                .entry(normalize(from, source))
                .or_insert_with(|| to.to_string());
        }

        Some(CommandMapping {
            source_name: source_name.to_string(),
            target_name: target_name.to_string(),
            flag_table,
            requires_arguments: self.requires_arguments,
            case_insensitive: source.is_case_insensitive(),
        })
    }
}

/// One-way command mapping generated from the canonical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMapping {
    pub source_name: String,
    pub target_name: String,
    /// Source flag to target flag; an empty target drops the flag
    pub flag_table: HashMap<String, String>,
    pub requires_arguments: bool,
    case_insensitive: bool,
}

impl CommandMapping {
    /// Target spelling for a source flag, `Some("")` when the flag is dropped
    #[must_use]
    pub fn flag(&self, flag: &str) -> Option<&str> {
        let key = if self.case_insensitive {
            flag.to_ascii_lowercase()
        } else {
            flag.to_string()
        };
        self.flag_table.get(&key).map(String::as_str)
    }

    /// Known source flags, sorted
    #[must_use]
    pub fn flags(&self) -> Vec<&str> {
        let mut flags: Vec<&str> = self.flag_table.keys().map(String::as_str).collect();
        flags.sort_unstable();
        flags
    }
}

fn normalize(word: &str, dialect: Dialect) -> String {
    if dialect.is_case_insensitive() {
        word.to_ascii_lowercase()
    } else {
        word.to_string()
    }
}

/// How a command is translated: a grammar-specific rewrite or a flat flag table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule<'a> {
    Dynamic(DynamicRule),
    Static(&'a CommandMapping),
}

/// Append-only registry of command mappings
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    entries: Vec<BidirectionalMapping>,
    directions: HashMap<(Dialect, Dialect), HashMap<String, CommandMapping>>,
}

impl MappingRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in table
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for mapping in builtin::mappings() {
            registry.insert(mapping);
        }
        registry
    }

    /// Append one mapping.
    ///
    /// A source spelling that is already registered for a direction keeps its
    /// earlier mapping; the new entry only fills directions that were missing.
    ///
    /// # Errors
    /// Returns [`MappingError::Invalid`] if the entry fails validation
    pub fn register(&mut self, mapping: BidirectionalMapping) -> Result<(), MappingError> {
        mapping.validate()?;
        self.insert(mapping);
        Ok(())
    }

    /// Append several mappings, stopping at the first invalid one
    ///
    /// # Errors
    /// Returns [`MappingError::Invalid`] for the first entry that fails validation
    pub fn extend<I>(&mut self, mappings: I) -> Result<(), MappingError>
    where
        I: IntoIterator<Item = BidirectionalMapping>,
    {
        for mapping in mappings {
            self.register(mapping)?;
        }
        Ok(())
    }

    /// Append the mappings listed in a YAML extension file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a YAML list of
    /// mappings, or contains an invalid entry
    pub fn extend_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, MappingError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mappings: Vec<BidirectionalMapping> =
            serde_yaml::from_str(&contents).map_err(|source| MappingError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let count = mappings.len();
        self.extend(mappings)?;
        info!("Loaded {} mapping extensions from {}", count, path.display());
        Ok(count)
    }

    fn insert(&mut self, mapping: BidirectionalMapping) {
        for source in Dialect::ALL {
            for target in Dialect::ALL {
                let Some(view) = mapping.direction(source, target) else {
                    continue;
                };
                let key = normalize(&view.source_name, source);
                let table = self.directions.entry((source, target)).or_default();
                if table.contains_key(&key) {
                    debug!("{} -> {}: '{}' already mapped", source, target, key);
                    continue;
                }
                table.insert(key, view);
            }
        }
        self.entries.push(mapping);
    }

    /// The static one-way mapping for a command name
    #[must_use]
    pub fn lookup(&self, name: &str, source: Dialect, target: Dialect) -> Option<&CommandMapping> {
        self.directions
            .get(&(source, target))?
            .get(&normalize(name, source))
    }

    /// Resolve how a command is translated. Dynamic rules take priority and
    /// only apply to Unix commands headed for PowerShell.
    #[must_use]
    pub fn resolve(&self, name: &str, source: Dialect, target: Dialect) -> Option<Rule<'_>> {
        if source == Dialect::Unix && target == Dialect::PowerShell {
            if let Some(rule) = DynamicRule::for_command(name) {
                return Some(Rule::Dynamic(rule));
            }
        }
        self.lookup(name, source, target).map(Rule::Static)
    }

    /// Every command name that `resolve` understands for a direction, sorted
    #[must_use]
    pub fn known_commands(&self, source: Dialect, target: Dialect) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .directions
            .get(&(source, target))
            .map(|table| table.values().map(|m| m.source_name.as_str()).collect())
            .unwrap_or_default();
        if source == Dialect::Unix && target == Dialect::PowerShell {
            names.extend(DynamicRule::ALL.iter().map(|rule| rule.command()));
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static REGISTRY: OnceCell<MappingRegistry> = OnceCell::new();

/// Install the process-wide registry. Only the first call succeeds.
///
/// # Errors
/// Returns [`MappingError::AlreadyInstalled`] if a registry is already in place
pub fn install(registry: MappingRegistry) -> Result<(), MappingError> {
    REGISTRY
        .set(registry)
        .map_err(|_| MappingError::AlreadyInstalled)
}

/// The process-wide registry, seeded with the built-in table if none was installed
pub fn registry() -> &'static MappingRegistry {
    REGISTRY.get_or_init(MappingRegistry::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_lookup() {
        let registry = MappingRegistry::builtin();
        let rm = registry
            .lookup("rm", Dialect::Unix, Dialect::PowerShell)
            .unwrap();
        assert_eq!(rm.target_name, "Remove-Item");
        assert_eq!(rm.flag("-r"), Some("-Recurse"));
        assert_eq!(rm.flag("-Z"), None);
        assert!(rm.requires_arguments);
    }

    #[test]
    fn test_dropped_flag() {
        let registry = MappingRegistry::builtin();
        let ls = registry
            .lookup("ls", Dialect::Unix, Dialect::PowerShell)
            .unwrap();
        assert_eq!(ls.flag("-l"), Some(""));
    }

    #[test]
    fn test_reverse_direction_is_generated() {
        let registry = MappingRegistry::builtin();
        let view = registry
            .lookup("remove-item", Dialect::PowerShell, Dialect::Unix)
            .unwrap();
        assert_eq!(view.target_name, "rm");
        // -r and -R both map to -Recurse; the first listed wins on the way back
        assert_eq!(view.flag("-RECURSE"), Some("-r"));
    }

    #[test]
    fn test_unix_lookup_is_case_sensitive() {
        let registry = MappingRegistry::builtin();
        assert!(registry.lookup("LS", Dialect::Unix, Dialect::PowerShell).is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = MappingRegistry::builtin();
        let view = registry.lookup("cd", Dialect::Cmd, Dialect::Unix).unwrap();
        assert_eq!(view.target_name, "cd");
    }

    #[test]
    fn test_resolve_prefers_dynamic_rules() {
        let registry = MappingRegistry::builtin();
        assert_eq!(
            registry.resolve("head", Dialect::Unix, Dialect::PowerShell),
            Some(Rule::Dynamic(DynamicRule::Head))
        );
        assert!(matches!(
            registry.resolve("ls", Dialect::Unix, Dialect::PowerShell),
            Some(Rule::Static(_))
        ));
        assert!(registry.resolve("head", Dialect::Unix, Dialect::Cmd).is_none());
        assert!(registry.resolve("nosuchcmd", Dialect::Unix, Dialect::PowerShell).is_none());
    }

    #[test]
    fn test_register_rejects_single_dialect() {
        let mut registry = MappingRegistry::new();
        let err = registry
            .register(BidirectionalMapping {
                unix: Some("tree".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, MappingError::Invalid(name, _) if name == "tree"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_extend_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("extra.yaml");
        std::fs::write(
            &path,
            r"
- unix: tree
  powershell: Get-ChildItem -Recurse
  flags:
    - { unix: -a, powershell: -Force }
",
        )
        .unwrap();

        let mut registry = MappingRegistry::builtin();
        let before = registry.len();
        assert_eq!(registry.extend_from_file(&path).unwrap(), 1);
        assert_eq!(registry.len(), before + 1);

        let tree = registry
            .lookup("tree", Dialect::Unix, Dialect::PowerShell)
            .unwrap();
        assert_eq!(tree.target_name, "Get-ChildItem -Recurse");
        assert_eq!(tree.flag("-a"), Some("-Force"));
    }

    #[test]
    fn test_extend_from_missing_file() {
        let mut registry = MappingRegistry::new();
        let err = registry
            .extend_from_file("/nonexistent/shellbridge/extra.yaml")
            .unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
    }

    #[test]
    fn test_extend_from_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "unix: [not, a, list").unwrap();
        let mut registry = MappingRegistry::new();
        assert!(matches!(
            registry.extend_from_file(&path),
            Err(MappingError::Parse { .. })
        ));
    }

    #[test]
    fn test_known_commands_include_dynamic_rules() {
        let registry = MappingRegistry::builtin();
        let names = registry.known_commands(Dialect::Unix, Dialect::PowerShell);
        assert!(names.contains(&"ls"));
        assert!(names.contains(&"sed"));
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }
}
