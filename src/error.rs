use std::path::PathBuf;

/// Errors raised while loading or installing command mappings
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse mapping file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid mapping for '{0}': {1}")]
    Invalid(String, &'static str),
    #[error("the mapping registry has already been installed")]
    AlreadyInstalled,
}

/// Errors raised by the shell version probe
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} was not found on PATH")]
    NotFound(&'static str),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} did not answer within the probe timeout")]
    Timeout(&'static str),
    #[error("unexpected version output: {0:?}")]
    BadOutput(String),
}
