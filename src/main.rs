use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shellbridge::config::Config;
use shellbridge::shell::{detect_dialect, detect_shell, EnvSnapshot, ProcessProbe, ShellCapability};
use shellbridge::{mappings, Translator};
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Shellbridge - translate shell commands between Unix, PowerShell and cmd
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print the command translated for the target shell
    Translate {
        /// Target shell (pwsh, powershell, cmd, bash); detected when omitted
        #[arg(short, long)]
        target: Option<String>,

        /// Command line to translate
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Report commands and flags that cannot be translated
    Lint {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Print the detected target shell, or the dialect of a command
    Detect {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_default()?
    };
    let env = EnvSnapshot::capture();
    config.apply_env(&env);

    // Initialize logging to stderr so translated output stays clean on stdout
    let log_level = if args.debug || config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    let registry = config.build_registry()?;
    if mappings::install(registry).is_err() {
        warn!("Mapping registry was already installed");
    }

    let resolve_target = |target: Option<&str>| -> ShellCapability {
        let override_name = target.or(config.translation.target_shell.as_deref());
        let probe = ProcessProbe::new(config.translation.probe_timeout());
        detect_shell(&env, override_name, &probe)
    };

    match args.command {
        Action::Translate { target, words } => {
            let command = words.join(" ");
            let mut translator =
                Translator::new(mappings::registry(), resolve_target(target.as_deref()));
            translator.set_enabled(config.translation.enabled);
            debug!("Target shell: {:?}", translator.target());
            println!("{}", translator.translate(&command).final_command);
        }
        Action::Lint { json, words } => {
            let command = words.join(" ");
            let translator = Translator::new(mappings::registry(), ShellCapability::default());
            let report = translator.lint(&command);

            if json {
                let out = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize lint report")?;
                println!("{}", out);
            } else if report.is_clean() {
                println!("No issues found");
            } else {
                for item in &report.unsupported {
                    println!("unsupported: {}", item);
                }
                if !report.suggestions.is_empty() {
                    println!("did you mean: {}", report.suggestions.join(", "));
                }
            }
        }
        Action::Detect { words } => {
            if words.is_empty() {
                let capability = resolve_target(None);
                println!(
                    "{} (native && and ||: {}, version: {})",
                    capability.dialect,
                    capability.native_connectors,
                    capability
                        .version
                        .map_or_else(|| "unknown".to_string(), |v| v.to_string())
                );
            } else {
                println!("{}", detect_dialect(&words.join(" ")));
            }
        }
    }

    Ok(())
}
