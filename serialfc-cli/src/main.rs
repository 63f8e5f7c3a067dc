//! serialfc CLI - Command-line tool for SerialFC adapter features.
//!
//! ## Features
//!
//! - Show every feature of a port in one call
//! - Read, set, enable and disable individual features
//! - Apply named feature profiles from a config file
//! - Dry runs against a simulated adapter
//! - Shell completion generation
//! - Environment variable support

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    clap_complete::Shell,
    env_logger::Env,
    log::debug,
    serialfc::Feature,
    std::{env, path::PathBuf},
};

mod commands;
mod config;

use {
    commands::{
        SessionOptions,
        feature::{cmd_disable, cmd_enable, cmd_get, cmd_set, cmd_show, parse_feature, parse_u32},
        profile::{cmd_apply, cmd_profiles},
    },
    config::Config,
};

/// Baud rate used when neither the command line nor the config sets one.
const DEFAULT_BAUD: u32 = 115200;

/// serialfc - Control the hardware features of SerialFC serial adapters.
///
/// Environment variables:
///   SERIALFC_PORT   - Default serial port
///   SERIALFC_BAUD   - Default baud rate (default: 115200)
///
/// Features: rs485, echo-cancel, termination, nine-bit, sample-rate,
/// tx-trigger, rx-trigger, frame-length, clock-rate, isochronous,
/// external-transmit, fixed-baud-rate, card-type
#[derive(Parser)]
#[command(name = "serialfc")]
#[command(author, version, about, long_about)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Serial port to use (e.g., COM3).
    #[arg(short, long, global = true, env = "SERIALFC_PORT")]
    port: Option<String>,

    /// Baud rate for the base serial session [default: 115200].
    #[arg(short, long, global = true, env = "SERIALFC_BAUD")]
    baud: Option<u32>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a simulated adapter instead of hardware.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show every readable feature of the port.
    Show {
        /// Output as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Read one feature.
    Get {
        /// Feature name (e.g., rs485, rx-trigger).
        #[arg(value_parser = parse_feature)]
        feature: Feature,

        /// Output as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Change one feature.
    ///
    /// Switches take on/off, numeric features a decimal or 0x-prefixed
    /// number. Mode features take a number to enable or "off" to disable.
    Set {
        /// Feature name (e.g., termination, clock-rate).
        #[arg(value_parser = parse_feature)]
        feature: Feature,

        /// New value.
        value: String,
    },

    /// Enable a mode feature (isochronous, external-transmit, fixed-baud-rate).
    Enable {
        /// Mode feature name.
        #[arg(value_parser = parse_feature)]
        feature: Feature,

        /// Mode argument: isochronous mode, characters per signal or baud rate.
        #[arg(value_parser = parse_u32)]
        value: u32,
    },

    /// Disable a mode feature (isochronous, external-transmit, fixed-baud-rate).
    Disable {
        /// Mode feature name.
        #[arg(value_parser = parse_feature)]
        feature: Feature,
    },

    /// Apply a named profile from the configuration file.
    Apply {
        /// Profile name.
        profile: String,
    },

    /// List configured profiles.
    Profiles {
        /// Output as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolve port and baud rate: command line and environment win over config.
fn session_options(cli: &Cli, config: &Config) -> SessionOptions {
    SessionOptions {
        port: cli
            .port
            .clone()
            .or_else(|| {
                config
                    .port
                    .name
                    .clone()
            }),
        baud: cli
            .baud
            .or(config.port.baud)
            .unwrap_or(DEFAULT_BAUD),
        dry_run: cli.dry_run,
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

fn main() -> Result<()> {
    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);

    debug!(
        "serialfc v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    // Load configuration
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)?
    } else {
        Config::load()
    };
    let opts = session_options(&cli, &config);

    match &cli.command {
        Commands::Show { json } => cmd_show(&opts, *json)?,
        Commands::Get { feature, json } => cmd_get(&opts, *feature, *json)?,
        Commands::Set { feature, value } => cmd_set(&opts, *feature, value, cli.quiet)?,
        Commands::Enable { feature, value } => cmd_enable(&opts, *feature, *value, cli.quiet)?,
        Commands::Disable { feature } => cmd_disable(&opts, *feature, cli.quiet)?,
        Commands::Apply { profile } => cmd_apply(&opts, &config, profile, cli.quiet)?,
        Commands::Profiles { json } => cmd_profiles(&config, *json)?,
        Commands::Completions { shell } => commands::completions::cmd_completions(*shell),
    }

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use {super::*, clap::CommandFactory};

    // ---- clap validation ----

    #[test]
    fn test_cli_command_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_show() {
        let cli = Cli::try_parse_from(["serialfc", "--port", "COM3", "show", "--json"]).unwrap();
        assert_eq!(cli.port.as_deref(), Some("COM3"));
        assert!(matches!(cli.command, Commands::Show { json: true }));
    }

    #[test]
    fn test_cli_parse_get_normalizes_feature() {
        let cli = Cli::try_parse_from(["serialfc", "get", "Echo_Cancel"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Get {
                feature: Feature::EchoCancel,
                json: false
            }
        ));
    }

    #[test]
    fn test_cli_parse_set() {
        let cli = Cli::try_parse_from(["serialfc", "set", "rx-trigger", "0x40"]).unwrap();
        match cli.command {
            Commands::Set { feature, value } => {
                assert_eq!(feature, Feature::RxTrigger);
                assert_eq!(value, "0x40");
            },
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_cli_parse_enable_hex_value() {
        let cli = Cli::try_parse_from(["serialfc", "enable", "fixed-baud-rate", "0xF4240"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Enable {
                feature: Feature::FixedBaudRate,
                value: 1_000_000
            }
        ));
    }

    #[test]
    fn test_cli_parse_disable() {
        let cli = Cli::try_parse_from(["serialfc", "disable", "isochronous"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Disable {
                feature: Feature::Isochronous
            }
        ));
    }

    #[test]
    fn test_cli_parse_apply_and_profiles() {
        let cli = Cli::try_parse_from(["serialfc", "apply", "bus"]).unwrap();
        assert!(matches!(cli.command, Commands::Apply { ref profile } if profile == "bus"));

        let cli = Cli::try_parse_from(["serialfc", "profiles", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Profiles { json: true }));
    }

    #[test]
    fn test_cli_parse_completions() {
        let cli = Cli::try_parse_from(["serialfc", "completions", "zsh"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Zsh }
        ));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "serialfc",
            "--port",
            "COM5",
            "--baud",
            "9600",
            "-vv",
            "--quiet",
            "--dry-run",
            "--config",
            "/tmp/serialfc.toml",
            "show",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("COM5"));
        assert_eq!(cli.baud, Some(9600));
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
        assert!(cli.dry_run);
        assert_eq!(
            cli.config_path
                .as_deref(),
            Some(std::path::Path::new("/tmp/serialfc.toml"))
        );
    }

    #[test]
    fn test_cli_rejects_unknown_feature() {
        assert!(Cli::try_parse_from(["serialfc", "get", "turbo"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_enable_value() {
        assert!(Cli::try_parse_from(["serialfc", "enable", "isochronous", "fast"]).is_err());
    }

    #[test]
    fn test_cli_missing_subcommand() {
        assert!(Cli::try_parse_from(["serialfc"]).is_err());
    }

    // ---- option resolution ----

    #[test]
    fn test_session_options_prefer_cli() {
        let mut config = Config::default();
        config.port.name = Some("COM1".to_string());
        config.port.baud = Some(57600);

        let cli = Cli::try_parse_from(["serialfc", "--port", "COM2", "--baud", "9600", "show"])
            .unwrap();
        let opts = session_options(&cli, &config);
        assert_eq!(opts.port.as_deref(), Some("COM2"));
        assert_eq!(opts.baud, 9600);
    }

    #[test]
    fn test_session_options_fall_back_to_config_then_default() {
        let mut config = Config::default();
        config.port.name = Some("COM1".to_string());

        let cli = Cli {
            port: None,
            baud: None,
            verbose: 0,
            quiet: false,
            dry_run: false,
            config_path: None,
            command: Commands::Show { json: false },
        };
        let opts = session_options(&cli, &config);
        assert_eq!(opts.port.as_deref(), Some("COM1"));
        assert_eq!(opts.baud, DEFAULT_BAUD);

        config.port.baud = Some(230400);
        assert_eq!(session_options(&cli, &config).baud, 230400);
    }
}
