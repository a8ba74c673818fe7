//! CLI application for solving click-captchas.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, parse, solve};

/// Click-captcha solver - turn a captcha image and its instruction into clicks
#[derive(Parser)]
#[command(name = "clickcap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single captcha
    Solve(solve::SolveArgs),

    /// Show the target characters parsed from an instruction
    Parse(parse::ParseArgs),

    /// Solve every captcha listed in a CSV manifest
    Batch(batch::BatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Solve(args) => solve::run(args, cli.config.as_deref()).await,
        Commands::Parse(args) => parse::run(args).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_solve_arguments() {
        let cli = Cli::try_parse_from([
            "clickcap",
            "-vv",
            "solve",
            "captcha.png",
            "--instruction",
            "请依次点击【圈,谁,船】",
            "--origin",
            "120,48.5",
            "--format",
            "text",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Solve(_)));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["clickcap", "parse", "点击 天", "--config", "c.json"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("c.json"));
    }

    #[test]
    fn test_solve_requires_instruction() {
        assert!(Cli::try_parse_from(["clickcap", "solve", "captcha.png"]).is_err());
    }

    #[test]
    fn test_bad_origin_is_rejected() {
        assert!(
            Cli::try_parse_from([
                "clickcap",
                "solve",
                "captcha.png",
                "-i",
                "点击 天",
                "--origin",
                "120",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_config_subcommands() {
        for args in [
            vec!["clickcap", "config", "show"],
            vec!["clickcap", "config", "path"],
            vec!["clickcap", "config", "get", "retry.max_attempts"],
            vec!["clickcap", "config", "set", "retry.max_attempts", "3"],
            vec!["clickcap", "config", "init", "--force"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "{:?}", args);
        }
    }

    #[test]
    fn test_batch_arguments() {
        let cli = Cli::try_parse_from([
            "clickcap",
            "batch",
            "manifest.csv",
            "--output-dir",
            "out",
            "--summary",
            "--continue-on-error",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Batch(_)));
    }
}
