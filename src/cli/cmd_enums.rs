use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Defines the command-line interface (CLI) for `hamshack`.
/// `#[derive(Parser)]` automatically generates argument parsing code via `clap`.
#[derive(Parser)]
#[command(name = "hamshack")]
#[command(version, about = "Download, silently install and configure amateur-radio applications")]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Enumerates all supported subcommands with their specific arguments and options.
#[derive(Subcommand)]
pub enum Commands {
    /// Resolves, downloads and silently installs the selected applications.
    /// This is the primary command.
    Run(RunArgs),
    /// Lists every known application: the built-in catalog plus any targets
    /// defined in the configuration file.
    List {
        /// Configuration file whose custom targets should be included.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Writes a sample configuration file to start from.
    Generate {
        /// Where to write the sample. Defaults to `hamshack.json` in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the run configuration (JSON, or YAML for `.yaml` / `.yml`).
    #[arg(long)]
    pub(crate) config: PathBuf,

    /// Install this application even if it is not selected by default. Repeatable.
    #[arg(long = "with", value_name = "NAME")]
    pub(crate) with: Vec<String>,

    /// Skip this application. Repeatable.
    #[arg(long = "without", value_name = "NAME")]
    pub(crate) without: Vec<String>,

    /// Install every known application.
    #[arg(long)]
    pub(crate) all: bool,

    /// Directory for the run log, overriding `logging.directory`.
    #[arg(long, value_name = "DIR")]
    pub(crate) log_dir: Option<PathBuf>,

    /// Resolve download URLs only; nothing is downloaded or installed.
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "hamshack", "-d", "run", "--config", "station.json", "--with", "flmsg", "--with",
            "qlog", "--without", "wsjtx", "--dry-run",
        ])
        .unwrap();
        assert!(cli.debug);
        let Commands::Run(args) = cli.command else {
            panic!("expected the run subcommand");
        };
        assert_eq!(args.config, PathBuf::from("station.json"));
        assert_eq!(args.with, ["flmsg", "qlog"]);
        assert_eq!(args.without, ["wsjtx"]);
        assert!(args.dry_run);
        assert!(!args.all);
    }

    #[test]
    fn run_requires_a_config() {
        assert!(Cli::try_parse_from(["hamshack", "run"]).is_err());
    }
}
