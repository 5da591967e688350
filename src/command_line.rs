use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use tabsflow_infra::stage::Stage;

pub const DEFAULT_OUT_DIR: &str = "synth.out";
pub const OUT_DIR_ENV: &str = "SYNTH_OUT_DIR";

/// TabsFlow infrastructure synthesizer
#[derive(Debug, Parser)]
#[command(name = "tabsflow-infra")]
#[command(about = "Synthesizes the TabsFlow backend CloudFormation templates", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Deploy stage; overrides DEPLOY_STAGE from the environment
    #[arg(long, global = true)]
    pub stage: Option<Stage>,

    /// Defaults to `synth`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write one template per stack plus manifest.json
    Synth {
        /// Output directory
        #[arg(short, long, env = OUT_DIR_ENV, default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
    },
    /// Check credentials and table-name collisions in the target account
    Preflight,
}

impl Cli {
    /// The chosen subcommand; a bare invocation synthesizes into the same
    /// directory `synth` would.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Synth {
            out: out_dir(std::env::var(OUT_DIR_ENV).ok()),
        })
    }

    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

fn out_dir(from_env: Option<String>) -> PathBuf {
    from_env
        .filter(|dir| !dir.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_OUT_DIR), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synth_is_the_default_command() {
        let cli = Cli::try_parse_from(["tabsflow-infra"]).unwrap();
        assert_eq!(cli.log_level(), Level::INFO);
        assert!(cli.stage.is_none());
        match cli.command() {
            Command::Synth { out } => assert_eq!(out, PathBuf::from("synth.out")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_honours_out_dir_env() {
        assert_eq!(out_dir(Some("cdk.out".to_string())), PathBuf::from("cdk.out"));
        assert_eq!(out_dir(Some(String::new())), PathBuf::from(DEFAULT_OUT_DIR));
        assert_eq!(out_dir(None), PathBuf::from(DEFAULT_OUT_DIR));
    }

    #[test]
    fn verbose_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["tabsflow-infra", "preflight", "--verbose"]).unwrap();
        assert!(matches!(cli.command(), Command::Preflight));
        assert_eq!(cli.log_level(), Level::DEBUG);
    }

    #[test]
    fn stage_flag_parses() {
        let cli = Cli::try_parse_from(["tabsflow-infra", "synth", "--stage", "prod", "-o", "out"]).unwrap();
        assert_eq!(cli.stage, Some(Stage::Prod));
        assert!(Cli::try_parse_from(["tabsflow-infra", "--stage", "staging"]).is_err());
    }
}
