//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Guided questionnaire for government procedures: generated decision trees, repaired and navigated safely
#[derive(Parser, Debug)]
#[command(name = "procguide")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an interactive questionnaire for a query
    Ask {
        /// What you want to do, e.g. "open a restaurant"
        query: String,
    },

    /// Print the first step of a questionnaire
    Start {
        query: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Also write the generated tree to this file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        save: Option<PathBuf>,
    },

    /// Navigate a saved tree with the given answers
    Navigate {
        /// Tree JSON file
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
        /// Answer as key=value, repeatable
        #[arg(short, long = "answer", value_name = "KEY=VALUE")]
        answers: Vec<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate a tree file and print the corrected tree
    Repair {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
        /// Write the corrected tree here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// List all procedures of a tree and those related to a selection
    Procedures {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
        /// Selected procedure id, repeatable
        #[arg(short, long)]
        selected: Vec<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render a tree file
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        tree: PathBuf,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show hit/miss counters and hit rates
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Remove all entries from both tiers
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,
    /// Show config paths
    Path,
    /// Print a config template
    Template,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_repeated_answers_when_parsing_then_collects_all() {
        let cli = Cli::parse_from([
            "procguide", "navigate", "t.json", "-a", "k=a", "--answer", "j=b",
        ]);

        let Some(Commands::Navigate { answers, .. }) = cli.command else {
            panic!("expected navigate");
        };
        assert_eq!(answers, vec!["k=a", "j=b"]);
    }
}
