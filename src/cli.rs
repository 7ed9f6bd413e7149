//! CLI argument parsing for evalstat

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for statistics and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "evalstat")]
#[command(version)]
#[command(
    about = "Statistics and paired comparison for scored experiment outcomes",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    /// Engine configuration file (TOML)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Descriptive statistics for every score of a population
    Stats {
        #[command(flatten)]
        input: InputArgs,

        /// Experiment whose results to summarize (dataset rows if omitted)
        #[arg(long = "experiment", value_name = "ID")]
        experiment: Option<String>,
    },

    /// Paired comparison of two experiments on one score
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Baseline experiment
        #[arg(long = "experiment-a", value_name = "ID")]
        experiment_a: String,

        /// Candidate experiment (win/loss is reported from its side)
        #[arg(long = "experiment-b", value_name = "ID")]
        experiment_b: String,

        /// Score to compare
        #[arg(long = "score", value_name = "ID")]
        score: String,
    },
}

/// Inputs shared by every subcommand
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Score records, one JSON object per line
    #[arg(long = "scores", value_name = "FILE")]
    pub scores: PathBuf,

    /// Score metadata, a JSON array
    #[arg(long = "metadata", value_name = "FILE")]
    pub metadata: PathBuf,

    /// Evaluation to read scores from
    #[arg(long = "evaluation", value_name = "ID")]
    pub evaluation: String,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUTS: [&str; 6] = [
        "--scores",
        "scores.jsonl",
        "--metadata",
        "meta.json",
        "--evaluation",
        "eval-1",
    ];

    #[test]
    fn test_cli_parses_stats() {
        let mut argv = vec!["evalstat", "stats"];
        argv.extend(INPUTS);
        let cli = Cli::parse_from(argv);
        match cli.command {
            Command::Stats { input, experiment } => {
                assert_eq!(input.evaluation, "eval-1");
                assert_eq!(input.format, OutputFormat::Text);
                assert!(experiment.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parses_compare() {
        let mut argv = vec!["evalstat", "compare"];
        argv.extend(INPUTS);
        argv.extend([
            "--experiment-a",
            "base",
            "--experiment-b",
            "cand",
            "--score",
            "accuracy",
            "--format",
            "json",
        ]);
        let cli = Cli::parse_from(argv);
        match cli.command {
            Command::Compare {
                input,
                experiment_a,
                experiment_b,
                score,
            } => {
                assert_eq!(experiment_a, "base");
                assert_eq!(experiment_b, "cand");
                assert_eq!(score, "accuracy");
                assert_eq!(input.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let mut argv = vec!["evalstat", "stats"];
        argv.extend(INPUTS);
        argv.extend(["--debug", "--config", "evalstat.toml"]);
        let cli = Cli::parse_from(argv);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("evalstat.toml")));
    }

    #[test]
    fn test_cli_compare_requires_score() {
        let mut argv = vec!["evalstat", "compare"];
        argv.extend(INPUTS);
        argv.extend(["--experiment-a", "a", "--experiment-b", "b"]);
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
