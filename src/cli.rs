use crate::config::OrphanPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "threatgraph",
    about = "Threatgraph - Architecture threat model analysis and risk rule engine",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (JSON or YAML), command line flags override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Risk category IDs to skip
    #[arg(long, value_delimiter = ',', global = true)]
    pub skip_rules: Vec<String>,

    /// Custom risk category files or directories
    #[arg(long, global = true)]
    pub custom_rules: Vec<PathBuf>,

    /// Additional technology definition files
    #[arg(long, global = true)]
    pub technologies: Vec<PathBuf>,

    /// Handling of risk tracking entries that match no risk
    #[arg(long, value_enum, global = true)]
    pub orphan_policy: Option<OrphanPolicy>,

    /// Number of parallel rule threads (0 = auto-detect)
    #[arg(short, long, default_value = "0", global = true)]
    pub threads: usize,

    /// Run the rules one after another on the calling thread
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Keep the attractiveness values written in the model
    #[arg(long, global = true)]
    pub skip_raa: bool,

    /// Enable verbose logging of all operations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars and use quiet output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Analyze a model and write the risk report
    Analyze {
        /// Model file (JSON or YAML)
        model: PathBuf,

        /// Directory for the JSON output files
        #[arg(short, long, default_value = "threatgraph-output")]
        output: PathBuf,
    },
    /// List every loaded risk category with its supported tags
    ListRules,
    /// Explain why a risk was raised
    Explain {
        /// Model file (JSON or YAML)
        model: PathBuf,

        /// Synthetic ID of the risk, e.g. `missing-vault@db`
        synthetic_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_defaults() {
        let args = Args::parse_from(["threatgraph", "analyze", "model.yaml"]);
        assert_eq!(
            args.command,
            Command::Analyze {
                model: PathBuf::from("model.yaml"),
                output: PathBuf::from("threatgraph-output"),
            }
        );
        assert_eq!(args.threads, 0);
        assert!(args.orphan_policy.is_none());
        assert!(!args.sequential);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "threatgraph",
            "explain",
            "model.json",
            "missing-vault@db",
            "--quiet",
            "--custom-rules",
            "rules/",
        ]);
        assert!(args.quiet);
        assert_eq!(args.custom_rules, vec![PathBuf::from("rules/")]);
        assert!(matches!(args.command, Command::Explain { ref synthetic_id, .. } if synthetic_id == "missing-vault@db"));
    }
}
