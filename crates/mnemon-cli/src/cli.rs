//! CLI argument parsing for the mnemon binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mnemon_policy::OperatingMode;
use mnemon_types::{MemoryKind, MemorySource, MemoryStatus};

/// mnemon
///
/// A layered memory engine: store, recall, and age memory items with
/// salience decay, drift detection, and policy-shaped recall.
#[derive(Parser, Debug)]
#[command(name = "mnemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/mnemon/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Operating mode shaping recall (normal, deep_focus, reflection, debug)
    #[arg(long, global = true, default_value = "normal")]
    pub mode: OperatingMode,

    #[command(subcommand)]
    pub command: Commands,
}

/// Memory commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a new memory item
    Store {
        /// Memory payload text
        payload: String,

        /// Memory kind (semantic, procedural, episodic)
        #[arg(short, long, default_value = "semantic")]
        kind: MemoryKind,

        /// Tag to attach (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Origin of the memory (user, system, inference)
        #[arg(short, long, default_value = "user")]
        source: MemorySource,

        /// Initial salience (defaults per kind when omitted)
        #[arg(long)]
        salience: Option<f64>,

        /// Confidence in the payload
        #[arg(long, default_value = "1.0")]
        confidence: f64,

        /// Owning module tag
        #[arg(long)]
        module: Option<String>,

        /// Session id; also appends the item to that session's working memory
        #[arg(long)]
        session: Option<String>,
    },

    /// Recall memory items matching filters
    Recall {
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<MemoryKind>,

        /// Tag to match (repeatable, any may match)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Filter by module tag
        #[arg(long)]
        module: Option<String>,

        /// Filter by lifecycle status
        #[arg(long)]
        status: Option<MemoryStatus>,

        /// Minimum salience
        #[arg(long)]
        min_salience: Option<f64>,

        /// Most items to return
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Leave last-used timestamps untouched
        #[arg(long)]
        no_touch: bool,
    },

    /// Forget memory items by id, tag, or kind
    Forget {
        /// Ids to delete (comma separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,

        /// Tag selecting items to delete (repeatable, any may match)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Restrict deletion to one kind
        #[arg(short, long)]
        kind: Option<MemoryKind>,
    },

    /// Show one memory item with its full trace metadata
    Trace {
        /// Memory id
        id: u64,
    },

    /// Bind memory items into a shared cluster
    Bind {
        /// Ids to bind together
        #[arg(required = true)]
        ids: Vec<u64>,
    },

    /// Show memory system health counters
    Health,

    /// Run a decay and drift maintenance pass
    Maintain {
        /// Report what would change without persisting anything
        #[arg(long)]
        dry_run: bool,

        /// Skip salience decay
        #[arg(long)]
        no_decay: bool,

        /// Skip drift detection
        #[arg(long)]
        no_drift: bool,
    },

    /// Preview the decay curve for a hypothetical item
    Preview {
        /// Memory kind
        #[arg(short, long, default_value = "semantic")]
        kind: MemoryKind,

        /// Starting salience
        #[arg(short, long, default_value = "0.6")]
        salience: f64,

        /// Days ahead to project
        #[arg(short, long, default_value = "180")]
        days: i64,
    },

    /// Reconfirm a memory item, restoring it to active
    Reconfirm {
        /// Memory id
        id: u64,

        /// New salience (raised to at least 0.5 when omitted)
        #[arg(long)]
        salience: Option<f64>,
    },

    /// Export all long-term memory to a JSON snapshot
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import long-term memory from a JSON snapshot
    Import {
        /// Snapshot file to read
        input: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_store_with_tags() {
        let cli = Cli::parse_from([
            "mnemon", "store", "Prefers dark mode", "-t", "preference", "-t", "ui",
        ]);
        match cli.command {
            Commands::Store { payload, kind, tag, .. } => {
                assert_eq!(payload, "Prefers dark mode");
                assert_eq!(kind, MemoryKind::Semantic);
                assert_eq!(tag, vec!["preference".to_string(), "ui".to_string()]);
            }
            _ => panic!("Expected Store command"),
        }
    }

    #[test]
    fn test_cli_store_kind_and_source() {
        let cli = Cli::parse_from([
            "mnemon",
            "store",
            "Always run the linter first",
            "-k",
            "procedural",
            "-s",
            "system",
        ]);
        match cli.command {
            Commands::Store { kind, source, .. } => {
                assert_eq!(kind, MemoryKind::Procedural);
                assert_eq!(source, MemorySource::System);
            }
            _ => panic!("Expected Store command"),
        }
    }

    #[test]
    fn test_cli_recall_defaults() {
        let cli = Cli::parse_from(["mnemon", "recall"]);
        match cli.command {
            Commands::Recall { kind, limit, no_touch, .. } => {
                assert_eq!(kind, None);
                assert_eq!(limit, 20);
                assert!(!no_touch);
            }
            _ => panic!("Expected Recall command"),
        }
    }

    #[test]
    fn test_cli_recall_filters() {
        let cli = Cli::parse_from([
            "mnemon",
            "recall",
            "-k",
            "episodic",
            "--status",
            "stale",
            "--min-salience",
            "0.3",
            "-l",
            "5",
            "--no-touch",
        ]);
        match cli.command {
            Commands::Recall {
                kind,
                status,
                min_salience,
                limit,
                no_touch,
                ..
            } => {
                assert_eq!(kind, Some(MemoryKind::Episodic));
                assert_eq!(status, Some(MemoryStatus::Stale));
                assert_eq!(min_salience, Some(0.3));
                assert_eq!(limit, 5);
                assert!(no_touch);
            }
            _ => panic!("Expected Recall command"),
        }
    }

    #[test]
    fn test_cli_forget_ids_delimited() {
        let cli = Cli::parse_from(["mnemon", "forget", "--ids", "1,2,3"]);
        match cli.command {
            Commands::Forget { ids, .. } => assert_eq!(ids, vec![1, 2, 3]),
            _ => panic!("Expected Forget command"),
        }
    }

    #[test]
    fn test_cli_bind_requires_ids() {
        assert!(Cli::try_parse_from(["mnemon", "bind"]).is_err());
        let cli = Cli::parse_from(["mnemon", "bind", "4", "7"]);
        match cli.command {
            Commands::Bind { ids } => assert_eq!(ids, vec![4, 7]),
            _ => panic!("Expected Bind command"),
        }
    }

    #[test]
    fn test_cli_mode_global() {
        let cli = Cli::parse_from(["mnemon", "--mode", "deep_focus", "recall"]);
        assert_eq!(cli.mode, OperatingMode::DeepFocus);
    }

    #[test]
    fn test_cli_mode_defaults_to_normal() {
        let cli = Cli::parse_from(["mnemon", "health"]);
        assert_eq!(cli.mode, OperatingMode::Normal);
    }

    #[test]
    fn test_cli_maintain_flags() {
        let cli = Cli::parse_from(["mnemon", "maintain", "--dry-run", "--no-drift"]);
        match cli.command {
            Commands::Maintain { dry_run, no_decay, no_drift } => {
                assert!(dry_run);
                assert!(!no_decay);
                assert!(no_drift);
            }
            _ => panic!("Expected Maintain command"),
        }
    }

    #[test]
    fn test_cli_preview_defaults() {
        let cli = Cli::parse_from(["mnemon", "preview"]);
        match cli.command {
            Commands::Preview { kind, salience, days } => {
                assert_eq!(kind, MemoryKind::Semantic);
                assert_eq!(salience, 0.6);
                assert_eq!(days, 180);
            }
            _ => panic!("Expected Preview command"),
        }
    }

    #[test]
    fn test_config_short_flag() {
        let cli = Cli::parse_from(["mnemon", "-c", "/etc/mnemon.toml", "health"]);
        assert_eq!(cli.config, Some("/etc/mnemon.toml".to_string()));
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["mnemon", "store", "x", "-k", "imaginary"]).is_err());
    }
}
