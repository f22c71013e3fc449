//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the gate report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Shape, kind, and per-layer conditioning
    Summary,
    /// JSON report
    Json,
}

impl From<OutputFormat> for moegate_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => moegate_domain::OutputFormat::Summary,
            OutputFormat::Json => moegate_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for moegate
#[derive(Parser, Debug)]
#[command(name = "moegate")]
#[command(author, version, about = "Compute mixture-of-experts gate vectors from expert prompts")]
#[command(long_about = r#"
moegate derives per-layer, per-expert routing vectors for a mixture-of-experts
model assembled from independently trained experts, then checks every layer
for degenerate (near linearly dependent) expert vectors.

Gate modes:
  random, uniform_random     sampled, no prompts or model weights needed
  cheap_embed                prompts projected through the embedding matrix
  hidden, hidden_avg         hidden states averaged over the prompt
  hidden_last                hidden state at the last prompt position
  smart_hidden (classifier)  hidden states weighted by a classifier checkpoint

Configuration files are loaded from (in priority order):
1. MOEGATE_* environment variables (MOEGATE_GATE__MODE=random)
2. --config <path>     Explicit config file
3. ./moegate.toml      Project-level config
4. ~/.config/moegate/config.toml   Global config

Example:
  moegate --config experts.toml
  moegate --config experts.toml --mode cheap_embed --device cpu -o json
"#)]
pub struct Cli {
    /// Local base model directory (overrides [model].path)
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Gate mode (overrides [gate].mode)
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Device: auto, cpu, cuda[:N], metal[:N] (overrides [model].device)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Seed for random modes
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Condition number above which a layer is reported as degenerate
    #[arg(long, value_name = "THRESHOLD")]
    pub threshold: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
