//! CLI entrypoint for moegate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use moegate_application::{ComputeGateTensorInput, ComputeGateTensorUseCase, check_gate_degeneracy};
use moegate_infrastructure::{
    CheckpointClassifier, ConfigLoader, FileConfig, HfPromptTokenizer, LocalModelRegistry,
    parse_experts,
};
use moegate_presentation::{Cli, ConsoleFormatter, GateSummary, OutputFormatter, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut config, &cli);

    // Validate everything before touching model files
    let issues = config.validate();
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("{}", issue.message);
    }
    let errors: Vec<&str> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(|i| i.message.as_str())
        .collect();
    if !errors.is_empty() {
        bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }

    let (Some(model), (Some(mode), _), (Some(options), _)) = (
        config.model.model_reference(),
        config.gate.parse_mode(),
        config.model.to_load_options(),
    ) else {
        bail!("Invalid configuration");
    };
    let (experts, _) = parse_experts(&config.experts);
    let params = config.gate.to_gate_params();
    let threshold = params.degeneracy_threshold;

    info!("Starting moegate: {} experts, mode {}", experts.len(), mode);

    // === Dependency Injection ===
    let tokenizer_dir = config.tokenizer_path().unwrap_or(model.path.as_str());
    let tokenizer = Arc::new(
        HfPromptTokenizer::from_dir(Path::new(tokenizer_dir))
            .with_context(|| format!("Failed to load tokenizer from {}", tokenizer_dir))?,
    );
    let registry = Arc::new(LocalModelRegistry::new());

    let mut use_case = ComputeGateTensorUseCase::new(registry, tokenizer).with_params(params);
    if let Some(path) = &config.classifier.path {
        let classifier = CheckpointClassifier::from_file(Path::new(path))
            .with_context(|| format!("Failed to load classifier from {}", path))?;
        use_case = use_case.with_classifier(Arc::new(classifier));
    }

    let input = ComputeGateTensorInput::new(model.clone(), experts.clone(), mode).with_options(options);

    // Execute with or without progress reporting
    let gate = if cli.quiet {
        use_case.execute(input)?
    } else {
        let progress = ProgressReporter::new();
        use_case.execute_with_progress(input, &progress)?
    };

    let degeneracy = check_gate_degeneracy(gate.tensor(), threshold);
    let summary = GateSummary::new(&model, mode, &experts, &gate, degeneracy);

    println!("{}", ConsoleFormatter.render(&summary, cli.output.into()));

    Ok(())
}

/// Command-line flags take precedence over every configuration source
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.model.path = Some(model.display().to_string());
    }
    if let Some(mode) = &cli.mode {
        config.gate.mode = mode.clone();
    }
    if let Some(device) = &cli.device {
        config.model.device = device.clone();
    }
    if let Some(seed) = cli.seed {
        config.gate.seed = Some(seed);
    }
    if let Some(threshold) = cli.threshold {
        config.gate.degeneracy_threshold = threshold;
    }
}
