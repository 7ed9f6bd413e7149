use anyhow::{Context, Result};
use clap::Parser;
use evalstat::cli::{Cli, Command, InputArgs, OutputFormat};
use evalstat::metadata::InMemoryMetadata;
use evalstat::report::comparison_report_string;
use evalstat::source::{InMemorySource, Scope};
use evalstat::{Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load metadata and score records named on the command line
fn build_engine(
    input: &InputArgs,
    config: EngineConfig,
) -> Result<Engine<InMemoryMetadata, InMemorySource>> {
    let metadata = InMemoryMetadata::from_json_file(&input.metadata)?;
    let source = InMemorySource::from_jsonl_file(&input.scores)
        .with_context(|| format!("Failed to load scores from {}", input.scores.display()))?;
    tracing::debug!(
        scores = metadata.len(),
        records = source.len(),
        "Loaded inputs"
    );
    Ok(Engine::new(metadata, source, config)?)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    match args.command {
        Command::Stats { input, experiment } => {
            let engine = build_engine(&input, config)?;
            let scope = experiment.map_or(Scope::Dataset, Scope::Experiment);
            let report = engine.compute_statistics(&input.evaluation, &scope)?;

            match input.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print!("{}", report.to_report_string()),
            }

            if !report.is_complete() {
                anyhow::bail!(
                    "Statistics failed for {} score(s)",
                    report.errors.len()
                );
            }
        }
        Command::Compare {
            input,
            experiment_a,
            experiment_b,
            score,
        } => {
            let engine = build_engine(&input, config)?;
            let stats = engine
                .compute_comparison(&input.evaluation, &experiment_a, &experiment_b, &score)
                .with_context(|| {
                    format!(
                        "Failed to compare {} vs {} on {}",
                        experiment_a, experiment_b, score
                    )
                })?;

            match input.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Text => print!("{}", comparison_report_string(&stats)),
            }
        }
    }

    Ok(())
}
