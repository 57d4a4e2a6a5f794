use anyhow::{Context, Result};
use clap::Parser;
use flowtrace::{
    cli::{Cli, OutputFormat},
    config::ReconstructionConfig,
    filter::TraceIdFilter,
    input,
    json_output::JsonOutput,
    reconstruction::{TraceOutcome, TraceReconstructor},
    text_output,
};
use std::fs;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the effective configuration: file (if any), then CLI overrides
fn load_config(args: &Cli) -> Result<ReconstructionConfig> {
    let config = match &args.config {
        Some(path) => ReconstructionConfig::from_toml_file(path)?,
        None => ReconstructionConfig::default(),
    };
    let config = args.apply_overrides(config);
    config.validate()?;
    Ok(config)
}

fn render(
    args: &Cli,
    outcomes: &[TraceOutcome],
    reconstructor: &TraceReconstructor,
) -> Result<String> {
    let stats = reconstructor.stats().snapshot();
    match args.format {
        OutputFormat::Json => {
            let mut output = JsonOutput::new();
            if !args.summary_only {
                for outcome in outcomes {
                    output.add_outcome(outcome);
                }
            }
            output.set_summary(stats);
            output.to_json()
        }
        OutputFormat::Text => {
            let mut text = String::new();
            if !args.summary_only {
                for outcome in outcomes {
                    text.push_str(&text_output::format_outcome(outcome, !args.no_messages));
                }
            }
            text.push_str(&text_output::format_summary(&stats));
            Ok(text)
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;

    let filter = if let Some(expr) = &args.select {
        TraceIdFilter::from_expr(expr)?
    } else {
        TraceIdFilter::all()
    };

    let batches = input::load_batches(&args.input)?;
    tracing::info!(traces = batches.len(), workers = config.workers, "reconstructing");

    let ignore_invalid = config.ignore_invalid_traces;
    let reconstructor = TraceReconstructor::new(config).with_filter(filter);
    let outcomes = reconstructor.reconstruct_all(batches);

    let rendered = render(&args, &outcomes, &reconstructor)?;
    match &args.output {
        Some(path) => fs::write(path, format!("{}\n", rendered))
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", rendered)?;
        }
    }

    let failed = reconstructor.stats().snapshot().failed;
    if failed > 0 && !ignore_invalid {
        eprintln!("flowtrace: {} trace(s) could not be reconstructed", failed);
        std::process::exit(1);
    }

    Ok(())
}
