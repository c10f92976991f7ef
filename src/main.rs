// Example runner for the `equipment_vision` library: analyzes one photograph
// and prints the assembled report as JSON.

use anyhow::Context;
use clap::Parser;
use equipment_vision::core_modules::utils::image_helper::image_helper::save_surface;
use equipment_vision::{
    AnalysisRequest, ComparisonRecord, DiagnosticPipeline, PipelineConfig, SourceImage,
    StaticInference,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "equipment_vision", version, about = "Diagnostic image pipeline runner")]
struct Cli {
    /// Equipment photograph to analyze.
    image: PathBuf,
    /// File holding the reference (specification) text.
    #[arg(long)]
    reference: Option<PathBuf>,
    /// File holding the measurement (field) text.
    #[arg(long)]
    measurement: Option<PathBuf>,
    /// Already extracted text; overrides the inference output.
    #[arg(long)]
    text: Option<String>,
    /// Risk label (low, medium, high); overrides the inference output.
    #[arg(long)]
    risk: Option<String>,
    /// JSON file replayed as the inference collaborator's answer.
    #[arg(long)]
    inference: Option<PathBuf>,
    /// JSON pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the working surface to this PNG file.
    #[arg(long)]
    dump_surface: Option<PathBuf>,
    #[arg(long, help = "Emit JSON log lines")]
    json: bool,
}

fn init_tracing(default_filter: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_text(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => Ok(String::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    init_tracing(&config.log_filter, cli.json);

    let inference = match &cli.inference {
        Some(path) => StaticInference::from_file(path)?,
        None => StaticInference::default(),
    };

    let image = SourceImage::from_path(&cli.image).await?;
    let comparison = ComparisonRecord::new(
        read_text(cli.reference.as_ref())?,
        read_text(cli.measurement.as_ref())?,
    );
    let mut request = AnalysisRequest::new(image, comparison);
    if let Some(text) = cli.text {
        request = request.with_extracted_text(text);
    }
    if let Some(risk) = cli.risk {
        request = request.with_risk_label(risk);
    }

    let pipeline = DiagnosticPipeline::new(&config);

    let report = match &cli.dump_surface {
        Some(path) => {
            let (report, surface) = pipeline.analyze_with_surface(&request, &inference).await?;
            save_surface(path, &surface)
                .with_context(|| format!("writing surface to {}", path.display()))?;
            tracing::info!(path = %path.display(), "working surface written");
            report
        }
        None => pipeline.analyze(&request, &inference).await?,
    };
    println!("{}", report.to_json()?);
    Ok(())
}
