use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use airiss_core::{ai::AIAnalyzer, ingest, report, AnalysisMode, Analyzer};
use clap::Parser;
use dotenvy::dotenv;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Evaluation file to analyze (.xlsx, .xls or .csv)
    #[arg(short, long)]
    file: PathBuf,

    /// Maximum number of employees to analyze
    #[arg(short, long, default_value_t = 25)]
    sample_size: usize,

    /// Analysis mode: text, quantitative or hybrid
    #[arg(short, long, default_value = "hybrid")]
    mode: AnalysisMode,

    /// Where to write the result CSV
    #[arg(short, long, default_value = "results.csv")]
    output: PathBuf,

    /// Where to write the dataset summary JSON
    #[arg(long, default_value = "summary.json")]
    summary: PathBuf,

    /// Skip AI feedback
    #[arg(long)]
    skip_ai: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = std::fs::read(&args.file)?;
    let table = ingest::parse_upload(&file_name, &bytes)?;

    let comment_fields = table.comment_fields();
    info!(
        records = table.record_count(),
        columns = table.headers.len(),
        comment_fields = comment_fields.len(),
        "loaded {file_name}"
    );
    if comment_fields.is_empty() {
        warn!("no comment columns found; AI feedback will have nothing to read");
    }

    let summary = json!({
        "file_name": file_name,
        "record_count": table.record_count(),
        "field_names": table.headers,
        "comment_fields": comment_fields,
    });
    report::save_json(&summary, &args.summary)?;

    let mut analyzer = Analyzer::new(&table, args.mode);
    if !args.skip_ai {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY must be set unless --skip-ai is given")?;
        let mut ai = AIAnalyzer::new(api_key)?;
        if let Ok(model) = env::var("OPENAI_MODEL") {
            ai = ai.with_model(model);
        }
        if let Ok(endpoint) = env::var("OPENAI_ENDPOINT") {
            ai = ai.with_endpoint(endpoint);
        }
        analyzer = analyzer.with_feedback(Arc::new(ai));
    }

    let total = args.sample_size.min(table.record_count());
    let mut items = Vec::with_capacity(total);
    for (idx, row) in table.rows.iter().take(total).enumerate() {
        items.push(analyzer.analyze_row(idx, row).await?);
        info!("analyzed {}/{}", idx + 1, total);
    }

    let csv = report::render_csv(&analyzer.field_names(), &items)?;
    report::save_bytes(&csv, &args.output)?;

    Ok(())
}
