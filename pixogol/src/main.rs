use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixogol::api::{create_router, AppState};
use pixogol::audit::AuditLog;
use pixogol::config::Config;
use pixogol::llm::LlmProvider;
use pixogol::models::{AnalysisOrigin, AnalysisReport, ImageUpload};
use pixogol::ocr::OcrProvider;
use pixogol::services::{AnalysisService, RiskAnalyzer};

#[derive(Parser)]
#[command(name = "pixogol")]
#[command(about = "Copyright, trademark and brand risk assessment for the text in images")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Analyse one image file and print the assessment
    Analyze {
        /// Image to analyse (PNG, JPEG, GIF, BMP or TIFF)
        path: PathBuf,
        /// Print the full report as JSON instead of the text summary
        #[arg(long)]
        json: bool,
        /// Also write the JSON report to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Analyze { path, json, output } => {
            analyze(config, &path, json, output.as_deref()).await
        }
    }
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // stderr keeps `analyze --json` output on stdout machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixogol=info,tower_http=debug".into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn build_providers(config: &Config) -> anyhow::Result<(OcrProvider, LlmProvider)> {
    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let ocr = OcrProvider::new(&config.ocr)?;
    if !ocr.is_available() {
        tracing::warn!("OCR unavailable - uploads will be refused");
    }

    tracing::info!("Initializing LLM provider: {}...", config.llm.model);
    let llm = LlmProvider::new(&config.llm);
    if !llm.is_available() {
        tracing::warn!("LLM unavailable - set OPENAI_API_KEY or LLM_API_KEY to enable analyses");
    }

    Ok((ocr, llm))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.server.api_keys.is_empty() {
        tracing::warn!("PIXOGOL_API_KEYS is not set - the upload endpoint is open to anyone");
    }

    let (ocr, llm) = build_providers(&config)?;
    let audit = Arc::new(AuditLog::new(&config.audit));
    tracing::info!("Audit log directory: {}", config.audit.log_dir.display());

    let state = AppState::new(config.clone(), ocr, llm, audit);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Pixogol starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  Upload:       http://{}/api/v1/analyses:upload", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn analyze(
    config: Config,
    path: &Path,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    let content_type = mime_guess::from_path(path).first_raw();

    let upload = ImageUpload::validate(
        bytes,
        file_name,
        content_type,
        config.server.max_upload_bytes,
    )?;

    let (ocr, llm) = build_providers(&config)?;
    let risk = RiskAnalyzer::new(llm, &config.llm);
    let service = AnalysisService::new(ocr, risk, Arc::new(AuditLog::new(&config.audit)));

    let report = service.analyze(upload, AnalysisOrigin::Cli).await?;

    if let Some(output) = output {
        let body = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(output, body)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!("Analysis {} - {}", report.analysis_id, report.filename);
    match &report.extracted_text {
        Some(text) => println!("Extracted text ({} words): {}", report.word_count, text),
        None => println!("No text found in image"),
    }
    println!();
    print!("{}", report.risk_analysis.summary_text());
    println!();
    println!("{}", report.risk_analysis.legal_disclaimer);
    println!("Logged to {}", report.log_file);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, finishing in-flight requests...");
}
