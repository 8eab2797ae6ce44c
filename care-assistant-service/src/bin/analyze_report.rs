use anyhow::{Context, Result};
use care_assistant_service::{
    Config, analysis::ReportAnalyzer, extract::extract_text, llm::GeminiClient,
};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Medical Report -> Text -> Gemini Analysis");
    println!("=========================================");

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <report_file_path>", args[0]);
        eprintln!("Example: {} /path/to/blood_panel.pdf", args[0]);
        std::process::exit(1);
    }
    let report_path = &args[1];

    let config = Config::from_env().context("loading configuration")?;

    let bytes = tokio::fs::read(report_path)
        .await
        .with_context(|| format!("reading {report_path}"))?;
    let filename = std::path::Path::new(report_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    println!("Step 1: Extracting text from {}", report_path);
    let text = extract_text(filename, bytes).await?;
    println!("Extracted {} characters", text.len());

    println!("Step 2: Requesting analysis");
    let model = Arc::new(GeminiClient::new(
        reqwest::Client::new(),
        &config.gemini_base_url,
        &config.gemini_api_key,
        config.model_timeout,
    ));
    let analysis = ReportAnalyzer::new(model).analyze(&text).await?;

    println!();
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}
