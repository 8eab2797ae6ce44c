use care_assistant_service::{Config, create_app};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "care_assistant_service=debug,tower_http=debug";

/// JSON logs unless `LOG_FORMAT=pretty`. `RUST_LOG` overrides the filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if pretty_logs(std::env::var("LOG_FORMAT").ok().as_deref()) {
        subscriber.pretty().init();
    } else {
        subscriber.json().with_current_span(true).init();
    }
}

fn pretty_logs(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|format| format.trim().eq_ignore_ascii_case("pretty"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_app(&config).await;
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Care Assistant Service starting on {}", addr);
    info!("Report analysis endpoint: POST http://{}/report", addr);
    info!("Chat endpoints: POST http://{}/chatbot, POST http://{}/chatbot-img", addr, addr);

    axum::serve(listener, app).await?;

    Ok(())
}
