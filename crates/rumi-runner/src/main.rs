//! RumiAI runner binary.
//!
//! `rumi-runner <video_url>` runs the full pipeline from a URL;
//! `rumi-runner <video_id>` assumes analyzer outputs already exist on
//! disk. Progress markers and the final JSON summary go to stdout;
//! everything else logs to stderr.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rumi_insight::{CancelToken, ClaudeClient};
use rumi_runner::{progress, ApifyClient, Pipeline, RunnerError, Settings};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Run failed");
            progress::failed("pipeline", &e.to_string());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    // Logs go to stderr so stdout stays parseable for downstream consumers.
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rumi=info,rumi_runner=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> Result<(), RunnerError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let input = match args.as_slice() {
        [input] => input.clone(),
        [] => {
            eprintln!("Usage: rumi-runner <video_url_or_id>");
            return Err(RunnerError::invalid_arguments("missing video URL or ID"));
        }
        _ => {
            eprintln!("Usage: rumi-runner <video_url_or_id>");
            return Err(RunnerError::invalid_arguments("too many arguments"));
        }
    };

    let settings = Settings::from_env();
    let is_url = input.starts_with("http");
    settings
        .validate(is_url)
        .map_err(RunnerError::Config)?;

    let client = ClaudeClient::from_env()?;
    let cancel = CancelToken::new();

    // Ctrl-C stops further analyses; already-persisted results are kept.
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, cancelling remaining analyses");
            signal_cancel.cancel();
        }
    });

    let pipeline = Pipeline::new(settings.clone(), client);
    let report = if is_url {
        info!(url = %input, "Running in URL mode");
        let source = ApifyClient::new(settings.apify_token.clone());
        pipeline.run_url(&input, &source, &cancel).await?
    } else {
        info!(video_id = %input, "Running in legacy mode");
        pipeline.run_video_id(&input, &cancel).await?
    };

    progress::ok(&format!(
        "{}/{} analyses succeeded for {}",
        report.summary["analyses_successful"],
        report.summary["analyses_total"],
        report.video_id
    ));
    progress::summary(&report.summary);
    Ok(())
}
