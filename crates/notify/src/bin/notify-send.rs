//! notify-send: deliver one notification to the channels in a YAML file.
//!
//! Placeholders (`{{NAME}}`) in the title, message and channel settings are
//! filled from repeated `--param NAME=VALUE` flags. SMTP credentials and the
//! fallback webhook URL are read from the environment (or `.env`).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use signalpost_notify::config::load_dotenv;
use signalpost_notify::{
    DispatchResult, Dispatcher, EnvSecrets, NotifyConfig, ParameterResolver, PlaceholderResolver,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Send a notification through every configured webhook and email channel.
#[derive(Parser, Debug)]
#[command(name = "notify-send", version, about)]
struct Cli {
    /// Path to the channel file.
    #[arg(long, env = "NOTIFY_CONFIG", default_value = "config/notify.yaml")]
    config: String,

    /// Notification title (email subject).
    #[arg(long)]
    title: String,

    /// Notification body.
    #[arg(long)]
    message: String,

    /// Placeholder value as NAME=VALUE. May be repeated.
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Only deliver to the channel at this index.
    #[arg(long)]
    channel: Option<usize>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = NotifyConfig::from_file(&cli.config)
        .with_context(|| format!("loading channel file {}", cli.config))?;
    info!(path = %cli.config, "loaded channel file");

    let resolver = Arc::new(PlaceholderResolver::new(
        cli.params.into_iter().collect::<HashMap<_, _>>(),
    ));
    let title = resolver.resolve(&cli.title);
    let message = resolver.resolve(&cli.message);

    let dispatcher = Dispatcher::from_config(&config, resolver, Arc::new(EnvSecrets))
        .context("building notifiers")?;
    if dispatcher.is_empty() {
        bail!("no channels configured in {}", cli.config);
    }
    info!(channels = dispatcher.len(), "notifiers ready");

    let results = match cli.channel {
        Some(index) => vec![dispatcher.dispatch_to(index, &title, &message).await?],
        None => dispatcher.dispatch(&title, &message).await,
    };

    report(&results, cli.channel.unwrap_or(0));

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        bail!("{failed} of {} channel(s) failed", results.len());
    }
    Ok(())
}

fn report(results: &[DispatchResult], first_index: usize) {
    for (offset, result) in results.iter().enumerate() {
        let index = first_index + offset;
        match &result.error {
            None => println!("[{index}] {}: ok ({} ms)", result.channel, result.duration_ms),
            Some(err) => println!(
                "[{index}] {}: FAILED{} ({} ms): {err}",
                result.channel,
                if result.retryable { " (retryable)" } else { "" },
                result.duration_ms
            ),
        }
    }
}
