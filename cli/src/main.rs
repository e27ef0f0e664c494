//! Skein CLI - run a built-in capability chain against an input string.
//!
//! ```text
//! skein <chain> <input>
//! ```
//!
//! The binary wires the pieces together: tracing, configuration, the
//! capability registry (built once, then immutable), and the chain
//! executor. Ctrl-c aborts the running chain at the next step boundary.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use futures_util::future::AbortHandle;
use tracing_subscriber::EnvFilter;

use skein_capabilities::{CapabilityRegistry, MediaConfig, StockMedia, TextOutput, chains};
use skein_config::{AppConfig, RetrySettings};
use skein_engine::{ChainExecutor, RetryConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SKEIN_LOG")
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_default();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_registry(config: &AppConfig) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register("output.text", Arc::new(TextOutput));

    if config.media.api_key.is_empty() {
        tracing::warn!(
            "no media api_key configured; `media.search_video` is unavailable"
        );
    } else {
        let mut media = MediaConfig::new(config.media.api_key.clone());
        if let Some(base_url) = &config.media.base_url {
            media = media.with_base_url(base_url.clone());
        }
        registry.register("media.search_video", Arc::new(StockMedia::new(media)));
    }

    registry
}

fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        max_attempts: settings.max_attempts,
        initial_delay: Duration::from_millis(settings.initial_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
        ..RetryConfig::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let [chain_name, input] = args.as_slice() else {
        bail!(
            "usage: skein <chain> <input>\navailable chains: {}",
            chains::builtin_names().join(", ")
        );
    };

    let Some(chain) = chains::builtin(chain_name) else {
        bail!(
            "unknown chain `{chain_name}`; available chains: {}",
            chains::builtin_names().join(", ")
        );
    };

    let config = skein_config::load().context("loading configuration")?;
    let registry = Arc::new(build_registry(&config));
    let executor = ChainExecutor::new(registry).with_retry(retry_config(&config.retry));

    let (cancel, _registration) = AbortHandle::new_pair();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; cancelling chain");
            cancel_on_signal.abort();
        }
    });

    let result = executor
        .execute(&chain, input, &cancel)
        .await
        .with_context(|| format!("running chain `{chain_name}`"))?;

    match result {
        serde_json::Value::String(text) => println!("{text}"),
        other => println!("{other:#}"),
    }
    Ok(())
}
