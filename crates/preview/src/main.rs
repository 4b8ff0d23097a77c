//! Prints what each target module would show for its published widgets.
//!
//! ```text
//! painel-preview [target-module ...]
//! ```
//!
//! With no arguments the default publish targets are previewed. Backend
//! settings come from the `PAINEL_*` environment variables (see
//! [`ClientConfig::from_env`]); the bearer token from `PAINEL_API_TOKEN`.
//! Set `PAINEL_LOG_JSON=1` for JSON log lines.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use painel_client::{ClientConfig, EnvToken, PainelApi};
use painel_core::publisher::PublishedPanel;
use painel_core::wizard::publish_targets;
use painel_core::{UuidIds, WidgetLoader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "painel_preview=info,painel_client=info,painel_core=info".into());
    let json_logs = std::env::var("PAINEL_LOG_JSON").is_ok_and(|v| v == "1");
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // --- Configuration ---
    let config = ClientConfig::from_env().context("Invalid backend configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        tenant_id = config.tenant_id.as_deref().unwrap_or("<none>"),
        "Loaded backend configuration",
    );

    let api = PainelApi::new(&config, Arc::new(EnvToken::default()))
        .context("Failed to build the backend client")?;

    // --- Targets ---
    let args: Vec<String> = std::env::args().skip(1).collect();
    let targets: Vec<&str> = if args.is_empty() {
        publish_targets::DEFAULTS.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    let ids = UuidIds;
    let loader = WidgetLoader::new(&api, &ids);
    let mut failures = 0usize;
    for (target, result) in loader.load_targets(&targets).await {
        match result {
            Ok(panel) => print_panel(&panel)?,
            Err(err) => {
                failures += 1;
                tracing::error!(target_module = %target, error = %err, "Failed to load widgets");
                println!("== {target} ==\n  {}\n", err.user_message());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} target modules failed to load", targets.len());
    }
    Ok(())
}

fn print_panel(panel: &PublishedPanel) -> anyhow::Result<()> {
    println!("== {} ==", panel.target);
    if let Some(message) = panel.empty_message() {
        println!("  {message}\n");
        return Ok(());
    }
    for widget in &panel.widgets {
        let body = serde_json::to_string_pretty(&widget.body)?;
        println!("  {} ({})\n{body}\n", widget.title, widget.subtitle);
    }
    Ok(())
}
