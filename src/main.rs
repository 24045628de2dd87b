use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use inbox_labeler::config::AppConfig;
use inbox_labeler::llm::create_classifier;
use inbox_labeler::mail::{GmailClient, MailProvider};
use inbox_labeler::pipeline::{InboxClassifier, LabelCatalog, PipelineSettings};
use inbox_labeler::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is validated before anything else runs
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export LLM_BASE_URL=http://localhost:11434/v1");
        eprintln!("  export LLM_MODEL=gemma3");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📬 Inbox Labeler v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   LLM endpoint: {}", config.llm.base_url);
    eprintln!("   Schedule: {}", config.cron_expression);
    eprintln!("   Max messages per run: {}", config.max_results);
    if let Some(ref dir) = config.log_dir {
        eprintln!("   Log dir: {}", dir.display());
    }

    let inbox = Arc::new(build_classifier(&config)?);
    eprintln!("   Labels: {}\n", inbox.catalog().len());

    tracing::info!("Starting inbox labeler");

    // First pass right away, then on schedule
    {
        let inbox = Arc::clone(&inbox);
        tokio::spawn(async move {
            scheduler::run_and_log(&inbox).await;
        });
    }

    let (handle, shutdown) = scheduler::spawn_scheduler(Arc::clone(&inbox), config.schedule.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            shutdown.store(true, Ordering::Relaxed);
        }
        result = handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Scheduler task failed");
            }
        }
    }

    Ok(())
}

/// Wire the Gmail adapter, the classifier and the label catalog together.
fn build_classifier(config: &AppConfig) -> inbox_labeler::error::Result<InboxClassifier> {
    let auth = config.gmail.auth()?;
    let provider: Arc<dyn MailProvider> =
        Arc::new(GmailClient::with_base_url(auth, &config.gmail.base_url));

    let classifier = create_classifier(&config.llm)?;

    let settings = PipelineSettings::default()
        .with_max_results(config.max_results)
        .with_temperature(config.llm.temperature);

    Ok(InboxClassifier::new(
        provider,
        classifier,
        Arc::new(LabelCatalog::default()),
        settings,
    ))
}

/// Console logging, plus a daily-rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "inbox-labeler.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}
