//! Server startup: rule store, queue, processor and reloader wiring.

use std::sync::Arc;

use anyhow::Context;
use kubetrail_admission::AdmissionHandler;
use kubetrail_core::Config;
use kubetrail_notify::{Dispatcher, Notifier, WebhookNotifier};
use kubetrail_queue::{event_queue, spawn_processor, EventProcessor, EventStore, LogStore, MemoryStore};
use kubetrail_rules::{parse_rule_set, spawn_reloader, BlockRules, IgnoreRules, RuleLoader, RuleStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppState;

/// Build `AppState` and spawn the background tasks that serve it.
///
/// The returned handles finish once `shutdown` flips to `true`.
pub fn build_app_state(
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<(Arc<AppState>, Vec<JoinHandle<()>>)> {
    let rules = Arc::new(initial_rules(config)?);

    // Load mounted files before accepting traffic so file policy is in force
    // from the first request.
    let loader = Arc::new(RuleLoader::new(config.rules.rules_dir.clone(), Arc::clone(&rules)));
    let report = loader.reload();
    info!(ignore = ?report.ignore, block = ?report.block, "initial rule load");
    let reloader = spawn_reloader(loader, config.rules.reload_interval(), shutdown.clone());

    let store: Arc<dyn EventStore> = if config.queue.store_max_events > 0 {
        Arc::new(MemoryStore::new(config.queue.store_max_events))
    } else {
        Arc::new(LogStore)
    };

    let (queue, rx) = event_queue(config.queue.capacity);
    let processor = EventProcessor::new(store, build_dispatcher(config))
        .with_max_in_flight(config.notify.max_in_flight);
    let processor_metrics = processor.metrics();
    let processor = spawn_processor(processor, rx, shutdown);

    let state = Arc::new(AppState {
        handler: AdmissionHandler::new(rules, queue),
        processor_metrics,
    });
    Ok((state, vec![reloader, processor]))
}

/// Rules from inline configuration, active until a file load replaces them.
fn initial_rules(config: &Config) -> anyhow::Result<RuleStore> {
    let ignore = config
        .rules
        .inline_ignore
        .as_deref()
        .map(parse_rule_set::<IgnoreRules>)
        .transpose()
        .context("KUBETRAIL_IGNORE_CONFIG is not a valid ignore rule set")?;
    let block = config
        .rules
        .inline_block
        .as_deref()
        .map(parse_rule_set::<BlockRules>)
        .transpose()
        .context("KUBETRAIL_BLOCK_CONFIG is not a valid block rule set")?;
    Ok(RuleStore::new(ignore, block))
}

fn build_dispatcher(config: &Config) -> Option<Arc<Dispatcher>> {
    let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
    for url in &config.notify.webhook_urls {
        match WebhookNotifier::from_url(url.as_str()) {
            Ok(notifier) => channels.push(Arc::new(notifier)),
            Err(e) => warn!(error = %e, "skipping webhook channel"),
        }
    }
    if channels.is_empty() {
        info!("no notification channels configured");
        return None;
    }
    info!(channels = channels.len(), "notification dispatcher ready");
    Some(Arc::new(Dispatcher::new(channels, config.notify.timeout())))
}
