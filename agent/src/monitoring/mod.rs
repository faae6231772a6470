//! System monitoring: periodic stats collection and notification streaming.
//!
//! Every configured target gets its own subscription with a private
//! [`HostCollector`], so CPU baselines are never shared between hosts.
//! Stats are collected at a fixed interval and sent as `monitoring.data`
//! JSON-RPC notifications; failed rounds produce `monitoring.error`.

pub mod collector;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::Target;
use crate::io::transport::NotificationSender;
use crate::protocol::messages::JsonRpcNotification;
use crate::protocol::methods::{MonitoringError, MONITORING_DATA, MONITORING_ERROR};

use self::collector::{HostCollector, StatsCollector};

/// Manages active monitoring subscriptions.
///
/// Each subscription spawns a background tokio task that periodically
/// collects system stats and sends notifications.
pub struct MonitoringManager {
    subscriptions: Mutex<HashMap<String, CancellationToken>>,
    tasks: TaskTracker,
    notification_tx: NotificationSender,
}

impl MonitoringManager {
    pub fn new(notification_tx: NotificationSender) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            tasks: TaskTracker::new(),
            notification_tx,
        }
    }

    /// Start monitoring a configured target.
    ///
    /// SSH targets are connected before this returns; a failed connection
    /// is an error and no subscription is created.
    pub async fn subscribe(
        &self,
        target: &Target,
        interval: Duration,
        per_core: bool,
        count: Option<u64>,
    ) -> Result<()> {
        let owned = target.clone();
        let collector =
            tokio::task::spawn_blocking(move || HostCollector::for_target(&owned, per_core))
                .await
                .context("Failed to spawn collector setup task")??;

        self.subscribe_with(target.id(), Box::new(collector), interval, count)
            .await;
        Ok(())
    }

    /// Start monitoring `host` with an existing collector.
    ///
    /// If already subscribed to this host, the existing subscription is
    /// cancelled and replaced.
    pub async fn subscribe_with(
        &self,
        host: &str,
        collector: Box<dyn StatsCollector>,
        interval: Duration,
        count: Option<u64>,
    ) {
        let cancel = CancellationToken::new();

        {
            let mut subs = self.subscriptions.lock().await;
            if let Some(old) = subs.insert(host.to_string(), cancel.clone()) {
                old.cancel();
                debug!("Replaced existing monitoring subscription for '{host}'");
            }
        }

        self.tasks.spawn(monitoring_task(
            host.to_string(),
            collector,
            interval,
            count,
            self.notification_tx.clone(),
            cancel,
        ));

        info!(
            "Started monitoring '{}' (interval: {}ms)",
            host,
            interval.as_millis()
        );
    }

    /// Wait until every subscription has finished, either by reaching its
    /// sample count or by being cancelled.
    pub async fn wait_all(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Cancel all active subscriptions and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        {
            let mut subs = self.subscriptions.lock().await;
            for (host, cancel) in subs.drain() {
                cancel.cancel();
                debug!("Shutdown: cancelled monitoring for '{host}'");
            }
        }
        self.wait_all().await;
    }
}

/// Background task that periodically collects stats and sends notifications.
///
/// The collector is wrapped in `Arc<std::sync::Mutex>` so it can be handed
/// to `spawn_blocking` calls (collection involves blocking I/O). With a
/// `count`, the task stops after that many rounds, failed rounds included.
async fn monitoring_task(
    host: String,
    collector: Box<dyn StatsCollector>,
    interval: Duration,
    count: Option<u64>,
    tx: NotificationSender,
    cancel: CancellationToken,
) {
    let collector = Arc::new(std::sync::Mutex::new(collector));
    let mut ticker = tokio::time::interval(interval);
    // A late round must not be followed by catch-up rounds measuring ~0 ms.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rounds: u64 = 0;

    loop {
        if count.is_some_and(|limit| rounds >= limit) {
            debug!("Monitoring for '{}' completed after {} rounds", host, rounds);
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Monitoring task for '{}' cancelled", host);
                break;
            }
            _ = ticker.tick() => {
                rounds += 1;
                let collector = collector.clone();
                let host_label = host.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let mut c = collector.lock().unwrap_or_else(PoisonError::into_inner);
                    c.collect(&host_label)
                }).await;

                let notification = match result {
                    Ok(Ok(data)) => serde_json::to_value(&data)
                        .map(|params| JsonRpcNotification::new(MONITORING_DATA, params)),
                    Ok(Err(e)) => {
                        warn!("Monitoring collection failed for '{}': {:#}", host, e);
                        serde_json::to_value(MonitoringError {
                            host: host.clone(),
                            timestamp: Utc::now(),
                            message: format!("{e:#}"),
                        })
                        .map(|params| JsonRpcNotification::new(MONITORING_ERROR, params))
                    }
                    Err(e) => {
                        warn!("Monitoring task panicked for '{}': {}", host, e);
                        break;
                    }
                };

                match notification {
                    Ok(notification) => {
                        if tx.send(notification).is_err() {
                            debug!("Notification channel closed, stopping monitoring for '{}'", host);
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to serialize notification for '{}': {}", host, e),
                }
            }
        }
    }
}
