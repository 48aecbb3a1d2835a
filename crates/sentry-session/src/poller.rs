//! Background alert polling
//!
//! A ticker fetches the recent-alert list on a fixed period and replaces the
//! shared snapshot wholesale. Fetches are detached from the ticker so a slow
//! answer never delays the next one; ordering between answers is whatever
//! the network delivers, and the last one to land wins.

use std::sync::Arc;
use std::time::Duration;

use sentry_client::{Alert, SentryClient};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default refresh period for the alert snapshot
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(5);

/// Shared, read-mostly view of the latest alert list
#[derive(Clone, Default)]
pub struct AlertFeed {
    alerts: Arc<RwLock<Vec<Alert>>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the most recently received alert list
    pub async fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    async fn replace(&self, alerts: Vec<Alert>) {
        *self.alerts.write().await = alerts;
    }
}

/// Periodic alert fetcher feeding an [`AlertFeed`]
pub struct AlertPoller {
    client: SentryClient,
    feed: AlertFeed,
    period: Duration,
}

impl AlertPoller {
    pub fn new(client: SentryClient) -> Self {
        Self::with_period(client, DEFAULT_POLL_PERIOD)
    }

    pub fn with_period(client: SentryClient, period: Duration) -> Self {
        Self {
            client,
            feed: AlertFeed::new(),
            period,
        }
    }

    /// The feed this poller writes into
    pub fn feed(&self) -> AlertFeed {
        self.feed.clone()
    }

    /// Start the ticker; the first fetch fires immediately
    pub fn spawn(self) -> AlertPollerHandle {
        let AlertPoller {
            client,
            feed,
            period,
        } = self;
        let shared = feed.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let client = client.clone();
                let feed = feed.clone();
                // Detached so a slow answer never delays the next tick;
                // whichever response lands last wins.
                tokio::spawn(async move {
                    match client.list_alerts().await {
                        Ok(alerts) => {
                            debug!(count = alerts.len(), "Alert snapshot refreshed");
                            feed.replace(alerts).await;
                        }
                        Err(e) => {
                            warn!(error = %e, "Alert poll failed");
                        }
                    }
                });
            }
        });

        AlertPollerHandle {
            feed: shared,
            handle: Some(handle),
        }
    }
}

/// Owning handle for a running poller; dropping it stops the ticker
pub struct AlertPollerHandle {
    feed: AlertFeed,
    handle: Option<JoinHandle<()>>,
}

impl AlertPollerHandle {
    /// The feed the running poller writes into
    pub fn feed(&self) -> AlertFeed {
        self.feed.clone()
    }

    /// Stop the ticker. In-flight fetches may still land once.
    pub fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for AlertPollerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_client::AlertSeverity;

    fn alert(message: &str) -> Alert {
        Alert {
            severity: AlertSeverity::Info,
            message: message.to_string(),
            timestamp: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn feed_replaces_wholesale() {
        let feed = AlertFeed::new();
        feed.replace(vec![alert("one"), alert("two")]).await;
        feed.replace(vec![alert("three")]).await;

        let snapshot = feed.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].message, "three");
    }
}
