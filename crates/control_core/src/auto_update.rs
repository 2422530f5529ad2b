//! Periodic data refresh for the staged template, like an operator hitting
//! the refresh button every N seconds.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time};
use tracing::info;

use crate::ControlPanel;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

pub struct AutoUpdater {
    panel: Arc<ControlPanel>,
    inner: Mutex<AutoUpdaterState>,
}

struct AutoUpdaterState {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl AutoUpdater {
    pub fn new(panel: Arc<ControlPanel>) -> Self {
        Self {
            panel,
            inner: Mutex::new(AutoUpdaterState {
                interval: DEFAULT_INTERVAL,
                task: None,
            }),
        }
    }

    pub async fn enable(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        let panel = Arc::clone(&self.panel);
        let interval = inner.interval;
        inner.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The first tick of a tokio interval fires immediately; the
            // refresh cadence starts one interval out, matching a timer.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!(interval_secs = interval.as_secs(), "auto-update tick");
                panel.refresh_active_data().await;
            }
        }));
        info!(interval_secs = interval.as_secs(), "auto-update enabled");
    }

    pub async fn disable(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.task.take() {
            task.abort();
            info!("auto-update disabled");
        }
    }

    /// Change the refresh cadence; restarts the timer when it is running.
    pub async fn set_interval(&self, interval: Duration) {
        let restart = {
            let mut inner = self.inner.lock().await;
            inner.interval = interval;
            inner.task.is_some()
        };
        info!(interval_secs = interval.as_secs(), "auto-update interval changed");
        if restart {
            self.enable().await;
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.inner.lock().await.task.is_some()
    }
}
