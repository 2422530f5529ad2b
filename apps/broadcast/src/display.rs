use std::{
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use display_core::{DissolveTiming, DisplaySync, RenderSurface, SurfaceFactory};
use pusher_integration::{PusherConnector, RelayConnector, RelayCredentials};
use shared::{
    domain::{Template, TransitionParams},
    protocol::SurfaceMessage,
};
use tracing::info;

use crate::config::Settings;

/// Headless render surface: logs what a real template view would be doing so
/// the display role can run in a terminal.
struct LogSurface {
    id: u64,
}

#[async_trait]
impl RenderSurface for LogSurface {
    async fn load(&self, template: Template, params: &TransitionParams) -> Result<()> {
        info!(
            surface = self.id,
            %template,
            kommune = ?params.kommune_id,
            valgsted = ?params.valgsted_id,
            "surface loaded"
        );
        Ok(())
    }

    async fn post_message(&self, message: SurfaceMessage) -> Result<()> {
        match message {
            SurfaceMessage::RefreshData {
                payload,
                no_animation,
            } => {
                info!(
                    surface = self.id,
                    progress = payload.result.election_progress,
                    no_animation,
                    "surface data refreshed"
                );
            }
            SurfaceMessage::ApplySettings { .. } => {
                info!(surface = self.id, "surface settings applied");
            }
        }
        Ok(())
    }

    async fn set_opacity(&self, opacity: f64) {
        info!(surface = self.id, opacity, "opacity set");
    }

    async fn animate_opacity(&self, target: f64, duration: Duration) {
        info!(
            surface = self.id,
            target,
            duration_ms = duration.as_millis() as u64,
            "opacity animating"
        );
    }

    async fn clear_transition_styling(&self) {}

    async fn discard(&self) {
        info!(surface = self.id, "surface discarded");
    }
}

struct LogSurfaceFactory {
    next_id: AtomicU64,
}

#[async_trait]
impl SurfaceFactory for LogSurfaceFactory {
    async fn create_hidden(&self) -> Result<Arc<dyn RenderSurface>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(surface = id, "surface created (hidden)");
        Ok(Arc::new(LogSurface { id }))
    }
}

pub async fn run(settings: Settings) -> Result<()> {
    let connector = PusherConnector::new();
    let credentials = RelayCredentials {
        app_key: settings.app_key.clone(),
        cluster: settings.cluster.clone(),
        auth_endpoint: settings.auth_endpoint.clone(),
        channel: settings.channel.clone(),
    };
    let session = connector.connect(&credentials).await?;

    let sync = DisplaySync::new(
        Arc::new(LogSurfaceFactory {
            next_id: AtomicU64::new(1),
        }),
        DissolveTiming::default(),
    );

    info!("display ready; mirroring the broadcast channel");
    sync.run(session.subscribe_events()).await;
    Ok(())
}
