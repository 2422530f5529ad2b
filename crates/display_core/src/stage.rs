//! Render surfaces and the cut/dissolve transition engine.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{Template, TransitionParams},
    protocol::SurfaceMessage,
};
use tokio::sync::Mutex;
use tracing::info;

/// One render surface (an embedded template view). Implementations wrap
/// whatever actually draws the graphics; the engine only needs navigation
/// with a completion signal, a message inbox, and opacity control.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Navigate the surface to a template. Resolves when the surface reports
    /// load-complete; a surface that never finishes loading never resolves.
    async fn load(&self, template: Template, params: &TransitionParams) -> anyhow::Result<()>;
    /// Deliver a message to the surface inbox. Never navigates.
    async fn post_message(&self, message: SurfaceMessage) -> anyhow::Result<()>;
    /// Immediate opacity change.
    async fn set_opacity(&self, opacity: f64);
    /// Start an opacity animation over the given duration and return without
    /// waiting for it.
    async fn animate_opacity(&self, target: f64, duration: Duration);
    /// Drop transition-only styling after the surface is promoted.
    async fn clear_transition_styling(&self);
    /// Tear the surface down.
    async fn discard(&self);
}

/// Creates fresh surfaces, hidden and stacked above the current program
/// output.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    async fn create_hidden(&self) -> anyhow::Result<Arc<dyn RenderSurface>>;
}

#[derive(Debug, Clone, Copy)]
pub struct DissolveTiming {
    /// Delay between load-complete and the start of the cross-fade, letting
    /// the freshly loaded surface settle its layout.
    pub settle: Duration,
    /// Cross-fade duration.
    pub fade: Duration,
    /// Margin past the fade before the old surface is destroyed.
    pub cleanup_margin: Duration,
}

impl Default for DissolveTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(50),
            fade: Duration::from_secs(1),
            cleanup_margin: Duration::from_millis(100),
        }
    }
}

/// Owns the current program surface and performs transitions onto it.
/// Transitions are serialized; whatever happens, at most one surface is
/// current afterwards.
pub struct ProgramStage {
    factory: Arc<dyn SurfaceFactory>,
    timing: DissolveTiming,
    current: Mutex<Option<Arc<dyn RenderSurface>>>,
}

impl ProgramStage {
    pub fn new(factory: Arc<dyn SurfaceFactory>, timing: DissolveTiming) -> Self {
        Self {
            factory,
            timing,
            current: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> Option<Arc<dyn RenderSurface>> {
        self.current.lock().await.clone()
    }

    /// Hard cut: navigate in place, no fade, no surface swap.
    pub async fn cut_to(
        &self,
        template: Template,
        params: &TransitionParams,
    ) -> anyhow::Result<()> {
        let mut current = self.current.lock().await;
        let surface = match current.as_ref() {
            Some(surface) => Arc::clone(surface),
            None => {
                let surface = self.factory.create_hidden().await?;
                surface.set_opacity(1.0).await;
                *current = Some(Arc::clone(&surface));
                surface
            }
        };
        surface.load(template, params).await?;
        info!(%template, "cut complete");
        Ok(())
    }

    /// Cross-fade to a freshly loaded surface. The fade only starts once the
    /// new surface reports load-complete — fading earlier would reveal a
    /// blank surface. A load that never completes leaves the old program
    /// output visible indefinitely; there is no timeout.
    pub async fn dissolve_to(
        &self,
        template: Template,
        params: &TransitionParams,
    ) -> anyhow::Result<()> {
        let mut current = self.current.lock().await;

        let incoming = self.factory.create_hidden().await?;
        incoming.set_opacity(0.0).await;

        incoming.load(template, params).await?;
        info!(%template, "new surface loaded; starting dissolve");

        tokio::time::sleep(self.timing.settle).await;

        if let Some(outgoing) = current.as_ref() {
            outgoing.animate_opacity(0.0, self.timing.fade).await;
        }
        incoming.animate_opacity(1.0, self.timing.fade).await;

        tokio::time::sleep(self.timing.fade + self.timing.cleanup_margin).await;

        if let Some(outgoing) = current.take() {
            outgoing.discard().await;
        }
        incoming.clear_transition_styling().await;
        *current = Some(incoming);
        info!(%template, "dissolve complete");
        Ok(())
    }
}
