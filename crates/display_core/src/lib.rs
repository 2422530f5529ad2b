//! Display-process state synchronizer.
//!
//! The display has no selection state of its own: it mirrors whatever the
//! control panel publishes. Transitions drive the program stage; data
//! updates refresh the current surface in place, never navigating it.

pub mod stage;

use std::sync::Arc;

use pusher_integration::RelayEvent;
use shared::{
    cache::{CacheEntry, CacheKey, ResultCache},
    domain::{DataKind, KommuneId, Template, TransitionKind, TransitionParams, ValgstedId},
    protocol::{ChannelEvent, ElectionSnapshot, SurfaceMessage},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub use stage::{DissolveTiming, ProgramStage, RenderSurface, SurfaceFactory};

const EVENT_BUFFER: usize = 256;

/// Local bus events observed by the display shell.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    TransitionCompleted {
        kind: TransitionKind,
        template: Template,
        params: TransitionParams,
    },
    DataForwarded {
        kind: DataKind,
    },
}

/// Point-in-time view of the mirrored on-air state.
#[derive(Debug, Clone, Default)]
pub struct DisplaySnapshot {
    pub on_air: bool,
    pub live_template: Option<Template>,
    pub live_params: TransitionParams,
    pub activated: bool,
}

struct DisplayState {
    on_air: bool,
    live_template: Option<Template>,
    live_params: TransitionParams,
    /// Nothing is forwarded to the surface until the first transition has
    /// put something on it.
    activated: bool,
    cache: ResultCache,
}

pub struct DisplaySync {
    stage: ProgramStage,
    inner: Mutex<DisplayState>,
    events: broadcast::Sender<DisplayEvent>,
}

impl DisplaySync {
    pub fn new(factory: Arc<dyn SurfaceFactory>, timing: DissolveTiming) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            stage: ProgramStage::new(factory, timing),
            inner: Mutex::new(DisplayState {
                on_air: false,
                live_template: None,
                live_params: TransitionParams::default(),
                activated: false,
                cache: ResultCache::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DisplaySnapshot {
        let inner = self.inner.lock().await;
        DisplaySnapshot {
            on_air: inner.on_air,
            live_template: inner.live_template,
            live_params: inner.live_params.clone(),
            activated: inner.activated,
        }
    }

    pub async fn cached(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().await.cache.get(key).cloned()
    }

    pub async fn current_surface(&self) -> Option<Arc<dyn RenderSurface>> {
        self.stage.current().await
    }

    /// Drain relay events until the subscription closes.
    pub async fn run(self: &Arc<Self>, mut events: broadcast::Receiver<RelayEvent>) {
        loop {
            match events.recv().await {
                Ok(RelayEvent::Message { name, payload }) => {
                    match ChannelEvent::decode(&name, payload) {
                        Ok(event) => self.handle_event(event).await,
                        Err(error) => {
                            warn!(event = %name, %error, "discarding undecodable channel event");
                        }
                    }
                }
                Ok(RelayEvent::SubscriptionSucceeded) => {
                    info!("relay subscription established");
                }
                Ok(RelayEvent::Closed { reason }) => {
                    warn!(%reason, "relay subscription closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "display fell behind the relay stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn handle_event(self: &Arc<Self>, event: ChannelEvent) {
        match event {
            ChannelEvent::TransitionExecuted {
                kind,
                template,
                params,
            } => self.apply_transition(kind, template, params).await,
            ChannelEvent::KommuneDataUpdated { kommune_id, data } => {
                self.apply_data(DataKind::KommuneResults, kommune_id, None, data)
                    .await;
            }
            ChannelEvent::ValgstedDataUpdated {
                kommune_id,
                valgsted_id,
                data,
            } => {
                self.apply_data(
                    DataKind::ValgstedResults,
                    kommune_id,
                    Some(valgsted_id),
                    data,
                )
                .await;
            }
            ChannelEvent::KandidatDataUpdated { kommune_id, data } => {
                self.apply_data(DataKind::KandidatStatus, kommune_id, None, data)
                    .await;
            }
            // Selection and staging changes are informational; nothing
            // visible changes until a transition arrives.
            ChannelEvent::KommuneChanged { kommune_id } => {
                info!(%kommune_id, "selection changed upstream");
            }
            ChannelEvent::ValgstedChanged {
                kommune_id,
                valgsted_id,
            } => {
                info!(%kommune_id, %valgsted_id, "station selection changed upstream");
            }
            ChannelEvent::TemplateChanged { template } => {
                info!(%template, "preview staged upstream");
            }
        }
    }

    /// Mirror the on-air state immediately, then run the stage transition in
    /// the background so data ticks keep flowing while a dissolve loads.
    async fn apply_transition(
        self: &Arc<Self>,
        kind: TransitionKind,
        template: Template,
        params: TransitionParams,
    ) {
        {
            let mut inner = self.inner.lock().await;
            inner.on_air = true;
            inner.live_template = Some(template);
            inner.live_params = params.clone();
        }
        info!(kind = kind.as_wire(), %template, "transition received");

        let sync = Arc::clone(self);
        tokio::spawn(async move {
            let result = match kind {
                TransitionKind::Cut => sync.stage.cut_to(template, &params).await,
                TransitionKind::Dissolve => sync.stage.dissolve_to(template, &params).await,
            };
            match result {
                Ok(()) => {
                    sync.inner.lock().await.activated = true;
                    let _ = sync.events.send(DisplayEvent::TransitionCompleted {
                        kind,
                        template,
                        params,
                    });
                }
                Err(error) => {
                    warn!(%template, %error, "transition failed; previous program output stays up");
                }
            }
        });
    }

    /// Cache the payload; forward it to the surface inbox only when the
    /// display is activated and the live template consumes this data kind.
    /// The surface is refreshed in place — navigation is never touched by a
    /// data tick.
    async fn apply_data(
        &self,
        kind: DataKind,
        kommune_id: KommuneId,
        valgsted_id: Option<ValgstedId>,
        data: ElectionSnapshot,
    ) {
        let forward = {
            let mut inner = self.inner.lock().await;
            inner.cache.insert(
                CacheKey {
                    kind,
                    kommune_id: kommune_id.clone(),
                    valgsted_id,
                },
                data.clone(),
            );
            inner.activated
                && inner.on_air
                && inner
                    .live_template
                    .map_or(false, |template| template.consumes(kind))
        };
        if !forward {
            debug!(?kind, %kommune_id, "data tick cached; no matching template on air");
            return;
        }

        let Some(surface) = self.stage.current().await else {
            warn!(?kind, "no current surface to forward data to");
            return;
        };
        let message = SurfaceMessage::RefreshData {
            payload: data,
            no_animation: true,
        };
        if let Err(error) = surface.post_message(message).await {
            warn!(?kind, %error, "failed to forward data to the surface");
            return;
        }
        debug!(?kind, %kommune_id, "data forwarded to the live surface");
        let _ = self.events.send(DisplayEvent::DataForwarded { kind });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
