//! Control-process state synchronizer.
//!
//! `ControlPanel` is the single place selection and on-air state may change.
//! Every mutation updates local state, notifies the local event bus, and
//! publishes the equivalent wire event through the channel client — with the
//! one exception of preview staging, which never leaves the control process.

pub mod auto_update;
pub mod settings;

use std::sync::Arc;

use election_api::{registry, ElectionDataSource};
use pusher_integration::{ChannelClient, PublishOutcome};
use shared::{
    cache::{CacheEntry, CacheKey, ResultCache},
    domain::{DataKind, KommuneId, Template, TransitionKind, TransitionParams, ValgstedId},
    protocol::{ChannelEvent, ElectionSnapshot},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

const EVENT_BUFFER: usize = 256;

/// Local bus events observed by the control panel's own UI. Selection and
/// transition variants mirror what goes over the wire; the rest is
/// control-side only.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    KommuneChanged {
        kommune_id: KommuneId,
    },
    ValgstedChanged {
        kommune_id: KommuneId,
        valgsted_id: ValgstedId,
    },
    TemplateChanged {
        template: Template,
    },
    TransitionExecuted {
        kind: TransitionKind,
        template: Template,
        params: TransitionParams,
    },
    DataUpdated {
        kind: DataKind,
        kommune_id: KommuneId,
        valgsted_id: Option<ValgstedId>,
        data: ElectionSnapshot,
    },
    FetchFailed {
        kind: DataKind,
        reason: String,
    },
}

/// Point-in-time view of the control state, for status displays.
#[derive(Debug, Clone, Default)]
pub struct ControlSnapshot {
    pub active_kommune: Option<KommuneId>,
    pub active_valgsted: Option<ValgstedId>,
    pub preview_template: Option<Template>,
    pub live_template: Option<Template>,
    pub live_params: TransitionParams,
    pub on_air: bool,
}

struct ControlState {
    active_kommune: Option<KommuneId>,
    active_valgsted: Option<ValgstedId>,
    preview_template: Option<Template>,
    live_template: Option<Template>,
    live_params: TransitionParams,
    on_air: bool,
    /// Bumped on every selection change. Fetches dispatched under an older
    /// epoch are discarded when they resolve, so a slow response for a
    /// superseded selection can never overwrite current data.
    selection_epoch: u64,
    cache: ResultCache,
}

pub struct ControlPanel {
    data: Arc<dyn ElectionDataSource>,
    channel: Arc<ChannelClient>,
    inner: Mutex<ControlState>,
    events: broadcast::Sender<ControlEvent>,
}

impl ControlPanel {
    pub fn new(data: Arc<dyn ElectionDataSource>, channel: Arc<ChannelClient>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            data,
            channel,
            inner: Mutex::new(ControlState {
                active_kommune: None,
                active_valgsted: None,
                preview_template: None,
                live_template: None,
                live_params: TransitionParams::default(),
                on_air: false,
                selection_epoch: 0,
                cache: ResultCache::new(),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ControlSnapshot {
        let inner = self.inner.lock().await;
        ControlSnapshot {
            active_kommune: inner.active_kommune.clone(),
            active_valgsted: inner.active_valgsted.clone(),
            preview_template: inner.preview_template,
            live_template: inner.live_template,
            live_params: inner.live_params.clone(),
            on_air: inner.on_air,
        }
    }

    pub async fn cached(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().await.cache.get(key).cloned()
    }

    async fn publish(&self, event: &ChannelEvent) {
        match event.to_payload() {
            Ok(payload) => {
                if self.channel.publish(event.name(), payload).await == PublishOutcome::Queued {
                    info!(event = event.name(), "channel pending; event queued");
                }
            }
            Err(error) => {
                warn!(event = event.name(), %error, "failed to encode channel event");
            }
        }
    }

    /// Select the active municipality. Always clears the polling-station
    /// selection, then starts a decoupled fetch for the new municipality —
    /// the selection event and the later data event are separate on the wire
    /// because fetch latency is unbounded.
    pub async fn select_kommune(self: &Arc<Self>, kommune_id: KommuneId) {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.active_kommune = Some(kommune_id.clone());
            inner.active_valgsted = None;
            inner.selection_epoch += 1;
            inner.selection_epoch
        };
        info!(
            kommune_id = %kommune_id,
            kommune = registry::kommune_navn(&kommune_id).unwrap_or("ukendt kommune"),
            "active municipality set"
        );

        let _ = self.events.send(ControlEvent::KommuneChanged {
            kommune_id: kommune_id.clone(),
        });
        self.publish(&ChannelEvent::KommuneChanged {
            kommune_id: kommune_id.clone(),
        })
        .await;

        self.spawn_kommune_fetch(kommune_id, epoch);
    }

    /// Select the active polling station. Requires a municipality, and the
    /// station must belong to it; otherwise this is a warning and a no-op.
    pub async fn select_valgsted(self: &Arc<Self>, valgsted_id: ValgstedId) -> bool {
        let (kommune_id, epoch) = {
            let mut inner = self.inner.lock().await;
            let Some(kommune_id) = inner.active_kommune.clone() else {
                warn!(valgsted_id = %valgsted_id, "polling station selected with no active municipality");
                return false;
            };
            if !registry::contains_valgsted(&kommune_id, &valgsted_id) {
                warn!(
                    kommune_id = %kommune_id,
                    valgsted_id = %valgsted_id,
                    "polling station does not belong to the active municipality"
                );
                return false;
            }
            inner.active_valgsted = Some(valgsted_id.clone());
            inner.selection_epoch += 1;
            (kommune_id, inner.selection_epoch)
        };
        info!(
            kommune_id = %kommune_id,
            valgsted_id = %valgsted_id,
            valgsted = registry::valgsted_navn(&kommune_id, &valgsted_id).unwrap_or("ukendt valgsted"),
            "active polling station set"
        );

        let _ = self.events.send(ControlEvent::ValgstedChanged {
            kommune_id: kommune_id.clone(),
            valgsted_id: valgsted_id.clone(),
        });
        self.publish(&ChannelEvent::ValgstedChanged {
            kommune_id: kommune_id.clone(),
            valgsted_id: valgsted_id.clone(),
        })
        .await;

        self.spawn_valgsted_fetch(kommune_id, valgsted_id, epoch);
        true
    }

    /// Stage a template for preview. Control-side only: staging is never
    /// published; only transitions reach the display.
    pub async fn set_preview_template(&self, template: Template) {
        {
            let mut inner = self.inner.lock().await;
            inner.preview_template = Some(template);
        }
        info!(template = %template, "preview template staged");
        let _ = self.events.send(ControlEvent::TemplateChanged { template });
    }

    /// Promote the staged preview to program. The current selection is
    /// snapshotted into the live parameters and stays frozen there until the
    /// next transition. With nothing staged this is a warning and a no-op.
    pub async fn execute_transition(&self, kind: TransitionKind) -> bool {
        let (template, params) = {
            let mut inner = self.inner.lock().await;
            let Some(template) = inner.preview_template else {
                warn!("transition requested with no staged template");
                return false;
            };
            let params = TransitionParams::new(
                inner.active_kommune.clone(),
                inner.active_valgsted.clone(),
            );
            inner.live_template = Some(template);
            inner.live_params = params.clone();
            inner.on_air = true;
            (template, params)
        };
        info!(kind = kind.as_wire(), template = %template, "transition executed");

        let _ = self.events.send(ControlEvent::TransitionExecuted {
            kind,
            template,
            params: params.clone(),
        });
        self.publish(&ChannelEvent::TransitionExecuted {
            kind,
            template,
            params,
        })
        .await;
        true
    }

    /// Fetch everything the staged template depends on. Drives the manual
    /// refresh action and the auto-update loop.
    pub async fn refresh_active_data(self: &Arc<Self>) {
        let (template, kommune, valgsted, epoch) = {
            let inner = self.inner.lock().await;
            (
                inner.preview_template,
                inner.active_kommune.clone(),
                inner.active_valgsted.clone(),
                inner.selection_epoch,
            )
        };
        let Some(template) = template else {
            warn!("no template staged; nothing to refresh");
            return;
        };
        let Some(kommune) = kommune else {
            warn!("no municipality selected; nothing to refresh");
            return;
        };
        match template {
            Template::Results => self.spawn_kommune_fetch(kommune, epoch),
            Template::Candidates => {
                self.spawn_kommune_fetch(kommune.clone(), epoch);
                self.spawn_kandidat_fetch(kommune, epoch);
            }
            Template::Stations => match valgsted {
                Some(valgsted) => self.spawn_valgsted_fetch(kommune, valgsted, epoch),
                None => warn!("no polling station selected; nothing to refresh"),
            },
        }
    }

    fn spawn_kommune_fetch(self: &Arc<Self>, kommune_id: KommuneId, epoch: u64) {
        let panel = Arc::clone(self);
        tokio::spawn(async move {
            match panel.data.kommune_results(&kommune_id).await {
                Ok(data) => {
                    panel
                        .apply_fetched(DataKind::KommuneResults, kommune_id, None, data, epoch)
                        .await;
                }
                Err(error) => {
                    warn!(kommune_id = %kommune_id, %error, "municipality fetch failed");
                    let _ = panel.events.send(ControlEvent::FetchFailed {
                        kind: DataKind::KommuneResults,
                        reason: error.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_valgsted_fetch(
        self: &Arc<Self>,
        kommune_id: KommuneId,
        valgsted_id: ValgstedId,
        epoch: u64,
    ) {
        let panel = Arc::clone(self);
        tokio::spawn(async move {
            match panel.data.valgsted_results(&kommune_id, &valgsted_id).await {
                Ok(data) => {
                    panel
                        .apply_fetched(
                            DataKind::ValgstedResults,
                            kommune_id,
                            Some(valgsted_id),
                            data,
                            epoch,
                        )
                        .await;
                }
                Err(error) => {
                    warn!(
                        kommune_id = %kommune_id,
                        valgsted_id = %valgsted_id,
                        %error,
                        "polling station fetch failed"
                    );
                    let _ = panel.events.send(ControlEvent::FetchFailed {
                        kind: DataKind::ValgstedResults,
                        reason: error.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_kandidat_fetch(self: &Arc<Self>, kommune_id: KommuneId, epoch: u64) {
        let panel = Arc::clone(self);
        tokio::spawn(async move {
            match panel.data.kandidat_status(&kommune_id).await {
                Ok(data) => {
                    panel
                        .apply_fetched(DataKind::KandidatStatus, kommune_id, None, data, epoch)
                        .await;
                }
                Err(error) => {
                    warn!(kommune_id = %kommune_id, %error, "candidate fetch failed");
                    let _ = panel.events.send(ControlEvent::FetchFailed {
                        kind: DataKind::KandidatStatus,
                        reason: error.to_string(),
                    });
                }
            }
        });
    }

    /// Cache and broadcast a fetched payload — unless the selection moved on
    /// while the fetch was in flight, in which case the result is dropped.
    async fn apply_fetched(
        &self,
        kind: DataKind,
        kommune_id: KommuneId,
        valgsted_id: Option<ValgstedId>,
        data: ElectionSnapshot,
        epoch: u64,
    ) {
        {
            let mut inner = self.inner.lock().await;
            if inner.selection_epoch != epoch {
                info!(
                    kind = ?kind,
                    kommune_id = %kommune_id,
                    "discarding fetch result for a superseded selection"
                );
                return;
            }
            inner.cache.insert(
                CacheKey {
                    kind,
                    kommune_id: kommune_id.clone(),
                    valgsted_id: valgsted_id.clone(),
                },
                data.clone(),
            );
        }

        let _ = self.events.send(ControlEvent::DataUpdated {
            kind,
            kommune_id: kommune_id.clone(),
            valgsted_id: valgsted_id.clone(),
            data: data.clone(),
        });

        let event = match (kind, valgsted_id) {
            (DataKind::KommuneResults, _) => ChannelEvent::KommuneDataUpdated { kommune_id, data },
            (DataKind::KandidatStatus, _) => ChannelEvent::KandidatDataUpdated { kommune_id, data },
            (DataKind::ValgstedResults, Some(valgsted_id)) => ChannelEvent::ValgstedDataUpdated {
                kommune_id,
                valgsted_id,
                data,
            },
            (DataKind::ValgstedResults, None) => {
                warn!(kommune_id = %kommune_id, "polling station payload without a station id");
                return;
            }
        };
        self.publish(&event).await;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
