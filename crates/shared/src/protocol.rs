use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{KommuneId, Template, TransitionKind, TransitionParams, ValgstedId},
    error::ProtocolError,
};

/// Result document served by the election API and relayed in `*-data-updated`
/// events. The API guarantees at least `lastUpdated`, `result` and `parties`;
/// everything else is carried along untouched so the render surfaces see the
/// full document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: ResultSummary,
    #[serde(default)]
    pub parties: Vec<PartyResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    /// Share of votes counted so far, 0-100.
    #[serde(default)]
    pub election_progress: f64,
    /// Voter turnout in percent; absent until the first count arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_given: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligible_voters: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyResult {
    #[serde(default)]
    pub letter: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Everything that travels over the relay channel between the control panel
/// and the display, in both directions of the vocabulary table. Events are
/// carried as an `(event name, JSON payload)` pair on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
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
    KommuneDataUpdated {
        kommune_id: KommuneId,
        data: ElectionSnapshot,
    },
    ValgstedDataUpdated {
        kommune_id: KommuneId,
        valgsted_id: ValgstedId,
        data: ElectionSnapshot,
    },
    KandidatDataUpdated {
        kommune_id: KommuneId,
        data: ElectionSnapshot,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KommunePayload {
    kommune_id: KommuneId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValgstedPayload {
    kommune_id: KommuneId,
    valgsted_id: ValgstedId,
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplatePayload {
    template: Template,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransitionPayload {
    #[serde(rename = "type")]
    kind: String,
    template: Template,
    params: TransitionParams,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KommuneDataPayload {
    kommune_id: KommuneId,
    data: ElectionSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValgstedDataPayload {
    kommune_id: KommuneId,
    valgsted_id: ValgstedId,
    data: ElectionSnapshot,
}

impl ChannelEvent {
    /// Wire name of the event. Client events on the relay carry the
    /// `client-` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::KommuneChanged { .. } => "client-kommune-changed",
            ChannelEvent::ValgstedChanged { .. } => "client-valgsted-changed",
            ChannelEvent::TemplateChanged { .. } => "client-template-changed",
            ChannelEvent::TransitionExecuted { .. } => "client-transition-executed",
            ChannelEvent::KommuneDataUpdated { .. } => "client-kommune-data-updated",
            ChannelEvent::ValgstedDataUpdated { .. } => "client-valgsted-data-updated",
            ChannelEvent::KandidatDataUpdated { .. } => "client-kandidat-data-updated",
        }
    }

    pub fn to_payload(&self) -> Result<Value, ProtocolError> {
        let encode = |result: Result<Value, serde_json::Error>| {
            result.map_err(|source| ProtocolError::EncodePayload {
                event: self.name().to_string(),
                source,
            })
        };
        match self {
            ChannelEvent::KommuneChanged { kommune_id } => {
                encode(serde_json::to_value(KommunePayload {
                    kommune_id: kommune_id.clone(),
                }))
            }
            ChannelEvent::ValgstedChanged {
                kommune_id,
                valgsted_id,
            } => encode(serde_json::to_value(ValgstedPayload {
                kommune_id: kommune_id.clone(),
                valgsted_id: valgsted_id.clone(),
            })),
            ChannelEvent::TemplateChanged { template } => {
                encode(serde_json::to_value(TemplatePayload {
                    template: *template,
                }))
            }
            ChannelEvent::TransitionExecuted {
                kind,
                template,
                params,
            } => encode(serde_json::to_value(TransitionPayload {
                kind: kind.as_wire().to_string(),
                template: *template,
                params: params.clone(),
            })),
            ChannelEvent::KommuneDataUpdated { kommune_id, data } => {
                encode(serde_json::to_value(KommuneDataPayload {
                    kommune_id: kommune_id.clone(),
                    data: data.clone(),
                }))
            }
            ChannelEvent::ValgstedDataUpdated {
                kommune_id,
                valgsted_id,
                data,
            } => encode(serde_json::to_value(ValgstedDataPayload {
                kommune_id: kommune_id.clone(),
                valgsted_id: valgsted_id.clone(),
                data: data.clone(),
            })),
            ChannelEvent::KandidatDataUpdated { kommune_id, data } => {
                encode(serde_json::to_value(KommuneDataPayload {
                    kommune_id: kommune_id.clone(),
                    data: data.clone(),
                }))
            }
        }
    }

    pub fn decode(name: &str, payload: Value) -> Result<Self, ProtocolError> {
        fn parse<T: serde::de::DeserializeOwned>(
            event: &str,
            payload: Value,
        ) -> Result<T, ProtocolError> {
            serde_json::from_value(payload).map_err(|source| ProtocolError::MalformedPayload {
                event: event.to_string(),
                source,
            })
        }

        match name {
            "client-kommune-changed" => {
                let p: KommunePayload = parse(name, payload)?;
                Ok(ChannelEvent::KommuneChanged {
                    kommune_id: p.kommune_id,
                })
            }
            "client-valgsted-changed" => {
                let p: ValgstedPayload = parse(name, payload)?;
                Ok(ChannelEvent::ValgstedChanged {
                    kommune_id: p.kommune_id,
                    valgsted_id: p.valgsted_id,
                })
            }
            "client-template-changed" => {
                let p: TemplatePayload = parse(name, payload)?;
                Ok(ChannelEvent::TemplateChanged {
                    template: p.template,
                })
            }
            "client-transition-executed" => {
                let p: TransitionPayload = parse(name, payload)?;
                Ok(ChannelEvent::TransitionExecuted {
                    kind: TransitionKind::from_wire(&p.kind),
                    template: p.template,
                    params: p.params,
                })
            }
            "client-kommune-data-updated" => {
                let p: KommuneDataPayload = parse(name, payload)?;
                Ok(ChannelEvent::KommuneDataUpdated {
                    kommune_id: p.kommune_id,
                    data: p.data,
                })
            }
            "client-valgsted-data-updated" => {
                let p: ValgstedDataPayload = parse(name, payload)?;
                Ok(ChannelEvent::ValgstedDataUpdated {
                    kommune_id: p.kommune_id,
                    valgsted_id: p.valgsted_id,
                    data: p.data,
                })
            }
            "client-kandidat-data-updated" => {
                let p: KommuneDataPayload = parse(name, payload)?;
                Ok(ChannelEvent::KandidatDataUpdated {
                    kommune_id: p.kommune_id,
                    data: p.data,
                })
            }
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// One-way messages crossing the render-surface embedding boundary. The
/// surface collaborator consumes these; it never sends anything back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SurfaceMessage {
    /// Data refresh without navigation. `no_animation` tells the embedded
    /// template to skip entry animations so the refresh is invisible.
    #[serde(rename = "opdaterData", rename_all = "camelCase")]
    RefreshData {
        payload: ElectionSnapshot,
        #[serde(default)]
        no_animation: bool,
    },
    /// Replace the template's display settings.
    #[serde(rename = "updateSettings")]
    ApplySettings { settings: Map<String, Value> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> ElectionSnapshot {
        ElectionSnapshot {
            last_updated: Some("2021-11-16T20:30:00Z".parse().expect("timestamp")),
            result: ResultSummary {
                election_progress: 42.0,
                votes_percentage: Some(67.3),
                votes_given: Some(12_345),
                eligible_voters: Some(20_000),
            },
            parties: vec![PartyResult {
                letter: "A".to_string(),
                name: "Socialdemokratiet".to_string(),
                votes_percentage: Some(31.2),
                votes_count: Some(3_852),
                seats: Some(9),
                color: Some("#e4002b".to_string()),
            }],
            extra: Map::new(),
        }
    }

    #[test]
    fn every_event_round_trips_through_the_wire() {
        let events = vec![
            ChannelEvent::KommuneChanged {
                kommune_id: KommuneId::from("860"),
            },
            ChannelEvent::ValgstedChanged {
                kommune_id: KommuneId::from("860"),
                valgsted_id: ValgstedId::from("86001"),
            },
            ChannelEvent::TemplateChanged {
                template: Template::Candidates,
            },
            ChannelEvent::TransitionExecuted {
                kind: TransitionKind::Cut,
                template: Template::Results,
                params: TransitionParams::new(Some(KommuneId::from("860")), None),
            },
            ChannelEvent::KommuneDataUpdated {
                kommune_id: KommuneId::from("851"),
                data: snapshot(),
            },
            ChannelEvent::ValgstedDataUpdated {
                kommune_id: KommuneId::from("851"),
                valgsted_id: ValgstedId::from("85111"),
                data: snapshot(),
            },
            ChannelEvent::KandidatDataUpdated {
                kommune_id: KommuneId::from("851"),
                data: snapshot(),
            },
        ];

        for event in events {
            let payload = event.to_payload().expect("encode");
            let decoded = ChannelEvent::decode(event.name(), payload).expect("decode");
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn payload_keys_are_camel_case() {
        let event = ChannelEvent::ValgstedChanged {
            kommune_id: KommuneId::from("860"),
            valgsted_id: ValgstedId::from("86001"),
        };
        let payload = event.to_payload().expect("encode");
        assert_eq!(
            payload,
            json!({ "kommuneId": "860", "valgstedId": "86001" })
        );
    }

    #[test]
    fn transition_payload_uses_type_key_and_collapses_legacy_kinds() {
        let event = ChannelEvent::TransitionExecuted {
            kind: TransitionKind::Dissolve,
            template: Template::Stations,
            params: TransitionParams::new(
                Some(KommuneId::from("860")),
                Some(ValgstedId::from("86001")),
            ),
        };
        let payload = event.to_payload().expect("encode");
        assert_eq!(payload["type"], "dissolve");
        assert_eq!(payload["template"], "stations");
        assert_eq!(payload["params"]["kommuneId"], "860");

        let legacy = json!({
            "type": "wipe",
            "template": "results",
            "params": {}
        });
        let decoded =
            ChannelEvent::decode("client-transition-executed", legacy).expect("decode");
        match decoded {
            ChannelEvent::TransitionExecuted { kind, .. } => {
                assert_eq!(kind, TransitionKind::Dissolve);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_names_are_rejected() {
        let err = ChannelEvent::decode("client-made-up", json!({})).expect_err("must fail");
        assert!(matches!(err, ProtocolError::UnknownEvent(name) if name == "client-made-up"));
    }

    #[test]
    fn snapshot_preserves_unknown_document_fields() {
        let raw = json!({
            "lastUpdated": "2021-11-16T20:30:00Z",
            "result": { "electionProgress": 95.0 },
            "parties": [],
            "mayor": { "name": "Birgit" }
        });
        let parsed: ElectionSnapshot = serde_json::from_value(raw).expect("parse");
        assert_eq!(parsed.result.election_progress, 95.0);
        assert_eq!(parsed.extra["mayor"]["name"], "Birgit");

        let back = serde_json::to_value(&parsed).expect("serialize");
        assert_eq!(back["mayor"]["name"], "Birgit");
    }

    #[test]
    fn surface_messages_use_the_embedded_action_vocabulary() {
        let refresh = SurfaceMessage::RefreshData {
            payload: ElectionSnapshot::default(),
            no_animation: true,
        };
        let value = serde_json::to_value(&refresh).expect("serialize");
        assert_eq!(value["action"], "opdaterData");
        assert_eq!(value["noAnimation"], true);

        let mut settings = Map::new();
        settings.insert("maxParties".to_string(), json!(10));
        let apply = SurfaceMessage::ApplySettings { settings };
        let value = serde_json::to_value(&apply).expect("serialize");
        assert_eq!(value["action"], "updateSettings");
        assert_eq!(value["settings"]["maxParties"], 10);
    }
}
