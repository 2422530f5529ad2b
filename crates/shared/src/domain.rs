use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(KommuneId);
id_newtype!(ValgstedId);

/// The three visual templates the broadcast can put on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    Results,
    Candidates,
    Stations,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Results => "results",
            Template::Candidates => "candidates",
            Template::Stations => "stations",
        }
    }

    /// Whether a data kind feeds this template while it is on air.
    pub fn consumes(&self, kind: DataKind) -> bool {
        match self {
            Template::Results => matches!(kind, DataKind::KommuneResults),
            Template::Candidates => {
                matches!(kind, DataKind::KommuneResults | DataKind::KandidatStatus)
            }
            Template::Stations => matches!(kind, DataKind::ValgstedResults),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kinds of payload the election API serves and the channel relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    KommuneResults,
    ValgstedResults,
    KandidatStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Cut,
    Dissolve,
}

impl TransitionKind {
    /// The wire still carries legacy values like `push` and `wipe`; every
    /// kind that is not an exact `cut` runs as a dissolve.
    pub fn from_wire(value: &str) -> Self {
        if value == "cut" {
            TransitionKind::Cut
        } else {
            TransitionKind::Dissolve
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            TransitionKind::Cut => "cut",
            TransitionKind::Dissolve => "dissolve",
        }
    }
}

/// Selection snapshot captured at the moment of a transition. Frozen until
/// the next transition, independent of later selection changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kommune_id: Option<KommuneId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valgsted_id: Option<ValgstedId>,
}

impl TransitionParams {
    pub fn new(kommune_id: Option<KommuneId>, valgsted_id: Option<ValgstedId>) -> Self {
        Self {
            kommune_id,
            valgsted_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_cut_wire_kinds_collapse_to_dissolve() {
        assert_eq!(TransitionKind::from_wire("cut"), TransitionKind::Cut);
        assert_eq!(
            TransitionKind::from_wire("dissolve"),
            TransitionKind::Dissolve
        );
        assert_eq!(TransitionKind::from_wire("push"), TransitionKind::Dissolve);
        assert_eq!(TransitionKind::from_wire("wipe"), TransitionKind::Dissolve);
        assert_eq!(TransitionKind::from_wire(""), TransitionKind::Dissolve);
    }

    #[test]
    fn template_data_dependencies() {
        assert!(Template::Results.consumes(DataKind::KommuneResults));
        assert!(!Template::Results.consumes(DataKind::ValgstedResults));
        assert!(Template::Candidates.consumes(DataKind::KommuneResults));
        assert!(Template::Candidates.consumes(DataKind::KandidatStatus));
        assert!(!Template::Candidates.consumes(DataKind::ValgstedResults));
        assert!(Template::Stations.consumes(DataKind::ValgstedResults));
        assert!(!Template::Stations.consumes(DataKind::KandidatStatus));
    }

    #[test]
    fn transition_params_serialize_camel_case() {
        let params = TransitionParams::new(Some(KommuneId::from("860")), None);
        let value = serde_json::to_value(&params).expect("serialize");
        assert_eq!(value, serde_json::json!({ "kommuneId": "860" }));
    }
}
