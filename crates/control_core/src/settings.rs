//! File-backed settings store for the visual templates.
//!
//! Each template is described by the flat set of options it recognizes and
//! their defaults; stored values merge over the defaults, unrecognized keys
//! are dropped. The store itself is a low-stakes JSON document keyed by
//! template name.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{json, Map, Value};
use shared::{domain::Template, protocol::SurfaceMessage};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode settings store: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Settings-backed view descriptor: the options each template recognizes and
/// their defaults. One descriptor per template value — there is no
/// per-template subclass.
pub fn view_defaults(template: Template) -> Map<String, Value> {
    let mut defaults = Map::new();
    match template {
        Template::Results => {
            defaults.insert("showPartyColors".to_string(), json!(true));
            defaults.insert("maxParties".to_string(), json!(10));
            defaults.insert("sortBy".to_string(), json!("votes"));
        }
        Template::Candidates => {
            defaults.insert("showPhotos".to_string(), json!(false));
            defaults.insert("maxCandidates".to_string(), json!(8));
            defaults.insert("highlightMayor".to_string(), json!(true));
        }
        Template::Stations => {
            defaults.insert("showTurnout".to_string(), json!(true));
            defaults.insert("compareWithKommune".to_string(), json!(false));
        }
    }
    defaults
}

pub struct TemplateSettings {
    path: PathBuf,
    store: BTreeMap<String, Map<String, Value>>,
}

impl TemplateSettings {
    /// Load the store from disk. A missing file yields an empty store; a
    /// corrupt one is reported and replaced on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(store) => store,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        %error,
                        "settings file unreadable; starting from defaults"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, store }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Effective settings for a template: defaults with stored values merged
    /// on top. Keys the template does not recognize are ignored.
    pub fn effective(&self, template: Template) -> Map<String, Value> {
        let mut merged = view_defaults(template);
        if let Some(stored) = self.store.get(template.as_str()) {
            for (key, value) in stored {
                if merged.contains_key(key) {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    pub fn update(
        &mut self,
        template: Template,
        key: &str,
        value: Value,
    ) -> Result<(), SettingsError> {
        self.store
            .entry(template.as_str().to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save()?;
        info!(template = %template, key, "template setting updated");
        Ok(())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let raw = serde_json::to_string_pretty(&self.store)?;
        fs::write(&self.path, raw).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Message pushing the effective settings to a preview surface.
    pub fn surface_message(&self, template: Template) -> SurfaceMessage {
        SurfaceMessage::ApplySettings {
            settings: self.effective(template),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_settings_path() -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("kv_broadcast_settings_{unique}.json"))
    }

    #[test]
    fn defaults_apply_when_nothing_is_stored() {
        let settings = TemplateSettings::load(temp_settings_path());
        let effective = settings.effective(Template::Results);
        assert_eq!(effective["maxParties"], 10);
        assert_eq!(effective["showPartyColors"], true);
    }

    #[test]
    fn stored_values_merge_over_defaults_and_survive_reload() {
        let path = temp_settings_path();
        {
            let mut settings = TemplateSettings::load(&path);
            settings
                .update(Template::Results, "maxParties", json!(5))
                .expect("update");
        }

        let reloaded = TemplateSettings::load(&path);
        let effective = reloaded.effective(Template::Results);
        assert_eq!(effective["maxParties"], 5);
        // Untouched defaults stay in place.
        assert_eq!(effective["sortBy"], "votes");

        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn unrecognized_keys_are_dropped_from_the_effective_view() {
        let path = temp_settings_path();
        let mut settings = TemplateSettings::load(&path);
        settings
            .update(Template::Stations, "bogusOption", json!("x"))
            .expect("update");

        let effective = settings.effective(Template::Stations);
        assert!(!effective.contains_key("bogusOption"));
        assert_eq!(effective["showTurnout"], true);

        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn corrupt_store_files_fall_back_to_defaults() {
        let path = temp_settings_path();
        fs::write(&path, "not json at all").expect("write");

        let settings = TemplateSettings::load(&path);
        let effective = settings.effective(Template::Candidates);
        assert_eq!(effective["maxCandidates"], 8);

        fs::remove_file(&path).expect("cleanup");
    }

    #[test]
    fn surface_message_carries_the_effective_settings() {
        let settings = TemplateSettings::load(temp_settings_path());
        match settings.surface_message(Template::Candidates) {
            SurfaceMessage::ApplySettings { settings } => {
                assert_eq!(settings["highlightMayor"], true);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
