use std::fs;

use serde::Deserialize;

/// Runtime settings: defaults, overridden by `broadcast.toml`, overridden by
/// `KV_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_key: String,
    pub cluster: String,
    pub auth_endpoint: String,
    pub channel: String,
    pub api_base_url: String,
    pub auto_update_secs: u64,
    pub settings_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_key: "cd56da67c28807fe3818".into(),
            cluster: "eu".into(),
            auth_endpoint: "https://reliable-cuchufli-e643b7.netlify.app/.netlify/functions/auth"
                .into(),
            channel: "private-kv-broadcast-channel".into(),
            api_base_url: "https://election-api.services.tv2.dk/kv/kv21".into(),
            auto_update_secs: 30,
            settings_path: "template-settings.json".into(),
        }
    }
}

pub fn load_settings(config_path: &str) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<Settings>(&raw) {
            Ok(file_settings) => settings = file_settings,
            Err(error) => {
                eprintln!("ignoring unreadable config file {config_path}: {error}");
            }
        }
    }

    if let Ok(v) = std::env::var("KV_APP_KEY") {
        settings.app_key = v;
    }
    if let Ok(v) = std::env::var("KV_CLUSTER") {
        settings.cluster = v;
    }
    if let Ok(v) = std::env::var("KV_AUTH_ENDPOINT") {
        settings.auth_endpoint = v;
    }
    if let Ok(v) = std::env::var("KV_CHANNEL") {
        settings.channel = v;
    }
    if let Ok(v) = std::env::var("KV_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("KV_AUTO_UPDATE_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.auto_update_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("KV_SETTINGS_PATH") {
        settings.settings_path = v;
    }

    settings
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn defaults_cover_every_setting() {
        let settings = load_settings("does-not-exist.toml");
        assert_eq!(settings.cluster, "eu");
        assert_eq!(settings.channel, "private-kv-broadcast-channel");
        assert_eq!(settings.auto_update_secs, 30);
    }

    #[test]
    fn config_file_overrides_defaults_and_keeps_the_rest() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("broadcast_config_{unique}.toml"));
        fs::write(
            &path,
            r#"
channel = "private-kv-test-channel"
auto_update_secs = 10
"#,
        )
        .expect("write config");

        let settings = load_settings(path.to_str().expect("path"));
        assert_eq!(settings.channel, "private-kv-test-channel");
        assert_eq!(settings.auto_update_secs, 10);
        // Untouched values fall back to defaults.
        assert_eq!(settings.cluster, "eu");

        fs::remove_file(path).expect("cleanup");
    }
}
