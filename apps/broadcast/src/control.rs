use std::{sync::Arc, time::Duration};

use anyhow::Result;
use control_core::{
    auto_update::AutoUpdater,
    settings::TemplateSettings,
    ControlEvent, ControlPanel,
};
use election_api::{registry, ElectionApiClient};
use pusher_integration::{ChannelClient, PusherConnector, RelayCredentials};
use serde_json::Value;
use shared::domain::{KommuneId, Template, TransitionKind, ValgstedId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::Settings;

const HELP: &str = "\
commands:
  kommune <id>          select municipality
  valgsted <id>         select polling station
  stations              list stations for the active municipality
  template <name>       stage results|candidates|stations for preview
  cut                   take preview to program (hard cut)
  dissolve              take preview to program (cross-fade)
  refresh               fetch data for the staged template
  auto on|off           toggle the auto-update loop
  interval <secs>       change the auto-update cadence
  set <tpl> <key> <val> store a template setting (val is JSON)
  status                show selection and on-air state
  quit                  exit";

pub async fn run(settings: Settings) -> Result<()> {
    let connector = PusherConnector::new();
    let credentials = RelayCredentials {
        app_key: settings.app_key.clone(),
        cluster: settings.cluster.clone(),
        auth_endpoint: settings.auth_endpoint.clone(),
        channel: settings.channel.clone(),
    };
    let channel = ChannelClient::connect(&connector, &credentials).await?;
    let data = Arc::new(ElectionApiClient::new(settings.api_base_url.clone()));
    let panel = ControlPanel::new(data, channel);

    let updater = AutoUpdater::new(Arc::clone(&panel));
    updater
        .set_interval(Duration::from_secs(settings.auto_update_secs))
        .await;
    updater.enable().await;

    let mut template_settings = TemplateSettings::load(&settings.settings_path);

    spawn_event_printer(&panel);

    info!("control panel ready; type 'help' for commands");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            ["help"] => println!("{HELP}"),
            ["kommune", id] => panel.select_kommune(KommuneId::from(*id)).await,
            ["valgsted", id] => {
                panel.select_valgsted(ValgstedId::from(*id)).await;
            }
            ["stations"] => {
                match panel.snapshot().await.active_kommune {
                    Some(kommune) => {
                        for station in registry::valgsteder_for(&kommune) {
                            println!("  {}  {}", station.id, station.navn);
                        }
                    }
                    None => warn!("no municipality selected"),
                }
            }
            ["template", name] => match parse_template(name) {
                Some(template) => panel.set_preview_template(template).await,
                None => warn!(template = %name, "unknown template"),
            },
            ["cut"] => {
                panel.execute_transition(TransitionKind::Cut).await;
            }
            ["dissolve"] => {
                panel.execute_transition(TransitionKind::Dissolve).await;
            }
            ["refresh"] => panel.refresh_active_data().await,
            ["auto", "on"] => updater.enable().await,
            ["auto", "off"] => updater.disable().await,
            ["interval", secs] => match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    updater.set_interval(Duration::from_secs(secs)).await;
                }
                _ => warn!(secs = %secs, "interval must be a positive number of seconds"),
            },
            ["set", template, key, value @ ..] => {
                let Some(template) = parse_template(template) else {
                    warn!(template = %template, "unknown template");
                    continue;
                };
                let raw = value.join(" ");
                let value: Value =
                    serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw));
                if let Err(error) = template_settings.update(template, key, value) {
                    warn!(%error, "failed to store template setting");
                }
            }
            ["status"] => {
                let state = panel.snapshot().await;
                println!(
                    "kommune: {}  valgsted: {}",
                    state
                        .active_kommune
                        .as_ref()
                        .map(|k| k.as_str())
                        .unwrap_or("-"),
                    state
                        .active_valgsted
                        .as_ref()
                        .map(|v| v.as_str())
                        .unwrap_or("-"),
                );
                println!(
                    "preview: {}  program: {}  on air: {}",
                    state
                        .preview_template
                        .map(|t| t.as_str())
                        .unwrap_or("-"),
                    state.live_template.map(|t| t.as_str()).unwrap_or("-"),
                    if state.on_air { "yes" } else { "no" },
                );
            }
            ["quit"] | ["exit"] => break,
            _ => warn!(line = %line.trim(), "unknown command; try 'help'"),
        }
    }

    updater.disable().await;
    Ok(())
}

fn parse_template(name: &str) -> Option<Template> {
    match name {
        "results" => Some(Template::Results),
        "candidates" => Some(Template::Candidates),
        "stations" => Some(Template::Stations),
        _ => None,
    }
}

fn spawn_event_printer(panel: &Arc<ControlPanel>) {
    let mut events = panel.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ControlEvent::KommuneChanged { kommune_id } => {
                    info!(%kommune_id, "-> municipality selected");
                }
                ControlEvent::ValgstedChanged { valgsted_id, .. } => {
                    info!(%valgsted_id, "-> polling station selected");
                }
                ControlEvent::TemplateChanged { template } => {
                    info!(%template, "-> preview staged");
                }
                ControlEvent::TransitionExecuted { kind, template, .. } => {
                    info!(kind = kind.as_wire(), %template, "-> ON AIR");
                }
                ControlEvent::DataUpdated { kind, kommune_id, .. } => {
                    info!(?kind, %kommune_id, "-> data updated");
                }
                ControlEvent::FetchFailed { kind, reason } => {
                    warn!(?kind, %reason, "-> fetch failed");
                }
            }
        }
    });
}
