use anyhow::Result;
use clap::{Parser, ValueEnum};

mod config;
mod control;
mod display;

#[derive(Parser, Debug)]
#[command(
    name = "broadcast",
    about = "KV broadcast: operator control panel and on-air display runner"
)]
struct Args {
    /// Process role: the operator control panel or the on-air display.
    #[arg(long, value_enum, default_value = "control")]
    role: Role,
    /// Configuration file path.
    #[arg(long, default_value = "broadcast.toml")]
    config: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Control,
    Display,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let settings = config::load_settings(&args.config);

    match args.role {
        Role::Control => control::run(settings).await,
        Role::Display => display::run(settings).await,
    }
}
