//! Pluck Scope - A polyphonic pluck synthesizer with a live waveform scope
//!
//! Entry point for the application.

use eframe::egui;
use pluck_scope::app::SynthApp;
use pluck_scope::config::SynthConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable that may hold a JSON settings document.
const CONFIG_ENV: &str = "PLUCK_SCOPE_CONFIG";

fn load_config() -> SynthConfig {
    let Ok(json) = std::env::var(CONFIG_ENV) else {
        return SynthConfig::default();
    };
    match SynthConfig::from_json_str(&json) {
        Ok(config) => {
            info!(var = CONFIG_ENV, "using config from environment");
            config
        }
        Err(e) => {
            warn!(error = %e, "invalid config, using defaults");
            SynthConfig::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 640.0])
            .with_title("Pluck Scope"),
        ..Default::default()
    };

    eframe::run_native(
        "Pluck Scope",
        options,
        Box::new(|_cc| Ok(Box::new(SynthApp::new(config)?))),
    )
}
