use protogame_js::config::{AppConfig, LogConfig};
use protogame_js::core::{shared, App, AppResult, DevConsole};
use protogame_js::logging::init_logging;

fn run() -> AppResult<()> {
    let (mut config, source) = AppConfig::load_or_default();
    config.apply_env_overrides();

    let (log_config, log_fallback) = LogConfig::load_or_default(&config.log_config_path);
    let console = shared(DevConsole::new(log_config.max_log_entries));
    init_logging(&log_config, Some(console.clone()))?;
    tracing::info!(target: "app", source = %source, "configuration loaded");
    if let Some(reason) = log_fallback {
        tracing::warn!(target: "app", "using default log configuration: {}", reason);
    }

    let mut app = App::new(config, console)?;
    app.startup()?;
    app.run_main_loop();
    app.shutdown();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ProtogameJS failed: {}", e);
        std::process::exit(1);
    }
}
