//! # Slate - Wayland Launcher
//!
//! Opens a keyboard-focused overlay on one output, reads keys until
//! Escape or Return, then exits.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use slate::config::{expand_home, parse_color, Length};
use slate::{AppConfig, PanelRenderer, QueryInput, Session, SessionOptions};

#[derive(Parser)]
#[command(name = "slate")]
#[command(about = "A keyboard-driven launcher for wlroots-based Wayland compositors")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/slate/config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Output to open on, overriding the config file
    #[arg(short, long)]
    output: Option<String>,

    /// Surface width in pixels or percent, e.g. 640 or 50%
    #[arg(long, value_parser = parse_length)]
    width: Option<Length>,

    /// Surface height in pixels or percent
    #[arg(long, value_parser = parse_length)]
    height: Option<Length>,
}

fn parse_length(s: &str) -> Result<Length, String> {
    Length::parse(s).map_err(|e| e.to_string())
}

fn load_config(path: &str) -> Result<AppConfig> {
    if !expand_home(path)?.exists() {
        info!("No configuration at {}, using defaults", path);
        return Ok(AppConfig::default());
    }
    match AppConfig::load(path) {
        Ok(config) => {
            info!("Configuration loaded from: {}", path);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            info!("Using default configuration");
            Ok(AppConfig::default())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("Starting slate {}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&cli.config)?;

    // Override config with CLI flags
    if let Some(output) = cli.output {
        config.output.name = output;
    }
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }
    config.validate().context("Invalid command line override")?;

    let options = SessionOptions {
        output: config.output.name.clone(),
        geometry: config.geometry_spec()?,
    };
    let mut renderer = PanelRenderer {
        background: parse_color(&config.colors.background)?,
        panel: parse_color(&config.colors.panel)?,
        use_scale: config.window.use_scale,
    };

    let mut session =
        Session::connect(Box::new(QueryInput::new())).context("Failed to connect to compositor")?;
    session
        .setup(&options)
        .context("Failed to create launcher surface")?;
    session.run(&mut renderer).context("Event loop failed")?;

    info!("Exiting");
    Ok(())
}
