mod ai;
mod api;
mod app;
mod cli;
mod config;
mod db;
mod ui;

use crate::ai::SnippetGenerator;
use crate::ai::transport::{CompletionTransport, HttpTransport};
use crate::app::grid::{render_output, render_records};
use crate::app::{AppController, UiEvent};
use crate::cli::onboard::run_onboarding;
use crate::cli::{AiCommands, Cli, Commands, ConfigCommands};
use crate::config::{Config, ConfigFileCheck, parse_base_url};
use crate::db::SnippetStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The terminal window shares stdout with the log, so keep it quiet there.
    let default_level = match cli.command {
        None | Some(Commands::Window) | Some(Commands::Onboard) => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        None | Some(Commands::Window) => handle_window(),
        Some(Commands::Dashboard { port }) => handle_dashboard(port).await,
        Some(Commands::Generate { task }) => handle_generate(task),
        Some(Commands::History { json }) => handle_history(json),
        Some(Commands::Onboard) => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Some(Commands::Config { command }) => handle_config_command(command),
        Some(Commands::Status) => handle_status(),
        Some(Commands::Doctor) => handle_doctor(),
        Some(Commands::Ai { command }) => handle_ai_command(command),
    }
}

fn handle_window() -> Result<()> {
    let config = load_or_default_config()?;
    let mut controller = build_controller(&config)?;

    ui::run_window(&mut controller)
}

async fn handle_dashboard(port: Option<u16>) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;
    let settings = ai::GeneratorSettings::from_config(&config);
    let transport: Box<dyn CompletionTransport> = Box::new(HttpTransport::new(
        &settings.base_url,
        settings.timeout_seconds,
    ));
    let generator = SnippetGenerator::new(settings, transport);
    let api_key_configured = generator.has_api_key();

    let state = api::routes::ApiState {
        controller: Arc::new(Mutex::new(AppController::new(generator, store.clone()))),
        store,
        model: Arc::from(config.ai_model.as_str()),
        api_key_configured,
    };

    let port = port.unwrap_or(config.dashboard_port);
    let url = format!("http://127.0.0.1:{port}");
    println!("Dashboard URL: {url}");
    open_in_browser(&url);

    tokio::select! {
        server_result = api::run_server(state, port) => {
            server_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn handle_generate(task: String) -> Result<()> {
    let config = load_or_default_config()?;
    let mut controller = build_controller(&config)?;

    let state = controller.dispatch(UiEvent::generate(task))?;
    println!("{}", render_output(&state.output));

    Ok(())
}

fn handle_history(json: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    let records = store.list_all()?;

    if json {
        let content =
            serde_json::to_string_pretty(&records).context("Failed to serialize snippets")?;
        println!("{content}");
    } else {
        println!("{}", render_records(&records, 120));
    }

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            let masked = if key.contains("api_key") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let store = open_store(&config)?;

    println!("CodeSnip status");
    println!("- db_path: {}", config.db_path.display());
    println!("- model: {}", config.ai_model);
    println!(
        "- api_key: {}",
        if config.resolve_api_key().is_some() {
            "configured"
        } else {
            "missing"
        }
    );
    println!("- stored_snippets: {}", store.count()?);
    println!(
        "- last_generated_at: {}",
        store
            .latest()?
            .map(|record| record.timestamp)
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path();
    let mut issues = Vec::new();

    let (config, check) = Config::inspect(&config_path);
    match check {
        ConfigFileCheck::Found => println!("[OK] config.json found: {}", config_path.display()),
        ConfigFileCheck::Missing => {
            println!("[WARN] config.json not found: {}", config_path.display());
            issues.push("config missing");
        }
        ConfigFileCheck::Unreadable(error) => {
            println!("[WARN] config.json unreadable: {error:#}");
            println!("       checks below use default settings");
            issues.push("config unreadable");
        }
    }

    match SnippetStore::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error:#}");
            issues.push("db unreachable");
        }
    }

    if config.resolve_api_key().is_some() {
        println!("[OK] AI API key is configured");
    } else {
        println!("[WARN] AI API key is missing (OPENAI_API_KEY, .env, or ai.api_key)");
        issues.push("ai api key missing");
    }

    match parse_base_url(&config.ai_api_base_url) {
        Ok(url) => println!("[OK] AI base URL valid: {url}"),
        Err(error) => {
            println!("[WARN] invalid AI base URL: {error:#}");
            issues.push("invalid base url");
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_ai_command(command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Test {
            key,
            base_url,
            model,
        } => {
            let mut config = load_or_default_config()?;

            if let Some(value) = base_url {
                config.set_value("ai_api_base_url", &value)?;
            }
            if let Some(value) = model {
                config.set_value("ai_model", &value)?;
            }

            let mut settings = ai::GeneratorSettings::from_config(&config);
            if let Some(value) = key.filter(|value| !value.trim().is_empty()) {
                settings.api_key = Some(value.trim().to_string());
            }
            let transport = HttpTransport::new(&settings.base_url, settings.timeout_seconds);

            let response = SnippetGenerator::new(settings, transport).test_connection()?;
            println!("AI API connection successful");
            println!("{response}");

            Ok(())
        }
    }
}

fn build_controller(
    config: &Config,
) -> Result<AppController<SnippetGenerator<HttpTransport>, SnippetStore>> {
    let store = open_store(config)?;
    let generator = SnippetGenerator::from_config(config);

    Ok(AppController::new(generator, store))
}

fn open_store(config: &Config) -> Result<SnippetStore> {
    SnippetStore::open(&config.db_path).with_context(|| {
        format!(
            "Failed to initialize snippet database: {}",
            config.db_path.display()
        )
    })
}

fn load_or_default_config() -> Result<Config> {
    if Config::config_path().exists() {
        return Config::load();
    }

    let config = Config::default();
    config.ensure_bootstrap_files()?;
    config.save()?;
    Ok(config)
}

#[cfg(target_os = "macos")]
fn open_in_browser(url: &str) {
    if let Err(error) = std::process::Command::new("open").arg(url).status() {
        tracing::warn!(error = %error, "failed to open browser");
    }
}

#[cfg(not(target_os = "macos"))]
fn open_in_browser(_url: &str) {}
