use crate::config::{Config, expand_home, parse_base_url};
use crate::db::SnippetStore;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to CodeSnip onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let mut config = Config::load().unwrap_or_default();

    println!("\n[1/4] OpenAI API key");
    if config.resolve_api_key().is_some() {
        println!("  An API key is already configured.");
    }

    let replace_key = config.resolve_api_key().is_none()
        || Confirm::with_theme(&theme)
            .with_prompt("  Store a new API key in config.json?")
            .default(false)
            .interact()
            .context("Failed to read API key confirmation")?;

    if replace_key {
        let api_key = Password::with_theme(&theme)
            .with_prompt("  API key (leave empty to use OPENAI_API_KEY)")
            .allow_empty_password(true)
            .interact()
            .context("Failed to read API key")?;
        config.set_value("ai_api_key", &api_key)?;
        println!("  ✓ API key saved");
    }

    println!("\n[2/4] Model endpoint");
    let base_url: String = Input::with_theme(&theme)
        .with_prompt("  API base URL")
        .default(config.ai_api_base_url.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_base_url(input)
                .map(|_| ())
                .map_err(|_| "Use an http(s) URL (example: https://api.openai.com/v1)")
        })
        .interact_text()
        .context("Failed to read base URL")?;
    config.set_value("ai_api_base_url", &base_url)?;

    let model: String = Input::with_theme(&theme)
        .with_prompt("  Model")
        .default(config.ai_model.clone())
        .interact_text()
        .context("Failed to read model")?;
    config.set_value("ai_model", &model)?;
    println!("  ✓ {} @ {}", config.ai_model, config.ai_api_base_url);

    println!("\n[3/4] Snippet language");
    let language: String = Input::with_theme(&theme)
        .with_prompt("  Language to generate")
        .default(config.language.clone())
        .interact_text()
        .context("Failed to read language")?;
    config.set_value("language", &language)?;
    println!("  ✓ Snippets will be written in {}", config.language);

    println!("\n[4/4] Snippet database");
    let db_input: String = Input::with_theme(&theme)
        .with_prompt("  SQLite file for stored snippets")
        .default(config.db_path.display().to_string())
        .interact_text()
        .context("Failed to read database path")?;
    config.db_path = expand_home(&db_input);

    config.ensure_bootstrap_files()?;
    config.save()?;
    SnippetStore::open(&config.db_path)?;
    println!("  ✓ {}", config.db_path.display());

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run CodeSnip to open the window.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
