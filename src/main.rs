use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod auth;
mod bot;
mod config;
mod dashboard;
mod db;
mod error;
mod intake;
mod web;

use config::AppConfig;
use dashboard::DashboardService;
use db::Database;
use intake::registry::IntakeRegistry;
use intake::service::IntakeService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🚪 Starting Door Openbot...");

    // Load config
    let config = AppConfig::from_env()?;
    match config.intake_idle_timeout {
        Some(t) => tracing::info!("Config loaded. Intake idle timeout: {}s", t.as_secs()),
        None => tracing::info!("Config loaded. Intake idle timeout disabled"),
    }

    // Initialize database
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    auth::seed_users(&db, &config.seed_users).await?;
    tracing::info!("Database connected and migrations applied.");

    // Web dashboard
    let web_state = web::WebState {
        service: DashboardService::new(db.clone()),
        templates: Arc::new(web::templates::Templates::new()?),
    };
    let app = web::router(web_state, config.session_secure_cookie);

    // Telegram intake bot
    let state = Arc::new(bot::AppState {
        intake: IntakeService::new(db, IntakeRegistry::new(config.intake_idle_timeout)),
    });
    if state.intake.registry().idle_timeout().is_some() {
        bot::spawn_intake_sweeper(state.clone());
    }

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = bot::build_handler();

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    // Both front ends stop on Ctrl-C; a failing web server ends the process.
    let web_addr = config.web_addr();
    tokio::try_join!(web::serve(&web_addr, app), async {
        dispatcher.dispatch().await;
        Ok::<(), anyhow::Error>(())
    })?;

    tracing::info!("🛑 Door Openbot stopped");
    Ok(())
}
