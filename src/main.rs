mod app;
mod config;
mod console;
mod error;
mod messages;
mod permission;
mod probe;
mod services;
mod settings;
mod view;

use app::App;
use config::Config;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("Starting vidrec recording controller");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    let app = App::new(config);
    app.run().await?;

    tracing::info!("vidrec shutdown complete");
    Ok(())
}
