use anyhow::Result;
use clap::Parser;
use lyra_core::Config;
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser, Debug)]
#[command(name = "lyra-os")]
#[command(version, about = "Terminal desktop for chatting with Lyra OS apps")]
struct Cli {
    /// Backend base URL (defaults to http://localhost:8000)
    #[arg(long, value_name = "URL")]
    api_base_url: Option<String>,
    /// IANA timezone for clocks, e.g. America/New_York (empty for local time)
    #[arg(long, value_name = "ZONE")]
    timezone: Option<String>,
    /// Log filter directive, e.g. debug or lyra_core=trace
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

impl Cli {
    /// Flags win over the environment and the config file
    fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.api_base_url {
            config.api_base_url = Some(url.clone());
        }
        if let Some(zone) = &self.timezone {
            config.timezone = Some(zone.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_level.as_deref())?;

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    let config = cli.apply(config.with_env_overrides());

    let mut app = App::new(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!(event_type = "app_lifecycle", action = "stopped", "Lyra OS exited");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();
    app.start_loading();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
    }

    Ok(())
}
