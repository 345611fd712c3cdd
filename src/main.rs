//! Giant - a desktop client for running SQL against BigQuery.

use std::sync::Arc;

use giant::auth::{self, TokenStore};
use giant::cli::{Cli, LaunchTarget};
use giant::config::Config;
use giant::error::Result;
use giant::shell::{OpenTarget, Shell};
use giant::warehouse::{
    BigQueryClient, BigQueryFactory, MockWarehouseClient, MockWarehouseFactory, WarehouseClient,
    WarehouseFactory,
};
use giant::{logging, server, tui};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.serve {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.serve {
        let warehouse: Arc<dyn WarehouseFactory> = if cli.mock {
            Arc::new(MockWarehouseFactory::new(Arc::new(MockWarehouseClient::new())))
        } else {
            Arc::new(BigQueryFactory::new(config.warehouse.clone()))
        };
        return server::serve(&config, warehouse).await;
    }

    let initial = cli.launch_target()?.map(|target| match target {
        LaunchTarget::ProjectId(id) => OpenTarget::ProjectId(id),
        LaunchTarget::ProjectFile(path) => OpenTarget::File(path),
    });

    let client: Arc<dyn WarehouseClient> = if cli.mock {
        info!("Using mock warehouse");
        Arc::new(MockWarehouseClient::new())
    } else {
        let store = Arc::new(TokenStore::new());
        let tokens = auth::resolve_token_provider(&config.oauth, store).await?;
        Arc::new(BigQueryClient::with_provider(
            reqwest::Client::new(),
            tokens,
            config.warehouse.clone(),
        ))
    };

    let (tx, rx) = tui::channel();
    let dialogs = Arc::new(tui::TuiDialogs::new(tx.clone()));
    let (shell, actor) = Shell::spawn(client, dialogs, config.project.clone());
    tokio::spawn(actor.run());

    tui::run(shell, tx, rx, initial).await
}

/// Loads configuration with precedence CLI, then config file, then environment.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_defaults();

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}
