use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use travelprep::{
    catalog::Catalog,
    handlers::{self, AppState},
    notify::StoreNotifier,
    packing::PackingList,
    reminder::ReminderScheduler,
    store,
};

#[derive(Parser, Debug)]
#[command(name = "travelprep", about = "Travel preparation assistant")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// SQLite database path
    #[arg(long, env = "TRAVELPREP_DB", default_value = "travelprep.db")]
    db: String,

    /// Countries JSON URL; saved as the data source when given
    #[arg(long, env = "TRAVELPREP_DATA_URL")]
    data_url: Option<String>,

    /// Skip fetching the country catalog at startup
    #[arg(long, default_value_t = false)]
    no_startup_refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("travelprep=info".parse()?))
        .init();

    let cli = Cli::parse();

    let conn = store::open(&cli.db)?;
    info!("Opened database {}", cli.db);

    let catalog = Arc::new(Catalog::load(conn.clone(), reqwest::Client::new()));
    if let Some(url) = &cli.data_url {
        catalog.set_data_source_url(url)?;
    }
    let packing = Arc::new(PackingList::load(conn.clone())?);
    let notifier = Arc::new(StoreNotifier::new(conn.clone()));
    let reminder = Arc::new(ReminderScheduler::load(conn.clone(), notifier)?);

    if !cli.no_startup_refresh {
        let catalog = catalog.clone();
        tokio::spawn(async move {
            let outcome = catalog.refresh().await;
            info!("Startup countries refresh: {:?}", outcome);
        });
    }

    let state = Arc::new(AppState {
        conn,
        catalog,
        packing,
        reminder,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("TravelPrep listening on http://localhost:{}", cli.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::error!("failed to install CTRL+C signal handler");
                std::future::pending::<()>().await;
            }
            info!("Shutting down TravelPrep...");
        })
        .await?;

    Ok(())
}
