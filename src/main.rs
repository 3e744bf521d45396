//! `recipe-api`: the recipe service binary.
//!
//! Usage:
//!   recipe-api [serve [--in-memory]]
//!   recipe-api wait-for-db
//!   recipe-api create-superuser --email <email> --password <password>

use std::{net::SocketAddr, sync::Arc};

use clap::{Parser, Subcommand};
use recipe_api::{
    api,
    config::Config,
    cryptography::generate_secret,
    jwt::TokenKeys,
    memory::MemoryStore,
    postgres::PgStore,
    state::State,
    store::Store,
    wait::wait_for_db,
    WAIT_FOR_DB_DELAY,
};

/// Recipe service.
#[derive(Parser, Debug)]
#[command(name = "recipe-api", about = "Recipe service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for the database, apply the schema and serve the API.
    Serve {
        /// Keep everything in process memory instead of Postgres.
        #[arg(long)]
        in_memory: bool,
    },
    /// Block until the database accepts connections.
    WaitForDb,
    /// Create an account with staff and superuser rights.
    CreateSuperuser {
        #[arg(long, env = "SUPERUSER_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgStore> {
    let store = PgStore::connect(&config.database_url, config.db_max_connections)?;
    wait_for_db(|| store.ping(), WAIT_FOR_DB_DELAY).await;
    Ok(store)
}

async fn serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = if in_memory {
        log::warn!("Using the in-memory store, data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let store = connect(&config).await?;
        store.migrate().await?;
        Arc::new(store)
    };

    let secret = match &config.jwt_secret {
        Some(secret) => secret.as_bytes().to_vec(),
        None => generate_secret(),
    };
    let keys = TokenKeys::new(&secret, config.token_lifetime_hours)?;

    let routes = api::routes(State::new(store, keys));
    let address = SocketAddr::new(config.host, config.port);

    let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(address, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {e}");
        }
    })?;
    log::info!("Server running on {bound}");

    server.await;
    log::info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory } => serve(config, in_memory).await?,
        Command::WaitForDb => {
            connect(&config).await?;
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let store = connect(&config).await?;
            store.migrate().await?;

            let user =
                recipe_api::actions::create_superuser(&store, &email, &password, name.as_deref())
                    .await?;
            log::info!("Created superuser {}", user.email);
        }
    }

    Ok(())
}
