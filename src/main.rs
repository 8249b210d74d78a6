use dotenvy::dotenv;
use snafu::ResultExt as _;

use tacho::api;
use tacho::config::Config;
use tacho::database::Database;
use tacho::error::{BindAddressSnafu, ConnectDatabaseSnafu, InitError, WebServerSnafu};
use tacho::logger;

#[tokio::main]
async fn main() -> Result<(), InitError> {
    dotenv().ok();

    let config = Config::from_env()?;
    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;

    let app = api::create_app(database, config.authenticator());
    let router = api::create_router(app);

    let listener = tokio::net::TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu {
            address: config.host,
        })?;

    tracing::info!("listening on {}", config.host);

    axum::serve(listener, router).await.context(WebServerSnafu)?;

    Ok(())
}
