use hiring_pipeline::{
    build_router,
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = get_config()?;

    let pool = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("database migrations applied");
            Some(pool)
        }
        None => None,
    };

    let app_state = AppState::from_config(config, pool).await?;
    let app = build_router(app_state, config.public_rps, config.cors_origin.as_deref());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
