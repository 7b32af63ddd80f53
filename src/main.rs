// Blog API Server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blog_api::{app_state::AppState, config::Config, create_blog_router, data_seeder::seed_demo_data};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blog_api=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    if config.seed.demo_data {
        seed_demo_data(&app_state.db).await?;
    }

    let app = create_blog_router(app_state);

    // Start server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Blog API listening on http://{}", addr);
    info!("  GET  /api/                 - API overview");
    info!("  GET  /api/stats/           - Blog statistics");
    info!("  GET  /api/posts/           - Posts (filter, search, ordering)");
    info!("  GET  /api/profile/me/      - Own profile");

    axum::serve(listener, app).await?;

    Ok(())
}
