use std::sync::Arc;
use crate::{
    config::Config,
    database::BlogDatabase,
    infrastructure::middleware::IdentityProvider,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<BlogDatabase>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Initialize database
        let database = BlogDatabase::new(&config.database).await?;
        database.init().await?;

        Ok(Self::from_database(Arc::new(database), config))
    }

    /// State over an already-initialised database. Tokens are resolved
    /// against the same database's `users` table.
    pub fn from_database(db: Arc<BlogDatabase>, config: Config) -> Self {
        let identity: Arc<dyn IdentityProvider> = db.clone();
        Self { db, identity, config }
    }
}
