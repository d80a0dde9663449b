use std::sync::Arc;

use augur::adapter::outbound::sqlite::database::connection::{
    create_pool, run_migrations, ConnectionOptions, DbPool,
};
use augur::adapter::outbound::sqlite::SqliteStore;
use augur::port::outbound::store::Store;
use tempfile::TempDir;

/// Migrated SQLite database in a temporary directory.
pub struct TempDb {
    _dir: TempDir,
    url: String,
    pool: DbPool,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = dir.path().join("augur.db").to_string_lossy().into_owned();
        let pool = create_pool(&url, 4, ConnectionOptions::default()).expect("create pool");
        run_migrations(&pool).expect("run migrations");
        Self {
            _dir: dir,
            url,
            pool,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::new(SqliteStore::new(self.pool.clone()))
    }
}
