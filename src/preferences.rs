use std::time::Duration;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::{debug, warn};

/// Key of the dark-mode flag.
pub const DARK_MODE_KEY: &str = "darkMode";

/// Durable display preference. Reads fall back to `false` and writes are
/// best-effort; storage trouble is logged and never reaches the caller.
pub struct PreferenceStore {
    pool: SqlitePool,
}

impl PreferenceStore {
    /// Creates the store without touching the database yet, so an
    /// unavailable file only shows up as logged failures later on.
    pub fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_flag(&self, key: &str) -> anyhow::Result<Option<bool>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|(value,)| value.parse::<bool>().ok()))
    }

    pub async fn set_flag(&self, key: &str, value: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The saved dark-mode flag, `false` when unset or unreadable.
    pub async fn load(&self) -> bool {
        if let Err(e) = self.initialize().await {
            warn!("Preference storage unavailable: {}", e);
            return false;
        }

        match self.get_flag(DARK_MODE_KEY).await {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                warn!("Failed to read preference '{}': {}", DARK_MODE_KEY, e);
                false
            }
        }
    }

    pub async fn save(&self, value: bool) {
        let result = match self.initialize().await {
            Ok(()) => self.set_flag(DARK_MODE_KEY, value).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => debug!("Saved preference '{}' = {}", DARK_MODE_KEY, value),
            Err(e) => warn!("Failed to save preference '{}': {}", DARK_MODE_KEY, e),
        }
    }

    /// Flips the flag, saves it and returns the new value.
    pub async fn toggle(&self) -> bool {
        let value = !self.load().await;
        self.save(value).await;
        value
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_url(dir: &TempDir) -> String {
        format!("sqlite:{}?mode=rwc", dir.path().join("prefs.db").display())
    }

    fn create_test_store(dir: &TempDir) -> PreferenceStore {
        PreferenceStore::new(&db_url(dir)).unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_to_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);

        assert!(!store.load().await);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);

        store.save(true).await;
        assert!(store.load().await);

        store.save(false).await;
        assert!(!store.load().await);
    }

    #[tokio::test]
    async fn test_value_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let store = create_test_store(&dir);
        store.save(true).await;
        store.close().await;
        drop(store);

        let reopened = create_test_store(&dir);
        assert!(reopened.load().await);
    }

    #[tokio::test]
    async fn test_value_is_stored_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);
        store.save(true).await;

        let (value,): (String,) = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(DARK_MODE_KEY)
            .fetch_one(&store.pool)
            .await
            .unwrap();

        assert_eq!(value, "true");
    }

    #[tokio::test]
    async fn test_unparseable_value_reads_as_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);
        store.initialize().await.unwrap();

        sqlx::query("INSERT INTO preferences (key, value) VALUES (?, 'banana')")
            .bind(DARK_MODE_KEY)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(!store.load().await);
    }

    #[tokio::test]
    async fn test_toggle_flips_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);

        assert!(store.toggle().await);
        assert!(store.load().await);
        assert!(!store.toggle().await);
        assert!(!store.load().await);
    }

    #[tokio::test]
    async fn test_flags_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = create_test_store(&dir);
        store.initialize().await.unwrap();

        store.set_flag("compact", true).await.unwrap();

        assert_eq!(store.get_flag("compact").await.unwrap(), Some(true));
        assert_eq!(store.get_flag(DARK_MODE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unavailable_storage_never_fails() {
        let store =
            PreferenceStore::new("sqlite:/nonexistent/dir/prefs.db?mode=rwc").unwrap();

        store.save(true).await;
        assert!(!store.load().await);
    }
}
