//! Persisted per-feature flags.

use super::PreferenceStore;
use super::connection::CacheDb;
use crate::Error;
use async_trait::async_trait;
use tokio_rusqlite::params;

#[async_trait]
impl PreferenceStore for CacheDb {
    async fn flag(&self, feature: &str) -> Result<bool, Error> {
        let feature = feature.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let enabled: bool = conn.query_row(
                    "SELECT COALESCE((SELECT enabled FROM preferences WHERE feature = ?1), 0)",
                    params![feature],
                    |row| row.get(0),
                )?;
                Ok(enabled)
            })
            .await
            .map_err(Error::from)
    }

    async fn set_flag(&self, feature: &str, enabled: bool) -> Result<(), Error> {
        let feature = feature.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO preferences (feature, enabled, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(feature) DO UPDATE SET
                        enabled = excluded.enabled,
                        updated_at = excluded.updated_at",
                    params![feature, enabled, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unset_flag_is_false() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.flag("iosTipDismissed").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_and_clear_flag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_flag("pwaDismissed", true).await.unwrap();
        assert!(db.flag("pwaDismissed").await.unwrap());

        db.set_flag("pwaDismissed", false).await.unwrap();
        assert!(!db.flag("pwaDismissed").await.unwrap());
    }

    #[tokio::test]
    async fn test_flag_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.sqlite");

        {
            let db = CacheDb::open(&path).await.unwrap();
            db.set_flag("iosTipDismissed", true).await.unwrap();
        }

        let db = CacheDb::open(&path).await.unwrap();
        assert!(db.flag("iosTipDismissed").await.unwrap());
        assert!(!db.flag("pwaDismissed").await.unwrap());
    }
}
