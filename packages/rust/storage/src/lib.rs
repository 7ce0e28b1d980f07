//! libSQL-backed session store.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the last
//! successful scan (query + leads) in a single fixed slot. Each save
//! overwrites the slot; an explicit purge clears it.
//!
//! **Access rules:**
//! - CLI `scan` / `session show` / `session clear`: read-write via [`Storage::open`]
//! - CLI `export`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use leadmatrix_shared::{Business, LeadMatrixError, Result, SavedSession, ScanQuery};
use libsql::{Connection, Database, params};
use tracing::{debug, info, warn};

/// The one slot the application reads and writes.
pub const SESSION_SLOT: &str = "last";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadMatrixError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadMatrixError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadMatrixError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Session operations
    // -----------------------------------------------------------------------

    /// Save a scan into the session slot, replacing whatever was there.
    pub async fn save_session(&self, query: &ScanQuery, leads: &[Business]) -> Result<()> {
        self.check_writable()?;

        let query_json = serde_json::to_string(query)
            .map_err(|e| LeadMatrixError::Storage(format!("failed to encode query: {e}")))?;
        let leads_json = serde_json::to_string(leads)
            .map_err(|e| LeadMatrixError::Storage(format!("failed to encode leads: {e}")))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO session (slot, query_json, leads_json, lead_count, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(slot) DO UPDATE SET
                   query_json = excluded.query_json,
                   leads_json = excluded.leads_json,
                   lead_count = excluded.lead_count,
                   saved_at = excluded.saved_at",
                params![
                    SESSION_SLOT,
                    query_json.as_str(),
                    leads_json.as_str(),
                    leads.len() as i64,
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        debug!(leads = leads.len(), "session saved");
        Ok(())
    }

    /// Load the saved session, if any.
    ///
    /// A slot whose contents no longer decode is purged (when writable) and
    /// reported as empty.
    pub async fn load_session(&self) -> Result<Option<SavedSession>> {
        let mut rows = self
            .conn
            .query(
                "SELECT query_json, leads_json, saved_at FROM session WHERE slot = ?1",
                params![SESSION_SLOT],
            )
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(LeadMatrixError::Storage(e.to_string())),
        };

        let query_json: String = row
            .get(0)
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;
        let leads_json: String = row
            .get(1)
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;
        let saved_at: String = row
            .get(2)
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;
        drop(rows);

        match decode_session(&query_json, &leads_json, &saved_at) {
            Ok(session) => Ok(Some(session)),
            Err(reason) => {
                warn!(%reason, "session integrity check failed, purging slot");
                if !self.readonly {
                    self.clear_session().await?;
                }
                Ok(None)
            }
        }
    }

    /// Number of leads in the saved session, read without decoding them.
    pub async fn saved_lead_count(&self) -> Result<Option<usize>> {
        let mut rows = self
            .conn
            .query(
                "SELECT lead_count FROM session WHERE slot = ?1",
                params![SESSION_SLOT],
            )
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;
                Ok(Some(usize::try_from(count).unwrap_or(0)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LeadMatrixError::Storage(e.to_string())),
        }
    }

    /// Remove the saved session. Clearing an empty slot is not an error.
    pub async fn clear_session(&self) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM session WHERE slot = ?1",
                params![SESSION_SLOT],
            )
            .await
            .map_err(|e| LeadMatrixError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Rebuild a [`SavedSession`] from its stored columns.
fn decode_session(
    query_json: &str,
    leads_json: &str,
    saved_at: &str,
) -> std::result::Result<SavedSession, String> {
    let query: ScanQuery =
        serde_json::from_str(query_json).map_err(|e| format!("query: {e}"))?;
    let leads: Vec<Business> =
        serde_json::from_str(leads_json).map_err(|e| format!("leads: {e}"))?;
    let saved_at = DateTime::parse_from_rfc3339(saved_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("saved_at: {e}"))?;

    Ok(SavedSession {
        query,
        leads,
        saved_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("lm_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn sample_leads() -> Vec<Business> {
        vec![
            Business {
                phone: "+234 802 555 0147".into(),
                email: "hello@smilebright.ng".into(),
                ..Business::named("Smile Bright Dental")
            },
            Business::named("Lekki Family Dentistry"),
        ]
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("lm_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn empty_slot_loads_none() {
        let storage = test_storage().await;
        assert!(storage.load_session().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn save_and_load_session() {
        let storage = test_storage().await;
        let query = ScanQuery::new("dentists", "Lagos").with_boolean_logic("HAS email");
        let leads = sample_leads();

        storage.save_session(&query, &leads).await.expect("save");

        let session = storage.load_session().await.expect("load").expect("some");
        assert_eq!(session.query, query);
        assert_eq!(session.leads, leads);
    }

    #[tokio::test]
    async fn save_overwrites_slot() {
        let storage = test_storage().await;
        storage
            .save_session(&ScanQuery::new("dentists", "Lagos"), &sample_leads())
            .await
            .unwrap();

        let second = vec![Business::named("Accra Bakehouse")];
        storage
            .save_session(&ScanQuery::new("bakeries", "Accra"), &second)
            .await
            .unwrap();

        let session = storage.load_session().await.unwrap().unwrap();
        assert_eq!(session.query.category, "bakeries");
        assert_eq!(session.leads.len(), 1);
        assert_eq!(session.leads[0].name, "Accra Bakehouse");
    }

    #[tokio::test]
    async fn lead_count_tracks_saved_session() {
        let storage = test_storage().await;
        assert_eq!(storage.saved_lead_count().await.unwrap(), None);

        storage
            .save_session(&ScanQuery::new("dentists", "Lagos"), &sample_leads())
            .await
            .unwrap();
        assert_eq!(storage.saved_lead_count().await.unwrap(), Some(2));

        storage
            .save_session(
                &ScanQuery::new("bakeries", "Accra"),
                &[Business::named("Accra Bakehouse")],
            )
            .await
            .unwrap();
        assert_eq!(storage.saved_lead_count().await.unwrap(), Some(1));

        storage.clear_session().await.unwrap();
        assert_eq!(storage.saved_lead_count().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_session_is_idempotent() {
        let storage = test_storage().await;
        storage
            .save_session(&ScanQuery::new("dentists", "Lagos"), &sample_leads())
            .await
            .unwrap();

        storage.clear_session().await.expect("clear");
        assert!(storage.load_session().await.unwrap().is_none());
        storage.clear_session().await.expect("clear again");
    }

    #[tokio::test]
    async fn corrupted_session_is_purged() {
        let storage = test_storage().await;
        storage
            .conn
            .execute(
                "INSERT INTO session (slot, query_json, leads_json, lead_count, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![SESSION_SLOT, "{\"category\":\"x\"", "[]", 0i64, "not-a-date"],
            )
            .await
            .unwrap();

        assert!(storage.load_session().await.expect("load").is_none());

        let mut rows = storage
            .conn
            .query("SELECT COUNT(*) FROM session", params![])
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("lm_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.save_session(&ScanQuery::new("dentists", "Lagos"), &sample_leads())
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert!(ro.load_session().await.unwrap().is_some());

        let result = ro.clear_session().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
