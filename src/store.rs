//! Collection-oriented JSON document store on SQLite.

use anyhow::{anyhow, Context};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const RESUME_COLLECTION: &str = "resume";
pub const CONTACTS_COLLECTION: &str = "contacts";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    collection  TEXT NOT NULL,
    body        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS documents_by_collection ON documents (collection, created_at);
";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory database")?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to create document schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| anyhow!("document store lock poisoned"))?;
            f(&guard)
        })
        .await
        .context("document store task failed")?
    }

    /// Insert a document and return its generated id.
    pub async fn insert(&self, collection: &str, doc: &serde_json::Value) -> anyhow::Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(doc)?;
        let collection = collection.to_string();
        let row_id = id.clone();

        self.with_conn(move |c| {
            c.execute(
                "INSERT INTO documents (id, collection, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![row_id, collection, body, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    /// Oldest document of a collection, if any.
    pub async fn find_one(&self, collection: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let collection = collection.to_string();
        let body = self
            .with_conn(move |c| {
                let body = c
                    .query_row(
                        "SELECT body FROM documents WHERE collection = ?1
                         ORDER BY created_at, rowid LIMIT 1",
                        params![collection],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(body)
            })
            .await?;

        body.map(|b| serde_json::from_str(&b).context("stored document is not valid JSON"))
            .transpose()
    }

    /// Replace every document of a collection with `doc`.
    pub async fn replace_all(&self, collection: &str, doc: &serde_json::Value) -> anyhow::Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(doc)?;
        let collection = collection.to_string();
        let row_id = id.clone();

        self.with_conn(move |c| {
            let tx = c.unchecked_transaction()?;
            tx.execute("DELETE FROM documents WHERE collection = ?1", params![collection])?;
            tx.execute(
                "INSERT INTO documents (id, collection, body, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![row_id, collection, body, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    pub async fn count(&self, collection: &str) -> anyhow::Result<usize> {
        let collection = collection.to_string();
        self.with_conn(move |c| {
            let n: i64 = c.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(n)?)
        })
        .await
    }
}
