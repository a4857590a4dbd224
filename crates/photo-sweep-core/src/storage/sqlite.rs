use rusqlite::{Connection, Result};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode)");
        Ok(())
    }

    /// Create the schema on first open. Scan history is derived data, so an
    /// unknown newer layout is dropped and recreated; the entitlement row is
    /// kept whenever its table already exists.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            debug!(
                "Schema version {} is newer than {}, recreating scan history",
                version, SCHEMA_VERSION
            );
            self.conn.execute_batch("DROP TABLE IF EXISTS scan_history;")?;
        }

        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM scan_history;
             DELETE FROM entitlement_state;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
