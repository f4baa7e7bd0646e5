//! SQLite-backed workbook.
//!
//! A `scanorder serve` process and any number of `scanorder scan` / `edit`
//! invocations open the same file at once. Every connection therefore waits
//! on a busy timeout instead of failing fast, and every read-modify-write
//! runs through [`Database::write`], which takes SQLite's write lock before
//! the first read.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod error;
pub mod migrations;
pub mod sheet_repo;

pub use error::DatabaseError;

/// How long a connection waits for another one's write lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on one connection. Clones share it; threads take turns on the
/// inner mutex and other processes are coordinated by SQLite's own locks.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the store at `path` and brings its schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::open_with_busy_timeout(path, BUSY_TIMEOUT)
    }

    pub fn open_with_busy_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        // Set before anything else touches the file: migrations may have to
        // wait for another process that is opening it too.
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        migrations::run_all(&conn)?;

        log::info!(
            "Workbook store opened at {} (busy timeout {} ms)",
            path.display(),
            busy_timeout.as_millis()
        );
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with the connection to itself.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` in an IMMEDIATE transaction and commits when it returns `Ok`.
    ///
    /// The write lock is held from the first statement, so what `f` reads
    /// cannot change under it before its writes land. An `Err` rolls back.
    pub fn write<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DatabaseError>,
    {
        self.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

/// `~/.scanorder/data/scanorder.db`, or `None` without a home directory.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".scanorder").join("data").join("scanorder.db"))
}
