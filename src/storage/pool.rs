//! SQLite connection pool shared by the graph store and the work queue
//!
//! Every store or queue call checks out its own connection and runs on the
//! blocking thread pool, so concurrent callers really do race each other at
//! the database lock.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on open connections per database file
const MAX_CONNECTIONS: u32 = 16;

/// Pooled connections to one SQLite database file
pub struct ConnectionPool {
    path: PathBuf,
    inner: Pool<SqliteConnectionManager>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("path", &self.path)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl ConnectionPool {
    /// Opens the database, switches it to WAL mode and runs `init` once
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long a connection waits on a locked database
    ///   before reporting `SQLITE_BUSY`
    /// * `init` - Schema initialization to run on the first connection
    pub fn open<E, F>(path: &Path, busy_timeout: Duration, init: F) -> Result<Arc<Self>, E>
    where
        E: From<rusqlite::Error> + From<r2d2::Error>,
        F: FnOnce(&Connection) -> rusqlite::Result<()>,
    {
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch(
                "
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA temp_store = MEMORY;
            ",
            )
        });

        let inner = Pool::builder()
            .max_size(MAX_CONNECTIONS)
            .min_idle(Some(1))
            .build(manager)?;

        let conn = inner.get()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        init(&*conn)?;

        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            inner,
        }))
    }

    /// Runs `f` with a pooled connection on the blocking thread pool
    pub async fn run<T, E, F>(self: &Arc<Self>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<r2d2::Error> + From<tokio::task::JoinError> + Send + 'static,
    {
        let pool = Arc::clone(self);
        let handle = tokio::task::spawn_blocking(move || {
            let mut conn = pool.inner.get()?;
            f(&mut *conn)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        }
    }
}

/// Returns true for the lock-contention error class
///
/// `SQLITE_BUSY` and `SQLITE_LOCKED` mean another writer got there first and
/// the transaction was rolled back; the same work may simply be tried again.
pub fn is_conflict_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
