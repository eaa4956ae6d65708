use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::{Connection, Transaction};
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

// Closing the queue ends the worker loop once queued jobs have run.
impl Drop for Worker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if let Err(err) = thread.join() {
                error!("Ledger database thread panicked: {err:?}");
            }
        }
    }
}

/// Handle to the duration ledger.
///
/// The SQLite connection is opened and migrated up front, then moved onto a
/// dedicated thread. Jobs run there one at a time in submission order.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let conn = open(&db_path)?;
        let (jobs, queue) = mpsc::channel::<Job>();

        let thread = thread::Builder::new()
            .name("pomodoro-db".into())
            .spawn(move || {
                let mut conn = conn;
                for job in queue {
                    job(&mut conn);
                }
                info!("Ledger database thread stopped");
            })
            .context("failed to spawn ledger database thread")?;

        info!("Duration ledger opened at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: Some(jobs),
                thread: Some(thread),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("ledger database is closed"))?;
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            // A dropped receiver means the caller stopped waiting.
            let _ = reply_tx.send(task(conn));
        });
        jobs.send(job)
            .map_err(|_| anyhow!("ledger database thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("ledger database thread dropped the job"))?
    }

    /// Runs `task` inside one transaction. It commits when `task` returns
    /// `Ok` and rolls back otherwise.
    pub async fn transaction<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.execute(move |conn| {
            let tx = conn.transaction().context("failed to open transaction")?;
            let value = task(&tx)?;
            tx.commit().context("failed to commit transaction")?;
            Ok(value)
        })
        .await
    }
}

fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create ledger directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(db_path)
        .with_context(|| format!("failed to open ledger database {}", db_path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    run_migrations(&mut conn).context("failed to run ledger migrations")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use tempfile::TempDir;

    fn count_rows(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM durations", [], |row| row.get(0))?)
    }

    #[tokio::test]
    async fn failed_transactions_roll_back() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("ledger.sqlite3")).unwrap();

        let result: Result<()> = db
            .transaction(|tx| {
                tx.execute("INSERT INTO durations (date) VALUES ('01-01-2024')", [])?;
                bail!("abort");
            })
            .await;
        assert!(result.is_err());

        assert_eq!(db.execute(|conn| count_rows(conn)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn opening_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.sqlite3");
        let db = Database::new(path.clone()).unwrap();

        assert!(path.exists());
        assert_eq!(db.execute(|conn| count_rows(conn)).await.unwrap(), 0);
    }
}
