//! Serialized writes into the duration ledger.
//!
//! Completions are queued synchronously, in the order they happen, and a
//! single task applies them one by one. Two upserts for the same date can
//! therefore never interleave their read-modify-write.

use anyhow::{anyhow, Result};
use log::{error, info};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};

use crate::{
    db::{Database, DurationDelta},
    error::PersistenceError,
};

enum LedgerCommand {
    Upsert { date: String, delta: DurationDelta },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct LedgerWriter {
    sender: mpsc::UnboundedSender<LedgerCommand>,
}

impl LedgerWriter {
    /// Spawns the writer task. It runs until every `LedgerWriter` clone is
    /// dropped, after draining what was queued.
    pub fn spawn(runtime: &Handle, db: Database) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        runtime.spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    LedgerCommand::Upsert { date, delta } => {
                        match db.upsert_duration(&date, delta).await {
                            Ok(record) => info!(
                                "Ledger {}: focus {}m, rest {}m, rounds {}",
                                record.date,
                                record.focus_recorded_duration,
                                record.rest_recorded_duration,
                                record.recorded_rounds
                            ),
                            Err(err) => {
                                let err = PersistenceError::ledger(date, err);
                                error!("{err}");
                            }
                        }
                    }
                    LedgerCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { sender }
    }

    /// Queues an upsert; never blocks the caller.
    pub fn record(&self, date: String, delta: DurationDelta) {
        if let Err(err) = self.sender.send(LedgerCommand::Upsert { date, delta }) {
            if let LedgerCommand::Upsert { date, .. } = err.0 {
                error!("Ledger writer is gone; dropped upsert for {date}");
            }
        }
    }

    /// Resolves once everything queued before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.sender
            .send(LedgerCommand::Flush(done_tx))
            .map_err(|_| anyhow!("ledger writer stopped"))?;
        done_rx
            .await
            .map_err(|_| anyhow!("ledger writer stopped before flushing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn queued_upserts_for_one_day_all_land() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("ledger.sqlite3")).unwrap();
        let writer = LedgerWriter::spawn(&Handle::current(), db.clone());

        for _ in 0..20 {
            writer.record("12-06-2024".into(), DurationDelta::focus(25));
            writer.record("12-06-2024".into(), DurationDelta::rest(5));
        }
        writer.flush().await.unwrap();

        let record = db.get_duration_by_date("12-06-2024").await.unwrap().unwrap();
        assert_eq!(record.focus_recorded_duration, 500);
        assert_eq!(record.rest_recorded_duration, 100);
        assert_eq!(record.recorded_rounds, 20);
    }

    #[tokio::test]
    async fn failed_writes_do_not_stop_the_queue() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("ledger.sqlite3")).unwrap();
        let writer = LedgerWriter::spawn(&Handle::current(), db.clone());

        writer.record("not a date".into(), DurationDelta::focus(25));
        writer.record("13-06-2024".into(), DurationDelta::focus(25));
        writer.flush().await.unwrap();

        assert!(db.get_duration_by_date("13-06-2024").await.unwrap().is_some());
    }
}
