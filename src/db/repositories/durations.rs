use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_date_key, parse_optional_datetime},
    models::{DurationDelta, DurationRecord},
};

fn row_to_duration(row: &Row) -> Result<DurationRecord> {
    let updated_at: Option<String> = row.get("updated_at")?;

    Ok(DurationRecord {
        date: row.get("date")?,
        focus_recorded_duration: row.get("focus_recorded_duration")?,
        rest_recorded_duration: row.get("rest_recorded_duration")?,
        recorded_rounds: row.get("recorded_rounds")?,
        updated_at: parse_optional_datetime(updated_at, "updated_at")?,
    })
}

fn select_by_date(conn: &Connection, date: &str) -> Result<Option<DurationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT date, focus_recorded_duration, rest_recorded_duration, recorded_rounds, updated_at
         FROM durations
         WHERE date = ?1",
    )?;

    let mut rows = stmt.query(params![date])?;
    let record = match rows.next()? {
        Some(row) => Some(row_to_duration(row)?),
        None => None,
    };
    Ok(record)
}

fn insert_row(conn: &Connection, record: &DurationRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO durations (date, focus_recorded_duration, rest_recorded_duration, recorded_rounds, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.date,
            record.focus_recorded_duration,
            record.rest_recorded_duration,
            record.recorded_rounds,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("failed to insert duration for {}", record.date))?;
    Ok(())
}

fn accumulate_row(conn: &Connection, date: &str, delta: DurationDelta) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE durations
             SET focus_recorded_duration = focus_recorded_duration + ?1,
                 rest_recorded_duration = rest_recorded_duration + ?2,
                 recorded_rounds = recorded_rounds + ?3,
                 updated_at = ?4
             WHERE date = ?5",
            params![
                delta.focus_minutes,
                delta.rest_minutes,
                delta.rounds,
                Utc::now().to_rfc3339(),
                date,
            ],
        )
        .with_context(|| format!("failed to accumulate duration for {date}"))?;
    Ok(changed)
}

impl Database {
    pub async fn get_duration_by_date(&self, date: &str) -> Result<Option<DurationRecord>> {
        let date = date.to_string();
        self.execute(move |conn| select_by_date(conn, &date)).await
    }

    pub async fn insert_duration(&self, record: &DurationRecord) -> Result<()> {
        parse_date_key(&record.date)?;
        let record = record.clone();
        self.execute(move |conn| insert_row(conn, &record)).await
    }

    /// Adds the deltas into an existing record. Fails when the date has no
    /// record yet.
    pub async fn accumulate_duration(&self, date: &str, delta: DurationDelta) -> Result<()> {
        let date = date.to_string();
        self.execute(move |conn| {
            if accumulate_row(conn, &date, delta)? == 0 {
                bail!("no duration recorded for {date}");
            }
            Ok(())
        })
        .await
    }

    /// Inserts the record for `date` or adds `delta` into it, inside one
    /// transaction, and returns the resulting row.
    pub async fn upsert_duration(&self, date: &str, delta: DurationDelta) -> Result<DurationRecord> {
        parse_date_key(date)?;
        let date = date.to_string();
        self.transaction(move |tx| {
            match select_by_date(tx, &date)? {
                Some(_) => {
                    accumulate_row(tx, &date, delta)?;
                }
                None => {
                    insert_row(tx, &DurationRecord::new(date.clone(), delta))?;
                }
            }

            select_by_date(tx, &date)?
                .with_context(|| format!("duration for {date} vanished during upsert"))
        })
        .await
    }

    /// Every record, oldest day first.
    pub async fn list_durations(&self) -> Result<Vec<DurationRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, focus_recorded_duration, rest_recorded_duration, recorded_rounds, updated_at
                 FROM durations",
            )?;

            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_duration(row)?);
            }

            // Keys are day-first, so text order is not date order.
            records.sort_by_key(|record| record.day());
            Ok(records)
        })
        .await
    }

    pub async fn delete_duration(&self, date: &str) -> Result<bool> {
        let date = date.to_string();
        self.execute(move |conn| {
            let removed = conn.execute("DELETE FROM durations WHERE date = ?1", params![date])?;
            Ok(removed > 0)
        })
        .await
    }
}
