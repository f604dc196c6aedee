use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod models;

use helpers::{format_instant, parse_instant, round2};
use migrations::run_migrations;
use models::{ActivityType, Journey, JourneyKey, Location};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn row_to_journey(row: &Row) -> rusqlite::Result<Journey> {
    let start_raw: String = row.get("start_time")?;
    let end_raw: String = row.get("end_time")?;
    let to_sql_err = |e: crate::error::IngestError| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        )
    };

    Ok(Journey {
        id: row.get("id")?,
        start_time: parse_instant(&start_raw).map_err(to_sql_err)?,
        end_time: parse_instant(&end_raw).map_err(to_sql_err)?,
        start_location_id: row.get("start_location_id")?,
        end_location_id: row.get("end_location_id")?,
        activity_id: row.get("activity_id")?,
        activity_confidence: row.get("activity_confidence")?,
        transit_guess_id: row.get("transit_guess_id")?,
        transit_confidence: row.get("transit_confidence")?,
        complete: row.get::<_, Option<i64>>("complete")?.is_some(),
    })
}

/// Handle to the SQLite store. All access is funneled through one worker
/// thread, so every statement commits atomically and ingestion never races
/// with readers.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Open (or create) the store and bring the schema up to date. Failure
    /// here is fatal: no ingestion is attempted against a store that cannot
    /// be opened or migrated.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("farecheck-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Dedup lookup by the natural key.
    pub async fn find_journey_by_start(
        &self,
        start: NaiveDateTime,
    ) -> Result<Option<JourneyKey>> {
        let start_sql = format_instant(start);
        self.execute(move |conn| {
            let key = conn
                .query_row(
                    "SELECT id, complete FROM journeys WHERE start_time = ?1",
                    params![start_sql],
                    |row| {
                        Ok(JourneyKey {
                            id: row.get(0)?,
                            complete: row.get::<_, Option<i64>>(1)?.is_some(),
                        })
                    },
                )
                .optional()
                .with_context(|| "failed to look up journey by start time")?;
            Ok(key)
        })
        .await
    }

    /// Insert a bare row carrying only the two instants. Everything else is
    /// filled in as resolution completes.
    pub async fn insert_journey_times(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<i64> {
        let start_sql = format_instant(start);
        let end_sql = format_instant(end);
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO journeys (start_time, end_time) VALUES (?1, ?2)",
                params![start_sql, end_sql],
            )
            .with_context(|| "failed to insert journey")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Insert-if-absent on the place dictionary; returns the existing id when
    /// the name is already known.
    pub async fn upsert_location(&self, name: &str) -> Result<i64> {
        let name = name.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO locations (name) VALUES (?1)",
                params![name],
            )
            .with_context(|| "failed to upsert location")?;
            let id = conn
                .query_row(
                    "SELECT id FROM locations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .with_context(|| format!("location '{name}' missing after upsert"))?;
            Ok(id)
        })
        .await
    }

    /// Insert-if-absent on the activity-type dictionary.
    pub async fn upsert_activity_type(&self, token: &str) -> Result<i64> {
        let token = token.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO activity_types (token) VALUES (?1)",
                params![token],
            )
            .with_context(|| "failed to upsert activity type")?;
            let id = conn
                .query_row(
                    "SELECT id FROM activity_types WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .with_context(|| format!("activity type '{token}' missing after upsert"))?;
            Ok(id)
        })
        .await
    }

    pub async fn set_journey_places(
        &self,
        journey_id: i64,
        start_location_id: i64,
        end_location_id: i64,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE journeys
                 SET start_location_id = ?1,
                     end_location_id = ?2
                 WHERE id = ?3",
                params![start_location_id, end_location_id, journey_id],
            )
            .with_context(|| "failed to update journey places")?;
            Ok(())
        })
        .await
    }

    pub async fn set_journey_activity(
        &self,
        journey_id: i64,
        activity_id: i64,
        confidence: f64,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE journeys
                 SET activity_id = ?1,
                     activity_confidence = ?2
                 WHERE id = ?3",
                params![activity_id, round2(confidence), journey_id],
            )
            .with_context(|| "failed to update journey activity")?;
            Ok(())
        })
        .await
    }

    pub async fn set_journey_transit_guess(
        &self,
        journey_id: i64,
        activity_id: i64,
        confidence: f64,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE journeys
                 SET transit_guess_id = ?1,
                     transit_confidence = ?2
                 WHERE id = ?3",
                params![activity_id, round2(confidence), journey_id],
            )
            .with_context(|| "failed to update journey transit guess")?;
            Ok(())
        })
        .await
    }

    /// Marks the end of a journey's construction. Rows without this flag are
    /// picked up and finished by the next ingestion run.
    pub async fn mark_journey_complete(&self, journey_id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE journeys SET complete = 1 WHERE id = ?1",
                params![journey_id],
            )
            .with_context(|| "failed to mark journey complete")?;
            Ok(())
        })
        .await
    }

    pub async fn journeys_ordered_by_start(&self) -> Result<Vec<Journey>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    start_time,
                    end_time,
                    start_location_id,
                    end_location_id,
                    activity_id,
                    activity_confidence,
                    transit_guess_id,
                    transit_confidence,
                    complete
                FROM journeys
                ORDER BY start_time ASC",
            )?;

            let journey_iter = stmt.query_map([], row_to_journey)?;

            let mut journeys = Vec::new();
            for journey in journey_iter {
                journeys.push(journey?);
            }

            Ok(journeys)
        })
        .await
    }

    pub async fn count_complete(&self) -> Result<i64> {
        self.execute(|conn| {
            let count = conn
                .query_row(
                    "SELECT COUNT(*) FROM journeys WHERE complete = 1",
                    [],
                    |row| row.get(0),
                )
                .with_context(|| "failed to count complete journeys")?;
            Ok(count)
        })
        .await
    }

    pub async fn activity_types(&self) -> Result<Vec<ActivityType>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id, token FROM activity_types ORDER BY id")?;
            let type_iter = stmt.query_map([], |row| {
                Ok(ActivityType {
                    id: row.get(0)?,
                    token: row.get(1)?,
                })
            })?;

            let mut types = Vec::new();
            for activity_type in type_iter {
                types.push(activity_type?);
            }

            Ok(types)
        })
        .await
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM locations ORDER BY id")?;
            let location_iter = stmt.query_map([], |row| {
                Ok(Location {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;

            let mut locations = Vec::new();
            for location in location_iter {
                locations.push(location?);
            }

            Ok(locations)
        })
        .await
    }

    /// Convenience view over `locations()` for the trip merger.
    pub async fn location_names(&self) -> Result<HashMap<i64, String>> {
        let locations = self.locations().await?;
        Ok(locations
            .into_iter()
            .map(|location| (location.id, location.name))
            .collect())
    }
}
