//! `TaskStore` (spec.md §4.3), backed by `sqlx`'s **sqlite** feature.
//!
//! Grounded on the teacher's `sqlx`-backed persistent store
//! (`tasker-shared` depends on `sqlx` with the `postgres` feature); this
//! crate is explicitly "embedded relational" per spec.md §6, so it swaps in
//! the `sqlite` feature of the same crate family, matching
//! `original_source/schedulergodx/utils/storage.py`'s SQLAlchemy default of
//! `sqlite:///SchedulerGodX.db`. Migrations are plain `sqlx::migrate!` SQL
//! files under `migrations/`.

use std::path::Path;

use chrono::{DateTime, Utc};
use scheduler_shared::domain::{Client, Task, TaskStatus, TaskStatusWire};
use scheduler_shared::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    client: String,
    status: String,
    time_to_start: DateTime<Utc>,
    task: String,
    task_args: String,
    task_kwargs: String,
    lifetime: i64,
    hard: bool,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, StoreError> {
        let status = TaskStatusWire::try_from(row.status)
            .map_err(StoreError::Query)?
            .0;
        let args = serde_json::from_str(&row.task_args).map_err(|e| StoreError::Query(e.to_string()))?;
        let kwargs =
            serde_json::from_str(&row.task_kwargs).map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(Task {
            id: row.id,
            client: row.client,
            handler_id: row.task,
            args,
            kwargs,
            time_to_start: row.time_to_start,
            lifetime_secs: row.lifetime,
            hard: row.hard,
            status: TaskStatusWire(status),
        })
    }
}

pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    /// Opens (creating if absent) the SQLite file at `database_path` and
    /// runs pending migrations.
    pub async fn open(database_path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(path = %database_path.display(), "task store opened");
        Ok(Self { pool })
    }

    /// Atomic insert; fails with [`StoreError::DuplicateTaskId`] on a
    /// primary-key collision.
    pub async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let args = serde_json::to_string(&task.args).map_err(|e| StoreError::Query(e.to_string()))?;
        let kwargs =
            serde_json::to_string(&task.kwargs).map_err(|e| StoreError::Query(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO task (id, client, status, time_to_start, task, task_args, task_kwargs, lifetime, hard) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.client)
        .bind(task.status.0.as_str())
        .bind(task.time_to_start)
        .bind(&task.handler_id)
        .bind(args)
        .bind(kwargs)
        .bind(task.lifetime_secs)
        .bind(task.hard)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateTaskId(task.id.clone()))
            }
            Err(e) => Err(StoreError::Query(e.to_string())),
        }
    }

    pub async fn update_status(&self, id: &str, status: TaskStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE task SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Every row with status in {WAITING, WORK} (spec.md §4.3).
    pub async fn get_unfulfilled(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM task WHERE status IN ('WAITING', 'WORK')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.into_iter().map(Task::try_from).collect()
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM task WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.map(Task::try_from).transpose()
    }

    /// Upsert; idempotent (spec.md §4.3).
    pub async fn add_client(&self, client: &Client) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO client (name, enable_overdue) VALUES (?, ?) \
             ON CONFLICT(name) DO UPDATE SET enable_overdue = excluded.enable_overdue",
        )
        .bind(&client.name)
        .bind(client.enable_overdue)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn get_clients(&self) -> Result<Vec<Client>, StoreError> {
        let rows = sqlx::query("SELECT name, enable_overdue FROM client")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Client {
                name: row.get("name"),
                enable_overdue: row.get("enable_overdue"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        warn!("task store closed");
    }
}
