//! sqlite `TaskRepository` implementation, grounded on the teacher's
//! `adapters/sqlite/task_repository.rs` (JSON side-columns for collection
//! fields, `rows_affected()` checks for update semantics).

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{RoutingStrategy, Task, TaskStatus, TaskType};
use crate::domain::ports::task_repository::{Page, TaskFilter, TaskRepository};
use crate::identifiers::{AgentId, TaskId};

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Task> {
        let id: String = row.try_get("id")?;
        let assignees: String = row.try_get("assignees")?;
        let dependencies: String = row.try_get("dependencies")?;
        let metadata: String = row.try_get("metadata")?;
        let strategy: Option<String> = row.try_get("strategy")?;

        Ok(Task {
            id: TaskId::from_str(&id)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            task_type: TaskType::from_str(row.try_get::<String, _>("task_type")?.as_str())
                .ok_or_else(|| OrchestratorError::InvalidInput("unknown task_type in row".to_string()))?,
            status: TaskStatus::from_str(row.try_get::<String, _>("status")?.as_str())
                .ok_or_else(|| OrchestratorError::InvalidInput("unknown status in row".to_string()))?,
            strategy: strategy.as_deref().and_then(strategy_from_str),
            assignees: serde_json::from_str::<Vec<AgentId>>(&assignees)?,
            dependencies: serde_json::from_str::<HashSet<TaskId>>(&dependencies)?,
            complexity: row.try_get::<i64, _>("complexity")? as u8,
            risk: row.try_get::<i64, _>("risk")? as u8,
            metadata: serde_json::from_str::<HashMap<String, String>>(&metadata)?,
            created_at: parse_rfc3339(row.try_get("created_at")?)?,
            updated_at: parse_rfc3339(row.try_get("updated_at")?)?,
        })
    }
}

fn strategy_from_str(s: &str) -> Option<RoutingStrategy> {
    match s {
        "solo" => Some(RoutingStrategy::Solo),
        "consensus" => Some(RoutingStrategy::Consensus),
        "sequential" => Some(RoutingStrategy::Sequential),
        "parallel" => Some(RoutingStrategy::Parallel),
        _ => None,
    }
}

fn parse_rfc3339(s: String) -> OrchestratorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrchestratorError::InvalidInput(format!("bad timestamp {s}: {e}")))
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, task: &Task) -> OrchestratorResult<()> {
        let assignees = serde_json::to_string(&task.assignees)?;
        let dependencies = serde_json::to_string(&task.dependencies)?;
        let metadata = serde_json::to_string(&task.metadata)?;

        sqlx::query(
            r#"INSERT INTO tasks
               (id, title, description, task_type, status, strategy, assignees, dependencies,
                complexity, risk, metadata, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.task_type.as_str())
        .bind(task.status.as_str())
        .bind(task.strategy.map(|s| s.as_str()))
        .bind(assignees)
        .bind(dependencies)
        .bind(i64::from(task.complexity))
        .bind(i64::from(task.risk))
        .bind(metadata)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| OrchestratorError::PersistenceFailure {
            task_id: task.id.to_string(),
            source: anyhow::Error::new(e),
        })?;

        Ok(())
    }

    async fn update(&self, task: &Task) -> OrchestratorResult<()> {
        let assignees = serde_json::to_string(&task.assignees)?;
        let dependencies = serde_json::to_string(&task.dependencies)?;
        let metadata = serde_json::to_string(&task.metadata)?;

        let result = sqlx::query(
            r#"UPDATE tasks SET title = ?, description = ?, task_type = ?, status = ?, strategy = ?,
               assignees = ?, dependencies = ?, complexity = ?, risk = ?, metadata = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.task_type.as_str())
        .bind(task.status.as_str())
        .bind(task.strategy.map(|s| s.as_str()))
        .bind(assignees)
        .bind(dependencies)
        .bind(i64::from(task.complexity))
        .bind(i64::from(task.risk))
        .bind(metadata)
        .bind(task.updated_at.to_rfc3339())
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| OrchestratorError::PersistenceFailure {
            task_id: task.id.to_string(),
            source: anyhow::Error::new(e),
        })?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::PersistenceFailure {
                task_id: task.id.to_string(),
                source: anyhow::anyhow!("no task row to update"),
            });
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: TaskId,
        to: TaskStatus,
        expected_from: &[TaskStatus],
    ) -> OrchestratorResult<bool> {
        if expected_from.is_empty() {
            return Ok(false);
        }
        let placeholders = expected_from.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(to.as_str()).bind(Utc::now().to_rfc3339()).bind(id.to_string());
        for status in expected_from {
            query = query.bind(status.as_str());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: TaskId) -> OrchestratorResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn find_by_status(&self, status: TaskStatus) -> OrchestratorResult<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE status = ? ORDER BY created_at ASC")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn find_by_agent(&self, agent_id: AgentId) -> OrchestratorResult<Vec<Task>> {
        // assignees is a JSON array column; SQLite has no native JSON
        // containment test available by default, so filter the LIKE
        // superset in SQL and re-check membership precisely in Rust.
        let needle = format!("%{agent_id}%");
        let rows = sqlx::query("SELECT * FROM tasks WHERE assignees LIKE ? ORDER BY created_at ASC")
            .bind(needle)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(Self::row_to_task)
            .filter(|t| matches!(t, Ok(task) if task.assignees.contains(&agent_id)))
            .collect()
    }

    async fn query_filtered(&self, filter: TaskFilter, page: Page) -> OrchestratorResult<Vec<Task>> {
        let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.agent_id.is_some() {
            sql.push_str(" AND assignees LIKE ?");
        }
        if filter.created_from.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if filter.created_to.is_some() {
            sql.push_str(" AND created_at <= ?");
        }
        sql.push_str(" ORDER BY created_at ASC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(agent_id) = filter.agent_id {
            query = query.bind(format!("%{agent_id}%"));
        }
        if let Some(from) = filter.created_from {
            query = query.bind(from.to_rfc3339());
        }
        if let Some(to) = filter.created_to {
            query = query.bind(to.to_rfc3339());
        }
        query = query.bind(page.page_size as i64).bind(page.offset() as i64);

        let rows = query.fetch_all(&self.pool).await?;
        let mut tasks: Vec<Task> = rows.iter().map(Self::row_to_task).collect::<OrchestratorResult<_>>()?;
        if let Some(agent_id) = filter.agent_id {
            tasks.retain(|t| t.assignees.contains(&agent_id));
        }
        Ok(tasks)
    }

    async fn merge_metadata(&self, id: TaskId, metadata: HashMap<String, String>) -> OrchestratorResult<()> {
        let Some(mut task) = self.find_by_id(id).await? else {
            return Err(OrchestratorError::PersistenceFailure {
                task_id: id.to_string(),
                source: anyhow::anyhow!("task not found for metadata merge"),
            });
        };
        task.metadata.extend(metadata);
        task.touch();
        self.update(&task).await
    }
}
