//! sqlite `DecisionRepository` implementation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::Decision;
use crate::domain::ports::DecisionRepository;
use crate::identifiers::{DecisionId, ProposalId, TaskId};

#[derive(Clone)]
pub struct SqliteDecisionRepository {
    pool: SqlitePool,
}

impl SqliteDecisionRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_decision(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Decision> {
        let considered: String = row.try_get("considered")?;
        let selected: String = row.try_get("selected")?;
        let winner_id: Option<String> = row.try_get("winner_id")?;
        Ok(Decision {
            id: DecisionId::from_str(&row.try_get::<String, _>("id")?)?,
            task_id: TaskId::from_str(&row.try_get::<String, _>("task_id")?)?,
            considered: serde_json::from_str::<Vec<ProposalId>>(&considered)?,
            selected: serde_json::from_str::<Vec<ProposalId>>(&selected)?,
            winner_id: winner_id.map(|s| ProposalId::from_str(&s)).transpose()?,
            agreement_rate: row.try_get("agreement_rate")?,
            rationale: row.try_get("rationale")?,
            decided_at: parse_rfc3339(row.try_get("decided_at")?)?,
            consensus_achieved: row.try_get::<i64, _>("consensus_achieved")? != 0,
        })
    }
}

fn parse_rfc3339(s: String) -> OrchestratorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrchestratorError::InvalidInput(format!("bad timestamp {s}: {e}")))
}

#[async_trait]
impl DecisionRepository for SqliteDecisionRepository {
    async fn insert(&self, decision: &Decision) -> OrchestratorResult<()> {
        let considered = serde_json::to_string(&decision.considered)?;
        let selected = serde_json::to_string(&decision.selected)?;

        sqlx::query(
            r#"INSERT INTO decisions
               (id, task_id, considered, selected, winner_id, agreement_rate, rationale, decided_at, consensus_achieved)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(decision.id.to_string())
        .bind(decision.task_id.to_string())
        .bind(considered)
        .bind(selected)
        .bind(decision.winner_id.map(|w| w.to_string()))
        .bind(decision.agreement_rate)
        .bind(&decision.rationale)
        .bind(decision.decided_at.to_rfc3339())
        .bind(i64::from(decision.consensus_achieved))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_task(&self, task_id: TaskId) -> OrchestratorResult<Option<Decision>> {
        let row = sqlx::query("SELECT * FROM decisions WHERE task_id = ?")
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_decision).transpose()
    }
}
