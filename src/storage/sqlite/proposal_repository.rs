//! sqlite `ProposalRepository` implementation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::{InputType, Proposal, TokenUsage};
use crate::domain::ports::ProposalRepository;
use crate::identifiers::{AgentId, ProposalId, TaskId};

#[derive(Clone)]
pub struct SqliteProposalRepository {
    pool: SqlitePool,
}

impl SqliteProposalRepository {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_proposal(row: &sqlx::sqlite::SqliteRow) -> OrchestratorResult<Proposal> {
        let input_type: String = row.try_get("input_type")?;
        Ok(Proposal {
            id: ProposalId::from_str(&row.try_get::<String, _>("id")?)?,
            task_id: TaskId::from_str(&row.try_get::<String, _>("task_id")?)?,
            agent_id: AgentId::from_str(&row.try_get::<String, _>("agent_id")?)?,
            input_type: input_type_from_str(&input_type)
                .ok_or_else(|| OrchestratorError::InvalidInput("unknown input_type".to_string()))?,
            content: row.try_get("content")?,
            confidence: row.try_get("confidence")?,
            token_usage: TokenUsage {
                input: row.try_get::<i64, _>("token_input")? as u64,
                output: row.try_get::<i64, _>("token_output")? as u64,
            },
            created_at: parse_rfc3339(row.try_get("created_at")?)?,
        })
    }
}

fn input_type_from_str(s: &str) -> Option<InputType> {
    match s {
        "text" => Some(InputType::Text),
        "diff" => Some(InputType::Diff),
        "plan" => Some(InputType::Plan),
        "review" => Some(InputType::Review),
        _ => None,
    }
}

fn input_type_as_str(t: &InputType) -> &'static str {
    match t {
        InputType::Text => "text",
        InputType::Diff => "diff",
        InputType::Plan => "plan",
        InputType::Review => "review",
    }
}

fn parse_rfc3339(s: String) -> OrchestratorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrchestratorError::InvalidInput(format!("bad timestamp {s}: {e}")))
}

#[async_trait]
impl ProposalRepository for SqliteProposalRepository {
    async fn insert(&self, proposal: &Proposal) -> OrchestratorResult<()> {
        // Idempotent on (task_id, agent_id): a conflicting insert is a
        // successful no-op rather than an error (spec.md §4.9).
        sqlx::query(
            r#"INSERT INTO proposals
               (id, task_id, agent_id, input_type, content, confidence, token_input, token_output, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(task_id, agent_id) DO NOTHING"#,
        )
        .bind(proposal.id.to_string())
        .bind(proposal.task_id.to_string())
        .bind(proposal.agent_id.to_string())
        .bind(input_type_as_str(&proposal.input_type))
        .bind(&proposal.content)
        .bind(proposal.confidence)
        .bind(proposal.token_usage.input as i64)
        .bind(proposal.token_usage.output as i64)
        .bind(proposal.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_task(&self, task_id: TaskId) -> OrchestratorResult<Vec<Proposal>> {
        let rows = sqlx::query("SELECT * FROM proposals WHERE task_id = ? ORDER BY created_at ASC")
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_proposal).collect()
    }

    async fn find_one(&self, task_id: TaskId, agent_id: AgentId) -> OrchestratorResult<Option<Proposal>> {
        let row = sqlx::query("SELECT * FROM proposals WHERE task_id = ? AND agent_id = ?")
            .bind(task_id.to_string())
            .bind(agent_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_proposal).transpose()
    }
}
