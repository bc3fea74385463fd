//! Evaluation bookkeeping: jobs, model responses, judge history and cost.
//!
//! The scheduler that drives evaluations lives elsewhere. These methods only
//! persist what it reports and refuse illegal job status transitions.

use crate::error::{Error, Result};
use crate::model::{
    CostTracking, EvaluationHistory, EvaluationJob, JobStatus, JobType, ModelResponse,
    NewHistoryEntry, NewJob, SuiteScope,
};
use crate::storage::sqlite::{SqliteStore, now_millis, resolve_suite};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

const JOB_COLUMNS: &str = "id, suite_id, job_type, target_id, status, progress_current, \
                           progress_total, estimated_cost_usd, actual_cost_usd, error_message, \
                           created_at, started_at, completed_at";

fn invalid_column(idx: usize, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unexpected value '{value}'").into(),
    )
}

fn map_job(row: &Row<'_>) -> rusqlite::Result<EvaluationJob> {
    let job_type: String = row.get(2)?;
    let status: String = row.get(4)?;
    Ok(EvaluationJob {
        id: row.get(0)?,
        suite_id: row.get(1)?,
        job_type: JobType::parse(&job_type).ok_or_else(|| invalid_column(2, job_type))?,
        target_id: row.get(3)?,
        status: JobStatus::parse(&status).ok_or_else(|| invalid_column(4, status))?,
        progress_current: row.get(5)?,
        progress_total: row.get(6)?,
        estimated_cost_usd: row.get(7)?,
        actual_cost_usd: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
        started_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

fn map_response(row: &Row<'_>) -> rusqlite::Result<ModelResponse> {
    Ok(ModelResponse {
        id: row.get(0)?,
        model_id: row.get(1)?,
        prompt_id: row.get(2)?,
        response_text: row.get(3)?,
        response_source: row.get(4)?,
        api_config: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<EvaluationHistory> {
    Ok(EvaluationHistory {
        id: row.get(0)?,
        job_id: row.get(1)?,
        model_id: row.get(2)?,
        prompt_id: row.get(3)?,
        judge_name: row.get(4)?,
        judge_score: row.get(5)?,
        judge_confidence: row.get(6)?,
        judge_reasoning: row.get(7)?,
        cost_usd: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_cost(row: &Row<'_>) -> rusqlite::Result<CostTracking> {
    Ok(CostTracking {
        id: row.get(0)?,
        suite_id: row.get(1)?,
        date: row.get(2)?,
        total_cost_usd: row.get(3)?,
        evaluation_count: row.get(4)?,
    })
}

fn get_job_in(conn: &Connection, id: i64) -> Result<EvaluationJob> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM evaluation_jobs WHERE id = ?1"),
        [id],
        map_job,
    )
    .optional()?
    .ok_or(Error::JobNotFound { id })
}

fn check_progress(current: i64, total: i64) -> Result<()> {
    if current < 0 || total < 0 {
        return Err(Error::Validation("job progress cannot be negative".to_string()));
    }
    if current > total {
        return Err(Error::Validation(format!(
            "job progress {current} exceeds total {total}"
        )));
    }
    Ok(())
}

impl SqliteStore {
    // ==================
    // Jobs
    // ==================

    /// Enqueue a pending job.
    ///
    /// # Errors
    ///
    /// `Validation` for a negative total, `ForeignKey` for an unknown suite.
    pub fn create_job(&self, job: &NewJob) -> Result<EvaluationJob> {
        check_progress(0, job.progress_total)?;
        let created = self.mutate("create_job", |tx, ctx| {
            tx.execute(
                "INSERT INTO evaluation_jobs
                    (suite_id, job_type, target_id, status, progress_total, estimated_cost_usd, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)",
                rusqlite::params![
                    job.suite_id,
                    job.job_type.as_str(),
                    job.target_id,
                    job.progress_total,
                    job.estimated_cost_usd,
                    now_millis()
                ],
            )
            .map_err(|e| Error::from_constraint(e, "Job", &format!("suite {}", job.suite_id)))?;
            ctx.notify_suite(job.suite_id);
            get_job_in(tx, tx.last_insert_rowid())
        })?;
        info!(
            job_id = created.id,
            suite_id = created.suite_id,
            job_type = created.job_type.as_str(),
            "Created evaluation job"
        );
        Ok(created)
    }

    /// # Errors
    ///
    /// `JobNotFound` if unknown.
    pub fn get_job(&self, id: i64) -> Result<EvaluationJob> {
        get_job_in(&self.conn(), id)
    }

    /// Jobs of a suite, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn list_jobs(&self, scope: SuiteScope<'_>) -> Result<Vec<EvaluationJob>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM evaluation_jobs WHERE suite_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let jobs = stmt
            .query_map([suite_id], map_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    /// Pending or running jobs across all suites, oldest first. Used to
    /// resume work after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_resumable_jobs(&self) -> Result<Vec<EvaluationJob>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM evaluation_jobs
             WHERE status IN ('pending', 'running')
             ORDER BY created_at, id"
        ))?;
        let jobs = stmt
            .query_map([], map_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    /// Move a job to `next`, stamping `started_at` on running and
    /// `completed_at` on any terminal status.
    ///
    /// # Errors
    ///
    /// `JobNotFound` if unknown, `InvalidTransition` if the status machine
    /// does not allow the move.
    pub fn transition_job(
        &self,
        id: i64,
        next: JobStatus,
        error_message: Option<&str>,
    ) -> Result<EvaluationJob> {
        let job = self.mutate("transition_job", |tx, ctx| {
            let job = get_job_in(tx, id)?;
            if !job.status.can_transition_to(next) {
                return Err(Error::InvalidTransition {
                    from: job.status.as_str().to_string(),
                    to: next.as_str().to_string(),
                });
            }

            let now = now_millis();
            let started_at = if next == JobStatus::Running { Some(now) } else { job.started_at };
            let completed_at = next.is_terminal().then_some(now);

            tx.execute(
                "UPDATE evaluation_jobs
                 SET status = ?1, started_at = ?2, completed_at = ?3,
                     error_message = COALESCE(?4, error_message)
                 WHERE id = ?5",
                rusqlite::params![next.as_str(), started_at, completed_at, error_message, id],
            )?;
            ctx.notify_suite(job.suite_id);
            get_job_in(tx, id)
        })?;
        info!(job_id = id, status = next.as_str(), "Job status changed");
        Ok(job)
    }

    /// Record progress and spend reported by the scheduler.
    ///
    /// # Errors
    ///
    /// `JobNotFound` if unknown, `Validation` if `current > total`.
    pub fn update_job_progress(
        &self,
        id: i64,
        current: i64,
        total: i64,
        actual_cost_usd: f64,
    ) -> Result<()> {
        check_progress(current, total)?;
        self.mutate("update_job_progress", |tx, ctx| {
            let job = get_job_in(tx, id)?;
            tx.execute(
                "UPDATE evaluation_jobs
                 SET progress_current = ?1, progress_total = ?2, actual_cost_usd = ?3
                 WHERE id = ?4",
                rusqlite::params![current, total, actual_cost_usd, id],
            )?;
            ctx.notify_suite(job.suite_id);
            debug!(job_id = id, current, total, "Job progress");
            Ok(())
        })
    }

    // ==================
    // Responses
    // ==================

    /// Store the latest response of a model to a prompt, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// `ForeignKey` if the model or prompt does not exist.
    pub fn save_model_response(
        &self,
        model_id: i64,
        prompt_id: i64,
        response_text: &str,
        response_source: &str,
        api_config: &str,
    ) -> Result<ModelResponse> {
        self.mutate("save_model_response", |tx, _ctx| {
            let now = now_millis();
            tx.execute(
                "INSERT INTO model_responses
                    (model_id, prompt_id, response_text, response_source, api_config, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(model_id, prompt_id) DO UPDATE SET
                    response_text = excluded.response_text,
                    response_source = excluded.response_source,
                    api_config = excluded.api_config,
                    updated_at = excluded.updated_at",
                rusqlite::params![model_id, prompt_id, response_text, response_source, api_config, now],
            )
            .map_err(|e| {
                Error::from_constraint(e, "Response", &format!("model {model_id} / prompt {prompt_id}"))
            })?;

            let saved = tx.query_row(
                "SELECT id, model_id, prompt_id, response_text, response_source, api_config,
                        created_at, updated_at
                 FROM model_responses WHERE model_id = ?1 AND prompt_id = ?2",
                [model_id, prompt_id],
                map_response,
            )?;
            Ok(saved)
        })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_model_response(&self, model_id: i64, prompt_id: i64) -> Result<Option<ModelResponse>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, model_id, prompt_id, response_text, response_source, api_config,
                        created_at, updated_at
                 FROM model_responses WHERE model_id = ?1 AND prompt_id = ?2",
                [model_id, prompt_id],
                map_response,
            )
            .optional()?)
    }

    // ==================
    // History
    // ==================

    /// Append one judge verdict.
    ///
    /// # Errors
    ///
    /// `ForeignKey` if the job, model or prompt does not exist.
    pub fn append_history(&self, entry: &NewHistoryEntry) -> Result<EvaluationHistory> {
        self.mutate("append_history", |tx, _ctx| {
            let now = now_millis();
            tx.execute(
                "INSERT INTO evaluation_history
                    (job_id, model_id, prompt_id, judge_name, judge_score, judge_confidence,
                     judge_reasoning, cost_usd, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    entry.job_id,
                    entry.model_id,
                    entry.prompt_id,
                    entry.judge_name,
                    entry.judge_score,
                    entry.judge_confidence,
                    entry.judge_reasoning,
                    entry.cost_usd,
                    now
                ],
            )
            .map_err(|e| Error::from_constraint(e, "History", &format!("job {}", entry.job_id)))?;

            Ok(EvaluationHistory {
                id: tx.last_insert_rowid(),
                job_id: entry.job_id,
                model_id: entry.model_id,
                prompt_id: entry.prompt_id,
                judge_name: entry.judge_name.clone(),
                judge_score: entry.judge_score,
                judge_confidence: entry.judge_confidence,
                judge_reasoning: entry.judge_reasoning.clone(),
                cost_usd: entry.cost_usd,
                created_at: now,
            })
        })
    }

    /// Verdicts recorded for a job, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_history(&self, job_id: i64) -> Result<Vec<EvaluationHistory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, job_id, model_id, prompt_id, judge_name, judge_score, judge_confidence,
                    judge_reasoning, cost_usd, created_at
             FROM evaluation_history WHERE job_id = ?1 ORDER BY id",
        )?;
        let history = stmt
            .query_map([job_id], map_history)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(history)
    }

    // ==================
    // Cost tracking
    // ==================

    /// Add one evaluation's cost to the suite's total for `date`.
    ///
    /// # Errors
    ///
    /// `Validation` for a negative cost.
    pub fn record_cost(
        &self,
        scope: SuiteScope<'_>,
        date: NaiveDate,
        cost_usd: f64,
    ) -> Result<CostTracking> {
        if cost_usd < 0.0 || !cost_usd.is_finite() {
            return Err(Error::Validation(format!("invalid cost {cost_usd}")));
        }
        self.mutate("record_cost", |tx, _ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            tx.execute(
                "INSERT INTO cost_tracking (suite_id, date, total_cost_usd, evaluation_count)
                 VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT(suite_id, date) DO UPDATE SET
                    total_cost_usd = total_cost_usd + excluded.total_cost_usd,
                    evaluation_count = evaluation_count + 1",
                rusqlite::params![suite_id, date, cost_usd],
            )?;
            let row = tx.query_row(
                "SELECT id, suite_id, date, total_cost_usd, evaluation_count
                 FROM cost_tracking WHERE suite_id = ?1 AND date = ?2",
                rusqlite::params![suite_id, date],
                map_cost,
            )?;
            Ok(row)
        })
    }

    /// Daily cost rows of a suite, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn cost_for_suite(&self, scope: SuiteScope<'_>) -> Result<Vec<CostTracking>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        let mut stmt = conn.prepare(
            "SELECT id, suite_id, date, total_cost_usd, evaluation_count
             FROM cost_tracking WHERE suite_id = ?1 ORDER BY date",
        )?;
        let rows = stmt
            .query_map([suite_id], map_cost)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
