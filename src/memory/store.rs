// src/memory/store.rs — SQLite operations

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::core::types::RunOutcome;

/// Low-level SQLite operations for the run-history database.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Runs --

    /// Insert a finished run together with its reasoning trace. The run row
    /// and its step rows commit atomically.
    pub fn insert_run(&self, outcome: &RunOutcome) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO runs (run_id, question, answer, terminated_by, iterations,
             final_score, input_tokens, output_tokens, elapsed_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                outcome.run_id,
                outcome.question,
                outcome.answer,
                outcome.terminated_by.to_string(),
                outcome.iterations,
                outcome.final_score.map(f64::from),
                outcome.usage.input_tokens,
                outcome.usage.output_tokens,
                outcome.elapsed_ms,
                now
            ],
        )?;

        for step in &outcome.trace {
            let tools_json = serde_json::to_string(&step.tools)?;
            tx.execute(
                "INSERT INTO reasoning_steps (run_id, iteration, intent, tools_json,
                 strategy, refinement, rationale, completeness, accuracy, clarity,
                 specificity, decision, elapsed_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    outcome.run_id,
                    step.iteration,
                    step.intent.to_string(),
                    tools_json,
                    step.strategy.to_string(),
                    step.refinement.map(|r| r.to_string()),
                    step.rationale,
                    step.quality.map(|q| f64::from(q.completeness)),
                    step.quality.map(|q| f64::from(q.accuracy)),
                    step.quality.map(|q| f64::from(q.clarity)),
                    step.quality.map(|q| f64::from(q.specificity)),
                    step.decision.to_string(),
                    step.elapsed_ms
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Most recent runs, newest first.
    pub fn list_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, question, answer, terminated_by, iterations, final_score,
             input_tokens, output_tokens, elapsed_ms, created_at
             FROM runs ORDER BY created_at DESC, run_id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(RunRow {
                run_id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
                terminated_by: row.get(3)?,
                iterations: row.get(4)?,
                final_score: row.get(5)?,
                input_tokens: row.get(6)?,
                output_tokens: row.get(7)?,
                elapsed_ms: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get_run(&self, run_id: &str) -> anyhow::Result<Option<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, question, answer, terminated_by, iterations, final_score,
             input_tokens, output_tokens, elapsed_ms, created_at
             FROM runs WHERE run_id = ?1",
        )?;

        let mut rows = stmt.query_map(params![run_id], |row| {
            Ok(RunRow {
                run_id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
                terminated_by: row.get(3)?,
                iterations: row.get(4)?,
                final_score: row.get(5)?,
                input_tokens: row.get(6)?,
                output_tokens: row.get(7)?,
                elapsed_ms: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn count_runs(&self) -> anyhow::Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }

    // -- Reasoning steps --

    /// Trace for one run, in iteration order.
    pub fn query_steps(&self, run_id: &str) -> anyhow::Result<Vec<StepRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, iteration, intent, tools_json, strategy, refinement,
             rationale, completeness, accuracy, clarity, specificity, decision, elapsed_ms
             FROM reasoning_steps WHERE run_id = ?1
             ORDER BY iteration ASC",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok(StepRow {
                run_id: row.get(0)?,
                iteration: row.get(1)?,
                intent: row.get(2)?,
                tools_json: row.get(3)?,
                strategy: row.get(4)?,
                refinement: row.get(5)?,
                rationale: row.get(6)?,
                completeness: row.get(7)?,
                accuracy: row.get(8)?,
                clarity: row.get(9)?,
                specificity: row.get(10)?,
                decision: row.get(11)?,
                elapsed_ms: row.get(12)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

// -- Row types --

#[derive(Debug, Clone)]
pub struct RunRow {
    pub run_id: String,
    pub question: String,
    pub answer: String,
    pub terminated_by: String,
    pub iterations: i32,
    pub final_score: Option<f64>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub elapsed_ms: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct StepRow {
    pub run_id: String,
    pub iteration: i32,
    pub intent: String,
    pub tools_json: String,
    pub strategy: String,
    pub refinement: Option<String>,
    pub rationale: String,
    pub completeness: Option<f64>,
    pub accuracy: Option<f64>,
    pub clarity: Option<f64>,
    pub specificity: Option<f64>,
    pub decision: String,
    pub elapsed_ms: i64,
}

impl StepRow {
    /// Tool ids as stored (JSON array), decoded. Malformed rows decode to
    /// an empty list rather than failing a history listing.
    pub fn tools(&self) -> Vec<String> {
        serde_json::from_str(&self.tools_json).unwrap_or_default()
    }

    /// Mean of the four sub-scores, when the step was scored.
    pub fn aggregate(&self) -> Option<f64> {
        match (
            self.completeness,
            self.accuracy,
            self.clarity,
            self.specificity,
        ) {
            (Some(co), Some(ac), Some(cl), Some(sp)) => Some((co + ac + cl + sp) / 4.0),
            _ => None,
        }
    }
}
