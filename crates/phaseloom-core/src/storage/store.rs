use crate::embeddings::{cosine_similarity, decode_vec_f32, encode_vec_f32};
use crate::errors::{Error, Result};
use crate::model::{
    Phase, PhaseDraft, PhaseStatus, PhaseUpdate, Project, ProjectProgress, SimilarPhase,
};
use crate::seeds::PhaseSeed;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const PHASE_COLS: &str = "id, project_id, phase_number, title, description, prompt_template, \
                          user_input, ai_response, status, created_at, updated_at";

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

/// Embedding payload written alongside a generation commit.
pub struct EmbeddingWrite<'a> {
    pub model: &'a str,
    pub content: &'a str,
    pub vec: &'a [f32],
}

/// Result of a commit transaction: the refreshed phase, the draft version
/// the prior content was archived under (if any), and how many downstream
/// phases the cascade flipped to stale.
pub struct CommitOutcome {
    pub phase: Phase,
    pub archived_version: Option<u32>,
    pub marked_stale: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // projects

    /// Insert a project and all of its seeded phases in one transaction.
    pub fn create_project(
        &self,
        title: &str,
        description: Option<&str>,
        owner: Option<&str>,
        seeds: &[PhaseSeed],
    ) -> Result<(Project, Vec<Phase>)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = now_rfc3339();
        let project_id = new_id();
        tx.execute(
            "INSERT INTO projects(id, title, description, owner, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![project_id, title, description, owner, now],
        )?;

        let mut phases = Vec::with_capacity(seeds.len());
        for (idx, seed) in seeds.iter().enumerate() {
            let phase_id = new_id();
            let number = idx as u32 + 1;
            tx.execute(
                "INSERT INTO phases(id, project_id, phase_number, title, description, \
                 prompt_template, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    phase_id,
                    project_id,
                    number as i64,
                    seed.title,
                    seed.description,
                    seed.prompt_template,
                    PhaseStatus::NotStarted.as_str(),
                    now
                ],
            )?;
            phases.push(phase_by_id(&tx, &phase_id)?);
        }

        let project = project_by_id(&tx, &project_id)?;
        tx.commit()?;
        tracing::info!(project_id = %project.id, phases = phases.len(), "created project");
        Ok((project, phases))
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        let conn = self.conn.lock().unwrap();
        project_by_id(&conn, id)
    }

    // phases

    pub fn get_phase(&self, id: &str) -> Result<Phase> {
        let conn = self.conn.lock().unwrap();
        phase_by_id(&conn, id)
    }

    pub fn get_phase_by_number(&self, project_id: &str, phase_number: u32) -> Result<Phase> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {PHASE_COLS} FROM phases WHERE project_id = ?1 AND phase_number = ?2"),
            params![project_id, phase_number as i64],
            phase_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("phase", format!("{project_id}/{phase_number}")))
    }

    pub fn list_phases(&self, project_id: &str) -> Result<Vec<Phase>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHASE_COLS} FROM phases WHERE project_id = ?1 ORDER BY phase_number"
        ))?;
        let rows = stmt.query_map(params![project_id], phase_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Phases of the project before `phase_number` that already carry a
    /// response, in phase order. Sequential-context source.
    pub fn answered_phases_before(&self, project_id: &str, phase_number: u32) -> Result<Vec<Phase>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHASE_COLS} FROM phases
             WHERE project_id = ?1 AND phase_number < ?2
               AND ai_response IS NOT NULL AND ai_response != ''
             ORDER BY phase_number"
        ))?;
        let rows = stmt.query_map(params![project_id, phase_number as i64], phase_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // drafts

    pub fn list_drafts(&self, phase_id: &str) -> Result<Vec<PhaseDraft>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, phase_id, version, content, user_input, ai_response, created_at
             FROM phase_drafts WHERE phase_id = ?1 ORDER BY version DESC",
        )?;
        let rows = stmt.query_map(params![phase_id], draft_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn get_draft(&self, phase_id: &str, version: u32) -> Result<PhaseDraft> {
        let conn = self.conn.lock().unwrap();
        draft_by_version(&conn, phase_id, version)
    }

    // embeddings

    /// Replace-in-place upsert of a phase's single embedding row.
    pub fn upsert_phase_embedding(
        &self,
        phase_id: &str,
        content: &str,
        model: &str,
        vec: &[f32],
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        upsert_embedding(
            &conn,
            phase_id,
            &EmbeddingWrite {
                model,
                content,
                vec,
            },
            &now_rfc3339(),
        )
    }

    pub fn get_phase_embedding(&self, phase_id: &str) -> Result<Option<(String, Vec<f32>)>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, Vec<u8>)> = conn
            .query_row(
                "SELECT model, vec FROM phase_embeddings WHERE phase_id = ?1",
                params![phase_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((model, blob)) => Ok(Some((model, decode_vec_f32(&blob)?))),
            None => Ok(None),
        }
    }

    /// Cosine-similarity scan over the project's embedding rows.
    ///
    /// Returns at most `k` hits with similarity >= `threshold`, best first.
    /// Rows whose vector dimensionality does not match the query are
    /// skipped. An empty result is not an error.
    pub fn search_similar(
        &self,
        project_id: &str,
        query: &[f32],
        k: usize,
        threshold: f64,
    ) -> Result<Vec<SimilarPhase>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT pe.phase_id, pe.vec, p.phase_number, p.title, p.ai_response
             FROM phase_embeddings pe
             JOIN phases p ON p.id = pe.phase_id
             WHERE p.project_id = ?1",
        )?;
        let rows = stmt.query_map(params![project_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, Vec<u8>>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (phase_id, blob, phase_number, title, ai_response) = row?;
            let vec = decode_vec_f32(&blob)?;
            let Some(similarity) = cosine_similarity(query, &vec) else {
                continue;
            };
            if similarity >= threshold {
                hits.push(SimilarPhase {
                    phase_id,
                    phase_number: phase_number as u32,
                    title,
                    ai_response,
                    similarity,
                });
            }
        }
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    // query-embedding cache

    pub fn cached_embedding(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.conn.lock().unwrap();
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vec FROM embedding_cache WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        match blob {
            Some(blob) => Ok(Some(decode_vec_f32(&blob)?)),
            None => Ok(None),
        }
    }

    pub fn store_cached_embedding(&self, key: &str, model: &str, vec: &[f32]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO embedding_cache(key, model, dims, vec, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                model,
                vec.len() as i64,
                encode_vec_f32(vec),
                now_rfc3339()
            ],
        )?;
        Ok(())
    }

    // pipeline commits

    /// Commit a successful generation as one transaction: archive the prior
    /// input/response pair (when both are present), overwrite the phase,
    /// upsert its embedding, and cascade staleness downstream.
    pub fn commit_generation(
        &self,
        phase_id: &str,
        user_input: &str,
        ai_response: &str,
        embedding: &EmbeddingWrite<'_>,
    ) -> Result<CommitOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let phase = phase_by_id(&tx, phase_id)?;
        let now = now_rfc3339();

        let archived_version = if phase.has_content() {
            Some(insert_draft(
                &tx,
                &phase.id,
                phase.user_input.as_deref().unwrap_or_default(),
                phase.ai_response.as_deref().unwrap_or_default(),
                &now,
            )?)
        } else {
            None
        };

        tx.execute(
            "UPDATE phases SET user_input = ?1, ai_response = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                user_input,
                ai_response,
                PhaseStatus::Completed.as_str(),
                now,
                phase_id
            ],
        )?;
        upsert_embedding(&tx, phase_id, embedding, &now)?;
        let marked_stale = mark_downstream_stale(&tx, &phase.project_id, phase.phase_number, &now)?;

        let updated = phase_by_id(&tx, phase_id)?;
        tx.commit()?;
        Ok(CommitOutcome {
            phase: updated,
            archived_version,
            marked_stale,
        })
    }

    /// Commit a draft restore: archive the current pair (when present),
    /// overwrite the phase with the draft's content, and cascade staleness.
    /// The embedding row is left untouched; it keeps mirroring the last
    /// generated response until the next generation or a reindex.
    pub fn commit_restore(&self, phase_id: &str, version: u32) -> Result<CommitOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let phase = phase_by_id(&tx, phase_id)?;
        let draft = draft_by_version(&tx, phase_id, version)?;
        let now = now_rfc3339();

        let archived_version = if phase.has_content() {
            Some(insert_draft(
                &tx,
                &phase.id,
                phase.user_input.as_deref().unwrap_or_default(),
                phase.ai_response.as_deref().unwrap_or_default(),
                &now,
            )?)
        } else {
            None
        };

        tx.execute(
            "UPDATE phases SET user_input = ?1, ai_response = ?2, status = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                draft.user_input,
                draft.ai_response,
                PhaseStatus::Completed.as_str(),
                now,
                phase_id
            ],
        )?;
        let marked_stale = mark_downstream_stale(&tx, &phase.project_id, phase.phase_number, &now)?;

        let updated = phase_by_id(&tx, phase_id)?;
        tx.commit()?;
        Ok(CommitOutcome {
            phase: updated,
            archived_version,
            marked_stale,
        })
    }

    /// Commit a partial field update. The current pair is archived first
    /// when present; the cascade runs only when fields actually changed on
    /// a completed phase. Status itself is not modified here.
    pub fn commit_update(&self, phase_id: &str, update: &PhaseUpdate) -> Result<CommitOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let phase = phase_by_id(&tx, phase_id)?;
        let now = now_rfc3339();

        let archived_version = if phase.has_content() {
            Some(insert_draft(
                &tx,
                &phase.id,
                phase.user_input.as_deref().unwrap_or_default(),
                phase.ai_response.as_deref().unwrap_or_default(),
                &now,
            )?)
        } else {
            None
        };

        let mut marked_stale = 0;
        if !update.is_empty() {
            tx.execute(
                "UPDATE phases SET
                     title = COALESCE(?1, title),
                     description = COALESCE(?2, description),
                     user_input = COALESCE(?3, user_input),
                     prompt_template = COALESCE(?4, prompt_template),
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    update.title,
                    update.description,
                    update.user_input,
                    update.prompt_template,
                    now,
                    phase_id
                ],
            )?;
            if phase.status == PhaseStatus::Completed {
                marked_stale =
                    mark_downstream_stale(&tx, &phase.project_id, phase.phase_number, &now)?;
            }
        }

        let updated = phase_by_id(&tx, phase_id)?;
        tx.commit()?;
        Ok(CommitOutcome {
            phase: updated,
            archived_version,
            marked_stale,
        })
    }

    // progress

    pub fn project_progress(&self, project_id: &str) -> Result<ProjectProgress> {
        let statuses: Vec<PhaseStatus> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt =
                conn.prepare("SELECT status FROM phases WHERE project_id = ?1")?;
            let rows = stmt.query_map(params![project_id], |r| r.get::<_, String>(0))?;
            let mut out = Vec::new();
            for r in rows {
                out.push(PhaseStatus::parse(&r?));
            }
            out
        };

        let total = statuses.len() as u32;
        let count = |s: PhaseStatus| statuses.iter().filter(|&&v| v == s).count() as u32;
        let completed = count(PhaseStatus::Completed);
        let percent = if total > 0 {
            ((completed as f64 / total as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        Ok(ProjectProgress {
            total,
            completed,
            stale: count(PhaseStatus::Stale),
            in_progress: count(PhaseStatus::InProgress),
            not_started: count(PhaseStatus::NotStarted),
            percent,
            current_phase: if completed < total { completed + 1 } else { total.max(1) },
        })
    }
}

fn phase_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Phase> {
    Ok(Phase {
        id: row.get(0)?,
        project_id: row.get(1)?,
        phase_number: row.get::<_, i64>(2)? as u32,
        title: row.get(3)?,
        description: row.get(4)?,
        prompt_template: row.get(5)?,
        user_input: row.get(6)?,
        ai_response: row.get(7)?,
        status: PhaseStatus::parse(&row.get::<_, String>(8)?),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn draft_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhaseDraft> {
    Ok(PhaseDraft {
        id: row.get(0)?,
        phase_id: row.get(1)?,
        version: row.get::<_, i64>(2)? as u32,
        content: row.get(3)?,
        user_input: row.get(4)?,
        ai_response: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn phase_by_id(conn: &Connection, id: &str) -> Result<Phase> {
    conn.query_row(
        &format!("SELECT {PHASE_COLS} FROM phases WHERE id = ?1"),
        params![id],
        phase_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("phase", id))
}

fn project_by_id(conn: &Connection, id: &str) -> Result<Project> {
    conn.query_row(
        "SELECT id, title, description, owner, is_active, created_at, updated_at
         FROM projects WHERE id = ?1",
        params![id],
        |row| {
            Ok(Project {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                owner: row.get(3)?,
                is_active: row.get::<_, i64>(4)? != 0,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| Error::not_found("project", id))
}

fn draft_by_version(conn: &Connection, phase_id: &str, version: u32) -> Result<PhaseDraft> {
    conn.query_row(
        "SELECT id, phase_id, version, content, user_input, ai_response, created_at
         FROM phase_drafts WHERE phase_id = ?1 AND version = ?2",
        params![phase_id, version as i64],
        draft_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("draft", format!("{phase_id}/v{version}")))
}

/// Append the pair as the next draft version for the phase. Runs inside
/// the caller's transaction so the version computation cannot race.
fn insert_draft(
    conn: &Connection,
    phase_id: &str,
    user_input: &str,
    ai_response: &str,
    now: &str,
) -> Result<u32> {
    let current: Option<i64> = conn.query_row(
        "SELECT MAX(version) FROM phase_drafts WHERE phase_id = ?1",
        params![phase_id],
        |r| r.get(0),
    )?;
    let version = current.unwrap_or(0) as u32 + 1;
    let content = format!("User Input: {user_input}\n\nAI Response: {ai_response}");
    conn.execute(
        "INSERT INTO phase_drafts(id, phase_id, version, content, user_input, ai_response, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new_id(),
            phase_id,
            version as i64,
            content,
            user_input,
            ai_response,
            now
        ],
    )?;
    tracing::debug!(phase_id, version, "archived draft");
    Ok(version)
}

fn upsert_embedding(
    conn: &Connection,
    phase_id: &str,
    w: &EmbeddingWrite<'_>,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO phase_embeddings(phase_id, content, model, dims, vec, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT(phase_id) DO UPDATE SET
            content = excluded.content,
            model = excluded.model,
            dims = excluded.dims,
            vec = excluded.vec,
            updated_at = excluded.updated_at",
        params![
            phase_id,
            w.content,
            w.model,
            w.vec.len() as i64,
            encode_vec_f32(w.vec),
            now
        ],
    )?;
    Ok(())
}

/// Flat forward-only cascade: every later completed phase goes stale.
fn mark_downstream_stale(
    conn: &Connection,
    project_id: &str,
    from_phase: u32,
    now: &str,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE phases SET status = ?1, updated_at = ?2
         WHERE project_id = ?3 AND phase_number > ?4 AND status = ?5",
        params![
            PhaseStatus::Stale.as_str(),
            now,
            project_id,
            from_phase as i64,
            PhaseStatus::Completed.as_str()
        ],
    )?;
    Ok(n)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
