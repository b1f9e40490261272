/// Schema for the pipeline database.
///
/// Embedding vectors are little-endian f32 blobs; `phase_embeddings` holds
/// at most one row per phase, `embedding_cache` memoizes query embeddings
/// by content hash.
pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    owner       TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS phases (
    id              TEXT PRIMARY KEY,
    project_id      TEXT NOT NULL REFERENCES projects(id),
    phase_number    INTEGER NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT,
    prompt_template TEXT,
    user_input      TEXT,
    ai_response     TEXT,
    status          TEXT NOT NULL DEFAULT 'not_started',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE(project_id, phase_number)
);

CREATE TABLE IF NOT EXISTS phase_drafts (
    id          TEXT PRIMARY KEY,
    phase_id    TEXT NOT NULL REFERENCES phases(id),
    version     INTEGER NOT NULL,
    content     TEXT NOT NULL,
    user_input  TEXT,
    ai_response TEXT,
    created_at  TEXT NOT NULL,
    UNIQUE(phase_id, version)
);

CREATE TABLE IF NOT EXISTS phase_embeddings (
    phase_id   TEXT PRIMARY KEY REFERENCES phases(id),
    content    TEXT NOT NULL,
    model      TEXT NOT NULL,
    dims       INTEGER NOT NULL,
    vec        BLOB NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS embedding_cache (
    key        TEXT PRIMARY KEY,
    model      TEXT NOT NULL,
    dims       INTEGER NOT NULL,
    vec        BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_phases_project ON phases(project_id, phase_number);
CREATE INDEX IF NOT EXISTS idx_drafts_phase ON phase_drafts(phase_id, version);
"#;
