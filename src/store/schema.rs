pub const SCHEMA: &str = r#"
-- Workspace memberships, one row per (user, workspace)
CREATE TABLE IF NOT EXISTS memberships (
    user_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    role TEXT,                 -- NULL = default role
    joined_at,                 -- RFC 3339 text or epoch seconds
    PRIMARY KEY (user_id, client_id)
);

CREATE INDEX IF NOT EXISTS idx_memberships_client ON memberships(client_id);

-- Workspace profile documents (plan, subscription, entitlements) as JSON
CREATE TABLE IF NOT EXISTS clients (
    id TEXT PRIMARY KEY,
    document TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT DEFAULT (datetime('now'))
);
"#;
