//! Persistent SQLite store for per-group search settings.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Search settings for one group chat.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConfig {
    pub id: i64,
    pub group_id: String,
    pub enabled: bool,
    pub use_global_tags: bool,
    pub custom_tags: Vec<String>,
}

/// Process-wide defaults applied when a group is first seen.
#[derive(Debug, Clone, Copy)]
pub struct GroupDefaults {
    pub enabled: bool,
    pub use_global_tags: bool,
}

/// Partial update for a group row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct GroupPatch {
    pub enabled: Option<bool>,
    pub use_global_tags: Option<bool>,
    pub custom_tags: Option<Vec<String>>,
}

/// Persistent SQLite store, one row per group.
pub struct GroupStore {
    conn: Mutex<Connection>,
}

impl GroupStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema();
        store
    }

    /// Open or create a store at the given path.
    pub fn load_or_new(path: &Path) -> Self {
        let conn = Connection::open(path).expect("Failed to open database");
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema();

        info!("Loaded group store from {:?} ({} group(s))", path, store.group_count());
        store
    }

    fn init_schema(&self) {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS group_config (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id TEXT NOT NULL UNIQUE,
                enabled INTEGER NOT NULL,
                use_global_tags INTEGER NOT NULL,
                custom_tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_group_config_group_id ON group_config(group_id);
            "#,
        )
        .expect("Failed to initialize database schema");
    }

    /// Number of known groups.
    pub fn group_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM group_config", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    /// Look up a group row without creating it.
    pub fn get(&self, group_id: &str) -> Result<Option<GroupConfig>, String> {
        let conn = self.conn.lock().unwrap();
        Self::select(&conn, group_id)
    }

    /// Look up a group row, creating it from defaults when absent.
    ///
    /// Creation is an atomic `INSERT .. ON CONFLICT DO NOTHING` followed by a
    /// re-read, so two racing first-time invocations both end up returning
    /// the single row the winner created.
    pub fn get_or_create(
        &self,
        group_id: &str,
        defaults: GroupDefaults,
    ) -> Result<GroupConfig, String> {
        let conn = self.conn.lock().unwrap();

        if let Some(config) = Self::select(&conn, group_id)? {
            return Ok(config);
        }

        let now = now_timestamp();
        conn.execute(
            "INSERT INTO group_config (group_id, enabled, use_global_tags, custom_tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, '[]', ?4, ?4)
             ON CONFLICT(group_id) DO NOTHING",
            params![group_id, defaults.enabled, defaults.use_global_tags, now],
        )
        .map_err(|e| format!("Failed to create group row: {e}"))?;

        Self::select(&conn, group_id)?
            .ok_or_else(|| format!("Group row missing after create: {group_id}"))
    }

    /// Apply a partial update to a group row.
    ///
    /// The row is created from defaults first when absent, so updating a
    /// never-seen group does not silently no-op.
    pub fn update(
        &self,
        group_id: &str,
        patch: GroupPatch,
        defaults: GroupDefaults,
    ) -> Result<GroupConfig, String> {
        let current = self.get_or_create(group_id, defaults)?;

        let enabled = patch.enabled.unwrap_or(current.enabled);
        let use_global_tags = patch.use_global_tags.unwrap_or(current.use_global_tags);
        let custom_tags = match patch.custom_tags {
            Some(tags) => clean_tags(tags),
            None => current.custom_tags,
        };

        let tags_json = serde_json::to_string(&custom_tags)
            .map_err(|e| format!("Failed to encode tags: {e}"))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE group_config
             SET enabled = ?2, use_global_tags = ?3, custom_tags = ?4, updated_at = ?5
             WHERE group_id = ?1",
            params![group_id, enabled, use_global_tags, tags_json, now_timestamp()],
        )
        .map_err(|e| format!("Failed to update group row: {e}"))?;

        Ok(GroupConfig {
            id: current.id,
            group_id: current.group_id,
            enabled,
            use_global_tags,
            custom_tags,
        })
    }

    fn select(conn: &Connection, group_id: &str) -> Result<Option<GroupConfig>, String> {
        conn.query_row(
            "SELECT id, group_id, enabled, use_global_tags, custom_tags
             FROM group_config WHERE group_id = ?1",
            params![group_id],
            |row| {
                let tags_json: String = row.get(4)?;
                Ok(GroupConfig {
                    id: row.get(0)?,
                    group_id: row.get(1)?,
                    enabled: row.get(2)?,
                    use_global_tags: row.get(3)?,
                    custom_tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(|e| format!("Failed to read group row: {e}"))
    }
}

impl Default for GroupStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop empty tags and duplicates, preserving first-occurrence order.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || seen.iter().any(|s| s == tag) {
            continue;
        }
        seen.push(tag.to_string());
    }
    seen
}

fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: GroupDefaults = GroupDefaults { enabled: true, use_global_tags: true };

    #[test]
    fn test_get_or_create_applies_defaults() {
        let store = GroupStore::new();
        let config = store.get_or_create("-100123", DEFAULTS).unwrap();

        assert_eq!(config.group_id, "-100123");
        assert!(config.enabled);
        assert!(config.use_global_tags);
        assert!(config.custom_tags.is_empty());

        let disabled = GroupDefaults { enabled: false, use_global_tags: false };
        let other = store.get_or_create("-100456", disabled).unwrap();
        assert!(!other.enabled);
        assert!(!other.use_global_tags);
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = GroupStore::new();
        let first = store.get_or_create("-100123", DEFAULTS).unwrap();
        let second = store.get_or_create("-100123", DEFAULTS).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.group_count(), 1);
    }

    #[test]
    fn test_defaults_apply_only_at_creation() {
        let store = GroupStore::new();
        store.get_or_create("-100123", DEFAULTS).unwrap();

        // A later call with different defaults must not mutate the row.
        let flipped = GroupDefaults { enabled: false, use_global_tags: false };
        let config = store.get_or_create("-100123", flipped).unwrap();
        assert!(config.enabled);
        assert!(config.use_global_tags);
    }

    #[test]
    fn test_update_partial_fields() {
        let store = GroupStore::new();
        store.get_or_create("-100123", DEFAULTS).unwrap();

        let config = store
            .update("-100123", GroupPatch { enabled: Some(false), ..Default::default() }, DEFAULTS)
            .unwrap();
        assert!(!config.enabled);
        assert!(config.use_global_tags);

        let config = store
            .update(
                "-100123",
                GroupPatch { use_global_tags: Some(false), ..Default::default() },
                DEFAULTS,
            )
            .unwrap();
        assert!(!config.enabled);
        assert!(!config.use_global_tags);
    }

    #[test]
    fn test_update_creates_missing_row() {
        let store = GroupStore::new();
        let config = store
            .update(
                "-100999",
                GroupPatch { custom_tags: Some(vec!["pony".into()]), ..Default::default() },
                DEFAULTS,
            )
            .unwrap();

        assert_eq!(config.custom_tags, vec!["pony"]);
        assert!(config.enabled);
        assert_eq!(store.group_count(), 1);
    }

    #[test]
    fn test_update_deduplicates_tags() {
        let store = GroupStore::new();
        let config = store
            .update(
                "-100123",
                GroupPatch {
                    custom_tags: Some(vec![
                        "a".into(),
                        "b".into(),
                        "a".into(),
                        "".into(),
                        "  ".into(),
                    ]),
                    ..Default::default()
                },
                DEFAULTS,
            )
            .unwrap();

        assert_eq!(config.custom_tags, vec!["a", "b"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.db");

        {
            let store = GroupStore::load_or_new(&path);
            store
                .update(
                    "-100123",
                    GroupPatch {
                        enabled: Some(false),
                        custom_tags: Some(vec!["safe".into()]),
                        ..Default::default()
                    },
                    DEFAULTS,
                )
                .unwrap();
        }

        let store = GroupStore::load_or_new(&path);
        let config = store.get("-100123").unwrap().unwrap();
        assert!(!config.enabled);
        assert_eq!(config.custom_tags, vec!["safe"]);
    }
}
