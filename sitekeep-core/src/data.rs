use crate::model::{ArchivedPage, BookmarkNode, NodeType};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::path::Path;

/// SQLite-backed bookmark tree and archive store.
pub struct Database {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) {
        fs::remove_file(path).unwrap();
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Bookmark tree
            CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER,
    name TEXT NOT NULL,
    uri TEXT,
    icon TEXT,
    node_type TEXT NOT NULL CHECK(node_type IN ('folder', 'archive')),
    added_at INTEGER NOT NULL,
    capture_options TEXT,     -- JSON settings the site was captured with

    FOREIGN KEY(parent_id) REFERENCES nodes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);
CREATE INDEX IF NOT EXISTS idx_nodes_uri ON nodes(uri);

-- Captured page content, one blob per archive node
CREATE TABLE IF NOT EXISTS archives (
    node_id INTEGER PRIMARY KEY,
    content BLOB NOT NULL,
    content_type TEXT NOT NULL,
    byte_size INTEGER NOT NULL,
    stored_at INTEGER NOT NULL,

    FOREIGN KEY(node_id) REFERENCES nodes(id) ON DELETE CASCADE
);
            ",
        )?;
        Ok(())
    }

    // Tree operations

    pub fn add_folder(&self, parent_id: Option<i64>, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO nodes (parent_id, name, node_type, added_at) VALUES (?1, ?2, ?3, ?4)",
            params![parent_id, name, NodeType::Folder.as_str(), current_timestamp()],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_archive_node(
        &self,
        parent_id: Option<i64>,
        name: &str,
        uri: &str,
        icon: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO nodes (parent_id, name, uri, icon, node_type, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                parent_id,
                name,
                uri,
                icon,
                NodeType::Archive.as_str(),
                current_timestamp()
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_node(&self, id: i64) -> Result<Option<BookmarkNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, name, uri, icon, node_type, added_at FROM nodes WHERE id = ?1",
        )?;

        let node = stmt
            .query_row(params![id], |row| {
                Ok(BookmarkNode {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    name: row.get(2)?,
                    uri: row.get(3)?,
                    icon: row.get(4)?,
                    node_type: NodeType::from_str(&row.get::<_, String>(5)?)
                        .unwrap_or(NodeType::Archive),
                    added_at: row.get(6)?,
                })
            })
            .optional()?;

        Ok(node)
    }

    pub fn children_of(&self, parent_id: i64) -> Result<Vec<BookmarkNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_id, name, uri, icon, node_type, added_at
             FROM nodes WHERE parent_id = ?1 ORDER BY id",
        )?;

        let nodes = stmt
            .query_map(params![parent_id], |row| {
                Ok(BookmarkNode {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    name: row.get(2)?,
                    uri: row.get(3)?,
                    icon: row.get(4)?,
                    node_type: NodeType::from_str(&row.get::<_, String>(5)?)
                        .unwrap_or(NodeType::Archive),
                    added_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(nodes)
    }

    /// Remembers the settings a site folder was captured with, so a later
    /// re-capture can start from them.
    pub fn set_capture_options(&self, node_id: i64, options_json: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE nodes SET capture_options = ?1 WHERE id = ?2",
            params![options_json, node_id],
        )?;
        Ok(())
    }

    pub fn capture_options(&self, node_id: i64) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT capture_options FROM nodes WHERE id = ?1")?;

        let options = stmt
            .query_row(params![node_id], |row| row.get::<_, Option<String>>(0))
            .optional()?;

        Ok(options.flatten())
    }

    /// Top-level folders with the number of archive nodes under each, for
    /// the `list` command.
    pub fn site_folders(&self) -> Result<Vec<(i64, String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.name, COUNT(a.id)
             FROM nodes f
             LEFT JOIN nodes a ON a.parent_id = f.id AND a.node_type = 'archive'
             WHERE f.node_type = 'folder' AND f.parent_id IS NULL
             GROUP BY f.id, f.name
             ORDER BY f.id",
        )?;

        let folders = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(folders)
    }

    // Archive content operations

    pub fn store_archive(&self, node_id: i64, content: &[u8], content_type: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO archives (node_id, content, content_type, byte_size, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                node_id,
                content,
                content_type,
                content.len() as i64,
                current_timestamp()
            ],
        )?;

        Ok(())
    }

    pub fn get_archive(&self, node_id: i64) -> Result<Option<(Vec<u8>, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT content, content_type FROM archives WHERE node_id = ?1")?;

        let archive = stmt
            .query_row(params![node_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        Ok(archive)
    }

    /// All archived pages under a folder, joined with their stored content
    /// metadata.
    pub fn archived_pages(&self, folder_id: i64) -> Result<Vec<ArchivedPage>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.name, n.uri, a.content_type, a.byte_size
             FROM nodes n
             JOIN archives a ON a.node_id = n.id
             WHERE n.parent_id = ?1 AND n.node_type = 'archive'
             ORDER BY n.id",
        )?;

        let pages = stmt
            .query_map(params![folder_id], |row| {
                Ok(ArchivedPage {
                    node_id: row.get(0)?,
                    name: row.get(1)?,
                    uri: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    content_type: row.get(3)?,
                    byte_size: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(pages)
    }

    pub fn node_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
    }

    pub fn archive_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM archives", [], |row| row.get(0))
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
