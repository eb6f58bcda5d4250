use crate::model::NodeId;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::path::Path;

/// Durable crawl state: the visited set and the pending work queue.
pub struct Database {
    conn: Connection,
}

/// A node that has been taken off the queue for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedRecord {
    pub node_id: NodeId,
    pub first_seen: DateTime<Utc>,
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

impl Database {
    /// Removes the database file along with any WAL sidecar files.
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            match fs::remove_file(&sidecar) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Every committed push/pop must survive a crash of the process.
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS visited (
                node_id TEXT PRIMARY KEY,
                first_seen INTEGER NOT NULL
            );

            -- AUTOINCREMENT keeps ids monotonic, so id order is enqueue order
            -- even after the tail of the queue has been drained.
            CREATE TABLE IF NOT EXISTS queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id TEXT NOT NULL,
                enqueued_at INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    pub fn visited(&self) -> VisitedSet<'_> {
        VisitedSet { conn: &self.conn }
    }

    pub fn queue(&self) -> WorkQueue<'_> {
        WorkQueue { conn: &self.conn }
    }

    /// Pops the next queue entry and marks it visited in one transaction.
    /// The flag is true when this call claimed the node, false when it had
    /// already been visited.
    pub fn claim_next(&self) -> Result<Option<(NodeId, bool)>> {
        let tx = self.conn.unchecked_transaction()?;
        let claimed = match (WorkQueue { conn: &tx }).pop_front()? {
            Some(id) => {
                let fresh = VisitedSet { conn: &tx }.mark_visited(&id)?;
                Some((id, fresh))
            }
            None => None,
        };
        tx.commit()?;
        Ok(claimed)
    }
}

/// Monotonic set of processed node ids. There is no removal.
pub struct VisitedSet<'a> {
    conn: &'a Connection,
}

impl VisitedSet<'_> {
    pub fn has(&self, id: &NodeId) -> Result<bool> {
        self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM visited WHERE node_id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )
    }

    /// Atomic check-and-insert. Returns true only for the caller that
    /// actually inserted the record; that caller owns processing of `id`.
    pub fn mark_visited(&self, id: &NodeId) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO visited (node_id, first_seen) VALUES (?1, ?2)",
            params![id.as_str(), current_timestamp()],
        )?;
        Ok(inserted == 1)
    }

    pub fn record(&self, id: &NodeId) -> Result<Option<VisitedRecord>> {
        let first_seen: Option<i64> = self
            .conn
            .query_row(
                "SELECT first_seen FROM visited WHERE node_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(first_seen.map(|ts| VisitedRecord {
            node_id: id.clone(),
            first_seen: DateTime::from_timestamp(ts, 0).unwrap_or_default(),
        }))
    }

    pub fn len(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM visited", [], |row| row.get(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Durable FIFO of pending node ids. Duplicates are allowed; consumers
/// filter already-visited ids on pop.
pub struct WorkQueue<'a> {
    conn: &'a Connection,
}

impl WorkQueue<'_> {
    /// Appends `ids` in input order as one transaction.
    pub fn push_all(&self, ids: &[NodeId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO queue (node_id, enqueued_at) VALUES (?1, ?2)")?;
            let timestamp = current_timestamp();
            for id in ids {
                stmt.execute(params![id.as_str(), timestamp])?;
            }
        }
        tx.commit()?;

        Ok(ids.len())
    }

    pub fn push(&self, id: &NodeId) -> Result<()> {
        self.push_all(std::slice::from_ref(id)).map(|_| ())
    }

    /// Removes and returns the earliest-enqueued entry in a single statement.
    pub fn pop_front(&self) -> Result<Option<NodeId>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "DELETE FROM queue WHERE id = (SELECT MIN(id) FROM queue) RETURNING node_id",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(NodeId::from))
    }

    pub fn len(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
