use anyhow::Context;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod characters;
pub mod messages;
pub mod portrait;
pub mod profile;
pub mod reply;
pub mod router;
pub mod session;
pub mod thread;
pub mod window;

pub use characters::{
    character_by_id, character_for_avatar, characters, characters_by_gender, Character,
};
pub use portrait::{resolve_portrait, Portrait, PortraitStage};
pub use profile::{MemoryProfileStore, PlayerProfile, ProfileError, ProfileStore};
pub use reply::{fallback_reply, BackendError, OpenAiBackend, ReplyBackend};
pub use router::ChatRouter;
pub use session::SessionGenderOverride;
pub use thread::{
    ChatError, ChatThread, ChatTransport, HttpChatTransport, TransportError, TurnOutcome,
    TurnState,
};
pub use window::{classify_window, BusinessHours, Clock, FixedClock, SystemClock};

use allianceforge_protocol::ChatMessage;
use messages::now_ms;

/// SQLite-backed persistence: the commander profile and the chat transcript.
#[derive(Debug, Clone)]
pub struct Engine {
    db_path: PathBuf,
}

impl Engine {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> anyhow::Result<Connection> {
        let path = self.db_path.clone();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create db dir: {}", dir.display()))?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite db: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrate(&conn)?;
        Ok(conn)
    }

    /// Stores one routed exchange: the user's message and the reply it got.
    pub fn record_exchange(
        &self,
        user: &ChatMessage,
        reply: &ChatMessage,
        timezone: &str,
        is_business_window: bool,
    ) -> anyhow::Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for msg in [user, reply] {
            insert_chat_message(&tx, msg, timezone, is_business_window)?;
        }
        append_event_tx(
            &tx,
            if is_business_window {
                "chat.queued"
            } else {
                "chat.answered"
            },
            serde_json::json!({ "user_id": user.id, "reply_id": reply.id, "timezone": timezone }),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// The most recent `limit` transcript rows, oldest first.
    pub fn list_chat_log(&self, limit: usize) -> anyhow::Result<Vec<ChatLogEntry>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT seq, message_id, sender_kind, display_name, content, timestamp_ms, timezone, business_window
             FROM chat_log ORDER BY seq DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            Ok(ChatLogEntry {
                seq: row.get(0)?,
                message_id: row.get(1)?,
                sender_kind: row.get(2)?,
                display_name: row.get(3)?,
                content: row.get(4)?,
                timestamp_ms: row.get(5)?,
                timezone: row.get(6)?,
                business_window: row.get(7)?,
            })
        })?;
        let mut out: Vec<ChatLogEntry> = rows.filter_map(Result::ok).collect();
        out.reverse();
        Ok(out)
    }

    pub fn get_rev(&self) -> anyhow::Result<i64> {
        let conn = self.open()?;
        let rev: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM event_log", [], |row| row.get(0))?;
        Ok(rev.unwrap_or(0))
    }
}

impl ProfileStore for Engine {
    fn read(&self) -> anyhow::Result<Option<PlayerProfile>> {
        let conn = self.open()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT profile_json FROM player_profile WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).context("decode stored profile"))
            .transpose()
    }

    fn write(&self, profile: &PlayerProfile) -> anyhow::Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let json = serde_json::to_string(profile)?;
        let ts = now_ms();
        tx.execute(
            "INSERT INTO player_profile (id, profile_json, updated_at_ms, rev) VALUES (1, ?1, ?2, 1)
             ON CONFLICT(id) DO UPDATE SET profile_json = excluded.profile_json,
               updated_at_ms = excluded.updated_at_ms, rev = player_profile.rev + 1",
            (&json, ts),
        )?;
        append_event_tx(
            &tx,
            "profile.written",
            serde_json::json!({
                "gender": profile.commander_gender().as_str(),
                "equipped": profile.equipped_count(),
            }),
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLogEntry {
    pub seq: i64,
    pub message_id: String,
    pub sender_kind: String,
    pub display_name: String,
    pub content: String,
    pub timestamp_ms: i64,
    pub timezone: String,
    pub business_window: bool,
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    let v: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if v < 1 {
        conn.execute_batch(
            r#"
-- Monotonic revision source.
CREATE TABLE IF NOT EXISTS event_log (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  ts_ms INTEGER NOT NULL,
  kind TEXT NOT NULL,
  payload_json TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_event_log_kind ON event_log(kind);

-- Single-row table: one commander per install.
CREATE TABLE IF NOT EXISTS player_profile (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  profile_json TEXT NOT NULL,
  updated_at_ms INTEGER NOT NULL,
  rev INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS chat_log (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  message_id TEXT NOT NULL UNIQUE,
  sender_kind TEXT NOT NULL,
  display_name TEXT NOT NULL,
  content TEXT NOT NULL,
  timestamp_ms INTEGER NOT NULL,
  timezone TEXT NOT NULL,
  business_window INTEGER NOT NULL DEFAULT 0
);
"#,
        )?;

        conn.pragma_update(None, "user_version", 1_i64)?;
    }

    Ok(())
}

fn insert_chat_message(
    tx: &rusqlite::Transaction<'_>,
    msg: &ChatMessage,
    timezone: &str,
    is_business_window: bool,
) -> anyhow::Result<()> {
    let kind = serde_json::to_value(msg.sender_kind)?
        .as_str()
        .unwrap_or_default()
        .to_string();
    tx.execute(
        "INSERT INTO chat_log (message_id, sender_kind, display_name, content, timestamp_ms, timezone, business_window)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &msg.id,
            &kind,
            &msg.display_name,
            &msg.content,
            msg.timestamp,
            timezone,
            is_business_window,
        ),
    )?;
    Ok(())
}

fn append_event_tx(
    tx: &rusqlite::Transaction<'_>,
    kind: &str,
    payload: serde_json::Value,
) -> anyhow::Result<i64> {
    let ts = now_ms();
    let payload_json = payload.to_string();
    tx.execute(
        "INSERT INTO event_log (ts_ms, kind, payload_json) VALUES (?1, ?2, ?3)",
        (ts, kind, payload_json),
    )?;
    Ok(tx.last_insert_rowid())
}
