//! Match document store backed by `SQLite`.
//!
//! Each match is one JSON document keyed by its code, holding the innings list
//! and each innings' append-only event log. Running totals are kept on the
//! innings and recomputed by replaying the log from scratch on undo. This is a
//! separate undo strategy from the in-memory snapshot history; the two agree
//! on score, wickets and balls.
//!
//! # Schema
//!
//! `matches(code TEXT PRIMARY KEY, doc TEXT, created_at TEXT, updated_at TEXT)`

use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{MatchStatus, TossDecision};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS matches (
    code        TEXT PRIMARY KEY,
    doc         TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("match {0} not found")]
    NotFound(String),
    #[error("match code {0} already exists")]
    Duplicate(String),
    #[error("no events to undo")]
    NothingToUndo,
    #[error("match {0} is finished")]
    Finished(String),
    #[error("stored match {0} has no open innings")]
    Corrupt(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Run,
    Boundary,
    Six,
    Wide,
    #[serde(rename = "noball")]
    NoBall,
    Bye,
    #[serde(rename = "legbye")]
    LegBye,
    Wicket,
    Retire,
    OverEnd,
    InningsEnd,
    MatchEnd,
}

impl EventType {
    /// Bookkeeping events that carry no delivery of their own.
    pub fn is_marker(self) -> bool {
        matches!(self, EventType::OverEnd | EventType::InningsEnd | EventType::MatchEnd)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let raw = serde_json::to_value(self).ok();
        write!(f, "{}", raw.as_ref().and_then(Value::as_str).unwrap_or("unknown"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRequest {
    pub name: String,
    pub players: Vec<PlayerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TossRequest {
    /// Team name of the toss winner.
    pub winner: String,
    pub decision: TossDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    pub code: String,
    pub team_a: TeamRequest,
    pub team_b: TeamRequest,
    pub overs_limit: u32,
    pub toss: TossRequest,
    #[serde(default)]
    pub striker_id: Option<String>,
    #[serde(default)]
    pub non_striker_id: Option<String>,
    #[serde(default)]
    pub bowler_id: Option<String>,
}

impl CreateMatchRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        let code_len = self.code.chars().count();
        if !(3..=8).contains(&code_len) {
            problems.push("code must be 3-8 characters".to_string());
        }
        for (label, team) in [("team_a", &self.team_a), ("team_b", &self.team_b)] {
            if team.name.trim().is_empty() {
                problems.push(format!("{label}.name must not be empty"));
            }
            if team.players.is_empty() {
                problems.push(format!("{label}.players must have at least one player"));
            }
            if team.players.iter().any(|p| p.name.trim().is_empty()) {
                problems.push(format!("{label}.players must have non-empty names"));
            }
        }
        if !(1..=50).contains(&self.overs_limit) {
            problems.push("overs_limit must be between 1 and 50".to_string());
        }
        if problems.is_empty() { Ok(()) } else { Err(problems) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub payload: Value,
    pub at_ball_index: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub score: u32,
    pub wickets: u32,
    pub balls: u32,
}

impl Totals {
    pub fn apply(&mut self, event_type: EventType, payload: &Value) {
        match event_type {
            EventType::Run => {
                self.score += payload_u32(payload, "runs", 0);
                self.balls += 1;
            }
            EventType::Boundary => {
                self.score += 4;
                self.balls += 1;
            }
            EventType::Six => {
                self.score += 6;
                self.balls += 1;
            }
            EventType::Wide => self.score += payload_u32(payload, "runs", 1),
            EventType::NoBall => {
                self.score += payload_u32(payload, "extra", 1) + payload_u32(payload, "batRuns", 0);
            }
            EventType::Bye | EventType::LegBye => {
                self.score += payload_u32(payload, "runs", 0);
                self.balls += 1;
            }
            EventType::Wicket => {
                self.wickets += 1;
                self.balls += 1;
            }
            EventType::Retire | EventType::OverEnd | EventType::InningsEnd | EventType::MatchEnd => {}
        }
    }
}

/// Totals from scratch over an innings' events.
pub fn replay(events: &[StoredEvent]) -> Totals {
    let mut totals = Totals::default();
    for ev in events {
        totals.apply(ev.event_type, &ev.payload);
    }
    totals
}

fn payload_u32(payload: &Value, key: &str, default: u32) -> u32 {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInnings {
    pub batting_team: String,
    pub bowling_team: String,
    pub overs_limit: u32,
    #[serde(default)]
    pub target: u32,
    #[serde(default)]
    pub striker_id: Option<String>,
    #[serde(default)]
    pub non_striker_id: Option<String>,
    #[serde(default)]
    pub bowler_id: Option<String>,
    #[serde(default)]
    pub events: Vec<StoredEvent>,
    #[serde(flatten)]
    pub totals: Totals,
}

impl StoredInnings {
    fn new(batting_team: String, bowling_team: String, overs_limit: u32, target: u32) -> Self {
        Self {
            batting_team,
            bowling_team,
            overs_limit,
            target,
            striker_id: None,
            non_striker_id: None,
            bowler_id: None,
            events: Vec::new(),
            totals: Totals::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub code: String,
    pub team_a: TeamRequest,
    pub team_b: TeamRequest,
    pub toss: TossRequest,
    pub status: MatchStatus,
    pub innings_index: usize,
    pub innings: Vec<StoredInnings>,
    #[serde(default)]
    pub result: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredMatch {
    pub fn current_innings(&self) -> Option<&StoredInnings> {
        self.innings.get(self.innings_index)
    }
}

pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Opens (or creates) the database; `:memory:` gives a private in-memory store.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn create_match(&self, req: &CreateMatchRequest) -> Result<StoredMatch, StoreError> {
        let conn = self.conn.lock().unwrap();
        if load(&conn, &req.code)?.is_some() {
            return Err(StoreError::Duplicate(req.code.clone()));
        }

        let winner_is_a = req.toss.winner == req.team_a.name;
        let bats = req.toss.decision == TossDecision::Bat;
        let (batting, bowling) = if winner_is_a == bats {
            (&req.team_a.name, &req.team_b.name)
        } else {
            (&req.team_b.name, &req.team_a.name)
        };

        let mut first = StoredInnings::new(batting.clone(), bowling.clone(), req.overs_limit, 0);
        first.striker_id = req.striker_id.clone();
        first.non_striker_id = req.non_striker_id.clone();
        first.bowler_id = req.bowler_id.clone();

        let now = now();
        let doc = StoredMatch {
            code: req.code.clone(),
            team_a: req.team_a.clone(),
            team_b: req.team_b.clone(),
            toss: req.toss.clone(),
            status: MatchStatus::Live,
            innings_index: 0,
            innings: vec![first],
            result: None,
            created_at: now.clone(),
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO matches (code, doc, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![doc.code, serde_json::to_string(&doc)?, doc.created_at, doc.updated_at],
        )?;
        tracing::info!(code = %doc.code, batting = %batting, "stored match created");
        Ok(doc)
    }

    pub fn fetch_by_code(&self, code: &str) -> Result<Option<StoredMatch>, StoreError> {
        let conn = self.conn.lock().unwrap();
        load(&conn, code)
    }

    pub fn append_event(
        &self,
        code: &str,
        event_type: EventType,
        payload: Value,
    ) -> Result<StoredMatch, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut doc = load(&conn, code)?.ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        if doc.status == MatchStatus::Finished {
            return Err(StoreError::Finished(code.to_string()));
        }

        let idx = doc.innings_index;
        let inn = doc
            .innings
            .get_mut(idx)
            .ok_or_else(|| StoreError::Corrupt(code.to_string()))?;
        let at_ball_index = inn.totals.balls;
        inn.totals.apply(event_type, &payload);
        inn.events.push(StoredEvent {
            event_type,
            payload: payload.clone(),
            at_ball_index,
            created_at: now(),
        });

        match event_type {
            EventType::InningsEnd => {
                let target = payload_u32(&payload, "target", inn.totals.score + 1);
                let next = StoredInnings::new(
                    inn.bowling_team.clone(),
                    inn.batting_team.clone(),
                    inn.overs_limit,
                    target,
                );
                doc.innings.push(next);
                doc.innings_index += 1;
            }
            EventType::MatchEnd => {
                doc.status = MatchStatus::Finished;
                doc.result = payload.get("result").and_then(Value::as_str).map(str::to_string);
            }
            _ => {}
        }

        save(&conn, &mut doc)?;
        tracing::debug!(code, event = %event_type, "event appended");
        Ok(doc)
    }

    /// Removes the last delivery-level event (plus any markers logged after it)
    /// and recomputes the innings totals by replay.
    pub fn undo_last_event(&self, code: &str) -> Result<StoredMatch, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut doc = load(&conn, code)?.ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        let mut removed = false;
        loop {
            let idx = doc.innings_index;
            let Some(inn) = doc.innings.get_mut(idx) else {
                return Err(StoreError::Corrupt(code.to_string()));
            };
            let Some(last) = inn.events.pop() else {
                if idx == 0 {
                    break;
                }
                // empty innings opened by an inningsEnd marker: reopen the previous one
                doc.innings.pop();
                doc.innings_index -= 1;
                continue;
            };
            match last.event_type {
                EventType::MatchEnd => {
                    doc.status = MatchStatus::Live;
                    doc.result = None;
                }
                EventType::OverEnd | EventType::InningsEnd => {}
                _ => {
                    removed = true;
                    break;
                }
            }
        }
        if !removed {
            return Err(StoreError::NothingToUndo);
        }

        let idx = doc.innings_index;
        if let Some(inn) = doc.innings.get_mut(idx) {
            inn.totals = replay(&inn.events);
        }
        save(&conn, &mut doc)?;
        tracing::debug!(code, "event undone");
        Ok(doc)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn load(conn: &Connection, code: &str) -> Result<Option<StoredMatch>, StoreError> {
    let raw: Option<String> = conn
        .query_row("SELECT doc FROM matches WHERE code = ?1", params![code], |row| row.get(0))
        .optional()?;
    match raw {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

fn save(conn: &Connection, doc: &mut StoredMatch) -> Result<(), StoreError> {
    doc.updated_at = now();
    conn.execute(
        "UPDATE matches SET doc = ?2, updated_at = ?3 WHERE code = ?1",
        params![doc.code, serde_json::to_string(&*doc)?, doc.updated_at],
    )?;
    Ok(())
}
