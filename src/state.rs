use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tokio::sync::watch;

use crate::config::{Config, MirrorMode};
use crate::mirror::Mirror;
use crate::scoring::ScoringError;
use crate::session::{self, Applied, Prompt, Session, SetupError};
use crate::store::EventStore;
use crate::transition::Transition;
use crate::types::{Action, Match, MatchSetup};

#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub ts: String,
    pub kind: String,
    pub detail: String,
}

pub struct AppState {
    pub config: Config,
    pub session: RwLock<Option<Session>>,
    pub events: Mutex<VecDeque<EventEntry>>,
    pub store: Arc<EventStore>,
    pub mirror: Mirror,
    cache_tx: watch::Sender<Option<Match>>,
}

const MAX_EVENTS: usize = 200;
const CODE_ATTEMPTS: usize = 8;

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<EventStore>,
        mirror: Mirror,
        cache_tx: watch::Sender<Option<Match>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            session: RwLock::new(None),
            events: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            store,
            mirror,
            cache_tx,
        })
    }

    pub fn push_event(&self, kind: &str, detail: &str) {
        let entry = EventEntry {
            ts: chrono::Utc::now().format("%H:%M:%S").to_string(),
            kind: kind.to_string(),
            detail: detail.to_string(),
        };
        let mut events = self.events.lock().unwrap();
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(entry);
    }

    /// Starts a new live match. With the local mirror, a code already held by
    /// the store is rejected and a generated code is drawn until it is free.
    pub fn start_match(&self, mut setup: MatchSetup) -> Result<Match, SetupError> {
        if self.config.mirror_mode == MirrorMode::Local {
            setup.code = Some(self.free_code(setup.code.take())?);
        }
        let session = Session::start(setup)?;
        let m = session.current().clone();
        {
            let mut guard = self.session.write().unwrap();
            self.mirror.send(session.create_command());
            *guard = Some(session);
            self.publish(Some(&m));
        }
        self.push_event(
            "match",
            &format!(
                "{} v {} ({} overs), code {}",
                m.team_a.name, m.team_b.name, m.overs, m.id
            ),
        );
        Ok(m)
    }

    fn free_code(&self, requested: Option<String>) -> Result<String, SetupError> {
        let taken = |code: &str| match self.store.fetch_by_code(code) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(code, error = %e, "match code lookup failed");
                false
            }
        };
        match requested {
            Some(code) => {
                let code = code.trim().to_uppercase();
                if taken(&code) {
                    return Err(SetupError::Invalid(vec![format!("code {code} is already in use")]));
                }
                Ok(code)
            }
            None => (0..CODE_ATTEMPTS)
                .map(|_| session::generate_code())
                .find(|code| !taken(code))
                .ok_or_else(|| SetupError::Invalid(vec!["no free match code".to_string()])),
        }
    }

    /// Picks up a cached live match after a restart. Nothing is mirrored.
    pub fn resume(&self, m: Match) {
        self.push_event("match", &format!("resumed {} at {}/{}", m.id, m.score, m.wickets));
        *self.session.write().unwrap() = Some(Session::resume(m));
    }

    pub fn apply(&self, action: Action) -> Result<Applied, ScoringError> {
        // Mirror and cache are fed under the write lock so they see actions in
        // the order the session applied them.
        let (applied, m) = {
            let mut guard = self.session.write().unwrap();
            let session = guard.as_mut().ok_or(ScoringError::NoMatch)?;
            let applied = session.apply(action)?;
            let m = session.current().clone();
            self.mirror.send_all(applied.commands.iter().cloned());
            self.publish(Some(&m));
            (applied, m)
        };

        let detail = if applied.undone {
            format!("undo -> {}/{} ({} balls)", m.score, m.wickets, m.total_balls)
        } else {
            format!("{}/{} ({} balls)", m.score, m.wickets, m.total_balls)
        };
        self.push_event("score", &detail);
        match &applied.transition {
            Transition::InningsBreak { target } => {
                self.push_event("innings", &format!("innings break, target {target}"));
            }
            Transition::MatchFinished { result } => self.push_event("result", result),
            Transition::None => {}
        }
        Ok(applied)
    }

    /// Runs an operator selection against the live session and publishes the result.
    pub fn select<F>(&self, kind: &str, f: F) -> Result<Match, ScoringError>
    where
        F: FnOnce(&mut Session) -> Result<(), ScoringError>,
    {
        let m = {
            let mut guard = self.session.write().unwrap();
            let session = guard.as_mut().ok_or(ScoringError::NoMatch)?;
            f(session)?;
            let m = session.current().clone();
            self.publish(Some(&m));
            m
        };
        self.push_event(kind, "selection applied");
        Ok(m)
    }

    pub fn snapshot(&self) -> Option<Match> {
        self.session.read().unwrap().as_ref().map(|s| s.current().clone())
    }

    pub fn pending(&self) -> Vec<Prompt> {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.pending().to_vec())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        {
            let mut guard = self.session.write().unwrap();
            *guard = None;
            self.publish(None);
        }
        self.events.lock().unwrap().clear();
    }

    /// Hands the state (history omitted) to the debounced cache writer.
    fn publish(&self, m: Option<&Match>) {
        self.cache_tx.send_replace(m.map(Match::without_history));
    }
}
