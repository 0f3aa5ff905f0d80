//! One live scoring session: the caller around the pure reducer.
//!
//! Every scoring action runs process → evaluate transition → derive prompts,
//! and produces the event-log commands to mirror. Operator selections (openers,
//! incoming batter, next bowler) edit the live state directly and are not
//! undoable on their own.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::history;
use crate::mirror::MirrorCommand;
use crate::scoring::{self, NextBatter, ScoringError};
use crate::state::AppState;
use crate::store::{CreateMatchRequest, EventType, PlayerRef, TeamRequest, TossRequest};
use crate::transition::{self, Transition};
use crate::types::{
    Action, BallAction, CricketSignal, ExtraType, Match, MatchSetup, MatchStatus, Squad, Team,
    BALLS_PER_OVER,
};

const CODE_LEN: usize = 6;

/// Operator input the session is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "candidates", rename_all = "snake_case")]
pub enum Prompt {
    Openers,
    NextBatter(Vec<String>),
    NextBowler,
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prompt::Openers => write!(f, "choose openers and bowler"),
            Prompt::NextBatter(c) => write!(f, "choose next batter ({} candidates)", c.len()),
            Prompt::NextBowler => write!(f, "choose next bowler"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("invalid match setup")]
    Invalid(Vec<String>),
}

impl SetupError {
    pub fn details(&self) -> &[String] {
        match self {
            SetupError::Invalid(d) => d,
        }
    }
}

/// What one applied action did.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub commands: Vec<MirrorCommand>,
    pub transition: Transition,
    pub over_complete: bool,
    /// True when the action was an undo.
    pub undone: bool,
}

pub struct Session {
    current: Match,
    pending: Vec<Prompt>,
}

pub fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Matches a player by id first, then by exact name.
fn resolve(squad: &Squad, key: &str) -> Option<String> {
    let key = key.trim();
    squad
        .player(key)
        .or_else(|| squad.players.iter().find(|p| p.name == key))
        .map(|p| p.id.clone())
}

impl Session {
    pub fn start(setup: MatchSetup) -> Result<Self, SetupError> {
        let mut problems = Vec::new();

        let name_a = setup.team_a.name.trim();
        let name_b = setup.team_b.name.trim();
        if name_a.is_empty() || name_b.is_empty() {
            problems.push("team names must not be empty".to_string());
        } else if name_a.to_lowercase() == name_b.to_lowercase() {
            problems.push("team names must differ".to_string());
        }

        let team_a = Squad::from_names(Team::TeamA, name_a, &setup.team_a.players);
        let team_b = Squad::from_names(Team::TeamB, name_b, &setup.team_b.players);
        for squad in [&team_a, &team_b] {
            if squad.players.len() < 2 {
                problems.push(format!("{} needs at least two players", squad.name));
            }
        }
        if !(1..=50).contains(&setup.overs) {
            problems.push("overs must be between 1 and 50".to_string());
        }

        let code = match setup.code.as_deref().map(str::trim) {
            Some(c) if !(3..=8).contains(&c.chars().count()) => {
                problems.push("code must be 3-8 characters".to_string());
                String::new()
            }
            Some(c) => c.to_uppercase(),
            None => generate_code(),
        };

        let mut m = Match::new(code, team_a, team_b, setup.overs, setup.toss);

        let opener = |key: &Option<String>, team: Team, role: &str, problems: &mut Vec<String>| {
            let key = key.as_deref()?;
            let found = resolve(m.squad(team), key);
            if found.is_none() {
                problems.push(format!("{role} {key} is not in {}", m.team_name(team)));
            }
            found
        };
        let striker = opener(&setup.striker_id, m.batting, "striker", &mut problems);
        let non_striker = opener(&setup.non_striker_id, m.batting, "non-striker", &mut problems);
        let bowler = opener(&setup.bowler_id, m.bowling(), "bowler", &mut problems);
        if striker.is_some() && striker == non_striker {
            problems.push("striker and non-striker must differ".to_string());
        }

        if !problems.is_empty() {
            return Err(SetupError::Invalid(problems));
        }

        m.striker = striker;
        m.non_striker = non_striker;
        m.bowler = bowler;

        tracing::info!(
            code = %m.id,
            batting = %m.team_name(m.batting),
            overs = m.overs,
            "match created"
        );
        Ok(Self::resume(m))
    }

    /// Rebuild a session around a restored state, re-deriving prompts from
    /// empty crease and bowler slots.
    pub fn resume(current: Match) -> Self {
        let pending = derive_prompts(&current);
        Self { current, pending }
    }

    pub fn current(&self) -> &Match {
        &self.current
    }

    pub fn pending(&self) -> &[Prompt] {
        &self.pending
    }

    pub fn create_command(&self) -> MirrorCommand {
        MirrorCommand::Create(create_request(&self.current))
    }

    pub fn apply(&mut self, action: Action) -> Result<Applied, ScoringError> {
        if action == Action::Undo {
            return self.undo();
        }
        if self.current.is_finished() {
            tracing::debug!("action rejected, match finished");
            return Err(ScoringError::MatchFinished);
        }
        if let Some(prompt) = self.pending.first() {
            tracing::debug!(prompt = %prompt, "action rejected, prompt pending");
            return Err(ScoringError::PromptPending(prompt.to_string()));
        }

        let code = self.current.id.clone();
        let mut commands = Vec::new();

        let (candidate, over_complete, dismissal) = match action {
            Action::Ball(ball) => {
                let out = scoring::process_ball(&self.current, ball)?;
                commands.push(ball_command(&code, &ball));
                (out.state, out.over_complete, false)
            }
            Action::Wicket => {
                let out = scoring::process_wicket(&self.current)?;
                commands.push(MirrorCommand::append(&code, EventType::Wicket, json!({})));
                (out.state, out.over_complete, true)
            }
            Action::Retire => {
                let striker = self.current.striker.clone().unwrap_or_default();
                let next = scoring::process_retirement(&self.current)?;
                commands.push(MirrorCommand::append(
                    &code,
                    EventType::Retire,
                    json!({ "playerId": striker }),
                ));
                (next, false, true)
            }
            Action::Undo => return self.undo(),
        };

        if over_complete {
            let over = candidate.total_balls / BALLS_PER_OVER;
            commands.push(MirrorCommand::append(&code, EventType::OverEnd, json!({ "over": over })));
        }

        let evaluation = transition::evaluate_transition(candidate);
        let mut state = evaluation.state;
        let mut pending = Vec::new();

        match &evaluation.transition {
            Transition::InningsBreak { target } => {
                commands.push(MirrorCommand::append(
                    &code,
                    EventType::InningsEnd,
                    json!({ "target": target }),
                ));
                pending.push(Prompt::Openers);
            }
            Transition::MatchFinished { result } => {
                commands.push(MirrorCommand::append(
                    &code,
                    EventType::MatchEnd,
                    json!({ "result": result }),
                ));
            }
            Transition::None => {
                if dismissal {
                    scoring::vacate_dismissed(&mut state);
                    match scoring::next_batter(&state) {
                        NextBatter::Automatic(id) => {
                            tracing::debug!(batter = %id, "last batter in automatically");
                            scoring::fill_vacancy(&mut state, id);
                        }
                        NextBatter::Choose(candidates) => pending.push(Prompt::NextBatter(candidates)),
                        NextBatter::NoneLeft => {}
                    }
                }
                if over_complete {
                    state.bowler = None;
                    pending.push(Prompt::NextBowler);
                }
            }
        }

        tracing::debug!(
            score = state.score,
            wickets = state.wickets,
            balls = state.total_balls,
            pending = pending.len(),
            "action applied"
        );

        self.current = state;
        self.pending = pending;
        Ok(Applied {
            commands,
            transition: evaluation.transition,
            over_complete,
            undone: false,
        })
    }

    fn undo(&mut self) -> Result<Applied, ScoringError> {
        let restored = history::undo(&self.current).ok_or(ScoringError::NothingToUndo)?;
        let code = restored.id.clone();
        self.pending = derive_prompts(&restored);
        self.current = restored;
        Ok(Applied {
            commands: vec![MirrorCommand::Undo { code }],
            transition: Transition::None,
            over_complete: false,
            undone: true,
        })
    }

    /// Sets both batters and the bowler, opening (or re-opening) the innings.
    pub fn set_openers(
        &mut self,
        striker: &str,
        non_striker: &str,
        bowler: &str,
    ) -> Result<(), ScoringError> {
        self.ensure_open()?;
        let striker = self.available_batter(striker)?;
        let non_striker = self.available_batter(non_striker)?;
        if striker == non_striker {
            return Err(ScoringError::InvalidSelection(
                "striker and non-striker must differ".to_string(),
            ));
        }
        let bowler = self.bowler_id(bowler)?;

        let m = &mut self.current;
        m.striker = Some(striker);
        m.non_striker = Some(non_striker);
        m.bowler = Some(bowler);
        if m.status == MatchStatus::Break {
            m.status = MatchStatus::Live;
            tracing::info!(innings = m.innings, target = m.target, "innings started");
        }
        self.pending.clear();
        Ok(())
    }

    /// Sends in the next batter to the vacant crease slot.
    pub fn select_batter(&mut self, player: &str) -> Result<(), ScoringError> {
        self.ensure_open()?;
        let id = self.available_batter(player)?;
        let m = &self.current;
        if m.striker.as_deref() == Some(id.as_str()) || m.non_striker.as_deref() == Some(id.as_str()) {
            return Err(ScoringError::InvalidSelection(format!("{id} is already batting")));
        }
        if !scoring::fill_vacancy(&mut self.current, id.clone()) {
            return Err(ScoringError::InvalidSelection("no vacant crease slot".to_string()));
        }
        tracing::debug!(batter = %id, "batter selected");
        self.pending.retain(|p| !matches!(p, Prompt::NextBatter(_)));
        if self.current.striker.is_none() || self.current.non_striker.is_none() {
            if let NextBatter::Choose(candidates) = scoring::next_batter(&self.current) {
                self.pending.insert(0, Prompt::NextBatter(candidates));
            }
        }
        Ok(())
    }

    pub fn select_bowler(&mut self, player: &str) -> Result<(), ScoringError> {
        self.ensure_open()?;
        let id = self.bowler_id(player)?;
        tracing::debug!(bowler = %id, "bowler selected");
        self.current.bowler = Some(id);
        self.pending.retain(|p| *p != Prompt::NextBowler);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ScoringError> {
        if self.current.is_finished() {
            return Err(ScoringError::MatchFinished);
        }
        Ok(())
    }

    fn available_batter(&self, key: &str) -> Result<String, ScoringError> {
        let squad = self.current.batting_squad();
        let id = resolve(squad, key).ok_or_else(|| ScoringError::UnknownPlayer(key.to_string()))?;
        if squad.player(&id).is_some_and(|p| p.is_out) {
            return Err(ScoringError::InvalidSelection(format!("{id} is out")));
        }
        Ok(id)
    }

    fn bowler_id(&self, key: &str) -> Result<String, ScoringError> {
        resolve(self.current.bowling_squad(), key)
            .ok_or_else(|| ScoringError::UnknownPlayer(key.to_string()))
    }
}

/// Prompts implied by the state alone.
pub fn derive_prompts(m: &Match) -> Vec<Prompt> {
    if m.is_finished() {
        return Vec::new();
    }
    if m.striker.is_none() && m.non_striker.is_none() {
        return vec![Prompt::Openers];
    }
    let mut pending = Vec::new();
    if m.striker.is_none() || m.non_striker.is_none() {
        if let NextBatter::Choose(candidates) = scoring::next_batter(m) {
            pending.push(Prompt::NextBatter(candidates));
        }
    }
    if m.bowler.is_none() {
        pending.push(Prompt::NextBowler);
    }
    pending
}

fn ball_command(code: &str, ball: &BallAction) -> MirrorCommand {
    let (event, payload) = match ball.extra {
        None => match ball.runs {
            4 => (EventType::Boundary, json!({ "runs": 4 })),
            6 => (EventType::Six, json!({ "runs": 6 })),
            r => (EventType::Run, json!({ "runs": r })),
        },
        Some(ExtraType::Wide) => (EventType::Wide, json!({ "runs": ball.runs })),
        Some(ExtraType::NoBall) => (
            EventType::NoBall,
            json!({ "extra": 1, "batRuns": ball.bat_runs_on_no_ball }),
        ),
        Some(ExtraType::Bye) => (EventType::Bye, json!({ "runs": ball.runs })),
        Some(ExtraType::LegBye) => (EventType::LegBye, json!({ "runs": ball.runs })),
    };
    MirrorCommand::append(code, event, payload)
}

fn team_request(squad: &Squad) -> TeamRequest {
    TeamRequest {
        name: squad.name.clone(),
        players: squad
            .players
            .iter()
            .map(|p| PlayerRef { id: p.id.clone(), name: p.name.clone() })
            .collect(),
    }
}

pub fn create_request(m: &Match) -> CreateMatchRequest {
    CreateMatchRequest {
        code: m.id.clone(),
        team_a: team_request(&m.team_a),
        team_b: team_request(&m.team_b),
        overs_limit: m.overs,
        toss: TossRequest {
            winner: m.team_name(m.toss.winner).to_string(),
            decision: m.toss.decision,
        },
        striker_id: m.striker.clone(),
        non_striker_id: m.non_striker.clone(),
        bowler_id: m.bowler.clone(),
    }
}

/// Consumes scoring signals (stdin listener) until the channel closes.
pub async fn run(app: Arc<AppState>, mut signal_rx: mpsc::Receiver<CricketSignal>) {
    tracing::info!("scoring signal consumer started");

    while let Some(signal) = signal_rx.recv().await {
        let raw = signal.to_string();
        match app.apply(signal.into_action()) {
            Ok(applied) => {
                if let Transition::MatchFinished { result } = &applied.transition {
                    tracing::info!(result = %result, "match over");
                }
            }
            Err(e) => {
                tracing::warn!(signal = %raw, error = %e, "signal ignored");
                app.push_event("rejected", &format!("{raw}: {e}"));
            }
        }
    }

    tracing::info!("signal channel closed, consumer stopping");
}
