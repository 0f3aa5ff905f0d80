//! Innings and match transitions.
//!
//! Runs after every applied ball or wicket, before the caller looks at
//! over-boundary prompts: an innings or match ending always wins over asking
//! for the next bowler.

use crate::types::{Match, MatchStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    InningsBreak { target: u32 },
    MatchFinished { result: String },
}

impl Transition {
    pub fn occurred(&self) -> bool {
        !matches!(self, Transition::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub transition: Transition,
    pub state: Match,
}

impl Evaluation {
    pub fn transitioned(&self) -> bool {
        self.transition.occurred()
    }
}

/// Overs used up, or the batting side cannot put two batters out there.
pub fn innings_complete(m: &Match) -> bool {
    let squad = m.batting_squad();
    m.total_balls >= m.ball_limit()
        || m.wickets >= squad.max_wickets()
        || squad.not_out_count() < 2
}

pub fn chase_complete(m: &Match) -> bool {
    m.target > 0 && m.score >= m.target
}

pub fn evaluate_transition(candidate: Match) -> Evaluation {
    if candidate.is_finished() {
        return Evaluation { transition: Transition::None, state: candidate };
    }

    if candidate.innings == 1 {
        if innings_complete(&candidate) {
            let state = start_second_innings(candidate);
            let transition = Transition::InningsBreak { target: state.target };
            return Evaluation { transition, state };
        }
    } else if chase_complete(&candidate) || innings_complete(&candidate) {
        let state = finish(candidate);
        let result = state.result.clone().unwrap_or_default();
        return Evaluation { transition: Transition::MatchFinished { result }, state };
    }

    Evaluation { transition: Transition::None, state: candidate }
}

fn start_second_innings(mut m: Match) -> Match {
    m.target = m.score + 1;
    m.batting = m.bowling();

    let batting = m.batting;
    for p in &mut m.squad_mut(batting).players {
        p.reset_batting();
    }
    let bowling = m.bowling();
    for p in &mut m.squad_mut(bowling).players {
        p.reset_bowling();
    }

    m.score = 0;
    m.wickets = 0;
    m.total_balls = 0;
    m.current_over.clear();
    m.extras = Default::default();
    m.striker = None;
    m.non_striker = None;
    m.bowler = None;
    m.innings = 2;
    m.status = MatchStatus::Break;

    tracing::info!(
        target = m.target,
        batting = %m.team_name(batting),
        "innings break"
    );
    m
}

fn finish(mut m: Match) -> Match {
    let result = result_text(&m);
    tracing::info!(result = %result, score = m.score, wickets = m.wickets, "match finished");
    m.status = MatchStatus::Finished;
    m.result = Some(result);
    m
}

/// Result line for a completed second innings.
pub fn result_text(m: &Match) -> String {
    if chase_complete(m) {
        let wickets_left = m.batting_squad().max_wickets().saturating_sub(m.wickets);
        return format!(
            "{} won by {} wicket(s) with {} ball(s) left",
            m.team_name(m.batting),
            wickets_left,
            m.balls_remaining()
        );
    }

    let margin = m.target.saturating_sub(1).saturating_sub(m.score);
    if margin == 0 {
        "Match tied".to_string()
    } else {
        format!("{} won by {} run(s)", m.team_name(m.bowling()), margin)
    }
}
