//! Ball, wicket and retirement processors.
//!
//! Each processor takes the current match, records it in the undo history and
//! returns the next state. They never evaluate innings or match end; that is
//! `transition::evaluate_transition`, run by the caller afterwards.

use crate::types::{Ball, BallAction, Dismissal, ExtraType, Match, BALLS_PER_OVER};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("no match in progress")]
    NoMatch,
    #[error("match is finished, no further scoring accepted")]
    MatchFinished,
    #[error("no striker at the crease")]
    NoStriker,
    #[error("waiting for operator input: {0}")]
    PromptPending(String),
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("nothing to undo")]
    NothingToUndo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BallOutcome {
    pub state: Match,
    /// The delivery was the sixth legal ball of an over.
    pub over_complete: bool,
}

pub fn rotate_strike(m: &mut Match) {
    std::mem::swap(&mut m.striker, &mut m.non_striker);
}

pub fn process_ball(current: &Match, action: BallAction) -> Result<BallOutcome, ScoringError> {
    if current.is_finished() {
        return Err(ScoringError::MatchFinished);
    }

    let mut next = current.clone();
    next.history.record(current);

    let BallAction { runs, extra, bat_runs_on_no_ball: bat_runs } = action;
    let legal = action.is_legal();

    // (team runs, runs credited to the striker's bat)
    let (team_runs, bat_credit) = match extra {
        None => (runs, Some(runs)),
        Some(ExtraType::NoBall) => (1 + bat_runs, Some(bat_runs)),
        Some(ExtraType::Wide) | Some(ExtraType::Bye) | Some(ExtraType::LegBye) => (runs, None),
    };

    let ball = ball_record(&action, team_runs);
    tracing::debug!(display = %ball.display, runs = team_runs, legal, "ball");
    next.current_over.push(ball);
    next.score += team_runs;
    if legal {
        next.total_balls += 1;
    }

    if let Some(kind) = extra {
        let extra_runs = match kind {
            ExtraType::NoBall => 1,
            _ => runs,
        };
        next.extras.record(kind, extra_runs);
    }

    if let Some(striker_id) = next.striker.clone() {
        let batting = next.batting;
        if let Some(striker) = next.squad_mut(batting).player_mut(&striker_id) {
            if let Some(credit) = bat_credit {
                striker.runs += credit;
                match credit {
                    4 => striker.fours += 1,
                    6 => striker.sixes += 1,
                    _ => {}
                }
            }
            if extra.is_none() {
                striker.balls += 1;
            }
        }
    }

    if let Some(bowler_id) = next.bowler.clone() {
        let bowling = next.bowling();
        if let Some(bowler) = next.squad_mut(bowling).player_mut(&bowler_id) {
            bowler.bowl_runs += team_runs;
            if legal {
                bowler.bowl_balls += 1;
            }
        }
    }

    let odd = match extra {
        Some(ExtraType::Wide) => false,
        Some(ExtraType::NoBall) => bat_runs % 2 == 1,
        _ => runs % 2 == 1,
    };
    if odd {
        rotate_strike(&mut next);
    }

    // an odd run off the last ball plus the change of ends nets to no swap
    let over_complete = legal && next.total_balls % BALLS_PER_OVER == 0;
    if over_complete {
        next.current_over.clear();
        rotate_strike(&mut next);
    }

    Ok(BallOutcome { state: next, over_complete })
}

/// A dismissal of the striker. Always a legal delivery.
pub fn process_wicket(current: &Match) -> Result<BallOutcome, ScoringError> {
    if current.is_finished() {
        return Err(ScoringError::MatchFinished);
    }
    let striker_id = current.striker.clone().ok_or(ScoringError::NoStriker)?;

    let mut next = current.clone();
    next.history.record(current);

    next.wickets += 1;
    next.total_balls += 1;

    let batting = next.batting;
    if let Some(striker) = next.squad_mut(batting).player_mut(&striker_id) {
        striker.is_out = true;
        striker.dismissal = Some(Dismissal::Out);
        striker.balls += 1;
    }

    if let Some(bowler_id) = next.bowler.clone() {
        let bowling = next.bowling();
        if let Some(bowler) = next.squad_mut(bowling).player_mut(&bowler_id) {
            bowler.bowl_balls += 1;
            bowler.bowl_wickets += 1;
        }
    }

    next.current_over.push(Ball::wicket());
    tracing::debug!(striker = %striker_id, wickets = next.wickets, "wicket");

    let over_complete = next.total_balls % BALLS_PER_OVER == 0;
    if over_complete {
        next.current_over.clear();
        rotate_strike(&mut next);
    }

    Ok(BallOutcome { state: next, over_complete })
}

/// The striker retires: out of the innings, but not a wicket and not a delivery.
pub fn process_retirement(current: &Match) -> Result<Match, ScoringError> {
    if current.is_finished() {
        return Err(ScoringError::MatchFinished);
    }
    let striker_id = current.striker.clone().ok_or(ScoringError::NoStriker)?;

    let mut next = current.clone();
    next.history.record(current);

    let batting = next.batting;
    if let Some(striker) = next.squad_mut(batting).player_mut(&striker_id) {
        striker.is_out = true;
        striker.dismissal = Some(Dismissal::Retired);
    }
    tracing::debug!(striker = %striker_id, "retired");

    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextBatter {
    /// Exactly one candidate; assign without asking.
    Automatic(String),
    Choose(Vec<String>),
    NoneLeft,
}

/// Who can come in: not out and not already at the crease.
pub fn next_batter(m: &Match) -> NextBatter {
    let squad = m.batting_squad();
    let at_crease: Vec<&str> = [m.striker.as_deref(), m.non_striker.as_deref()]
        .into_iter()
        .flatten()
        .filter(|id| squad.player(id).is_some_and(|p| !p.is_out))
        .collect();

    let mut candidates: Vec<String> = squad
        .players
        .iter()
        .filter(|p| !p.is_out && !at_crease.contains(&p.id.as_str()))
        .map(|p| p.id.clone())
        .collect();

    match candidates.len() {
        0 => NextBatter::NoneLeft,
        1 => NextBatter::Automatic(candidates.remove(0)),
        _ => NextBatter::Choose(candidates),
    }
}

/// Clear whichever crease slot holds a dismissed or retired batter.
pub fn vacate_dismissed(m: &mut Match) {
    let batting = m.batting;
    let is_out = |m: &Match, slot: &Option<String>| {
        slot.as_deref()
            .and_then(|id| m.squad(batting).player(id))
            .is_some_and(|p| p.is_out)
    };
    if is_out(m, &m.striker) {
        m.striker = None;
    }
    if is_out(m, &m.non_striker) {
        m.non_striker = None;
    }
}

/// Put an incoming batter into the vacant slot, striker's end first.
pub fn fill_vacancy(m: &mut Match, player_id: String) -> bool {
    if m.striker.is_none() {
        m.striker = Some(player_id);
        true
    } else if m.non_striker.is_none() {
        m.non_striker = Some(player_id);
        true
    } else {
        false
    }
}

fn ball_record(action: &BallAction, team_runs: u32) -> Ball {
    let runs = action.runs;
    let bat_runs = action.bat_runs_on_no_ball;
    let display = match action.extra {
        None => runs.to_string(),
        Some(ExtraType::Wide) if runs > 1 => format!("WD+{}", runs - 1),
        Some(ExtraType::Wide) => "WD".to_string(),
        Some(ExtraType::NoBall) if bat_runs > 0 => format!("NB+{bat_runs}"),
        Some(ExtraType::NoBall) => "NB".to_string(),
        Some(ExtraType::Bye) if runs > 0 => format!("B{runs}"),
        Some(ExtraType::Bye) => "B".to_string(),
        Some(ExtraType::LegBye) if runs > 0 => format!("LB{runs}"),
        Some(ExtraType::LegBye) => "LB".to_string(),
    };
    Ball {
        run: team_runs,
        display,
        is_wide: action.extra == Some(ExtraType::Wide),
        is_noball: action.extra == Some(ExtraType::NoBall),
        is_bye: action.extra == Some(ExtraType::Bye),
        is_leg_bye: action.extra == Some(ExtraType::LegBye),
        is_wicket: false,
    }
}
