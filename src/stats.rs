//! Read-only statistics derived from the live state and its snapshot history.
//!
//! Timeline walks (fall of wickets, over summaries, partnerships) look at
//! consecutive `(before, after)` pairs of the retained history followed by the
//! live state, restricted to the current innings.

use serde::Serialize;

use crate::types::{Extras, Match, Player, BALLS_PER_OVER};

pub fn run_rate(m: &Match) -> f64 {
    if m.total_balls == 0 {
        return 0.0;
    }
    m.score as f64 / m.total_balls as f64 * BALLS_PER_OVER as f64
}

/// Only meaningful while chasing; zero otherwise or with no balls left.
pub fn required_run_rate(m: &Match) -> f64 {
    if m.innings < 2 || m.target == 0 {
        return 0.0;
    }
    let balls_left = m.balls_remaining();
    if balls_left == 0 {
        return 0.0;
    }
    let needed = m.target.saturating_sub(m.score);
    needed as f64 / balls_left as f64 * BALLS_PER_OVER as f64
}

pub fn format_rate(rate: f64) -> String {
    format!("{rate:.2}")
}

/// `whole.remainder`, e.g. 111 balls is "18.3".
pub fn overs_display(balls: u32) -> String {
    format!("{}.{}", balls / BALLS_PER_OVER, balls % BALLS_PER_OVER)
}

pub fn strike_rate(p: &Player) -> f64 {
    if p.balls == 0 {
        return 0.0;
    }
    p.runs as f64 / p.balls as f64 * 100.0
}

pub fn economy(p: &Player) -> f64 {
    if p.bowl_balls == 0 {
        return 0.0;
    }
    p.bowl_runs as f64 / (p.bowl_balls as f64 / BALLS_PER_OVER as f64)
}

pub fn extras(m: &Match) -> Extras {
    m.extras
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallOfWicket {
    pub score: u32,
    pub wicket: u32,
    pub player_id: Option<String>,
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverSummary {
    /// 1-based over number within the innings.
    pub over: u32,
    pub bowler_id: Option<String>,
    pub bowler: Option<String>,
    pub runs: u32,
    pub wickets: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partnership {
    pub batter_ids: [String; 2],
    pub batters: [String; 2],
    pub runs: u32,
    pub balls: u32,
}

fn steps(m: &Match) -> Vec<(&Match, &Match)> {
    let timeline: Vec<&Match> = m.history.iter().chain(std::iter::once(m)).collect();
    timeline
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(before, after)| before.innings == m.innings && after.innings == m.innings)
        .collect()
}

pub fn fall_of_wickets(m: &Match) -> Vec<FallOfWicket> {
    steps(m)
        .into_iter()
        .filter(|(before, after)| after.wickets > before.wickets)
        .map(|(before, after)| {
            let dismissed = after.batting_squad().players.iter().find(|p| {
                p.is_out && !before.batting_squad().player(&p.id).is_some_and(|q| q.is_out)
            });
            FallOfWicket {
                score: after.score,
                wicket: after.wickets,
                player_id: dismissed.map(|p| p.id.clone()),
                player: dismissed.map(|p| p.name.clone()),
            }
        })
        .collect()
}

/// Completed overs only; a trailing (or window-truncated) partial over is skipped.
pub fn over_summaries(m: &Match) -> Vec<OverSummary> {
    let mut overs = Vec::new();
    let mut runs = 0;
    let mut wickets = 0;
    let mut legal = 0;
    let mut bowler_id: Option<String> = None;

    for (before, after) in steps(m) {
        runs += after.score.saturating_sub(before.score);
        wickets += after.wickets.saturating_sub(before.wickets);

        if after.total_balls <= before.total_balls {
            continue;
        }
        if legal == 0 {
            bowler_id = before.bowler.clone();
        }
        legal += 1;

        if after.total_balls % BALLS_PER_OVER == 0 {
            if legal == BALLS_PER_OVER {
                let bowler = bowler_id
                    .as_deref()
                    .and_then(|id| m.bowling_squad().player(id))
                    .map(|p| p.name.clone());
                overs.push(OverSummary {
                    over: after.total_balls / BALLS_PER_OVER,
                    bowler_id: bowler_id.take(),
                    bowler,
                    runs,
                    wickets,
                });
            }
            runs = 0;
            wickets = 0;
            legal = 0;
            bowler_id = None;
        }
    }

    overs
}

fn pair_of(m: &Match) -> Option<[String; 2]> {
    let mut pair = [m.striker.clone()?, m.non_striker.clone()?];
    pair.sort();
    Some(pair)
}

/// Runs and legal balls per unordered batter pair, oldest first. The live
/// pair is always last, even before it has faced a ball.
pub fn partnerships(m: &Match) -> Vec<Partnership> {
    let name = |id: &str| {
        m.batting_squad()
            .player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let open = |ids: [String; 2]| Partnership {
        batters: [name(&ids[0]), name(&ids[1])],
        batter_ids: ids,
        runs: 0,
        balls: 0,
    };

    let mut out: Vec<Partnership> = Vec::new();
    for (before, after) in steps(m) {
        let Some(pair) = pair_of(before) else { continue };
        if out.last().map(|p| &p.batter_ids) != Some(&pair) {
            out.push(open(pair));
        }
        if let Some(current) = out.last_mut() {
            current.runs += after.score.saturating_sub(before.score);
            current.balls += after.total_balls.saturating_sub(before.total_balls);
        }
    }

    if let Some(pair) = pair_of(m) {
        if out.last().map(|p| &p.batter_ids) != Some(&pair) {
            out.push(open(pair));
        }
    }
    out
}
