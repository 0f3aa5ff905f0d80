//! JSON match summary and CSV scorecard.

use serde::Serialize;

use crate::stats::{self, FallOfWicket, OverSummary, Partnership};
use crate::types::{Dismissal, Extras, Match, MatchStatus, Player, Team};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("csv buffer flush failed: {0}")]
    Flush(String),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct BattingLine {
    pub id: String,
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: String,
    pub is_out: bool,
    pub dismissal: Option<Dismissal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BowlingLine {
    pub id: String,
    pub name: String,
    pub overs: String,
    pub runs: u32,
    pub wickets: u32,
    pub economy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamCard {
    pub name: String,
    pub batting: Vec<BattingLine>,
    pub bowling: Vec<BowlingLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub id: String,
    pub status: MatchStatus,
    pub result: Option<String>,
    pub innings: u8,
    pub target: u32,
    pub overs_limit: u32,
    pub batting_team: String,
    pub bowling_team: String,
    pub score: u32,
    pub wickets: u32,
    pub overs: String,
    pub run_rate: String,
    pub required_run_rate: String,
    pub extras: Extras,
    pub teams: Vec<TeamCard>,
    pub fall_of_wickets: Vec<FallOfWicket>,
    pub over_summaries: Vec<OverSummary>,
    pub partnerships: Vec<Partnership>,
}

pub fn batting_line(p: &Player) -> BattingLine {
    BattingLine {
        id: p.id.clone(),
        name: p.name.clone(),
        runs: p.runs,
        balls: p.balls,
        fours: p.fours,
        sixes: p.sixes,
        strike_rate: stats::format_rate(stats::strike_rate(p)),
        is_out: p.is_out,
        dismissal: p.dismissal,
    }
}

pub fn bowling_line(p: &Player) -> BowlingLine {
    BowlingLine {
        id: p.id.clone(),
        name: p.name.clone(),
        overs: stats::overs_display(p.bowl_balls),
        runs: p.bowl_runs,
        wickets: p.bowl_wickets,
        economy: stats::format_rate(stats::economy(p)),
    }
}

fn team_card(m: &Match, team: Team) -> TeamCard {
    let squad = m.squad(team);
    TeamCard {
        name: squad.name.clone(),
        batting: squad.players.iter().map(batting_line).collect(),
        bowling: squad.players.iter().filter(|p| p.has_bowled()).map(bowling_line).collect(),
    }
}

pub fn summary(m: &Match) -> MatchSummary {
    MatchSummary {
        id: m.id.clone(),
        status: m.status,
        result: m.result.clone(),
        innings: m.innings,
        target: m.target,
        overs_limit: m.overs,
        batting_team: m.team_name(m.batting).to_string(),
        bowling_team: m.team_name(m.bowling()).to_string(),
        score: m.score,
        wickets: m.wickets,
        overs: stats::overs_display(m.total_balls),
        run_rate: stats::format_rate(stats::run_rate(m)),
        required_run_rate: stats::format_rate(stats::required_run_rate(m)),
        extras: stats::extras(m),
        teams: vec![team_card(m, Team::TeamA), team_card(m, Team::TeamB)],
        fall_of_wickets: stats::fall_of_wickets(m),
        over_summaries: stats::over_summaries(m),
        partnerships: stats::partnerships(m),
    }
}

pub fn summary_json(m: &Match) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&summary(m))?)
}

fn table_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Batting table for `batting` and bowling table for its opponent.
///
/// Batters appear once they have faced a ball, been dismissed, or are at the
/// crease in the live innings. Bowlers appear once they have bowled.
pub fn scorecard_csv(m: &Match, batting: Team) -> Result<String, ExportError> {
    let at_crease = |p: &Player| {
        m.batting == batting
            && (m.striker.as_deref() == Some(p.id.as_str())
                || m.non_striker.as_deref() == Some(p.id.as_str()))
    };

    let mut bat = table_writer();
    bat.write_record(["Batsman", "R", "B", "4s", "6s", "SR"])?;
    for p in m.squad(batting).players.iter().filter(|p| p.has_batted() || at_crease(p)) {
        bat.write_record([
            p.name.clone(),
            p.runs.to_string(),
            p.balls.to_string(),
            p.fours.to_string(),
            p.sixes.to_string(),
            stats::format_rate(stats::strike_rate(p)),
        ])?;
    }

    let mut bowl = table_writer();
    bowl.write_record(["Bowler", "O", "R", "W", "ECO"])?;
    for p in m.squad(batting.opponent()).players.iter().filter(|p| p.has_bowled()) {
        bowl.write_record([
            p.name.clone(),
            stats::overs_display(p.bowl_balls),
            p.bowl_runs.to_string(),
            p.bowl_wickets.to_string(),
            stats::format_rate(stats::economy(p)),
        ])?;
    }

    Ok(format!("Batting\n{}\nBowling\n{}", finish(bat)?, finish(bowl)?))
}
