use serde::{Deserialize, Serialize};

use crate::history::History;

pub const BALLS_PER_OVER: u32 = 6;
pub const ALL_OUT_WICKETS: u32 = 10;

/// Which side of the fixture. Squad names are display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Team {
    TeamA,
    TeamB,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::TeamA => Team::TeamB,
            Team::TeamB => Team::TeamA,
        }
    }

    /// Accepts "A", "B", "TEAM_A", "teamB" and friends.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().replace('_', "").as_str() {
            "A" | "TEAMA" => Some(Team::TeamA),
            "B" | "TEAMB" => Some(Team::TeamB),
            _ => None,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::TeamA => write!(f, "TEAM_A"),
            Team::TeamB => write!(f, "TEAM_B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dismissal {
    Out,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub is_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissal: Option<Dismissal>,
    #[serde(default)]
    pub bowl_runs: u32,
    #[serde(default)]
    pub bowl_balls: u32,
    #[serde(default)]
    pub bowl_wickets: u32,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            runs: 0,
            balls: 0,
            fours: 0,
            sixes: 0,
            is_out: false,
            dismissal: None,
            bowl_runs: 0,
            bowl_balls: 0,
            bowl_wickets: 0,
        }
    }

    pub fn reset_batting(&mut self) {
        self.runs = 0;
        self.balls = 0;
        self.fours = 0;
        self.sixes = 0;
        self.is_out = false;
        self.dismissal = None;
    }

    pub fn reset_bowling(&mut self) {
        self.bowl_runs = 0;
        self.bowl_balls = 0;
        self.bowl_wickets = 0;
    }

    pub fn has_batted(&self) -> bool {
        self.balls > 0 || self.is_out
    }

    pub fn has_bowled(&self) -> bool {
        self.bowl_balls > 0 || self.bowl_runs > 0
    }
}

/// A team's playing list. Membership is fixed once the match starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub name: String,
    pub players: Vec<Player>,
}

impl Squad {
    /// Blank names are skipped; ids are `a_p<n>` / `b_p<n>` over the remaining
    /// names, so they never depend on the display name.
    pub fn from_names(team: Team, team_name: &str, names: &[String]) -> Self {
        let prefix = match team {
            Team::TeamA => "a",
            Team::TeamB => "b",
        };
        let players = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .enumerate()
            .map(|(i, n)| Player::new(format!("{prefix}_p{}", i + 1), n))
            .collect();
        Self {
            name: team_name.trim().to_string(),
            players,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn not_out_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_out).count()
    }

    /// Wickets that bowl this side out: ten, or fewer for a short squad.
    pub fn max_wickets(&self) -> u32 {
        let spare = self.players.len().saturating_sub(1) as u32;
        ALL_OUT_WICKETS.min(spare)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ball {
    pub run: u32,
    pub display: String,
    #[serde(default)]
    pub is_wide: bool,
    #[serde(default)]
    pub is_noball: bool,
    #[serde(default)]
    pub is_bye: bool,
    #[serde(default)]
    pub is_leg_bye: bool,
    #[serde(default)]
    pub is_wicket: bool,
}

impl Ball {
    pub fn wicket() -> Self {
        Self {
            run: 0,
            display: "W".to_string(),
            is_wide: false,
            is_noball: false,
            is_bye: false,
            is_leg_bye: false,
            is_wicket: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraType {
    #[serde(rename = "wide")]
    Wide,
    #[serde(rename = "noball")]
    NoBall,
    #[serde(rename = "bye")]
    Bye,
    #[serde(rename = "legbye")]
    LegBye,
}

/// One scoring input for the ball processor.
///
/// `runs` is the face value of the delivery: bat runs for a plain delivery,
/// total wide runs (penalty included) for a wide, byes for a bye. For a no-ball
/// the penalty is fixed at one and `bat_runs_on_no_ball` carries what the
/// batter struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallAction {
    pub runs: u32,
    #[serde(default)]
    pub extra: Option<ExtraType>,
    #[serde(default)]
    pub bat_runs_on_no_ball: u32,
}

impl BallAction {
    pub fn runs(runs: u32) -> Self {
        Self { runs, extra: None, bat_runs_on_no_ball: 0 }
    }

    pub fn wide(runs: u32) -> Self {
        Self { runs, extra: Some(ExtraType::Wide), bat_runs_on_no_ball: 0 }
    }

    pub fn no_ball(bat_runs: u32) -> Self {
        Self { runs: 1, extra: Some(ExtraType::NoBall), bat_runs_on_no_ball: bat_runs }
    }

    pub fn bye(runs: u32) -> Self {
        Self { runs, extra: Some(ExtraType::Bye), bat_runs_on_no_ball: 0 }
    }

    pub fn leg_bye(runs: u32) -> Self {
        Self { runs, extra: Some(ExtraType::LegBye), bat_runs_on_no_ball: 0 }
    }

    pub fn is_extra(&self) -> bool {
        self.extra.is_some()
    }

    /// Wides and no-balls are re-bowled and do not count toward the over.
    pub fn is_legal(&self) -> bool {
        !matches!(self.extra, Some(ExtraType::Wide) | Some(ExtraType::NoBall))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ball(BallAction),
    Wicket,
    Retire,
    Undo,
}

/// Raw scoring signal from the stdin listener, `/api/signal` or a replay file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CricketSignal {
    Runs(u8),    // 0..6
    Wicket,      // W
    Wide(u8),    // Wd, Wd1..Wd6 (runs on top of the penalty)
    NoBall(u8),  // N, N1..N6 (bat runs)
    Bye(u8),     // B, B1..B6
    LegBye(u8),  // LB, LB1..LB6
    Retire,      // R
    Undo,        // U
}

impl CricketSignal {
    pub fn is_wicket(&self) -> bool {
        matches!(self, Self::Wicket)
    }

    /// Parse a raw string into a cricket signal.
    /// Formats: "0".."6", "W", "Wd","Wd1".."Wd6", "N","N1".."N6", "B","B1".."B6", "LB","LB1".."LB6", "R", "U"
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        match s {
            "W" => Some(Self::Wicket),
            "R" => Some(Self::Retire),
            "U" => Some(Self::Undo),
            "Wd" => Some(Self::Wide(0)),
            "N" => Some(Self::NoBall(0)),
            "B" => Some(Self::Bye(0)),
            "LB" => Some(Self::LegBye(0)),
            _ if s.starts_with("Wd") => Some(Self::Wide(suffix_runs(s, "Wd")?)),
            _ if s.starts_with("LB") => Some(Self::LegBye(suffix_runs(s, "LB")?)),
            _ if s.starts_with('N') => Some(Self::NoBall(suffix_runs(s, "N")?)),
            _ if s.starts_with('B') => Some(Self::Bye(suffix_runs(s, "B")?)),
            _ => {
                let runs: u8 = s.parse().ok()?;
                if runs <= 6 { Some(Self::Runs(runs)) } else { None }
            }
        }
    }

    pub fn into_action(self) -> Action {
        match self {
            Self::Runs(r) => Action::Ball(BallAction::runs(r.into())),
            Self::Wicket => Action::Wicket,
            Self::Wide(r) => Action::Ball(BallAction::wide(u32::from(r) + 1)),
            Self::NoBall(r) => Action::Ball(BallAction::no_ball(r.into())),
            Self::Bye(r) => Action::Ball(BallAction::bye(r.into())),
            Self::LegBye(r) => Action::Ball(BallAction::leg_bye(r.into())),
            Self::Retire => Action::Retire,
            Self::Undo => Action::Undo,
        }
    }
}

fn suffix_runs(s: &str, prefix: &str) -> Option<u8> {
    let runs: u8 = s.strip_prefix(prefix)?.parse().ok()?;
    if runs <= 6 { Some(runs) } else { None }
}

impl std::fmt::Display for CricketSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runs(r) => write!(f, "{r}"),
            Self::Wicket => write!(f, "W"),
            Self::Wide(0) => write!(f, "Wd"),
            Self::Wide(r) => write!(f, "Wd{r}"),
            Self::NoBall(0) => write!(f, "N"),
            Self::NoBall(r) => write!(f, "N{r}"),
            Self::Bye(0) => write!(f, "B"),
            Self::Bye(r) => write!(f, "B{r}"),
            Self::LegBye(0) => write!(f, "LB"),
            Self::LegBye(r) => write!(f, "LB{r}"),
            Self::Retire => write!(f, "R"),
            Self::Undo => write!(f, "U"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    PreMatch,
    Live,
    Break,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Bowl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub winner: Team,
    pub decision: TossDecision,
}

impl Toss {
    pub fn batting_first(&self) -> Team {
        match self.decision {
            TossDecision::Bat => self.winner,
            TossDecision::Bowl => self.winner.opponent(),
        }
    }
}

/// Per-innings extras, counted when the delivery is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
    pub runs: u32,
}

impl Extras {
    pub fn record(&mut self, extra: ExtraType, runs: u32) {
        match extra {
            ExtraType::Wide => self.wides += 1,
            ExtraType::NoBall => self.no_balls += 1,
            ExtraType::Bye => self.byes += 1,
            ExtraType::LegBye => self.leg_byes += 1,
        }
        self.runs += runs;
    }

    pub fn deliveries(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

/// The aggregate root: one fixture, mutated ball by ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub team_a: Squad,
    pub team_b: Squad,
    pub overs: u32,
    pub toss: Toss,
    pub batting: Team,
    pub innings: u8,
    pub status: MatchStatus,
    pub score: u32,
    pub wickets: u32,
    pub total_balls: u32,
    pub current_over: Vec<Ball>,
    pub striker: Option<String>,
    pub non_striker: Option<String>,
    pub bowler: Option<String>,
    #[serde(default)]
    pub history: History,
    pub target: u32,
    pub result: Option<String>,
    #[serde(default)]
    pub extras: Extras,
    pub created_at: i64,
}

impl Match {
    /// A live first innings with no openers chosen yet.
    pub fn new(id: impl Into<String>, team_a: Squad, team_b: Squad, overs: u32, toss: Toss) -> Self {
        Self {
            id: id.into(),
            team_a,
            team_b,
            overs,
            toss,
            batting: toss.batting_first(),
            innings: 1,
            status: MatchStatus::Live,
            score: 0,
            wickets: 0,
            total_balls: 0,
            current_over: Vec::new(),
            striker: None,
            non_striker: None,
            bowler: None,
            history: History::default(),
            target: 0,
            result: None,
            extras: Extras::default(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn bowling(&self) -> Team {
        self.batting.opponent()
    }

    pub fn squad(&self, team: Team) -> &Squad {
        match team {
            Team::TeamA => &self.team_a,
            Team::TeamB => &self.team_b,
        }
    }

    pub fn squad_mut(&mut self, team: Team) -> &mut Squad {
        match team {
            Team::TeamA => &mut self.team_a,
            Team::TeamB => &mut self.team_b,
        }
    }

    pub fn batting_squad(&self) -> &Squad {
        self.squad(self.batting)
    }

    pub fn bowling_squad(&self) -> &Squad {
        self.squad(self.bowling())
    }

    pub fn team_name(&self, team: Team) -> &str {
        &self.squad(team).name
    }

    pub fn striker_player(&self) -> Option<&Player> {
        self.batting_squad().player(self.striker.as_deref()?)
    }

    pub fn non_striker_player(&self) -> Option<&Player> {
        self.batting_squad().player(self.non_striker.as_deref()?)
    }

    pub fn bowler_player(&self) -> Option<&Player> {
        self.bowling_squad().player(self.bowler.as_deref()?)
    }

    /// Looks a player up in either squad.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.team_a.player(id).or_else(|| self.team_b.player(id))
    }

    pub fn ball_limit(&self) -> u32 {
        self.overs * BALLS_PER_OVER
    }

    pub fn balls_remaining(&self) -> u32 {
        self.ball_limit().saturating_sub(self.total_balls)
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Copy of the state with an empty history, as stored in snapshots and caches.
    pub fn without_history(&self) -> Match {
        Match {
            id: self.id.clone(),
            team_a: self.team_a.clone(),
            team_b: self.team_b.clone(),
            overs: self.overs,
            toss: self.toss,
            batting: self.batting,
            innings: self.innings,
            status: self.status,
            score: self.score,
            wickets: self.wickets,
            total_balls: self.total_balls,
            current_over: self.current_over.clone(),
            striker: self.striker.clone(),
            non_striker: self.non_striker.clone(),
            bowler: self.bowler.clone(),
            history: History::default(),
            target: self.target,
            result: self.result.clone(),
            extras: self.extras,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSetup {
    pub name: String,
    pub players: Vec<String>,
}

/// Operator input for a new fixture. Openers may be given by player id or name;
/// when omitted the session asks for them before the first ball.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub team_a: TeamSetup,
    pub team_b: TeamSetup,
    pub overs: u32,
    pub toss: Toss,
    #[serde(default)]
    pub striker_id: Option<String>,
    #[serde(default)]
    pub non_striker_id: Option<String>,
    #[serde(default)]
    pub bowler_id: Option<String>,
    /// Fixed match code; a random one is generated when absent.
    #[serde(default)]
    pub code: Option<String>,
}
