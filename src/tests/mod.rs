mod export_tests;
mod server_tests;
mod store_tests;
mod transition_tests;

use crate::session::Session;
use crate::types::{Match, MatchSetup, Squad, Team, TeamSetup, Toss, TossDecision};

/// "Team A" players are named A1..An with ids `a_p1`..
pub fn squad(team: Team, name: &str, short: &str, size: usize) -> Squad {
    let names: Vec<String> = (1..=size).map(|i| format!("{short}{i}")).collect();
    Squad::from_names(team, name, &names)
}

pub fn a(n: usize) -> String {
    format!("a_p{n}")
}

pub fn b(n: usize) -> String {
    format!("b_p{n}")
}

/// Team A batting, A1 on strike, A2 non-striker, B11 bowling.
pub fn live_match_with(overs: u32, size_a: usize, size_b: usize) -> Match {
    let toss = Toss { winner: Team::TeamA, decision: TossDecision::Bat };
    let mut m = Match::new(
        "TEST01",
        squad(Team::TeamA, "Team A", "A", size_a),
        squad(Team::TeamB, "Team B", "B", size_b),
        overs,
        toss,
    );
    m.striker = Some(a(1));
    m.non_striker = Some(a(2));
    m.bowler = Some(b(size_b));
    m
}

pub fn live_match(overs: u32) -> Match {
    live_match_with(overs, 11, 11)
}

fn team_setup(name: &str, short: &str, size: usize) -> TeamSetup {
    TeamSetup {
        name: name.to_string(),
        players: (1..=size).map(|i| format!("{short}{i}")).collect(),
    }
}

pub fn setup(overs: u32, size: usize) -> MatchSetup {
    MatchSetup {
        team_a: team_setup("Team A", "A", size),
        team_b: team_setup("Team B", "B", size),
        overs,
        toss: Toss { winner: Team::TeamA, decision: TossDecision::Bat },
        striker_id: Some(a(1)),
        non_striker_id: Some(a(2)),
        bowler_id: Some(b(size)),
        code: Some("TEST01".to_string()),
    }
}

pub fn session(overs: u32) -> Session {
    Session::start(setup(overs, 11)).unwrap()
}
