/// Tests for the JSON summary and CSV scorecard exports.
use super::session;
use crate::export::{scorecard_csv, summary, summary_json};
use crate::types::{Action, BallAction, Team};

/// A1 faces both: a four, then a single.
fn two_balls() -> crate::session::Session {
    let mut s = session(20);
    s.apply(Action::Ball(BallAction::runs(4))).unwrap();
    s.apply(Action::Ball(BallAction::runs(1))).unwrap();
    s
}

// ── summary ───────────────────────────────────────────────────────────────────

#[test]
fn summary_reports_live_figures() {
    let s = two_balls();
    let sum = summary(s.current());
    assert_eq!(sum.id, "TEST01");
    assert_eq!((sum.score, sum.wickets), (5, 0));
    assert_eq!(sum.overs, "0.2");
    assert_eq!(sum.run_rate, "15.00");
    assert_eq!(sum.required_run_rate, "0.00");
    assert_eq!(sum.batting_team, "Team A");
    assert_eq!(sum.bowling_team, "Team B");
    assert_eq!(sum.teams.len(), 2);
    assert_eq!(sum.teams[1].bowling.len(), 1);
    assert_eq!(sum.partnerships.len(), 1);
}

#[test]
fn summary_json_is_parseable() {
    let s = two_balls();
    let json = summary_json(s.current()).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["score"], 5);
    assert_eq!(v["status"], "live");
    assert_eq!(v["teams"][0]["batting"][0]["strike_rate"], "250.00");
    assert_eq!(v["extras"]["runs"], 0);
    assert!(v["result"].is_null());
}

// ── csv ───────────────────────────────────────────────────────────────────────

#[test]
fn scorecard_for_the_batting_side() {
    let s = two_balls();
    let csv = scorecard_csv(s.current(), Team::TeamA).unwrap();
    assert_eq!(
        csv,
        "Batting\n\
         Batsman,R,B,4s,6s,SR\n\
         A1,5,2,1,0,250.00\n\
         A2,0,0,0,0,0.00\n\
         \n\
         Bowling\n\
         Bowler,O,R,W,ECO\n\
         B11,0.2,5,0,15.00\n"
    );
}

#[test]
fn scorecard_before_a_side_has_batted() {
    let s = two_balls();
    let csv = scorecard_csv(s.current(), Team::TeamB).unwrap();
    assert_eq!(
        csv,
        "Batting\nBatsman,R,B,4s,6s,SR\n\nBowling\nBowler,O,R,W,ECO\n"
    );
}

#[test]
fn openers_appear_before_facing_a_ball() {
    let s = session(20);
    let csv = scorecard_csv(s.current(), Team::TeamA).unwrap();
    assert!(csv.contains("A1,0,0,0,0,0.00\n"));
    assert!(csv.contains("A2,0,0,0,0,0.00\n"));
    assert!(!csv.contains("A3,"));
}

#[test]
fn dismissed_batters_stay_on_the_card() {
    let mut s = session(20);
    s.apply(Action::Wicket).unwrap();
    s.select_batter("A7").unwrap();
    let csv = scorecard_csv(s.current(), Team::TeamA).unwrap();
    assert!(csv.contains("A1,0,1,0,0,0.00\n"));
    assert!(csv.contains("A7,0,0,0,0,0.00\n"));
    assert!(csv.contains("B11,0.1,0,1,0.00\n"));
}
