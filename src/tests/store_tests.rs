/// Tests for the SQLite event-log store and its replay-based undo.
use serde_json::json;

use super::session;
use crate::mirror::apply_local;
use crate::session::Session;
use crate::store::{
    replay, CreateMatchRequest, EventStore, EventType, PlayerRef, StoreError, TeamRequest,
    TossRequest, Totals,
};
use crate::types::{Action, BallAction, MatchStatus, TossDecision};

fn team(name: &str, size: usize) -> TeamRequest {
    TeamRequest {
        name: name.to_string(),
        players: (1..=size)
            .map(|i| PlayerRef { id: format!("{}_p{i}", name.to_lowercase()), name: format!("{name} {i}") })
            .collect(),
    }
}

fn request(code: &str) -> CreateMatchRequest {
    CreateMatchRequest {
        code: code.to_string(),
        team_a: team("Lions", 11),
        team_b: team("Tigers", 11),
        overs_limit: 20,
        toss: TossRequest { winner: "Tigers".into(), decision: TossDecision::Bowl },
        striker_id: Some("lions_p1".into()),
        non_striker_id: Some("lions_p2".into()),
        bowler_id: Some("tigers_p11".into()),
    }
}

fn store_with(code: &str) -> EventStore {
    let store = EventStore::in_memory().unwrap();
    store.create_match(&request(code)).unwrap();
    store
}

fn totals(store: &EventStore, code: &str) -> Totals {
    store.fetch_by_code(code).unwrap().unwrap().current_innings().unwrap().totals
}

// ── create / fetch ────────────────────────────────────────────────────────────

#[test]
fn create_and_fetch_by_code() {
    let store = EventStore::in_memory().unwrap();
    let created = store.create_match(&request("ABC123")).unwrap();
    assert_eq!(created.status, MatchStatus::Live);
    assert_eq!(created.innings.len(), 1);
    // Tigers won the toss and bowled
    assert_eq!(created.innings[0].batting_team, "Lions");
    assert_eq!(created.innings[0].bowling_team, "Tigers");
    assert_eq!(created.innings[0].striker_id.as_deref(), Some("lions_p1"));

    let fetched = store.fetch_by_code("ABC123").unwrap().unwrap();
    assert_eq!(fetched, created);
    assert!(store.fetch_by_code("NOPE").unwrap().is_none());
}

#[test]
fn duplicate_codes_are_rejected() {
    let store = store_with("DUP1");
    assert!(matches!(store.create_match(&request("DUP1")), Err(StoreError::Duplicate(_))));
}

#[test]
fn request_validation() {
    assert!(request("ABC").validate().is_ok());

    let mut bad = request("AB");
    bad.overs_limit = 51;
    bad.team_b.players.clear();
    bad.team_a.name = " ".into();
    let problems = bad.validate().unwrap_err();
    assert_eq!(problems.len(), 4);

    let mut long = request("ABCDEFGHI");
    long.overs_limit = 0;
    assert_eq!(long.validate().unwrap_err().len(), 2);
}

#[test]
fn opening_a_file_database() {
    let path = std::env::temp_dir().join(format!("cricket-store-{}.db", rand::random::<u32>()));
    let path_str = path.to_string_lossy().to_string();
    {
        let store = EventStore::open(&path_str).unwrap();
        store.create_match(&request("FILE1")).unwrap();
        store.append_event("FILE1", EventType::Six, json!({})).unwrap();
    }
    let reopened = EventStore::open(&path_str).unwrap();
    assert_eq!(totals(&reopened, "FILE1").score, 6);
    let _ = std::fs::remove_file(path);
}

// ── events ────────────────────────────────────────────────────────────────────

#[test]
fn events_update_running_totals() {
    let store = store_with("EVT1");
    store.append_event("EVT1", EventType::Run, json!({ "runs": 2 })).unwrap();
    store.append_event("EVT1", EventType::Boundary, json!({})).unwrap();
    store.append_event("EVT1", EventType::Wide, json!({})).unwrap();
    store.append_event("EVT1", EventType::NoBall, json!({ "extra": 1, "batRuns": 4 })).unwrap();
    store.append_event("EVT1", EventType::LegBye, json!({ "runs": 1 })).unwrap();
    let doc = store.append_event("EVT1", EventType::Wicket, json!({})).unwrap();

    let inn = doc.current_innings().unwrap();
    assert_eq!(inn.totals, Totals { score: 2 + 4 + 1 + 5 + 1, wickets: 1, balls: 4 });
    assert_eq!(inn.events.len(), 6);
    assert_eq!(inn.events[5].at_ball_index, 3);
    assert_eq!(inn.events[5].event_type, EventType::Wicket);
}

#[test]
fn events_for_unknown_match() {
    let store = EventStore::in_memory().unwrap();
    assert!(matches!(
        store.append_event("GHOST", EventType::Run, json!({ "runs": 1 })),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn innings_end_opens_the_chase() {
    let store = store_with("INN1");
    store.append_event("INN1", EventType::Six, json!({})).unwrap();
    let doc = store.append_event("INN1", EventType::InningsEnd, json!({ "target": 7 })).unwrap();

    assert_eq!(doc.innings_index, 1);
    let chase = doc.current_innings().unwrap();
    assert_eq!(chase.batting_team, "Tigers");
    assert_eq!(chase.bowling_team, "Lions");
    assert_eq!(chase.target, 7);
    assert_eq!(chase.totals, Totals::default());
}

#[test]
fn match_end_finishes_and_locks() {
    let store = store_with("END1");
    store.append_event("END1", EventType::Run, json!({ "runs": 1 })).unwrap();
    let doc = store
        .append_event("END1", EventType::MatchEnd, json!({ "result": "Lions won by 1 run(s)" }))
        .unwrap();
    assert_eq!(doc.status, MatchStatus::Finished);
    assert_eq!(doc.result.as_deref(), Some("Lions won by 1 run(s)"));

    assert!(matches!(
        store.append_event("END1", EventType::Run, json!({ "runs": 1 })),
        Err(StoreError::Finished(_))
    ));
}

// ── undo ──────────────────────────────────────────────────────────────────────

#[test]
fn undo_replays_the_remaining_events() {
    let store = store_with("UND1");
    store.append_event("UND1", EventType::Run, json!({ "runs": 3 })).unwrap();
    store.append_event("UND1", EventType::Wide, json!({ "runs": 2 })).unwrap();
    store.append_event("UND1", EventType::Wicket, json!({})).unwrap();

    let doc = store.undo_last_event("UND1").unwrap();
    let inn = doc.current_innings().unwrap();
    assert_eq!(inn.totals, Totals { score: 5, wickets: 0, balls: 1 });
    assert_eq!(inn.totals, replay(&inn.events));
}

#[test]
fn undo_takes_trailing_markers_with_the_ball() {
    let store = store_with("UND2");
    store.append_event("UND2", EventType::Run, json!({ "runs": 1 })).unwrap();
    store.append_event("UND2", EventType::Run, json!({ "runs": 2 })).unwrap();
    store.append_event("UND2", EventType::OverEnd, json!({ "over": 1 })).unwrap();

    let doc = store.undo_last_event("UND2").unwrap();
    let inn = doc.current_innings().unwrap();
    assert_eq!(inn.events.len(), 1);
    assert_eq!(inn.totals.score, 1);
}

#[test]
fn undo_reopens_the_previous_innings_and_match() {
    let store = store_with("UND3");
    store.append_event("UND3", EventType::Six, json!({})).unwrap();
    store.append_event("UND3", EventType::InningsEnd, json!({ "target": 7 })).unwrap();
    store.append_event("UND3", EventType::Run, json!({ "runs": 1 })).unwrap();
    store.append_event("UND3", EventType::MatchEnd, json!({ "result": "Lions won by 5 run(s)" })).unwrap();

    let doc = store.undo_last_event("UND3").unwrap();
    assert_eq!(doc.status, MatchStatus::Live);
    assert_eq!(doc.result, None);
    assert_eq!(doc.innings_index, 1);
    assert_eq!(doc.current_innings().unwrap().totals, Totals::default());

    let doc = store.undo_last_event("UND3").unwrap();
    assert_eq!(doc.innings_index, 0);
    assert_eq!(doc.innings.len(), 1);
    assert_eq!(doc.current_innings().unwrap().totals, Totals::default());
    assert!(doc.current_innings().unwrap().events.is_empty());
}

#[test]
fn undo_with_no_events() {
    let store = store_with("UND4");
    assert!(matches!(store.undo_last_event("UND4"), Err(StoreError::NothingToUndo)));

    store.append_event("UND4", EventType::OverEnd, json!({})).unwrap();
    assert!(matches!(store.undo_last_event("UND4"), Err(StoreError::NothingToUndo)));
}

#[test]
fn retire_is_undone_as_its_own_step() {
    let store = store_with("RET1");
    store.append_event("RET1", EventType::Run, json!({ "runs": 2 })).unwrap();
    store.append_event("RET1", EventType::Retire, json!({ "playerId": "lions_p1" })).unwrap();

    let doc = store.undo_last_event("RET1").unwrap();
    let inn = doc.current_innings().unwrap();
    assert_eq!(inn.events.len(), 1);
    assert_eq!(inn.totals, Totals { score: 2, wickets: 0, balls: 1 });
}

// ── agreement with the in-memory session ──────────────────────────────────────

#[test]
fn replay_undo_agrees_with_snapshot_undo() {
    let store = EventStore::in_memory().unwrap();
    let mut s = session(1);
    apply_local(&store, &s.create_command()).unwrap();

    let run = |s: &mut Session, action: Action| {
        let applied = s.apply(action).unwrap();
        for cmd in &applied.commands {
            apply_local(&store, cmd).unwrap();
        }
    };

    let script = [
        Action::Ball(BallAction::runs(4)),
        Action::Ball(BallAction::wide(2)),
        Action::Ball(BallAction::no_ball(1)),
        Action::Ball(BallAction::runs(1)),
        Action::Undo,
        Action::Ball(BallAction::bye(2)),
        Action::Ball(BallAction::runs(0)),
        Action::Ball(BallAction::runs(6)),
        Action::Ball(BallAction::runs(2)),
        Action::Undo,
        Action::Undo,
    ];
    for action in script {
        run(&mut s, action);
        let m = s.current();
        let t = totals(&store, &m.id);
        assert_eq!((t.score, t.wickets, t.balls), (m.score, m.wickets, m.total_balls), "after {action:?}");
    }

    // finish the innings: both sides open the chase together
    for action in [BallAction::runs(0), BallAction::runs(0), BallAction::runs(1)] {
        run(&mut s, Action::Ball(action));
    }
    let doc = store.fetch_by_code("TEST01").unwrap().unwrap();
    assert_eq!(s.current().innings, 2);
    assert_eq!(doc.innings_index, 1);
    assert_eq!(doc.current_innings().unwrap().target, s.current().target);

    // and undoing the over-ending ball takes both back
    run(&mut s, Action::Undo);
    let doc = store.fetch_by_code("TEST01").unwrap().unwrap();
    assert_eq!(doc.innings_index, 0);
    let t = doc.current_innings().unwrap().totals;
    assert_eq!((t.score, t.balls), (s.current().score, s.current().total_balls));
}
