/// Tests for innings and match transitions and result strings.
use super::{a, b, live_match, live_match_with};
use crate::scoring::{process_ball, process_retirement, process_wicket};
use crate::transition::{evaluate_transition, innings_complete, result_text, Transition};
use crate::types::{BallAction, Match, MatchStatus, Team};

/// Team B chasing `target` in a 20-over match.
fn chase(target: u32, score: u32, wickets: u32, balls: u32) -> Match {
    let mut m = live_match(20);
    m.innings = 2;
    m.batting = Team::TeamB;
    m.target = target;
    m.score = score;
    m.wickets = wickets;
    m.total_balls = balls;
    m.striker = Some(b(1));
    m.non_striker = Some(b(2));
    m.bowler = Some(a(11));
    m
}

// ── first innings ─────────────────────────────────────────────────────────────

#[test]
fn innings_ends_when_overs_run_out() {
    let mut m = live_match(1);
    for r in [1, 2, 0, 4, 0] {
        m = process_ball(&m, BallAction::runs(r)).unwrap().state;
        assert_eq!(evaluate_transition(m.clone()).transition, Transition::None);
    }
    m = process_ball(&m, BallAction::runs(6)).unwrap().state;

    let eval = evaluate_transition(m);
    assert_eq!(eval.transition, Transition::InningsBreak { target: 14 });

    let next = eval.state;
    assert_eq!(next.innings, 2);
    assert_eq!(next.status, MatchStatus::Break);
    assert_eq!(next.batting, Team::TeamB);
    assert_eq!(next.target, 14);
    assert_eq!((next.score, next.wickets, next.total_balls), (0, 0, 0));
    assert!(next.current_over.is_empty());
    assert_eq!((next.striker.clone(), next.non_striker.clone(), next.bowler.clone()), (None, None, None));
    assert_eq!(next.extras.runs, 0);
}

#[test]
fn first_innings_figures_survive_the_break() {
    let mut m = live_match(1);
    for _ in 0..6 {
        m = process_ball(&m, BallAction::runs(2)).unwrap().state;
    }
    let next = evaluate_transition(m).state;

    let a1 = next.team_a.player(&a(1)).unwrap();
    assert_eq!((a1.runs, a1.balls), (12, 6));
    assert_eq!(a1.bowl_balls, 0);

    let b11 = next.team_b.player(&b(11)).unwrap();
    assert_eq!((b11.bowl_balls, b11.bowl_runs), (6, 12));
    assert_eq!((b11.runs, b11.balls), (0, 0));
}

#[test]
fn transition_fires_once() {
    let mut m = live_match(1);
    for _ in 0..6 {
        m = process_ball(&m, BallAction::runs(1)).unwrap().state;
    }
    let first = evaluate_transition(m);
    assert!(first.transitioned());

    let again = evaluate_transition(first.state.clone());
    assert!(!again.transitioned());
    assert_eq!(again.state, first.state);
}

#[test]
fn all_out_ends_the_innings() {
    let mut m = live_match(20);
    m.wickets = 9;
    m = process_wicket(&m).unwrap().state;
    assert_eq!(m.wickets, 10);
    assert!(innings_complete(&m));
    assert!(matches!(evaluate_transition(m).transition, Transition::InningsBreak { .. }));
}

#[test]
fn short_squad_is_all_out_sooner() {
    // three players: two wickets leave one batter standing
    let mut m = live_match_with(20, 3, 11);
    m = process_wicket(&m).unwrap().state;
    assert!(!innings_complete(&m));
    m.striker = Some(a(3));
    m = process_wicket(&m).unwrap().state;
    assert!(innings_complete(&m));
}

#[test]
fn retirements_can_end_the_innings() {
    let m = process_retirement(&live_match_with(20, 2, 11)).unwrap();
    assert_eq!(m.wickets, 0);
    assert!(innings_complete(&m));
}

// ── second innings results ────────────────────────────────────────────────────

#[test]
fn chase_won_reports_wickets_and_balls_left() {
    // 120/6 first innings, target 121; 121/4 in 18.3 overs
    let eval = evaluate_transition(chase(121, 121, 4, 111));
    assert_eq!(
        eval.transition,
        Transition::MatchFinished { result: "Team B won by 6 wicket(s) with 9 ball(s) left".into() }
    );
    assert_eq!(eval.state.status, MatchStatus::Finished);
    assert_eq!(eval.state.result.as_deref(), Some("Team B won by 6 wicket(s) with 9 ball(s) left"));
}

#[test]
fn defended_total_reports_runs() {
    let m = chase(121, 119, 10, 118);
    assert_eq!(result_text(&m), "Team A won by 1 run(s)");
    let eval = evaluate_transition(m);
    assert!(matches!(eval.transition, Transition::MatchFinished { .. }));
}

#[test]
fn level_scores_tie() {
    let eval = evaluate_transition(chase(121, 120, 10, 117));
    assert_eq!(eval.transition, Transition::MatchFinished { result: "Match tied".into() });
}

#[test]
fn overs_running_out_in_the_chase_finishes_the_match() {
    let eval = evaluate_transition(chase(150, 140, 3, 120));
    assert_eq!(
        eval.transition,
        Transition::MatchFinished { result: "Team A won by 9 run(s)".into() }
    );
}

#[test]
fn chase_in_progress_is_not_a_transition() {
    let eval = evaluate_transition(chase(121, 100, 3, 90));
    assert_eq!(eval.transition, Transition::None);
    assert_eq!(eval.state.status, MatchStatus::Live);
}

#[test]
fn finished_match_never_transitions_again() {
    let done = evaluate_transition(chase(121, 121, 4, 111)).state;
    let eval = evaluate_transition(done.clone());
    assert_eq!(eval.transition, Transition::None);
    assert_eq!(eval.state, done);
}
