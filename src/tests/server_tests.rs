/// Tests for request validation on the scoring routes.
use axum::http::StatusCode;
use serde_json::json;

use crate::server::BallRequest;
use crate::types::BallAction;

fn ball(body: serde_json::Value) -> Result<BallAction, StatusCode> {
    let req: BallRequest = serde_json::from_value(body).unwrap();
    req.into_action().map_err(|(status, _)| status)
}

// ── BallRequest ───────────────────────────────────────────────────────────────

#[test]
fn plain_and_extra_deliveries() {
    assert_eq!(ball(json!({ "runs": 4 })), Ok(BallAction::runs(4)));
    assert_eq!(ball(json!({ "extra": "wide" })), Ok(BallAction::wide(1)));
    assert_eq!(ball(json!({ "extra": "wide", "runs": 3 })), Ok(BallAction::wide(3)));
    assert_eq!(ball(json!({ "extra": "noball", "bat_runs": 2 })), Ok(BallAction::no_ball(2)));
    assert_eq!(ball(json!({ "extra": "legbye", "runs": 1 })), Ok(BallAction::leg_bye(1)));
}

#[test]
fn no_ball_rejects_runs_outside_bat_runs() {
    assert_eq!(ball(json!({ "extra": "noball", "runs": 3 })), Err(StatusCode::BAD_REQUEST));
    assert_eq!(
        ball(json!({ "extra": "noball", "runs": 1, "bat_runs": 1 })),
        Err(StatusCode::BAD_REQUEST)
    );
}

#[test]
fn runs_above_the_limit_are_rejected() {
    assert_eq!(ball(json!({ "runs": 7 })), Err(StatusCode::BAD_REQUEST));
    assert_eq!(ball(json!({ "extra": "wide", "runs": 8 })), Err(StatusCode::BAD_REQUEST));
    assert_eq!(ball(json!({ "extra": "noball", "bat_runs": 7 })), Err(StatusCode::BAD_REQUEST));
}
