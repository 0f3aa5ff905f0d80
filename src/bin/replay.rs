//! Replays a signal script through the scoring session and prints the JSON
//! summary followed by both CSV scorecards.
//!
//! Usage: `replay <script> [overs]` (`-` reads stdin). Openers, incoming
//! batters and bowlers are picked automatically in squad order.

use std::io::Read;

use anyhow::{Context, Result};

use cricket_scorer::export;
use cricket_scorer::session::{Prompt, Session};
use cricket_scorer::signal::parse_script;
use cricket_scorer::types::{MatchSetup, Team, TeamSetup, Toss, TossDecision};

fn squad(name: &str) -> TeamSetup {
    TeamSetup {
        name: name.to_string(),
        players: (1..=11).map(|i| format!("{name} {i}")).collect(),
    }
}

/// Resolves every pending prompt with the first eligible player.
fn auto_resolve(session: &mut Session) -> Result<()> {
    while let Some(prompt) = session.pending().first().cloned() {
        let m = session.current();
        match prompt {
            Prompt::Openers => {
                let batters: Vec<String> = m
                    .batting_squad()
                    .players
                    .iter()
                    .filter(|p| !p.is_out)
                    .take(2)
                    .map(|p| p.id.clone())
                    .collect();
                let bowler = m.bowling_squad().players.last().map(|p| p.id.clone());
                match (batters.as_slice(), bowler) {
                    ([s, ns], Some(b)) => {
                        let (s, ns) = (s.clone(), ns.clone());
                        session.set_openers(&s, &ns, &b)?;
                    }
                    _ => anyhow::bail!("not enough players to open the innings"),
                }
            }
            Prompt::NextBatter(candidates) => {
                let next = candidates.first().context("no batter candidates")?.clone();
                session.select_batter(&next)?;
            }
            Prompt::NextBowler => {
                let previous = m.history.last().and_then(|s| s.bowler.clone());
                let next = m
                    .bowling_squad()
                    .players
                    .iter()
                    .rev()
                    .find(|p| Some(&p.id) != previous.as_ref())
                    .map(|p| p.id.clone())
                    .context("no bowler available")?;
                session.select_bowler(&next)?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: replay <script> [overs]")?;
    let overs: u32 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid overs: {raw}"))?,
        None => 20,
    };

    let script = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
        buf
    } else {
        std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?
    };
    let signals = parse_script(&script)
        .map_err(|(line, token)| anyhow::anyhow!("line {line}: unknown signal {token:?}"))?;

    let setup = MatchSetup {
        team_a: squad("Home"),
        team_b: squad("Away"),
        overs,
        toss: Toss { winner: Team::TeamA, decision: TossDecision::Bat },
        striker_id: None,
        non_striker_id: None,
        bowler_id: None,
        code: Some("REPLAY".to_string()),
    };
    let mut session = Session::start(setup)
        .map_err(|e| anyhow::anyhow!("{e}: {}", e.details().join(", ")))?;

    for signal in signals {
        auto_resolve(&mut session)?;
        if session.current().is_finished() {
            tracing::warn!(signal = %signal, "match already finished, ignoring rest of script");
            break;
        }
        if let Err(e) = session.apply(signal.clone().into_action()) {
            tracing::warn!(signal = %signal, error = %e, "signal rejected");
        }
    }

    let m = session.current();
    println!("{}", export::summary_json(m)?);
    for team in [Team::TeamA, Team::TeamB] {
        println!();
        println!("# {}", m.team_name(team));
        print!("{}", export::scorecard_csv(m, team)?);
    }
    Ok(())
}
