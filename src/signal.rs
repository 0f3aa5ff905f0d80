use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::types::CricketSignal;

/// Reads scoring signals from stdin, one per line.
/// Type "4", "W", "Wd2", "N1", "LB1", "R" or "U" into the terminal.
pub async fn run_stdin(signal_tx: mpsc::Sender<CricketSignal>) {
    tracing::info!("signal listener started (stdin mode)");
    tracing::info!("enter signals: 0-6, W, Wd[1-6], N[1-6], B[1-6], LB[1-6], R, U");

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let raw = line.trim().to_string();
                if raw.is_empty() {
                    continue;
                }

                match CricketSignal::parse(&raw) {
                    Some(signal) => {
                        tracing::info!(signal = %signal, "signal received");
                        if signal_tx.send(signal).await.is_err() {
                            tracing::error!("signal channel closed");
                            return;
                        }
                    }
                    None => {
                        tracing::warn!(input = raw, "unknown signal, ignoring");
                    }
                }
            }
            Ok(None) => {
                tracing::info!("stdin closed, signal listener stopping");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "stdin read error");
                return;
            }
        }
    }
}

/// Parses a whitespace- or comma-separated signal script, as used by the
/// replay tool. Lines starting with `#` are comments. Unknown tokens are
/// returned as errors with their 1-based line number.
pub fn parse_script(script: &str) -> Result<Vec<CricketSignal>, (usize, String)> {
    let mut signals = Vec::new();
    for (n, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split(|c: char| c.is_whitespace() || c == ',') {
            if token.is_empty() {
                continue;
            }
            let signal = CricketSignal::parse(token).ok_or_else(|| (n + 1, token.to_string()))?;
            signals.push(signal);
        }
    }
    Ok(signals)
}
