//! Fire-and-forget mirroring of scoring events into the event-log store.
//!
//! Commands are queued on a bounded channel and drained by one worker task, so
//! they reach the store in the order they were scored. The scoring path never
//! waits on the store; failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::store::{CreateMatchRequest, EventStore, EventType, StoreError};

const QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorCommand {
    Create(CreateMatchRequest),
    Append {
        code: String,
        event: EventType,
        payload: Value,
    },
    Undo {
        code: String,
    },
}

impl MirrorCommand {
    pub fn append(code: &str, event: EventType, payload: Value) -> Self {
        Self::Append { code: code.to_string(), event, payload }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Append { .. } => "append",
            Self::Undo { .. } => "undo",
        }
    }
}

/// Where mirrored commands land.
pub enum MirrorTarget {
    /// The in-process `SQLite` store.
    Local(Arc<EventStore>),
    /// Another instance's store routes over HTTP.
    Remote(RemoteMirror),
}

pub struct RemoteMirror {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteMirror {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building mirror http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, cmd: &MirrorCommand) -> Result<()> {
        let req = match cmd {
            MirrorCommand::Create(body) => self
                .http
                .post(format!("{}/api/matches", self.base_url))
                .json(body),
            MirrorCommand::Append { code, event, payload } => self
                .http
                .post(format!("{}/api/matches/{code}/events", self.base_url))
                .json(&serde_json::json!({ "type": event, "payload": payload })),
            MirrorCommand::Undo { code } => self
                .http
                .post(format!("{}/api/matches/{code}/undo", self.base_url)),
        };
        let resp = req.send().await.context("mirror request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("mirror returned {status}: {body}");
        }
        Ok(())
    }
}

/// Applies one command to a local store.
pub fn apply_local(store: &EventStore, cmd: &MirrorCommand) -> Result<(), StoreError> {
    match cmd {
        MirrorCommand::Create(req) => store.create_match(req).map(|_| ()),
        MirrorCommand::Append { code, event, payload } => {
            store.append_event(code, *event, payload.clone()).map(|_| ())
        }
        MirrorCommand::Undo { code } => store.undo_last_event(code).map(|_| ()),
    }
}

/// Handle held by the scoring side. A disabled mirror drops everything.
#[derive(Clone, Default)]
pub struct Mirror {
    tx: Option<mpsc::Sender<MirrorCommand>>,
}

impl Mirror {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn from_sender(tx: mpsc::Sender<MirrorCommand>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Starts the worker task; must be called inside a tokio runtime.
    pub fn spawn(target: MirrorTarget) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run_worker(target, rx));
        Self::from_sender(tx)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn send(&self, cmd: MirrorCommand) {
        let Some(tx) = &self.tx else { return };
        let kind = cmd.kind();
        if let Err(e) = tx.try_send(cmd) {
            tracing::warn!(kind, error = %e, "mirror queue rejected command, dropping");
        }
    }

    pub fn send_all(&self, cmds: impl IntoIterator<Item = MirrorCommand>) {
        for cmd in cmds {
            self.send(cmd);
        }
    }
}

async fn run_worker(target: MirrorTarget, mut rx: mpsc::Receiver<MirrorCommand>) {
    let mode = match &target {
        MirrorTarget::Local(_) => "local",
        MirrorTarget::Remote(_) => "remote",
    };
    tracing::info!(mode, "mirror worker started");

    while let Some(cmd) = rx.recv().await {
        let kind = cmd.kind();
        let outcome = match &target {
            MirrorTarget::Local(store) => {
                let store = store.clone();
                let job = cmd.clone();
                match tokio::task::spawn_blocking(move || apply_local(&store, &job)).await {
                    Ok(res) => res.map_err(anyhow::Error::from),
                    Err(e) => Err(anyhow::Error::from(e)),
                }
            }
            MirrorTarget::Remote(remote) => remote.send(&cmd).await,
        };
        match outcome {
            Ok(()) => tracing::debug!(kind, "mirrored"),
            Err(e) => tracing::warn!(kind, error = %e, "mirror write failed"),
        }
    }

    tracing::info!("mirror worker stopped");
}
