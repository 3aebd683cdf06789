// Session persistence
// Versioned JSON snapshots of a paper-trading session
//
// A snapshot carries everything needed to resume: the account, the trade
// history and the initial cash used by reset.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::CONFIG_VERSION;
use crate::session::Session;
use crate::sim::ExecutionEngine;
use crate::{reserve_trade_ids_through, Portfolio, Symbol, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: String,
    pub symbol: Symbol,
    pub initial_cash: f64,
    pub portfolio: Portfolio,
    pub trades: Vec<Trade>,
    /// Last replay bar processed; orders up to it have already run
    #[serde(default)]
    pub last_bar: Option<usize>,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn capture(session: &Session) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            symbol: session.symbol().clone(),
            initial_cash: session.initial_cash(),
            portfolio: session.portfolio().clone(),
            trades: session.trades().to_vec(),
            last_bar: session.last_bar(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session using `engine` for future executions
    pub fn into_session(self, engine: ExecutionEngine) -> Session {
        if let Some(max_id) = self.trades.iter().map(|t| t.id).max() {
            reserve_trade_ids_through(max_id);
        }
        let mut session =
            Session::restore(self.symbol, self.initial_cash, engine, self.portfolio, self.trades);
        if let Some(bar) = self.last_bar {
            session.record_bar(bar);
        }
        session
    }
}

pub struct JsonStateManager {
    path: PathBuf,
}

impl JsonStateManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = SessionSnapshot::capture(session);
        let json = serde_json::to_string_pretty(&snapshot)?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write session: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("Failed to move session into place: {}", self.path.display())
        })?;

        info!(
            "Saved {} session ({} trades) to {}",
            snapshot.symbol,
            snapshot.trades.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load the snapshot, rejecting other format versions
    pub fn load(&self) -> Result<SessionSnapshot> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&contents).context("Failed to parse session JSON")?;

        if snapshot.version != CONFIG_VERSION {
            warn!(
                "Session {} has version {}, expected {}",
                self.path.display(),
                snapshot.version,
                CONFIG_VERSION
            );
            anyhow::bail!(
                "Unsupported session version {} (expected {})",
                snapshot.version,
                CONFIG_VERSION
            );
        }

        if let Some(max_id) = snapshot.trades.iter().map(|t| t.id).max() {
            reserve_trade_ids_through(max_id);
        }

        info!(
            "Loaded {} session ({} trades) saved at {}",
            snapshot.symbol,
            snapshot.trades.len(),
            snapshot.saved_at
        );
        Ok(snapshot)
    }

    pub fn clear(&self) -> Result<()> {
        if self.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session: {}", self.path.display()))?;
        }
        Ok(())
    }
}
