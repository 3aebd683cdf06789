//! Replay engine
//!
//! State machine that walks a candle series one bar at a time. The current
//! candle's close and time are the execution price and timestamp handed to
//! the simulator. The engine owns no timer: hosts call [`ReplayEngine::tick`]
//! every [`ReplayEngine::tick_interval`] while playing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::ReplayConfig;
use crate::{Candle, Symbol};

#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("speed must be within 0.01..=1000, got {0}")]
    InvalidSpeed(f64),

    #[error("unsupported interval {0:?} (expected one of 5m, 1h, 2h, 4h, 1d, 1wk)")]
    UnknownInterval(String),
}

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayStatus {
    Idle,
    Playing,
    Paused,
    Completed,
}

/// Candle granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::FiveMinutes => "5m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
        }
    }

    /// Longest history range available at this granularity
    pub fn max_range(self) -> &'static str {
        match self {
            Interval::FiveMinutes => "30d",
            Interval::OneHour | Interval::TwoHours | Interval::FourHours => "2y",
            Interval::OneDay => "5y",
            Interval::OneWeek => "10y",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5m" => Ok(Interval::FiveMinutes),
            "1h" => Ok(Interval::OneHour),
            "2h" => Ok(Interval::TwoHours),
            "4h" => Ok(Interval::FourHours),
            "1d" => Ok(Interval::OneDay),
            "1wk" => Ok(Interval::OneWeek),
            other => Err(ReplayError::UnknownInterval(other.to_string())),
        }
    }
}

/// Snapshot of the replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayState {
    pub index: usize,
    pub speed: f64,
    pub status: ReplayStatus,
    pub symbol: Symbol,
    pub interval: Interval,
    pub range: String,
    pub candles: Vec<Candle>,
}

pub struct ReplayEngine {
    state: ReplayState,
    step_size: usize,
    seek_size: usize,
}

impl ReplayEngine {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            state: ReplayState {
                index: 0,
                speed: config.default_speed,
                status: ReplayStatus::Idle,
                symbol: Symbol::new(""),
                interval: Interval::OneDay,
                range: String::new(),
                candles: Vec::new(),
            },
            step_size: config.step_size,
            seek_size: config.seek_size,
        }
    }

    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    pub fn status(&self) -> ReplayStatus {
        self.state.status
    }

    pub fn index(&self) -> usize {
        self.state.index
    }

    pub fn speed(&self) -> f64 {
        self.state.speed
    }

    pub fn candles(&self) -> &[Candle] {
        &self.state.candles
    }

    /// Candle at the replay cursor
    pub fn current_candle(&self) -> Option<&Candle> {
        self.state.candles.get(self.state.index)
    }

    /// `(close, time)` of the current candle
    pub fn current_quote(&self) -> Option<(f64, i64)> {
        self.current_candle().map(|c| (c.close, c.time))
    }

    /// Candles revealed so far (up to and including the cursor)
    pub fn visible_candles(&self) -> &[Candle] {
        let end = (self.state.index + 1).min(self.state.candles.len());
        &self.state.candles[..end]
    }

    fn last_index(&self) -> usize {
        self.state.candles.len().saturating_sub(1)
    }

    /// Load a new series, rewinding to the start
    pub fn set_data(
        &mut self,
        candles: Vec<Candle>,
        symbol: Symbol,
        interval: Interval,
        range: impl Into<String>,
    ) {
        self.state.candles = candles;
        self.state.symbol = symbol;
        self.state.interval = interval;
        self.state.range = range.into();
        self.stop();
        debug!(
            "Replay loaded {} candles for {} ({} / {})",
            self.state.candles.len(),
            self.state.symbol,
            self.state.interval,
            self.state.range
        );
    }

    /// Start playing. Ignored when completed or without data.
    pub fn play(&mut self) {
        if self.state.status == ReplayStatus::Completed || self.state.candles.is_empty() {
            return;
        }
        self.state.status = ReplayStatus::Playing;
    }

    pub fn pause(&mut self) {
        if self.state.status == ReplayStatus::Playing {
            self.state.status = ReplayStatus::Paused;
        }
    }

    /// Back to idle at the first candle
    pub fn stop(&mut self) {
        self.state.status = ReplayStatus::Idle;
        self.state.index = 0;
    }

    pub fn step_forward(&mut self) {
        self.pause();
        if self.state.index < self.last_index() {
            self.state.index = (self.state.index + self.step_size).min(self.last_index());
            if self.state.index >= self.last_index() {
                self.state.status = ReplayStatus::Completed;
            }
        }
    }

    pub fn step_back(&mut self) {
        self.pause();
        if self.state.index > 0 {
            self.move_to(self.state.index.saturating_sub(self.step_size));
        }
    }

    /// Move the cursor by `delta` bars, clamped to the series
    pub fn seek_by(&mut self, delta: isize) {
        let target = self.state.index as isize + delta;
        self.seek_to_index(target.max(0) as usize);
    }

    /// Jump to bar `index`, clamped to the series
    pub fn seek_to_index(&mut self, index: usize) {
        self.pause();
        if self.state.candles.is_empty() {
            return;
        }
        self.move_to(index.min(self.last_index()));
    }

    pub fn fast_forward(&mut self) {
        self.seek_by(self.seek_size as isize);
    }

    pub fn rewind(&mut self) {
        self.seek_by(-(self.seek_size as isize));
    }

    /// Jump to the candle whose time is nearest to `target_time`
    pub fn seek_to_time(&mut self, target_time: i64) {
        self.pause();
        let candles = &self.state.candles;
        if candles.is_empty() {
            return;
        }

        let (mut left, mut right) = (0isize, candles.len() as isize - 1);
        let mut closest = 0usize;
        let mut min_diff = u64::MAX;

        while left <= right {
            let mid = ((left + right) / 2) as usize;
            let time = candles[mid].time;
            let diff = time.abs_diff(target_time);
            if diff < min_diff {
                min_diff = diff;
                closest = mid;
            }
            if time < target_time {
                left = mid as isize + 1;
            } else {
                right = mid as isize - 1;
            }
        }

        self.move_to(closest);
    }

    fn move_to(&mut self, index: usize) {
        self.state.index = index;
        if index >= self.last_index() {
            self.state.status = ReplayStatus::Completed;
        } else if self.state.status == ReplayStatus::Completed {
            self.state.status = ReplayStatus::Idle;
        }
    }

    /// Set playback speed within `MIN_SPEED..=MAX_SPEED`
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ReplayError> {
        if !(ReplayConfig::MIN_SPEED..=ReplayConfig::MAX_SPEED).contains(&speed) {
            return Err(ReplayError::InvalidSpeed(speed));
        }
        self.state.speed = speed;
        Ok(())
    }

    /// Advance to the next speed preset, wrapping back to the slowest
    pub fn cycle_speed(&mut self) -> f64 {
        let presets = ReplayConfig::SPEED_PRESETS;
        let next = presets
            .iter()
            .copied()
            .find(|p| *p > self.state.speed)
            .unwrap_or(presets[0]);
        self.state.speed = next;
        next
    }

    /// Time between ticks at the current speed (one candle per second at 1x)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.state.speed)
    }

    /// Advance one candle while playing. Returns whether the cursor moved.
    pub fn tick(&mut self) -> bool {
        if self.state.status != ReplayStatus::Playing {
            return false;
        }

        let last = self.last_index();
        if self.state.index >= last {
            self.state.index = last;
            self.state.status = ReplayStatus::Completed;
            return false;
        }

        self.state.index += 1;
        if self.state.index >= last {
            self.state.status = ReplayStatus::Completed;
        }
        true
    }
}
