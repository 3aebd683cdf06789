//! Replay command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use stock_replay::data::{self, ScheduledOrder};
use stock_replay::export::write_trades_csv;
use stock_replay::sim::ExecutionEngine;
use stock_replay::state_manager::JsonStateManager;
use stock_replay::{Config, Interval, ReplayEngine, Session, Symbol};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Candle CSV (time,open,high,low,close,volume)
    #[arg(short, long)]
    pub data: String,

    /// Ticker symbol label
    #[arg(short, long)]
    pub symbol: String,

    /// Candle interval (5m, 1h, 2h, 4h, 1d, 1wk)
    #[arg(short, long, default_value = "1d")]
    pub interval: String,

    /// History range label, defaults to the interval's maximum
    #[arg(long)]
    pub range: Option<String>,

    /// Scripted orders CSV (bar,side,qty)
    #[arg(short, long)]
    pub orders: Option<String>,

    /// Playback speed multiplier (0.5, 1, 2, 4, ...)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Pace playback in real time instead of replaying instantly
    #[arg(long)]
    pub realtime: bool,

    /// Session file to resume from and save to
    #[arg(long)]
    pub session: Option<String>,

    /// Start a fresh session even if the session file exists
    #[arg(long)]
    pub reset: bool,

    /// Trade log output (defaults to {results_dir}/{symbol}_trades.csv)
    #[arg(short, long)]
    pub export: Option<String>,
}

/// Feeds the replay cursor into the session, executing scripted orders
/// when their bar is reached.
pub struct ScriptedReplay {
    pub engine: ReplayEngine,
    pub session: Session,
    pending: VecDeque<ScheduledOrder>,
    pub rejected: usize,
}

impl ScriptedReplay {
    /// Resumed sessions continue from their last processed bar; orders
    /// scheduled up to that bar have already run and are dropped.
    pub fn new(mut engine: ReplayEngine, session: Session, orders: Vec<ScheduledOrder>) -> Self {
        let mut pending: VecDeque<ScheduledOrder> = orders.into();
        if let Some(bar) = session.last_bar() {
            engine.seek_to_index(bar);
            let before = pending.len();
            pending.retain(|o| o.bar > bar);
            info!(
                "Resuming at bar {} ({} orders already executed)",
                engine.index(),
                before - pending.len()
            );
        }
        Self {
            engine,
            session,
            pending,
            rejected: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Mark to market at the current candle and run orders scheduled for it
    pub fn process_bar(&mut self) {
        let Some((price, time)) = self.engine.current_quote() else {
            return;
        };
        let index = self.engine.index();
        self.session.mark_to_market(price);

        while self.pending.front().is_some_and(|o| o.bar <= index) {
            let Some(scheduled) = self.pending.pop_front() else {
                break;
            };
            if let Err(e) = self.session.submit(&scheduled.order, price, time) {
                warn!(
                    "Bar {}: {} {} rejected: {}",
                    index, scheduled.order.side, scheduled.order.qty, e
                );
                self.rejected += 1;
            }
        }
        self.session.record_bar(index);
    }

    /// Replay every remaining bar without pacing
    pub fn run_to_end(&mut self) {
        self.process_bar();
        self.engine.play();
        while self.engine.tick() {
            self.process_bar();
        }
    }

    /// Replay paced by the engine's tick interval; Ctrl+C pauses and stops
    pub async fn run_realtime(&mut self) -> Result<()> {
        self.process_bar();
        self.engine.play();

        let mut ticker = tokio::time::interval(self.engine.tick_interval());
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.engine.tick() {
                        break;
                    }
                    self.process_bar();
                    if let Some(candle) = self.engine.current_candle() {
                        debug!(
                            "Bar {} t={} close={:.2} equity={:.2}",
                            self.engine.index(),
                            candle.time,
                            candle.close,
                            self.session.portfolio().equity
                        );
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, pausing replay");
                    self.engine.pause();
                    break;
                }
            }
        }
        Ok(())
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!("Loaded configuration from: {}", path);
            Ok(config)
        }
        None => {
            let mut config = Config::default();
            config.apply_env()?;
            config.validate()?;
            info!("Using default configuration");
            Ok(config)
        }
    }
}

fn open_session(args: &ReplayArgs, symbol: &Symbol, config: &Config) -> Result<Session> {
    let Some(path) = &args.session else {
        return Ok(Session::new(symbol.clone(), config));
    };

    let manager = JsonStateManager::new(path);
    if args.reset || !manager.exists() {
        return Ok(Session::new(symbol.clone(), config));
    }

    let snapshot = manager.load()?;
    if &snapshot.symbol != symbol {
        anyhow::bail!(
            "Session {} is for {}, not {} (use --reset to start over)",
            path,
            snapshot.symbol,
            symbol
        );
    }
    Ok(snapshot.into_session(ExecutionEngine::from_config(config)))
}

pub fn run(args: ReplayArgs) -> Result<()> {
    info!("Starting replay");

    let config = load_config(args.config.as_deref())?;
    let symbol = Symbol::parse(&args.symbol)?;
    let interval: Interval = args.interval.parse()?;
    let range = args
        .range
        .clone()
        .unwrap_or_else(|| interval.max_range().to_string());

    let candles = data::load_csv(&args.data, config.replay.max_candles)
        .with_context(|| format!("Failed to load candles for {}", symbol))?;
    if candles.is_empty() {
        anyhow::bail!("No valid candles in {}", args.data);
    }

    let orders = match &args.orders {
        Some(path) => data::load_orders(path)?,
        None => Vec::new(),
    };
    if let Some(last) = orders.last() {
        if last.bar >= candles.len() {
            warn!(
                "Order file schedules bar {} but only {} candles are loaded",
                last.bar,
                candles.len()
            );
        }
    }
    info!("Scheduled {} orders over {} candles", orders.len(), candles.len());

    let session = open_session(&args, &symbol, &config)?;

    let mut engine = ReplayEngine::new(&config.replay);
    engine.set_data(candles, symbol.clone(), interval, range);
    if let Some(speed) = args.speed {
        engine.set_speed(speed)?;
    }

    let mut replay = ScriptedReplay::new(engine, session, orders);
    if args.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime")?;
        runtime.block_on(replay.run_realtime())?;
    } else {
        replay.run_to_end();
    }

    let portfolio = replay.session.portfolio();
    let stats = replay.session.stats();

    println!("\n{}", "=".repeat(60));
    println!("REPLAY RESULTS ({} {})", symbol, interval);
    println!("{}", "=".repeat(60));
    println!(
        "Bars Replayed:      {}/{}",
        replay.engine.index() + 1,
        replay.engine.candles().len()
    );
    println!("Initial Cash:       ${:.2}", replay.session.initial_cash());
    println!("Cash:               ${:.2}", portfolio.cash);
    println!("Position:           {} @ {:.2}", portfolio.position_qty, portfolio.avg_price);
    println!("Unrealized P&L:     ${:.2}", portfolio.pnl_unrealized);
    println!("Equity:             ${:.2}", portfolio.equity);
    println!("Total Return:       {:.2}%", replay.session.total_return_pct());
    println!("{}", "-".repeat(60));
    super::print_stats(&stats);
    println!("Rejected Orders:    {}", replay.rejected);
    println!("{}", "=".repeat(60));

    if replay.pending() > 0 {
        warn!("{} scheduled orders were never reached", replay.pending());
    }

    let export_path = args.export.clone().map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(&config.output.results_dir).join(format!("{}_trades.csv", symbol))
    });
    write_trades_csv(&export_path, &symbol, replay.session.trades())?;

    if let Some(path) = &args.session {
        JsonStateManager::new(path).save(&replay.session)?;
    }

    info!("Replay completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stock_replay::config::ReplayConfig;
    use stock_replay::sim::{FeeModel, SlippageModel};
    use stock_replay::state_manager::SessionSnapshot;
    use stock_replay::{Candle, OrderRequest, OrderSide, ReplayStatus, Trade};

    fn engine(closes: &[f64]) -> ReplayEngine {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle::new_unchecked(i as i64 * 86_400, *c, c + 1.0, c - 1.0, *c, 1.0))
            .collect();
        let mut engine = ReplayEngine::new(&ReplayConfig::default());
        engine.set_data(candles, Symbol::new("AAPL"), Interval::OneDay, "5y");
        engine
    }

    fn session() -> Session {
        Session::with_engine(
            Symbol::new("AAPL"),
            10_000.0,
            ExecutionEngine::new(FeeModel::zero(), SlippageModel::zero()),
        )
    }

    fn replay(closes: &[f64], orders: Vec<ScheduledOrder>) -> ScriptedReplay {
        ScriptedReplay::new(engine(closes), session(), orders)
    }

    fn at(bar: usize, order: OrderRequest) -> ScheduledOrder {
        ScheduledOrder { bar, order }
    }

    fn fills(trades: &[Trade]) -> Vec<(OrderSide, u64, f64, i64)> {
        trades.iter().map(|t| (t.side, t.qty, t.price, t.time)).collect()
    }

    #[test]
    fn test_orders_fill_at_their_bar_close() {
        let orders = vec![at(0, OrderRequest::buy(10)), at(2, OrderRequest::sell(10))];
        let mut r = replay(&[10.0, 11.0, 12.0, 13.0], orders);
        r.run_to_end();

        assert_eq!(r.engine.status(), ReplayStatus::Completed);
        assert_eq!(r.session.trades().len(), 2);
        assert_eq!(r.session.trades()[0].price, 10.0);
        assert_eq!(r.session.trades()[1].price, 12.0);
        assert_eq!(r.session.trades()[1].time, 2 * 86_400);
        assert_eq!(r.session.portfolio().pnl_realized, 20.0);
        assert_eq!(r.session.last_bar(), Some(3));
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn test_rejected_and_unreached_orders() {
        let orders = vec![at(1, OrderRequest::cover(5)), at(9, OrderRequest::buy(5))];
        let mut r = replay(&[10.0, 11.0, 12.0], orders);
        r.run_to_end();

        assert_eq!(r.rejected, 1);
        assert_eq!(r.pending(), 1);
        assert!(r.session.trades().is_empty());
    }

    #[test]
    fn test_open_position_marked_at_last_close() {
        let orders = vec![at(0, OrderRequest::short(10))];
        let mut r = replay(&[10.0, 9.0, 8.0], orders);
        r.run_to_end();

        let p = r.session.portfolio();
        assert_eq!(p.position_qty, -10);
        assert_eq!(p.pnl_unrealized, 20.0);
        assert_eq!(p.equity, p.cash + p.pnl_unrealized);
    }

    #[test]
    fn test_resume_does_not_replay_executed_orders() {
        let closes = [10.0, 11.0, 12.0];
        let orders = vec![at(0, OrderRequest::buy(10))];

        let mut first = replay(&closes, orders.clone());
        first.run_to_end();
        assert_eq!(first.session.trades().len(), 1);

        let snapshot = SessionSnapshot::capture(&first.session);
        let resumed = snapshot.into_session(ExecutionEngine::new(
            FeeModel::zero(),
            SlippageModel::zero(),
        ));
        let mut second = ScriptedReplay::new(engine(&closes), resumed, orders);
        assert_eq!(second.engine.index(), 2);
        assert_eq!(second.pending(), 0);
        second.run_to_end();

        assert_eq!(second.session.trades().len(), 1);
        assert_eq!(second.session.portfolio().position_qty, 10);
    }

    #[test]
    fn test_resume_mid_series_runs_remaining_orders() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let orders = vec![at(0, OrderRequest::buy(10)), at(3, OrderRequest::sell(10))];

        let mut s = session();
        s.submit(&OrderRequest::buy(10), 10.0, 0).unwrap();
        s.record_bar(1);

        let mut r = ScriptedReplay::new(engine(&closes), s, orders);
        assert_eq!(r.engine.index(), 1);
        assert_eq!(r.pending(), 1);
        r.run_to_end();

        let trades = r.session.trades();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].side, OrderSide::Sell);
        assert_eq!(trades[1].price, 13.0);
        assert!(r.session.portfolio().is_flat());
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_matches_instant_replay() {
        let closes = [10.0, 11.0, 12.0, 13.0];
        let orders = vec![
            at(0, OrderRequest::short(5)),
            at(2, OrderRequest::cover(5)),
            at(3, OrderRequest::buy(3)),
        ];

        let mut instant = replay(&closes, orders.clone());
        instant.run_to_end();

        let mut paced = replay(&closes, orders);
        paced.engine.set_speed(2.0).unwrap();
        let started = tokio::time::Instant::now();
        paced.run_realtime().await.unwrap();

        assert_eq!(paced.engine.status(), ReplayStatus::Completed);
        assert_eq!(paced.engine.index(), 3);
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(fills(paced.session.trades()), fills(instant.session.trades()));
        assert_eq!(paced.session.portfolio(), instant.session.portfolio());
    }
}
