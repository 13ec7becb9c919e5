//! # analytics — Mock backtest metrics
//!
//! The dashboard's performance cards need numbers, but there is no
//! backtesting engine behind them.  [`mock_report`] fabricates a plausible
//! trade list for a strategy and derives the summary from it, so the figures
//! are at least internally consistent (win rate matches the trades, the
//! equity curve sums to the net P&L, drawdown is measured on that curve).
//!
//! A `seed` makes the output reproducible; without one a fresh seed is drawn.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NodeKind, Strategy};

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsRequest {
    /// Number of trading days to simulate (default 90, capped at 365).
    pub days: Option<u32>,
    pub seed: Option<u64>,
    /// Starting capital in rupees (default 100 000).
    pub initial_capital: Option<f64>,
}

// ─── Response ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MockTrade {
    pub time:    DateTime<Utc>,
    pub side:    &'static str,
    pub pnl:     f64,
    pub is_win:  bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub time:   DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub strategy_id:      Uuid,
    pub seed:             u64,
    pub mock:             bool,
    pub total_trades:     usize,
    pub winning_trades:   usize,
    pub losing_trades:    usize,
    pub win_rate_pct:     f64,
    pub net_pnl:          f64,
    pub return_pct:       f64,
    pub profit_factor:    f64,
    pub max_drawdown:     f64,
    pub max_drawdown_pct: f64,
    pub avg_win:          f64,
    pub avg_loss:         f64,
    pub equity_curve:     Vec<EquityPoint>,
    pub trades:           Vec<MockTrade>,
}

// ─── Generator ────────────────────────────────────────────────────────────────

pub fn mock_report(strategy: &Strategy, request: &AnalyticsRequest, now: DateTime<Utc>) -> AnalyticsReport {
    let seed = request.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let days = request.days.unwrap_or(90).clamp(1, 365);
    let capital = request.initial_capital.filter(|c| *c > 0.0).unwrap_or(100_000.0);

    // More entry points → more trades per day.
    let entries = strategy
        .nodes
        .iter()
        .filter(|n| matches!(n.kind(), NodeKind::Entry | NodeKind::EntrySignal | NodeKind::Action))
        .count()
        .max(1);
    let edge: f64 = rng.gen_range(0.40..0.65);

    let start = now - Duration::days(i64::from(days));
    let mut trades = Vec::new();
    for day in 0..days {
        let count = rng.gen_range(0..=entries.min(4));
        for _ in 0..count {
            let minute = rng.gen_range(9 * 60 + 15..15 * 60 + 30);
            let time = start + Duration::days(i64::from(day)) + Duration::minutes(minute);
            let is_win = rng.gen_bool(edge);
            let size = capital * rng.gen_range(0.002..0.015);
            trades.push(MockTrade {
                time,
                side: if rng.gen_bool(0.5) { "buy" } else { "sell" },
                pnl: round2(if is_win { size } else { -size * rng.gen_range(0.5..1.1) }),
                is_win,
            });
        }
    }

    summarize(strategy.id, seed, capital, trades)
}

fn summarize(strategy_id: Uuid, seed: u64, capital: f64, trades: Vec<MockTrade>) -> AnalyticsReport {
    let mut equity       = capital;
    let mut peak         = capital;
    let mut max_drawdown = 0.0_f64;
    let mut max_dd_pct   = 0.0_f64;
    let mut curve        = Vec::with_capacity(trades.len());

    for t in &trades {
        equity += t.pnl;
        peak = peak.max(equity);
        let drawdown = peak - equity;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
            max_dd_pct = drawdown / peak * 100.0;
        }
        curve.push(EquityPoint { time: t.time, equity: round2(equity) });
    }

    let wins: Vec<f64> = trades.iter().filter(|t| t.is_win).map(|t| t.pnl).collect();
    let losses: Vec<f64> = trades.iter().filter(|t| !t.is_win).map(|t| t.pnl).collect();
    let gross_win: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();
    let net = gross_win - gross_loss;
    let mean = |xs: &[f64]| if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 };

    AnalyticsReport {
        strategy_id,
        seed,
        mock:             true,
        total_trades:     trades.len(),
        winning_trades:   wins.len(),
        losing_trades:    losses.len(),
        win_rate_pct:     if trades.is_empty() { 0.0 } else { round2(wins.len() as f64 / trades.len() as f64 * 100.0) },
        net_pnl:          round2(net),
        return_pct:       round2(net / capital * 100.0),
        profit_factor:    if gross_loss > 0.0 { round2(gross_win / gross_loss) } else { 0.0 },
        max_drawdown:     round2(max_drawdown),
        max_drawdown_pct: round2(max_dd_pct),
        avg_win:          round2(mean(&wins)),
        avg_loss:         round2(mean(&losses)),
        equity_curve:     curve,
        trades,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(seed: u64) -> AnalyticsRequest {
        AnalyticsRequest { days: Some(30), seed: Some(seed), initial_capital: None }
    }

    #[test]
    fn test_same_seed_same_report() {
        let s = Strategy::new("ORB", "");
        let now = Utc::now();
        let a = mock_report(&s, &req(7), now);
        let b = mock_report(&s, &req(7), now);
        assert_eq!(a.total_trades, b.total_trades);
        assert_eq!(a.net_pnl, b.net_pnl);
        assert_eq!(a.seed, 7);
    }

    #[test]
    fn test_summary_is_consistent_with_trades() {
        let s = Strategy::new("ORB", "");
        let r = mock_report(&s, &req(42), Utc::now());

        assert_eq!(r.winning_trades + r.losing_trades, r.total_trades);
        assert_eq!(r.equity_curve.len(), r.total_trades);
        if let Some(last) = r.equity_curve.last() {
            assert!((last.equity - (100_000.0 + r.net_pnl)).abs() < 0.05 * r.total_trades as f64 + 0.01);
        }
        assert!(r.max_drawdown >= 0.0);
        assert!((0.0..=100.0).contains(&r.win_rate_pct));
    }

    #[test]
    fn test_drawdown_on_known_sequence() {
        let t = |pnl: f64| MockTrade { time: Utc::now(), side: "buy", pnl, is_win: pnl > 0.0 };
        let r = summarize(Uuid::nil(), 0, 1000.0, vec![t(100.0), t(-300.0), t(50.0), t(400.0)]);

        assert_eq!(r.max_drawdown, 300.0);
        assert_eq!(r.net_pnl, 250.0);
        assert_eq!(r.win_rate_pct, 75.0);
        assert_eq!(r.profit_factor, 1.83);
    }
}
