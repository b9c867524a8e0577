//! Trade journal commands

use crate::tracker::TradeTracker;
use clap::Args;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Trade journal path
    #[arg(long, default_value = "momentum_trades.json")]
    pub journal: String,
}

impl SummaryArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let tracker = TradeTracker::new(&self.journal);
        let summary = tracker.get_summary();

        println!("Trade summary ({})", self.journal);
        println!("  Realized P&L:   ${:.2}", summary.realized_pnl);
        println!("  Total trades:   {}", summary.total_trades);
        println!(
            "  Won / lost:     {} / {}",
            summary.winning_trades, summary.losing_trades
        );
        println!("  Win rate:       {:.1}%", summary.win_rate * 100.0);
        println!("  Markets traded: {}", summary.markets_traded);
        if !summary.starting_balance.is_zero() {
            println!("  Start balance:  ${:.2}", summary.starting_balance);
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Trade journal path
    #[arg(long, default_value = "momentum_trades.json")]
    pub journal: String,
}

impl ResetArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let tracker = TradeTracker::new(&self.journal);
        tracker.reset();
        println!("Trade journal reset: {}", self.journal);
        Ok(())
    }
}
