//! Jingle reels batch simulator
//!
//! Usage:
//!   jingle-sim --sessions 1000 --spins 50
//!   jingle-sim --config reels.yaml --profile turbo --json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jingle_reels::{EngineConfig, SpinTiming};
use jingle_sim::{SimConfig, SimReport, simulate};

#[derive(Parser)]
#[command(name = "jingle-sim", about = "Batch-simulate Jingle reels sessions")]
struct Cli {
    /// Number of independent sessions
    #[arg(short = 'n', long, default_value_t = 1000)]
    sessions: usize,

    /// Player spins granted to each session
    #[arg(short, long, default_value_t = 50)]
    spins: u32,

    /// Base seed; session i uses seed + i
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Engine config file (.json, .yaml or .yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timing profile
    #[arg(short, long, value_enum, default_value_t = Profile::Normal)]
    profile: Profile,

    /// Instant-win prizes per session
    #[arg(long, default_value_t = 3)]
    prizes: usize,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    Normal,
    Turbo,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut engine = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.profile == Profile::Turbo {
        engine = engine.with_timing(SpinTiming::turbo());
    }

    let config = SimConfig {
        sessions: cli.sessions,
        spins_per_session: cli.spins,
        seed: cli.seed,
        prizes_per_session: cli.prizes,
        engine,
    };
    let report = simulate(&config).context("Simulation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &SimReport) {
    println!("Sessions:          {}", report.sessions);
    println!(
        "Spins:             {} player + {} bonus",
        report.player_spins, report.auto_spins
    );
    println!("Tickets:           {}", report.total_tickets);
    println!("Tickets / spin:    {:.3}", report.tickets_per_spin());
    println!("Tickets / session: {:.2}", report.mean_session_tickets());
    println!("Hit rate:          {:.2}%", report.hit_rate());
    println!(
        "Bonuses:           {} ({} stacked, {:.2} per 100 spins)",
        report.bonuses_triggered,
        report.stacked_bonuses,
        report.bonus_rate()
    );
    println!("Bonus rounds:      {}", report.bonus_rounds);
    println!("Sticky freezes:    {}", report.sticky_freezes);
    println!("Instant wins:      {}", report.instant_wins);
    println!(
        "Best spin:         {} tickets (best session {})",
        report.max_spin_tickets, report.max_session_tickets
    );
}
