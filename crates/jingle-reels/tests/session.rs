//! Session-level behavior: spins, wins, sticky symbols, reporting

use std::collections::BTreeSet;
use std::sync::Arc;

use jingle_reels::{
    CellId, CommandError, EngineConfig, EnginePhase, ForcedSpin, Grid, PendingBonus,
    Probabilities, RecordingReporter, Report, ReportError, SpinEngine, Stage, StageTrace, Symbol,
    SymbolTable,
};

fn quiet() -> Probabilities {
    Probabilities {
        hot_symbol: 0.0,
        omen: 0.0,
        forced_removal: 0.0,
        sticky: 0.0,
        sticky_long_lifetime: 0.5,
        instant_win: 0.0,
    }
}

fn engine_with(config: EngineConfig, spins: u32, recorder: &RecordingReporter) -> SpinEngine {
    SpinEngine::builder()
        .config(config)
        .initial_spins(spins)
        .reporter(Arc::new(recorder.clone()))
        .seed(1)
        .build()
        .unwrap()
}

fn santa_and_snow() -> Grid {
    Grid::from_rows(&[
        &["🎅", "🎅", "🎅", "🎅", "🎅"],
        &["❄️", "🎄", "🥁", "⛄", "🎄"],
        &["🎄", "❄️", "🥁", "🎄", "❄️"],
    ])
}

fn lone_snowflake() -> Grid {
    Grid::from_rows(&[
        &["🎄", "🎅", "🥁", "⛄", "🎄"],
        &["🎅", "🥁", "❄️", "🎄", "🎅"],
        &["🥁", "⛄", "🎄", "🎅", "🥁"],
    ])
}

fn forced_spin(engine: &mut SpinEngine, grid: Grid) {
    engine.force_next_spin(ForcedSpin::grid(grid)).unwrap();
    engine.spin().unwrap();
    engine.advance_by(3_500);
    assert_eq!(engine.phase(), EnginePhase::Idle);
}

#[tokio::test]
async fn test_santa_row_with_three_snowflakes() {
    let recorder = RecordingReporter::new();
    let mut engine = engine_with(EngineConfig::default(), 10, &recorder);

    forced_spin(&mut engine, santa_and_snow());

    let win = engine.last_win();
    assert_eq!(win.base_tickets, 2);
    assert_eq!(win.total_tickets, 2);
    assert_eq!(win.bonus_triggered, Some(Symbol::new("❄️")));
    assert_eq!(win.bonus_multiplier, 1);

    assert_eq!(
        engine.pending_bonuses(),
        vec![PendingBonus {
            symbol: Symbol::new("❄️"),
            label: "Snowflake Bonus".into(),
            rounds: 15,
            multiplier: 2,
        }]
    );
    assert!(engine.activation_available());
    assert_eq!(engine.tickets_earned(), 2);
    assert_eq!(engine.spins_left(), 9);

    let row: BTreeSet<CellId> = (0..5).map(|reel| CellId::new(reel, 0)).collect();
    assert_eq!(engine.winning_cells(), &row);
    assert_eq!(engine.bonus_cells().len(), 3);
    assert!(engine.sticky_cells().is_empty());

    engine.flush_reports().await;
    assert_eq!(
        recorder.reports(),
        vec![Report::SpinsConsumed(1), Report::TicketsEarned(2)]
    );
}

#[tokio::test]
async fn test_one_spin_reports_one_consumed() {
    let recorder = RecordingReporter::new();
    let mut engine = engine_with(EngineConfig::default().with_probabilities(quiet()), 10, &recorder);

    forced_spin(&mut engine, lone_snowflake());
    engine.advance_by(10_000);
    engine.flush_reports().await;
    engine.flush_reports().await;

    assert_eq!(engine.spins_left(), 9);
    assert_eq!(recorder.reports(), vec![Report::SpinsConsumed(1)]);
}

#[tokio::test]
async fn test_failed_reports_are_not_retried() {
    let recorder = RecordingReporter::failing(ReportError::Rejected("quota".into()));
    let mut engine = engine_with(EngineConfig::default().with_probabilities(quiet()), 3, &recorder);

    forced_spin(&mut engine, lone_snowflake());
    engine.flush_reports().await;
    forced_spin(&mut engine, lone_snowflake());
    engine.flush_reports().await;

    assert_eq!(engine.spins_left(), 1);
    assert_eq!(recorder.total_spins_consumed(), 2);
    assert_eq!(engine.pending_reports(), 0);
}

#[test]
fn test_sticky_symbol_returns_to_its_cell() {
    let recorder = RecordingReporter::new();
    // Snowflakes can stick but never trigger, so the random spin cannot clear them
    let mut table = SymbolTable::holiday();
    table.bonuses.retain(|b| b.symbol.as_str() == "❄️");
    table.bonuses[0].min_matches = 16;
    let config = EngineConfig::default()
        .with_table(table)
        .with_probabilities(Probabilities {
            sticky: 1.0,
            sticky_long_lifetime: 1.0,
            ..quiet()
        });
    let mut engine = engine_with(config, 5, &recorder);

    forced_spin(&mut engine, lone_snowflake());
    let sticky = engine.sticky_cells();
    assert_eq!(sticky.len(), 1);
    assert_eq!(sticky[0].cell, CellId::new(2, 1));
    assert_eq!(sticky[0].lifetime, 2);

    engine.spin().unwrap();
    engine.advance_by(3_500);
    assert_eq!(
        engine.grid().at(CellId::new(2, 1)),
        Some(&Symbol::new("❄️"))
    );
    assert_eq!(engine.last_win().bonus_triggered, None);
    let cell = engine
        .sticky_cells()
        .into_iter()
        .find(|s| s.cell == CellId::new(2, 1))
        .unwrap();
    assert_eq!(cell.lifetime, 1);
}

#[test]
fn test_sticky_cells_freeze_once_between_bonus_rounds() {
    let recorder = RecordingReporter::new();
    let config = EngineConfig::default().with_probabilities(Probabilities {
        sticky: 1.0,
        ..Probabilities::default()
    });
    let mut engine = engine_with(config, 80, &recorder);

    let mut trace = StageTrace::new();
    for _ in 0..200 {
        if engine.instant_win().is_some() {
            engine.dismiss_instant_win().unwrap();
        }
        if engine.spin().is_err() {
            break;
        }
        engine.settle(3_600_000);
        trace.extend(engine.drain_stages());
    }

    let mut frozen = BTreeSet::new();
    for event in &trace.events {
        match &event.stage {
            Stage::BonusEnter { .. } => frozen.clear(),
            Stage::StickyFreeze {
                reel_index,
                row_index,
                lifetime,
                ..
            } => {
                assert!((1..=2).contains(lifetime));
                assert!(frozen.insert((*reel_index, *row_index)));
            }
            _ => {}
        }
    }
    assert!(trace.reel_stops_ordered());
    assert_eq!(engine.spins_left(), 0);
}

#[test]
fn test_hot_symbol_boost_is_on_the_strip() {
    let recorder = RecordingReporter::new();
    let config = EngineConfig::default().with_probabilities(Probabilities {
        hot_symbol: 1.0,
        ..quiet()
    });
    let mut engine = engine_with(config.clone(), 1, &recorder);

    engine.spin().unwrap();
    let hot = engine.hot_symbol().cloned().unwrap();
    let spec = config.table.spec(&hot).unwrap();
    let counts = engine.strip().counts();
    assert_eq!(counts[&hot] as u32, spec.weight + spec.hot_weight);
    assert_eq!(engine.removal_symbol(), None);

    let start = engine.drain_stages().remove(0);
    assert_eq!(
        start.stage,
        Stage::SpinStart {
            auto: false,
            hot_symbol: Some(hot.to_string()),
            removed_symbol: None,
        }
    );
}

#[test]
fn test_same_seed_same_session() {
    let run = || {
        let recorder = RecordingReporter::new();
        let mut engine = engine_with(EngineConfig::default(), 12, &recorder);
        while engine.spin().is_ok() {
            engine.settle(3_600_000);
            if engine.instant_win().is_some() {
                engine.dismiss_instant_win().unwrap();
            }
        }
        (
            engine.drain_stages(),
            serde_json::to_value(engine.snapshot()).unwrap(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn test_commands_rejected_without_side_effects() {
    let recorder = RecordingReporter::new();
    let mut engine = engine_with(EngineConfig::default().with_probabilities(quiet()), 1, &recorder);

    engine.force_next_spin(ForcedSpin::grid(lone_snowflake())).unwrap();
    engine.spin().unwrap();
    let before = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(engine.spin(), Err(CommandError::SpinInFlight));
    assert_eq!(engine.dismiss_instant_win(), Err(CommandError::NoInstantWin));
    assert_eq!(serde_json::to_value(engine.snapshot()).unwrap(), before);

    engine.dispose();
    engine.advance_by(10_000);
    assert_eq!(engine.phase(), EnginePhase::Disposed);
    assert_eq!(engine.activate_pending_bonus(), Err(CommandError::Disposed));
}
