use std::sync::Arc;

use abrsim_core::config::PlayerConfig;
use abrsim_sim::{Fleet, Scenario, bursty_trace, check_all, constant_trace, step_drop_trace};
use proptest::prelude::*;

#[tokio::test]
async fn test_concurrent_run_matches_sequential_run() {
    let trace = Arc::new(step_drop_trace(6000, 600, 30_000, 20_000));
    let config = PlayerConfig::default().with_players(4).with_seed(99);
    let fleet = Fleet::new(trace, config).unwrap();

    let sequential = fleet.run().unwrap();
    let concurrent = fleet.run_concurrent().await.unwrap();

    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent.players.len(), 4);
}

#[test]
fn test_concurrent_run_on_current_thread_runtime() {
    let trace = Arc::new(constant_trace(2000, 20_000));
    let fleet = Fleet::new(trace, PlayerConfig::default().with_players(2)).unwrap();

    let report = tokio_test::block_on(fleet.run_concurrent()).unwrap();
    assert_eq!(report.players.len(), 2);
    assert_eq!(report.seed, 42);
}

#[test]
fn test_players_with_different_seeds_diverge_only_in_jitter() {
    let trace = Arc::new(constant_trace(4000, 60_000));
    let fleet = Fleet::new(trace, PlayerConfig::default().with_players(2)).unwrap();
    let report = fleet.run().unwrap();

    let first = &report.players[0];
    let second = &report.players[1];
    assert_ne!(first.seed, second.seed);
    assert_eq!(first.ticks, second.ticks);
    assert_eq!(first.bandwidth_sum, second.bandwidth_sum);
}

#[test]
fn test_more_players_lower_mean_bitrate() {
    let trace = Arc::new(constant_trace(3000, 120_000));
    let mean = |players: u32| {
        let fleet =
            Fleet::new(Arc::clone(&trace), PlayerConfig::default().with_players(players)).unwrap();
        let report = fleet.run().unwrap();
        report.players[0].mean_played_bitrate_kbps().unwrap()
    };

    assert!(mean(1) > mean(6));
}

#[test]
fn test_named_scenarios_hold_invariants() {
    let config = PlayerConfig::default().with_players(2);
    for scenario in Scenario::ALL {
        let fleet = Fleet::new(Arc::new(scenario.build(3)), config.clone()).unwrap();
        let report = fleet.run().unwrap();
        for player in &report.players {
            let violations = check_all(player, &config);
            assert!(violations.is_empty(), "{scenario}: {violations:?}");
        }
    }
}

#[test]
fn test_fleet_summary_lists_every_player() {
    let trace = Arc::new(constant_trace(1500, 30_000));
    let fleet = Fleet::new(trace, PlayerConfig::default().with_players(3)).unwrap();
    let summary = fleet.run().unwrap().summary();

    assert!(summary.contains("3 players"));
    assert!(summary.contains("player 2:"));
    assert!(summary.contains("Aggregate utilization:"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn bursty_runs_hold_invariants(seed in any::<u64>(), mean_kbps in 200u64..5000, players in 1u32..4) {
        let trace = Arc::new(bursty_trace(seed, mean_kbps, 90_000));
        let config = PlayerConfig::default().with_players(players).with_seed(seed);
        let report = Fleet::new(trace, config.clone()).unwrap().run().unwrap();

        for player in &report.players {
            let violations = check_all(player, &config);
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
