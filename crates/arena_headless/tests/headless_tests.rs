//! End-to-end tests for the headless runner.
//!
//! These drive whole scenarios through the engine and check outcomes,
//! reproducibility and file handling.

use arena_headless::batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
use arena_headless::protocol::{DuelOutcome, DuelReport, Frame};
use arena_headless::runner::{DuelRunner, RunnerOptions};
use arena_headless::scenario::{EncounterSetup, Scenario, ScenarioError};
use arena_test_utils::determinism;

use arena_core::prelude::*;

fn overpowered(mut scenario: Scenario) -> Scenario {
    scenario.player.hp = 1.0e6;
    scenario.player.hit_damage = 1.0e5;
    scenario.player.hit_interval = 1;
    scenario.player.focus_auxiliaries = false;
    scenario
}

// =============================================================================
// Duels
// =============================================================================

mod duels {
    use super::*;

    #[test]
    fn test_one_shot_boss_pays_once() {
        let scenario = overpowered(Scenario::builtin("manop_duel").unwrap().unwrap());
        let report = DuelRunner::new(scenario).unwrap().run_quiet(5).unwrap();
        assert_eq!(report.outcome, DuelOutcome::BossDefeated);
        assert_eq!(report.ticks, 1);
        assert_eq!(report.rewards, 5000.0);
        assert_eq!(report.defeats, 1);
    }

    #[test]
    fn test_passive_player_loses_to_boss() {
        let mut scenario = Scenario::builtin("first_duel").unwrap().unwrap();
        scenario.player.hp = 50.0;
        scenario.player.hit_damage = 0.0;
        scenario.player.stagger_interval = 0;
        scenario.max_ticks = 60 * 120;
        let report = DuelRunner::new(scenario).unwrap().run_quiet(2).unwrap();
        assert_eq!(report.outcome, DuelOutcome::PlayerDefeated);
        assert!(report.damage_taken >= 50.0);
        assert_eq!(report.player_hp_left, 0.0);
    }

    #[test]
    fn test_state_frames_follow_interval() {
        let mut scenario = Scenario::builtin("manop_duel").unwrap().unwrap();
        scenario.player.hit_damage = 0.0;
        scenario.max_ticks = 100;
        let runner = DuelRunner::new(scenario)
            .unwrap()
            .with_options(RunnerOptions {
                state_interval: 25,
                record_hashes: false,
            });

        let mut states = Vec::new();
        runner
            .run(1, &mut |frame: &Frame| {
                if let Frame::State { tick, combatants, .. } = frame {
                    states.push((*tick, combatants.len()));
                }
            })
            .unwrap();
        assert_eq!(states, vec![(25, 1), (50, 1), (75, 1), (100, 1)]);
    }

    #[test]
    fn test_frames_are_json_lines() {
        let scenario = overpowered(Scenario::builtin("manop_duel").unwrap().unwrap());
        let runner = DuelRunner::new(scenario).unwrap();
        let mut lines = Vec::new();
        runner
            .run(1, &mut |frame: &Frame| lines.push(frame.to_json_line()))
            .unwrap();
        for line in &lines {
            assert_eq!(line.matches('\n').count(), 1);
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("type").is_some());
        }
    }
}

// =============================================================================
// Wave Runs
// =============================================================================

mod waves {
    use super::*;

    #[test]
    fn test_wave_run_meets_three_bosses() {
        let mut scenario = overpowered(Scenario::builtin("wave_run").unwrap().unwrap());
        scenario.tick_rate = 60;
        scenario.max_ticks = 5000;

        let mut plans = Vec::new();
        let report = DuelRunner::new(scenario)
            .unwrap()
            .run(9, &mut |frame: &Frame| {
                if let Frame::BossPlanned { plan, .. } = frame {
                    plans.push(*plan);
                }
            })
            .unwrap();

        assert_eq!(report.outcome, DuelOutcome::Victory);
        assert_eq!(report.boss_encounters, 3);
        assert_eq!(report.final_wave, 9);
        assert_eq!(plans.iter().map(|p| p.wave).collect::<Vec<_>>(), vec![3, 6, 9]);
        assert!(!plans[0].rider && plans[1].rider && plans[2].phase3);
        assert!(report.rewards >= 30000.0);
    }
}

// =============================================================================
// Reproducibility
// =============================================================================

mod reproducibility {
    use super::*;

    #[test]
    fn test_builtins_verify() {
        for name in Scenario::builtin_names() {
            let mut scenario = Scenario::builtin(name).unwrap().unwrap();
            scenario.max_ticks = scenario.max_ticks.min(1200);
            let report = verify_determinism(scenario, 17, 3).unwrap();
            assert!(report.is_deterministic(), "{name}: {report:?}");
            assert_eq!(report.runs, 3);
        }
    }

    #[test]
    fn test_runner_reports_match_across_runs() {
        let mut scenario = Scenario::builtin("rider_duel").unwrap().unwrap();
        scenario.max_ticks = 900;
        let runner = DuelRunner::new(scenario).unwrap();

        let result = determinism::verify_determinism(
            3,
            1,
            || None::<DuelReport>,
            |state, _| *state = runner.run_quiet(4).ok(),
            |state| state.as_ref().map_or(0, |report| report.final_hash),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_seeds_change_the_fight() {
        let mut scenario = Scenario::builtin("rider_duel").unwrap().unwrap();
        scenario.max_ticks = 1800;
        let runner = DuelRunner::new(scenario).unwrap();
        let hashes: Vec<u64> = (0..4)
            .map(|seed| runner.run_quiet(seed).unwrap().final_hash)
            .collect();
        assert!(hashes.windows(2).any(|w| w[0] != w[1]));
    }
}

// =============================================================================
// Files
// =============================================================================

mod files {
    use super::*;

    const BALANCE: &str =
        "(session: (chase_eval_interval: 1.5), manop: (enrage_speed_multiplier: 1.9))";

    #[test]
    fn test_scenario_file_with_relative_balance() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tuned.ron"), BALANCE).unwrap();
        std::fs::write(
            dir.path().join("duel.ron"),
            concat!(
                "(name: \"tuned\", encounter: Duel(boss: KruManop), ",
                "balance: Some(\"tuned.ron\"), max_ticks: 60)",
            ),
        )
        .unwrap();

        let scenario = Scenario::load(dir.path().join("duel.ron")).unwrap();
        assert_eq!(scenario.balance, Some(dir.path().join("tuned.ron")));
        let config = scenario.encounter_config().unwrap();
        assert_eq!(config.session.chase_eval_interval, Fixed::from_num(1.5));
        assert_eq!(config.manop.body, EncounterConfig::default().manop.body);

        let report = DuelRunner::new(scenario).unwrap().run_quiet(1).unwrap();
        assert_eq!(report.ticks, 60);
    }

    #[test]
    fn test_broken_balance_is_an_encounter_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("broken.ron"),
            "(session: (pickup_count: \"three\"))",
        )
        .unwrap();
        let scenario = Scenario {
            balance: Some(dir.path().join("broken.ron")),
            ..Scenario::default()
        };
        assert!(matches!(
            DuelRunner::new(scenario),
            Err(ScenarioError::Encounter(_))
        ));
    }

    #[test]
    fn test_malformed_scenario_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ron");
        std::fs::write(&path, "(name: 12").unwrap();
        assert!(matches!(Scenario::load(&path), Err(ScenarioError::ParseError(_))));
    }

    #[test]
    fn test_resolve_prefers_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waves.ron");
        std::fs::write(&path, "(name: \"file waves\", encounter: Waves)").unwrap();
        let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(scenario.name, "file waves");
        assert_eq!(scenario.encounter, EncounterSetup::Waves);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(BatchConfig::new("manop_duel", 4).with_seed(10)).unwrap();
        assert_eq!(results.reports.len() + results.errors.len(), 4);
        assert_eq!(results.summary.runs as usize, results.reports.len());

        let dir = tempfile::tempdir().unwrap();
        let path = BatchResults::path_in(dir.path());
        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.reports.len(), results.reports.len());
        assert_eq!(loaded.summary.runs, results.summary.runs);
        assert_eq!(loaded.summary.outcomes, results.summary.outcomes);
        let seeds: Vec<u64> = loaded.reports.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_batch_with_dedicated_pool() {
        let results = run_batch(BatchConfig::new("first_duel", 3).with_parallel(2)).unwrap();
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.runs, 3);
    }

    #[test]
    fn test_shipped_files_load() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let balance = std::fs::read_to_string(root.join("balance/hard.ron")).unwrap();
        let config = EncounterConfig::from_ron_str(&balance, "hard.ron").unwrap();
        assert!(config.validate().is_empty());

        for entry in std::fs::read_dir(root.join("scenarios")).unwrap() {
            let path = entry.unwrap().path();
            let scenario = Scenario::load(&path).unwrap();
            assert!(scenario.check().is_ok(), "{}", path.display());
        }
    }
}
