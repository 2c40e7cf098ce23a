//! Seeded play is reproducible, and simulations never leak into the real game.

use proptest::prelude::*;
use tcg_turns::{
    Game, GameLoop, GameOptions, MatchConfig, RandomDecisionMaker, StepKind, TurnOutcome,
};

fn config() -> MatchConfig {
    MatchConfig::with_players(&["Alice", "Bob", "Cid"])
}

fn random(seed: u64) -> RandomDecisionMaker {
    RandomDecisionMaker::new(seed).with_act_probability(0.4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn same_seed_plays_the_same_game(seed in any::<u64>()) {
        let mut first = GameLoop::new(&config(), random(seed)).expect("valid config");
        let mut second = GameLoop::new(&config(), random(seed)).expect("valid config");

        let a = first.run(6).expect("runs");
        let b = second.run(6).expect("runs");

        prop_assert_eq!(a, b);
        prop_assert_eq!(first.state(), second.state());
        prop_assert_eq!(first.session().event_log(), second.session().event_log());
        prop_assert_eq!(first.session().game_log(), second.session().game_log());
    }

    #[test]
    fn simulation_leaves_the_game_untouched(seed in any::<u64>()) {
        let mut game = GameLoop::new(&config(), random(seed)).expect("valid config");
        game.run(2).expect("runs");
        let state = game.state().clone();
        let events = game.session().event_log().len();
        let checkpoints = game.checkpoint_turns();

        let mut sim = game.simulate(random(seed.wrapping_add(1)));
        sim.run(6).expect("simulates");

        prop_assert!(sim.session().game_log().is_empty());
        prop_assert_eq!(game.state(), &state);
        prop_assert_eq!(game.session().event_log().len(), events);
        prop_assert_eq!(game.checkpoint_turns(), checkpoints);
    }

    #[test]
    fn simulations_from_one_position_agree(seed in any::<u64>()) {
        let mut game = GameLoop::new(&config(), random(seed)).expect("valid config");
        game.run(2).expect("runs");

        let mut first = game.simulate(random(seed.wrapping_add(1)));
        let mut second = game.simulate(random(seed.wrapping_add(1)));
        let a = first.run(5).expect("simulates");
        let b = second.run(5).expect("simulates");

        prop_assert_eq!(a, b);
        prop_assert_eq!(first.state(), second.state());
        prop_assert_eq!(first.session().event_log(), second.session().event_log());
    }
}

#[test]
fn random_play_finishes_every_turn() {
    for seed in 0..40 {
        let mut game = GameLoop::new(&config(), random(seed)).expect("valid config");
        let outcome = game.run(6).expect("runs");
        assert!(
            matches!(outcome, TurnOutcome::Completed | TurnOutcome::GameOver(_)),
            "seed {}: {:?}",
            seed,
            outcome
        );
        assert!(game.state().turn.turn_number <= 6, "seed {}", seed);
    }
}

#[test]
fn simulating_a_paused_game_continues_from_the_pause() {
    let mut config = config();
    config.options = GameOptions::stop_at(1, StepKind::Draw);
    let mut game = GameLoop::new(&config, random(3)).expect("valid config");
    assert_eq!(game.play_turn().expect("turn 1"), TurnOutcome::Paused);

    let mut sim = game.simulate(random(4));
    let outcome = sim.resume().expect("resumes");
    assert_ne!(outcome, TurnOutcome::Paused);
    assert_eq!(sim.run(4).expect("simulates"), TurnOutcome::Completed);
    assert_eq!(sim.state().turn.turn_number, 4);

    assert!(game.session().is_paused());
}
