//! Player decisions consumed by the priority loop.
//!
//! The engine never decides for a player. Whenever a player receives
//! priority or has to declare attackers, the host asks its `DecisionMaker`.
//! Answers that suspend the game (pause, rollback, concession) are decisions
//! like any other, which keeps interruptions out of band from the engine.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::effect::TurnEffect;
use crate::game_state::{GameState, StepKind};
use crate::ids::{ObjectId, PlayerId};

/// What a player does with priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityDecision {
    Pass,
    /// Put a spell or ability with this effect on the stack.
    Act(TurnEffect),
    /// Freeze the game; it resumes from the same point later.
    Pause,
    /// Undo back to the start of the turn `turns` turns ago (0 = this turn).
    Rollback { turns: u32 },
    Concede,
}

/// Trait for making player decisions during the game.
///
/// Default implementations provide deterministic minimal behavior, and
/// implementors can override the relevant methods for interactive or AI control.
pub trait DecisionMaker {
    /// Called when a player's answer was turned into a pass by the host
    /// (a pause requested during simulation).
    fn on_auto_pass(&mut self, _game: &GameState, _player: PlayerId) {}

    /// Called when a requested action could not be carried out.
    fn on_action_cancelled(&mut self, _game: &GameState, _reason: &str) {}

    fn decide_priority(&mut self, _game: &GameState, _player: PlayerId) -> PriorityDecision {
        PriorityDecision::Pass
    }

    /// Chooses attackers among `candidates`. Default: no attack.
    fn decide_attackers(
        &mut self,
        _game: &GameState,
        _player: PlayerId,
        _candidates: &[ObjectId],
    ) -> Vec<ObjectId> {
        Vec::new()
    }
}

/// A decision maker that always passes priority and never attacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPassDecisionMaker;

impl DecisionMaker for AutoPassDecisionMaker {}

/// Replays a fixed list of priority decisions, then passes forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisionMaker {
    decisions: VecDeque<PriorityDecision>,
    attack_with_all: bool,
    cancelled: Vec<String>,
}

impl ScriptedDecisionMaker {
    pub fn new(decisions: impl IntoIterator<Item = PriorityDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            attack_with_all: false,
            cancelled: Vec::new(),
        }
    }

    /// Every creature that can attack does.
    pub fn attacking_with_all(mut self) -> Self {
        self.attack_with_all = true;
        self
    }

    pub fn push(&mut self, decision: PriorityDecision) {
        self.decisions.push_back(decision);
    }

    pub fn remaining(&self) -> usize {
        self.decisions.len()
    }

    /// Reasons given for cancelled actions, oldest first.
    pub fn cancelled(&self) -> &[String] {
        &self.cancelled
    }
}

impl DecisionMaker for ScriptedDecisionMaker {
    fn on_action_cancelled(&mut self, _game: &GameState, reason: &str) {
        self.cancelled.push(reason.to_string());
    }

    fn decide_priority(&mut self, _game: &GameState, _player: PlayerId) -> PriorityDecision {
        self.decisions.pop_front().unwrap_or(PriorityDecision::Pass)
    }

    fn decide_attackers(
        &mut self,
        _game: &GameState,
        _player: PlayerId,
        candidates: &[ObjectId],
    ) -> Vec<ObjectId> {
        if self.attack_with_all {
            candidates.to_vec()
        } else {
            Vec::new()
        }
    }
}

/// Seeded random play for simulations and smoke runs.
///
/// Two instances built from the same seed make the same choices given the
/// same game, which is what makes simulations reproducible.
#[derive(Debug, Clone)]
pub struct RandomDecisionMaker {
    rng: StdRng,
    act_probability: f64,
}

impl RandomDecisionMaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            act_probability: 0.15,
        }
    }

    pub fn with_act_probability(mut self, probability: f64) -> Self {
        self.act_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn random_effect(&mut self, game: &GameState, player: PlayerId) -> TurnEffect {
        match self.rng.random_range(0..6) {
            0 => TurnEffect::CreateObject {
                id: ObjectId::from_raw(game.next_object_id()),
                controller: player,
            },
            1 => {
                let mine = game.objects_controlled_by(player);
                match mine.first() {
                    Some(&id) => TurnEffect::RemoveObject { id },
                    None => TurnEffect::Nothing,
                }
            }
            // Before the end step only, with at most one pending.
            2 if game.turn.active_player == player
                && game.turn.step.is_some_and(|step| step < StepKind::End)
                && game.turn_mods.pending_extra_steps(player, StepKind::End) == 0 =>
            {
                TurnEffect::ExtraStep {
                    player,
                    after: StepKind::End,
                    step: StepKind::End,
                }
            }
            _ => TurnEffect::AddMana {
                player,
                amount: self.rng.random_range(1..=3),
            },
        }
    }
}

impl DecisionMaker for RandomDecisionMaker {
    fn decide_priority(&mut self, game: &GameState, player: PlayerId) -> PriorityDecision {
        // Bound the stack so random play always makes progress.
        if game.stack.len() < 3 && self.rng.random_bool(self.act_probability) {
            PriorityDecision::Act(self.random_effect(game, player))
        } else {
            PriorityDecision::Pass
        }
    }

    fn decide_attackers(
        &mut self,
        _game: &GameState,
        _player: PlayerId,
        candidates: &[ObjectId],
    ) -> Vec<ObjectId> {
        candidates
            .iter()
            .copied()
            .filter(|_| self.rng.random_bool(0.5))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_game() -> GameState {
        GameState::new(vec!["Alice".to_string(), "Bob".to_string()], 20, 7)
    }

    #[test]
    fn test_scripted_passes_when_exhausted() {
        let game = test_game();
        let mut dm = ScriptedDecisionMaker::new([PriorityDecision::Pause]);
        assert_eq!(dm.remaining(), 1);
        assert_eq!(dm.decide_priority(&game, PlayerId(0)), PriorityDecision::Pause);
        assert_eq!(dm.decide_priority(&game, PlayerId(0)), PriorityDecision::Pass);
    }

    #[test]
    fn test_scripted_attackers() {
        let game = test_game();
        let candidates = [ObjectId::from_raw(1), ObjectId::from_raw(2)];
        let mut idle = ScriptedDecisionMaker::new([]);
        assert!(idle.decide_attackers(&game, PlayerId(0), &candidates).is_empty());
        let mut eager = ScriptedDecisionMaker::new([]).attacking_with_all();
        assert_eq!(
            eager.decide_attackers(&game, PlayerId(0), &candidates),
            candidates.to_vec()
        );
    }

    #[test]
    fn test_auto_pass_never_acts() {
        let game = test_game();
        let mut dm = AutoPassDecisionMaker;
        for _ in 0..10 {
            assert_eq!(dm.decide_priority(&game, PlayerId(1)), PriorityDecision::Pass);
        }
    }

    #[test]
    fn test_random_is_reproducible_from_seed() {
        let game = test_game();
        let mut a = RandomDecisionMaker::new(42).with_act_probability(0.5);
        let mut b = RandomDecisionMaker::new(42).with_act_probability(0.5);
        for _ in 0..50 {
            assert_eq!(
                a.decide_priority(&game, PlayerId(0)),
                b.decide_priority(&game, PlayerId(0))
            );
        }
    }

    #[test]
    fn test_random_never_extends_the_end_step_from_inside_it() {
        let mut game = test_game();
        game.begin_turn(PlayerId(0));
        game.turn.step = Some(StepKind::End);
        let mut dm = RandomDecisionMaker::new(5).with_act_probability(1.0);
        for _ in 0..200 {
            let decision = dm.decide_priority(&game, PlayerId(0));
            assert!(!matches!(
                decision,
                PriorityDecision::Act(TurnEffect::ExtraStep { .. })
            ));
        }
    }

    #[test]
    fn test_random_queues_at_most_one_extra_end_step() {
        let mut game = test_game();
        game.begin_turn(PlayerId(0));
        game.turn.step = Some(StepKind::Upkeep);
        game.turn_mods
            .add_extra_step(PlayerId(0), StepKind::End, StepKind::End);
        let mut dm = RandomDecisionMaker::new(9).with_act_probability(1.0);
        for _ in 0..200 {
            let decision = dm.decide_priority(&game, PlayerId(0));
            assert!(!matches!(
                decision,
                PriorityDecision::Act(TurnEffect::ExtraStep { .. })
            ));
        }
    }

    #[test]
    fn test_random_with_zero_probability_passes() {
        let game = test_game();
        let mut dm = RandomDecisionMaker::new(1).with_act_probability(0.0);
        for _ in 0..20 {
            assert_eq!(dm.decide_priority(&game, PlayerId(0)), PriorityDecision::Pass);
        }
    }
}
