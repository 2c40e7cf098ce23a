//! The capability set the turn engine consumes from its host.
//!
//! `Phase`, `Step` and `Turn` never own the game; they drive it through this
//! trait. The host decides what priority, stack resolution and turn-based
//! actions concretely do, and exposes the suspension signals (pause, game
//! over, rollback) that the engine checks at every step boundary.

use crate::config::GameOptions;
use crate::game_event::GameEvent;
use crate::game_state::{GameState, StepKind};
use crate::ids::PlayerId;

/// What happened when a player was given priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOutcome {
    /// The player passed.
    Passed,
    /// The game changed: the player acted, or lost before deciding. The round
    /// starts over with the next player.
    Acted,
    /// The decision raised a pause, rollback or game end; the same player is
    /// asked again when the step resumes.
    Interrupted,
}

pub trait Game {
    fn state(&self) -> &GameState;

    fn state_mut(&mut self) -> &mut GameState;

    fn options(&self) -> &GameOptions;

    fn is_paused(&self) -> bool;

    fn pause(&mut self);

    fn game_over(&self) -> bool {
        self.state().is_game_over()
    }

    /// Ends the game without a winner.
    fn end(&mut self);

    /// True while a rollback request unwinds the current control path.
    fn executing_rollback(&self) -> bool;

    /// True for automated lookahead, which must not pause or log.
    fn is_simulation(&self) -> bool;

    /// Offers the event to replacement effects. Returns true if the event was
    /// replaced; the caller must then skip the default consequence.
    fn replace_event(&mut self, event: &GameEvent) -> bool;

    /// Informs listeners and triggered abilities. Cannot be prevented.
    fn fire_event(&mut self, event: &GameEvent);

    /// Rule 500.4: mana empties between steps and phases.
    fn empty_mana_pools(&mut self) {
        self.state_mut().empty_mana_pools();
    }

    fn active_player(&self) -> PlayerId {
        self.state().turn.active_player
    }

    /// Gives `player` the chance to act.
    fn grant_priority(&mut self, player: PlayerId) -> PriorityOutcome;

    /// Resolves the top of the stack after all players passed in succession.
    /// Returns false if the stack was empty.
    fn resolve_stack(&mut self) -> bool {
        false
    }

    /// The step's turn-based action (untap, draw, declare attackers, cleanup).
    fn turn_based_action(&mut self, _step: StepKind, _active: PlayerId) {}

    /// Continues a turn-based action that was paused before it finished.
    fn resume_turn_based_action(&mut self, _step: StepKind, _active: PlayerId) {}

    /// Steps the rules skip on their own, such as blockers without attackers.
    fn skips_step_by_rule(&self, _step: StepKind, _active: PlayerId) -> bool {
        false
    }

    /// Player-visible message. Hosts must stay silent in simulation.
    fn inform_players(&mut self, _message: &str) {}

    /// Any of the three signals that stop the step and phase loops.
    fn is_interrupted(&self) -> bool {
        self.is_paused() || self.game_over() || self.executing_rollback()
    }
}
