//! Declarative effects that reach the turn engine.
//!
//! Card abilities are external to this crate. What they hand the engine is one
//! of these values, applied by the game host when a stack entry or trigger
//! resolves.

use crate::game_event::EventKind;
use crate::game_state::{PhaseKind, StepKind};
use crate::ids::{ObjectId, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    /// No effect; used for abilities whose result lives outside the engine.
    Nothing,

    /// Skip a step this turn.
    SkipStep { player: PlayerId, step: StepKind },

    /// After `after` completes, there is an additional `step`.
    ExtraStep {
        player: PlayerId,
        after: StepKind,
        step: StepKind,
    },

    /// Skip a phase this turn.
    SkipPhase { player: PlayerId, phase: PhaseKind },

    /// After `after` completes, there is an additional `phase`.
    ExtraPhase {
        player: PlayerId,
        after: PhaseKind,
        phase: PhaseKind,
    },

    /// Take an extra turn after this one.
    ExtraTurn { player: PlayerId },

    /// Skip the player's next turn.
    SkipNextTurn { player: PlayerId },

    /// End the turn: only cleanup still happens.
    EndTurn,

    /// Add floating mana to a player's pool.
    AddMana { player: PlayerId, amount: u32 },

    /// Put an object into the game.
    CreateObject { id: ObjectId, controller: PlayerId },

    /// Remove an object from the game.
    RemoveObject { id: ObjectId },

    /// Create a triggered ability on `source` that listens for `on`.
    CreateTrigger {
        source: ObjectId,
        controller: PlayerId,
        on: EventKind,
        effect: Box<TurnEffect>,
        /// Only triggers during the controller's own turn ("your upkeep").
        controller_turn_only: bool,
        /// Delayed triggers fire once and are removed.
        once: bool,
    },

    /// Create a replacement effect that skips events of `kind` for `player`.
    CreateSkipReplacement {
        source: ObjectId,
        player: PlayerId,
        kind: EventKind,
        /// How many times it applies; `None` means for as long as the source exists.
        uses: Option<u32>,
    },
}

impl TurnEffect {
    pub fn display(&self) -> String {
        match self {
            TurnEffect::Nothing => "nothing".to_string(),
            TurnEffect::SkipStep { player, step } => format!("{} skips {} step", player, step),
            TurnEffect::ExtraStep {
                player,
                after,
                step,
            } => format!("{} gets an extra {} step after {}", player, step, after),
            TurnEffect::SkipPhase { player, phase } => {
                format!("{} skips {} phase", player, phase)
            }
            TurnEffect::ExtraPhase {
                player,
                after,
                phase,
            } => format!("{} gets an extra {} phase after {}", player, phase, after),
            TurnEffect::ExtraTurn { player } => format!("{} takes an extra turn", player),
            TurnEffect::SkipNextTurn { player } => format!("{} skips their next turn", player),
            TurnEffect::EndTurn => "end the turn".to_string(),
            TurnEffect::AddMana { player, amount } => format!("{} adds {} mana", player, amount),
            TurnEffect::CreateObject { id, .. } => format!("create object {}", id.0),
            TurnEffect::RemoveObject { id } => format!("remove object {}", id.0),
            TurnEffect::CreateTrigger { on, effect, .. } => {
                format!("whenever {:?}, {}", on, effect.display())
            }
            TurnEffect::CreateSkipReplacement { player, kind, .. } => {
                format!("{} skips {:?}", player, kind)
            }
        }
    }
}
