//! Game event types shared across the event system.
//!
//! Every turn-structure transition is announced as a `GameEvent`. Begin
//! transitions are offered to replacement effects first (see
//! `Game::replace_event`); pre/post transitions are only fired.

use crate::game_state::{PhaseKind, StepKind};
use crate::ids::{ObjectId, PlayerId};

/// Fast dispatch enum for event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A player's turn is starting
    TurnBegin,
    /// The turn moved into a phase (including extra phases)
    PhaseChanged(PhaseKind),
    /// A phase would begin (replaceable, e.g. "skip your combat phase")
    Phase(PhaseKind),
    /// Beginning of a phase
    PhasePre(PhaseKind),
    /// End of a phase
    PhasePost(PhaseKind),
    /// A step would begin (replaceable, e.g. "skip your untap step")
    Step(StepKind),
    /// Beginning of a step, after the step started
    StepPre(StepKind),
    /// End of a step
    StepPost(StepKind),
    /// A player put a spell or ability on the stack
    StackEntryAdded,
    /// The top of the stack resolved
    StackEntryResolved,
    /// A creature was declared as an attacker
    AttackerDeclared,
}

/// An immutable, one-shot notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameEvent {
    pub kind: EventKind,
    pub source: Option<ObjectId>,
    pub target: Option<ObjectId>,
    pub player: Option<PlayerId>,
}

impl GameEvent {
    pub fn new(
        kind: EventKind,
        source: Option<ObjectId>,
        target: Option<ObjectId>,
        player: Option<PlayerId>,
    ) -> Self {
        Self {
            kind,
            source,
            target,
            player,
        }
    }

    /// An event with only an acting player, the shape every turn-structure event has.
    pub fn for_player(kind: EventKind, player: PlayerId) -> Self {
        Self::new(kind, None, None, Some(player))
    }

    pub fn display(&self) -> String {
        match self.player {
            Some(player) => format!("{:?} ({})", self.kind, player),
            None => format!("{:?}", self.kind),
        }
    }
}
