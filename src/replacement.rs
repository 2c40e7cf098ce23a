//! Replacement effects on turn-structure events.
//!
//! Per rule 614.1b, "skip" effects are replacement effects: the step or
//! phase that would begin simply does not happen.

use crate::events::EventListener;
use crate::game_event::{EventKind, GameEvent};
use crate::game_state::GameState;
use crate::ids::{ObjectId, PlayerId};

/// "Skip your next untap step" and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipEventReplacement {
    /// The object that created this effect, if any.
    pub source: Option<ObjectId>,
    /// Whose event is skipped.
    pub player: PlayerId,
    pub kind: EventKind,
    /// Remaining applications; `None` applies until the source leaves.
    pub uses: Option<u32>,
}

impl SkipEventReplacement {
    pub fn new(
        source: Option<ObjectId>,
        player: PlayerId,
        kind: EventKind,
        uses: Option<u32>,
    ) -> Self {
        Self {
            source,
            player,
            kind,
            uses,
        }
    }

    /// A skip that applies exactly once.
    pub fn once(source: Option<ObjectId>, player: PlayerId, kind: EventKind) -> Self {
        Self::new(source, player, kind, Some(1))
    }
}

impl EventListener for SkipEventReplacement {
    fn applies(&self, event: &GameEvent, _state: &GameState) -> bool {
        event.kind == self.kind && event.player == Some(self.player) && self.uses != Some(0)
    }

    fn replace(&mut self, _event: &GameEvent, _state: &mut GameState) -> bool {
        if let Some(uses) = &mut self.uses {
            *uses = uses.saturating_sub(1);
        }
        true
    }

    fn clone_box(&self) -> Box<dyn EventListener> {
        Box::new(self.clone())
    }

    fn source(&self) -> Option<ObjectId> {
        self.source
    }

    fn is_exhausted(&self) -> bool {
        self.uses == Some(0)
    }

    fn display(&self) -> String {
        match self.uses {
            Some(1) => format!("{} skips their next {:?}", self.player, self.kind),
            Some(n) => format!("{} skips their next {} {:?}", self.player, n, self.kind),
            None => format!("{} skips each {:?}", self.player, self.kind),
        }
    }
}
