pub mod config;
pub mod decision;
pub mod effect;
pub mod events;
pub mod game;
pub mod game_event;
pub mod game_loop;
pub mod game_state;
pub mod ids;
pub mod phase;
pub mod replacement;
pub mod session;
pub mod step;
pub mod triggers;
pub mod turn;
pub mod turn_mods;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, GameOptions, MatchConfig};
pub use decision::{
    AutoPassDecisionMaker, DecisionMaker, PriorityDecision, RandomDecisionMaker,
    ScriptedDecisionMaker,
};
pub use effect::TurnEffect;
pub use events::{EventBus, EventListener};
pub use game::{Game, PriorityOutcome};
pub use game_event::{EventKind, GameEvent};
pub use game_loop::{GameLoop, GameLoopError, TurnOutcome};
pub use game_state::{
    GameResult, GameState, PhaseKind, PlayerState, StackEntry, StepKind, TurnState,
};
pub use ids::{ObjectId, PlayerId};
pub use phase::Phase;
pub use replacement::SkipEventReplacement;
pub use session::{Dispatch, EventRecord, Session};
pub use step::{Step, StepPart};
pub use triggers::{
    TriggerId, TriggerQueue, TriggerRegistry, TriggeredAbility, TriggeredAbilityEntry,
};
pub use turn::{PriorityTracker, Turn};
pub use turn_mods::TurnModifiers;
