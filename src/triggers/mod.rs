//! Triggered abilities keyed to turn-structure events.
//!
//! Abilities such as "at the beginning of your upkeep" register a
//! `TriggeredAbility` in the game state. Every fired event is checked against
//! the registry; matches wait in the `TriggerQueue` until the next player
//! would receive priority, when they go on the stack.

pub mod check;

pub use check::{
    TriggerId, TriggerQueue, TriggerRegistry, TriggeredAbility, TriggeredAbilityEntry,
};
