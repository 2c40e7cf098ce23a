//! Listener-based dispatch for game events.
//!
//! Listeners implement `EventListener` and are registered on an `EventBus`.
//! A listener may veto a replaceable event (`replace`) or merely observe a
//! fired one (`observe`). The bus is a plain value so checkpoints can clone it
//! together with the game state.

pub mod bus;

pub use bus::{EventBus, EventListener};
