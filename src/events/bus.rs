use std::fmt::Debug;

use crate::game_event::GameEvent;
use crate::game_state::GameState;
use crate::ids::ObjectId;

/// A registered reaction to game events.
pub trait EventListener: Debug + Send + Sync {
    /// Whether this listener cares about `event` at all.
    fn applies(&self, event: &GameEvent, state: &GameState) -> bool;

    /// Replaces the event. Returning true means the event does not happen.
    fn replace(&mut self, _event: &GameEvent, _state: &mut GameState) -> bool {
        false
    }

    /// Reacts to an event that happened.
    fn observe(&mut self, _event: &GameEvent, _state: &mut GameState) {}

    /// Clone this listener into a boxed trait object.
    ///
    /// Required because `Clone` is not object-safe.
    fn clone_box(&self) -> Box<dyn EventListener>;

    /// The object that created this listener; it goes away with that object.
    fn source(&self) -> Option<ObjectId> {
        None
    }

    /// Exhausted listeners are dropped after the dispatch that used them up.
    fn is_exhausted(&self) -> bool {
        false
    }

    fn display(&self) -> String;
}

impl Clone for Box<dyn EventListener> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Offers `event` to listeners in registration order. The first one that
    /// replaces it wins; later listeners never see it.
    pub fn replace_event(&mut self, event: &GameEvent, state: &mut GameState) -> bool {
        let mut replaced = false;
        for listener in &mut self.listeners {
            if listener.applies(event, state) && listener.replace(event, state) {
                replaced = true;
                break;
            }
        }
        if replaced {
            self.listeners.retain(|listener| !listener.is_exhausted());
        }
        replaced
    }

    pub fn fire_event(&mut self, event: &GameEvent, state: &mut GameState) {
        for listener in &mut self.listeners {
            if listener.applies(event, state) {
                listener.observe(event, state);
            }
        }
        self.listeners.retain(|listener| !listener.is_exhausted());
    }

    /// Drops listeners whose source object has left the game. Returns how many
    /// were removed.
    pub fn remove_missing_sources(&mut self, state: &GameState) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|listener| {
            listener
                .source()
                .is_none_or(|source| state.object_exists(source))
        });
        before - self.listeners.len()
    }
}
