//! Trigger checking and queue management.

use crate::effect::TurnEffect;
use crate::game_event::{EventKind, GameEvent};
use crate::ids::{ObjectId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(pub u64);

/// A registered triggered ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredAbility {
    pub id: TriggerId,
    /// The object that has the ability.
    pub source: ObjectId,
    pub controller: PlayerId,
    /// The event that triggers it.
    pub on: EventKind,
    pub effect: TurnEffect,
    /// "your upkeep": only during the controller's own turn.
    pub controller_turn_only: bool,
    /// Delayed one-shot triggers are removed once they trigger.
    pub once: bool,
}

impl TriggeredAbility {
    pub fn matches(&self, event: &GameEvent, active_player: PlayerId) -> bool {
        event.kind == self.on && (!self.controller_turn_only || active_player == self.controller)
    }
}

/// A triggered ability that needs to go on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredAbilityEntry {
    pub trigger: TriggerId,
    pub source: ObjectId,
    pub controller: PlayerId,
    pub effect: TurnEffect,
    /// The event that triggered this ability.
    pub triggering_event: GameEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRegistry {
    abilities: Vec<TriggeredAbility>,
    next_id: u64,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        source: ObjectId,
        controller: PlayerId,
        on: EventKind,
        effect: TurnEffect,
        controller_turn_only: bool,
        once: bool,
    ) -> TriggerId {
        self.next_id += 1;
        let id = TriggerId(self.next_id);
        self.abilities.push(TriggeredAbility {
            id,
            source,
            controller,
            on,
            effect,
            controller_turn_only,
            once,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    pub fn abilities(&self) -> &[TriggeredAbility] {
        &self.abilities
    }

    /// Returns the abilities that trigger on `event`, in registration order.
    /// One-shot abilities that triggered are removed.
    pub fn check(
        &mut self,
        event: &GameEvent,
        active_player: PlayerId,
    ) -> Vec<TriggeredAbilityEntry> {
        let triggered: Vec<TriggeredAbilityEntry> = self
            .abilities
            .iter()
            .filter(|ability| ability.matches(event, active_player))
            .map(|ability| TriggeredAbilityEntry {
                trigger: ability.id,
                source: ability.source,
                controller: ability.controller,
                effect: ability.effect.clone(),
                triggering_event: *event,
            })
            .collect();
        if !triggered.is_empty() {
            self.abilities
                .retain(|ability| !(ability.once && ability.matches(event, active_player)));
        }
        triggered
    }

    /// Keeps only abilities whose source passes `exists`. Returns how many
    /// were removed.
    pub fn retain_sources(&mut self, mut exists: impl FnMut(ObjectId) -> bool) -> usize {
        let before = self.abilities.len();
        self.abilities.retain(|ability| exists(ability.source));
        before - self.abilities.len()
    }
}

/// Queue of triggered abilities waiting to be put on the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerQueue {
    /// Pending triggered abilities.
    pub entries: Vec<TriggeredAbilityEntry>,
}

impl TriggerQueue {
    /// Create a new empty trigger queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triggered ability to the queue.
    pub fn add(&mut self, entry: TriggeredAbilityEntry) {
        self.entries.push(entry);
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all entries, leaving the queue empty.
    pub fn take_all(&mut self) -> Vec<TriggeredAbilityEntry> {
        std::mem::take(&mut self.entries)
    }
}
