//! Authoritative game state consumed by the turn engine.
//!
//! The state aggregate is a plain value: cloning it yields an independent
//! checkpoint that shares nothing with the live game.

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::effect::TurnEffect;
use crate::ids::{ObjectId, PlayerId};
use crate::triggers::{TriggerQueue, TriggerRegistry};
use crate::turn::PriorityTracker;
use crate::turn_mods::TurnModifiers;

/// Game phases, in turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum PhaseKind {
    Beginning,
    PreCombatMain,
    Combat,
    PostCombatMain,
    Ending,
}

/// Steps of a turn, in turn order.
///
/// Main phases have a single implicit step named after the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum StepKind {
    // Beginning phase
    Untap,
    Upkeep,
    Draw,
    // Precombat main phase
    PreCombatMain,
    // Combat phase
    BeginCombat,
    DeclareAttackers,
    DeclareBlockers,
    CombatDamage,
    EndCombat,
    // Postcombat main phase
    PostCombatMain,
    // Ending phase
    End,
    Cleanup,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 5] = [
        PhaseKind::Beginning,
        PhaseKind::PreCombatMain,
        PhaseKind::Combat,
        PhaseKind::PostCombatMain,
        PhaseKind::Ending,
    ];

    /// The steps of this phase in declared order.
    pub fn steps(self) -> &'static [StepKind] {
        match self {
            PhaseKind::Beginning => &[StepKind::Untap, StepKind::Upkeep, StepKind::Draw],
            PhaseKind::PreCombatMain => &[StepKind::PreCombatMain],
            PhaseKind::Combat => &[
                StepKind::BeginCombat,
                StepKind::DeclareAttackers,
                StepKind::DeclareBlockers,
                StepKind::CombatDamage,
                StepKind::EndCombat,
            ],
            PhaseKind::PostCombatMain => &[StepKind::PostCombatMain],
            PhaseKind::Ending => &[StepKind::End, StepKind::Cleanup],
        }
    }

    /// Returns the next phase after this one, or None at the end of the turn.
    pub fn next(self) -> Option<PhaseKind> {
        match self {
            PhaseKind::Beginning => Some(PhaseKind::PreCombatMain),
            PhaseKind::PreCombatMain => Some(PhaseKind::Combat),
            PhaseKind::Combat => Some(PhaseKind::PostCombatMain),
            PhaseKind::PostCombatMain => Some(PhaseKind::Ending),
            PhaseKind::Ending => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::Beginning => "Beginning",
            PhaseKind::PreCombatMain => "Precombat Main",
            PhaseKind::Combat => "Combat",
            PhaseKind::PostCombatMain => "Postcombat Main",
            PhaseKind::Ending => "Ending",
        }
    }
}

impl StepKind {
    pub const ALL: [StepKind; 12] = [
        StepKind::Untap,
        StepKind::Upkeep,
        StepKind::Draw,
        StepKind::PreCombatMain,
        StepKind::BeginCombat,
        StepKind::DeclareAttackers,
        StepKind::DeclareBlockers,
        StepKind::CombatDamage,
        StepKind::EndCombat,
        StepKind::PostCombatMain,
        StepKind::End,
        StepKind::Cleanup,
    ];

    /// The phase this step belongs to.
    pub fn phase(self) -> PhaseKind {
        match self {
            StepKind::Untap | StepKind::Upkeep | StepKind::Draw => PhaseKind::Beginning,
            StepKind::PreCombatMain => PhaseKind::PreCombatMain,
            StepKind::BeginCombat
            | StepKind::DeclareAttackers
            | StepKind::DeclareBlockers
            | StepKind::CombatDamage
            | StepKind::EndCombat => PhaseKind::Combat,
            StepKind::PostCombatMain => PhaseKind::PostCombatMain,
            StepKind::End | StepKind::Cleanup => PhaseKind::Ending,
        }
    }

    /// Untap and cleanup steps normally grant no priority (rules 502.4, 514.3).
    pub fn grants_priority(self) -> bool {
        !matches!(self, StepKind::Untap | StepKind::Cleanup)
    }

    pub fn name(self) -> &'static str {
        match self {
            StepKind::Untap => "Untap",
            StepKind::Upkeep => "Upkeep",
            StepKind::Draw => "Draw",
            StepKind::PreCombatMain => "Precombat Main",
            StepKind::BeginCombat => "Beginning of Combat",
            StepKind::DeclareAttackers => "Declare Attackers",
            StepKind::DeclareBlockers => "Declare Blockers",
            StepKind::CombatDamage => "Combat Damage",
            StepKind::EndCombat => "End of Combat",
            StepKind::PostCombatMain => "Postcombat Main",
            StepKind::End => "End",
            StepKind::Cleanup => "Cleanup",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Turn position tracking, mirrored here for UI and decision makers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub active_player: PlayerId,
    /// Zero until the first turn begins.
    pub turn_number: u32,
    pub phase: Option<PhaseKind>,
    pub step: Option<StepKind>,
}

impl TurnState {
    pub fn new(active_player: PlayerId) -> Self {
        Self {
            active_player,
            turn_number: 0,
            phase: None,
            step: None,
        }
    }
}

/// Per-player counters the engine's turn-based actions touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub in_game: bool,
    /// Unspent mana, emptied between steps.
    pub mana_pool: u32,
    pub hand: u32,
    pub library: u32,
    pub max_hand_size: u32,
    /// Set when the player tried to draw from an empty library (rule 704.5b).
    pub drew_from_empty_library: bool,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: impl Into<String>, library: u32, max_hand_size: u32) -> Self {
        Self {
            id,
            name: name.into(),
            in_game: true,
            mana_pool: 0,
            hand: 0,
            library,
            max_hand_size,
            drew_from_empty_library: false,
        }
    }
}

/// An entry on the stack waiting to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub id: ObjectId,
    pub controller: PlayerId,
    pub effect: TurnEffect,
    /// Source object when the entry came from a triggered ability.
    pub source: Option<ObjectId>,
}

impl StackEntry {
    pub fn new(id: ObjectId, controller: PlayerId, effect: TurnEffect) -> Self {
        Self {
            id,
            controller,
            effect,
            source: None,
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
    /// Ended without a winner (abandoned or nothing left to resume).
    Ended,
}

/// The complete game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Players in turn order.
    pub players: Vec<PlayerState>,
    pub turn: TurnState,
    pub priority: PriorityTracker,
    /// Steps started so far in the game.
    pub step_num: u64,
    pub turn_mods: TurnModifiers,
    pub triggers: TriggerRegistry,
    pub pending_triggers: TriggerQueue,
    /// Objects currently in the game, keyed to their controller.
    pub objects: BTreeMap<ObjectId, PlayerId>,
    pub stack: Vec<StackEntry>,
    /// Creatures declared as attackers this combat.
    pub attackers: Vec<ObjectId>,
    /// Extra turns queued up. The most recently added is taken first (rule 500.7).
    pub extra_turns: Vec<PlayerId>,
    /// Players who will skip their next turn.
    pub skip_next_turn: BTreeSet<PlayerId>,
    pub result: Option<GameResult>,
    /// Source of ids for stack entries and created objects. Part of the state
    /// so a restored checkpoint hands out the same ids again.
    next_object: u64,
}

impl GameState {
    /// Creates a new game with the given player names in turn order.
    pub fn new(player_names: Vec<String>, library_size: u32, max_hand_size: u32) -> Self {
        let players: Vec<PlayerState> = player_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                PlayerState::new(
                    PlayerId::from_index(index as u8),
                    name,
                    library_size,
                    max_hand_size,
                )
            })
            .collect();
        let first = PlayerId::from_index(0);

        Self {
            priority: PriorityTracker::new(players.len()),
            players,
            turn: TurnState::new(first),
            step_num: 0,
            turn_mods: TurnModifiers::new(),
            triggers: TriggerRegistry::new(),
            pending_triggers: TriggerQueue::new(),
            objects: BTreeMap::new(),
            stack: Vec::new(),
            attackers: Vec::new(),
            extra_turns: Vec::new(),
            skip_next_turn: BTreeSet::new(),
            result: None,
            next_object: 1,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_in_game(&self, id: PlayerId) -> bool {
        self.player(id).is_some_and(|p| p.in_game)
    }

    pub fn players_in_game(&self) -> usize {
        self.players.iter().filter(|p| p.in_game).count()
    }

    /// The next player still in the game after `player` in turn order.
    pub fn next_player_in_game(&self, player: PlayerId) -> Option<PlayerId> {
        let current_index = self.players.iter().position(|p| p.id == player)?;
        (1..=self.players.len())
            .map(|offset| &self.players[(current_index + offset) % self.players.len()])
            .find(|p| p.in_game)
            .map(|p| p.id)
    }

    /// Picks who takes the next turn, consuming extra-turn and skip-turn entries.
    pub fn next_active_player(&mut self) -> Option<PlayerId> {
        if let Some(player) = self.extra_turns.pop() {
            return Some(player);
        }
        if self.turn.turn_number == 0 {
            let first = self.players.iter().find(|p| p.in_game)?.id;
            if !self.skip_next_turn.remove(&first) {
                return Some(first);
            }
            return self.next_player_in_game(first);
        }

        let mut candidate = self.next_player_in_game(self.turn.active_player)?;
        for _ in 0..self.players.len() {
            if !self.skip_next_turn.remove(&candidate) {
                return Some(candidate);
            }
            candidate = self.next_player_in_game(candidate)?;
        }
        Some(candidate)
    }

    /// Starts a new turn for `active`, dropping everything scoped to the old turn.
    pub fn begin_turn(&mut self, active: PlayerId) {
        self.turn.turn_number += 1;
        self.turn.active_player = active;
        self.turn.phase = None;
        self.turn.step = None;
        self.turn_mods.new_turn(self.turn.turn_number);
        self.priority = PriorityTracker::new(self.players_in_game());
        self.attackers.clear();
    }

    pub fn increase_step_num(&mut self) {
        self.step_num += 1;
    }

    pub fn empty_mana_pools(&mut self) {
        for player in &mut self.players {
            player.mana_pool = 0;
        }
    }

    /// The id `allocate_object_id` hands out next.
    pub fn next_object_id(&self) -> u64 {
        let after_existing = self.objects.keys().next_back().map_or(0, |id| id.0 + 1);
        self.next_object.max(after_existing)
    }

    pub fn allocate_object_id(&mut self) -> ObjectId {
        let id = self.next_object_id();
        self.next_object = id + 1;
        ObjectId::from_raw(id)
    }

    pub fn object_exists(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Puts a new object into the game under `controller`'s control.
    pub fn create_object(&mut self, id: ObjectId, controller: PlayerId) {
        self.objects.insert(id, controller);
    }

    pub fn remove_object(&mut self, id: ObjectId) {
        self.objects.remove(&id);
        self.attackers.retain(|&attacker| attacker != id);
    }

    pub fn objects_controlled_by(&self, player: PlayerId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|&(_, &controller)| controller == player)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Drops triggered abilities whose source has left the game.
    pub fn remove_triggers_of_missing_sources(&mut self) -> usize {
        let objects = &self.objects;
        self.triggers.retain_sources(|source| objects.contains_key(&source))
    }

    pub fn stack_is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn push_to_stack(&mut self, entry: StackEntry) {
        self.stack.push(entry);
    }

    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    /// Removes a player; ends the game when at most one player remains.
    pub fn remove_player(&mut self, id: PlayerId) {
        if let Some(player) = self.player_mut(id) {
            player.in_game = false;
        }
        self.stack.retain(|entry| entry.controller != id);
        let remaining: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.in_game)
            .map(|p| p.id)
            .collect();
        match remaining.as_slice() {
            [] => self.result = Some(GameResult::Draw),
            [winner] => self.result = Some(GameResult::Winner(*winner)),
            _ => self.priority.set_players_in_game(remaining.len()),
        }
    }

    /// Returns a human-readable description of the current phase/step.
    pub fn current_phase_description(&self) -> String {
        match (self.turn.phase, self.turn.step) {
            (Some(phase), Some(step)) if phase.steps().len() > 1 => {
                format!("{} Phase - {} Step", phase, step)
            }
            (Some(phase), _) => format!("{} Phase", phase),
            (None, _) => "Between turns".to_string(),
        }
    }
}
