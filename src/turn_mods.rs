//! Turn-scoped structural edits to the normal turn sequence.
//!
//! Effects add entries ("skip your untap step", "after this step there is an
//! additional combat damage step", "after this phase there is an additional
//! combat phase"); the phase and turn loops consume them. Every entry is keyed
//! to the turn it applies to and is dropped once that turn is over.

use std::collections::{BTreeMap, BTreeSet};

use crate::game_state::{PhaseKind, StepKind};
use crate::ids::PlayerId;
use crate::step::Step;

type StepKey = (u32, PlayerId, StepKind);
type PhaseKey = (u32, PlayerId, PhaseKind);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnModifiers {
    turn: u32,
    end_turn_requested: bool,
    skipped_steps: BTreeSet<StepKey>,
    /// Keyed by the step they follow. Popped from the back: the most recently
    /// added extra step is taken first (rule 500.7).
    extra_steps: BTreeMap<StepKey, Vec<Step>>,
    skipped_phases: BTreeSet<PhaseKey>,
    extra_phases: BTreeMap<PhaseKey, Vec<PhaseKind>>,
}

impl TurnModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The turn whose entries are currently visible.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Moves to a new turn. Entries for earlier turns are discarded, entries
    /// scheduled for this or a later turn survive.
    pub fn new_turn(&mut self, turn: u32) {
        self.turn = turn;
        self.end_turn_requested = false;
        self.skipped_steps.retain(|&(t, _, _)| t >= turn);
        self.extra_steps.retain(|&(t, _, _), _| t >= turn);
        self.skipped_phases.retain(|&(t, _, _)| t >= turn);
        self.extra_phases.retain(|&(t, _, _), _| t >= turn);
    }

    // ------------------------------------------------------------------------
    // End of turn
    // ------------------------------------------------------------------------

    /// Rule 723: the rest of the turn is skipped except the cleanup step.
    pub fn request_end_turn(&mut self) {
        self.end_turn_requested = true;
    }

    pub fn end_turn_requested(&self) -> bool {
        self.end_turn_requested
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    pub fn add_skip_step(&mut self, player: PlayerId, step: StepKind) {
        self.add_skip_step_in_turn(player, step, self.turn);
    }

    pub fn add_skip_step_in_turn(&mut self, player: PlayerId, step: StepKind, turn: u32) {
        self.skipped_steps.insert((turn, player, step));
    }

    /// True if `player` skips `step` this turn. Pure lookup.
    pub fn skip_step(&self, player: PlayerId, step: StepKind) -> bool {
        self.skipped_steps.contains(&(self.turn, player, step))
    }

    pub fn add_extra_step(&mut self, player: PlayerId, after: StepKind, step: StepKind) {
        self.add_extra_step_in_turn(player, after, step, self.turn);
    }

    pub fn add_extra_step_in_turn(
        &mut self,
        player: PlayerId,
        after: StepKind,
        step: StepKind,
        turn: u32,
    ) {
        self.extra_steps
            .entry((turn, player, after))
            .or_default()
            .push(Step::new(step));
    }

    /// Pops the next extra step queued after `after` for `player`, if any.
    pub fn extra_step(&mut self, player: PlayerId, after: StepKind) -> Option<Step> {
        let key = (self.turn, player, after);
        let queue = self.extra_steps.get_mut(&key)?;
        let step = queue.pop();
        if queue.is_empty() {
            self.extra_steps.remove(&key);
        }
        step
    }

    pub fn pending_extra_steps(&self, player: PlayerId, after: StepKind) -> usize {
        self.extra_steps
            .get(&(self.turn, player, after))
            .map_or(0, Vec::len)
    }

    // ------------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------------

    pub fn add_skip_phase(&mut self, player: PlayerId, phase: PhaseKind) {
        self.skipped_phases.insert((self.turn, player, phase));
    }

    /// True if `player` skips `phase` this turn. Pure lookup.
    pub fn skip_phase(&self, player: PlayerId, phase: PhaseKind) -> bool {
        self.skipped_phases.contains(&(self.turn, player, phase))
    }

    pub fn add_extra_phase(&mut self, player: PlayerId, after: PhaseKind, phase: PhaseKind) {
        self.extra_phases
            .entry((self.turn, player, after))
            .or_default()
            .push(phase);
    }

    /// Pops the next extra phase queued after `after` for `player`, if any.
    pub fn extra_phase(&mut self, player: PlayerId, after: PhaseKind) -> Option<PhaseKind> {
        let key = (self.turn, player, after);
        let queue = self.extra_phases.get_mut(&key)?;
        let phase = queue.pop();
        if queue.is_empty() {
            self.extra_phases.remove(&key);
        }
        phase
    }

    pub fn is_empty(&self) -> bool {
        !self.end_turn_requested
            && self.skipped_steps.is_empty()
            && self.extra_steps.is_empty()
            && self.skipped_phases.is_empty()
            && self.extra_phases.is_empty()
    }
}
