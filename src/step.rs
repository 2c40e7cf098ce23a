//! Steps: the smallest schedulable unit of a turn.
//!
//! A step runs its begin action, gives players priority in turn order and runs
//! its end action. `part` records which of the three it is in, which is all
//! the state needed to resume a suspended step without repeating finished
//! work.

use crate::game::{Game, PriorityOutcome};
use crate::game_event::{EventKind, GameEvent};
use crate::game_state::StepKind;
use crate::ids::PlayerId;

/// Where a started step currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPart {
    Pre,
    Priority,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    kind: StepKind,
    step_event: EventKind,
    pre_event: EventKind,
    post_event: EventKind,
    has_priority: bool,
    part: Option<StepPart>,
    /// Set once the step (including any extra steps it spawned) is done or
    /// was skipped, so a resume never replays it.
    completed: bool,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            step_event: EventKind::Step(kind),
            pre_event: EventKind::StepPre(kind),
            post_event: EventKind::StepPost(kind),
            has_priority: kind.grants_priority(),
            part: None,
            completed: false,
        }
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn part(&self) -> Option<StepPart> {
        self.part
    }

    pub fn has_priority(&self) -> bool {
        self.has_priority
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// True if this step does not happen for `active` this turn. When it
    /// returns true none of begin, priority or end run.
    pub fn skip_step(&self, game: &mut impl Game, active: PlayerId) -> bool {
        game.state().turn_mods.skip_step(active, self.kind)
            || game.skips_step_by_rule(self.kind, active)
            || game.replace_event(&GameEvent::for_player(self.step_event, active))
    }

    pub fn begin_step(&mut self, game: &mut impl Game, active: PlayerId) {
        self.part = Some(StepPart::Pre);
        game.state_mut().turn.step = Some(self.kind);
        game.fire_event(&GameEvent::for_player(self.pre_event, active));
        game.turn_based_action(self.kind, active);
    }

    /// Re-enters a begin action that was paused; nothing already done is repeated.
    pub fn resume_begin_step(&mut self, game: &mut impl Game, active: PlayerId) {
        self.part = Some(StepPart::Pre);
        game.state_mut().turn.step = Some(self.kind);
        game.resume_turn_based_action(self.kind, active);
    }

    /// Round-robin priority starting with the active player.
    ///
    /// An action restarts the round with the next player after the actor; the
    /// stack resolves once everyone passed in succession, after which the
    /// active player receives priority again. The loop returns as soon as the
    /// game pauses, ends or starts a rollback, leaving `part` at `Priority`.
    pub fn priority(&mut self, game: &mut impl Game, active: PlayerId, resuming: bool) {
        if !self.has_priority {
            return;
        }
        self.part = Some(StepPart::Priority);
        game.state_mut().turn.step = Some(self.kind);

        if !resuming {
            let players = game.state().players_in_game();
            game.state_mut().priority.start(active, players);
        }
        // When resuming, the tracker still holds the interrupted round.

        loop {
            if game.is_interrupted() {
                return;
            }

            let players = game.state().players_in_game();
            game.state_mut().priority.set_players_in_game(players);

            if game.state().priority.all_passed() {
                if game.resolve_stack() {
                    game.state_mut().priority.start(active, players);
                    continue;
                }
                return;
            }

            let holder = match game.state().priority.holder {
                Some(player) if game.state().is_in_game(player) => Some(player),
                Some(player) => game.state().next_player_in_game(player),
                None => game.state().next_player_in_game(active),
            };
            let Some(holder) = holder else {
                return;
            };

            match game.grant_priority(holder) {
                PriorityOutcome::Passed => {
                    let next = game.state().next_player_in_game(holder);
                    let tracker = &mut game.state_mut().priority;
                    tracker.record_pass();
                    tracker.holder = next;
                }
                PriorityOutcome::Acted => {
                    let next = game.state().next_player_in_game(holder);
                    let tracker = &mut game.state_mut().priority;
                    tracker.reset();
                    tracker.holder = next;
                }
                PriorityOutcome::Interrupted => return,
            }
        }
    }

    pub fn end_step(&mut self, game: &mut impl Game, active: PlayerId) {
        self.part = Some(StepPart::Post);
        game.fire_event(&GameEvent::for_player(self.post_event, active));
    }
}
