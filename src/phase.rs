//! Phases: ordered runs of steps with skip/extra-step handling.

use crate::game::Game;
use crate::game_event::{EventKind, GameEvent};
use crate::game_state::{PhaseKind, StepKind};
use crate::ids::PlayerId;
use crate::step::{Step, StepPart};

/// Extra steps recurse through `play_step`; each level gets a fresh stack
/// segment once the remaining stack drops below this.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Where to (re-)enter a step's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Run the begin action, then a fresh priority round.
    Begin,
    ResumeBegin,
    Priority { resuming: bool },
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    kind: PhaseKind,
    steps: Vec<Step>,
    begin_event: EventKind,
    pre_event: EventKind,
    post_event: EventKind,
    active_player: Option<PlayerId>,
    current: Option<usize>,
    /// Extra steps currently being played, innermost last.
    extra_steps: Vec<Step>,
    count: u32,
}

impl Phase {
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            kind,
            steps: kind.steps().iter().map(|&step| Step::new(step)).collect(),
            begin_event: EventKind::Phase(kind),
            pre_event: EventKind::PhasePre(kind),
            post_event: EventKind::PhasePost(kind),
            active_player: None,
            current: None,
            extra_steps: Vec::new(),
            count: 0,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// How many times this phase has run to completion.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset_count(&mut self) {
        self.count = 0;
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.active_player
    }

    /// The step being played: the innermost extra step if one is running.
    pub fn current_step(&self) -> Option<&Step> {
        self.extra_steps
            .last()
            .or_else(|| self.current.and_then(|index| self.steps.get(index)))
    }

    /// The phase's own step that was playing, ignoring extra steps. This is
    /// where `resume_play` re-enters.
    pub fn resume_point(&self) -> Option<StepKind> {
        self.current
            .and_then(|index| self.steps.get(index))
            .map(Step::kind)
    }

    fn step_mut(&mut self) -> Option<&mut Step> {
        match self.extra_steps.last_mut() {
            Some(step) => Some(step),
            None => self.current.and_then(|index| self.steps.get_mut(index)),
        }
    }

    /// Plays the whole phase for `active`.
    ///
    /// Returns true only if the phase ran to completion, including its end
    /// action. False means it was vetoed by a replacement effect or
    /// interrupted by a pause, game end or rollback.
    pub fn play(&mut self, game: &mut impl Game, active: PlayerId) -> bool {
        if game.is_paused() || game.game_over() {
            return false;
        }

        self.active_player = Some(active);
        self.current = None;
        self.extra_steps.clear();
        for step in &mut self.steps {
            *step = Step::new(step.kind());
        }

        if !self.begin_phase(game, active) {
            return false;
        }
        self.play_steps_from(game, active, 0)
    }

    /// Re-enters the phase at `step` after a pause.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not one of this phase's steps. Callers only resume
    /// at a step recorded from this phase.
    pub fn resume_play(&mut self, game: &mut impl Game, step: StepKind, was_paused: bool) -> bool {
        if game.is_paused() || game.game_over() {
            return false;
        }

        let active = game.active_player();
        self.active_player = Some(active);
        let index = self
            .steps
            .iter()
            .position(|s| s.kind() == step)
            .unwrap_or_else(|| panic!("{} is not a step of the {} phase", step, self.kind));
        self.current = Some(index);

        self.resume_step(game, active, was_paused);
        if game.executing_rollback() {
            return false;
        }
        self.play_steps_from(game, active, index + 1)
    }

    fn play_steps_from(&mut self, game: &mut impl Game, active: PlayerId, start: usize) -> bool {
        for index in start..self.steps.len() {
            if game.is_interrupted() {
                return false;
            }
            let kind = self.steps[index].kind();
            if game.state().turn_mods.end_turn_requested() && kind != StepKind::Cleanup {
                self.steps[index].mark_completed();
                continue;
            }

            self.current = Some(index);
            game.state_mut().turn.step = Some(kind);

            if game.state().turn_mods.skip_step(active, kind) {
                self.steps[index].mark_completed();
            } else {
                self.play_step(game, active);
                if game.executing_rollback() {
                    return false;
                }
            }

            if !game.is_simulation() && self.check_stop_on_step_option(game, kind) {
                return false;
            }
        }

        if game.is_paused() || game.game_over() {
            return false;
        }
        self.count += 1;
        self.end_phase(game, active);
        true
    }

    /// Debug aid: pause once the configured turn and step are reached.
    fn check_stop_on_step_option(&self, game: &mut impl Game, step: StepKind) -> bool {
        let options = game.options();
        let stop = options
            .stop_on_turn
            .is_some_and(|turn| turn <= game.state().turn.turn_number)
            && options.stop_at_step == Some(step);
        if stop {
            game.pause();
        }
        stop
    }

    pub fn begin_phase(&mut self, game: &mut impl Game, active: PlayerId) -> bool {
        if game.replace_event(&GameEvent::for_player(self.begin_event, active)) {
            return false;
        }
        game.fire_event(&GameEvent::for_player(self.pre_event, active));
        true
    }

    pub fn end_phase(&mut self, game: &mut impl Game, active: PlayerId) {
        game.fire_event(&GameEvent::for_player(self.post_event, active));
        // Tokens and other objects may have left the game during the phase.
        game.state_mut().remove_triggers_of_missing_sources();
    }

    /// Plays the step on top of the extra-step chain, or the current step.
    fn play_step(&mut self, game: &mut impl Game, active: PlayerId) {
        let Some(step) = self.step_mut() else {
            return;
        };
        if step.skip_step(game, active) {
            step.mark_completed();
            return;
        }
        game.state_mut().increase_step_num();
        self.drive_step(game, active, Stage::Begin);
    }

    fn drive_step(&mut self, game: &mut impl Game, active: PlayerId, mut stage: Stage) {
        loop {
            stage = match stage {
                Stage::Begin => {
                    self.pre_priority(game, active);
                    Stage::Priority { resuming: false }
                }
                Stage::ResumeBegin => {
                    if let Some(step) = self.step_mut() {
                        step.resume_begin_step(game, active);
                    }
                    Stage::Priority { resuming: false }
                }
                Stage::Priority { resuming } => {
                    if let Some(step) = self.step_mut() {
                        step.priority(game, active, resuming);
                    }
                    Stage::Post
                }
                Stage::Post => {
                    self.post_priority(game, active);
                    return;
                }
            };
            if game.is_interrupted() {
                return;
            }
        }
    }

    fn pre_priority(&mut self, game: &mut impl Game, active: PlayerId) {
        if let Some(step) = self.step_mut() {
            step.begin_step(game, active);
        }
    }

    fn post_priority(&mut self, game: &mut impl Game, active: PlayerId) {
        let Some(step) = self.step_mut() else {
            return;
        };
        step.end_step(game, active);
        let kind = step.kind();
        // Rule 500.4: mana empties at the end of each step.
        game.empty_mana_pools();
        self.play_extra_steps(game, active, kind);
        if !game.is_interrupted()
            && let Some(step) = self.step_mut()
        {
            step.mark_completed();
        }
    }

    /// Rule 500.8: additional steps directly follow the step they were added after.
    fn play_extra_steps(&mut self, game: &mut impl Game, active: PlayerId, after: StepKind) {
        loop {
            if game.is_interrupted() {
                return;
            }
            let Some(extra) = game.state_mut().turn_mods.extra_step(active, after) else {
                return;
            };
            self.extra_steps.push(extra);
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
                self.play_step(game, active);
            });
            if game.is_interrupted() {
                // Keep the chain so a resume re-enters the suspended extra step.
                return;
            }
            self.extra_steps.pop();
        }
    }

    /// Resumes the current step from its recorded part, then finishes any
    /// extra steps that were interrupted along with it.
    fn resume_step(&mut self, game: &mut impl Game, active: PlayerId, was_paused: bool) {
        let Some(step) = self.step_mut() else {
            game.end();
            return;
        };
        if !step.is_completed() {
            let stage = match step.part() {
                None => {
                    game.end();
                    return;
                }
                Some(StepPart::Pre) if was_paused => Stage::ResumeBegin,
                Some(StepPart::Pre) => Stage::Begin,
                Some(StepPart::Priority) => Stage::Priority { resuming: true },
                Some(StepPart::Post) => Stage::Post,
            };
            self.drive_step(game, active, stage);
        }

        // Unwind the chain: each parent still owes the rest of its extra steps.
        while !self.extra_steps.is_empty() {
            if game.is_interrupted() {
                return;
            }
            self.extra_steps.pop();
            let parent = match self.current_step() {
                Some(step) => step.kind(),
                None => return,
            };
            self.play_extra_steps(game, active, parent);
        }

        if !game.is_interrupted()
            && let Some(step) = self.step_mut()
        {
            step.mark_completed();
        }
    }
}
