//! Turn structure and priority tracking.
//!
//! A `Turn` owns one `Phase` per phase kind and plays them in order for the
//! active player, splicing in extra phases after the phase they follow. The
//! `PriorityTracker` lives in the game state and records how far the current
//! priority round got, so a round interrupted by a pause picks up with the
//! same player.

use crate::game::Game;
use crate::game_event::{EventKind, GameEvent};
use crate::game_state::PhaseKind;
use crate::ids::PlayerId;
use crate::phase::Phase;
use crate::step::Step;

/// Tracks priority passing to determine when a round of priority ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTracker {
    /// The player who receives priority next.
    pub holder: Option<PlayerId>,
    /// Number of consecutive passes without any player taking an action.
    pub consecutive_passes: usize,
    /// Number of players in the game (for determining when all have passed).
    pub players_in_game: usize,
}

impl PriorityTracker {
    /// Creates a new priority tracker for the given number of players.
    pub fn new(players_in_game: usize) -> Self {
        Self {
            holder: None,
            consecutive_passes: 0,
            players_in_game,
        }
    }

    /// Starts a fresh round with `holder` receiving priority first.
    pub fn start(&mut self, holder: PlayerId, players_in_game: usize) {
        self.holder = Some(holder);
        self.consecutive_passes = 0;
        self.players_in_game = players_in_game;
    }

    /// Records a priority pass. Returns true if all players have now passed.
    pub fn record_pass(&mut self) -> bool {
        self.consecutive_passes += 1;
        self.all_passed()
    }

    /// Resets the pass counter (called when a player takes an action).
    pub fn reset(&mut self) {
        self.consecutive_passes = 0;
    }

    /// Updates the number of players (called when a player leaves the game).
    pub fn set_players_in_game(&mut self, count: usize) {
        self.players_in_game = count;
    }

    /// Returns true if all players have passed in succession.
    pub fn all_passed(&self) -> bool {
        self.consecutive_passes >= self.players_in_game
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    phases: Vec<Phase>,
    current: Option<usize>,
    /// An additional phase being played after `phases[current]`.
    extra_phase: Option<Phase>,
    active_player: Option<PlayerId>,
    /// Phases (regular and extra) that ran to completion this turn.
    count: u32,
}

impl Default for Turn {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn {
    pub fn new() -> Self {
        Self {
            phases: PhaseKind::ALL.iter().map(|&kind| Phase::new(kind)).collect(),
            current: None,
            extra_phase: None,
            active_player: None,
            count: 0,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.active_player
    }

    /// The phase being played, preferring a running extra phase.
    pub fn current_phase(&self) -> Option<&Phase> {
        self.extra_phase
            .as_ref()
            .or_else(|| self.current.and_then(|index| self.phases.get(index)))
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_phase().and_then(Phase::current_step)
    }

    /// Plays a whole turn for `active`. Returns true if the turn ran to its
    /// end; false if it was paused, the game ended or a rollback started.
    pub fn play(&mut self, game: &mut impl Game, active: PlayerId) -> bool {
        if game.is_paused() || game.game_over() {
            return false;
        }

        self.active_player = Some(active);
        self.current = None;
        self.extra_phase = None;
        self.count = 0;
        for phase in &mut self.phases {
            phase.reset_count();
        }

        game.fire_event(&GameEvent::for_player(EventKind::TurnBegin, active));
        self.play_phases_from(game, active, 0)
    }

    /// Continues a suspended turn from the phase and step it stopped in.
    pub fn resume_play(&mut self, game: &mut impl Game, was_paused: bool) -> bool {
        let Some(index) = self.current else {
            game.end();
            return false;
        };
        let active = game.active_player();
        self.active_player = Some(active);
        let host = self.phases[index].kind();

        if let Some(mut extra) = self.extra_phase.take() {
            let completed = resume_phase(&mut extra, game, was_paused);
            if game.is_interrupted() {
                self.extra_phase = Some(extra);
                return false;
            }
            if completed {
                game.empty_mana_pools();
                self.count += 1;
            }
            self.play_extra_phases(game, active, host);
        } else {
            let completed = resume_phase(&mut self.phases[index], game, was_paused);
            if game.executing_rollback() {
                return false;
            }
            if completed {
                self.finish_phase(game, active, host);
            } else if game.is_paused() || game.game_over() {
                return false;
            }
        }

        self.play_phases_from(game, active, index + 1)
    }

    fn play_phases_from(&mut self, game: &mut impl Game, active: PlayerId, start: usize) -> bool {
        for index in start..self.phases.len() {
            if game.is_interrupted() {
                return false;
            }
            let kind = self.phases[index].kind();
            if game.state().turn_mods.end_turn_requested() && kind != PhaseKind::Ending {
                continue;
            }

            self.current = Some(index);
            enter_phase(game, kind, active);
            if game.state().turn_mods.skip_phase(active, kind) {
                continue;
            }

            let completed = self.phases[index].play(game, active);
            if game.executing_rollback() {
                return false;
            }
            if completed {
                self.finish_phase(game, active, kind);
            } else if game.is_paused() || game.game_over() {
                return false;
            }
        }
        !game.is_interrupted()
    }

    fn finish_phase(&mut self, game: &mut impl Game, active: PlayerId, kind: PhaseKind) {
        game.empty_mana_pools();
        self.count += 1;
        self.play_extra_phases(game, active, kind);
    }

    /// Rule 500.8: additional phases directly follow the phase they were added after.
    fn play_extra_phases(&mut self, game: &mut impl Game, active: PlayerId, after: PhaseKind) {
        loop {
            if game.is_interrupted() {
                return;
            }
            let Some(kind) = game.state_mut().turn_mods.extra_phase(active, after) else {
                return;
            };

            enter_phase(game, kind, active);
            if !game.is_simulation() {
                let name = game
                    .state()
                    .player(active)
                    .map_or_else(|| active.to_string(), |player| player.name.clone());
                game.inform_players(&format!("{} starts an additional {} phase", name, kind));
            }

            let completed = self.extra_phase.insert(Phase::new(kind)).play(game, active);
            if game.is_interrupted() {
                return;
            }
            self.extra_phase = None;
            if completed {
                game.empty_mana_pools();
                self.count += 1;
            }
        }
    }
}

fn enter_phase(game: &mut impl Game, kind: PhaseKind, active: PlayerId) {
    let turn = &mut game.state_mut().turn;
    turn.phase = Some(kind);
    turn.step = None;
    game.fire_event(&GameEvent::for_player(EventKind::PhaseChanged(kind), active));
}

fn resume_phase(phase: &mut Phase, game: &mut impl Game, was_paused: bool) -> bool {
    match phase.resume_point() {
        Some(step) => phase.resume_play(game, step, was_paused),
        None => {
            game.end();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{PriorityDecision, ScriptedDecisionMaker};
    use crate::game_state::{GameResult, StepKind};
    use crate::session::Session;

    fn alice() -> PlayerId {
        PlayerId::from_index(0)
    }

    fn test_game(decisions: Vec<PriorityDecision>) -> Session<ScriptedDecisionMaker> {
        let mut session =
            Session::for_players(&["Alice", "Bob"], ScriptedDecisionMaker::new(decisions));
        session.state_mut().begin_turn(alice());
        session
    }

    fn phase_changes(game: &Session<ScriptedDecisionMaker>) -> Vec<PhaseKind> {
        game.event_kinds()
            .into_iter()
            .filter_map(|kind| match kind {
                EventKind::PhaseChanged(phase) => Some(phase),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_priority_tracker() {
        let mut tracker = PriorityTracker::new(2);

        assert!(!tracker.all_passed());
        assert!(!tracker.record_pass()); // First pass
        assert!(tracker.record_pass()); // Second pass - all passed

        tracker.reset();
        assert!(!tracker.all_passed());

        tracker.start(alice(), 3);
        assert_eq!(tracker.holder, Some(alice()));
        assert_eq!(tracker.players_in_game, 3);
    }

    #[test]
    fn test_full_turn_plays_phases_in_order() {
        let mut game = test_game(vec![]);
        let mut turn = Turn::new();

        assert!(turn.play(&mut game, alice()));

        assert_eq!(phase_changes(&game), PhaseKind::ALL.to_vec());
        assert_eq!(turn.count(), 5);
        assert_eq!(game.event_kinds().first(), Some(&EventKind::TurnBegin));
    }

    #[test]
    fn test_extra_combat_phase_follows_combat() {
        let mut game = test_game(vec![]);
        game.state_mut()
            .turn_mods
            .add_extra_phase(alice(), PhaseKind::Combat, PhaseKind::Combat);
        let mut turn = Turn::new();

        assert!(turn.play(&mut game, alice()));

        assert_eq!(
            phase_changes(&game),
            vec![
                PhaseKind::Beginning,
                PhaseKind::PreCombatMain,
                PhaseKind::Combat,
                PhaseKind::Combat,
                PhaseKind::PostCombatMain,
                PhaseKind::Ending,
            ]
        );
        assert_eq!(turn.count(), 6);
        assert!(
            game.game_log()
                .iter()
                .any(|line| line == "Alice starts an additional Combat phase")
        );
    }

    #[test]
    fn test_skipped_phase_runs_no_steps() {
        let mut game = test_game(vec![]);
        game.state_mut()
            .turn_mods
            .add_skip_phase(alice(), PhaseKind::Combat);
        let mut turn = Turn::new();

        assert!(turn.play(&mut game, alice()));

        assert!(
            !game
                .event_kinds()
                .contains(&EventKind::StepPre(StepKind::BeginCombat))
        );
        assert_eq!(turn.count(), 4);
    }

    #[test]
    fn test_end_turn_skips_to_cleanup() {
        let mut game = test_game(vec![PriorityDecision::Act(crate::effect::TurnEffect::EndTurn)]);
        let mut turn = Turn::new();

        assert!(turn.play(&mut game, alice()));

        let steps: Vec<EventKind> = game
            .event_kinds()
            .into_iter()
            .filter(|kind| matches!(kind, EventKind::StepPre(_)))
            .collect();
        // The end-turn effect resolves during upkeep; only cleanup follows.
        assert_eq!(
            steps,
            vec![
                EventKind::StepPre(StepKind::Untap),
                EventKind::StepPre(StepKind::Upkeep),
                EventKind::StepPre(StepKind::Cleanup),
            ]
        );
    }

    #[test]
    fn test_pause_and_resume_finishes_turn() {
        let mut game = test_game(vec![PriorityDecision::Pass, PriorityDecision::Pause]);
        let mut turn = Turn::new();

        assert!(!turn.play(&mut game, alice()));
        assert_eq!(turn.current_phase().map(Phase::kind), Some(PhaseKind::Beginning));
        assert_eq!(turn.current_step().map(Step::kind), Some(StepKind::Upkeep));

        game.unpause();
        assert!(turn.resume_play(&mut game, true));
        assert_eq!(turn.count(), 5);
        assert_eq!(phase_changes(&game), PhaseKind::ALL.to_vec());
    }

    #[test]
    fn test_resume_before_any_phase_ends_game() {
        let mut game = test_game(vec![]);
        let mut turn = Turn::new();

        assert!(!turn.resume_play(&mut game, true));
        assert_eq!(game.state().result, Some(GameResult::Ended));
    }
}
