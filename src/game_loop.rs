//! Match driver: turn order, checkpoints and rollback.
//!
//! `GameLoop` picks the active player for each turn, snapshots the whole game
//! at every turn start and plays the turn through `Turn`. When a player asks
//! for a rollback the loop restores the checkpoint of the requested turn and
//! plays that turn again on the next `play_turn`.

use tracing::info;

use crate::config::{ConfigError, MatchConfig};
use crate::decision::DecisionMaker;
use crate::events::EventBus;
use crate::game::Game;
use crate::game_state::{GameResult, GameState, StepKind};
use crate::ids::PlayerId;
use crate::session::{RecordLengths, Session};
use crate::turn::Turn;

#[derive(Debug, thiserror::Error)]
pub enum GameLoopError {
    #[error("the game is over")]
    GameOver,

    #[error("the game is paused")]
    Paused,

    #[error("the game is not paused")]
    NotPaused,

    #[error("no checkpoint for turn {0}")]
    MissingCheckpoint(u32),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// How a call into the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn ran to its end.
    Completed,
    /// Paused by a player or the stop-on-step option; call `resume`.
    Paused,
    GameOver(GameResult),
    /// The game was restored to the start of `to_turn`, which plays again next.
    RolledBack { to_turn: u32 },
}

/// Snapshot of the game at the start of a turn.
#[derive(Debug, Clone)]
struct Checkpoint {
    turn_number: u32,
    state: GameState,
    bus: EventBus,
    turn: Turn,
    record: RecordLengths,
}

#[derive(Debug)]
pub struct GameLoop<D: DecisionMaker> {
    session: Session<D>,
    turn: Turn,
    checkpoints: Vec<Checkpoint>,
    /// Set after a rollback: the restored turn is replayed instead of starting a new one.
    replay_pending: bool,
}

impl<D: DecisionMaker> GameLoop<D> {
    pub fn new(config: &MatchConfig, decision_maker: D) -> Result<Self, GameLoopError> {
        config.validate()?;
        Ok(Self::from_session(Session::new(config, decision_maker)))
    }

    pub fn from_session(session: Session<D>) -> Self {
        Self {
            session,
            turn: Turn::new(),
            checkpoints: Vec::new(),
            replay_pending: false,
        }
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<D> {
        self.session
    }

    pub fn state(&self) -> &GameState {
        self.session.state()
    }

    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    /// Turn numbers that can still be rolled back to, oldest first.
    pub fn checkpoint_turns(&self) -> Vec<u32> {
        self.checkpoints.iter().map(|c| c.turn_number).collect()
    }

    /// Starts and plays the next turn (or replays a rolled-back one).
    pub fn play_turn(&mut self) -> Result<TurnOutcome, GameLoopError> {
        if self.session.game_over() {
            return Err(GameLoopError::GameOver);
        }
        if self.session.is_paused() {
            return Err(GameLoopError::Paused);
        }

        if self.replay_pending {
            self.replay_pending = false;
        } else {
            let Some(active) = self.session.state_mut().next_active_player() else {
                self.session.end();
                return self.settle();
            };
            self.begin_turn(active);
        }

        let active = self.session.active_player();
        if !self.session.is_simulation() {
            let state = self.session.state();
            let name = state
                .player(active)
                .map_or_else(|| active.to_string(), |p| p.name.clone());
            info!(turn = state.turn.turn_number, "{}'s turn", name);
        }
        self.turn.play(&mut self.session, active);
        self.settle()
    }

    /// Plays turns until the game ends, pauses, or `max_turns` have started.
    pub fn run(&mut self, max_turns: u32) -> Result<TurnOutcome, GameLoopError> {
        while self.replay_pending || self.session.state().turn.turn_number < max_turns {
            match self.play_turn()? {
                TurnOutcome::Completed | TurnOutcome::RolledBack { .. } => {}
                outcome @ (TurnOutcome::Paused | TurnOutcome::GameOver(_)) => return Ok(outcome),
            }
        }
        Ok(TurnOutcome::Completed)
    }

    /// Continues a paused turn from exactly where it stopped.
    pub fn resume(&mut self) -> Result<TurnOutcome, GameLoopError> {
        if self.session.game_over() {
            return Err(GameLoopError::GameOver);
        }
        if !self.session.is_paused() {
            return Err(GameLoopError::NotPaused);
        }
        self.session.unpause();
        self.turn.resume_play(&mut self.session, true);
        self.settle()
    }

    /// Re-enters the current turn when it was abandoned without a pause, for
    /// example after loading it from a snapshot. A step stopped in its begin
    /// part runs its begin action again.
    pub fn resume_unpaused(&mut self) -> Result<TurnOutcome, GameLoopError> {
        if self.session.game_over() {
            return Err(GameLoopError::GameOver);
        }
        self.session.unpause();
        self.turn.resume_play(&mut self.session, false);
        self.settle()
    }

    /// A copy of this game in simulation mode, driven by `decision_maker`.
    /// Nothing the copy does is visible in this game.
    pub fn simulate<E: DecisionMaker>(&self, decision_maker: E) -> GameLoop<E> {
        let mut session = self.session.fork(decision_maker);
        if self.session.is_paused() {
            session.pause();
        }
        GameLoop {
            session,
            turn: self.turn.clone(),
            checkpoints: self.checkpoints.clone(),
            replay_pending: self.replay_pending,
        }
    }

    fn begin_turn(&mut self, active: PlayerId) {
        let state = self.session.state_mut();
        state.begin_turn(active);
        // Rule 103.8a: in a two-player game the starting player skips their first draw.
        if state.turn.turn_number == 1 && state.players.len() == 2 {
            state.turn_mods.add_skip_step(active, StepKind::Draw);
        }
        self.turn = Turn::new();
        self.push_checkpoint();
    }

    fn push_checkpoint(&mut self) {
        self.checkpoints.push(Checkpoint {
            turn_number: self.session.state().turn.turn_number,
            state: self.session.state().clone(),
            bus: self.session.bus().clone(),
            turn: self.turn.clone(),
            record: self.session.record_lengths(),
        });
        let max = self.session.options().max_checkpoints.max(1);
        if self.checkpoints.len() > max {
            let excess = self.checkpoints.len() - max;
            self.checkpoints.drain(..excess);
        }
        self.sync_rollback_window();
    }

    fn sync_rollback_window(&mut self) {
        let earliest = self.checkpoints.first().map(|c| c.turn_number);
        self.session.set_earliest_checkpoint_turn(earliest);
    }

    fn settle(&mut self) -> Result<TurnOutcome, GameLoopError> {
        if let Some(target) = self.session.rollback_target() {
            let index = self
                .checkpoints
                .iter()
                .rposition(|c| c.turn_number == target)
                .ok_or(GameLoopError::MissingCheckpoint(target))?;
            self.checkpoints.truncate(index + 1);
            let checkpoint = self.checkpoints[index].clone();
            self.session
                .restore(checkpoint.state, checkpoint.bus, checkpoint.record);
            self.turn = checkpoint.turn;
            self.replay_pending = true;
            self.sync_rollback_window();
            return Ok(TurnOutcome::RolledBack { to_turn: target });
        }
        if let Some(result) = self.session.state().result {
            return Ok(TurnOutcome::GameOver(result));
        }
        if self.session.is_paused() {
            return Ok(TurnOutcome::Paused);
        }
        Ok(TurnOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameOptions;
    use crate::decision::{AutoPassDecisionMaker, PriorityDecision, ScriptedDecisionMaker};
    use crate::effect::TurnEffect;
    use crate::game_event::EventKind;

    fn config() -> MatchConfig {
        MatchConfig::with_players(&["Alice", "Bob"])
    }

    fn draws(game: &GameLoop<impl DecisionMaker>) -> usize {
        game.session()
            .event_kinds()
            .iter()
            .filter(|kind| **kind == EventKind::StepPre(StepKind::Draw))
            .count()
    }

    #[test]
    fn test_starting_player_skips_first_draw() {
        let mut game = GameLoop::new(&config(), AutoPassDecisionMaker).expect("valid config");
        assert_eq!(game.play_turn().expect("turn 1"), TurnOutcome::Completed);
        assert_eq!(draws(&game), 0);
        assert_eq!(game.state().player(PlayerId(0)).map(|p| p.hand), Some(0));

        assert_eq!(game.play_turn().expect("turn 2"), TurnOutcome::Completed);
        assert_eq!(draws(&game), 1);
        assert_eq!(game.state().turn.active_player, PlayerId(1));
    }

    #[test]
    fn test_three_player_game_draws_on_turn_one() {
        let config = MatchConfig::with_players(&["Ann", "Ben", "Cid"]);
        let mut game = GameLoop::new(&config, AutoPassDecisionMaker).expect("valid config");
        game.play_turn().expect("turn 1");
        assert_eq!(draws(&game), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = MatchConfig::with_players(&["Solo"]);
        let err = GameLoop::new(&config, AutoPassDecisionMaker).unwrap_err();
        assert!(matches!(err, GameLoopError::Config(_)));
    }

    #[test]
    fn test_checkpoints_are_bounded() {
        let mut config = config();
        config.options.max_checkpoints = 3;
        let mut game = GameLoop::new(&config, AutoPassDecisionMaker).expect("valid config");
        game.run(5).expect("runs");
        assert_eq!(game.checkpoint_turns(), vec![3, 4, 5]);
    }

    #[test]
    fn test_decking_ends_the_game() {
        let mut config = config();
        config.library_size = 2;
        let mut game = GameLoop::new(&config, AutoPassDecisionMaker).expect("valid config");

        let outcome = game.run(20).expect("runs");

        // Bob draws on turns 2 and 4 and finds his library empty on turn 6.
        assert_eq!(outcome, TurnOutcome::GameOver(GameResult::Winner(PlayerId(0))));
        assert_eq!(game.state().turn.turn_number, 6);
        assert_eq!(game.play_turn().unwrap_err().to_string(), "the game is over");
    }

    #[test]
    fn test_stop_on_step_pauses_and_resumes() {
        let mut config = config();
        config.options = GameOptions::stop_at(2, StepKind::Upkeep);
        let mut game = GameLoop::new(&config, AutoPassDecisionMaker).expect("valid config");

        assert_eq!(game.play_turn().expect("turn 1"), TurnOutcome::Completed);
        assert_eq!(game.play_turn().expect("turn 2"), TurnOutcome::Paused);
        assert_eq!(game.state().turn.step, Some(StepKind::Upkeep));
        assert!(matches!(game.play_turn(), Err(GameLoopError::Paused)));

        assert_eq!(game.resume().expect("resumes"), TurnOutcome::Completed);
        let upkeeps = game
            .session()
            .event_kinds()
            .iter()
            .filter(|kind| **kind == EventKind::StepPost(StepKind::Upkeep))
            .count();
        assert_eq!(upkeeps, 2);
        assert!(matches!(game.resume(), Err(GameLoopError::NotPaused)));
    }

    #[test]
    fn test_rollback_restores_turn_start() {
        // Turn 1: Alice grants Bob an extra turn; Bob then rolls back to turn 1.
        let decisions = vec![PriorityDecision::Act(TurnEffect::ExtraTurn {
            player: PlayerId(1),
        })];
        let mut game =
            GameLoop::new(&config(), ScriptedDecisionMaker::new(decisions)).expect("valid config");
        game.play_turn().expect("turn 1");
        assert_eq!(game.state().extra_turns, vec![PlayerId(1)]);

        game.session_mut()
            .decision_maker_mut()
            .push(PriorityDecision::Rollback { turns: 1 });
        let outcome = game.play_turn().expect("turn 2");
        assert_eq!(outcome, TurnOutcome::RolledBack { to_turn: 1 });
        assert_eq!(game.state().turn.turn_number, 1);
        assert_eq!(game.state().turn.active_player, PlayerId(0));
        assert_eq!(game.checkpoint_turns(), vec![1]);
        assert!(game.state().extra_turns.is_empty());
        // Nothing of the abandoned turns is left in the record.
        assert!(game.session().priority_grants().is_empty());
        assert!(game.session().event_log().is_empty());

        // The replay gets no scripted action this time.
        assert_eq!(game.play_turn().expect("replay"), TurnOutcome::Completed);
        assert_eq!(game.state().turn.turn_number, 1);
        assert!(game.state().extra_turns.is_empty());
    }

    #[test]
    fn test_simulation_neither_logs_nor_stops() {
        let mut config = config();
        config.options = GameOptions::stop_at(1, StepKind::Upkeep);
        let game = GameLoop::new(&config, AutoPassDecisionMaker).expect("valid config");

        let mut sim = game.simulate(ScriptedDecisionMaker::new([PriorityDecision::Pause]));
        assert_eq!(sim.run(3).expect("simulates"), TurnOutcome::Completed);
        assert!(sim.session().game_log().is_empty());
        assert_eq!(game.state().turn.turn_number, 0);
    }
}
