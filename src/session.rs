//! A complete `Game` host over `GameState`.
//!
//! `Session` wires the engine to an event bus, a trigger registry and a
//! decision maker, and implements the turn-based actions the engine asks for
//! (draw, attacker declaration, cleanup). It also keeps the observable record
//! of a game: the event log, the player-facing game log and who received
//! priority when.

use tracing::{debug, info, trace};

use crate::config::{GameOptions, MatchConfig};
use crate::decision::{DecisionMaker, PriorityDecision};
use crate::effect::TurnEffect;
use crate::events::{EventBus, EventListener};
use crate::game::{Game, PriorityOutcome};
use crate::game_event::{EventKind, GameEvent};
use crate::game_state::{GameResult, GameState, StackEntry, StepKind};
use crate::ids::{ObjectId, PlayerId};
use crate::replacement::SkipEventReplacement;

/// How an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Offered to replacement effects; `replaced` is the outcome.
    Replace { replaced: bool },
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub event: GameEvent,
    pub dispatch: Dispatch,
}

/// How much of a session's record existed when a checkpoint was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordLengths {
    events: usize,
    priority_grants: usize,
}

#[derive(Debug, Clone)]
pub struct Session<D: DecisionMaker> {
    state: GameState,
    bus: EventBus,
    options: GameOptions,
    decision_maker: D,
    paused: bool,
    /// Turn number a requested rollback returns to.
    rollback_to: Option<u32>,
    simulation: bool,
    /// Oldest turn a rollback may return to, as maintained by the game loop.
    earliest_checkpoint_turn: Option<u32>,
    event_log: Vec<EventRecord>,
    game_log: Vec<String>,
    priority_grants: Vec<PlayerId>,
}

impl<D: DecisionMaker> Session<D> {
    pub fn new(config: &MatchConfig, decision_maker: D) -> Self {
        Self {
            state: GameState::new(
                config.players.clone(),
                config.library_size,
                config.max_hand_size,
            ),
            bus: EventBus::new(),
            options: config.options.clone(),
            decision_maker,
            paused: false,
            rollback_to: None,
            simulation: false,
            earliest_checkpoint_turn: None,
            event_log: Vec::new(),
            game_log: Vec::new(),
            priority_grants: Vec::new(),
        }
    }

    /// A session with default options for the named players.
    pub fn for_players(players: &[&str], decision_maker: D) -> Self {
        Self::new(&MatchConfig::with_players(players), decision_maker)
    }

    /// A simulation copy of this session driven by another decision maker.
    /// Logs start empty so the copy's record covers only what it plays.
    pub fn fork<E: DecisionMaker>(&self, decision_maker: E) -> Session<E> {
        Session {
            state: self.state.clone(),
            bus: self.bus.clone(),
            options: self.options.clone(),
            decision_maker,
            paused: false,
            rollback_to: None,
            simulation: true,
            earliest_checkpoint_turn: self.earliest_checkpoint_turn,
            event_log: Vec::new(),
            game_log: Vec::new(),
            priority_grants: Vec::new(),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn decision_maker(&self) -> &D {
        &self.decision_maker
    }

    pub fn decision_maker_mut(&mut self) -> &mut D {
        &mut self.decision_maker
    }

    pub fn options_mut(&mut self) -> &mut GameOptions {
        &mut self.options
    }

    pub fn add_listener(&mut self, listener: Box<dyn EventListener>) {
        self.bus.register(listener);
    }

    pub fn set_simulation(&mut self, simulation: bool) {
        self.simulation = simulation;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn event_log(&self) -> &[EventRecord] {
        &self.event_log
    }

    /// Kinds of the fired events, in order.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        self.event_log
            .iter()
            .filter(|record| record.dispatch == Dispatch::Fire)
            .map(|record| record.event.kind)
            .collect()
    }

    pub fn game_log(&self) -> &[String] {
        &self.game_log
    }

    pub fn priority_grants(&self) -> &[PlayerId] {
        &self.priority_grants
    }

    pub fn rollback_target(&self) -> Option<u32> {
        self.rollback_to
    }

    pub(crate) fn set_earliest_checkpoint_turn(&mut self, turn: Option<u32>) {
        self.earliest_checkpoint_turn = turn;
    }

    pub(crate) fn record_lengths(&self) -> RecordLengths {
        RecordLengths {
            events: self.event_log.len(),
            priority_grants: self.priority_grants.len(),
        }
    }

    /// Replaces the live state with a checkpoint and clears the rollback
    /// request. Events and priority grants recorded after the checkpoint are
    /// dropped.
    pub(crate) fn restore(&mut self, state: GameState, bus: EventBus, record: RecordLengths) {
        self.state = state;
        self.bus = bus;
        self.event_log.truncate(record.events);
        self.priority_grants.truncate(record.priority_grants);
        self.rollback_to = None;
        self.paused = false;
    }

    fn player_name(&self, player: PlayerId) -> String {
        self.state
            .player(player)
            .map_or_else(|| player.to_string(), |p| p.name.clone())
    }

    fn record(&mut self, event: &GameEvent, dispatch: Dispatch) {
        self.event_log.push(EventRecord {
            event: *event,
            dispatch,
        });
    }

    /// Rule 704.5b: a player who drew from an empty library loses. Returns
    /// true if anything changed.
    fn check_state_based_actions(&mut self) -> bool {
        let losers: Vec<PlayerId> = self
            .state
            .players
            .iter()
            .filter(|p| p.in_game && p.drew_from_empty_library)
            .map(|p| p.id)
            .collect();
        for &player in &losers {
            let message = format!(
                "{} loses the game (drew from an empty library)",
                self.player_name(player)
            );
            self.inform_players(&message);
            self.state.remove_player(player);
        }
        !losers.is_empty()
    }

    /// Rule 117.5: waiting triggered abilities go on the stack before a
    /// player receives priority. Returns true if any did.
    fn put_triggers_on_stack(&mut self) -> bool {
        let pending = self.state.pending_triggers.take_all();
        let any = !pending.is_empty();
        for trigger in pending {
            let id = self.state.allocate_object_id();
            let mut entry = StackEntry::new(id, trigger.controller, trigger.effect);
            entry.source = Some(trigger.source);
            self.state.push_to_stack(entry);
            let event = GameEvent::new(
                EventKind::StackEntryAdded,
                Some(trigger.source),
                Some(id),
                Some(trigger.controller),
            );
            self.fire_event(&event);
        }
        any
    }

    fn rollback_target_for(&self, turns: u32) -> Option<u32> {
        if !self.options.rollback_allowed {
            return None;
        }
        let target = self.state.turn.turn_number.checked_sub(turns)?;
        let earliest = self.earliest_checkpoint_turn?;
        (target >= earliest && target >= 1).then_some(target)
    }

    fn draw(&mut self, player: PlayerId) {
        let Some(state) = self.state.player_mut(player) else {
            return;
        };
        if state.library == 0 {
            state.drew_from_empty_library = true;
        } else {
            state.library -= 1;
            state.hand += 1;
        }
    }

    fn declare_attackers(&mut self, active: PlayerId) {
        let candidates = self.state.objects_controlled_by(active);
        if candidates.is_empty() {
            return;
        }
        let chosen = self
            .decision_maker
            .decide_attackers(&self.state, active, &candidates);
        let attackers: Vec<ObjectId> = chosen
            .into_iter()
            .filter(|id| candidates.contains(id))
            .collect();
        self.state.attackers = attackers.clone();
        for attacker in attackers {
            let event =
                GameEvent::new(EventKind::AttackerDeclared, Some(attacker), None, Some(active));
            self.fire_event(&event);
        }
    }

    /// Rule 514.1: the active player discards down to maximum hand size.
    fn cleanup(&mut self, active: PlayerId) {
        let Some(player) = self.state.player_mut(active) else {
            return;
        };
        let excess = player.hand.saturating_sub(player.max_hand_size);
        player.hand -= excess;
        if excess > 0 {
            let message = format!("{} discards {} card(s)", self.player_name(active), excess);
            self.inform_players(&message);
        }
    }

    pub fn apply_effect(&mut self, controller: PlayerId, effect: TurnEffect) {
        if !self.simulation {
            trace!(player = %controller, effect = %effect.display(), "resolving");
        }
        match effect {
            TurnEffect::Nothing => {}
            TurnEffect::SkipStep { player, step } => {
                self.state.turn_mods.add_skip_step(player, step);
            }
            TurnEffect::ExtraStep { player, after, step } => {
                self.state.turn_mods.add_extra_step(player, after, step);
            }
            TurnEffect::SkipPhase { player, phase } => {
                self.state.turn_mods.add_skip_phase(player, phase);
            }
            TurnEffect::ExtraPhase {
                player,
                after,
                phase,
            } => {
                self.state.turn_mods.add_extra_phase(player, after, phase);
            }
            TurnEffect::ExtraTurn { player } => self.state.extra_turns.push(player),
            TurnEffect::SkipNextTurn { player } => {
                self.state.skip_next_turn.insert(player);
            }
            TurnEffect::EndTurn => {
                // Rule 723.1b: everything on the stack is exiled.
                self.state.stack.clear();
                self.state.pending_triggers.take_all();
                self.state.turn_mods.request_end_turn();
            }
            TurnEffect::AddMana { player, amount } => {
                if let Some(player) = self.state.player_mut(player) {
                    player.mana_pool += amount;
                }
            }
            TurnEffect::CreateObject { id, controller } => {
                self.state.create_object(id, controller);
            }
            TurnEffect::RemoveObject { id } => {
                self.state.remove_object(id);
                self.bus.remove_missing_sources(&self.state);
            }
            TurnEffect::CreateTrigger {
                source,
                controller,
                on,
                effect,
                controller_turn_only,
                once,
            } => {
                self.state
                    .triggers
                    .add(source, controller, on, *effect, controller_turn_only, once);
            }
            TurnEffect::CreateSkipReplacement {
                source,
                player,
                kind,
                uses,
            } => {
                self.bus.register(Box::new(SkipEventReplacement::new(
                    Some(source),
                    player,
                    kind,
                    uses,
                )));
            }
        }
    }
}

impl<D: DecisionMaker> Game for Session<D> {
    fn state(&self) -> &GameState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    fn options(&self) -> &GameOptions {
        &self.options
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        if !self.paused && !self.simulation {
            debug!(
                turn = self.state.turn.turn_number,
                "paused during {}",
                self.state.current_phase_description()
            );
        }
        self.paused = true;
    }

    fn end(&mut self) {
        if self.state.result.is_none() {
            self.state.result = Some(GameResult::Ended);
        }
    }

    fn executing_rollback(&self) -> bool {
        self.rollback_to.is_some()
    }

    fn is_simulation(&self) -> bool {
        self.simulation
    }

    fn replace_event(&mut self, event: &GameEvent) -> bool {
        let replaced = self.bus.replace_event(event, &mut self.state);
        self.record(event, Dispatch::Replace { replaced });
        if replaced && !self.simulation {
            debug!(event = %event.display(), "replaced");
        }
        replaced
    }

    fn fire_event(&mut self, event: &GameEvent) {
        self.record(event, Dispatch::Fire);
        if !self.simulation {
            trace!(event = %event.display(), "fired");
        }
        self.bus.fire_event(event, &mut self.state);
        let active = self.state.turn.active_player;
        for entry in self.state.triggers.check(event, active) {
            self.state.pending_triggers.add(entry);
        }
    }

    fn grant_priority(&mut self, player: PlayerId) -> PriorityOutcome {
        if self.check_state_based_actions() {
            if self.state.is_game_over() {
                return PriorityOutcome::Interrupted;
            }
            self.state.priority.reset();
            // A player who just lost never decides; the round moves on past them.
            if !self.state.is_in_game(player) {
                return PriorityOutcome::Acted;
            }
        }
        if self.put_triggers_on_stack() {
            self.state.priority.reset();
        }

        self.priority_grants.push(player);
        let decision = self.decision_maker.decide_priority(&self.state, player);
        match decision {
            PriorityDecision::Pass => PriorityOutcome::Passed,
            PriorityDecision::Act(effect) => {
                let id = self.state.allocate_object_id();
                if !self.simulation {
                    debug!(player = %player, effect = %effect.display(), "casts");
                }
                self.state.push_to_stack(StackEntry::new(id, player, effect));
                let event =
                    GameEvent::new(EventKind::StackEntryAdded, None, Some(id), Some(player));
                self.fire_event(&event);
                PriorityOutcome::Acted
            }
            PriorityDecision::Pause if self.simulation => {
                self.decision_maker.on_auto_pass(&self.state, player);
                PriorityOutcome::Passed
            }
            PriorityDecision::Pause => {
                let message = format!("{} paused the game", self.player_name(player));
                self.inform_players(&message);
                self.pause();
                PriorityOutcome::Interrupted
            }
            PriorityDecision::Rollback { turns } => match self.rollback_target_for(turns) {
                Some(target) => {
                    let message = format!(
                        "{} rolls the game back to the start of turn {}",
                        self.player_name(player),
                        target
                    );
                    self.inform_players(&message);
                    self.rollback_to = Some(target);
                    PriorityOutcome::Interrupted
                }
                None => {
                    let reason = format!("no checkpoint {} turn(s) back", turns);
                    self.decision_maker.on_action_cancelled(&self.state, &reason);
                    PriorityOutcome::Passed
                }
            },
            PriorityDecision::Concede => {
                let message = format!("{} concedes", self.player_name(player));
                self.inform_players(&message);
                self.state.remove_player(player);
                if self.state.is_game_over() {
                    PriorityOutcome::Interrupted
                } else {
                    PriorityOutcome::Acted
                }
            }
        }
    }

    fn resolve_stack(&mut self) -> bool {
        let Some(entry) = self.state.stack.pop() else {
            return false;
        };
        let event = GameEvent::new(
            EventKind::StackEntryResolved,
            entry.source,
            Some(entry.id),
            Some(entry.controller),
        );
        self.apply_effect(entry.controller, entry.effect);
        self.fire_event(&event);
        true
    }

    fn turn_based_action(&mut self, step: StepKind, active: PlayerId) {
        match step {
            StepKind::Draw => self.draw(active),
            StepKind::DeclareAttackers => self.declare_attackers(active),
            StepKind::EndCombat => self.state.attackers.clear(),
            StepKind::Cleanup => self.cleanup(active),
            _ => {}
        }
    }

    /// Rule 508.8: without attackers the blockers and damage steps are skipped.
    fn skips_step_by_rule(&self, step: StepKind, _active: PlayerId) -> bool {
        matches!(step, StepKind::DeclareBlockers | StepKind::CombatDamage)
            && self.state.attackers.is_empty()
    }

    fn inform_players(&mut self, message: &str) {
        if self.simulation {
            return;
        }
        info!("{}", message);
        self.game_log.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecisionMaker;
    use crate::game_state::PhaseKind;

    fn alice() -> PlayerId {
        PlayerId::from_index(0)
    }

    fn bob() -> PlayerId {
        PlayerId::from_index(1)
    }

    fn test_game(decisions: Vec<PriorityDecision>) -> Session<ScriptedDecisionMaker> {
        let mut session =
            Session::for_players(&["Alice", "Bob"], ScriptedDecisionMaker::new(decisions));
        session.state_mut().begin_turn(alice());
        session
    }

    #[test]
    fn test_act_puts_entry_on_stack_and_resolves() {
        let mut game = test_game(vec![PriorityDecision::Act(TurnEffect::AddMana {
            player: alice(),
            amount: 2,
        })]);

        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Acted);
        assert_eq!(game.state().stack.len(), 1);
        assert!(game.resolve_stack());
        assert_eq!(game.state().player(alice()).map(|p| p.mana_pool), Some(2));
        assert!(!game.resolve_stack());
        assert_eq!(
            game.event_kinds(),
            vec![EventKind::StackEntryAdded, EventKind::StackEntryResolved]
        );
    }

    #[test]
    fn test_drawing_from_empty_library_loses_at_next_priority() {
        let mut game = test_game(vec![]);
        if let Some(player) = game.state_mut().player_mut(alice()) {
            player.library = 0;
        }
        game.turn_based_action(StepKind::Draw, alice());
        assert!(!game.game_over());

        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Interrupted);
        assert_eq!(game.state().result, Some(GameResult::Winner(bob())));
        assert_eq!(game.game_log().len(), 1);
    }

    #[test]
    fn test_draw_moves_a_card_to_hand() {
        let mut game = test_game(vec![]);
        game.turn_based_action(StepKind::Draw, alice());
        let alice_state = game.state().player(alice()).cloned();
        assert_eq!(alice_state.as_ref().map(|p| p.hand), Some(1));
        assert_eq!(alice_state.map(|p| p.library), Some(39));
    }

    fn three_player_game() -> Session<ScriptedDecisionMaker> {
        let mut session = Session::for_players(
            &["Alice", "Bob", "Cid"],
            ScriptedDecisionMaker::new([PriorityDecision::Pass]),
        );
        session.state_mut().begin_turn(alice());
        session
    }

    #[test]
    fn test_holder_still_decides_after_another_player_loses() {
        let mut game = three_player_game();
        if let Some(player) = game.state_mut().player_mut(bob()) {
            player.drew_from_empty_library = true;
        }

        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Passed);
        assert!(!game.state().is_in_game(bob()));
        assert_eq!(game.priority_grants(), [alice()]);
        assert_eq!(game.decision_maker().remaining(), 0);
    }

    #[test]
    fn test_holder_who_loses_is_passed_over() {
        let mut game = three_player_game();
        if let Some(player) = game.state_mut().player_mut(alice()) {
            player.drew_from_empty_library = true;
        }

        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Acted);
        assert!(game.priority_grants().is_empty());
        assert_eq!(game.decision_maker().remaining(), 1);
        assert_eq!(game.state().next_player_in_game(alice()), Some(bob()));
    }

    #[test]
    fn test_concede_ends_two_player_game() {
        let mut game = test_game(vec![PriorityDecision::Concede]);
        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Interrupted);
        assert_eq!(game.state().result, Some(GameResult::Winner(bob())));
    }

    #[test]
    fn test_pause_is_a_pass_in_simulation() {
        let mut game = test_game(vec![PriorityDecision::Pause]);
        game.set_simulation(true);
        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Passed);
        assert!(!game.is_paused());
        assert!(game.game_log().is_empty());
    }

    #[test]
    fn test_rollback_without_checkpoint_is_cancelled() {
        let mut game = test_game(vec![PriorityDecision::Rollback { turns: 1 }]);
        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Passed);
        assert!(!game.executing_rollback());
        assert_eq!(game.decision_maker().cancelled().len(), 1);
    }

    #[test]
    fn test_rollback_within_window_is_requested() {
        let mut game = test_game(vec![PriorityDecision::Rollback { turns: 0 }]);
        game.set_earliest_checkpoint_turn(Some(1));
        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Interrupted);
        assert_eq!(game.rollback_target(), Some(1));
        assert!(game.is_interrupted());
    }

    #[test]
    fn test_trigger_goes_on_stack_before_priority() {
        let source = ObjectId::from_raw(7);
        let mut game = test_game(vec![]);
        game.state_mut().create_object(source, alice());
        game.apply_effect(
            alice(),
            TurnEffect::CreateTrigger {
                source,
                controller: alice(),
                on: EventKind::StepPre(StepKind::Upkeep),
                effect: Box::new(TurnEffect::AddMana {
                    player: alice(),
                    amount: 1,
                }),
                controller_turn_only: true,
                once: false,
            },
        );

        game.fire_event(&GameEvent::for_player(
            EventKind::StepPre(StepKind::Upkeep),
            alice(),
        ));
        assert!(!game.state().pending_triggers.is_empty());

        assert_eq!(game.grant_priority(alice()), PriorityOutcome::Passed);
        assert_eq!(game.state().stack.len(), 1);
        assert_eq!(game.state().stack[0].source, Some(source));
    }

    #[test]
    fn test_cleanup_discards_to_hand_size() {
        let mut game = test_game(vec![]);
        if let Some(player) = game.state_mut().player_mut(alice()) {
            player.hand = 10;
        }
        game.turn_based_action(StepKind::Cleanup, alice());
        assert_eq!(game.state().player(alice()).map(|p| p.hand), Some(7));
        assert_eq!(game.game_log(), ["Alice discards 3 card(s)".to_string()]);
    }

    #[test]
    fn test_blockers_and_damage_skipped_without_attackers() {
        let mut game = test_game(vec![]);
        assert!(game.skips_step_by_rule(StepKind::DeclareBlockers, alice()));
        assert!(game.skips_step_by_rule(StepKind::CombatDamage, alice()));
        assert!(!game.skips_step_by_rule(StepKind::DeclareAttackers, alice()));

        game.state_mut().attackers.push(ObjectId::from_raw(1));
        assert!(!game.skips_step_by_rule(StepKind::CombatDamage, alice()));
    }

    #[test]
    fn test_skip_replacement_effect_vetoes_begin_event() {
        let source = ObjectId::from_raw(3);
        let mut game = test_game(vec![]);
        game.state_mut().create_object(source, bob());
        game.apply_effect(
            bob(),
            TurnEffect::CreateSkipReplacement {
                source,
                player: alice(),
                kind: EventKind::Phase(PhaseKind::Combat),
                uses: Some(1),
            },
        );
        let combat = GameEvent::for_player(EventKind::Phase(PhaseKind::Combat), alice());
        assert!(game.replace_event(&combat));
        assert!(!game.replace_event(&combat));

        // Removing the source removes any effect it still had.
        game.apply_effect(
            bob(),
            TurnEffect::CreateSkipReplacement {
                source,
                player: alice(),
                kind: EventKind::Phase(PhaseKind::Combat),
                uses: None,
            },
        );
        game.apply_effect(bob(), TurnEffect::RemoveObject { id: source });
        assert!(game.bus().is_empty());
    }

    #[test]
    fn test_end_turn_clears_the_stack() {
        let mut game = test_game(vec![]);
        game.state_mut().push_to_stack(StackEntry::new(
            ObjectId::from_raw(9),
            bob(),
            TurnEffect::Nothing,
        ));
        game.apply_effect(alice(), TurnEffect::EndTurn);
        assert!(game.state().stack_is_empty());
        assert!(game.state().turn_mods.end_turn_requested());
    }
}
