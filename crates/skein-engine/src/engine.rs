//! The scene navigator.
//!
//! [`StoryEngine`] owns one playthrough: the game state, the random
//! generator, and the choice cache. Transitions recurse synchronously — a
//! go-to fired by scene A's arrival runs scene B's arrival within the same
//! call — and every call either completes or returns a fatal error, after
//! which the engine must be given a fresh game or a saved state.

use std::fmt::Display;
use std::sync::Arc;

use crate::check;
use crate::choice::{self, Choice};
use crate::content::{self, ContentNode, Resolver};
use crate::definition::{GameDefinition, GoTo, Scene};
use crate::error::{EngineError, EngineResult};
use crate::quality::{QualityAccess, QualityValue};
use crate::rng::{SeedSequence, StoryRng};
use crate::script::Action;
use crate::state::GameState;
use crate::ui::{Presenter, SignalEvent, SignalPayload};

/// Symbolic scene targets resolved to a concrete id at transition time.
pub mod pseudo {
    /// The previously occupied scene.
    pub const PREV_SCENE: &str = "prevScene";
    /// The scene occupied before the last top-level scene change.
    pub const PREV_TOP_SCENE: &str = "prevTopScene";
    /// The recorded jump target.
    pub const JUMP_SCENE: &str = "jumpScene";
    /// Leave a special scene, restoring the page it interrupted and
    /// clearing the back pointer.
    pub const BACK_SPECIAL_SCENE: &str = "backSpecialScene";
}

/// The narrative engine driving one playthrough of a game definition.
pub struct StoryEngine<P: Presenter> {
    game: Arc<GameDefinition>,
    ui: P,
    state: GameState,
    rng: StoryRng,
    choice_cache: Option<Vec<Choice>>,
    transcript: Vec<String>,
    seeds: SeedSequence,
}

impl<P: Presenter> StoryEngine<P> {
    /// Create an engine over a validated game definition.
    ///
    /// The definition is shared and read-only; the engine exclusively owns
    /// its game state.
    pub fn new(game: Arc<GameDefinition>, ui: P) -> EngineResult<Self> {
        game.validate()?;
        let state = GameState::new(game.root_scene_id());
        let seeds = SeedSequence::new();
        let rng = seeds.next_unique();
        Ok(Self {
            game,
            ui,
            state,
            rng,
            choice_cache: None,
            transcript: Vec::new(),
            seeds,
        })
    }

    /// The shared game definition.
    pub fn game(&self) -> &GameDefinition {
        &self.game
    }

    /// The current game state (this is the save file; clone it to keep it).
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The presenter.
    pub fn ui(&self) -> &P {
        &self.ui
    }

    /// The presenter, mutably.
    pub fn ui_mut(&mut self) -> &mut P {
        &mut self.ui
    }

    /// Whether the game has reached its terminal state.
    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// The scene the player currently occupies.
    pub fn current_scene(&self) -> EngineResult<&Scene> {
        let id = self
            .state
            .scene_id
            .as_deref()
            .ok_or(EngineError::NoCurrentScene)?;
        self.game.scene(id)
    }

    /// The active choice menu, if the engine has settled on one.
    pub fn current_choices(&self) -> Option<&[Choice]> {
        self.choice_cache.as_deref()
    }

    /// The accumulated transcript (empty unless enabled on the state).
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Turn transcript accumulation on or off.
    pub fn set_transcript_enabled(&mut self, enabled: bool) {
        self.state.enable_transcript = enabled;
    }

    /// Start a new game with a unique random stream.
    pub fn begin_game(&mut self) -> EngineResult<()> {
        let rng = self.seeds.next_unique();
        self.begin(rng)
    }

    /// Start a new game with a seeded, reproducible random stream.
    pub fn begin_game_with_seeds<S: Display>(&mut self, seeds: &[S]) -> EngineResult<()> {
        self.begin(StoryRng::from_seeds(seeds))
    }

    fn begin(&mut self, rng: StoryRng) -> EngineResult<()> {
        self.rng = rng;
        let transcript_enabled = self.state.enable_transcript;
        self.state = GameState::new(self.game.root_scene_id());
        self.state.enable_transcript = transcript_enabled;
        self.choice_cache = None;
        self.transcript.clear();
        self.seed_qualities();
        self.ui.begin_game();
        let opening = self.game.opening_scene_id();
        self.go_to_scene(&opening)
    }

    /// Navigate to a scene (or pseudo-target) as an explicit move.
    pub fn go_to_scene(&mut self, id: &str) -> EngineResult<()> {
        if self.state.game_over {
            return Err(EngineError::GameIsOver);
        }
        self.state.scene_ids_since_goto.clear();
        self.ui.begin_output();
        let result = self.change_scene(id);
        self.ui.end_output();
        result
    }

    /// Commit a choice from the active menu by index.
    ///
    /// Rejects out-of-range and unavailable indices without touching game
    /// state; a committed choice invalidates the menu and navigates.
    pub fn choose(&mut self, index: usize) -> EngineResult<()> {
        if self.state.game_over {
            return Err(EngineError::GameIsOver);
        }
        let (id, title) = {
            let choices = self
                .choice_cache
                .as_ref()
                .ok_or(EngineError::NoChoicesActive)?;
            let choice = choices.get(index).ok_or(EngineError::ChoiceOutOfRange {
                index,
                available: choices.len(),
            })?;
            if !choice.can_choose {
                return Err(EngineError::ChoiceUnavailable(index));
            }
            (choice.id.clone(), content::to_plain_text(&choice.title))
        };
        if self.state.enable_transcript {
            self.transcript.push(format!("> {title}"));
        }
        self.choice_cache = None;
        self.go_to_scene(&id)
    }

    /// Replace the game state from a saved snapshot and redisplay.
    ///
    /// Resumes the random stream from the snapshot, so subsequent behavior
    /// matches what the saved playthrough would have done.
    pub fn set_state(&mut self, state: GameState) -> EngineResult<()> {
        let rng_state = state
            .current_random_state
            .ok_or(EngineError::MissingRandomState)?;
        self.state = state;
        self.choice_cache = None;
        self.rng = StoryRng::from_state(rng_state);
        self.seed_qualities();

        if self.state.game_over {
            self.ui.display_game_over();
            return Ok(());
        }

        let game = Arc::clone(&self.game);
        let scene_id = self
            .state
            .scene_id
            .clone()
            .ok_or(EngineError::NoCurrentScene)?;
        let scene = game.scene(&scene_id)?;
        self.ui.new_page();
        self.ui.remove_choices();
        self.ui.display_content(&self.state.current_content, None);
        self.settle_on_choices(scene)?;
        self.ui.set_sprites(&self.state.sprites);
        self.ui.set_bg(self.state.bg.as_deref());
        Ok(())
    }

    /// The exportable state: plain serializable data, no callables.
    pub fn exportable_state(&self) -> &GameState {
        &self.state
    }

    /// Assign a quality through the full set protocol, emitting any change
    /// signal to the presenter.
    pub fn set_quality(&mut self, id: &str, value: impl Into<QualityValue>) {
        let game = Arc::clone(&self.game);
        let mut signals = Vec::new();
        QualityAccess::new(game.as_ref(), &mut self.state, &mut signals).set(id, value);
        self.emit_signals(signals);
    }

    /// Award an achievement.
    ///
    /// Sets the `achievement_*` and `game_achievement_*` quasi-qualities
    /// directly; these are not declared qualities and bypass validation.
    pub fn achieve(&mut self, name: &str) {
        self.state.achievements.insert(name.to_string());
        self.state
            .qualities
            .insert_raw(format!("achievement_{name}"), 1.0);
        self.state
            .qualities
            .insert_raw(format!("game_achievement_{name}"), 1.0);
    }

    // ------------------------------------------------------------------
    // Transition internals

    /// The recursive transition step.
    fn change_scene(&mut self, target: &str) -> EngineResult<()> {
        let just_returned = std::mem::take(&mut self.state.just_returned);
        let mut restore_page = false;
        let id = match target {
            pseudo::PREV_SCENE => self
                .state
                .prev_scene_id
                .clone()
                .ok_or(EngineError::UnresolvedTarget(pseudo::PREV_SCENE))?,
            pseudo::PREV_TOP_SCENE => self
                .state
                .prev_top_scene_id
                .clone()
                .ok_or(EngineError::UnresolvedTarget(pseudo::PREV_TOP_SCENE))?,
            pseudo::JUMP_SCENE => self
                .state
                .jump_scene_id
                .clone()
                .ok_or(EngineError::UnresolvedTarget(pseudo::JUMP_SCENE))?,
            pseudo::BACK_SPECIAL_SCENE => {
                restore_page = true;
                self.state
                    .prev_special_scene_id
                    .take()
                    .ok_or(EngineError::UnresolvedTarget(pseudo::BACK_SPECIAL_SCENE))?
            }
            concrete => concrete.to_string(),
        };
        let game = Arc::clone(&self.game);
        let scene = game.scene(&id)?;

        // Departure.
        let from_id = self.state.scene_id.clone();
        if let Some(from_id) = &from_id {
            self.state.prev_scene_id = Some(from_id.clone());
            if scene.is_top {
                self.state.prev_top_scene_id = Some(from_id.clone());
            }
            if scene.is_special && self.state.prev_special_scene_id.is_none() {
                self.state.temp_current_content = self.state.current_content.clone();
                self.state.prev_special_scene_id = Some(from_id.clone());
            }
            let from_scene = game.scene(from_id)?;
            self.run_actions(&from_scene.on_departure);
            if let Some(signal) = from_scene
                .signal
                .clone()
                .or_else(|| game.scene_signal.clone())
            {
                let payload = SignalPayload::new(signal, SignalEvent::SceneDeparture, from_id)
                    .with_to(&id);
                self.ui.signal(&payload);
            }
        }

        // Arrival.
        self.state.scene_id = Some(id.clone());
        self.state.scene_ids_since_goto.push(id.clone());
        if scene.set_root {
            self.state.root_scene_id = id.clone();
        }
        if let Some(jump) = &scene.set_jump {
            self.state.jump_scene_id = Some(jump.clone());
        }
        if let Some(cap) = scene.count_visits_max {
            let visits = self.state.visits.entry(id.clone()).or_insert(0);
            if *visits < cap {
                *visits += 1;
            }
        }

        // Returning to a special scene's interrupter, or returning from a
        // subroutine jump, must not re-run arrival actions.
        if !restore_page && !just_returned {
            self.run_actions(&scene.on_arrival);
            if let Some(call_id) = &scene.call {
                let call_scene = game.scene(call_id)?;
                self.run_actions(&call_scene.on_arrival);
            }
        }
        if let Some(signal) = scene.signal.clone().or_else(|| game.scene_signal.clone()) {
            let mut payload = SignalPayload::new(signal, SignalEvent::SceneArrival, &id);
            if let Some(from_id) = &from_id {
                payload = payload.with_from(from_id);
            }
            self.ui.signal(&payload);
        }

        // All randomness this arrival consumes has been consumed (go-to and
        // check selection below recurse back through here), so this is the
        // exact point a restored save resumes from.
        self.state.current_random_state = Some(self.rng.state());

        self.display_scene_content(scene, restore_page)?;

        if let Some(bg) = &scene.set_bg {
            self.state.bg = Some(bg.clone());
            self.ui.set_bg(Some(bg));
        }
        if let Some(sprites) = &scene.set_sprites {
            self.state.sprites = sprites.clone();
            self.ui.set_sprites(sprites);
        }
        if let Some(audio) = &scene.audio {
            self.ui.audio(audio);
        }
        for (location, style) in &scene.sprite_styles {
            self.ui.set_sprite_style(location, style);
        }
        if let Some(achievement) = &scene.achievement {
            self.achieve(achievement);
        }

        // Outgoing decision: game over, go-to, go-to-ref, check, choices —
        // first applicable wins, each terminal for this step.
        if scene.game_over == Some(true) {
            self.end_game();
            return Ok(());
        }
        if let Some(next) = self.select_exit(&scene.go_to) {
            return self.change_scene(&next);
        }
        if let Some(reference) = self.select_exit(&scene.go_to_ref) {
            let next = self
                .state
                .qualities
                .get(&reference)
                .map(QualityValue::to_text)
                .ok_or(EngineError::UnsetReferenceQuality(reference))?;
            return self.change_scene(&next);
        }
        if let Some(scene_check) = &scene.check {
            let probability = scene_check
                .success_probability(self.state.qualities.number(&scene_check.quality));
            let next = if check::roll_success(probability, &mut self.rng) {
                scene_check.on_success.clone()
            } else {
                scene_check.on_failure.clone()
            };
            return self.change_scene(&next);
        }
        self.settle_on_choices(scene)
    }

    /// Filter an exit list by its predicates and pick one survivor,
    /// uniformly at random when several remain.
    fn select_exit(&mut self, exits: &[GoTo]) -> Option<String> {
        let survivors: Vec<&String> = exits
            .iter()
            .filter(|exit| {
                exit.predicate
                    .as_ref()
                    .is_none_or(|p| p.run(&self.state, &self.state.qualities, false))
            })
            .map(|exit| &exit.target)
            .collect();
        match survivors.len() {
            0 => None,
            1 => Some(survivors[0].clone()),
            n => {
                let index = (self.rng.uint32() as usize) % n;
                Some(survivors[index].clone())
            }
        }
    }

    /// Compile and display the scene's choices, or end the game when none
    /// are choosable (unless the scene suppresses that).
    fn settle_on_choices(&mut self, scene: &Scene) -> EngineResult<()> {
        let compiled =
            choice::compile_choices(self.game.as_ref(), &self.state, &mut self.rng, scene)?;
        match compiled {
            None => {
                // An explicit `game_over: false` keeps the player parked
                // here instead of ending the game.
                if scene.game_over != Some(false) {
                    self.end_game();
                }
                Ok(())
            }
            Some(choices) => {
                self.choice_cache = Some(choices);
                self.display_choices()
            }
        }
    }

    /// Display the active menu: a plain choice list, or decks, hand, and
    /// pinned cards for hand scenes.
    pub(crate) fn display_choices(&mut self) -> EngineResult<()> {
        let game = Arc::clone(&self.game);
        let scene_id = self
            .state
            .scene_id
            .clone()
            .ok_or(EngineError::NoCurrentScene)?;
        let scene = game.scene(&scene_id)?;
        let mut choices = self
            .choice_cache
            .take()
            .ok_or(EngineError::NoChoicesActive)?;

        if scene.is_hand {
            let mut decks = Vec::new();
            let mut pinned = Vec::new();
            for choice in &mut choices {
                let target = game.scene(&choice.id)?;
                if target.is_deck {
                    // Probing consumes the same randomness a real draw
                    // would, which keeps replay from a save aligned.
                    let available = self.draw_from_deck(&choice.id)?.is_some();
                    choice.is_deck = true;
                    choice.image = target.card_image.clone();
                    choice.can_choose = available;
                    if !available {
                        let resolver = Resolver {
                            game: game.as_ref(),
                            state: &self.state,
                        };
                        choice.subtitle = Some(match &target.unavailable_subtitle {
                            Some(block) => resolver.resolve(block, false)?,
                            None => {
                                vec![ContentNode::Text("No cards available from deck.".into())]
                            }
                        });
                    }
                    decks.push(choice.clone());
                } else if target.is_pinned_card {
                    choice.image = target.card_image.clone();
                    pinned.push(choice.clone());
                }
            }
            self.choice_cache = Some(choices);

            // Hand membership is revalidated every display; cards that
            // stopped being viewable are pruned.
            let hand = self
                .state
                .current_hands
                .get(&scene_id)
                .cloned()
                .unwrap_or_default();
            let mut retained = Vec::with_capacity(hand.len());
            for card in hand {
                if choice::is_viewable(game.as_ref(), &self.state, &card.id)? {
                    retained.push(card);
                }
            }
            self.state
                .current_hands
                .insert(scene_id.clone(), retained.clone());

            self.ui.display_decks(&decks);
            self.ui.display_hand(&retained, scene.max_cards);
            self.ui.display_pinned_cards(&pinned);
        } else {
            if self.state.enable_transcript {
                for choice in &choices {
                    self.transcript
                        .push(format!("* {}", content::to_plain_text(&choice.title)));
                }
            }
            self.ui.display_choices(&choices);
            self.choice_cache = Some(choices);
        }
        Ok(())
    }

    /// Render a scene's content and run its display actions.
    fn display_scene_content(&mut self, scene: &Scene, restore_page: bool) -> EngineResult<()> {
        if let Some(signal) = scene
            .signal
            .clone()
            .or_else(|| self.game.scene_signal.clone())
        {
            self.ui
                .signal(&SignalPayload::new(signal, SignalEvent::SceneDisplay, &scene.id));
        }
        let face = scene.face_image.as_deref();
        if restore_page {
            self.ui.new_page();
            self.ui
                .display_content(&self.state.temp_current_content, face);
            self.state.current_content = self.state.temp_current_content.clone();
        } else if scene.new_page {
            self.ui.new_page();
            self.state.current_content.clear();
        }
        self.ui.set_style(scene.style.as_deref());
        self.ui.remove_choices();

        if let Some(template) = &scene.content
            && !restore_page
        {
            let resolved = {
                let resolver = Resolver {
                    game: self.game.as_ref(),
                    state: &self.state,
                };
                resolver.resolve(template, true)?
            };
            if self.state.enable_transcript {
                self.transcript.push(content::to_plain_text(&resolved));
            }
            self.state.current_content.extend(resolved.iter().cloned());
            self.ui.display_content(&resolved, face);
        }
        self.run_actions(&scene.on_display);
        Ok(())
    }

    /// Run a batch of actions, forwarding any quality-change signals.
    fn run_actions(&mut self, actions: &[Action]) {
        if actions.is_empty() {
            return;
        }
        let game = Arc::clone(&self.game);
        let mut signals = Vec::new();
        {
            let mut access = QualityAccess::new(game.as_ref(), &mut self.state, &mut signals);
            for action in actions {
                action.run(&mut access);
            }
        }
        self.emit_signals(signals);
    }

    fn seed_qualities(&mut self) {
        let game = Arc::clone(&self.game);
        let mut signals = Vec::new();
        QualityAccess::new(game.as_ref(), &mut self.state, &mut signals).seed_initials();
        self.emit_signals(signals);
    }

    fn emit_signals(&mut self, signals: Vec<SignalPayload>) {
        for signal in &signals {
            self.ui.signal(signal);
        }
    }

    fn end_game(&mut self) {
        self.state.game_over = true;
        self.ui.display_game_over();
    }

    /// Clear the choice cache; used by card plays, which commit outside
    /// the numbered menu.
    pub(crate) fn invalidate_choices(&mut self) {
        self.choice_cache = None;
    }

    /// Mutable state access for the deck subsystem.
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Draw one uniformly random eligible card from a deck scene.
    ///
    /// Eligible cards are the deck's compiled, choosable choices whose
    /// target is a card not already in the current scene's hand. `None`
    /// means the deck has nothing left to offer.
    pub(crate) fn draw_from_deck(
        &mut self,
        deck_id: &str,
    ) -> EngineResult<Option<crate::deck::HandCard>> {
        let game = Arc::clone(&self.game);
        let deck_scene = game.scene(deck_id)?;
        let Some(compiled) =
            choice::compile_choices(game.as_ref(), &self.state, &mut self.rng, deck_scene)?
        else {
            return Ok(None);
        };

        let current_id = self
            .state
            .scene_id
            .clone()
            .ok_or(EngineError::NoCurrentScene)?;
        let hand = self
            .state
            .current_hands
            .get(&current_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut eligible = Vec::new();
        for choice in compiled {
            let target = game.scene(&choice.id)?;
            if choice.can_choose
                && target.is_card
                && !hand.iter().any(|card| card.id == choice.id)
            {
                eligible.push((choice, target.card_image.clone()));
            }
        }
        if eligible.is_empty() {
            return Ok(None);
        }
        let index = (self.rng.uint32() as usize) % eligible.len();
        let (choice, image) = eligible.swap_remove(index);
        Ok(Some(crate::deck::HandCard {
            id: choice.id,
            title: choice.title,
            image,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::SceneCheck;
    use crate::choice::SceneOption;
    use crate::script::Action;
    use crate::script::Predicate;
    use crate::ui::NullPresenter;

    /// Records what the engine asked to display.
    #[derive(Debug, Default)]
    struct RecordingUi {
        signals: Vec<SignalPayload>,
        content: Vec<String>,
        pages: usize,
        menus: usize,
        game_over: bool,
    }

    impl Presenter for RecordingUi {
        fn display_content(&mut self, content: &[ContentNode], _face_image: Option<&str>) {
            self.content.push(content::to_plain_text(content));
        }

        fn display_choices(&mut self, _choices: &[Choice]) {
            self.menus += 1;
        }

        fn display_game_over(&mut self) {
            self.game_over = true;
        }

        fn new_page(&mut self) {
            self.pages += 1;
        }

        fn signal(&mut self, payload: &SignalPayload) {
            self.signals.push(payload.clone());
        }
    }

    impl RecordingUi {
        fn arrivals(&self) -> Vec<&str> {
            self.signals
                .iter()
                .filter(|s| s.event == SignalEvent::SceneArrival)
                .map(|s| s.id.as_str())
                .collect()
        }
    }

    /// A hub with a capped shrine, a plain anteroom, and a special stats
    /// page.
    fn hub_game() -> GameDefinition {
        let mut game = GameDefinition::new("Hub");
        game.first_scene = Some("hub".into());
        game.scene_signal = Some("nav".into());

        game.add_scene(
            Scene::new("hub")
                .with_title("The Hub")
                .with_content("You are here.")
                .with_option(SceneOption::scene("shrine"))
                .with_option(SceneOption::scene("anteroom")),
        );
        let mut shrine = Scene::new("shrine")
            .with_title("The Shrine")
            .with_content("Candles gutter.")
            .with_option(SceneOption::scene("hub"));
        shrine.count_visits_max = Some(2);
        shrine.max_visits = Some(2);
        game.add_scene(shrine);
        game.add_scene(
            Scene::new("anteroom")
                .with_title("The Anteroom")
                .with_content("A quiet room.")
                .with_option(SceneOption::scene("hub")),
        );
        let mut stats = Scene::new("stats")
            .with_title("Standing")
            .with_content("Numbers and tallies.");
        stats.is_special = true;
        game.add_scene(stats);
        game
    }

    fn recording_engine(game: GameDefinition, seed: &str) -> StoryEngine<RecordingUi> {
        let mut engine = StoryEngine::new(Arc::new(game), RecordingUi::default()).unwrap();
        engine.begin_game_with_seeds(&[seed]).unwrap();
        engine
    }

    #[test]
    fn begin_settles_on_a_menu() {
        let engine = recording_engine(hub_game(), "begin");
        assert_eq!(engine.state().scene_id.as_deref(), Some("hub"));
        let choices = engine.current_choices().unwrap();
        let ids: Vec<&str> = choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["shrine", "anteroom"]);
        assert_eq!(engine.ui().menus, 1);
        assert_eq!(engine.ui().content, ["You are here."]);
    }

    #[test]
    fn arrival_departure_and_display_signals_in_order() {
        let mut engine = recording_engine(hub_game(), "signals");
        engine.choose(1).unwrap();
        let tail: Vec<(SignalEvent, &str)> = engine
            .ui()
            .signals
            .iter()
            .skip(2) // hub's own arrival and display
            .map(|s| (s.event, s.id.as_str()))
            .collect();
        assert_eq!(
            tail,
            [
                (SignalEvent::SceneDeparture, "hub"),
                (SignalEvent::SceneArrival, "anteroom"),
                (SignalEvent::SceneDisplay, "anteroom"),
            ]
        );
        let departure = &engine.ui().signals[2];
        assert_eq!(departure.to.as_deref(), Some("anteroom"));
        let arrival = &engine.ui().signals[3];
        assert_eq!(arrival.from.as_deref(), Some("hub"));
    }

    #[test]
    fn visit_cap_retires_a_choice() {
        let mut engine = recording_engine(hub_game(), "caps");
        engine.choose(0).unwrap(); // shrine, visit 1
        engine.choose(0).unwrap(); // back to hub
        engine.choose(0).unwrap(); // shrine, visit 2
        assert_eq!(engine.state().visit_count("shrine"), 2);
        engine.choose(0).unwrap(); // back to hub
        let ids: Vec<&str> = engine
            .current_choices()
            .unwrap()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, ["anteroom"]);
    }

    #[test]
    fn choose_rejects_bad_indices_without_state_changes() {
        let mut engine = recording_engine(hub_game(), "errors");
        let before = engine.state().clone();
        assert!(matches!(
            engine.choose(9),
            Err(EngineError::ChoiceOutOfRange {
                index: 9,
                available: 2
            })
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn choose_rejects_unavailable_choices() {
        let mut game = hub_game();
        if let Some(shrine) = game.scenes.get_mut("shrine") {
            shrine.choose_if = Some(Predicate::constant(false));
        }
        let mut engine = recording_engine(game, "unavailable");
        let before_scene = engine.state().scene_id.clone();
        assert!(matches!(
            engine.choose(0),
            Err(EngineError::ChoiceUnavailable(0))
        ));
        assert_eq!(engine.state().scene_id, before_scene);
        engine.choose(1).unwrap();
    }

    #[test]
    fn choose_without_a_menu_is_rejected() {
        let game = hub_game();
        let mut engine = StoryEngine::new(Arc::new(game), RecordingUi::default()).unwrap();
        assert!(matches!(
            engine.choose(0),
            Err(EngineError::NoChoicesActive)
        ));
    }

    #[test]
    fn special_scene_back_navigation_restores_the_page() {
        let mut game = hub_game();
        if let Some(hub) = game.scenes.get_mut("hub") {
            hub.on_arrival.push(Action::add_quality("hub_arrivals", 1.0));
        }
        let mut engine = recording_engine(game, "special");
        assert_eq!(engine.state().qualities.number("hub_arrivals"), 1.0);
        let page_before = engine.state().current_content.clone();

        engine.go_to_scene("stats").unwrap();
        assert_eq!(
            engine.state().prev_special_scene_id.as_deref(),
            Some("hub")
        );

        engine.go_to_scene(pseudo::BACK_SPECIAL_SCENE).unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("hub"));
        assert!(engine.state().prev_special_scene_id.is_none());
        assert_eq!(engine.state().current_content, page_before);
        // Arrival actions do not re-run on page restore.
        assert_eq!(engine.state().qualities.number("hub_arrivals"), 1.0);
    }

    #[test]
    fn prev_scene_pseudo_target_resolves() {
        let mut engine = recording_engine(hub_game(), "prev");
        engine.choose(1).unwrap(); // anteroom
        engine.go_to_scene(pseudo::PREV_SCENE).unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("hub"));
    }

    #[test]
    fn unresolved_pseudo_target_is_fatal() {
        let mut engine = recording_engine(hub_game(), "unresolved");
        assert!(matches!(
            engine.go_to_scene(pseudo::JUMP_SCENE),
            Err(EngineError::UnresolvedTarget(_))
        ));
    }

    #[test]
    fn set_jump_records_a_target_for_the_jump_pseudo_scene() {
        let mut game = hub_game();
        if let Some(anteroom) = game.scenes.get_mut("anteroom") {
            anteroom.set_jump = Some("shrine".into());
        }
        let mut engine = recording_engine(game, "jump");
        engine.choose(1).unwrap(); // anteroom records the jump target
        engine.go_to_scene(pseudo::JUMP_SCENE).unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("shrine"));
    }

    #[test]
    fn random_go_to_is_reproducible_across_runs() {
        fn coin_game() -> GameDefinition {
            let mut game = GameDefinition::new("Coin");
            game.first_scene = Some("flip".into());
            game.scene_signal = Some("nav".into());
            game.add_scene(
                Scene::new("flip")
                    .with_title("Flip")
                    .with_go_to(GoTo::when("heads", Predicate::constant(true)))
                    .with_go_to(GoTo::when("tails", Predicate::constant(true))),
            );
            for id in ["heads", "tails"] {
                game.add_scene(
                    Scene::new(id)
                        .with_title(format!("It lands {id}"))
                        .with_content(format!("The coin shows {id}."))
                        .with_option(SceneOption::scene("flip")),
                );
            }
            game
        }

        let mut runs = Vec::new();
        for _ in 0..2 {
            let mut engine = recording_engine(coin_game(), "two-up");
            for _ in 0..30 {
                engine.choose(0).unwrap();
            }
            let faces: Vec<String> = engine
                .ui()
                .arrivals()
                .iter()
                .filter(|id| **id != "flip")
                .map(|id| id.to_string())
                .collect();
            runs.push(faces);
        }
        assert_eq!(runs[0], runs[1]);
        assert!(runs[0].iter().any(|f| f == "heads"));
        assert!(runs[0].iter().any(|f| f == "tails"));
    }

    #[test]
    fn single_surviving_go_to_consumes_no_randomness() {
        let mut game = hub_game();
        game.add_scene(
            Scene::new("corridor")
                .with_title("Corridor")
                .with_go_to(GoTo::when("anteroom", Predicate::constant(true)))
                .with_go_to(GoTo::when("shrine", Predicate::constant(false))),
        );
        let mut engine = recording_engine(game, "corridor");
        let rng_before = engine.state().current_random_state;
        engine.go_to_scene("corridor").unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("anteroom"));
        // Only the settled scene's state capture happened; no selection
        // draw was spent on a single survivor.
        assert_eq!(engine.state().current_random_state, rng_before);
    }

    #[test]
    fn go_to_ref_follows_the_quality_value() {
        let mut game = hub_game();
        game.add_scene(
            Scene::new("portal")
                .with_title("Portal")
                .with_go_to_ref(GoTo::to("destination")),
        );
        let mut engine = recording_engine(game, "portal");
        engine.set_quality("destination", "anteroom");
        engine.go_to_scene("portal").unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("anteroom"));
    }

    #[test]
    fn go_to_ref_with_unset_quality_is_fatal() {
        let mut game = hub_game();
        game.add_scene(
            Scene::new("portal")
                .with_title("Portal")
                .with_go_to_ref(GoTo::to("nowhere_set")),
        );
        let mut engine = recording_engine(game, "portal2");
        assert!(matches!(
            engine.go_to_scene("portal"),
            Err(EngineError::UnsetReferenceQuality(q)) if q == "nowhere_set"
        ));
    }

    #[test]
    fn certain_check_always_succeeds_and_impossible_always_fails() {
        fn check_game(nerve: f64) -> GameDefinition {
            let mut game = GameDefinition::new("Checks");
            game.first_scene = Some("start".into());
            game.add_scene(
                Scene::new("start")
                    .with_title("Start")
                    .with_option(SceneOption::scene("gamble")),
            );
            let mut start_action = Scene::new("gamble").with_title("Gamble");
            start_action.check = Some(SceneCheck::broad("nerve", 1.0, "win", "lose"));
            game.add_scene(start_action);
            for id in ["win", "lose"] {
                game.add_scene(
                    Scene::new(id)
                        .with_title(id.to_uppercase())
                        .with_option(SceneOption::scene("start")),
                );
            }
            if let Some(start) = game.scenes.get_mut("start") {
                start
                    .on_arrival
                    .push(Action::set_quality("nerve", nerve));
            }
            game
        }

        for _ in 0..5 {
            let mut engine = recording_engine(check_game(100.0), "sure");
            engine.choose(0).unwrap();
            assert_eq!(engine.state().scene_id.as_deref(), Some("win"));
        }
        for _ in 0..5 {
            let mut engine = recording_engine(check_game(0.0), "doomed");
            engine.choose(0).unwrap();
            assert_eq!(engine.state().scene_id.as_deref(), Some("lose"));
        }
    }

    #[test]
    fn explicit_game_over_is_terminal() {
        let mut game = hub_game();
        let mut tomb = Scene::new("tomb").with_title("The Tomb");
        tomb.game_over = Some(true);
        game.add_scene(tomb);
        let mut engine = recording_engine(game, "tomb");
        engine.go_to_scene("tomb").unwrap();
        assert!(engine.is_game_over());
        assert!(engine.ui().game_over);
        assert!(matches!(engine.choose(0), Err(EngineError::GameIsOver)));
        assert!(matches!(
            engine.go_to_scene("hub"),
            Err(EngineError::GameIsOver)
        ));
        // A fresh game recovers.
        engine.begin_game_with_seeds(&["again"]).unwrap();
        assert!(!engine.is_game_over());
    }

    #[test]
    fn no_choices_ends_the_game_unless_suppressed() {
        let mut game = GameDefinition::new("DeadEnd");
        game.first_scene = Some("dead_end".into());
        game.add_scene(Scene::new("dead_end").with_title("Dead End"));
        let mut engine = StoryEngine::new(Arc::new(game), RecordingUi::default()).unwrap();
        engine.begin_game_with_seeds(&["end"]).unwrap();
        assert!(engine.is_game_over());

        let mut game = GameDefinition::new("Parked");
        game.first_scene = Some("parked".into());
        let mut parked = Scene::new("parked").with_title("Parked");
        parked.game_over = Some(false);
        game.add_scene(parked);
        let mut engine = StoryEngine::new(Arc::new(game), RecordingUi::default()).unwrap();
        engine.begin_game_with_seeds(&["parked"]).unwrap();
        assert!(!engine.is_game_over());
        assert!(engine.current_choices().is_none());
    }

    #[test]
    fn root_fallback_offers_continue() {
        let mut game = hub_game();
        game.add_scene(
            Scene::new("cul_de_sac")
                .with_title("Cul-de-sac")
                .with_content("Nothing further."),
        );
        let mut engine = recording_engine(game, "continue");
        engine.go_to_scene("cul_de_sac").unwrap();
        let choices = engine.current_choices().unwrap();
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].id, "hub");
        assert_eq!(
            content::to_plain_text(&choices[0].title),
            "Continue..."
        );
        engine.choose(0).unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some("hub"));
    }

    #[test]
    fn achievement_scene_sets_quasi_qualities() {
        let mut game = hub_game();
        let mut summit = Scene::new("summit")
            .with_title("The Summit")
            .with_option(SceneOption::scene("hub"));
        summit.achievement = Some("climbed".into());
        game.add_scene(summit);
        let mut engine = recording_engine(game, "summit");
        engine.go_to_scene("summit").unwrap();
        assert!(engine.state().achievements.contains("climbed"));
        assert_eq!(engine.state().qualities.number("achievement_climbed"), 1.0);
        assert_eq!(
            engine.state().qualities.number("game_achievement_climbed"),
            1.0
        );
    }

    #[test]
    fn transcript_records_content_and_commits() {
        let mut engine = StoryEngine::new(Arc::new(hub_game()), RecordingUi::default()).unwrap();
        engine.set_transcript_enabled(true);
        engine.begin_game_with_seeds(&["scribe"]).unwrap();
        engine.choose(1).unwrap();
        let transcript = engine.transcript();
        assert!(transcript.contains(&"You are here.".to_string()));
        assert!(transcript.contains(&"> The Anteroom".to_string()));
        assert!(transcript.contains(&"A quiet room.".to_string()));
    }

    #[test]
    fn state_round_trip_reproduces_subsequent_behavior() {
        fn risk_game() -> GameDefinition {
            let mut game = GameDefinition::new("Risk");
            game.first_scene = Some("hub".into());
            game.add_scene(
                Scene::new("hub")
                    .with_title("Hub")
                    .with_option(SceneOption::scene("gamble")),
            );
            let mut gamble = Scene::new("gamble").with_title("Gamble");
            gamble.check = Some(SceneCheck::narrow("nerve", 5.0, "win", "lose"));
            game.add_scene(gamble);
            for id in ["win", "lose"] {
                game.add_scene(
                    Scene::new(id)
                        .with_title(id.to_uppercase())
                        .with_option(SceneOption::scene("hub")),
                );
            }
            game
        }

        let mut original = StoryEngine::new(Arc::new(risk_game()), NullPresenter).unwrap();
        original.begin_game_with_seeds(&["fortune"]).unwrap();
        original.choose(0).unwrap();

        // Serialize, reload into a fresh engine, and drive both.
        let blob = serde_json::to_string(original.exportable_state()).unwrap();
        let restored_state: GameState = serde_json::from_str(&blob).unwrap();
        let mut restored = StoryEngine::new(Arc::new(risk_game()), NullPresenter).unwrap();
        restored.set_state(restored_state).unwrap();

        for _ in 0..10 {
            original.choose(0).unwrap();
            restored.choose(0).unwrap();
            assert_eq!(original.state().scene_id, restored.state().scene_id);
            assert_eq!(
                original.state().current_random_state,
                restored.state().current_random_state
            );
        }
    }

    #[test]
    fn set_state_without_rng_snapshot_is_rejected() {
        let mut engine = StoryEngine::new(Arc::new(hub_game()), NullPresenter).unwrap();
        let state = GameState::new("hub");
        assert!(matches!(
            engine.set_state(state),
            Err(EngineError::MissingRandomState)
        ));
    }

    #[test]
    fn unknown_scene_is_fatal() {
        let mut engine = recording_engine(hub_game(), "ghost");
        assert!(matches!(
            engine.go_to_scene("ghost"),
            Err(EngineError::UnknownScene(id)) if id == "ghost"
        ));
    }

    #[test]
    fn conflicting_exits_are_rejected_at_construction() {
        let mut game = hub_game();
        game.add_scene(
            Scene::new("broken")
                .with_title("Broken")
                .with_go_to(GoTo::to("hub"))
                .with_check(SceneCheck::broad("nerve", 1.0, "hub", "hub")),
        );
        assert!(matches!(
            StoryEngine::new(Arc::new(game), NullPresenter),
            Err(EngineError::ConflictingExits(id)) if id == "broken"
        ));
    }
}
