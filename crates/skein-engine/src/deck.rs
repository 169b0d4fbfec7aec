//! The card/deck/hand extension.
//!
//! An optional gameplay layer over the choice compiler and the navigator:
//! deck scenes offer uniformly random draws from their viable card-scene
//! choices, hands hold drawn cards up to a capacity, and playing a card
//! navigates to its scene. Draw shortfalls are ordinary results, not
//! errors — callers branch on [`DrawOutcome`].

use serde::{Deserialize, Serialize};

use crate::content::ContentNode;
use crate::engine::StoryEngine;
use crate::error::{EngineError, EngineResult};
use crate::ui::Presenter;

/// A card held in a hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandCard {
    /// The card's scene id.
    pub id: String,
    /// Resolved title, as displayed when the card was drawn.
    pub title: Vec<ContentNode>,
    /// Card image reference.
    pub image: Option<String>,
}

/// The result of a draw attempt.
///
/// `HandFull` and `DeckEmpty` are expected, frequent conditions and must be
/// distinguishable both from success and from each other.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// A card was drawn into the hand.
    Drawn(HandCard),
    /// The hand is at capacity; nothing was drawn.
    HandFull,
    /// No eligible card remains in the deck; nothing was drawn.
    DeckEmpty,
}

impl<P: Presenter> StoryEngine<P> {
    /// Draw a card from a deck into the current scene's hand.
    ///
    /// The draw is uniform over the deck's viable, choosable card-scenes
    /// not already in hand, using the engine's generator so that draws
    /// replay identically from a saved state.
    pub fn draw_card(&mut self, deck_id: &str) -> EngineResult<DrawOutcome> {
        if self.is_game_over() {
            return Err(EngineError::GameIsOver);
        }
        let scene = self.current_scene()?;
        let max_cards = scene.max_cards;
        let scene_id = scene.id.clone();

        let held = self
            .state()
            .current_hands
            .get(&scene_id)
            .map_or(0, Vec::len);
        if let Some(max) = max_cards
            && held >= max
        {
            return Ok(DrawOutcome::HandFull);
        }

        let Some(card) = self.draw_from_deck(deck_id)? else {
            return Ok(DrawOutcome::DeckEmpty);
        };

        let state = self.state_mut();
        state.last_drawn_card = Some(card.clone());
        state
            .current_hands
            .entry(scene_id.clone())
            .or_default()
            .push(card.clone());
        let hand = state.current_hands[&scene_id].clone();
        self.ui_mut().display_hand(&hand, max_cards);
        Ok(DrawOutcome::Drawn(card))
    }

    /// Play a card from the current hand: remove it by id and navigate to
    /// its scene.
    pub fn play_card(&mut self, card_id: &str) -> EngineResult<()> {
        if self.is_game_over() {
            return Err(EngineError::GameIsOver);
        }
        let scene_id = self
            .state()
            .scene_id
            .clone()
            .ok_or(EngineError::NoCurrentScene)?;
        let state = self.state_mut();
        if let Some(hand) = state.current_hands.get_mut(&scene_id)
            && let Some(position) = hand.iter().position(|card| card.id == card_id)
        {
            hand.remove(position);
        }
        state.last_played_card = Some(card_id.to_string());
        self.invalidate_choices();
        self.go_to_scene(card_id)
    }

    /// Play a pinned card: navigate directly, bypassing the hand.
    pub fn play_pinned_card(&mut self, card_id: &str) -> EngineResult<()> {
        if self.is_game_over() {
            return Err(EngineError::GameIsOver);
        }
        self.invalidate_choices();
        self.go_to_scene(card_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::choice::SceneOption;
    use crate::definition::{GameDefinition, Scene};
    use crate::script::Predicate;
    use crate::ui::NullPresenter;

    /// A hand scene `table` over a deck `pile` of three card scenes.
    fn card_game(max_cards: Option<usize>) -> GameDefinition {
        let mut game = GameDefinition::new("Cards");
        game.first_scene = Some("table".into());

        let mut table = Scene::new("table").with_title("The Table").with_content("Cards on felt.");
        table.is_hand = true;
        table.max_cards = max_cards;
        table = table.with_option(SceneOption::scene("pile"));
        game.add_scene(table);

        let mut pile = Scene::new("pile").with_title("The Pile");
        for id in ["ace", "king", "queen"] {
            pile = pile.with_option(SceneOption::scene(id));
        }
        pile.is_deck = true;
        game.add_scene(pile);

        for id in ["ace", "king", "queen"] {
            let mut card = Scene::new(id)
                .with_title(format!("The {id}"))
                .with_content(format!("You play the {id}."))
                .with_option(SceneOption::scene("table"));
            card.is_card = true;
            game.add_scene(card);
        }
        game
    }

    fn engine_for(game: GameDefinition) -> StoryEngine<NullPresenter> {
        let mut engine = StoryEngine::new(Arc::new(game), NullPresenter).unwrap();
        engine.begin_game_with_seeds(&["deck-test"]).unwrap();
        engine
    }

    #[test]
    fn drawing_fills_the_hand_without_duplicates() {
        let mut engine = engine_for(card_game(Some(5)));
        let mut drawn = Vec::new();
        for _ in 0..3 {
            match engine.draw_card("pile").unwrap() {
                DrawOutcome::Drawn(card) => drawn.push(card.id),
                other => panic!("expected a draw, got {other:?}"),
            }
        }
        drawn.sort_unstable();
        assert_eq!(drawn, ["ace", "king", "queen"]);

        // Every deck card is in hand now.
        assert_eq!(engine.draw_card("pile").unwrap(), DrawOutcome::DeckEmpty);
    }

    #[test]
    fn full_hand_rejects_draws_distinctly() {
        let mut engine = engine_for(card_game(Some(1)));
        assert!(matches!(
            engine.draw_card("pile").unwrap(),
            DrawOutcome::Drawn(_)
        ));
        assert_eq!(engine.draw_card("pile").unwrap(), DrawOutcome::HandFull);
    }

    #[test]
    fn draws_replay_identically_from_the_same_seed() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        for drawn in [&mut first, &mut second] {
            let mut engine = engine_for(card_game(Some(5)));
            for _ in 0..3 {
                if let DrawOutcome::Drawn(card) = engine.draw_card("pile").unwrap() {
                    drawn.push(card.id);
                }
            }
        }
        assert_eq!(first, second);
    }

    #[test]
    fn playing_a_card_removes_it_and_navigates() {
        let mut engine = engine_for(card_game(Some(5)));
        let DrawOutcome::Drawn(card) = engine.draw_card("pile").unwrap() else {
            panic!("expected a draw");
        };
        engine.play_card(&card.id).unwrap();
        assert_eq!(engine.state().scene_id.as_deref(), Some(card.id.as_str()));
        assert_eq!(engine.state().last_played_card.as_deref(), Some(card.id.as_str()));

        // The card left the table's hand.
        let hand = &engine.state().current_hands["table"];
        assert!(hand.iter().all(|held| held.id != card.id));
    }

    #[test]
    fn played_card_becomes_drawable_again() {
        let mut engine = engine_for(card_game(Some(5)));
        for _ in 0..3 {
            engine.draw_card("pile").unwrap();
        }
        let first_id = engine.state().current_hands["table"][0].id.clone();
        engine.play_card(&first_id).unwrap();
        // Return to the table and the played card can be drawn again.
        engine.choose(0).unwrap();
        match engine.draw_card("pile").unwrap() {
            DrawOutcome::Drawn(card) => assert_eq!(card.id, first_id),
            other => panic!("expected to redraw {first_id}, got {other:?}"),
        }
    }

    #[test]
    fn unviewable_cards_are_pruned_from_the_hand() {
        let mut game = card_game(Some(5));
        if let Some(ace) = game.scenes.get_mut("ace") {
            ace.view_if = Some(Predicate::new(|_, qualities| {
                Ok(qualities.number("ace_allowed") > 0.0)
            }));
        }
        let mut engine = StoryEngine::new(Arc::new(game), NullPresenter).unwrap();
        engine.begin_game_with_seeds(&["prune"]).unwrap();
        engine.set_quality("ace_allowed", 1.0);
        for _ in 0..3 {
            engine.draw_card("pile").unwrap();
        }
        assert_eq!(engine.state().current_hands["table"].len(), 3);

        // The ace stops being viewable; redisplaying the menu prunes it.
        engine.set_quality("ace_allowed", 0.0);
        engine.display_choices().unwrap();
        let hand = &engine.state().current_hands["table"];
        assert_eq!(hand.len(), 2);
        assert!(hand.iter().all(|card| card.id != "ace"));
    }

    #[test]
    fn pinned_play_bypasses_the_hand() {
        let mut game = card_game(Some(5));
        let mut pinned = Scene::new("standing_offer")
            .with_title("A standing offer")
            .with_content("Always on the table.")
            .with_option(SceneOption::scene("table"));
        pinned.is_pinned_card = true;
        game.add_scene(pinned);
        let mut engine = StoryEngine::new(Arc::new(game), NullPresenter).unwrap();
        engine.begin_game_with_seeds(&["pinned"]).unwrap();

        engine.play_pinned_card("standing_offer").unwrap();
        assert_eq!(
            engine.state().scene_id.as_deref(),
            Some("standing_offer")
        );
        assert!(engine.state().current_hands["table"].is_empty());
    }

    #[test]
    fn hand_card_round_trips_through_json() {
        let card = HandCard {
            id: "ace".into(),
            title: vec![ContentNode::Text("The ace".into())],
            image: Some("cards/ace.png".into()),
        };
        let json = serde_json::to_string(&card).unwrap();
        let back: HandCard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }
}
