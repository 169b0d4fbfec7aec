//! The presentation interface.
//!
//! The engine never renders anything itself: at defined points during a
//! transition it calls a [`Presenter`], and a front end decides what those
//! calls mean in its medium. Every method has a no-op default so a front
//! end implements only what it shows.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::choice::Choice;
use crate::content::{ContentNode, simple_content};
use crate::deck::HandCard;
use crate::quality::QualityValue;

/// The kind of event a signal payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalEvent {
    /// A scene was entered.
    SceneArrival,
    /// A scene was left.
    SceneDeparture,
    /// A scene's content was (re)shown.
    SceneDisplay,
    /// A quality's committed value changed.
    QualityChange,
}

/// A typed notification forwarded to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalPayload {
    /// The authored signal name.
    pub signal: String,
    /// What happened.
    pub event: SignalEvent,
    /// The scene or quality id the event concerns.
    pub id: String,
    /// The departed-from scene, on arrivals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// The destination scene, on departures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// The committed value, on quality changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<QualityValue>,
    /// The previous value, on quality changes; omitted when the quality
    /// was previously unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was: Option<QualityValue>,
}

impl SignalPayload {
    /// A payload with only the required fields set.
    pub fn new(signal: impl Into<String>, event: SignalEvent, id: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            event,
            id: id.into(),
            from: None,
            to: None,
            now: None,
            was: None,
        }
    }

    /// Attach the departed-from scene.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Attach the destination scene.
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Attach the committed value.
    pub fn with_now(mut self, now: QualityValue) -> Self {
        self.now = Some(now);
        self
    }

    /// Attach the previous value.
    pub fn with_was(mut self, was: QualityValue) -> Self {
        self.was = Some(was);
        self
    }
}

/// The interface a front end implements to display the game.
///
/// Calls arrive synchronously during engine operations. `begin_output` and
/// `end_output` bracket the visible output of one transition.
pub trait Presenter {
    /// A new game is starting.
    fn begin_game(&mut self) {}

    /// Show resolved content, optionally with a portrait image reference.
    fn display_content(&mut self, _content: &[ContentNode], _face_image: Option<&str>) {}

    /// Show the current choice menu.
    fn display_choices(&mut self, _choices: &[Choice]) {}

    /// Show the decks available in a hand scene.
    fn display_decks(&mut self, _decks: &[Choice]) {}

    /// Show the current hand and its capacity (unbounded when `None`).
    fn display_hand(&mut self, _hand: &[HandCard], _max_cards: Option<usize>) {}

    /// Show the pinned cards of a hand scene.
    fn display_pinned_cards(&mut self, _cards: &[Choice]) {}

    /// The game has ended.
    fn display_game_over(&mut self) {
        self.display_content(&simple_content("Game Over"), None);
    }

    /// Clear any displayed choices.
    fn remove_choices(&mut self) {}

    /// A transition's visible output is starting.
    fn begin_output(&mut self) {}

    /// A transition's visible output is complete.
    fn end_output(&mut self) {}

    /// Start a fresh page.
    fn new_page(&mut self) {}

    /// Apply a named presentation style (reset when `None`).
    fn set_style(&mut self, _style: Option<&str>) {}

    /// A typed engine event.
    fn signal(&mut self, _payload: &SignalPayload) {}

    /// Set the background image (clear when `None`).
    fn set_bg(&mut self, _image: Option<&str>) {}

    /// Replace the sprite assignments, location to image reference.
    fn set_sprites(&mut self, _sprites: &BTreeMap<String, String>) {}

    /// Style one sprite location.
    fn set_sprite_style(&mut self, _location: &str, _style: &str) {}

    /// Play or adjust audio per the scene's directive.
    fn audio(&mut self, _directive: &str) {}
}

/// A presenter that displays nothing. Useful headless and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}
