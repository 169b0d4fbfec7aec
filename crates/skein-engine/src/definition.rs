//! The immutable game definition.
//!
//! A definition is compiled by authoring tooling and consumed read-only by
//! any number of engine instances. Scenes, qualities, and display tables are
//! plain data; the scripted units inside them are opaque callables compiled
//! at build time. Definitions are constructed programmatically — see the
//! builder methods on [`GameDefinition`] and [`Scene`].

use std::collections::{BTreeMap, BTreeSet};

use crate::check::SceneCheck;
use crate::choice::{Frequency, SceneOption};
use crate::content::{ContentBlock, QualityDisplay};
use crate::error::{EngineError, EngineResult};
use crate::quality::QualityDef;
use crate::script::{Action, Predicate};

/// One candidate transition out of a scene.
#[derive(Debug, Clone)]
pub struct GoTo {
    /// Target scene id (may be a pseudo-target).
    pub target: String,
    /// Gate predicate; an absent predicate always passes, a failing one
    /// excludes the target.
    pub predicate: Option<Predicate>,
}

impl GoTo {
    /// An unconditional transition.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            predicate: None,
        }
    }

    /// A transition gated by a predicate.
    pub fn when(target: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            target: target.into(),
            predicate: Some(predicate),
        }
    }
}

/// A node in the story graph.
///
/// Most fields are optional; a scene is whatever subset of content,
/// navigation, checks, and lifecycle flags the author declared.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// The scene id.
    pub id: String,
    /// Title shown when the scene appears as a choice.
    pub title: Option<ContentBlock>,
    /// Subtitle shown under the title.
    pub subtitle: Option<ContentBlock>,
    /// Subtitle shown instead when the choice cannot be taken.
    pub unavailable_subtitle: Option<ContentBlock>,
    /// The scene's content template.
    pub content: Option<ContentBlock>,
    /// Candidate outgoing choices.
    pub options: Vec<SceneOption>,
    /// Direct transitions, tried before anything else on arrival.
    pub go_to: Vec<GoTo>,
    /// Indirect transitions: the surviving entry names a quality whose
    /// value is the target scene id.
    pub go_to_ref: Vec<GoTo>,
    /// A probability-gated branch, tried when no go-to fires.
    pub check: Option<SceneCheck>,
    /// Gate for appearing in choice menus at all.
    pub view_if: Option<Predicate>,
    /// Gate for being choosable once shown.
    pub choose_if: Option<Predicate>,
    /// Actions run on arrival.
    pub on_arrival: Vec<Action>,
    /// Actions run on departure.
    pub on_departure: Vec<Action>,
    /// Actions run after content display.
    pub on_display: Vec<Action>,
    /// Default display order for choices targeting this scene.
    pub order: Option<i32>,
    /// Default selection priority for choices targeting this scene.
    pub priority: Option<i32>,
    /// Default selection frequency for choices targeting this scene.
    pub frequency: Option<Frequency>,
    /// Minimum number of choices the scene's menu should offer.
    pub min_choices: Option<usize>,
    /// Maximum number of choices the scene's menu may offer.
    pub max_choices: Option<usize>,
    /// Marks a top-level scene: entering it records the departed scene as
    /// the previous top-level scene.
    pub is_top: bool,
    /// Marks a special scene (stats page and the like) supporting one-level
    /// back-navigation to a snapshot of the page it interrupted.
    pub is_special: bool,
    /// Entering this scene makes it the root for fallback navigation.
    pub set_root: bool,
    /// Entering this scene records the given id as the jump target.
    pub set_jump: Option<String>,
    /// Cap on the visit counter; visits are only tracked when set.
    pub count_visits_max: Option<u32>,
    /// Visits at which the scene stops being offered as a choice.
    pub max_visits: Option<u32>,
    /// `Some(true)` ends the game on arrival; `Some(false)` suppresses the
    /// implicit game-over when no choices remain.
    pub game_over: Option<bool>,
    /// Start a fresh page before displaying this scene.
    pub new_page: bool,
    /// Presentation style applied while this scene is displayed.
    pub style: Option<String>,
    /// Signal name for this scene's events; falls back to the game-wide
    /// scene signal.
    pub signal: Option<String>,
    /// Portrait image reference passed along with the content.
    pub face_image: Option<String>,
    /// Background image set on arrival.
    pub set_bg: Option<String>,
    /// Sprite assignments set on arrival.
    pub set_sprites: Option<BTreeMap<String, String>>,
    /// Per-location sprite style directives applied on arrival.
    pub sprite_styles: BTreeMap<String, String>,
    /// Audio directive forwarded on arrival.
    pub audio: Option<String>,
    /// Achievement awarded on arrival.
    pub achievement: Option<String>,
    /// A scene whose arrival actions also run when this scene is entered.
    pub call: Option<String>,
    /// This scene is a deck that cards are drawn from.
    pub is_deck: bool,
    /// This scene is a drawable card.
    pub is_card: bool,
    /// This scene is a pinned card, played directly without entering a hand.
    pub is_pinned_card: bool,
    /// This scene displays decks, a hand, and pinned cards instead of a
    /// plain choice menu.
    pub is_hand: bool,
    /// Hand capacity; unbounded when unset.
    pub max_cards: Option<usize>,
    /// Image shown for this scene as a card or deck.
    pub card_image: Option<String>,
    /// Tags for dynamic option expansion.
    pub tags: Vec<String>,
}

impl Scene {
    /// A bare scene with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set a plain-text title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(ContentBlock::text(title));
        self
    }

    /// Set plain-text content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(ContentBlock::text(content));
        self
    }

    /// Set a content template.
    pub fn with_content_block(mut self, content: ContentBlock) -> Self {
        self.content = Some(content);
        self
    }

    /// Add a candidate outgoing choice.
    pub fn with_option(mut self, option: SceneOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add a direct transition.
    pub fn with_go_to(mut self, go_to: GoTo) -> Self {
        self.go_to.push(go_to);
        self
    }

    /// Add an indirect transition through a reference quality.
    pub fn with_go_to_ref(mut self, go_to: GoTo) -> Self {
        self.go_to_ref.push(go_to);
        self
    }

    /// Attach a check.
    pub fn with_check(mut self, check: SceneCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// The complete, immutable description of a game.
#[derive(Debug, Default)]
pub struct GameDefinition {
    /// The game's title.
    pub title: String,
    /// The game's author.
    pub author: Option<String>,
    /// The scene a new game opens in; falls back to the root scene.
    pub first_scene: Option<String>,
    /// The initial root scene for fallback navigation.
    pub root_scene: Option<String>,
    /// Game-wide default signal name for scene events.
    pub scene_signal: Option<String>,
    /// Game-wide default signal name for quality changes.
    pub quality_signal: Option<String>,
    /// All scenes by id.
    pub scenes: BTreeMap<String, Scene>,
    /// Declared quality metadata by id.
    pub qualities: BTreeMap<String, QualityDef>,
    /// User-defined display transforms by name.
    pub qdisplays: BTreeMap<String, QualityDisplay>,
    /// Tag to scene-id-set lookup, built as scenes are added.
    pub tag_lookup: BTreeMap<String, BTreeSet<String>>,
}

impl GameDefinition {
    /// An empty definition with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add a scene, registering its tags in the lookup.
    pub fn add_scene(&mut self, scene: Scene) {
        for tag in &scene.tags {
            self.tag_lookup
                .entry(tag.clone())
                .or_default()
                .insert(scene.id.clone());
        }
        self.scenes.insert(scene.id.clone(), scene);
    }

    /// Declare a quality.
    pub fn add_quality(&mut self, id: impl Into<String>, def: QualityDef) {
        self.qualities.insert(id.into(), def);
    }

    /// Declare a display transform.
    pub fn add_qdisplay(&mut self, name: impl Into<String>, display: QualityDisplay) {
        self.qdisplays.insert(name.into(), display);
    }

    /// Look up a scene; an unknown id is a fatal content error.
    pub fn scene(&self, id: &str) -> EngineResult<&Scene> {
        self.scenes
            .get(id)
            .ok_or_else(|| EngineError::UnknownScene(id.to_string()))
    }

    /// Scene ids carrying a tag, in id order.
    pub fn tagged(&self, tag: &str) -> impl Iterator<Item = &String> {
        self.tag_lookup.get(tag).into_iter().flatten()
    }

    /// The initial root scene id.
    pub fn root_scene_id(&self) -> String {
        self.root_scene
            .clone()
            .or_else(|| self.first_scene.clone())
            .unwrap_or_else(|| "root".to_string())
    }

    /// The scene a new game opens in.
    pub fn opening_scene_id(&self) -> String {
        self.first_scene
            .clone()
            .unwrap_or_else(|| self.root_scene_id())
    }

    /// Check structural rules that cannot be expressed in the types.
    ///
    /// A scene may not combine a check with go-to lists (the exit classes
    /// would race), may not cap visits it never counts, and may not demand
    /// more minimum choices than its maximum allows.
    pub fn validate(&self) -> EngineResult<()> {
        for (id, scene) in &self.scenes {
            if scene.check.is_some() && (!scene.go_to.is_empty() || !scene.go_to_ref.is_empty()) {
                return Err(EngineError::ConflictingExits(id.clone()));
            }
            if let Some(max_visits) = scene.max_visits
                && scene.count_visits_max.is_none_or(|cap| cap < max_visits)
            {
                return Err(EngineError::VisitCapWithoutCounter(id.clone()));
            }
            if let (Some(min), Some(max)) = (scene.min_choices, scene.max_choices)
                && min > max
            {
                return Err(EngineError::InvalidChoiceBounds(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_register_in_lookup() {
        let mut game = GameDefinition::new("Test");
        game.add_scene(Scene::new("dock").with_tag("harbor"));
        game.add_scene(Scene::new("quay").with_tag("harbor"));
        let ids: Vec<&String> = game.tagged("harbor").collect();
        assert_eq!(ids, ["dock", "quay"]);
        assert_eq!(game.tagged("nowhere").count(), 0);
    }

    #[test]
    fn unknown_scene_is_an_error() {
        let game = GameDefinition::new("Test");
        assert!(matches!(
            game.scene("ghost"),
            Err(EngineError::UnknownScene(id)) if id == "ghost"
        ));
    }

    #[test]
    fn root_falls_back_through_first_scene() {
        let mut game = GameDefinition::new("Test");
        assert_eq!(game.root_scene_id(), "root");
        game.first_scene = Some("intro".into());
        assert_eq!(game.root_scene_id(), "intro");
        game.root_scene = Some("hub".into());
        assert_eq!(game.root_scene_id(), "hub");
        assert_eq!(game.opening_scene_id(), "intro");
    }

    #[test]
    fn validate_rejects_check_with_go_to() {
        let mut game = GameDefinition::new("Test");
        game.add_scene(
            Scene::new("trap")
                .with_go_to(GoTo::to("pit"))
                .with_check(SceneCheck::broad("agility", 10.0, "ledge", "pit")),
        );
        assert!(matches!(
            game.validate(),
            Err(EngineError::ConflictingExits(id)) if id == "trap"
        ));
    }

    #[test]
    fn validate_rejects_uncounted_visit_cap() {
        let mut game = GameDefinition::new("Test");
        let mut scene = Scene::new("well");
        scene.max_visits = Some(3);
        game.add_scene(scene);
        assert!(matches!(
            game.validate(),
            Err(EngineError::VisitCapWithoutCounter(id)) if id == "well"
        ));
    }

    #[test]
    fn validate_rejects_inverted_choice_bounds() {
        let mut game = GameDefinition::new("Test");
        let mut scene = Scene::new("fork");
        scene.min_choices = Some(4);
        scene.max_choices = Some(2);
        game.add_scene(scene);
        assert!(matches!(
            game.validate(),
            Err(EngineError::InvalidChoiceBounds(id)) if id == "fork"
        ));
    }

    #[test]
    fn validate_accepts_counted_visit_cap() {
        let mut game = GameDefinition::new("Test");
        let mut scene = Scene::new("well");
        scene.max_visits = Some(3);
        scene.count_visits_max = Some(3);
        game.add_scene(scene);
        assert!(game.validate().is_ok());
    }
}
