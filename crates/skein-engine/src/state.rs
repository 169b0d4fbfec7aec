//! The serializable game-state aggregate.
//!
//! One [`GameState`] value is the entire save file: round-tripping it
//! through JSON and loading it back reproduces identical subsequent engine
//! behavior, including the random stream. Everything in it is plain data —
//! scripted units stay in the game definition.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::content::ContentNode;
use crate::deck::HandCard;
use crate::quality::Qualities;

/// The mutable state of one playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The scene the player is currently in; unset before the game begins.
    pub scene_id: Option<String>,
    /// Scenes entered since the last explicit go-to, in order.
    pub scene_ids_since_goto: Vec<String>,
    /// The scene the default "Continue..." fallback returns to.
    pub root_scene_id: String,
    /// Whether the game has reached its terminal state.
    pub game_over: bool,
    /// Per-scene visit counters, for scenes that declare a counter cap.
    pub visits: BTreeMap<String, u32>,
    /// The quality table.
    pub qualities: Qualities,
    /// Random generator snapshot, captured at the last scene arrival.
    pub current_random_state: Option<[u32; 5]>,
    /// Resolved content accumulated on the current page.
    pub current_content: Vec<ContentNode>,
    /// Page snapshot taken when entering a special scene, restored by
    /// back-navigation.
    pub temp_current_content: Vec<ContentNode>,
    /// One-level back pointer set while logically inside a special scene.
    pub prev_special_scene_id: Option<String>,
    /// The previously occupied scene.
    pub prev_scene_id: Option<String>,
    /// The scene occupied before the last top-level scene change.
    pub prev_top_scene_id: Option<String>,
    /// Target adopted from the most recent jump-declaring scene.
    pub jump_scene_id: Option<String>,
    /// Achievements awarded this playthrough.
    pub achievements: BTreeSet<String>,
    /// Current background image reference.
    pub bg: Option<String>,
    /// Current sprite assignments, location to image reference.
    pub sprites: BTreeMap<String, String>,
    /// Subroutine return stack. Part of the save model for an unfinished
    /// subroutine feature; nothing pushes to it yet.
    pub scene_stack: Vec<String>,
    /// Set when control returns from a subroutine jump; suppresses
    /// re-running arrival actions once.
    pub just_returned: bool,
    /// Companion flag to `just_returned` for subroutine starts.
    pub just_returned_start: bool,
    /// Companion flag to `just_returned` for subroutine ends.
    pub just_returned_end: bool,
    /// Per-hand-scene card collections.
    pub current_hands: BTreeMap<String, Vec<HandCard>>,
    /// The most recently drawn card.
    pub last_drawn_card: Option<HandCard>,
    /// The scene id of the most recently played card.
    pub last_played_card: Option<String>,
    /// Whether displayed content and committed choices accumulate into the
    /// engine's transcript.
    pub enable_transcript: bool,
}

impl GameState {
    /// Fresh state for a new playthrough rooted at the given scene.
    pub fn new(root_scene_id: impl Into<String>) -> Self {
        Self {
            scene_id: None,
            scene_ids_since_goto: Vec::new(),
            root_scene_id: root_scene_id.into(),
            game_over: false,
            visits: BTreeMap::new(),
            qualities: Qualities::default(),
            current_random_state: None,
            current_content: Vec::new(),
            temp_current_content: Vec::new(),
            prev_special_scene_id: None,
            prev_scene_id: None,
            prev_top_scene_id: None,
            jump_scene_id: None,
            achievements: BTreeSet::new(),
            bg: None,
            sprites: BTreeMap::new(),
            scene_stack: Vec::new(),
            just_returned: false,
            just_returned_start: false,
            just_returned_end: false,
            current_hands: BTreeMap::new(),
            last_drawn_card: None,
            last_played_card: None,
            enable_transcript: false,
        }
    }

    /// How many times a scene has been visited (0 when untracked).
    pub fn visit_count(&self, scene_id: &str) -> u32 {
        self.visits.get(scene_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_serde() {
        let mut state = GameState::new("root");
        state.scene_id = Some("tavern".into());
        state.qualities.insert_raw("gold", 7.0);
        state.visits.insert("tavern".into(), 2);
        state.current_random_state = Some([1, 2, 3, 4, 5]);
        state.achievements.insert("first_steps".into());
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn fresh_state_has_no_scene() {
        let state = GameState::new("root");
        assert!(state.scene_id.is_none());
        assert!(!state.game_over);
        assert_eq!(state.visit_count("anywhere"), 0);
    }
}
