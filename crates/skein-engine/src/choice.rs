//! The choice compiler.
//!
//! Turns a scene's authored options into the displayable choice menu:
//! expand id/tag targets, drop unviewable candidates, fill in selection
//! metadata, down-select by priority and frequency within the scene's
//! min/max bounds, then materialize display data. Also the machinery behind
//! card draws, which sample from a deck scene's compiled choices.

use std::cmp::Ordering;

use serde::Serialize;

use crate::check::difficulty_label;
use crate::content::{ContentBlock, ContentNode, Resolver};
use crate::definition::{GameDefinition, Scene};
use crate::error::{EngineError, EngineResult};
use crate::rng::StoryRng;
use crate::script::{Predicate, run_predicate};
use crate::state::GameState;

/// What an authored option points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionTarget {
    /// A single scene id.
    Scene(String),
    /// Every scene carrying a tag.
    Tag(String),
}

/// How often a candidate wins frequency-based down-selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Frequency {
    /// Always include this candidate when its tier is trimmed.
    Always,
    /// Relative weight; higher weights win trims more often.
    Weight(f64),
}

/// An authored candidate edge from a scene to a target or tag.
#[derive(Debug, Clone)]
pub struct SceneOption {
    /// What the option points at.
    pub target: OptionTarget,
    /// Gate for expanding this option at all.
    pub view_if: Option<Predicate>,
    /// Gate for the resulting choice being choosable.
    pub choose_if: Option<Predicate>,
    /// Title override for the resulting choice.
    pub title: Option<ContentBlock>,
    /// Subtitle override.
    pub subtitle: Option<ContentBlock>,
    /// Subtitle override shown when the choice cannot be taken.
    pub unavailable_subtitle: Option<ContentBlock>,
    /// Display-order override.
    pub order: Option<i32>,
    /// Selection-priority override.
    pub priority: Option<i32>,
    /// Selection-frequency override.
    pub frequency: Option<Frequency>,
}

impl SceneOption {
    fn with_target(target: OptionTarget) -> Self {
        Self {
            target,
            view_if: None,
            choose_if: None,
            title: None,
            subtitle: None,
            unavailable_subtitle: None,
            order: None,
            priority: None,
            frequency: None,
        }
    }

    /// An option pointing at a single scene.
    pub fn scene(id: impl Into<String>) -> Self {
        Self::with_target(OptionTarget::Scene(id.into()))
    }

    /// An option expanding to every scene carrying a tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::with_target(OptionTarget::Tag(tag.into()))
    }

    /// Gate expansion on a predicate.
    pub fn with_view_if(mut self, predicate: Predicate) -> Self {
        self.view_if = Some(predicate);
        self
    }

    /// Gate choosability on a predicate.
    pub fn with_choose_if(mut self, predicate: Predicate) -> Self {
        self.choose_if = Some(predicate);
        self
    }

    /// Override the displayed title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(ContentBlock::text(title));
        self
    }

    /// Override the display order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Override the selection priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Override the selection frequency.
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    fn candidate_for(&self, id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            unavailable_subtitle: self.unavailable_subtitle.clone(),
            choose_if: self.choose_if.clone(),
            order: self.order,
            priority: self.priority,
            frequency: self.frequency.clone(),
        }
    }
}

/// Check information attached to a choice whose target declares one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckDisplay {
    /// The quality the check rolls against.
    pub quality: String,
    /// The success probability at current state.
    pub success_probability: f64,
    /// The qualitative risk label for that probability.
    pub difficulty: String,
}

/// A resolved, displayable choice.
///
/// Derived data with a one-display lifetime: the menu is recomputed every
/// time the engine settles on a scene and invalidated by any commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    /// Target scene id.
    pub id: String,
    /// Resolved title.
    pub title: Vec<ContentNode>,
    /// Resolved subtitle, if any.
    pub subtitle: Option<Vec<ContentNode>>,
    /// Whether the player can take this choice.
    pub can_choose: bool,
    /// Check information when the target declares one.
    pub check: Option<CheckDisplay>,
    /// Set while displaying hand scenes: this choice is a deck.
    pub is_deck: bool,
    /// Card/deck image reference, set while displaying hand scenes.
    pub image: Option<String>,
}

/// An expanded option carrying per-choice overrides onto a concrete id.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: String,
    pub title: Option<ContentBlock>,
    pub subtitle: Option<ContentBlock>,
    pub unavailable_subtitle: Option<ContentBlock>,
    pub choose_if: Option<Predicate>,
    pub order: Option<i32>,
    pub priority: Option<i32>,
    pub frequency: Option<Frequency>,
}

/// A candidate with selection metadata fully defaulted.
#[derive(Debug, Clone)]
struct Ranked {
    candidate: Candidate,
    order: i32,
    priority: i32,
    frequency: Frequency,
    score: f64,
}

/// Compile a scene's choice menu.
///
/// `Ok(None)` means "no choosable choices" — distinct from an empty option
/// list, it is what makes the navigator end the game.
pub(crate) fn compile_choices(
    game: &GameDefinition,
    state: &GameState,
    rng: &mut StoryRng,
    scene: &Scene,
) -> EngineResult<Option<Vec<Choice>>> {
    let mut choices = Vec::new();
    let mut choosable = 0usize;

    if !scene.options.is_empty() {
        let candidates = expand_options(game, state, &scene.options);
        let candidates = filter_viewable(game, state, candidates)?;
        let ranked = fill_selection_defaults(game, candidates)?;
        let mut selected = filter_by_priority(ranked, scene.min_choices, scene.max_choices, rng);
        selected.sort_by_key(|r| r.order);
        let (display, count) = display_data(game, state, &selected)?;
        choices = display;
        choosable = count;
    }

    if choosable == 0 {
        let root = state.root_scene_id.clone();
        if scene.id != root {
            let root_scene = game.scene(&root)?;
            if run_predicate(root_scene.choose_if.as_ref(), true, state, &state.qualities) {
                choices.push(Choice {
                    id: root,
                    title: vec![ContentNode::Text("Continue...".into())],
                    subtitle: None,
                    can_choose: true,
                    check: None,
                    is_deck: false,
                    image: None,
                });
                choosable += 1;
            }
        }
    }

    if choosable > 0 {
        Ok(Some(choices))
    } else {
        Ok(None)
    }
}

/// Expand options into concrete candidates.
///
/// A direct scene target replaces any earlier candidate for the same id; a
/// tag only contributes ids not already present, so the first-listed option
/// wins on collision.
fn expand_options(
    game: &GameDefinition,
    state: &GameState,
    options: &[SceneOption],
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    for option in options {
        if !run_predicate(option.view_if.as_ref(), true, state, &state.qualities) {
            continue;
        }
        match &option.target {
            OptionTarget::Scene(id) => {
                let candidate = option.candidate_for(id);
                if let Some(existing) = out.iter_mut().find(|c| c.id == *id) {
                    *existing = candidate;
                } else {
                    out.push(candidate);
                }
            }
            OptionTarget::Tag(tag) => {
                for id in game.tagged(tag) {
                    if out.iter().any(|c| c.id == *id) {
                        continue;
                    }
                    out.push(option.candidate_for(id));
                }
            }
        }
    }
    out
}

/// Drop candidates whose target is capped out or fails its view predicate.
fn filter_viewable(
    game: &GameDefinition,
    state: &GameState,
    candidates: Vec<Candidate>,
) -> EngineResult<Vec<Candidate>> {
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if is_viewable(game, state, &candidate.id)? {
            out.push(candidate);
        }
    }
    Ok(out)
}

/// Whether a target scene may currently appear in a menu (or hand).
pub(crate) fn is_viewable(
    game: &GameDefinition,
    state: &GameState,
    id: &str,
) -> EngineResult<bool> {
    let scene = game.scene(id)?;
    if let Some(max_visits) = scene.max_visits
        && state.visit_count(id) >= max_visits
    {
        return Ok(false);
    }
    Ok(run_predicate(
        scene.view_if.as_ref(),
        true,
        state,
        &state.qualities,
    ))
}

/// Default order/priority/frequency from the option, else the target scene,
/// else 0 / 1 / weight 100.
fn fill_selection_defaults(
    game: &GameDefinition,
    candidates: Vec<Candidate>,
) -> EngineResult<Vec<Ranked>> {
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let scene = game.scene(&candidate.id)?;
        let order = candidate.order.or(scene.order).unwrap_or(0);
        let priority = candidate.priority.or(scene.priority).unwrap_or(1);
        let frequency = candidate
            .frequency
            .clone()
            .or_else(|| scene.frequency.clone())
            .unwrap_or(Frequency::Weight(100.0));
        out.push(Ranked {
            candidate,
            order,
            priority,
            frequency,
            score: 0.0,
        });
    }
    Ok(out)
}

/// Two-phase priority/frequency selection.
///
/// Phase one commits whole priority tiers, highest first, stopping at the
/// first tier boundary past the minimum count — a tied tier is never split
/// to satisfy a smaller minimum. Phase two trims the boundary tier to the
/// maximum by scoring each member `random() / frequency`, ascending, so
/// always-include candidates (score 0) survive every trim.
fn filter_by_priority(
    ranked: Vec<Ranked>,
    min_choices: Option<usize>,
    max_choices: Option<usize>,
    rng: &mut StoryRng,
) -> Vec<Ranked> {
    let mut sorted = ranked;
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut committed: Vec<Ranked> = Vec::new();
    let mut tier: Vec<Ranked> = Vec::new();
    let mut last_priority: Option<i32> = None;
    for (index, entry) in sorted.into_iter().enumerate() {
        if last_priority != Some(entry.priority) {
            if last_priority.is_some() && min_choices.is_none_or(|min| index >= min) {
                break;
            }
            committed.append(&mut tier);
            last_priority = Some(entry.priority);
        }
        tier.push(entry);
    }

    let total = committed.len() + tier.len();
    match max_choices {
        Some(max) if max < total => {
            for entry in &mut tier {
                entry.score = match entry.frequency {
                    Frequency::Always => 0.0,
                    Frequency::Weight(weight) => rng.random() / weight,
                };
            }
            tier.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
            let extra = max.saturating_sub(committed.len());
            committed.extend(tier.into_iter().take(extra));
        }
        _ => committed.append(&mut tier),
    }
    committed
}

/// Materialize display data for the selected candidates.
fn display_data(
    game: &GameDefinition,
    state: &GameState,
    selected: &[Ranked],
) -> EngineResult<(Vec<Choice>, usize)> {
    let resolver = Resolver { game, state };
    let mut choices = Vec::with_capacity(selected.len());
    let mut choosable = 0usize;

    for entry in selected {
        let candidate = &entry.candidate;
        let scene = game.scene(&candidate.id)?;

        let mut can_choose =
            run_predicate(candidate.choose_if.as_ref(), true, state, &state.qualities);
        if can_choose {
            can_choose = run_predicate(scene.choose_if.as_ref(), true, state, &state.qualities);
        }

        let title = candidate
            .title
            .as_ref()
            .or(scene.title.as_ref())
            .ok_or_else(|| EngineError::MissingTitle(candidate.id.clone()))?;

        let subtitle = if can_choose {
            candidate.subtitle.as_ref().or(scene.subtitle.as_ref())
        } else {
            candidate
                .unavailable_subtitle
                .as_ref()
                .or(scene.unavailable_subtitle.as_ref())
                .or(candidate.subtitle.as_ref())
                .or(scene.subtitle.as_ref())
        };

        let check = scene.check.as_ref().map(|check| {
            let probability = check.success_probability(state.qualities.number(&check.quality));
            CheckDisplay {
                quality: check.quality.clone(),
                success_probability: probability,
                difficulty: difficulty_label(probability).to_string(),
            }
        });

        if can_choose {
            choosable += 1;
        }
        choices.push(Choice {
            id: candidate.id.clone(),
            title: resolver.resolve(title, false)?,
            subtitle: match subtitle {
                Some(block) => Some(resolver.resolve(block, false)?),
                None => None,
            },
            can_choose,
            check,
            is_deck: false,
            image: None,
        });
    }

    Ok((choices, choosable))
}
