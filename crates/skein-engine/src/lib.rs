//! Quality-based narrative-state engine for branching interactive fiction.
//!
//! The engine drives a player through a declarative story graph: scenes
//! navigate by direct and conditional go-tos, probability checks, and
//! compiled choice menus; persistent numeric "qualities" track player and
//! world state; content templates resolve against that state into
//! displayable trees. Everything stochastic routes through a seedable
//! generator with exportable state, so a serialized [`GameState`] replays
//! exactly.
//!
//! Construct a [`GameDefinition`] programmatically, implement [`Presenter`]
//! for your medium (every method has a no-op default), and drive a
//! [`StoryEngine`] with `begin_game`, `choose`, and friends.

/// Probability-gated checks: difficulty models, risk labels, rolls.
pub mod check;
/// The choice compiler: option expansion, filtering, and down-selection.
pub mod choice;
/// Content templates and the state-dependent resolver.
pub mod content;
/// The card/deck/hand extension layer.
pub mod deck;
/// The immutable game definition: scenes, qualities, display tables.
pub mod definition;
/// The scene navigator.
pub mod engine;
/// Error types.
pub mod error;
/// The quality table and its set protocol.
pub mod quality;
/// Deterministic random number generation.
pub mod rng;
/// Scripted units: predicates, expressions, actions.
pub mod script;
/// The serializable game-state aggregate.
pub mod state;
/// The presentation interface.
pub mod ui;

/// Re-export check types.
pub use check::{CheckModel, SceneCheck};
/// Re-export choice types.
pub use choice::{CheckDisplay, Choice, Frequency, OptionTarget, SceneOption};
/// Re-export content types.
pub use content::{ContentBlock, ContentNode, QualityDisplay, StateDep};
/// Re-export deck types.
pub use deck::{DrawOutcome, HandCard};
/// Re-export definition types.
pub use definition::{GameDefinition, GoTo, Scene};
/// Re-export the navigator and its pseudo-targets.
pub use engine::{StoryEngine, pseudo};
/// Re-export error types.
pub use error::{EngineError, EngineResult};
/// Re-export quality types.
pub use quality::{Qualities, QualityAccess, QualityDef, QualityValue};
/// Re-export generator types.
pub use rng::{SeedSequence, StoryRng};
/// Re-export scripted-unit types.
pub use script::{Action, Expression, Predicate, ScriptError, ScriptResult, ScriptValue};
/// Re-export the game state.
pub use state::GameState;
/// Re-export presentation types.
pub use ui::{NullPresenter, Presenter, SignalEvent, SignalPayload};
