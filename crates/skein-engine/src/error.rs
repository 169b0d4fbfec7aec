//! Error types for the narrative engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the engine.
///
/// Fatal variants indicate a broken game definition and leave the engine in
/// an unusable state: callers must begin a fresh game or reload a saved
/// state before continuing. Input variants reject the offending call without
/// mutating any game state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scene id referenced by a go-to, option, check, or tag does not
    /// exist in the game definition. Fatal.
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// An operation needed a current scene but no game is in progress.
    /// Fatal.
    #[error("no current scene")]
    NoCurrentScene,

    /// A pseudo-target (previous scene, jump scene, special-scene back
    /// pointer) was used before any scene was recorded for it. Fatal.
    #[error("pseudo-target {0} has no recorded scene")]
    UnresolvedTarget(&'static str),

    /// A go-to-by-reference selected a quality that holds no scene id.
    /// Fatal.
    #[error("reference quality {0} holds no scene id")]
    UnsetReferenceQuality(String),

    /// A scene selected for display has no title to render. Fatal.
    #[error("scene {0} has no title")]
    MissingTitle(String),

    /// A named display transform does not exist in the game definition.
    /// Fatal.
    #[error("unknown quality display: {0}")]
    UnknownQualityDisplay(String),

    /// A saved state carried no generator snapshot to resume from. Fatal.
    #[error("saved state has no random generator snapshot")]
    MissingRandomState,

    /// A scene declares both a go-to list and a check; the two exit classes
    /// cannot be combined. Rejected when the definition is validated.
    #[error("scene {0} declares both a go-to and a check")]
    ConflictingExits(String),

    /// A scene caps visits without declaring a visit counter, so the cap
    /// could never trigger. Rejected when the definition is validated.
    #[error("scene {0} sets max_visits without count_visits_max")]
    VisitCapWithoutCounter(String),

    /// A scene's minimum choice count exceeds its maximum. Rejected when
    /// the definition is validated.
    #[error("scene {0} has min_choices greater than max_choices")]
    InvalidChoiceBounds(String),

    /// The player picked a choice index outside the current menu.
    #[error("no choice at index {index}, only {available} available")]
    ChoiceOutOfRange {
        /// The index that was requested.
        index: usize,
        /// How many choices the current menu holds.
        available: usize,
    },

    /// The player picked a choice that is displayed but not choosable.
    #[error("choice at index {0} is unavailable")]
    ChoiceUnavailable(usize),

    /// A choice was committed while no choice menu is active.
    #[error("no choices are currently active")]
    NoChoicesActive,

    /// The game has ended; no further transitions are accepted until a new
    /// game begins or a saved state is loaded.
    #[error("the game is over")]
    GameIsOver,
}
