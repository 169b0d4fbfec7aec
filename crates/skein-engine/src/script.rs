//! Scripted units: predicates, expressions, and actions.
//!
//! A game definition carries small callable units compiled by the authoring
//! toolchain. The engine treats them as opaque: each is called with the game
//! state and the quality table and either produces a value or fails. A
//! failing unit never aborts a transition — the failure is logged and the
//! documented default is substituted, because a broken gate in content
//! should degrade, not crash the story.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::content::ContentBlock;
use crate::quality::{Qualities, QualityAccess, QualityValue};
use crate::state::GameState;

/// A failure inside a scripted unit.
///
/// Recovered at the evaluation site; never crosses the engine boundary.
#[derive(Debug, Clone, Error)]
#[error("script unit failed: {0}")]
pub struct ScriptError(pub String);

/// Result type for scripted units.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// A value produced by an expression unit.
#[derive(Debug, Clone)]
pub enum ScriptValue {
    /// A numeric result.
    Number(f64),
    /// A text result.
    Text(String),
    /// A boolean result.
    Bool(bool),
    /// A content template, possibly carrying its own state dependencies to
    /// resolve recursively.
    Content(ContentBlock),
}

impl ScriptValue {
    /// Render the value as display text (content templates render empty;
    /// they are expanded by the resolver instead).
    pub fn to_text(&self) -> String {
        match self {
            ScriptValue::Number(n) => crate::content::format_number(*n),
            ScriptValue::Text(s) => s.clone(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Content(_) => String::new(),
        }
    }

    /// The numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Text(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Text(value)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<QualityValue> for ScriptValue {
    fn from(value: QualityValue) -> Self {
        match value {
            QualityValue::Number(n) => ScriptValue::Number(n),
            QualityValue::Id(s) => ScriptValue::Text(s),
        }
    }
}

type PredicateFn = dyn Fn(&GameState, &Qualities) -> ScriptResult<bool> + Send + Sync;
type ExpressionFn = dyn Fn(&GameState, &Qualities) -> ScriptResult<ScriptValue> + Send + Sync;
type ActionFn = dyn Fn(&mut QualityAccess<'_>) -> ScriptResult<()> + Send + Sync;

/// A boolean condition over game state.
#[derive(Clone)]
pub struct Predicate {
    fun: Arc<PredicateFn>,
    source: Option<String>,
}

impl Predicate {
    /// Wrap a closure as a predicate unit.
    pub fn new<F>(fun: F) -> Self
    where
        F: Fn(&GameState, &Qualities) -> ScriptResult<bool> + Send + Sync + 'static,
    {
        Self {
            fun: Arc::new(fun),
            source: None,
        }
    }

    /// A predicate with a fixed answer.
    pub fn constant(value: bool) -> Self {
        Self::new(move |_, _| Ok(value))
    }

    /// Attach the authored source text, carried for diagnostics only.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The authored source text, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Evaluate, substituting `default` when the unit fails.
    pub(crate) fn run(&self, state: &GameState, qualities: &Qualities, default: bool) -> bool {
        match (self.fun)(state, qualities) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("predicate failed ({}): {err}", self.describe());
                default
            }
        }
    }

    fn describe(&self) -> &str {
        self.source.as_deref().unwrap_or("<closure>")
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("source", &self.source).finish()
    }
}

/// A value-producing computation over game state.
#[derive(Clone)]
pub struct Expression {
    fun: Arc<ExpressionFn>,
    source: Option<String>,
}

impl Expression {
    /// Wrap a closure as an expression unit.
    pub fn new<F>(fun: F) -> Self
    where
        F: Fn(&GameState, &Qualities) -> ScriptResult<ScriptValue> + Send + Sync + 'static,
    {
        Self {
            fun: Arc::new(fun),
            source: None,
        }
    }

    /// An expression that reads a quality's current value (0 when unset).
    pub fn quality(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(move |_, qualities| {
            Ok(qualities
                .get(&id)
                .cloned()
                .map(ScriptValue::from)
                .unwrap_or(ScriptValue::Number(0.0)))
        })
    }

    /// Attach the authored source text, carried for diagnostics only.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The authored source text, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Evaluate, substituting `default` when the unit fails.
    pub(crate) fn run(
        &self,
        state: &GameState,
        qualities: &Qualities,
        default: ScriptValue,
    ) -> ScriptValue {
        match (self.fun)(state, qualities) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("expression failed ({}): {err}", self.describe());
                default
            }
        }
    }

    fn describe(&self) -> &str {
        self.source.as_deref().unwrap_or("<closure>")
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression").field("source", &self.source).finish()
    }
}

/// A state mutation run on scene departure, arrival, or display.
///
/// Actions mutate qualities through [`QualityAccess`], so bounds, validity
/// predicates, and change signals apply to scripted writes the same as to
/// engine writes.
#[derive(Clone)]
pub struct Action {
    fun: Arc<ActionFn>,
    source: Option<String>,
}

impl Action {
    /// Wrap a closure as an action unit.
    pub fn new<F>(fun: F) -> Self
    where
        F: Fn(&mut QualityAccess<'_>) -> ScriptResult<()> + Send + Sync + 'static,
    {
        Self {
            fun: Arc::new(fun),
            source: None,
        }
    }

    /// An action that assigns a quality.
    pub fn set_quality(id: impl Into<String>, value: impl Into<QualityValue>) -> Self {
        let id = id.into();
        let value = value.into();
        Self::new(move |access| {
            access.set(&id, value.clone());
            Ok(())
        })
    }

    /// An action that adds to a numeric quality (unset reads as 0).
    pub fn add_quality(id: impl Into<String>, delta: f64) -> Self {
        let id = id.into();
        Self::new(move |access| {
            let current = access.number(&id);
            access.set(&id, current + delta);
            Ok(())
        })
    }

    /// Attach the authored source text, carried for diagnostics only.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The authored source text, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Run the action, swallowing and logging failure.
    pub(crate) fn run(&self, access: &mut QualityAccess<'_>) {
        if let Err(err) = (self.fun)(access) {
            log::warn!("action failed ({}): {err}", self.describe());
        }
    }

    fn describe(&self) -> &str {
        self.source.as_deref().unwrap_or("<closure>")
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("source", &self.source).finish()
    }
}

/// Evaluate an optional predicate with the given default for absence or
/// failure.
pub(crate) fn run_predicate(
    predicate: Option<&Predicate>,
    default: bool,
    state: &GameState,
    qualities: &Qualities,
) -> bool {
    match predicate {
        Some(p) => p.run(state, qualities, default),
        None => default,
    }
}
