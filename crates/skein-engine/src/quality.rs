//! The quality table: bounded, validated, signal-emitting game variables.
//!
//! Qualities are the persistent variables of a story. Values live in the
//! game state as plain serializable data; the governing metadata (bounds,
//! validity predicate, change signal) lives in the game definition. Writes
//! that go through [`QualityAccess`] follow the full protocol:
//! clamp → tentative commit → validity check → rollback on rejection →
//! change signal. Undeclared qualities, and declared ones with no governing
//! metadata, are plain read/write entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::GameDefinition;
use crate::script::Predicate;
use crate::state::GameState;
use crate::ui::{SignalEvent, SignalPayload};

/// A quality's current value.
///
/// Mostly numeric; id-valued qualities exist so that go-to-by-reference
/// scenes can read a scene id out of the state. Bounds and checks apply to
/// numeric values only — an id value reads as 0 in any numeric context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QualityValue {
    /// A numeric value.
    Number(f64),
    /// A scene id, for reference qualities.
    Id(String),
}

impl QualityValue {
    /// The numeric reading, if this value has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            QualityValue::Number(n) => Some(*n),
            QualityValue::Id(_) => None,
        }
    }

    /// The value as display/lookup text.
    pub fn to_text(&self) -> String {
        match self {
            QualityValue::Number(n) => crate::content::format_number(*n),
            QualityValue::Id(s) => s.clone(),
        }
    }
}

impl From<f64> for QualityValue {
    fn from(value: f64) -> Self {
        QualityValue::Number(value)
    }
}

impl From<i64> for QualityValue {
    fn from(value: i64) -> Self {
        QualityValue::Number(value as f64)
    }
}

impl From<&str> for QualityValue {
    fn from(value: &str) -> Self {
        QualityValue::Id(value.to_string())
    }
}

impl From<String> for QualityValue {
    fn from(value: String) -> Self {
        QualityValue::Id(value)
    }
}

/// Declared metadata governing a quality.
#[derive(Debug, Clone, Default)]
pub struct QualityDef {
    /// Inclusive lower bound for numeric values.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values.
    pub max: Option<f64>,
    /// Value seeded at game start (and on state load) when unset.
    pub initial: Option<QualityValue>,
    /// Change-signal name; falls back to the game-wide quality signal.
    pub signal: Option<String>,
    /// Validity predicate; a rejected write rolls back. Defaults to valid
    /// when absent or failing.
    pub is_valid: Option<Predicate>,
}

impl QualityDef {
    /// An unconstrained quality definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusive lower bound.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the inclusive upper bound.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the initial value.
    pub fn with_initial(mut self, initial: impl Into<QualityValue>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    /// Set the change-signal name.
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Set the validity predicate.
    pub fn with_validity(mut self, predicate: Predicate) -> Self {
        self.is_valid = Some(predicate);
        self
    }

    /// Clamp a numeric value into the declared bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut value = value;
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value
    }
}

/// The live quality table, stored in the game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Qualities(BTreeMap<String, QualityValue>);

impl Qualities {
    /// Look up a value.
    pub fn get(&self, id: &str) -> Option<&QualityValue> {
        self.0.get(id)
    }

    /// The numeric reading of a quality; unset or id-valued reads as 0.
    pub fn number(&self, id: &str) -> f64 {
        self.get(id).and_then(QualityValue::as_number).unwrap_or(0.0)
    }

    /// Whether a quality has any value.
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Write a value directly, bypassing bounds, validity, and signals.
    ///
    /// Used for achievement quasi-qualities and save restoration; story
    /// writes should go through [`QualityAccess::set`].
    pub fn insert_raw(&mut self, id: impl Into<String>, value: impl Into<QualityValue>) {
        self.0.insert(id.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&mut self, id: &str) -> Option<QualityValue> {
        self.0.remove(id)
    }

    /// Iterate over all qualities in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &QualityValue)> {
        self.0.iter()
    }

    /// Number of qualities with a value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A write handle over the quality table that enforces the set protocol.
///
/// Change signals are collected rather than delivered directly; the engine
/// forwards them to the presentation interface after the write completes.
pub struct QualityAccess<'a> {
    game: &'a GameDefinition,
    state: &'a mut GameState,
    signals: &'a mut Vec<SignalPayload>,
}

impl<'a> QualityAccess<'a> {
    pub(crate) fn new(
        game: &'a GameDefinition,
        state: &'a mut GameState,
        signals: &'a mut Vec<SignalPayload>,
    ) -> Self {
        Self {
            game,
            state,
            signals,
        }
    }

    /// Read access to the whole game state.
    pub fn state(&self) -> &GameState {
        self.state
    }

    /// Look up a quality value.
    pub fn get(&self, id: &str) -> Option<&QualityValue> {
        self.state.qualities.get(id)
    }

    /// The numeric reading of a quality; unset or id-valued reads as 0.
    pub fn number(&self, id: &str) -> f64 {
        self.state.qualities.number(id)
    }

    /// Assign a quality through the full protocol.
    ///
    /// Numeric values clamp into declared bounds before commit. A validity
    /// predicate that rejects the committed value rolls it back. When the
    /// committed value differs from the previous one and a signal name is
    /// in scope, a `quality-change` signal is recorded (`was` omitted when
    /// the quality was previously unset).
    pub fn set(&mut self, id: &str, value: impl Into<QualityValue>) {
        let mut value = value.into();
        let def = self.game.qualities.get(id);
        let signal_name = def
            .and_then(|d| d.signal.clone())
            .or_else(|| self.game.quality_signal.clone());
        let governed = def.is_some_and(|d| {
            d.min.is_some() || d.max.is_some() || d.is_valid.is_some() || signal_name.is_some()
        });
        if !governed {
            self.state.qualities.insert_raw(id, value);
            return;
        }

        if let Some(d) = def
            && let QualityValue::Number(n) = value
        {
            value = QualityValue::Number(d.clamp(n));
        }

        let was = self.state.qualities.get(id).cloned();
        self.state.qualities.insert_raw(id, value);

        if let Some(predicate) = def.and_then(|d| d.is_valid.as_ref())
            && !predicate.run(self.state, &self.state.qualities, true)
        {
            match was.clone() {
                Some(previous) => self.state.qualities.insert_raw(id, previous),
                None => {
                    self.state.qualities.remove(id);
                }
            }
        }

        let now = self.state.qualities.get(id).cloned();
        if let Some(signal) = signal_name
            && now != was
            && let Some(now) = now
        {
            let mut payload = SignalPayload::new(signal, SignalEvent::QualityChange, id)
                .with_now(now);
            if let Some(was) = was {
                payload = payload.with_was(was);
            }
            self.signals.push(payload);
        }
    }

    /// Seed declared initial values for qualities that have none yet.
    ///
    /// Runs at game start and on state load; seeding goes through the full
    /// protocol, so change signals fire for seeded values.
    pub(crate) fn seed_initials(&mut self) {
        let seeds: Vec<(String, QualityValue)> = self
            .game
            .qualities
            .iter()
            .filter_map(|(id, def)| {
                if self.state.qualities.contains(id) {
                    None
                } else {
                    def.initial.clone().map(|initial| (id.clone(), initial))
                }
            })
            .collect();
        for (id, initial) in seeds {
            self.set(&id, initial);
        }
    }
}
