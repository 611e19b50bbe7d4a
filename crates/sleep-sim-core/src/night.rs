use crate::config::TieBreak;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sleep quality label of a night. Only `good` and `bad` move sleep debt;
/// unrecognised labels are kept verbatim for output and behave like
/// `moderate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NightStatus {
    Good,
    #[default]
    Moderate,
    Bad,
    Other(String),
}

impl NightStatus {
    pub fn from_label(label: &str) -> Self {
        match label {
            "good" => NightStatus::Good,
            "moderate" => NightStatus::Moderate,
            "bad" => NightStatus::Bad,
            other => NightStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NightStatus::Good => "good",
            NightStatus::Moderate => "moderate",
            NightStatus::Bad => "bad",
            NightStatus::Other(label) => label,
        }
    }

    /// Change applied to sleep debt for a night with this status.
    pub fn debt_delta(&self) -> i64 {
        match self {
            NightStatus::Bad => 1,
            NightStatus::Good => -1,
            NightStatus::Moderate | NightStatus::Other(_) => 0,
        }
    }
}

impl fmt::Display for NightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NightStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NightStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(NightStatus::from_label)
            .unwrap_or_default())
    }
}

/// Predicted effect of one intervention on the two indices.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionEffect {
    #[serde(rename = "dCSI")]
    pub delta_primary: f64,
    #[serde(rename = "dCStab")]
    pub delta_stability: f64,
}

impl ActionEffect {
    pub fn new(delta_primary: f64, delta_stability: f64) -> Self {
        Self {
            delta_primary,
            delta_stability,
        }
    }
}

/// Candidate actions of one night, kept in input order.
///
/// A JSON object is read entry by entry so the order of the source file
/// survives deserialization. A repeated key keeps its first position and
/// takes the last value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionEffects {
    entries: Vec<(String, ActionEffect)>,
}

impl ActionEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an action. Replacing keeps the original position.
    ///
    /// Lookup is a linear scan; a night carries a handful of candidate
    /// actions, so no side index is kept.
    pub fn insert(&mut self, name: impl Into<String>, effect: ActionEffect) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = effect,
            None => self.entries.push((name, effect)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ActionEffect> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, effect)| effect)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionEffect)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Candidates in the evaluation order selected by `tie_break`.
    pub fn ordered(&self, tie_break: TieBreak) -> Vec<(&str, &ActionEffect)> {
        let mut candidates: Vec<_> = self.iter().collect();
        if tie_break == TieBreak::Lexicographic {
            // Stable sort keeps the input order for identical names.
            candidates.sort_by(|a, b| a.0.cmp(b.0));
        }
        candidates
    }
}

impl<N: Into<String>> FromIterator<(N, ActionEffect)> for ActionEffects {
    fn from_iter<I: IntoIterator<Item = (N, ActionEffect)>>(iter: I) -> Self {
        let mut effects = ActionEffects::new();
        for (name, effect) in iter {
            effects.insert(name, effect);
        }
        effects
    }
}

impl Serialize for ActionEffects {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, effect) in &self.entries {
            map.serialize_entry(name, effect)?;
        }
        map.end()
    }
}

struct ActionEffectsVisitor;

impl<'de> Visitor<'de> for ActionEffectsVisitor {
    type Value = ActionEffects;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of action name to {dCSI, dCStab}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut effects = ActionEffects::new();
        while let Some((name, effect)) = access.next_entry::<String, ActionEffect>()? {
            effects.insert(name, effect);
        }
        Ok(effects)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(ActionEffects::new())
    }
}

impl<'de> Deserialize<'de> for ActionEffects {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ActionEffectsVisitor)
    }
}

fn default_night_label() -> String {
    crate::constants::UNKNOWN_NIGHT_LABEL.to_string()
}

/// Night labels are opaque: strings pass through, other scalars keep their
/// JSON text.
fn deserialize_night_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => default_night_label(),
        other => other.to_string(),
    })
}

/// One night of input data for a subject.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NightRecord {
    #[serde(
        default = "default_night_label",
        deserialize_with = "deserialize_night_label"
    )]
    pub night_index: String,
    #[serde(default)]
    pub night_status: NightStatus,
    #[serde(default)]
    pub action_effects: ActionEffects,
    /// Starting CSI; read from the first night only.
    #[serde(default, rename = "CSI", skip_serializing_if = "Option::is_none")]
    pub initial_primary: Option<f64>,
    /// Starting CStab; read from the first night only.
    #[serde(default, rename = "CStab", skip_serializing_if = "Option::is_none")]
    pub initial_stability: Option<f64>,
}

impl NightRecord {
    pub fn new(
        night_index: impl Into<String>,
        night_status: NightStatus,
        action_effects: ActionEffects,
    ) -> Self {
        Self {
            night_index: night_index.into(),
            night_status,
            action_effects,
            initial_primary: None,
            initial_stability: None,
        }
    }

    pub fn with_initial_state(mut self, primary: f64, stability: f64) -> Self {
        self.initial_primary = Some(primary);
        self.initial_stability = Some(stability);
        self
    }
}
