//! Boundary between duck-typed backend JSON and validated domain values.
//!
//! Every gateway hands back a [`RawPayload`]; nothing else in the crate
//! inspects untyped JSON. Conversion never fails: malformed entries are
//! dropped and missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dashboard::{self, Dashboard, SavedDashboard};
use crate::ids::IdGenerator;
use crate::layout::{self, LayoutEntry};
use crate::meta_object::{self, MetaObject};
use crate::types::Row;
use crate::widget::{self, WidgetDefinition};

/// Unvalidated JSON as received from a backend service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(pub Value);

impl RawPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_meta_objects(self) -> Vec<MetaObject> {
        meta_object::normalize_meta_objects(&self.0)
    }

    pub fn into_widgets(self, ids: &dyn IdGenerator) -> Vec<WidgetDefinition> {
        widget::normalize_widgets(&self.0, ids)
    }

    pub fn into_layout(self) -> Vec<LayoutEntry> {
        layout::normalize_layout(&self.0)
    }

    pub fn into_rows(self) -> Vec<Row> {
        widget::normalize_rows(&self.0)
    }

    /// Normalize a stored dashboard. The layout is reconciled against the
    /// normalized widgets before the value is returned.
    pub fn into_dashboard(self, ids: &dyn IdGenerator) -> Dashboard {
        dashboard::normalize_dashboard(&self.0, ids)
    }

    pub fn into_saved_dashboard(self) -> SavedDashboard {
        dashboard::normalize_saved(&self.0)
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Probing helpers shared by the normalizers
// ---------------------------------------------------------------------------

/// Maximum envelope depth searched by [`unwrap_list`], e.g. `{data: {rows: []}}`.
const MAX_ENVELOPE_DEPTH: usize = 3;

/// Locate the list inside a payload that is either a bare array or an
/// object wrapping it under one of `envelope_keys`.
pub(crate) fn unwrap_list<'a>(value: &'a Value, envelope_keys: &[&str]) -> &'a [Value] {
    unwrap_list_at(value, envelope_keys, 0)
}

fn unwrap_list_at<'a>(value: &'a Value, envelope_keys: &[&str], depth: usize) -> &'a [Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) if depth < MAX_ENVELOPE_DEPTH => envelope_keys
            .iter()
            .filter_map(|key| obj.get(*key))
            .map(|inner| unwrap_list_at(inner, envelope_keys, depth + 1))
            .find(|items| !items.is_empty())
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Locate the object inside a payload that may be wrapped as `{data: {...}}`.
pub(crate) fn unwrap_object<'a>(
    value: &'a Value,
    envelope_keys: &[&str],
) -> Option<&'a Map<String, Value>> {
    let obj = value.as_object()?;
    for key in envelope_keys {
        if let Some(inner) = obj.get(*key).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(obj)
}

/// First non-empty textual value among `keys`. Numbers are accepted and
/// rendered as strings so that numeric ids survive.
pub(crate) fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(scalar_text)
}

/// Render a scalar as trimmed, non-empty text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First array value among `keys`.
pub(crate) fn list<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_array))
}

/// Numeric value, accepting numeric strings.
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
