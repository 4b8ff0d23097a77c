//! Widget definitions: one chart or KPI plus a snapshot of its rows.
//!
//! Widgets loaded from a saved dashboard go through [`normalize_widgets`],
//! which tolerates every legacy field name the backend has used and
//! guarantees a non-empty `id` and `objectId` on every result.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::IdGenerator;
use crate::payload::{list, scalar_text, text, unwrap_list};
use crate::types::Row;

/// Prefix used when minting widget ids.
pub const WIDGET_ID_PREFIX: &str = "widget";

/// Title used when a stored widget carries none.
pub const UNTITLED_WIDGET: &str = "Untitled widget";

const ENVELOPE_KEYS: &[&str] = &["widgets", "data"];
const ROW_ENVELOPE_KEYS: &[&str] = &["rows", "data", "dados", "result", "resultado"];

const ID_KEYS: &[&str] = &["id", "widgetId", "widget_id", "_id"];
const TITLE_KEYS: &[&str] = &["title", "titulo", "name", "nome"];
const CHART_TYPE_KEYS: &[&str] = &["chartType", "chart_type", "tipoGrafico", "type"];
const OBJECT_ID_KEYS: &[&str] = &[
    "objectId", "object_id", "metaId", "meta_id", "idObjeto", "objeto",
];
const OBJECT_LABEL_KEYS: &[&str] = &["objectLabel", "object_label", "nomeAmigavel", "objectName"];
const GROUP_BY_KEYS: &[&str] = &["groupBy", "group_by", "xField", "eixoX"];
const AGGREGATE_KEYS: &[&str] = &["aggregate", "aggregation", "agregacao"];
const AGGREGATE_FIELD_KEYS: &[&str] = &[
    "aggregateField", "aggregate_field", "yField", "valueField", "eixoY",
];
const PUBLISH_TARGET_KEYS: &[&str] = &["publishTargets", "publish_targets", "targets", "modulos"];

// ---------------------------------------------------------------------------
// Chart type
// ---------------------------------------------------------------------------

/// Visual presentation of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Kpi,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [Self::Bar, Self::Line, Self::Pie, Self::Kpi];

    /// Parse a stored chart type, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "pie" => Some(Self::Pie),
            "kpi" => Some(Self::Kpi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Kpi => "kpi",
        }
    }

    /// KPIs show a single number and ignore the grouping field.
    pub fn is_kpi(self) -> bool {
        self == Self::Kpi
    }
}

// ---------------------------------------------------------------------------
// Aggregate function
// ---------------------------------------------------------------------------

/// Aggregation applied to `aggregateField` per `groupBy` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregate {
    #[default]
    Sum,
    Avg,
    Count,
}

impl Aggregate {
    pub const ALL: [Aggregate; 3] = [Self::Sum, Self::Avg, Self::Count];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "COUNT" => Some(Self::Count),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Widget definition
// ---------------------------------------------------------------------------

/// A persisted chart/KPI configuration plus its materialized rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    pub id: String,
    pub title: String,
    pub chart_type: ChartType,
    /// References [`MetaObject::meta_id`](crate::meta_object::MetaObject).
    pub object_id: String,
    /// Display name frozen at creation time.
    pub object_label: String,
    pub group_by: String,
    pub aggregate: Aggregate,
    pub aggregate_field: String,
    /// Snapshot of the aggregation result, not a live query.
    #[serde(default)]
    pub data: Vec<Row>,
    /// Target modules this widget is also rendered on. Empty means the
    /// widget only lives in the builder.
    #[serde(default)]
    pub publish_targets: BTreeSet<String>,
}

impl WidgetDefinition {
    /// Whether both axis fields are set, which is required for creation.
    pub fn is_complete(&self) -> bool {
        !self.group_by.trim().is_empty() && !self.aggregate_field.trim().is_empty()
    }

    pub fn is_published_to(&self, target: &str) -> bool {
        self.publish_targets.contains(target)
    }

    /// Parse one stored widget. `index` is its position in the stored
    /// list and backs the `objectId` fallback.
    pub fn from_value(value: &Value, index: usize, ids: &dyn IdGenerator) -> Option<Self> {
        let obj = value.as_object()?;

        let id = text(obj, ID_KEYS).unwrap_or_else(|| ids.next_id(WIDGET_ID_PREFIX));
        let chart_type = text(obj, CHART_TYPE_KEYS)
            .and_then(|raw| ChartType::parse(&raw))
            .unwrap_or_default();
        let object_id = text(obj, OBJECT_ID_KEYS).unwrap_or_else(|| format!("object-{index}"));
        let object_label = text(obj, OBJECT_LABEL_KEYS).unwrap_or_else(|| object_id.clone());
        let aggregate = text(obj, AGGREGATE_KEYS)
            .and_then(|raw| Aggregate::parse(&raw))
            .unwrap_or_default();

        Some(Self {
            id,
            title: text(obj, TITLE_KEYS).unwrap_or_else(|| UNTITLED_WIDGET.to_string()),
            chart_type,
            object_id,
            object_label,
            group_by: text(obj, GROUP_BY_KEYS).unwrap_or_default(),
            aggregate,
            aggregate_field: text(obj, AGGREGATE_FIELD_KEYS).unwrap_or_default(),
            data: rows_of(obj),
            publish_targets: publish_targets_of(obj),
        })
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a stored widget list. Non-object entries are dropped; every
/// other entry yields a widget with defaults filled in.
///
/// Ids are unique in the result: the first widget keeps a repeated id and
/// every later one gets a freshly minted id.
pub fn normalize_widgets(payload: &Value, ids: &dyn IdGenerator) -> Vec<WidgetDefinition> {
    let entries = unwrap_list(payload, ENVELOPE_KEYS);
    let mut widgets: Vec<WidgetDefinition> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| WidgetDefinition::from_value(entry, index, ids))
        .collect();

    let dropped = entries.len() - widgets.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = widgets.len(), "Dropped malformed widget entries");
    }

    dedupe_ids(&mut widgets, ids);
    widgets
}

fn dedupe_ids(widgets: &mut [WidgetDefinition], ids: &dyn IdGenerator) {
    let mut taken: HashSet<String> = widgets.iter().map(|w| w.id.clone()).collect();
    let mut seen = HashSet::with_capacity(widgets.len());

    for widget in widgets.iter_mut() {
        if seen.insert(widget.id.clone()) {
            continue;
        }
        let fresh = loop {
            let candidate = ids.next_id(WIDGET_ID_PREFIX);
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        tracing::debug!(
            duplicate = %widget.id,
            reassigned = %fresh,
            "Reassigned duplicate widget id",
        );
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());
        widget.id = fresh;
    }
}

/// Normalize a row payload into plain row objects, unwrapping `rows`,
/// `data` and similar envelopes and discarding non-object rows.
pub fn normalize_rows(payload: &Value) -> Vec<Row> {
    unwrap_list(payload, ROW_ENVELOPE_KEYS)
        .iter()
        .filter_map(|row| row.as_object().cloned())
        .collect()
}

fn rows_of(obj: &Map<String, Value>) -> Vec<Row> {
    ROW_ENVELOPE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .map(normalize_rows)
        .find(|rows| !rows.is_empty())
        .unwrap_or_default()
}

fn publish_targets_of(obj: &Map<String, Value>) -> BTreeSet<String> {
    list(obj, PUBLISH_TARGET_KEYS)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}
