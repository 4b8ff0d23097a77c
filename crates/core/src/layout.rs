//! Grid layout for dashboard widgets.
//!
//! The grid is 12 columns wide. A layout must always cover exactly the
//! current widget set: [`reconcile`] keeps user-chosen placements, drops
//! entries whose widget is gone and synthesizes placements for widgets
//! that have none.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{number, text, unwrap_list};
use crate::widget::{ChartType, WidgetDefinition};

// ---------------------------------------------------------------------------
// Grid constants
// ---------------------------------------------------------------------------

/// Number of grid columns.
pub const GRID_COLUMNS: u32 = 12;

/// Widgets placed per row when synthesizing a default layout.
pub const WIDGETS_PER_ROW: u32 = 3;

/// Horizontal step between synthesized placements.
pub const DEFAULT_COLUMN_STEP: u32 = 4;

/// Vertical step between synthesized rows.
pub const DEFAULT_ROW_STEP: u32 = 3;

/// Default size for chart widgets.
pub const CHART_SIZE: (u32, u32) = (6, 4);

/// Default size for KPI widgets.
pub const KPI_SIZE: (u32, u32) = (4, 3);

/// Row value meaning "after everything else". The grid component resolves
/// it to the first free row.
pub const APPEND_ROW: u32 = u32::MAX;

const ENVELOPE_KEYS: &[&str] = &["layout", "data"];
const WIDGET_ID_KEYS: &[&str] = &["widgetId", "i", "id", "widget_id"];

// ---------------------------------------------------------------------------
// Layout entry
// ---------------------------------------------------------------------------

/// Grid placement of one widget, in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEntry {
    #[serde(alias = "i")]
    pub widget_id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl LayoutEntry {
    /// Default placement for the widget at `index` in a fresh layout.
    pub fn synthesized(widget: &WidgetDefinition, index: usize) -> Self {
        let index = index as u32;
        let (w, h) = default_size(widget.chart_type);
        Self {
            widget_id: widget.id.clone(),
            x: (index * DEFAULT_COLUMN_STEP) % GRID_COLUMNS,
            y: (index / WIDGETS_PER_ROW) * DEFAULT_ROW_STEP,
            w,
            h,
        }
    }

    /// Placement for a widget appended during an edit session.
    pub fn appended(widget: &WidgetDefinition, index: usize) -> Self {
        Self {
            y: APPEND_ROW,
            ..Self::synthesized(widget, index)
        }
    }

    pub fn is_appended(&self) -> bool {
        self.y == APPEND_ROW
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let widget_id = text(obj, WIDGET_ID_KEYS)?;
        let coord = |key: &str| obj.get(key).and_then(number).map(to_grid_units);

        Some(Self {
            widget_id,
            x: coord("x")?,
            y: coord("y")?,
            w: coord("w")?.max(1),
            h: coord("h")?.max(1),
        })
    }
}

/// Default `(w, h)` for a chart type. KPIs are smaller.
pub fn default_size(chart_type: ChartType) -> (u32, u32) {
    if chart_type.is_kpi() {
        KPI_SIZE
    } else {
        CHART_SIZE
    }
}

fn to_grid_units(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        APPEND_ROW
    } else {
        value.trunc() as u32
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a stored layout array. Entries without a widget id or with
/// non-numeric coordinates are dropped; duplicate ids keep the first entry.
pub fn normalize_layout(payload: &Value) -> Vec<LayoutEntry> {
    let entries = unwrap_list(payload, ENVELOPE_KEYS);
    let mut seen = HashSet::new();
    let layout: Vec<LayoutEntry> = entries
        .iter()
        .filter_map(LayoutEntry::from_value)
        .filter(|entry| seen.insert(entry.widget_id.clone()))
        .collect();

    let dropped = entries.len() - layout.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = layout.len(), "Dropped unusable layout entries");
    }
    layout
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Produce a layout covering exactly `widgets`, in widget order.
///
/// Existing entries are kept verbatim. Widgets without an entry get a
/// synthesized placement based on their index. Entries for unknown
/// widgets are dropped. Reconciling an already reconciled layout returns
/// it unchanged.
pub fn reconcile(widgets: &[WidgetDefinition], layout: &[LayoutEntry]) -> Vec<LayoutEntry> {
    let mut existing: HashMap<&str, &LayoutEntry> = HashMap::with_capacity(layout.len());
    for entry in layout {
        existing.entry(entry.widget_id.as_str()).or_insert(entry);
    }

    widgets
        .iter()
        .enumerate()
        .map(|(index, widget)| match existing.get(widget.id.as_str()) {
            Some(entry) => (*entry).clone(),
            None => LayoutEntry::synthesized(widget, index),
        })
        .collect()
}

/// Whether `layout` already covers exactly `widgets` with one entry each.
pub fn is_consistent(widgets: &[WidgetDefinition], layout: &[LayoutEntry]) -> bool {
    if widgets.len() != layout.len() {
        return false;
    }
    let ids: HashSet<&str> = widgets.iter().map(|w| w.id.as_str()).collect();
    let mut seen = HashSet::with_capacity(layout.len());
    layout.iter().all(|entry| {
        let id = entry.widget_id.as_str();
        ids.contains(id) && seen.insert(id)
    })
}
