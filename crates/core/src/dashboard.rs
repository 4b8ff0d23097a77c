//! Dashboard model and persistence gateway.
//!
//! A [`Dashboard`] is owned client-side until saved. Its serialized form is
//! the document sent to the persistence service; `id` is omitted for a
//! dashboard that has never been saved, which is how the backend tells a
//! create from an update.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreResult;
use crate::ids::IdGenerator;
use crate::layout::{self, LayoutEntry};
use crate::payload::{text, unwrap_object};
use crate::services::DashboardStore;
use crate::widget::{self, WidgetDefinition};

/// Name used when a stored dashboard carries none.
pub const UNTITLED_DASHBOARD: &str = "Untitled dashboard";

const ENVELOPE_KEYS: &[&str] = &["data", "dashboard"];
const ID_KEYS: &[&str] = &["id", "_id", "dashboardId"];
const NAME_KEYS: &[&str] = &["name", "titulo", "nome", "title"];

/// A named set of widgets and their grid layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub widgets: Vec<WidgetDefinition>,
    /// One entry per widget. A `y` of [`layout::APPEND_ROW`] is a valid
    /// stored value meaning "append after everything else".
    #[serde(default)]
    pub layout: Vec<LayoutEntry>,
}

impl Dashboard {
    /// A new, unsaved dashboard.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            widgets: Vec::new(),
            layout: Vec::new(),
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

/// What the persistence service reports back after a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedDashboard {
    pub id: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a stored dashboard payload. Widgets go through the widget
/// normalizer and the layout is reconciled against them, so the result
/// satisfies both invariants before anyone can edit it.
pub fn normalize_dashboard(payload: &Value, ids: &dyn IdGenerator) -> Dashboard {
    let Some(obj) = unwrap_object(payload, ENVELOPE_KEYS) else {
        tracing::debug!("Dashboard payload is not an object, using an empty dashboard");
        return Dashboard::new(UNTITLED_DASHBOARD);
    };

    let widgets = obj
        .get("widgets")
        .map(|raw| widget::normalize_widgets(raw, ids))
        .unwrap_or_default();
    let stored_layout = obj
        .get("layout")
        .map(layout::normalize_layout)
        .unwrap_or_default();
    let layout = layout::reconcile(&widgets, &stored_layout);

    Dashboard {
        id: text(obj, ID_KEYS),
        name: text(obj, NAME_KEYS).unwrap_or_else(|| UNTITLED_DASHBOARD.to_string()),
        widgets,
        layout,
    }
}

/// Normalize a create/update response. Only the id is of interest.
pub fn normalize_saved(payload: &Value) -> SavedDashboard {
    SavedDashboard {
        id: unwrap_object(payload, ENVELOPE_KEYS).and_then(|obj| text(obj, ID_KEYS)),
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Load a dashboard and bring it into an editable state.
pub async fn load_dashboard(
    store: &dyn DashboardStore,
    id: &str,
    ids: &dyn IdGenerator,
) -> CoreResult<Dashboard> {
    let payload = store.load(id).await?;
    let mut dashboard = payload.into_dashboard(ids);
    // The path id is authoritative when the body omits it.
    if dashboard.id.is_none() {
        dashboard.id = Some(id.to_string());
    }
    tracing::debug!(
        dashboard_id = %id,
        widgets = dashboard.widgets.len(),
        "Dashboard loaded",
    );
    Ok(dashboard)
}

/// Create or update a dashboard depending on whether it has an id.
///
/// The returned [`SavedDashboard`] always carries an id for updates; for
/// creates it carries whatever the backend returned.
pub async fn persist_dashboard(
    store: &dyn DashboardStore,
    dashboard: &Dashboard,
) -> CoreResult<SavedDashboard> {
    let saved = match dashboard.id.as_deref() {
        Some(id) => {
            let mut saved = store.update(id, dashboard).await?.into_saved_dashboard();
            if saved.id.is_none() {
                saved.id = Some(id.to_string());
            }
            saved
        }
        None => store.create(dashboard).await?.into_saved_dashboard(),
    };

    tracing::info!(
        dashboard_id = saved.id.as_deref().unwrap_or("<unassigned>"),
        name = %dashboard.name,
        widgets = dashboard.widgets.len(),
        "Dashboard saved",
    );
    Ok(saved)
}
