//! Dashboard canvas: the live edit session.
//!
//! [`DashboardCanvas`] is the single state store for a dashboard being
//! edited. Widgets and layout are only ever changed together, so a removed
//! widget can never leave a layout entry behind. Every way of building a
//! canvas reconciles the layout first, so the invariants hold before the
//! first mutation.

use serde::Serialize;

use crate::dashboard::{self, Dashboard, SavedDashboard};
use crate::error::{CoreError, CoreResult};
use crate::ids::IdGenerator;
use crate::layout::{self, LayoutEntry};
use crate::mount::MountToken;
use crate::payload::RawPayload;
use crate::services::DashboardStore;
use crate::types::Timestamp;
use crate::widget::WidgetDefinition;
use crate::wizard::WidgetWizard;

/// How long a notice stays visible unless dismissed earlier.
pub const DEFAULT_NOTICE_TTL_SECS: i64 = 6;

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient, dismissible message shown above the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: Timestamp,
}

impl Notice {
    pub fn is_expired(&self, now: Timestamp, ttl: chrono::Duration) -> bool {
        now - self.raised_at >= ttl
    }
}

// ---------------------------------------------------------------------------
// Save requests
// ---------------------------------------------------------------------------

/// Snapshot handed to the persistence gateway by [`DashboardCanvas::begin_save`].
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub request_id: u64,
    pub dashboard: Dashboard,
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DashboardCanvas {
    dashboard: Dashboard,
    wizard: Option<WidgetWizard>,
    save_in_flight: Option<u64>,
    next_request_id: u64,
    notices: Vec<Notice>,
    next_notice_id: u64,
}

impl DashboardCanvas {
    /// Start editing a new, unsaved dashboard.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_dashboard(Dashboard::new(name))
    }

    /// Start editing an existing dashboard. The layout is reconciled
    /// against the widgets before the canvas is returned.
    pub fn from_dashboard(mut dashboard: Dashboard) -> Self {
        dashboard.layout = layout::reconcile(&dashboard.widgets, &dashboard.layout);
        Self {
            dashboard,
            wizard: None,
            save_in_flight: None,
            next_request_id: 1,
            notices: Vec::new(),
            next_notice_id: 1,
        }
    }

    /// Build a canvas from a stored dashboard payload.
    pub fn from_payload(payload: RawPayload, ids: &dyn IdGenerator) -> Self {
        Self::from_dashboard(payload.into_dashboard(ids))
    }

    /// Load a dashboard for editing. Returns `Ok(None)` when the view that
    /// asked for it was unmounted while the request was in flight.
    pub async fn open(
        store: &dyn DashboardStore,
        id: &str,
        ids: &dyn IdGenerator,
        mount: &MountToken,
    ) -> CoreResult<Option<Self>> {
        let loaded = dashboard::load_dashboard(store, id, ids).await?;
        Ok(mount.apply(loaded).map(Self::from_dashboard))
    }

    // -- accessors --

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn widgets(&self) -> &[WidgetDefinition] {
        &self.dashboard.widgets
    }

    /// Layout as last reported by the grid.
    pub fn layout(&self) -> &[LayoutEntry] {
        &self.dashboard.layout
    }

    /// Layout to hand to the grid for rendering, reconciled against the
    /// current widgets.
    pub fn render_layout(&self) -> Vec<LayoutEntry> {
        layout::reconcile(&self.dashboard.widgets, &self.dashboard.layout)
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetDefinition> {
        self.dashboard.widgets.iter().find(|w| w.id == id)
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight.is_some()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.dashboard.name = name.into();
    }

    // -- wizard --

    pub fn open_wizard(&mut self) -> &mut WidgetWizard {
        self.wizard.get_or_insert_with(WidgetWizard::new)
    }

    pub fn wizard(&self) -> Option<&WidgetWizard> {
        self.wizard.as_ref()
    }

    pub fn wizard_mut(&mut self) -> Option<&mut WidgetWizard> {
        self.wizard.as_mut()
    }

    pub fn close_wizard(&mut self) {
        self.wizard = None;
    }

    // -- mutations --

    /// Append a widget, give it a placement after everything else and
    /// close the wizard.
    pub fn add_widget(&mut self, widget: WidgetDefinition) -> CoreResult<()> {
        if self.widget(&widget.id).is_some() {
            return Err(CoreError::Conflict(format!(
                "A widget with id '{}' is already on this dashboard",
                widget.id
            )));
        }

        let entry = LayoutEntry::appended(&widget, self.dashboard.widgets.len());
        tracing::info!(widget_id = %widget.id, title = %widget.title, "Widget added");
        self.dashboard.widgets.push(widget);
        self.dashboard.layout.push(entry);
        self.wizard = None;
        Ok(())
    }

    /// Remove a widget and its layout entry. Returns whether anything was
    /// removed.
    pub fn remove_widget(&mut self, id: &str) -> bool {
        let before = self.dashboard.widgets.len();
        self.dashboard.widgets.retain(|w| w.id != id);
        self.dashboard.layout.retain(|e| e.widget_id != id);

        let removed = self.dashboard.widgets.len() != before;
        if removed {
            tracing::info!(widget_id = %id, "Widget removed");
        }
        removed
    }

    /// Replace the layout with what the grid reported after a drag or
    /// resize. The grid enforces bounds and collisions; stale entries are
    /// filtered by [`render_layout`](Self::render_layout) and on save.
    pub fn move_or_resize(&mut self, layout: Vec<LayoutEntry>) {
        self.dashboard.layout = layout;
    }

    // -- saving --

    /// Start a save. Rejected with [`CoreError::Conflict`] while another
    /// save is in flight. Editing may continue until the matching
    /// [`finish_save`](Self::finish_save).
    ///
    /// The snapshot carries the reconciled layout. Entries still at
    /// [`APPEND_ROW`](layout::APPEND_ROW) because the grid has not yet
    /// reported a placement are sent as is; the stored value keeps meaning
    /// "after everything else" and the grid resolves it on the next load.
    pub fn begin_save(&mut self) -> CoreResult<SaveRequest> {
        if self.save_in_flight.is_some() {
            return Err(CoreError::Conflict("A save is already in progress".into()));
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.save_in_flight = Some(request_id);

        let mut snapshot = self.dashboard.clone();
        snapshot.layout = self.render_layout();
        Ok(SaveRequest {
            request_id,
            dashboard: snapshot,
        })
    }

    /// Apply the outcome of a save. Outcomes for a request other than the
    /// one in flight are ignored; returns whether it was applied.
    pub fn finish_save(&mut self, request_id: u64, outcome: &CoreResult<SavedDashboard>) -> bool {
        if self.save_in_flight != Some(request_id) {
            tracing::debug!(request_id, "Ignoring stale save outcome");
            return false;
        }
        self.save_in_flight = None;

        match outcome {
            Ok(saved) => {
                if self.dashboard.id.is_none() {
                    self.dashboard.id = saved.id.clone();
                }
                self.push_notice(NoticeLevel::Success, "Dashboard saved".to_string());
            }
            Err(err) => {
                tracing::warn!(error = %err, "Dashboard save failed");
                self.push_notice(
                    NoticeLevel::Error,
                    format!("Could not save the dashboard: {}", err.user_message()),
                );
            }
        }
        true
    }

    /// Save through `store` in one go. Failures are also surfaced as an
    /// error notice; nothing is retried.
    pub async fn save(&mut self, store: &dyn DashboardStore) -> CoreResult<()> {
        let request = self.begin_save()?;
        let outcome = dashboard::persist_dashboard(store, &request.dashboard).await;
        self.finish_save(request.request_id, &outcome);
        outcome.map(|_| ())
    }

    // -- notices --

    pub fn dismiss_notice(&mut self, id: u64) {
        self.notices.retain(|n| n.id != id);
    }

    /// Drop notices older than `ttl`.
    pub fn expire_notices(&mut self, now: Timestamp, ttl: chrono::Duration) {
        self.notices.retain(|n| !n.is_expired(now, ttl));
    }

    fn push_notice(&mut self, level: NoticeLevel, message: String) {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice {
            id,
            level,
            message,
            raised_at: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::meta_object::MetaObject;
    use crate::mount::MountFlag;
    use crate::test_support::{FakeAggregation, FakeStore};
    use crate::widget::{Aggregate, ChartType};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn widget(id: &str, chart_type: ChartType) -> WidgetDefinition {
        WidgetDefinition {
            id: id.to_string(),
            title: id.to_string(),
            chart_type,
            object_id: "m1".into(),
            object_label: "Vendas".into(),
            group_by: "mes".into(),
            aggregate: Aggregate::Sum,
            aggregate_field: "valor".into(),
            data: Vec::new(),
            publish_targets: Default::default(),
        }
    }

    fn canvas_with(ids: &[&str]) -> DashboardCanvas {
        let mut canvas = DashboardCanvas::new("Teste");
        for id in ids {
            canvas.add_widget(widget(id, ChartType::Bar)).unwrap();
        }
        canvas
    }

    // -- construction --

    #[test]
    fn from_dashboard_reconciles_layout() {
        let mut dashboard = Dashboard::new("A");
        dashboard.widgets = vec![widget("a", ChartType::Bar), widget("b", ChartType::Kpi)];
        dashboard.layout = vec![LayoutEntry {
            widget_id: "zombie".into(),
            x: 0,
            y: 0,
            w: 1,
            h: 1,
        }];
        let canvas = DashboardCanvas::from_dashboard(dashboard);
        assert!(layout::is_consistent(canvas.widgets(), canvas.layout()));
    }

    #[tokio::test]
    async fn open_discards_result_after_unmount() {
        let store = FakeStore::with_load(json!({ "name": "X", "widgets": [] }));
        let ids = SequentialIds::new();

        let flag = MountFlag::new();
        let opened = DashboardCanvas::open(&store, "d1", &ids, &flag.token()).await.unwrap();
        assert_eq!(opened.unwrap().dashboard().id.as_deref(), Some("d1"));

        flag.unmount();
        let discarded = DashboardCanvas::open(&store, "d1", &ids, &flag.token()).await.unwrap();
        assert!(discarded.is_none());
    }

    // -- add / remove --

    #[tokio::test]
    async fn add_widget_appends_after_everything_and_closes_wizard() {
        let mut canvas = DashboardCanvas::new("Teste");
        let service = FakeAggregation::returning(vec![]);
        let ids = SequentialIds::new();

        let wizard = canvas.open_wizard();
        wizard.select_source(MetaObject {
            meta_id: "m1".into(),
            id_objeto: "vendas".into(),
            nome_amigavel: "Vendas".into(),
            tipo: Default::default(),
            fields: vec!["mes".into(), "valor".into()],
        });
        wizard.next().unwrap();
        wizard.select_chart_type(ChartType::Kpi);
        wizard.next().unwrap();
        wizard.set_group_by("mes");
        wizard.set_aggregate_field("valor");
        let created = wizard.confirm(&service, &ids).await.unwrap();

        canvas.add_widget(created).unwrap();
        assert!(canvas.wizard().is_none());
        assert_eq!(canvas.widgets().len(), 1);
        let entry = &canvas.layout()[0];
        assert!(entry.is_appended());
        assert_eq!((entry.w, entry.h), (4, 3));
    }

    #[test]
    fn add_widget_rejects_duplicate_ids() {
        let mut canvas = canvas_with(&["a"]);
        assert_matches!(
            canvas.add_widget(widget("a", ChartType::Line)),
            Err(CoreError::Conflict(_))
        );
        assert_eq!(canvas.widgets().len(), 1);
        assert_eq!(canvas.layout().len(), 1);
    }

    #[test]
    fn remove_widget_removes_layout_entry_too() {
        let mut canvas = canvas_with(&["a", "b", "c"]);
        assert!(canvas.remove_widget("b"));
        assert_eq!(canvas.widgets().len(), 2);
        assert!(canvas.layout().iter().all(|e| e.widget_id != "b"));
        assert!(layout::is_consistent(canvas.widgets(), canvas.layout()));

        assert!(!canvas.remove_widget("b"));
        assert_eq!(canvas.layout().len(), 2);
    }

    // -- move / resize --

    #[test]
    fn move_or_resize_replaces_layout_and_render_guards_stale_entries() {
        let mut canvas = canvas_with(&["a", "b"]);
        canvas.move_or_resize(vec![
            LayoutEntry { widget_id: "a".into(), x: 6, y: 0, w: 6, h: 2 },
            LayoutEntry { widget_id: "b".into(), x: 0, y: 0, w: 6, h: 2 },
        ]);
        assert_eq!(canvas.layout()[0].x, 6);

        // A gesture reported for a layout that still contained a removed widget.
        canvas.remove_widget("b");
        canvas.move_or_resize(vec![
            LayoutEntry { widget_id: "a".into(), x: 0, y: 1, w: 6, h: 2 },
            LayoutEntry { widget_id: "b".into(), x: 6, y: 1, w: 6, h: 2 },
        ]);
        let rendered = canvas.render_layout();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].widget_id, "a");
        assert_eq!(rendered[0].y, 1);
    }

    // -- saving --

    #[tokio::test]
    async fn save_creates_then_updates() {
        let store = FakeStore::with_save_response(json!({ "data": { "id": "d42" } }));
        let mut canvas = canvas_with(&["a"]);

        canvas.save(&store).await.unwrap();
        assert_eq!(canvas.dashboard().id.as_deref(), Some("d42"));
        assert_eq!(store.creates(), 1);
        assert!(store.saved()[0].id.is_none());

        canvas.save(&store).await.unwrap();
        assert_eq!(store.updates(), 1);
        assert_eq!(store.saved()[1].id.as_deref(), Some("d42"));
        assert_eq!(canvas.notices().len(), 2);
        assert!(canvas.notices().iter().all(|n| n.level == NoticeLevel::Success));
    }

    #[tokio::test]
    async fn save_sends_only_consistent_layout() {
        let store = FakeStore::with_save_response(json!({}));
        let mut canvas = canvas_with(&["a"]);
        canvas.move_or_resize(vec![LayoutEntry {
            widget_id: "ghost".into(),
            x: 0,
            y: 0,
            w: 1,
            h: 1,
        }]);
        canvas.save(&store).await.unwrap();
        let sent = &store.saved()[0];
        assert!(layout::is_consistent(&sent.widgets, &sent.layout));
    }

    #[tokio::test]
    async fn unplaced_widgets_are_saved_with_append_row() {
        let store = FakeStore::with_save_response(json!({ "id": "d1" }));
        let mut canvas = canvas_with(&["a"]);
        canvas.save(&store).await.unwrap();

        let sent = &store.saved()[0];
        assert!(sent.layout[0].is_appended());
        let wire = serde_json::to_value(sent).unwrap();
        assert_eq!(wire["layout"][0]["y"], json!(layout::APPEND_ROW));

        let reloaded = RawPayload::new(wire).into_dashboard(&SequentialIds::new());
        assert!(reloaded.layout[0].is_appended());
    }

    #[tokio::test]
    async fn failed_save_surfaces_error_and_keeps_state() {
        let store = FakeStore::failing_saves();
        let mut canvas = canvas_with(&["a", "b"]);

        assert_matches!(canvas.save(&store).await, Err(CoreError::Service(_)));
        assert_eq!(canvas.widgets().len(), 2);
        assert!(canvas.dashboard().is_new());
        assert!(!canvas.is_saving());
        let notice = &canvas.notices()[0];
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("persistence unavailable"));

        canvas.dismiss_notice(notice.id);
        assert!(canvas.notices().is_empty());
    }

    #[test]
    fn second_save_while_in_flight_is_rejected() {
        let mut canvas = canvas_with(&["a"]);
        let first = canvas.begin_save().unwrap();
        assert!(canvas.is_saving());
        assert_matches!(canvas.begin_save(), Err(CoreError::Conflict(_)));

        // Editing continues while the save is pending.
        canvas.remove_widget("a");
        assert_eq!(first.dashboard.widgets.len(), 1);

        let saved = Ok(SavedDashboard { id: Some("d1".into()) });
        assert!(!canvas.finish_save(first.request_id + 1, &saved));
        assert!(canvas.is_saving());
        assert!(canvas.finish_save(first.request_id, &saved));
        assert!(!canvas.is_saving());
        assert!(canvas.begin_save().is_ok());
    }

    #[test]
    fn notices_expire_after_ttl() {
        let mut canvas = canvas_with(&[]);
        let request = canvas.begin_save().unwrap();
        canvas.finish_save(request.request_id, &Ok(SavedDashboard::default()));
        let raised = canvas.notices()[0].raised_at;
        let ttl = chrono::Duration::seconds(DEFAULT_NOTICE_TTL_SECS);

        canvas.expire_notices(raised + chrono::Duration::seconds(1), ttl);
        assert_eq!(canvas.notices().len(), 1);
        canvas.expire_notices(raised + ttl, ttl);
        assert!(canvas.notices().is_empty());
    }
}
