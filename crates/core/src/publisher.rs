//! Published widgets rendered outside the builder.
//!
//! Other product modules ("target modules") show the widgets whose
//! `publishTargets` name them. This read path is independent of any edit
//! session: it fetches committed widgets and renders a generic preview.
//! Full chart drawing belongs to the charting collaborator, which receives
//! a [`ChartSeries`].

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreResult;
use crate::ids::IdGenerator;
use crate::mount::MountToken;
use crate::payload::{number, scalar_text};
use crate::services::WidgetFeed;
use crate::types::Row;
use crate::widget::WidgetDefinition;

/// Rows shown by a list preview.
pub const LIST_PREVIEW_ROWS: usize = 4;

/// Shown when a value is missing.
pub const VALUE_PLACEHOLDER: &str = "—";

/// Shown when a target module has no published widgets.
pub const EMPTY_PANEL_MESSAGE: &str = "No widgets published to this module yet";

// ---------------------------------------------------------------------------
// Preview model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewBody {
    /// A single number from the first row.
    Kpi { value: String },
    /// Up to [`LIST_PREVIEW_ROWS`] label/value pairs.
    List { items: Vec<PreviewItem> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetPreview {
    pub widget_id: String,
    pub title: String,
    pub subtitle: String,
    pub body: PreviewBody,
}

impl WidgetPreview {
    pub fn render(widget: &WidgetDefinition) -> Self {
        let body = if widget.chart_type.is_kpi() {
            PreviewBody::Kpi {
                value: widget
                    .data
                    .first()
                    .map(|row| cell(row, &widget.aggregate_field))
                    .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string()),
            }
        } else {
            PreviewBody::List {
                items: widget
                    .data
                    .iter()
                    .take(LIST_PREVIEW_ROWS)
                    .map(|row| PreviewItem {
                        label: cell(row, &widget.group_by),
                        value: cell(row, &widget.aggregate_field),
                    })
                    .collect(),
            }
        };

        Self {
            widget_id: widget.id.clone(),
            title: widget.title.clone(),
            subtitle: format!("{} · {}", widget.object_label, widget.aggregate),
            body,
        }
    }
}

/// Everything a target module shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPanel {
    pub target: String,
    pub widgets: Vec<WidgetPreview>,
}

impl PublishedPanel {
    /// No matching widgets is a normal state, shown with
    /// [`EMPTY_PANEL_MESSAGE`].
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(EMPTY_PANEL_MESSAGE)
    }
}

fn cell(row: &Row, field: &str) -> String {
    match row.get(field) {
        Some(Value::Bool(b)) => b.to_string(),
        Some(value) => scalar_text(value).unwrap_or_else(|| VALUE_PLACEHOLDER.to_string()),
        None => VALUE_PLACEHOLDER.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// Input for the charting collaborator: `render(labels, series)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    /// One value per label; non-numeric cells become `None`.
    pub values: Vec<Option<f64>>,
}

impl ChartSeries {
    pub fn from_widget(widget: &WidgetDefinition) -> Self {
        let (labels, values): (Vec<String>, Vec<Option<f64>>) = widget
            .data
            .iter()
            .map(|row| {
                let value = row.get(&widget.aggregate_field).and_then(number);
                (cell(row, &widget.group_by), value)
            })
            .unzip();
        Self { labels, values }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Fetches and renders the widgets published to a target module.
pub struct WidgetLoader<'a> {
    feed: &'a dyn WidgetFeed,
    ids: &'a dyn IdGenerator,
}

impl<'a> WidgetLoader<'a> {
    pub fn new(feed: &'a dyn WidgetFeed, ids: &'a dyn IdGenerator) -> Self {
        Self { feed, ids }
    }

    /// Fetch the widgets for `target` and render their previews.
    ///
    /// Only widgets whose publish targets contain `target` are rendered.
    /// A widget with no targets is builder-only and never shown here.
    pub async fn load(&self, target: &str) -> CoreResult<PublishedPanel> {
        let payload = self.feed.widgets_for_target(target).await?;
        let widgets: Vec<WidgetPreview> = payload
            .into_widgets(self.ids)
            .iter()
            .filter(|w| w.is_published_to(target))
            .map(WidgetPreview::render)
            .collect();

        tracing::debug!(
            target_module = %target,
            widgets = widgets.len(),
            "Published widgets loaded",
        );
        Ok(PublishedPanel {
            target: target.to_string(),
            widgets,
        })
    }

    /// Like [`load`](Self::load), but returns `Ok(None)` when the view
    /// was unmounted before the response arrived.
    pub async fn load_mounted(
        &self,
        target: &str,
        mount: &MountToken,
    ) -> CoreResult<Option<PublishedPanel>> {
        let panel = self.load(target).await?;
        Ok(mount.apply(panel))
    }

    /// Load several target modules concurrently. Each result is
    /// independent; one failing module does not affect the others.
    pub async fn load_targets(
        &self,
        targets: &[&str],
    ) -> Vec<(String, CoreResult<PublishedPanel>)> {
        let results = join_all(targets.iter().map(|target| self.load(target))).await;
        targets
            .iter()
            .map(|t| t.to_string())
            .zip(results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::ids::SequentialIds;
    use crate::mount::MountFlag;
    use crate::test_support::{row, FakeFeed};
    use crate::widget::{Aggregate, ChartType};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn widget(chart_type: ChartType, data: Vec<Row>) -> WidgetDefinition {
        WidgetDefinition {
            id: "w1".into(),
            title: "Receita".into(),
            chart_type,
            object_id: "m1".into(),
            object_label: "Vendas".into(),
            group_by: "mes".into(),
            aggregate: Aggregate::Sum,
            aggregate_field: "valor".into(),
            data,
            publish_targets: Default::default(),
        }
    }

    fn monthly_rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| row(json!({ "mes": format!("m{i}"), "valor": i * 10 })))
            .collect()
    }

    // -- previews --

    #[test]
    fn kpi_shows_first_row_value() {
        let preview = WidgetPreview::render(&widget(ChartType::Kpi, monthly_rows(3)));
        assert_eq!(preview.body, PreviewBody::Kpi { value: "0".into() });
        assert_eq!(preview.subtitle, "Vendas · SUM");
    }

    #[test]
    fn kpi_without_rows_shows_placeholder() {
        let preview = WidgetPreview::render(&widget(ChartType::Kpi, vec![]));
        assert_eq!(preview.body, PreviewBody::Kpi { value: VALUE_PLACEHOLDER.into() });

        let missing_field = vec![row(json!({ "mes": "jan" }))];
        let preview = WidgetPreview::render(&widget(ChartType::Kpi, missing_field));
        assert_eq!(preview.body, PreviewBody::Kpi { value: VALUE_PLACEHOLDER.into() });
    }

    #[test]
    fn charts_show_first_four_rows() {
        for chart_type in [ChartType::Bar, ChartType::Line, ChartType::Pie] {
            let preview = WidgetPreview::render(&widget(chart_type, monthly_rows(6)));
            let PreviewBody::List { items } = preview.body else {
                panic!("expected list preview for {chart_type:?}");
            };
            assert_eq!(items.len(), LIST_PREVIEW_ROWS);
            assert_eq!(items[3], PreviewItem { label: "m3".into(), value: "30".into() });
        }
    }

    #[test]
    fn chart_series_extracts_numeric_values() {
        let mut data = monthly_rows(2);
        data.push(row(json!({ "mes": "x", "valor": "n/a" })));
        let series = ChartSeries::from_widget(&widget(ChartType::Line, data));
        assert_eq!(series.labels, vec!["m0", "m1", "x"]);
        assert_eq!(series.values, vec![Some(0.0), Some(10.0), None]);
    }

    // -- loader --

    #[tokio::test]
    async fn unmatched_target_renders_empty_state() {
        let feed = FakeFeed::default();
        let ids = SequentialIds::new();
        let panel = WidgetLoader::new(&feed, &ids).load("painel-rh").await.unwrap();
        assert!(panel.is_empty());
        assert_eq!(panel.empty_message(), Some(EMPTY_PANEL_MESSAGE));
    }

    #[tokio::test]
    async fn loader_filters_by_publish_target() {
        let feed = FakeFeed::default().with_target(
            "painel-vendas",
            json!({ "widgets": [
                { "id": "a", "chartType": "kpi", "aggregateField": "total",
                  "publishTargets": ["painel-vendas"], "data": [{ "total": 99 }] },
                { "id": "b", "publishTargets": ["painel-marketing"] },
                { "id": "c" }
            ]}),
        );
        let ids = SequentialIds::new();
        let panel = WidgetLoader::new(&feed, &ids).load("painel-vendas").await.unwrap();
        let ids: Vec<&str> = panel.widgets.iter().map(|w| w.widget_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(panel.widgets[0].body, PreviewBody::Kpi { value: "99".into() });
        assert!(panel.empty_message().is_none());
    }

    #[tokio::test]
    async fn builder_only_widgets_are_never_rendered() {
        let feed = FakeFeed::default().with_target(
            "painel-vendas",
            json!({ "widgets": [{ "id": "builder-only", "publishTargets": [] }] }),
        );
        let ids = SequentialIds::new();
        let panel = WidgetLoader::new(&feed, &ids).load("painel-vendas").await.unwrap();
        assert!(panel.is_empty());
        assert_eq!(panel.empty_message(), Some(EMPTY_PANEL_MESSAGE));
    }

    #[tokio::test]
    async fn load_targets_isolates_failures() {
        let feed = FakeFeed::default()
            .with_target(
                "painel-vendas",
                json!([{ "id": "a", "publishTargets": ["painel-vendas"] }]),
            )
            .failing_for("painel-marketing");
        let ids = SequentialIds::new();
        let results = WidgetLoader::new(&feed, &ids)
            .load_targets(&["painel-vendas", "painel-marketing"])
            .await;
        assert_eq!(results[0].0, "painel-vendas");
        assert_eq!(results[0].1.as_ref().unwrap().widgets.len(), 1);
        assert_matches!(results[1].1, Err(CoreError::Service(_)));
    }

    #[tokio::test]
    async fn load_mounted_discards_after_unmount() {
        let feed = FakeFeed::default();
        let ids = SequentialIds::new();
        let loader = WidgetLoader::new(&feed, &ids);
        let flag = MountFlag::new();
        let token = flag.token();
        assert!(loader.load_mounted("x", &token).await.unwrap().is_some());
        drop(flag);
        assert!(loader.load_mounted("x", &token).await.unwrap().is_none());
    }
}
