//! Widget creation wizard.
//!
//! A strictly ordered three-step flow:
//!
//! 1. [`WizardStep::SourceSelection`]: pick a meta-object (required).
//! 2. [`WizardStep::ChartTypeSelection`]: pick a chart type (always has a default).
//! 3. [`WizardStep::FieldConfiguration`]: pick grouping field, aggregate and
//!    aggregated field, then confirm.
//!
//! Confirmation validates locally before anything goes over the network,
//! then makes exactly one call to the aggregation service. A failed call
//! leaves the wizard on step 3 with every selection intact.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::{CoreError, CoreResult};
use crate::ids::IdGenerator;
use crate::meta_object::MetaObject;
use crate::services::{AggregationRequest, AggregationService};
use crate::widget::{Aggregate, ChartType, WidgetDefinition, WIDGET_ID_PREFIX};

// ---------------------------------------------------------------------------
// Publish targets
// ---------------------------------------------------------------------------

/// Product modules a widget can be published to.
pub mod publish_targets {
    pub const SALES_PANEL: &str = "painel-vendas";
    pub const MARKETING_PANEL: &str = "painel-marketing";

    /// Targets preselected for every new widget.
    pub const DEFAULTS: &[&str] = &[SALES_PANEL, MARKETING_PANEL];
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The three steps of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SourceSelection,
    ChartTypeSelection,
    FieldConfiguration,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 3;

impl WizardStep {
    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::SourceSelection => 1,
            Self::ChartTypeSelection => 2,
            Self::FieldConfiguration => 3,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::SourceSelection => "Data source",
            Self::ChartTypeSelection => "Chart type",
            Self::FieldConfiguration => "Fields",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::SourceSelection => Some(Self::ChartTypeSelection),
            Self::ChartTypeSelection => Some(Self::FieldConfiguration),
            Self::FieldConfiguration => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Self::SourceSelection => None,
            Self::ChartTypeSelection => Some(Self::SourceSelection),
            Self::FieldConfiguration => Some(Self::ChartTypeSelection),
        }
    }
}

// ---------------------------------------------------------------------------
// Field selection
// ---------------------------------------------------------------------------

/// Axis configuration chosen on step 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct FieldSelection {
    #[validate(length(min = 1, message = "Choose a field to group by"))]
    pub group_by: String,
    pub aggregate: Aggregate,
    #[validate(length(min = 1, message = "Choose a field to aggregate"))]
    pub aggregate_field: String,
}

/// Join validator messages in a stable, field-declaration order.
fn validation_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    ["group_by", "aggregate_field"]
        .iter()
        .filter_map(|name| fields.get(*name))
        .flat_map(|errs| errs.iter())
        .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Wizard state machine
// ---------------------------------------------------------------------------

/// In-progress widget creation.
#[derive(Debug, Clone)]
pub struct WidgetWizard {
    step: WizardStep,
    source: Option<MetaObject>,
    chart_type: ChartType,
    fields: FieldSelection,
    title: Option<String>,
    publish_targets: BTreeSet<String>,
    error: Option<String>,
    submitting: bool,
}

impl Default for WidgetWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::SourceSelection,
            source: None,
            chart_type: ChartType::default(),
            fields: FieldSelection::default(),
            title: None,
            publish_targets: publish_targets::DEFAULTS.iter().map(|t| t.to_string()).collect(),
            error: None,
            submitting: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn source(&self) -> Option<&MetaObject> {
        self.source.as_ref()
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn fields(&self) -> &FieldSelection {
        &self.fields
    }

    pub fn publish_targets(&self) -> &BTreeSet<String> {
        &self.publish_targets
    }

    /// Inline error shown on the current step, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the aggregation call is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Field names offered by both axis pickers.
    pub fn field_options(&self) -> &[String] {
        self.source.as_ref().map(|s| s.fields.as_slice()).unwrap_or(&[])
    }

    // -- step 1 --

    /// Select the data source. Switching to a different source clears the
    /// field selections, since they belong to the previous object.
    pub fn select_source(&mut self, source: MetaObject) {
        let changed = self
            .source
            .as_ref()
            .map_or(true, |current| current.meta_id != source.meta_id);
        if changed {
            self.fields.group_by.clear();
            self.fields.aggregate_field.clear();
        }
        self.source = Some(source);
        self.error = None;
    }

    // -- step 2 --

    pub fn select_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
    }

    // -- step 3 --

    pub fn set_group_by(&mut self, field: &str) {
        self.fields.group_by = field.trim().to_string();
        self.error = None;
    }

    pub fn set_aggregate(&mut self, aggregate: Aggregate) {
        self.fields.aggregate = aggregate;
    }

    pub fn set_aggregate_field(&mut self, field: &str) {
        self.fields.aggregate_field = field.trim().to_string();
        self.error = None;
    }

    /// Override the generated title. Blank clears the override.
    pub fn set_title(&mut self, title: &str) {
        let title = title.trim();
        self.title = (!title.is_empty()).then(|| title.to_string());
    }

    /// Toggle a publish target. Returns whether it is now selected.
    pub fn toggle_publish_target(&mut self, target: &str) -> bool {
        if self.publish_targets.remove(target) {
            false
        } else {
            self.publish_targets.insert(target.to_string());
            true
        }
    }

    // -- navigation --

    /// Advance one step. Leaving step 1 requires a selected source.
    pub fn next(&mut self) -> CoreResult<WizardStep> {
        if self.step == WizardStep::SourceSelection && self.source.is_none() {
            return Err(self.reject("Select a data source to continue".to_string()));
        }
        let next = self.step.next().ok_or_else(|| {
            CoreError::Validation("Already on the last step; confirm to create the widget".into())
        })?;
        self.step = next;
        self.error = None;
        Ok(next)
    }

    /// Go back one step, keeping every selection. No-op on step 1.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.error = None;
        self.step
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Start over from step 1 with default selections.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // -- confirmation --

    /// Check everything confirmation needs and build the service request.
    pub fn validate(&self) -> CoreResult<AggregationRequest> {
        if self.step != WizardStep::FieldConfiguration {
            return Err(CoreError::Validation(format!(
                "Widgets can only be created from step {TOTAL_STEPS}, currently on step {}",
                self.step.to_number()
            )));
        }
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| CoreError::Validation("Select a data source to continue".into()))?;
        self.fields
            .validate()
            .map_err(|errors| CoreError::Validation(validation_message(&errors)))?;

        Ok(AggregationRequest {
            object_id: source.meta_id.clone(),
            group_by: self.fields.group_by.clone(),
            aggregate: self.fields.aggregate,
            aggregate_field: self.fields.aggregate_field.clone(),
        })
    }

    /// Validate, run the aggregation once and build the new widget.
    ///
    /// Validation failures never reach the service. Service failures are
    /// recorded as the inline error and the wizard stays on step 3.
    pub async fn confirm(
        &mut self,
        service: &dyn AggregationService,
        ids: &dyn IdGenerator,
    ) -> CoreResult<WidgetDefinition> {
        let request = match self.validate() {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.user_message());
                return Err(err);
            }
        };

        self.error = None;
        let result = {
            let _submitting = SubmittingGuard::start(&mut self.submitting);
            service.aggregate(&request).await
        };

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    object_id = %request.object_id,
                    error = %err,
                    "Aggregation query failed",
                );
                self.error = Some(format!("Could not run the query: {}", err.user_message()));
                return Err(err);
            }
        };

        let object_label = self
            .source
            .as_ref()
            .map(|s| s.nome_amigavel.clone())
            .unwrap_or_else(|| request.object_id.clone());
        let widget = WidgetDefinition {
            id: ids.next_id(WIDGET_ID_PREFIX),
            title: self.title.clone().unwrap_or_else(|| self.default_title()),
            chart_type: self.chart_type,
            object_id: request.object_id,
            object_label,
            group_by: request.group_by,
            aggregate: request.aggregate,
            aggregate_field: request.aggregate_field,
            data: rows,
            publish_targets: self.publish_targets.clone(),
        };

        tracing::info!(
            widget_id = %widget.id,
            object_id = %widget.object_id,
            chart_type = widget.chart_type.as_str(),
            rows = widget.data.len(),
            "Widget created",
        );
        Ok(widget)
    }

    fn default_title(&self) -> String {
        let FieldSelection {
            group_by,
            aggregate,
            aggregate_field,
        } = &self.fields;
        if self.chart_type.is_kpi() {
            format!("{aggregate} of {aggregate_field}")
        } else {
            format!("{aggregate} of {aggregate_field} by {group_by}")
        }
    }

    fn reject(&mut self, message: String) -> CoreError {
        self.error = Some(message.clone());
        CoreError::Validation(message)
    }
}

/// Holds the wizard's `submitting` flag for the duration of the service
/// call. Clears it on drop, including when the `confirm` future is dropped
/// mid-call.
struct SubmittingGuard<'a>(&'a mut bool);

impl<'a> SubmittingGuard<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
