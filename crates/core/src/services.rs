//! Collaborator capabilities this crate depends on.
//!
//! Each trait is one external service from the product backend. The HTTP
//! implementations live in `painel-client`; tests use in-memory fakes.
//! Every method is a single request with no automatic retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dashboard::Dashboard;
use crate::error::CoreResult;
use crate::payload::RawPayload;
use crate::types::Row;
use crate::widget::Aggregate;

/// Source of meta-object descriptors.
#[async_trait]
pub trait MetaObjectSource: Send + Sync {
    /// Fetch all meta-object descriptors, unvalidated.
    async fn fetch_meta_objects(&self) -> CoreResult<RawPayload>;
}

/// Body sent to the aggregation-query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    pub object_id: String,
    pub group_by: String,
    pub aggregate: Aggregate,
    pub aggregate_field: String,
}

/// External query engine that materializes aggregation rows.
#[async_trait]
pub trait AggregationService: Send + Sync {
    async fn aggregate(&self, request: &AggregationRequest) -> CoreResult<Vec<Row>>;
}

/// Dashboard persistence backend.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// `GET /dashboards/{id}`.
    async fn load(&self, id: &str) -> CoreResult<RawPayload>;

    /// `POST /dashboards`. The response may carry the new id.
    async fn create(&self, dashboard: &Dashboard) -> CoreResult<RawPayload>;

    /// `PUT /dashboards/{id}`.
    async fn update(&self, id: &str, dashboard: &Dashboard) -> CoreResult<RawPayload>;
}

/// Read path for widgets published to other product modules.
#[async_trait]
pub trait WidgetFeed: Send + Sync {
    /// `GET /widgets/target/{target}`.
    async fn widgets_for_target(&self, target: &str) -> CoreResult<RawPayload>;
}
