//! [`PainelApi`] as the collaborator services `painel-core` depends on.

use async_trait::async_trait;
use painel_core::dashboard::Dashboard;
use painel_core::error::CoreResult;
use painel_core::services::{
    AggregationRequest, AggregationService, DashboardStore, MetaObjectSource, WidgetFeed,
};
use painel_core::types::Row;
use painel_core::RawPayload;

use crate::api::PainelApi;

#[async_trait]
impl MetaObjectSource for PainelApi {
    async fn fetch_meta_objects(&self) -> CoreResult<RawPayload> {
        Ok(PainelApi::fetch_meta_objects(self).await?)
    }
}

#[async_trait]
impl AggregationService for PainelApi {
    async fn aggregate(&self, request: &AggregationRequest) -> CoreResult<Vec<Row>> {
        Ok(PainelApi::aggregate(self, request).await?)
    }
}

#[async_trait]
impl DashboardStore for PainelApi {
    async fn load(&self, id: &str) -> CoreResult<RawPayload> {
        Ok(self.load_dashboard(id).await?)
    }

    async fn create(&self, dashboard: &Dashboard) -> CoreResult<RawPayload> {
        Ok(self.create_dashboard(dashboard).await?)
    }

    async fn update(&self, id: &str, dashboard: &Dashboard) -> CoreResult<RawPayload> {
        Ok(self.update_dashboard(id, dashboard).await?)
    }
}

#[async_trait]
impl WidgetFeed for PainelApi {
    async fn widgets_for_target(&self, target: &str) -> CoreResult<RawPayload> {
        Ok(PainelApi::widgets_for_target(self, target).await?)
    }
}
