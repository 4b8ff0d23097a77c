//! In-memory fakes of the collaborator services for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dashboard::Dashboard;
use crate::error::{CoreError, CoreResult};
use crate::payload::RawPayload;
use crate::services::{
    AggregationRequest, AggregationService, DashboardStore, MetaObjectSource, WidgetFeed,
};
use crate::types::Row;

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAggregation {
    rows: Vec<Row>,
    fail_with: Option<String>,
    calls: Mutex<Vec<AggregationRequest>>,
}

impl FakeAggregation {
    pub fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<AggregationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AggregationService for FakeAggregation {
    async fn aggregate(&self, request: &AggregationRequest) -> CoreResult<Vec<Row>> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.fail_with {
            Some(message) => Err(CoreError::Service(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }
}

/// Never answers, for exercising callers that give up mid-call.
pub struct PendingAggregation;

#[async_trait]
impl AggregationService for PendingAggregation {
    async fn aggregate(&self, _request: &AggregationRequest) -> CoreResult<Vec<Row>> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Dashboard store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    load_response: Value,
    save_response: Value,
    fail_saves: bool,
    creates: AtomicUsize,
    updates: AtomicUsize,
    saved: Mutex<Vec<Dashboard>>,
}

impl FakeStore {
    pub fn with_load(payload: Value) -> Self {
        Self {
            load_response: payload,
            ..Default::default()
        }
    }

    pub fn with_save_response(payload: Value) -> Self {
        Self {
            save_response: payload,
            ..Default::default()
        }
    }

    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Default::default()
        }
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<Dashboard> {
        self.saved.lock().unwrap().clone()
    }

    fn record(&self, dashboard: &Dashboard) -> CoreResult<RawPayload> {
        self.saved.lock().unwrap().push(dashboard.clone());
        if self.fail_saves {
            return Err(CoreError::Service("persistence unavailable".into()));
        }
        Ok(RawPayload::new(self.save_response.clone()))
    }
}

#[async_trait]
impl DashboardStore for FakeStore {
    async fn load(&self, _id: &str) -> CoreResult<RawPayload> {
        Ok(RawPayload::new(self.load_response.clone()))
    }

    async fn create(&self, dashboard: &Dashboard) -> CoreResult<RawPayload> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.record(dashboard)
    }

    async fn update(&self, _id: &str, dashboard: &Dashboard) -> CoreResult<RawPayload> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.record(dashboard)
    }
}

// ---------------------------------------------------------------------------
// Widget feed
// ---------------------------------------------------------------------------

/// Serves a fixed payload per target; unknown targets return an empty list.
#[derive(Default)]
pub struct FakeFeed {
    payloads: HashMap<String, Value>,
    failing: Vec<String>,
}

impl FakeFeed {
    pub fn with_target(mut self, target: &str, payload: Value) -> Self {
        self.payloads.insert(target.to_string(), payload);
        self
    }

    pub fn failing_for(mut self, target: &str) -> Self {
        self.failing.push(target.to_string());
        self
    }
}

#[async_trait]
impl WidgetFeed for FakeFeed {
    async fn widgets_for_target(&self, target: &str) -> CoreResult<RawPayload> {
        if self.failing.iter().any(|t| t == target) {
            return Err(CoreError::Service(format!("feed for {target} unavailable")));
        }
        let payload = self
            .payloads
            .get(target)
            .cloned()
            .unwrap_or_else(|| json!({ "widgets": [] }));
        Ok(RawPayload::new(payload))
    }
}

// ---------------------------------------------------------------------------
// Meta-object source
// ---------------------------------------------------------------------------

pub struct FakeMetaSource(pub Value);

#[async_trait]
impl MetaObjectSource for FakeMetaSource {
    async fn fetch_meta_objects(&self) -> CoreResult<RawPayload> {
        Ok(RawPayload::new(self.0.clone()))
    }
}
