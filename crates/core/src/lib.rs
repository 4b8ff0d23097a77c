//! Domain core of the no-code dashboard widget pipeline.
//!
//! Normalizes meta-object and widget payloads, reconciles grid layouts,
//! drives the widget creation wizard and the dashboard edit session, and
//! renders widgets published to other product modules. Network access goes
//! through the traits in [`services`]; `painel-client` implements them
//! over HTTP.

pub mod canvas;
pub mod dashboard;
pub mod error;
pub mod ids;
pub mod layout;
pub mod meta_object;
pub mod mount;
pub mod payload;
pub mod publisher;
pub mod services;
pub mod types;
pub mod widget;
pub mod wizard;

#[cfg(test)]
mod test_support;

pub use canvas::DashboardCanvas;
pub use dashboard::Dashboard;
pub use error::{CoreError, CoreResult};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use layout::LayoutEntry;
pub use meta_object::{MetaObject, MetaObjectKind};
pub use payload::RawPayload;
pub use publisher::{PublishedPanel, WidgetLoader, WidgetPreview};
pub use widget::{Aggregate, ChartType, WidgetDefinition};
pub use wizard::{WidgetWizard, WizardStep};
