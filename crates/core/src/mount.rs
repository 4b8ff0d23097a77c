//! "Still mounted" guard for results of in-flight requests.
//!
//! A view owns a [`MountFlag`] and hands [`MountToken`]s to the requests
//! it starts. When the view is torn down it calls [`MountFlag::unmount`];
//! results that arrive afterwards are discarded instead of applied. The
//! underlying request is not cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owned by the view whose lifetime gates result application.
#[derive(Debug)]
pub struct MountFlag {
    mounted: Arc<AtomicBool>,
}

/// Cheap handle checked before applying a result.
#[derive(Debug, Clone)]
pub struct MountToken {
    mounted: Arc<AtomicBool>,
}

impl Default for MountFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl MountFlag {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> MountToken {
        MountToken {
            mounted: Arc::clone(&self.mounted),
        }
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Drop for MountFlag {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl MountToken {
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Pass `value` through only while the view is still mounted.
    pub fn apply<T>(&self, value: T) -> Option<T> {
        if self.is_mounted() {
            Some(value)
        } else {
            tracing::debug!("Discarding result for an unmounted view");
            None
        }
    }
}
