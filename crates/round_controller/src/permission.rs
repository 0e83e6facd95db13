//! Camera access gate consulted before the scanner opens.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

#[async_trait]
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;
    /// Prompts for access and reports the outcome.
    async fn request(&self) -> bool;
}

/// Gate with a fixed answer, for headless drivers and tests.
pub struct StaticPermissionGate {
    granted: AtomicBool,
    grant_on_request: bool,
    requests: AtomicUsize,
}

impl StaticPermissionGate {
    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn denied() -> Self {
        Self::new(false, false)
    }

    /// Not granted up front; the first request grants it.
    pub fn prompting() -> Self {
        Self::new(false, true)
    }

    fn new(granted: bool, grant_on_request: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
            grant_on_request,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_request {
            self.granted.store(true, Ordering::SeqCst);
        }
        self.is_granted()
    }
}
