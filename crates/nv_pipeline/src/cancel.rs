use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run-level cancellation. Once cancelled, no new article work is started;
/// articles already in flight are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
