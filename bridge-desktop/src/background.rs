//! Keep-Alive Implementation
//!
//! Desktop processes are not suspended by the OS the way mobile apps are,
//! so the wake lock is only bookkeeping: it records whether the engine
//! currently claims to be alive.

use async_trait::async_trait;
use bridge_traits::{background::KeepAlive, error::Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// In-process keep-alive flag.
#[derive(Debug, Default)]
pub struct ProcessKeepAlive {
    held: AtomicBool,
}

impl ProcessKeepAlive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeepAlive for ProcessKeepAlive {
    async fn acquire(&self) -> Result<()> {
        if !self.held.swap(true, Ordering::SeqCst) {
            debug!("Keep-alive acquired");
        }
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        if self.held.swap(false, Ordering::SeqCst) {
            debug!("Keep-alive released");
        }
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}
