//! Background execution support.
//!
//! A player that outlives its UI needs the host to keep the process (and,
//! on mobile, the CPU) awake. The engine holds one [`KeepAlive`] for its
//! whole lifetime.

use async_trait::async_trait;

use crate::error::Result;

/// Wake-lock style resource.
///
/// # Platform Support
///
/// - **Android**: partial `WakeLock` plus a foreground service
/// - **iOS**: background audio session
/// - **Desktop**: usually a no-op, optionally an idle-sleep inhibitor
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::KeepAlive;
///
/// async fn run(keep_alive: &dyn KeepAlive) -> Result<()> {
///     keep_alive.acquire().await?;
///     // ... engine lifetime ...
///     keep_alive.release().await
/// }
/// ```
#[async_trait]
pub trait KeepAlive: Send + Sync {
    /// Take the resource. Acquiring twice is allowed and has no extra effect.
    async fn acquire(&self) -> Result<()>;

    /// Give the resource back. Releasing when not held is a no-op.
    async fn release(&self) -> Result<()>;

    /// Whether the resource is currently held.
    fn is_held(&self) -> bool;
}
