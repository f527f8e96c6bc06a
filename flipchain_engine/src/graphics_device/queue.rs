//! Command queue and fence traits

use std::time::Duration;

use crate::error::Result;
use crate::graphics_device::{CommandList, Swapchain};

/// GPU-signaled monotonic counter
pub trait Fence: Send + Sync {
    /// Highest value the GPU has reached
    fn completed_value(&self) -> Result<u64>;

    /// Block until the fence reaches `value` or `timeout` expires
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait(&self, value: u64, timeout: Duration) -> Result<bool>;
}

/// Direct (graphics) queue
///
/// Work executes in submission order.
pub trait CommandQueue: Send + Sync {
    /// Submit closed command lists
    fn submit(&self, lists: &[&dyn CommandList]) -> Result<()>;

    /// Submit closed command lists that render into the swapchain's
    /// currently acquired image
    fn submit_for_present(&self, lists: &[&dyn CommandList], swapchain: &dyn Swapchain) -> Result<()>;

    /// Ask the GPU to set `fence` to `value` once all previously submitted work is done
    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()>;
}
