//! CPU/GPU frame synchronization
//!
//! A monotonically increasing counter paired with a GPU fence. The CPU asks
//! the queue to signal the next value after all submitted work and later
//! blocks until the GPU reports that value as completed.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::graphics_device::{CommandQueue, Fence, GraphicsDevice};
use crate::log::LogRegistry;
use crate::{engine_report, engine_trace};

const SOURCE: &str = "flipchain::FrameSync";

pub struct FrameSync {
    queue: Arc<dyn CommandQueue>,
    fence: Arc<dyn Fence>,
    /// Last value handed out by `signal` (never reused, even when the signal failed)
    issued: u64,
    /// Last value whose signal was accepted by the queue
    last_signaled: u64,
    timeout: Duration,
    log: LogRegistry,
}

impl FrameSync {
    /// Create the fence (starting at 0) on `device` and bind it to the direct queue
    pub fn new(device: &dyn GraphicsDevice, timeout: Duration, log: LogRegistry) -> Result<Self> {
        let fence = device.create_fence(0)?;
        Ok(Self {
            queue: device.direct_queue(),
            fence,
            issued: 0,
            last_signaled: 0,
            timeout,
            log,
        })
    }

    /// Queue a signal of the next counter value after all previously submitted
    /// work and return that value. The first value is 1.
    pub fn signal(&mut self) -> Result<u64> {
        self.issued += 1;
        let value = self.issued;
        self.queue.signal(self.fence.as_ref(), value)?;
        self.last_signaled = value;
        engine_trace!(self.log, SOURCE, "Signaled fence value {}", value);
        Ok(value)
    }

    /// Block until the GPU has completed `value`
    ///
    /// Returns immediately if the value is already complete. Waiting on a value
    /// that was never signaled fails at once instead of blocking forever.
    pub fn wait_until(&self, value: u64) -> Result<()> {
        if value > self.last_signaled {
            return Err(engine_report!(
                self.log,
                SOURCE,
                Error::InvalidState(format!(
                    "wait on fence value {} that was never signaled (last signaled: {})",
                    value, self.last_signaled
                ))
            ));
        }

        if self.fence.completed_value()? >= value {
            return Ok(());
        }

        if self.fence.wait(value, self.timeout)? {
            return Ok(());
        }

        let completed = self.fence.completed_value()?;
        Err(engine_report!(self.log, SOURCE, Error::FenceTimeout { value, completed }))
    }

    /// Signal and wait: returns once all work submitted so far is complete
    pub fn flush(&mut self) -> Result<u64> {
        let value = self.signal()?;
        self.wait_until(value)?;
        Ok(value)
    }

    /// Highest value the GPU has completed
    pub fn completed_value(&self) -> Result<u64> {
        self.fence.completed_value()
    }

    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    /// Value the next `signal` will hand out
    pub fn next_value(&self) -> u64 {
        self.issued + 1
    }

    pub fn fence(&self) -> &Arc<dyn Fence> {
        &self.fence
    }
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
