//! Frame synchronization primitives
//!
//! Semaphore and fence wrappers with RAII cleanup, plus the per-frame
//! slots that let the CPU record one frame while the GPU works on another.

use ash::{vk, Device};

use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Index of the slot that owns the frame after `current`
pub fn next_frame_index(current: usize, in_flight: usize) -> usize {
    (current + 1) % in_flight
}

/// Binary semaphore wrapper with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence, optionally already signaled
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Wait for the fence to signal
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset the fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects and command buffer owned by one in-flight frame
pub struct FrameSync {
    /// Signaled when the swapchain image is ready to be rendered to
    pub image_available: Semaphore,
    /// Signaled when rendering finishes, gating presentation
    pub render_finished: Semaphore,
    /// Signaled when this slot's previous submission has fully retired
    pub in_flight: Fence,
    /// Command buffer re-recorded each time this slot comes around
    pub command_buffer: vk::CommandBuffer,
}

impl FrameSync {
    /// Create the sync objects for one frame slot
    ///
    /// The fence starts signaled so the first wait on the slot passes.
    pub fn new(device: Device, command_buffer: vk::CommandBuffer) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device, true)?,
            command_buffer,
        })
    }
}

/// Round-robin rotation through the in-flight frame slots
pub struct FrameScheduler {
    frames: Vec<FrameSync>,
    current: usize,
}

impl FrameScheduler {
    /// Create one frame slot per command buffer
    pub fn new(device: &Device, command_buffers: &[vk::CommandBuffer]) -> VulkanResult<Self> {
        if command_buffers.len() != MAX_FRAMES_IN_FLIGHT {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "expected {} command buffers for frame scheduling, got {}",
                    MAX_FRAMES_IN_FLIGHT,
                    command_buffers.len()
                ),
            });
        }

        let frames = command_buffers
            .iter()
            .map(|&command_buffer| FrameSync::new(device.clone(), command_buffer))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self { frames, current: 0 })
    }

    /// Get the slot owning the frame being prepared
    pub fn current(&self) -> &FrameSync {
        &self.frames[self.current]
    }

    /// Index of the current slot
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Rotate to the next slot after a successful submission
    pub fn advance(&mut self) {
        self.current = next_frame_index(self.current, self.frames.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two slots alternate, never skipping or repeating.
    #[test]
    fn two_slots_alternate() {
        let mut index = 0;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(index);
            index = next_frame_index(index, MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0]);
    }

    /// The last slot wraps back to the first.
    #[test]
    fn rotation_wraps() {
        assert_eq!(next_frame_index(2, 3), 0);
        assert_eq!(next_frame_index(0, 1), 0);
    }
}
