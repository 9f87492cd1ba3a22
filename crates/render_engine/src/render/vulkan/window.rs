//! Window management using GLFW
//!
//! Provides cross-platform window creation and event handling for Vulkan,
//! including the explicit resize tracking swapchain recreation relies on.

use ash::vk;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// The GLFW library failed to initialize
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Query `size` until both dimensions are nonzero, pumping events between
/// attempts
///
/// A minimized window reports a zero framebuffer and cannot back a
/// swapchain, so rendering blocks here until it becomes visible again.
pub fn poll_until_nonzero_extent(
    mut size: impl FnMut() -> (u32, u32),
    mut pump: impl FnMut(),
) -> (u32, u32) {
    loop {
        let (width, height) = size();
        if width > 0 && height > 0 {
            return (width, height);
        }
        pump();
    }
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    resized: bool,
}

impl Window {
    /// Create a resizable window without an OpenGL context
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
            resized: false,
        })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Pump pending events and fold them into the window state
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::FramebufferSize(_, _) => {
                    self.resized = true;
                }
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                    self.window.set_should_close(true);
                }
                _ => {}
            }
        }
    }

    /// Take the resize flag, clearing it
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_extent(&self) -> vk::Extent2D {
        let (width, height) = self.window.get_framebuffer_size();
        vk::Extent2D {
            width: width as u32,
            height: height as u32,
        }
    }

    /// Block until the framebuffer has a usable nonzero extent
    pub fn wait_for_valid_extent(&mut self) -> vk::Extent2D {
        let window = &self.window;
        let glfw = &mut self.glfw;

        let (width, height) = poll_until_nonzero_extent(
            || {
                let (width, height) = window.get_framebuffer_size();
                (width as u32, height as u32)
            },
            || glfw.wait_events(),
        );

        vk::Extent2D { width, height }
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| {
                WindowError::GlfwError("Vulkan is not available to GLFW".to_string())
            })
    }

    /// Create a Vulkan surface for this window
    pub fn create_vulkan_surface(
        &mut self,
        instance: ash::vk::Instance,
    ) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!(
                "Failed to create Vulkan surface: {result:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A usable extent returns immediately without pumping events.
    #[test]
    fn nonzero_extent_returns_immediately() {
        let mut pumps = 0;
        let extent = poll_until_nonzero_extent(|| (800, 600), || pumps += 1);
        assert_eq!(extent, (800, 600));
        assert_eq!(pumps, 0);
    }

    /// Zero-sized framebuffers block until both dimensions are nonzero.
    #[test]
    fn waits_out_minimized_window() {
        let sizes = [(0, 0), (0, 600), (800, 600)];
        let mut calls = 0;
        let mut pumps = 0;

        let extent = poll_until_nonzero_extent(
            || {
                let size = sizes[calls];
                calls += 1;
                size
            },
            || pumps += 1,
        );

        assert_eq!(extent, (800, 600));
        assert_eq!(pumps, 2);
    }
}
