//! Frame timing utilities

use std::time::Instant;

/// High-precision timer for frame timing and animation
pub struct Timer {
    start: Instant,
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (call once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time = now.duration_since(self.start).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed time since timer creation in seconds
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of `update` calls so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fresh timer reports zero elapsed time and zero frames.
    #[test]
    fn new_timer_starts_at_zero() {
        let timer = Timer::new();
        assert_eq!(timer.frame_count(), 0);
        assert_eq!(timer.total_time(), 0.0);
        assert_eq!(timer.average_fps(), 0.0);
    }

    /// Updates advance the frame count and keep total time monotonic.
    #[test]
    fn updates_accumulate() {
        let mut timer = Timer::new();
        timer.update();
        let first_total = timer.total_time();
        timer.update();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.total_time() >= first_total);
        assert!(timer.delta_time() >= 0.0);
    }
}
