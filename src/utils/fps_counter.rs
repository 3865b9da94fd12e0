use std::time::{Duration, Instant};

/// Frame-rate sampling interval of the window title.
pub const FPS_INTERVAL: Duration = Duration::from_millis(500);

pub struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
    accumulated_time: Duration,
    interval: Duration,
    pub current_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(FPS_INTERVAL)
    }

    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
            accumulated_time: Duration::ZERO,
            interval,
            current_fps: 0.0,
        }
    }

    /// Counts one frame. Returns the average rate once per interval.
    pub fn update(&mut self) -> Option<f32> {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        self.accumulated_time += now.saturating_duration_since(self.last_update);
        self.last_update = now;

        if self.accumulated_time >= self.interval {
            self.current_fps = self.frame_count as f32 / self.accumulated_time.as_secs_f32();

            // Reset counter
            self.accumulated_time = Duration::ZERO;
            self.frame_count = 0;

            return Some(self.current_fps);
        }

        None
    }
}
