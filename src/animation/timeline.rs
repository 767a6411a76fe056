use crate::foundation::config::TimelineConfig;
use crate::foundation::core::{Fps, FrameIndex};

/// Visual state of a card at one instant. Pure function of `(frame, fps, target)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    pub elapsed_seconds: f64,
    /// Eased entrance progress in `[0, 1]`.
    pub slide_progress: f64,
    /// Downward displacement of the card; shrinks to 0 as the slide completes.
    pub slide_offset_px: f64,
    pub alpha: u8,
    /// Eased counter progress in `[0, 1]`.
    pub counter_progress: f64,
    pub counter_value: f64,
}

/// Entrance slide + odometer counter timing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTimeline {
    params: TimelineConfig,
}

impl Default for AnimationTimeline {
    fn default() -> Self {
        Self::new(TimelineConfig::default())
    }
}

impl AnimationTimeline {
    pub fn new(params: TimelineConfig) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TimelineConfig {
        &self.params
    }

    /// Seconds at which the counter leaves zero.
    pub fn counter_start_s(&self) -> f64 {
        self.params.slide_duration_s + self.params.count_delay_s
    }

    /// Seconds from which the counter holds its target.
    pub fn counter_end_s(&self) -> f64 {
        self.counter_start_s() + self.params.count_duration_s
    }

    pub fn state_at(&self, frame: FrameIndex, fps: Fps, target_value: f64) -> AnimationState {
        self.state_at_secs(fps.frames_to_secs(frame.0), target_value)
    }

    pub fn state_at_secs(&self, t: f64, target_value: f64) -> AnimationState {
        let p = &self.params;

        let slide = p.slide_ease.apply((t / p.slide_duration_s).min(1.0));
        let counter_t = ((t - self.counter_start_s()).max(0.0) / p.count_duration_s).min(1.0);
        let counter = p.count_ease.apply(counter_t);

        AnimationState {
            elapsed_seconds: t,
            slide_progress: slide,
            slide_offset_px: (1.0 - slide) * p.slide_distance_px,
            alpha: (slide * 255.0).round().clamp(0.0, 255.0) as u8,
            counter_progress: counter,
            counter_value: target_value * counter,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timeline.rs"]
mod tests;
