//! Gain automation on the audio clock.
//!
//! A gain value that can be set immediately or ramped linearly between two
//! points in audio time. Times are seconds on the render clock, so a ramp is
//! scheduled once and then evaluated sample by sample without further input.

/// One scheduled linear ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LinearRamp {
    start_time: f64,
    start_value: f32,
    end_time: f64,
    end_value: f32,
}

impl LinearRamp {
    fn value_at(&self, time: f64) -> f32 {
        if time <= self.start_time {
            return self.start_value;
        }
        if time >= self.end_time {
            return self.end_value;
        }
        let progress = ((time - self.start_time) / (self.end_time - self.start_time)) as f32;
        self.start_value + (self.end_value - self.start_value) * progress
    }
}

/// Automatable gain parameter.
///
/// # Example
///
/// ```ignore
/// let mut gain = GainParam::new(0.0);
/// gain.linear_ramp_to(0.5, now, 0.1); // attack
/// let g = gain.value_at(now + 0.05);  // 0.25
/// ```
#[derive(Clone, Debug)]
pub struct GainParam {
    /// Value in effect when no ramp is scheduled.
    value: f32,
    ramp: Option<LinearRamp>,
}

impl GainParam {
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial,
            ramp: None,
        }
    }

    /// Sets the value immediately, cancelling any scheduled ramp.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    /// Schedules a linear ramp from the value at `now` to `target`, ending
    /// `duration` seconds later. A non-positive duration jumps straight to
    /// the target.
    pub fn linear_ramp_to(&mut self, target: f32, now: f64, duration: f64) {
        let start_value = self.value_at(now);
        if duration <= 0.0 {
            self.set_value(target);
            return;
        }
        self.value = target;
        self.ramp = Some(LinearRamp {
            start_time: now,
            start_value,
            end_time: now + duration,
            end_value: target,
        });
    }

    /// Gain at the given audio time.
    #[inline]
    pub fn value_at(&self, time: f64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(time),
            None => self.value,
        }
    }

    /// Returns true while a ramp is still moving at `time`.
    pub fn is_ramping(&self, time: f64) -> bool {
        self.ramp
            .map(|ramp| time < ramp.end_time)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_value() {
        let mut gain = GainParam::new(0.0);
        gain.set_value(0.5);
        assert!((gain.value_at(0.0) - 0.5).abs() < f32::EPSILON);
        assert!(!gain.is_ramping(0.0));
    }

    #[test]
    fn test_attack_ramp_midpoint() {
        let mut gain = GainParam::new(0.0);
        gain.linear_ramp_to(0.5, 1.0, 0.1);

        assert!(gain.value_at(1.0).abs() < 1e-6);
        assert!((gain.value_at(1.05) - 0.25).abs() < 1e-4);
        assert!((gain.value_at(1.1) - 0.5).abs() < 1e-6);
        assert!((gain.value_at(5.0) - 0.5).abs() < 1e-6);
        assert!(gain.is_ramping(1.05));
        assert!(!gain.is_ramping(1.2));
    }

    #[test]
    fn test_release_starts_from_current_value() {
        let mut gain = GainParam::new(0.0);
        gain.linear_ramp_to(0.5, 0.0, 0.1);

        // Release halfway through the attack: ramp down from 0.25
        gain.linear_ramp_to(0.0, 0.05, 0.5);
        assert!((gain.value_at(0.05) - 0.25).abs() < 1e-4);
        assert!((gain.value_at(0.30) - 0.125).abs() < 1e-4);
        assert!(gain.value_at(0.55).abs() < 1e-6);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let mut gain = GainParam::new(0.0);
        gain.linear_ramp_to(0.5, 2.0, 0.0);
        assert!((gain.value_at(2.0) - 0.5).abs() < f32::EPSILON);
        assert!(!gain.is_ramping(2.0));
    }
}
