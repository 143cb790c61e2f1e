//! Zoom gesture and viewport geometry.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size of the waveform display surface, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportGeometry {
    pub width_px: f32,
    pub height_px: f32,
}

impl ViewportGeometry {
    pub fn new(width_px: f32, height_px: f32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }
}

/// Horizontal zoom of the scope.
///
/// `factor` is always finite and strictly positive. `drag_origin` is set
/// only while a drag is in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomState {
    factor: f32,
    drag_origin: Option<Point>,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            factor: 1.0,
            drag_origin: None,
        }
    }
}

impl ZoomState {
    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn drag_origin(&self) -> Option<Point> {
        self.drag_origin
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    pub fn start(&mut self, point: Point) {
        self.drag_origin = Some(point);
    }

    /// Sets the factor to the horizontal drag distance over the viewport width.
    ///
    /// Does nothing without an active drag or a known width, and ignores
    /// ratios that are not strictly positive. Returns true if the factor changed.
    pub fn change(&mut self, point: Point, viewport_width: Option<f32>) -> bool {
        let (Some(origin), Some(width)) = (self.drag_origin, viewport_width) else {
            return false;
        };
        if width <= 0.0 {
            return false;
        }

        let ratio = (point.x - origin.x) / width;
        if !ratio.is_finite() || ratio <= 0.0 {
            return false;
        }
        self.factor = ratio;
        true
    }

    pub fn stop(&mut self) {
        self.drag_origin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_zoom() {
        let zoom = ZoomState::default();
        assert!((zoom.factor() - 1.0).abs() < f32::EPSILON);
        assert!(!zoom.is_dragging());
    }

    #[test]
    fn test_change_without_start_is_ignored() {
        let mut zoom = ZoomState::default();
        assert!(!zoom.change(Point::new(400.0, 0.0), Some(800.0)));
        assert!((zoom.factor() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_change_without_viewport_is_ignored() {
        let mut zoom = ZoomState::default();
        zoom.start(Point::new(0.0, 0.0));
        assert!(!zoom.change(Point::new(400.0, 0.0), None));
        assert!((zoom.factor() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_drag_sets_ratio() {
        let mut zoom = ZoomState::default();
        zoom.start(Point::new(100.0, 50.0));
        assert!(zoom.change(Point::new(500.0, 10.0), Some(800.0)));
        assert!((zoom.factor() - 0.5).abs() < f32::EPSILON);

        zoom.stop();
        assert!(zoom.drag_origin().is_none());
        assert!((zoom.factor() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_leftward_drag_keeps_factor_positive() {
        let mut zoom = ZoomState::default();
        zoom.start(Point::new(500.0, 0.0));
        assert!(!zoom.change(Point::new(100.0, 0.0), Some(800.0)));
        assert!(!zoom.change(Point::new(500.0, 0.0), Some(800.0)));
        assert!(zoom.factor() > 0.0);
    }
}
