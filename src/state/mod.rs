//! State module
//!
//! UI-facing state: the source registry, zoom and viewport, and the
//! transition function that ties them together.

pub mod app_state;
pub mod registry;
pub mod zoom;

pub use app_state::AppState;
pub use registry::{Resolution, SourceEntry, SourceRegistry};
pub use zoom::{Point, ViewportGeometry, ZoomState};
