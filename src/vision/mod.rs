// Vision target geometry
//
// Turns a measured target rectangle (pixels) into real-world distance and
// bearing angles. Pure functions over immutable inputs, no hardware access.

pub mod camera;
pub mod target;

pub use camera::{CameraModel, Dimension, PhysicalTargetSize};
pub use target::{Point2, TargetSolution, VisionError, VisionTarget};
