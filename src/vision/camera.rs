// Camera model and physical target dimensions

use serde::{Deserialize, Serialize};

/// A width/height pair; units depend on where it is used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
}

impl Dimension {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Real-world size of a vision target, in inches
pub type PhysicalTargetSize = Dimension;

/// Field of view and resolution of a physical camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Horizontal and vertical angle of view, degrees
    pub angle_of_view: Dimension,
    /// Image size, pixels
    pub resolution: Dimension,
}

impl CameraModel {
    pub fn new(fov_width_deg: f64, fov_height_deg: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            angle_of_view: Dimension::new(fov_width_deg, fov_height_deg),
            resolution: Dimension::new(width_px, height_px),
        }
    }

    /// Half of the vertical angle of view, radians
    pub fn half_vertical_fov(&self) -> f64 {
        self.angle_of_view.height.to_radians() / 2.0
    }
}

impl Default for CameraModel {
    // 640x480 fixed-focus network camera
    fn default() -> Self {
        Self::new(47.0, 36.13, 640.0, 480.0)
    }
}
