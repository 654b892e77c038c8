// Rectangular vision target seen head-on or at an angle
//
// Distance comes from similar triangles: the fraction of the vertical
// resolution the target covers equals the fraction of the vertical field of
// view its real height covers at that depth.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::camera::{CameraModel, PhysicalTargetSize};

/// Error types for target geometry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VisionError {
    /// The detection cannot describe a real target; discard the frame
    #[error("Invalid target geometry: {0}")]
    InvalidGeometry(String),
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Point in Cartesian image coordinates (y grows upward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Distance and bearings solved from one detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSolution {
    /// Inches
    pub distance: f64,
    /// Radians
    pub internal_rotation: f64,
    /// Radians, [0, pi]
    pub external_rotation: f64,
}

/// Measured target rectangle, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionTarget {
    offset: f64,
    width: f64,
    height: f64,
}

impl VisionTarget {
    /// # Arguments
    /// * `offset` - Horizontal distance of the center from the image center
    /// * `width` - Positive when the left side is larger than the right
    /// * `height` - Apparent height, positive
    pub fn new(offset: f64, width: f64, height: f64) -> Self {
        Self {
            offset,
            width,
            height,
        }
    }

    /// Build from four corners in Cartesian coordinates
    ///
    /// Pixel-row coordinates (y growing downward) must be flipped first, or the
    /// height comes out negative.
    pub fn from_corners(
        top_left: Point2,
        top_right: Point2,
        bottom_left: Point2,
        bottom_right: Point2,
    ) -> Self {
        let left = (top_left.x + bottom_left.x) / 2.0;
        let right = (top_right.x + bottom_right.x) / 2.0;
        let top = (top_left.y + top_right.y) / 2.0;
        let bottom = (bottom_left.y + bottom_right.y) / 2.0;

        Self {
            offset: left + (right - left) / 2.0,
            width: right - left,
            height: top - bottom,
        }
    }

    pub fn center(&self) -> f64 {
        self.offset
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Real-world height of the visible scene at the target's depth, inches
    pub fn vertical_field_of_view(
        &self,
        camera: &CameraModel,
        physical: &PhysicalTargetSize,
    ) -> Result<f64> {
        self.check_heights(physical)?;
        finite(
            camera.resolution.height * physical.height / self.height,
            "vertical field of view",
        )
    }

    /// Distance from the camera to the target, inches
    pub fn distance(&self, camera: &CameraModel, physical: &PhysicalTargetSize) -> Result<f64> {
        let fov = self.vertical_field_of_view(camera, physical)?;
        finite(fov / (2.0 * camera.half_vertical_fov().tan()), "distance")
    }

    /// Bearing of the target off the camera axis, radians, signed like `offset`
    pub fn internal_rotation(
        &self,
        camera: &CameraModel,
        physical: &PhysicalTargetSize,
    ) -> Result<f64> {
        let distance = self.distance(camera, physical)?;
        let sine = unit_ratio(self.offset / distance, "offset / distance")?;
        Ok(sine.asin())
    }

    /// Apparent rotation of the target face, radians in [0, pi]
    ///
    /// Compares the observed width with the width a head-on target of the same
    /// observed height would have. Only the magnitude of the turn is known; a
    /// face turned left and one turned right give the same value.
    pub fn external_rotation(&self, physical: &PhysicalTargetSize) -> Result<f64> {
        self.check_heights(physical)?;
        let expected_width = self.height * (physical.width / physical.height);
        if expected_width == 0.0 || !expected_width.is_finite() {
            return Err(invalid(format!("expected width {expected_width} px")));
        }
        let cosine = unit_ratio(self.width / expected_width, "width / expected width")?;
        Ok(cosine.acos())
    }

    // Both heights must be positive, or the target is upside down or empty
    fn check_heights(&self, physical: &PhysicalTargetSize) -> Result<()> {
        if self.height <= 0.0 {
            return Err(invalid(format!("target height {} px", self.height)));
        }
        if physical.height <= 0.0 {
            return Err(invalid(format!("physical height {} in", physical.height)));
        }
        Ok(())
    }

    /// Solve everything at once; any degenerate quantity fails the whole frame
    pub fn solve(
        &self,
        camera: &CameraModel,
        physical: &PhysicalTargetSize,
    ) -> Result<TargetSolution> {
        Ok(TargetSolution {
            distance: self.distance(camera, physical)?,
            internal_rotation: self.internal_rotation(camera, physical)?,
            external_rotation: self.external_rotation(physical)?,
        })
    }
}

fn invalid(reason: String) -> VisionError {
    warn!("Discarding target: {}", reason);
    VisionError::InvalidGeometry(reason)
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(format!("{what} is {value}")))
    }
}

fn unit_ratio(value: f64, what: &str) -> Result<f64> {
    if (-1.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(format!("{what} = {value} outside [-1, 1]")))
    }
}
