//! Bounding box geometry in source-image pixel space.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in `xyxy` pixel coordinates.
///
/// Coordinates are relative to the source image: `(x1, y1)` is the top-left
/// corner, `(x2, y2)` the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Creates a new bounding box from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Returns the box width in pixels.
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Returns the box height in pixels.
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Returns true if the box has positive area and ordered corners.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Clamps the box to an image of `width` x `height` pixels.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width as f32),
            y1: self.y1.clamp(0.0, height as f32),
            x2: self.x2.clamp(0.0, width as f32),
            y2: self.y2.clamp(0.0, height as f32),
        }
    }

    /// Returns the box as a `[x1, y1, x2, y2]` array, the wire shape used by
    /// the synchronous response.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(value: [f32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 60.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 40.0);
        assert!(bbox.is_valid());
    }

    #[test]
    fn degenerate_box_is_invalid() {
        assert!(!BoundingBox::new(10.0, 10.0, 10.0, 40.0).is_valid());
        assert!(!BoundingBox::new(50.0, 10.0, 10.0, 40.0).is_valid());
    }

    #[test]
    fn clamped_to_image_bounds() {
        let bbox = BoundingBox::new(-5.0, -3.0, 700.0, 500.0).clamped(640, 480);
        assert_eq!(bbox.to_array(), [0.0, 0.0, 640.0, 480.0]);
    }

    #[test]
    fn array_round_trip() {
        let bbox = BoundingBox::from([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(bbox.to_array(), [1.0, 2.0, 3.0, 4.0]);
    }
}
