//! Plain detection types shared between the inference seam and the core.

/// Axis-aligned bounding box in pixel units of a reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Center of the box (x + w/2, y + h/2).
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// One object detection in one frame. Produced by the inference
/// collaborator, consumed and never mutated by the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Stable identifier into the model's label table.
    pub category: u32,
    /// Instantaneous confidence in [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Dimensions of the stream the bounding boxes are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Frame center in pixels.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}
