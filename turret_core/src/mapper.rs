//! Pixel-offset to angle-delta mapping.

use turret_traits::{BoundingBox, FrameSize};

/// Gains and shaping for turning a pixel offset into a servo correction.
#[derive(Debug, Clone, Copy)]
pub struct TrackingCfg {
    pub pan_deg_per_pixel: f32,
    pub tilt_deg_per_pixel: f32,
    /// Flip the pan correction sign (camera mounted mirrored).
    pub pan_invert: bool,
    pub tilt_invert: bool,
    /// Suppress motion while BOTH axis offsets are within this radius of
    /// frame center, in pixels.
    pub dead_zone_px: f32,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            pan_deg_per_pixel: 0.03,
            tilt_deg_per_pixel: 0.03,
            pan_invert: true,
            tilt_invert: true,
            dead_zone_px: 20.0,
        }
    }
}

/// Relative correction to apply to the current pose, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleDelta {
    pub pan_deg: f32,
    pub tilt_deg: f32,
}

/// Correction that would center `bbox` in `frame`, or `None` inside the
/// dead zone.
///
/// The dead zone is only effective when both axes are inside it; a box far
/// off on one axis still gets its (small) correction on the other.
#[must_use]
pub fn angle_offsets(bbox: &BoundingBox, frame: FrameSize, cfg: &TrackingCfg) -> Option<AngleDelta> {
    let (cx, cy) = bbox.center();
    let (fx, fy) = frame.center();
    let offset_x = cx - fx;
    let offset_y = cy - fy;

    if offset_x.abs() < cfg.dead_zone_px && offset_y.abs() < cfg.dead_zone_px {
        return None;
    }

    let mut pan_deg = offset_x * cfg.pan_deg_per_pixel;
    let mut tilt_deg = offset_y * cfg.tilt_deg_per_pixel;
    if cfg.pan_invert {
        pan_deg = -pan_deg;
    }
    if cfg.tilt_invert {
        tilt_deg = -tilt_deg;
    }
    Some(AngleDelta { pan_deg, tilt_deg })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameSize {
        FrameSize::new(640, 360)
    }

    fn cfg() -> TrackingCfg {
        TrackingCfg {
            pan_invert: false,
            tilt_invert: false,
            ..TrackingCfg::default()
        }
    }

    // Box whose center sits at (offset) pixels from frame center
    fn box_at_offset(dx: f32, dy: f32) -> BoundingBox {
        let (fx, fy) = frame().center();
        BoundingBox::new(fx + dx - 10.0, fy + dy - 10.0, 20.0, 20.0)
    }

    #[test]
    fn proportional_gain_per_axis() {
        let d = angle_offsets(&box_at_offset(50.0, -10.0), frame(), &cfg()).expect("outside zone");
        assert!((d.pan_deg - 1.5).abs() < 1e-5);
        assert!((d.tilt_deg - (-0.3)).abs() < 1e-5);
    }

    #[test]
    fn dead_zone_requires_both_axes_inside() {
        let c = cfg();
        assert!(angle_offsets(&box_at_offset(10.0, -5.0), frame(), &c).is_none());
        // One axis out is enough to move, and the small axis still gets its
        // correction
        let d = angle_offsets(&box_at_offset(10.0, 30.0), frame(), &c).expect("y outside");
        assert!((d.pan_deg - 0.3).abs() < 1e-5);
        assert!((d.tilt_deg - 0.9).abs() < 1e-5);
    }

    #[test]
    fn dead_zone_boundary_is_exclusive() {
        let c = cfg();
        // exactly at the boundary is outside the zone (strict less-than)
        assert!(angle_offsets(&box_at_offset(20.0, 0.0), frame(), &c).is_some());
        assert!(angle_offsets(&box_at_offset(19.9, 0.0), frame(), &c).is_none());
    }

    #[test]
    fn inversion_flips_signs_independently() {
        let c = TrackingCfg {
            pan_invert: true,
            tilt_invert: false,
            ..cfg()
        };
        let d = angle_offsets(&box_at_offset(50.0, 50.0), frame(), &c).expect("outside zone");
        assert!(d.pan_deg < 0.0);
        assert!(d.tilt_deg > 0.0);
    }

    #[test]
    fn centered_box_with_zero_dead_zone_yields_zero_delta() {
        let c = TrackingCfg {
            dead_zone_px: 0.0,
            ..cfg()
        };
        let d = angle_offsets(&box_at_offset(0.0, 0.0), frame(), &c).expect("zone disabled");
        assert_eq!(d, AngleDelta { pan_deg: 0.0, tilt_deg: 0.0 });
    }
}
