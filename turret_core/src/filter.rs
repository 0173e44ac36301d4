//! Per-category EMA smoothing of detection boxes.
//!
//! Raw detections jitter frame to frame; feeding them straight into the
//! motion controller makes the rig twitch. The filter keeps one smoothed
//! track per category and blends every re-detection into it, and lets a
//! track survive short detection gaps before eviction.

use std::collections::HashMap;

use turret_traits::{BoundingBox, Detection};

#[derive(Debug, Clone, Copy)]
pub struct FilterCfg {
    /// EMA blend factor in (0.0, 1.0]; 1.0 snaps to the latest box.
    pub ema_alpha: f32,
    /// A track missing for more than this many consecutive frames is
    /// evicted. 0 evicts on the first missed frame.
    pub fade_frames: u32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            ema_alpha: 0.4,
            fade_frames: 5,
        }
    }
}

/// One smoothed track. The box is blended; the confidence is the latest
/// raw value, replaced verbatim on every re-detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedTrack {
    pub category: u32,
    pub bbox: BoundingBox,
    pub confidence: f32,
    /// Consecutive frames since this track was last re-detected.
    pub stale_frames: u32,
}

#[derive(Debug)]
pub struct TrackFilter {
    cfg: FilterCfg,
    tracks: HashMap<u32, SmoothedTrack>,
}

impl TrackFilter {
    #[must_use]
    pub fn new(cfg: FilterCfg) -> Self {
        Self {
            cfg,
            tracks: HashMap::new(),
        }
    }

    /// Ingest one frame worth of detections.
    ///
    /// Every existing track ages by one frame first; re-detected tracks are
    /// blended and reset to fresh; tracks older than `fade_frames` are
    /// evicted at the end, so a frame can both update one category and
    /// expire another.
    pub fn update(&mut self, detections: &[Detection]) {
        for track in self.tracks.values_mut() {
            track.stale_frames = track.stale_frames.saturating_add(1);
        }

        let alpha = self.effective_alpha();
        for det in detections {
            self.tracks
                .entry(det.category)
                .and_modify(|track| {
                    track.bbox = blend(track.bbox, det.bbox, alpha);
                    track.confidence = det.confidence;
                    track.stale_frames = 0;
                })
                .or_insert(SmoothedTrack {
                    category: det.category,
                    bbox: det.bbox,
                    confidence: det.confidence,
                    stale_frames: 0,
                });
        }

        let fade = self.cfg.fade_frames;
        self.tracks.retain(|_, t| t.stale_frames <= fade);
    }

    /// The track with the highest confidence, if any.
    #[must_use]
    pub fn best(&self) -> Option<&SmoothedTrack> {
        self.tracks
            .values()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    #[must_use]
    pub fn get(&self, category: u32) -> Option<&SmoothedTrack> {
        self.tracks.get(&category)
    }

    /// All live tracks, ordered by category for stable output.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SmoothedTrack> {
        let mut out: Vec<SmoothedTrack> = self.tracks.values().copied().collect();
        out.sort_by_key(|t| t.category);
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    // Out-of-range or non-finite alpha degrades to no smoothing.
    fn effective_alpha(&self) -> f32 {
        let a = self.cfg.ema_alpha;
        if a.is_finite() && a > 0.0 && a <= 1.0 {
            a
        } else {
            1.0
        }
    }
}

fn blend(old: BoundingBox, new: BoundingBox, alpha: f32) -> BoundingBox {
    let lerp = |o: f32, n: f32| (1.0 - alpha) * o + alpha * n;
    BoundingBox {
        x: lerp(old.x, new.x),
        y: lerp(old.y, new.y),
        w: lerp(old.w, new.w),
        h: lerp(old.h, new.h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(category: u32, confidence: f32, x: f32) -> Detection {
        Detection {
            category,
            confidence,
            bbox: BoundingBox::new(x, 10.0, 20.0, 20.0),
        }
    }

    #[test]
    fn first_detection_is_taken_verbatim() {
        let mut f = TrackFilter::new(FilterCfg::default());
        f.update(&[det(1, 0.9, 100.0)]);
        let t = f.get(1).expect("track");
        assert_eq!(t.bbox.x, 100.0);
        assert_eq!(t.stale_frames, 0);
    }

    #[test]
    fn repeated_detections_converge_on_the_box() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 0.4,
            fade_frames: 5,
        });
        f.update(&[det(1, 0.9, 0.0)]);
        for _ in 0..50 {
            f.update(&[det(1, 0.9, 100.0)]);
        }
        let t = f.get(1).expect("track");
        assert!((t.bbox.x - 100.0).abs() < 0.01, "x = {}", t.bbox.x);
    }

    #[test]
    fn alpha_one_snaps_to_latest() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 1.0,
            fade_frames: 5,
        });
        f.update(&[det(1, 0.5, 0.0)]);
        f.update(&[det(1, 0.5, 80.0)]);
        assert_eq!(f.get(1).map(|t| t.bbox.x), Some(80.0));
    }

    #[test]
    fn confidence_is_replaced_not_blended() {
        let mut f = TrackFilter::new(FilterCfg::default());
        f.update(&[det(1, 0.9, 0.0)]);
        f.update(&[det(1, 0.2, 0.0)]);
        assert_eq!(f.get(1).map(|t| t.confidence), Some(0.2));
    }

    #[test]
    fn track_survives_gap_up_to_fade_frames() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 0.4,
            fade_frames: 2,
        });
        f.update(&[det(1, 0.9, 0.0)]);
        f.update(&[]); // stale 1
        f.update(&[]); // stale 2 == fade, survives
        assert_eq!(f.len(), 1);
        f.update(&[]); // stale 3 > fade, evicted
        assert!(f.is_empty());
    }

    #[test]
    fn fade_zero_evicts_on_first_miss() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 0.4,
            fade_frames: 0,
        });
        f.update(&[det(1, 0.9, 0.0)]);
        f.update(&[]);
        assert!(f.is_empty());
    }

    #[test]
    fn redetection_resets_staleness() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 0.4,
            fade_frames: 1,
        });
        f.update(&[det(1, 0.9, 0.0)]);
        f.update(&[]);
        f.update(&[det(1, 0.9, 10.0)]);
        f.update(&[]);
        assert_eq!(f.len(), 1, "redetection should have restarted the fade");
    }

    #[test]
    fn categories_are_tracked_independently() {
        let mut f = TrackFilter::new(FilterCfg {
            ema_alpha: 1.0,
            fade_frames: 0,
        });
        f.update(&[det(1, 0.9, 0.0), det(2, 0.3, 50.0)]);
        f.update(&[det(2, 0.4, 60.0)]);
        assert!(f.get(1).is_none(), "category 1 missed a frame with fade 0");
        assert_eq!(f.get(2).map(|t| t.bbox.x), Some(60.0));
    }

    #[test]
    fn best_picks_highest_confidence() {
        let mut f = TrackFilter::new(FilterCfg::default());
        f.update(&[det(1, 0.3, 0.0), det(2, 0.8, 0.0), det(3, 0.5, 0.0)]);
        assert_eq!(f.best().map(|t| t.category), Some(2));
    }
}
