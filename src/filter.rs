//! Visibility gating and mirroring of landmarks.
//!
//! Landmarks below the visibility threshold stay in their [`PoseFrame`], but are neither drawn nor
//! considered as the end of a bone.

use crate::landmark::{Connection, Landmark, LandmarkIdx, PoseFrame, NUM_LANDMARKS};

/// Minimum visibility (exclusive) a landmark needs to be drawn.
pub const VISIBILITY_THRESHOLD: f32 = 0.65;

/// Mirrors a landmark horizontally, inverting its normalized X coordinate.
///
/// Applying this twice yields the original landmark.
#[inline]
pub fn mirror(landmark: Landmark) -> Landmark {
    landmark.with_x(1.0 - landmark.x())
}

/// Returns `frame` as it should be published: mirrored if `mirror` is set, unchanged otherwise.
///
/// This is the only transformation applied before handing landmarks to the host, so the published
/// coordinates always match what [`SkeletonRenderer`] draws for the same `mirror` setting.
///
/// [`SkeletonRenderer`]: crate::render::SkeletonRenderer
pub fn transform(frame: &PoseFrame, mirror: bool) -> PoseFrame {
    if mirror {
        frame.map(self::mirror)
    } else {
        frame.clone()
    }
}

/// Decides which landmarks are confident enough to be shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityGate {
    threshold: f32,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self {
            threshold: VISIBILITY_THRESHOLD,
        }
    }
}

impl VisibilityGate {
    /// Creates a gate that lets through landmarks with a visibility strictly greater than
    /// `threshold`.
    ///
    /// # Panics
    ///
    /// This method panics when `threshold` is not in range 0.0 to 1.0 (or is NaN).
    pub fn new(threshold: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "visibility threshold must be in range 0.0 to 1.0, got {threshold}"
        );
        Self { threshold }
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    pub fn is_visible(&self, landmark: &Landmark) -> bool {
        landmark.visibility() > self.threshold
    }

    /// Returns whether both ends of `bone` are visible in `frame`.
    pub fn is_bone_visible(&self, frame: &PoseFrame, (a, b): Connection) -> bool {
        self.is_visible(&frame[a]) && self.is_visible(&frame[b])
    }

    /// Returns an iterator over the landmarks of `frame` that pass the gate.
    pub fn visible<'a>(
        &'a self,
        frame: &'a PoseFrame,
    ) -> impl Iterator<Item = (LandmarkIdx, Landmark)> + 'a {
        LandmarkIdx::ALL
            .into_iter()
            .map(move |idx| (idx, frame[idx]))
            .filter(move |(_, lm)| self.is_visible(lm))
    }

    /// Computes the visibility of every landmark in `frame`.
    pub fn mask(&self, frame: &PoseFrame) -> [bool; NUM_LANDMARKS] {
        let mut mask = [false; NUM_LANDMARKS];
        for (visible, lm) in mask.iter_mut().zip(frame.iter()) {
            *visible = self.is_visible(&lm);
        }
        mask
    }
}
