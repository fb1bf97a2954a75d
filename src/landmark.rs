//! Body pose landmarks.
//!
//! A [`PoseFrame`] always holds exactly [`NUM_LANDMARKS`] landmarks in the order given by
//! [`LandmarkIdx`], so the [`CONNECTIONS`] table refers to the same joints in every frame.

use std::{fmt, ops::Index};

/// Number of landmarks in the body model.
pub const NUM_LANDMARKS: usize = 33;

type Position = [f32; 3];

/// A single body keypoint predicted by the detector.
///
/// Coordinates are normalized to the detector's input image (see the crate docs). Landmarks are
/// plain values: transformations like mirroring produce a new [`Landmark`].
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Landmark {
    pos: Position,
    visibility: f32,
}

impl Landmark {
    /// Creates a fully visible landmark at `position`.
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            pos: position,
            visibility: 1.0,
        }
    }

    /// Returns a copy of `self` with its visibility score set to `visibility`.
    pub fn with_visibility(self, visibility: f32) -> Self {
        Self { visibility, ..self }
    }

    /// Returns a copy of `self` with the X coordinate replaced by `x`.
    pub fn with_x(self, x: f32) -> Self {
        let [_, y, z] = self.pos;
        Self {
            pos: [x, y, z],
            ..self
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }

    /// Confidence that this landmark is visible in the image, in range 0.0 to 1.0.
    #[inline]
    pub fn visibility(&self) -> f32 {
        self.visibility
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            pos: [0.0; 3],
            visibility: 0.0,
        }
    }
}

/// All landmarks detected in one video frame.
#[derive(Clone, PartialEq)]
pub struct PoseFrame {
    landmarks: [Landmark; NUM_LANDMARKS],
}

impl PoseFrame {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { landmarks }
    }

    /// Returns the landmark for the given body part.
    #[inline]
    pub fn get(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx as usize]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Landmark> + Clone + '_ {
        self.landmarks.iter().copied()
    }

    /// Applies `f` to every landmark, producing a new [`PoseFrame`].
    pub fn map(&self, f: impl FnMut(Landmark) -> Landmark) -> Self {
        Self {
            landmarks: self.landmarks.map(f),
        }
    }
}

impl Default for PoseFrame {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); NUM_LANDMARKS],
        }
    }
}

impl Index<usize> for PoseFrame {
    type Output = Landmark;

    #[inline]
    fn index(&self, index: usize) -> &Landmark {
        &self.landmarks[index]
    }
}

impl Index<LandmarkIdx> for PoseFrame {
    type Output = Landmark;

    #[inline]
    fn index(&self, index: LandmarkIdx) -> &Landmark {
        &self.landmarks[index as usize]
    }
}

impl fmt::Debug for PoseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.landmarks.iter()).finish()
    }
}

/// Error returned when converting a list of landmarks of the wrong length into a [`PoseFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkCountError {
    len: usize,
}

impl fmt::Display for LandmarkCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pose frame needs exactly {NUM_LANDMARKS} landmarks, got {}",
            self.len
        )
    }
}

impl std::error::Error for LandmarkCountError {}

impl TryFrom<Vec<Landmark>> for PoseFrame {
    type Error = LandmarkCountError;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self, Self::Error> {
        let len = landmarks.len();
        let landmarks: [Landmark; NUM_LANDMARKS] = landmarks
            .try_into()
            .map_err(|_| LandmarkCountError { len })?;
        Ok(Self { landmarks })
    }
}

/// Index of each body part in a [`PoseFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LandmarkIdx {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// Coarse partition of the body model, used to pick joint colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRegion {
    /// Head and face landmarks.
    Core,
    /// Torso, arms and legs.
    Limb,
}

impl LandmarkIdx {
    /// All landmark indices, in [`PoseFrame`] order.
    pub const ALL: [Self; NUM_LANDMARKS] = {
        use LandmarkIdx::*;
        [
            Nose,
            LeftEyeInner,
            LeftEye,
            LeftEyeOuter,
            RightEyeInner,
            RightEye,
            RightEyeOuter,
            LeftEar,
            RightEar,
            MouthLeft,
            MouthRight,
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftPinky,
            RightPinky,
            LeftIndex,
            RightIndex,
            LeftThumb,
            RightThumb,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
            LeftHeel,
            RightHeel,
            LeftFootIndex,
            RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn region(self) -> BodyRegion {
        if self <= Self::MouthRight {
            BodyRegion::Core
        } else {
            BodyRegion::Limb
        }
    }

    /// Returns whether this is a head or face landmark.
    #[inline]
    pub fn is_core(self) -> bool {
        self.region() == BodyRegion::Core
    }
}

/// A bone: a pair of landmarks that are connected by a line when drawn.
pub type Connection = (LandmarkIdx, LandmarkIdx);

/// Every bone of the skeleton.
pub const CONNECTIONS: &[Connection] = {
    use LandmarkIdx::*;
    &[
        // face
        (Nose, LeftEyeInner),
        (LeftEyeInner, LeftEye),
        (LeftEye, LeftEyeOuter),
        (LeftEyeOuter, LeftEar),
        (Nose, RightEyeInner),
        (RightEyeInner, RightEye),
        (RightEye, RightEyeOuter),
        (RightEyeOuter, RightEar),
        (MouthLeft, MouthRight),
        // arms
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftWrist, LeftPinky),
        (LeftWrist, LeftIndex),
        (LeftWrist, LeftThumb),
        (LeftPinky, LeftIndex),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightWrist, RightPinky),
        (RightWrist, RightIndex),
        (RightWrist, RightThumb),
        (RightPinky, RightIndex),
        // torso
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        // legs
        (LeftHip, LeftKnee),
        (RightHip, RightKnee),
        (LeftKnee, LeftAnkle),
        (RightKnee, RightAnkle),
        (LeftAnkle, LeftHeel),
        (RightAnkle, RightHeel),
        (LeftHeel, LeftFootIndex),
        (RightHeel, RightFootIndex),
        (LeftAnkle, LeftFootIndex),
        (RightAnkle, RightFootIndex),
    ]
};
