//! Pose detector configuration, backend traits and the one-time module bootstrap.
//!
//! The actual landmark model is provided by the host through three layers:
//!
//! - A [`DetectorModule`] knows how to load the model code and weights. Loading is expensive and
//!   happens at most once per [`DetectorBootstrap`].
//! - The loaded module yields a [`DetectorFactory`], which is shared by every overlay that uses
//!   the same bootstrap.
//! - Each overlay asks the factory for its own [`PoseDetector`] instance, configured by a
//!   [`DetectorConfig`].

use std::{error::Error, fmt, io, str::FromStr, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{image::Image, landmark::PoseFrame};

/// Size and accuracy tradeoff of the landmark model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelComplexity {
    /// Smallest and fastest model.
    Lite = 0,
    Full = 1,
    /// Largest and most accurate model.
    Heavy = 2,
}

impl ModelComplexity {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Lite),
            1 => Some(Self::Full),
            2 => Some(Self::Heavy),
            _ => None,
        }
    }

    #[inline]
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl Default for ModelComplexity {
    fn default() -> Self {
        Self::Full
    }
}

impl FromStr for ModelComplexity {
    type Err = ParseComplexityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "lite" => Ok(Self::Lite),
            "1" | "full" => Ok(Self::Full),
            "2" | "heavy" => Ok(Self::Heavy),
            _ => Err(ParseComplexityError { _priv: () }),
        }
    }
}

/// Error returned when parsing an invalid [`ModelComplexity`].
#[derive(Debug, Clone, Copy)]
pub struct ParseComplexityError {
    _priv: (),
}

impl fmt::Display for ParseComplexityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("model complexity must be one of 0, 1, 2, lite, full or heavy")
    }
}

impl Error for ParseComplexityError {}

/// Options passed to the detector backend when a [`PoseDetector`] is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    model_complexity: ModelComplexity,
    smooth_landmarks: bool,
    enable_segmentation: bool,
    smooth_segmentation: bool,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_complexity: ModelComplexity::Full,
            smooth_landmarks: true,
            enable_segmentation: false,
            smooth_segmentation: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

fn check_confidence(name: &str, value: f32) {
    assert!(
        (0.0..=1.0).contains(&value),
        "{name} must be in range 0.0 to 1.0, got {value}"
    );
}

impl DetectorConfig {
    pub fn model_complexity(self, model_complexity: ModelComplexity) -> Self {
        Self {
            model_complexity,
            ..self
        }
    }

    /// Sets whether the backend smooths landmarks across frames to reduce jitter.
    pub fn smooth_landmarks(self, smooth_landmarks: bool) -> Self {
        Self {
            smooth_landmarks,
            ..self
        }
    }

    /// Sets whether the backend also computes a segmentation mask.
    ///
    /// The overlay never draws the mask.
    pub fn enable_segmentation(self, enable_segmentation: bool) -> Self {
        Self {
            enable_segmentation,
            ..self
        }
    }

    pub fn smooth_segmentation(self, smooth_segmentation: bool) -> Self {
        Self {
            smooth_segmentation,
            ..self
        }
    }

    /// Sets the minimum confidence for a person detection to be considered successful.
    ///
    /// # Panics
    ///
    /// Panics if `confidence` is not in range 0.0 to 1.0.
    pub fn min_detection_confidence(self, confidence: f32) -> Self {
        check_confidence("minimum detection confidence", confidence);
        Self {
            min_detection_confidence: confidence,
            ..self
        }
    }

    /// Sets the minimum confidence for landmarks to be tracked from the previous frame instead of
    /// running person detection again.
    ///
    /// # Panics
    ///
    /// Panics if `confidence` is not in range 0.0 to 1.0.
    pub fn min_tracking_confidence(self, confidence: f32) -> Self {
        check_confidence("minimum tracking confidence", confidence);
        Self {
            min_tracking_confidence: confidence,
            ..self
        }
    }

    pub fn get_model_complexity(&self) -> ModelComplexity {
        self.model_complexity
    }

    pub fn get_smooth_landmarks(&self) -> bool {
        self.smooth_landmarks
    }

    pub fn get_enable_segmentation(&self) -> bool {
        self.enable_segmentation
    }

    pub fn get_smooth_segmentation(&self) -> bool {
        self.smooth_segmentation
    }

    pub fn get_min_detection_confidence(&self) -> f32 {
        self.min_detection_confidence
    }

    pub fn get_min_tracking_confidence(&self) -> f32 {
        self.min_tracking_confidence
    }
}

/// A pose landmark model instance.
///
/// Instances are owned by a single session and only ever called from its worker thread, one
/// image at a time.
pub trait PoseDetector: Send {
    /// Runs the model on `image`.
    ///
    /// Returns `Ok(None)` when no person was found. Errors are per-frame: the session logs them
    /// and keeps using the detector for later frames.
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<PoseFrame>>;

    /// Releases the resources held by the model.
    ///
    /// Called exactly once, before the detector is dropped.
    fn close(&mut self) {}
}

/// Creates configured [`PoseDetector`] instances.
pub trait DetectorFactory: Send + Sync {
    fn create(&self, config: &DetectorConfig) -> anyhow::Result<Box<dyn PoseDetector>>;
}

impl<F> DetectorFactory for F
where
    F: Fn(&DetectorConfig) -> anyhow::Result<Box<dyn PoseDetector>> + Send + Sync,
{
    fn create(&self, config: &DetectorConfig) -> anyhow::Result<Box<dyn PoseDetector>> {
        self(config)
    }
}

/// Loads the pose detector implementation and returns its [`DetectorFactory`].
pub trait DetectorModule: Send + Sync {
    fn load(&self) -> anyhow::Result<Arc<dyn DetectorFactory>>;
}

impl<F> DetectorModule for F
where
    F: Fn() -> anyhow::Result<Arc<dyn DetectorFactory>> + Send + Sync,
{
    fn load(&self) -> anyhow::Result<Arc<dyn DetectorFactory>> {
        self()
    }
}

/// Loads a [`DetectorModule`] on first use and caches the resulting [`DetectorFactory`].
///
/// A bootstrap is meant to be created once per application and shared (via [`Arc`]) by every
/// overlay.
pub struct DetectorBootstrap {
    module: Box<dyn DetectorModule>,
    factory: OnceCell<Arc<dyn DetectorFactory>>,
}

impl DetectorBootstrap {
    pub fn new<M: DetectorModule + 'static>(module: M) -> Self {
        Self {
            module: Box::new(module),
            factory: OnceCell::new(),
        }
    }

    /// Returns the detector factory, loading the module if that hasn't happened yet.
    ///
    /// Concurrent callers wait for a single in-flight load instead of starting their own. If the
    /// load fails, the error is returned to the caller that started it, and a later call will try
    /// again.
    pub fn ensure_loaded(&self) -> Result<Arc<dyn DetectorFactory>, BootstrapError> {
        self.factory
            .get_or_try_init(|| {
                log::debug!("loading pose detector module");
                match self.module.load() {
                    Ok(factory) => {
                        log::debug!("pose detector module loaded");
                        Ok(factory)
                    }
                    Err(e) => Err(BootstrapError { inner: e }),
                }
            })
            .map(Arc::clone)
    }

    /// Returns whether the module has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.factory.get().is_some()
    }
}

impl fmt::Debug for DetectorBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorBootstrap")
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// The pose detector module could not be loaded.
#[derive(Debug)]
pub struct BootstrapError {
    inner: anyhow::Error,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pose detector module unavailable: {}", self.inner)
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.inner)
    }
}

/// Reasons why an overlay could not get a working detector session.
#[derive(Debug)]
pub enum InitError {
    /// The detector module could not be loaded.
    Bootstrap(BootstrapError),
    /// The factory failed to create a detector instance.
    Detector(anyhow::Error),
    /// The detector worker thread could not be started.
    Spawn(io::Error),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Bootstrap(e) => fmt::Display::fmt(e, f),
            InitError::Detector(e) => write!(f, "failed to create pose detector: {e}"),
            InitError::Spawn(e) => write!(f, "failed to spawn pose detector worker: {e}"),
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InitError::Bootstrap(e) => Some(e),
            InitError::Detector(e) => Some(&**e),
            InitError::Spawn(e) => Some(e),
        }
    }
}

impl From<BootstrapError> for InitError {
    fn from(e: BootstrapError) -> Self {
        Self::Bootstrap(e)
    }
}
