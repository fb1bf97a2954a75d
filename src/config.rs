//! Overlay options and their environment variable overrides.

use std::{
    env::{self, VarError},
    fmt,
    str::FromStr,
};

use crate::{
    detector::{DetectorConfig, ModelComplexity},
    render::SkeletonStyle,
};

const MODEL_COMPLEXITY: &str = "POSE_OVERLAY_MODEL_COMPLEXITY";
const SMOOTH_LANDMARKS: &str = "POSE_OVERLAY_SMOOTH_LANDMARKS";
const MIN_DETECTION_CONFIDENCE: &str = "POSE_OVERLAY_MIN_DETECTION_CONFIDENCE";
const MIN_TRACKING_CONFIDENCE: &str = "POSE_OVERLAY_MIN_TRACKING_CONFIDENCE";
const MIRROR: &str = "POSE_OVERLAY_MIRROR";

/// Everything needed to set up one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlayOptions {
    detector: DetectorConfig,
    mirror: bool,
    style: SkeletonStyle,
}

impl OverlayOptions {
    /// Returns the default options with overrides from `POSE_OVERLAY_*` environment variables
    /// applied.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| match env::var(name) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(s)) => {
                log::warn!(
                    "invalid value set for `{name}` variable: {}; ignoring",
                    s.to_string_lossy()
                );
                None
            }
        })
    }

    /// Applies overrides looked up by variable name through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut detector = self.detector;
        if let Some(complexity) = parse_var::<ModelComplexity>(&lookup, MODEL_COMPLEXITY) {
            detector = detector.model_complexity(complexity);
        }
        if let Some(smooth) = flag_var(&lookup, SMOOTH_LANDMARKS) {
            detector = detector.smooth_landmarks(smooth);
        }
        if let Some(conf) = confidence_var(&lookup, MIN_DETECTION_CONFIDENCE) {
            detector = detector.min_detection_confidence(conf);
        }
        if let Some(conf) = confidence_var(&lookup, MIN_TRACKING_CONFIDENCE) {
            detector = detector.min_tracking_confidence(conf);
        }
        self.detector = detector;
        if let Some(mirror) = flag_var(&lookup, MIRROR) {
            self.mirror = mirror;
        }
        self
    }

    pub fn detector(self, detector: DetectorConfig) -> Self {
        Self { detector, ..self }
    }

    /// Sets whether landmarks are mirrored horizontally, for front-facing mirrored video.
    ///
    /// By default, landmarks are not mirrored.
    pub fn mirror(self, mirror: bool) -> Self {
        Self { mirror, ..self }
    }

    pub fn style(self, style: SkeletonStyle) -> Self {
        Self { style, ..self }
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        &self.detector
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror
    }

    pub fn skeleton_style(&self) -> &SkeletonStyle {
        &self.style
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = lookup(name)?;
    match value.parse() {
        Ok(v) => {
            log::debug!("{name}={value}");
            Some(v)
        }
        Err(e) => {
            log::warn!("invalid value set for `{name}` variable: '{value}' ({e}); ignoring");
            None
        }
    }
}

fn flag_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let value = lookup(name)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!("invalid value set for `{name}` variable: '{value}'; ignoring");
            None
        }
    }
}

fn confidence_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<f32> {
    let conf = parse_var::<f32>(lookup, name)?;
    if (0.0..=1.0).contains(&conf) {
        Some(conf)
    } else {
        log::warn!("`{name}` must be in range 0.0 to 1.0, got {conf}; ignoring");
        None
    }
}
