//! Real-time body pose overlay for video playback.
//!
//! This crate drives a pose landmark detector frame by frame against a playing video, maps the
//! detector's normalized landmark coordinates onto the pixels the video actually occupies on
//! screen, and paints a skeleton onto a transparent overlay canvas. Every processed frame is also
//! handed to a host callback, so the landmarks can be persisted or scored elsewhere.
//!
//! The moving parts, from the bottom up:
//!
//! * [`landmark`]: the 33-point body topology, [`PoseFrame`] and the bone table.
//! * [`filter`]: the visibility gate and horizontal mirroring.
//! * [`geometry`]: [`DisplayGeometry`], which accounts for letterboxing and pillarboxing.
//! * [`render`]: [`SkeletonRenderer`], drawing onto any [`canvas::Canvas`].
//! * [`detector`] and [`session`]: loading the detector once, and running it on a worker thread
//!   with one promise per processed image.
//! * [`scheduler`]: [`FrameScheduler`], the state machine tying playback state, detection and
//!   rendering together.
//!
//! # Coordinates
//!
//! Landmarks use the detector's input image coordinates, normalized to `0.0..=1.0`: X points to the
//! right, Y points *down*, and the origin is the top left corner. Z is carried along but never used
//! for drawing.
//!
//! # Environment Variables
//!
//! [`OverlayOptions::from_env`] reads the following variables:
//!
//! * `POSE_OVERLAY_MODEL_COMPLEXITY`: `0`/`lite`, `1`/`full` or `2`/`heavy`.
//! * `POSE_OVERLAY_SMOOTH_LANDMARKS`: boolean flag.
//! * `POSE_OVERLAY_MIN_DETECTION_CONFIDENCE`: number in range 0.0 to 1.0.
//! * `POSE_OVERLAY_MIN_TRACKING_CONFIDENCE`: number in range 0.0 to 1.0.
//! * `POSE_OVERLAY_MIRROR`: boolean flag; initial value of the mirror setting.
//!
//! Invalid values are logged and ignored.
//!
//! [`PoseFrame`]: landmark::PoseFrame
//! [`DisplayGeometry`]: geometry::DisplayGeometry
//! [`SkeletonRenderer`]: render::SkeletonRenderer
//! [`FrameScheduler`]: scheduler::FrameScheduler
//! [`OverlayOptions::from_env`]: config::OverlayOptions::from_env

use log::LevelFilter;

pub mod canvas;
pub mod config;
pub mod detector;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod landmark;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod timer;
pub mod video;
pub mod worker;


/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this crate will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` can be used to override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
