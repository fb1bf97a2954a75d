//! The per-frame overlay loop.
//!
//! A [`FrameScheduler`] ties together one video, one overlay canvas and one detector session. It is
//! driven by calling [`FrameScheduler::tick`] once per display frame (or by handing it a
//! [`FrameClock`] via [`FrameScheduler::run`]) and moves through the following states:
//!
//! ```text
//! Idle -> Initializing -> Ready <-> Looping
//!              |            |          |
//!              +------------+----------+--> Stopped
//! ```
//!
//! While [`State::Looping`], every tick reads the current video frame, waits for the detector to
//! process it, then draws the skeleton and publishes the landmarks. Only one frame is ever being
//! processed: video frames that are shown while the detector is busy are never looked at.
//!
//! The host changes playback state and tears the overlay down through [`OverlayControls`], which
//! can be used from any thread.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    canvas::{self, Canvas},
    config::OverlayOptions,
    detector::{DetectorBootstrap, InitError},
    filter,
    geometry::DisplayGeometry,
    landmark::PoseFrame,
    render::SkeletonRenderer,
    session::{Detection, DetectorSession},
    timer::{FpsCounter, Timer},
    video::{FrameClock, VideoSource},
    worker::{Cancellation, Interrupted},
};

/// Lifecycle state of a [`FrameScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not mounted yet.
    Idle,
    /// The detector is being loaded and created.
    Initializing,
    /// The detector is ready, but playback is stopped (or the video has no data yet).
    Ready,
    /// Frames are being processed.
    Looping,
    /// Torn down, or initialization failed. This state is final.
    Stopped,
}

struct Shared {
    playing: AtomicBool,
    mirror: AtomicBool,
    data_available: AtomicBool,
    unmount: Cancellation,
}

/// Cloneable handle for controlling a [`FrameScheduler`] from the host.
#[derive(Clone)]
pub struct OverlayControls {
    shared: Arc<Shared>,
}

impl OverlayControls {
    fn new(mirror: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                playing: AtomicBool::new(false),
                mirror: AtomicBool::new(mirror),
                data_available: AtomicBool::new(false),
                unmount: Cancellation::new(),
            }),
        }
    }

    /// Tells the overlay whether the host considers the video to be playing.
    pub fn set_playing(&self, playing: bool) {
        self.shared.playing.store(playing, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    /// Sets whether published and drawn landmarks are mirrored horizontally.
    pub fn set_mirror(&self, mirror: bool) {
        self.shared.mirror.store(mirror, Ordering::SeqCst);
    }

    pub fn is_mirrored(&self) -> bool {
        self.shared.mirror.load(Ordering::SeqCst)
    }

    /// Signals that the video has decoded data for its current playback position.
    ///
    /// The host should call this whenever the video fires its "data loaded" event. A scheduler that
    /// was asked to play before any frame was available starts its loop on the next tick.
    pub fn notify_data_available(&self) {
        self.shared.data_available.store(true, Ordering::SeqCst);
    }

    /// Detaches the overlay from the video.
    ///
    /// A scheduler waiting on an in-flight detection wakes up and discards the result. The
    /// detector is closed by the thread driving the scheduler.
    pub fn unmount(&self) {
        self.shared.unmount.cancel();
    }

    pub fn is_unmounted(&self) -> bool {
        self.shared.unmount.is_cancelled()
    }

    fn take_data_available(&self) -> bool {
        self.shared.data_available.swap(false, Ordering::SeqCst)
    }

    fn clear_data_available(&self) {
        self.shared.data_available.store(false, Ordering::SeqCst);
    }

    fn cancellation(&self) -> &Cancellation {
        &self.shared.unmount
    }
}

impl fmt::Debug for OverlayControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayControls")
            .field("playing", &self.is_playing())
            .field("mirror", &self.is_mirrored())
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}

/// Counters describing what the overlay loop did so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Frames for which a pose was drawn and published.
    pub frames_processed: u64,
    /// Frames in which the detector found no pose (or failed).
    pub no_detections: u64,
    /// Display frames that passed while a detection was in flight.
    pub frames_dropped: u64,
    /// Frames whose skeleton could not be drawn.
    pub render_errors: u64,
}

impl fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} without pose, {} dropped, {} render errors",
            self.frames_processed, self.no_detections, self.frames_dropped, self.render_errors
        )
    }
}

type KeypointsCallback = Box<dyn FnMut(&PoseFrame) + Send>;

/// Drives pose detection and skeleton drawing for one video.
pub struct FrameScheduler<V: VideoSource, C: Canvas> {
    video: V,
    canvas: C,
    bootstrap: Arc<DetectorBootstrap>,
    options: OverlayOptions,
    renderer: SkeletonRenderer,
    controls: OverlayControls,
    on_keypoints: Option<KeypointsCallback>,
    session: Option<DetectorSession>,
    state: State,
    waiting_for_data: bool,
    stats: SchedulerStats,
    detect_timer: Timer,
    fps: FpsCounter,
}

impl<V: VideoSource, C: Canvas> FrameScheduler<V, C> {
    /// Creates an unmounted scheduler.
    ///
    /// Nothing is loaded until the first [`tick`][Self::tick] (or [`mount`][Self::mount]).
    /// Playback starts out stopped; use [`OverlayControls::set_playing`] to start it.
    pub fn new(
        video: V,
        canvas: C,
        bootstrap: Arc<DetectorBootstrap>,
        options: OverlayOptions,
    ) -> Self {
        Self {
            video,
            canvas,
            bootstrap,
            renderer: SkeletonRenderer::new(*options.skeleton_style()),
            controls: OverlayControls::new(options.is_mirrored()),
            options,
            on_keypoints: None,
            session: None,
            state: State::Idle,
            waiting_for_data: false,
            stats: SchedulerStats::default(),
            detect_timer: Timer::new("detect"),
            fps: FpsCounter::new("pose overlay"),
        }
    }

    /// Registers the callback that receives the landmarks of every processed frame.
    ///
    /// The landmarks are mirrored exactly when the drawn skeleton is. Frames without a detected
    /// pose don't invoke the callback.
    pub fn on_keypoints_detected<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&PoseFrame) + Send + 'static,
    {
        self.on_keypoints = Some(Box::new(callback));
        self
    }

    /// Returns a handle for controlling this scheduler from other threads.
    pub fn controls(&self) -> OverlayControls {
        self.controls.clone()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Loads the detector and opens a session for this overlay.
    ///
    /// On failure the overlay is disabled for good ([`State::Stopped`]); the error is logged and
    /// returned. Does nothing if the scheduler was already mounted.
    pub fn mount(&mut self) -> Result<(), InitError> {
        if self.state != State::Idle {
            return Ok(());
        }

        self.set_state(State::Initializing);
        let result = self
            .bootstrap
            .ensure_loaded()
            .map_err(InitError::from)
            .and_then(|factory| {
                DetectorSession::initialize(&*factory, self.options.detector_config())
            });
        match result {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(State::Ready);
                if self.controls.is_unmounted() {
                    self.teardown();
                }
                Ok(())
            }
            Err(e) => {
                log::error!("pose overlay disabled: {e}");
                self.set_state(State::Stopped);
                Err(e)
            }
        }
    }

    /// Advances the scheduler by one display frame and returns the new state.
    pub fn tick(&mut self) -> State {
        if self.controls.is_unmounted() {
            self.teardown();
            return self.state;
        }

        match self.state {
            State::Idle => {
                // Errors are logged by `mount`.
                self.mount().ok();
            }
            State::Ready => self.poll_ready(),
            State::Looping => self.step(),
            State::Initializing | State::Stopped => {}
        }
        self.state
    }

    /// Ticks the scheduler once per `clock` frame until it is stopped.
    ///
    /// Returns the final statistics.
    pub fn run<K: FrameClock + ?Sized>(&mut self, clock: &mut K) -> SchedulerStats {
        log::debug!("running pose overlay loop");
        loop {
            let missed = clock.wait_for_frame();
            if missed > 0 && self.state == State::Looping {
                log::trace!("{missed} display frames passed during detection");
                self.stats.frames_dropped += u64::from(missed);
            }
            if self.tick() == State::Stopped {
                break;
            }
        }
        log::debug!("pose overlay loop finished: {}", self.stats);
        self.stats
    }

    /// Detaches the overlay: closes the detector and enters [`State::Stopped`].
    pub fn unmount(&mut self) {
        self.controls.unmount();
        self.teardown();
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            log::debug!("pose overlay: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn playback_active(&self) -> bool {
        self.controls.is_playing() && !self.video.is_paused() && !self.video.is_ended()
    }

    fn poll_ready(&mut self) {
        if !self.playback_active() {
            if self.waiting_for_data {
                log::trace!("playback stopped, no longer waiting for video data");
                self.waiting_for_data = false;
            }
            return;
        }

        if self.waiting_for_data {
            // The video may have caught up without the host's signal reaching us.
            if self.controls.take_data_available() || self.video.ready_state().has_current_frame()
            {
                self.waiting_for_data = false;
                self.start_loop();
            }
            return;
        }

        // Signals raised before this point are stale. Clear before sampling the ready state so
        // that one arriving in between is kept.
        self.controls.clear_data_available();
        let ready_state = self.video.ready_state();
        if ready_state.has_current_frame() {
            self.start_loop();
        } else {
            log::debug!("video not ready ({ready_state:?}), waiting for data");
            self.waiting_for_data = true;
        }
    }

    fn start_loop(&mut self) {
        self.set_state(State::Looping);
        self.step();
    }

    fn stop_loop(&mut self) {
        self.set_state(State::Ready);
        canvas::clear(&mut self.canvas);
    }

    fn step(&mut self) {
        if !self.playback_active() {
            self.stop_loop();
            return;
        }

        let resolution = self.video.display_size().to_resolution();
        if self.canvas.resolution() != resolution {
            self.canvas.resize(resolution);
        }

        let ready_state = self.video.ready_state();
        if !ready_state.has_current_frame() {
            log::trace!("no current frame ({ready_state:?}), skipping tick");
            return;
        }
        let image = match self.video.current_frame() {
            Some(image) => image,
            None => {
                log::trace!("video returned no frame, skipping tick");
                return;
            }
        };

        let handle = match &mut self.session {
            Some(session) => session.process_image(image),
            None => return self.teardown(),
        };
        let detection = {
            let _timing = self.detect_timer.start();
            handle.block_or_cancel(self.controls.cancellation())
        };

        let detection = match detection {
            Ok(detection) => detection,
            Err(Interrupted::Cancelled) => {
                log::debug!("unmounted while detecting, discarding result");
                return self.teardown();
            }
            Err(Interrupted::Dropped) => {
                log::error!("pose detector session died, stopping overlay");
                return self.teardown();
            }
        };

        // Playback state may have changed while the detector was busy.
        if self.controls.is_unmounted() {
            return self.teardown();
        }
        if !self.playback_active() {
            log::trace!("playback stopped while detecting, discarding result");
            return self.stop_loop();
        }

        match detection {
            Detection::Pose(frame) => self.publish(&frame),
            Detection::NoDetection => self.stats.no_detections += 1,
        }

        self.fps.tick_with([
            &self.detect_timer as &dyn fmt::Display,
            &self.stats as &dyn fmt::Display,
        ]);
    }

    fn publish(&mut self, frame: &PoseFrame) {
        let geometry = DisplayGeometry::of_video(&self.video);
        let mirror = self.controls.is_mirrored();

        if let Err(e) = self
            .renderer
            .render(&mut self.canvas, frame, &geometry, mirror)
        {
            log::warn!("{e}, skipping draw");
            self.stats.render_errors += 1;
        }

        if self.controls.is_unmounted() {
            log::trace!("unmounted while drawing, not publishing landmarks");
            return;
        }
        let published = filter::transform(frame, mirror);
        if let Some(callback) = &mut self.on_keypoints {
            callback(&published);
        }
        self.stats.frames_processed += 1;
    }

    fn teardown(&mut self) {
        if self.state == State::Stopped {
            return;
        }

        if let Some(mut session) = self.session.take() {
            session.close();
        }
        canvas::clear(&mut self.canvas);
        self.set_state(State::Stopped);
        log::debug!("pose overlay torn down ({})", self.stats);
    }
}

impl<V: VideoSource, C: Canvas> Drop for FrameScheduler<V, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<V: VideoSource, C: Canvas> fmt::Debug for FrameScheduler<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("state", &self.state)
            .field("controls", &self.controls)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
