use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};

use anyhow::bail;
use approx::assert_relative_eq;
use crossbeam::channel::{self, Receiver, Sender};
use pose_overlay::{
    canvas::{Canvas, OverlayCanvas},
    config::OverlayOptions,
    detector::{DetectorBootstrap, DetectorConfig, DetectorFactory, InitError, PoseDetector},
    geometry::{DisplaySize, Resolution},
    image::{Color, Image},
    landmark::{Landmark, LandmarkIdx, PoseFrame},
    render::SkeletonStyle,
    scheduler::{FrameScheduler, OverlayControls, SchedulerStats, State},
    video::{FrameClock, ReadyState, VideoSource},
};

struct VideoState {
    intrinsic: Option<Resolution>,
    display: DisplaySize,
    ready: ReadyState,
    paused: bool,
    ended: bool,
}

/// A video whose state the test changes while the scheduler is watching it.
#[derive(Clone)]
struct ScriptedVideo(Arc<Mutex<VideoState>>);

impl ScriptedVideo {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(VideoState {
            intrinsic: Some(Resolution::new(200, 100)),
            display: DisplaySize::new(200.0, 100.0),
            ready: ReadyState::HaveEnoughData,
            paused: false,
            ended: false,
        })))
    }

    fn update(&self, f: impl FnOnce(&mut VideoState)) {
        f(&mut self.0.lock().unwrap());
    }
}

impl VideoSource for ScriptedVideo {
    fn intrinsic_resolution(&self) -> Option<Resolution> {
        self.0.lock().unwrap().intrinsic
    }

    fn display_size(&self) -> DisplaySize {
        self.0.lock().unwrap().display
    }

    fn ready_state(&self) -> ReadyState {
        self.0.lock().unwrap().ready
    }

    fn is_paused(&self) -> bool {
        self.0.lock().unwrap().paused
    }

    fn is_ended(&self) -> bool {
        self.0.lock().unwrap().ended
    }

    fn current_frame(&mut self) -> Option<Image> {
        Some(Image::from_fn(20, 10, |_, _| Color::WHITE))
    }
}

#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    detects: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closes: AtomicUsize,
}

impl Counters {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
enum Outcome {
    Pose(PoseFrame),
    Nothing,
    Fail,
}

#[derive(Clone)]
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Instrumented detector: counts calls, concurrency and closes, and can be held mid-detection.
struct TestDetector {
    counters: Arc<Counters>,
    outcome: Arc<Mutex<Outcome>>,
    gate: Option<Gate>,
}

impl PoseDetector for TestDetector {
    fn detect(&mut self, _: &Image) -> anyhow::Result<Option<PoseFrame>> {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.counters.detects.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.entered.send(()).ok();
            gate.release.recv().ok();
        }

        let outcome = self.outcome.lock().unwrap().clone();
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        match outcome {
            Outcome::Pose(frame) => Ok(Some(frame)),
            Outcome::Nothing => Ok(None),
            Outcome::Fail => bail!("inference failed"),
        }
    }

    fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct Setup {
    video: ScriptedVideo,
    counters: Arc<Counters>,
    outcome: Arc<Mutex<Outcome>>,
    bootstrap: Arc<DetectorBootstrap>,
    published: Arc<Mutex<Vec<PoseFrame>>>,
    entered: Receiver<()>,
    release: Sender<()>,
}

impl Setup {
    fn new() -> Self {
        Self::build(false)
    }

    /// Every detection blocks until the test sends on `release`.
    fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        pose_overlay::init_logger!();

        let counters = Arc::new(Counters::default());
        let outcome = Arc::new(Mutex::new(Outcome::Pose(centered_pose())));
        let (entered_tx, entered) = channel::unbounded();
        let (release, release_rx) = channel::unbounded();
        let gate = gated.then(|| Gate {
            entered: entered_tx,
            release: release_rx,
        });

        let bootstrap = Arc::new(DetectorBootstrap::new({
            let counters = counters.clone();
            let outcome = outcome.clone();
            move || -> anyhow::Result<Arc<dyn DetectorFactory>> {
                counters.loads.fetch_add(1, Ordering::SeqCst);
                let counters = counters.clone();
                let outcome = outcome.clone();
                let gate = gate.clone();
                Ok(Arc::new(
                    move |_: &DetectorConfig| -> anyhow::Result<Box<dyn PoseDetector>> {
                        Ok(Box::new(TestDetector {
                            counters: counters.clone(),
                            outcome: outcome.clone(),
                            gate: gate.clone(),
                        }))
                    },
                ))
            }
        }));

        Self {
            video: ScriptedVideo::new(),
            counters,
            outcome,
            bootstrap,
            published: Default::default(),
            entered,
            release,
        }
    }

    fn scheduler_with<C: Canvas>(
        &self,
        canvas: C,
        options: OverlayOptions,
    ) -> FrameScheduler<ScriptedVideo, C> {
        let published = self.published.clone();
        FrameScheduler::new(
            self.video.clone(),
            canvas,
            self.bootstrap.clone(),
            options,
        )
        .on_keypoints_detected(move |frame| published.lock().unwrap().push(frame.clone()))
    }

    /// A mounted scheduler with playback enabled.
    fn playing(&self) -> FrameScheduler<ScriptedVideo, OverlayCanvas> {
        let mut scheduler = self.scheduler_with(OverlayCanvas::default(), OverlayOptions::default());
        assert_eq!(scheduler.tick(), State::Ready);
        scheduler.controls().set_playing(true);
        scheduler
    }

    fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn published(&self) -> Vec<PoseFrame> {
        self.published.lock().unwrap().clone()
    }

    fn detects(&self) -> usize {
        Counters::get(&self.counters.detects)
    }

    fn closes(&self) -> usize {
        Counters::get(&self.counters.closes)
    }
}

fn pose_with(f: impl FnMut(LandmarkIdx) -> Landmark) -> PoseFrame {
    PoseFrame::new(LandmarkIdx::ALL.map(f))
}

fn centered_pose() -> PoseFrame {
    pose_with(|_| Landmark::new([0.5, 0.5, 0.0]).with_visibility(0.9))
}

fn is_blank(canvas: &OverlayCanvas) -> bool {
    canvas.image().pixels().all(|c| c == Color::NONE)
}

#[test]
fn loop_processes_one_frame_per_tick() {
    let setup = Setup::new();
    let mut scheduler = setup.playing();
    for _ in 0..30 {
        assert_eq!(scheduler.tick(), State::Looping);
    }

    assert_eq!(setup.detects(), 30);
    assert_eq!(Counters::get(&setup.counters.max_in_flight), 1);
    assert_eq!(setup.published().len(), 30);
    assert_eq!(scheduler.stats().frames_processed, 30);
    assert!(!is_blank(scheduler.canvas()));
}

#[test]
fn only_one_detection_in_flight_with_slow_detector() {
    let setup = Setup::gated();
    let mut scheduler = setup.playing();
    let controls = scheduler.controls();

    let driver = thread::spawn(move || {
        for _ in 0..5 {
            scheduler.tick();
        }
        scheduler
    });

    for _ in 0..5 {
        setup.entered.recv().unwrap();
        // While this detection is held, no other one may start.
        assert_eq!(Counters::get(&setup.counters.in_flight), 1);
        setup.release.send(()).unwrap();
    }

    let scheduler = driver.join().unwrap();
    assert_eq!(Counters::get(&setup.counters.max_in_flight), 1);
    assert_eq!(setup.detects(), 5);
    assert_eq!(scheduler.state(), State::Looping);
    controls.unmount();
}

#[test]
fn pause_stops_callbacks_and_clears_canvas() {
    let setup = Setup::new();
    let mut scheduler = setup.playing();
    scheduler.tick();
    scheduler.tick();
    assert_eq!(setup.published().len(), 2);
    assert!(!is_blank(scheduler.canvas()));

    scheduler.controls().set_playing(false);
    assert_eq!(scheduler.tick(), State::Ready);
    assert!(is_blank(scheduler.canvas()));
    for _ in 0..5 {
        assert_eq!(scheduler.tick(), State::Ready);
    }
    assert_eq!(setup.published().len(), 2);
    assert_eq!(setup.detects(), 2);

    scheduler.controls().set_playing(true);
    assert_eq!(scheduler.tick(), State::Looping);
    assert_eq!(setup.published().len(), 3);
}

#[test]
fn paused_or_ended_video_stops_loop() {
    let setup = Setup::new();
    let mut scheduler = setup.playing();
    scheduler.tick();

    setup.video.update(|v| v.paused = true);
    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(scheduler.tick(), State::Ready);

    setup.video.update(|v| v.paused = false);
    assert_eq!(scheduler.tick(), State::Looping);

    setup.video.update(|v| v.ended = true);
    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(setup.detects(), 2);
}

#[test]
fn pause_during_detection_discards_result() {
    let setup = Setup::gated();
    let mut scheduler = setup.playing();
    let controls = scheduler.controls();

    let driver = thread::spawn(move || {
        let state = scheduler.tick();
        (scheduler, state)
    });
    setup.entered.recv().unwrap();
    controls.set_playing(false);
    setup.release.send(()).unwrap();

    let (scheduler, state) = driver.join().unwrap();
    assert_eq!(state, State::Ready);
    assert!(setup.published().is_empty());
    assert_eq!(scheduler.stats().frames_processed, 0);
    assert!(is_blank(scheduler.canvas()));
}

#[test]
fn unmount_during_detection_closes_once() {
    let setup = Setup::gated();
    let mut scheduler = setup.playing();
    let controls = scheduler.controls();

    let driver = thread::spawn(move || {
        let state = scheduler.tick();
        (scheduler, state)
    });
    setup.entered.recv().unwrap();
    controls.unmount();
    // The detector finishes its image before it can be closed.
    setup.release.send(()).unwrap();

    let (mut scheduler, state) = driver.join().unwrap();
    assert_eq!(state, State::Stopped);
    assert_eq!(setup.closes(), 1);
    assert!(setup.published().is_empty());

    // Stopped is final.
    controls.set_playing(true);
    assert_eq!(scheduler.tick(), State::Stopped);
    scheduler.unmount();
    drop(scheduler);
    assert_eq!(setup.closes(), 1);
    assert_eq!(setup.detects(), 1);
}

#[test]
fn dropping_scheduler_closes_detector() {
    let setup = Setup::new();
    let mut scheduler = setup.playing();
    scheduler.tick();
    assert_eq!(setup.closes(), 0);
    drop(scheduler);
    assert_eq!(setup.closes(), 1);
}

#[test]
fn unmount_before_mount_never_loads() {
    let setup = Setup::new();
    let mut scheduler = setup.scheduler_with(OverlayCanvas::default(), OverlayOptions::default());
    scheduler.controls().unmount();
    assert_eq!(scheduler.tick(), State::Stopped);
    assert_eq!(Counters::get(&setup.counters.loads), 0);
    assert!(!setup.bootstrap.is_loaded());
}

#[test]
fn bootstrap_failure_disables_overlay() {
    let bootstrap = Arc::new(DetectorBootstrap::new(
        || -> anyhow::Result<Arc<dyn DetectorFactory>> { bail!("pose module not found") },
    ));
    let mut scheduler = FrameScheduler::new(
        ScriptedVideo::new(),
        OverlayCanvas::default(),
        bootstrap,
        OverlayOptions::default(),
    );
    scheduler.controls().set_playing(true);

    let err = scheduler.mount().unwrap_err();
    assert!(matches!(err, InitError::Bootstrap(_)));
    assert_eq!(
        err.to_string(),
        "pose detector module unavailable: pose module not found"
    );
    assert_eq!(scheduler.state(), State::Stopped);
    assert_eq!(scheduler.tick(), State::Stopped);

    let mut clock = NoWaitClock::new(scheduler.controls(), 100);
    assert_eq!(scheduler.run(&mut clock), SchedulerStats::default());
    assert_eq!(clock.frames, 1);
}

#[test]
fn detector_creation_failure_disables_overlay() {
    let bootstrap = Arc::new(DetectorBootstrap::new(
        || -> anyhow::Result<Arc<dyn DetectorFactory>> {
            Ok(Arc::new(
                |_: &DetectorConfig| -> anyhow::Result<Box<dyn PoseDetector>> {
                    bail!("out of memory")
                },
            ))
        },
    ));
    let mut scheduler = FrameScheduler::new(
        ScriptedVideo::new(),
        OverlayCanvas::default(),
        bootstrap.clone(),
        OverlayOptions::default(),
    );
    assert_eq!(scheduler.tick(), State::Stopped);
    // The module itself loaded fine and stays cached.
    assert!(bootstrap.is_loaded());
}

#[test]
fn overlays_share_one_module_load() {
    let setup = Setup::new();
    let mut first = setup.playing();
    let mut second = setup.playing();
    first.tick();
    second.tick();
    assert_eq!(Counters::get(&setup.counters.loads), 1);
    assert_eq!(setup.detects(), 2);
    drop(first);
    assert_eq!(setup.closes(), 1);
    assert_eq!(second.tick(), State::Looping);
}

#[test]
fn detection_errors_skip_frames() {
    let setup = Setup::new();
    setup.set_outcome(Outcome::Fail);
    let mut scheduler = setup.playing();
    for _ in 0..3 {
        assert_eq!(scheduler.tick(), State::Looping);
    }
    assert!(setup.published().is_empty());
    assert_eq!(scheduler.stats().no_detections, 3);

    setup.set_outcome(Outcome::Nothing);
    scheduler.tick();
    assert!(setup.published().is_empty());
    assert_eq!(scheduler.stats().no_detections, 4);

    setup.set_outcome(Outcome::Pose(centered_pose()));
    scheduler.tick();
    assert_eq!(setup.published().len(), 1);
    assert_eq!(scheduler.stats().frames_processed, 1);
}

#[test]
fn start_is_deferred_until_data_available() {
    let setup = Setup::new();
    setup.video.update(|v| v.ready = ReadyState::HaveMetadata);
    let mut scheduler = setup.playing();

    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(setup.detects(), 0);

    setup.video.update(|v| v.ready = ReadyState::HaveCurrentData);
    scheduler.controls().notify_data_available();
    assert_eq!(scheduler.tick(), State::Looping);
    assert_eq!(setup.detects(), 1);
}

#[test]
fn stopping_playback_cancels_data_wait() {
    let setup = Setup::new();
    setup.video.update(|v| v.ready = ReadyState::HaveMetadata);
    let mut scheduler = setup.playing();
    let controls = scheduler.controls();
    assert_eq!(scheduler.tick(), State::Ready);

    controls.set_playing(false);
    assert_eq!(scheduler.tick(), State::Ready);
    // Raised while nobody is waiting.
    controls.notify_data_available();
    controls.set_playing(true);
    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(scheduler.tick(), State::Ready);
    assert_eq!(setup.detects(), 0);

    controls.notify_data_available();
    assert_eq!(scheduler.tick(), State::Looping);
}

/// Finishes loading right after its ready state is first read as lacking frame data, and fires
/// the host's "data loaded" signal at that moment.
struct LateLoadingVideo {
    inner: ScriptedVideo,
    controls: Arc<Mutex<Option<OverlayControls>>>,
}

impl VideoSource for LateLoadingVideo {
    fn intrinsic_resolution(&self) -> Option<Resolution> {
        self.inner.intrinsic_resolution()
    }

    fn display_size(&self) -> DisplaySize {
        self.inner.display_size()
    }

    fn ready_state(&self) -> ReadyState {
        let state = self.inner.ready_state();
        if !state.has_current_frame() {
            if let Some(controls) = self.controls.lock().unwrap().take() {
                self.inner.update(|v| v.ready = ReadyState::HaveCurrentData);
                controls.notify_data_available();
            }
        }
        state
    }

    fn is_paused(&self) -> bool {
        self.inner.is_paused()
    }

    fn is_ended(&self) -> bool {
        self.inner.is_ended()
    }

    fn current_frame(&mut self) -> Option<Image> {
        self.inner.current_frame()
    }
}

#[test]
fn data_signal_during_readiness_check_starts_loop() {
    let setup = Setup::new();
    setup.video.update(|v| v.ready = ReadyState::HaveMetadata);
    let hook = Arc::new(Mutex::new(None));
    let video = LateLoadingVideo {
        inner: setup.video.clone(),
        controls: hook.clone(),
    };
    let mut scheduler = FrameScheduler::new(
        video,
        OverlayCanvas::default(),
        setup.bootstrap.clone(),
        OverlayOptions::default(),
    );
    assert_eq!(scheduler.tick(), State::Ready);
    *hook.lock().unwrap() = Some(scheduler.controls());
    scheduler.controls().set_playing(true);

    assert_eq!(scheduler.tick(), State::Ready);
    assert!(hook.lock().unwrap().is_none());
    assert_eq!(scheduler.tick(), State::Looping);
    assert_eq!(setup.detects(), 1);
}

#[test]
fn loaded_video_starts_loop_without_signal() {
    let setup = Setup::new();
    setup.video.update(|v| v.ready = ReadyState::HaveMetadata);
    let mut scheduler = setup.playing();
    assert_eq!(scheduler.tick(), State::Ready);

    // The host's signal got lost, but the video caught up.
    setup.video.update(|v| v.ready = ReadyState::HaveEnoughData);
    assert_eq!(scheduler.tick(), State::Looping);
    assert_eq!(setup.detects(), 1);
}

#[test]
fn looping_skips_ticks_without_frame_data() {
    let setup = Setup::new();
    let mut scheduler = setup.playing();
    scheduler.tick();

    // Seeking: the current frame isn't decoded yet.
    setup.video.update(|v| v.ready = ReadyState::HaveMetadata);
    assert_eq!(scheduler.tick(), State::Looping);
    assert_eq!(setup.detects(), 1);

    setup.video.update(|v| v.ready = ReadyState::HaveFutureData);
    scheduler.tick();
    assert_eq!(setup.detects(), 2);
}

#[test]
fn mirror_applies_to_drawing_and_publishing() {
    let setup = Setup::new();
    setup.set_outcome(Outcome::Pose(pose_with(|idx| {
        let visibility = if idx == LandmarkIdx::Nose { 1.0 } else { 0.0 };
        Landmark::new([0.2, 0.5, 0.0]).with_visibility(visibility)
    })));
    let style = SkeletonStyle::default();

    let mut scheduler = setup.scheduler_with(
        OverlayCanvas::default(),
        OverlayOptions::default().mirror(true),
    );
    let controls = scheduler.controls();
    assert!(controls.is_mirrored());
    scheduler.tick();
    controls.set_playing(true);

    scheduler.tick();
    let published = setup.published();
    assert_relative_eq!(published[0][LandmarkIdx::Nose].x(), 0.8, epsilon = 1e-6);
    assert_eq!(published[0][LandmarkIdx::Nose].y(), 0.5);
    assert_eq!(scheduler.canvas().image().get(160, 50), style.core_color);
    assert_eq!(scheduler.canvas().image().get(40, 50), Color::NONE);

    controls.set_mirror(false);
    scheduler.tick();
    let published = setup.published();
    assert_eq!(published[1][LandmarkIdx::Nose].x(), 0.2);
    assert_eq!(scheduler.canvas().image().get(40, 50), style.core_color);
    assert_eq!(scheduler.canvas().image().get(160, 50), Color::NONE);
}

#[test]
fn letterboxed_video_is_drawn_inside_content() {
    let setup = Setup::new();
    // 400x100 video in a 200x100 box: 200x50 content, 25px bars above and below.
    setup.video.update(|v| v.intrinsic = Some(Resolution::new(400, 100)));
    setup.set_outcome(Outcome::Pose(pose_with(|idx| {
        let visibility = if idx == LandmarkIdx::LeftAnkle { 1.0 } else { 0.0 };
        Landmark::new([0.5, 0.0, 0.0]).with_visibility(visibility)
    })));
    let mut scheduler = setup.playing();
    scheduler.tick();

    let limb = SkeletonStyle::default().limb_color;
    assert_eq!(scheduler.canvas().image().get(100, 25), limb);
    assert_eq!(scheduler.canvas().image().get(100, 5), Color::NONE);
}

struct CountingCanvas {
    inner: OverlayCanvas,
    resizes: Arc<AtomicUsize>,
}

impl Canvas for CountingCanvas {
    fn resolution(&self) -> Resolution {
        self.inner.resolution()
    }

    fn resize(&mut self, resolution: Resolution) {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(resolution);
    }

    fn surface(&mut self) -> Option<&mut Image> {
        self.inner.surface()
    }
}

/// Unmounts the overlay the first time anything is drawn.
struct UnmountingCanvas {
    inner: OverlayCanvas,
    controls: Arc<Mutex<Option<OverlayControls>>>,
}

impl Canvas for UnmountingCanvas {
    fn resolution(&self) -> Resolution {
        self.inner.resolution()
    }

    fn resize(&mut self, resolution: Resolution) {
        self.inner.resize(resolution);
    }

    fn surface(&mut self) -> Option<&mut Image> {
        if let Some(controls) = self.controls.lock().unwrap().take() {
            controls.unmount();
        }
        self.inner.surface()
    }
}

#[test]
fn unmount_while_drawing_skips_callback() {
    let setup = Setup::new();
    let hook = Arc::new(Mutex::new(None));
    let canvas = UnmountingCanvas {
        inner: OverlayCanvas::default(),
        controls: hook.clone(),
    };
    let mut scheduler = setup.scheduler_with(canvas, OverlayOptions::default());
    assert_eq!(scheduler.tick(), State::Ready);
    *hook.lock().unwrap() = Some(scheduler.controls());
    scheduler.controls().set_playing(true);

    scheduler.tick();
    assert_eq!(setup.detects(), 1);
    assert!(setup.published().is_empty());
    assert_eq!(scheduler.stats().frames_processed, 0);

    assert_eq!(scheduler.tick(), State::Stopped);
    assert_eq!(setup.closes(), 1);
    assert!(setup.published().is_empty());
}

#[test]
fn canvas_is_resized_only_on_change() {
    let setup = Setup::new();
    let resizes = Arc::new(AtomicUsize::new(0));
    let canvas = CountingCanvas {
        inner: OverlayCanvas::default(),
        resizes: resizes.clone(),
    };
    let mut scheduler = setup.scheduler_with(canvas, OverlayOptions::default());
    scheduler.tick();
    scheduler.controls().set_playing(true);

    for _ in 0..5 {
        scheduler.tick();
    }
    assert_eq!(resizes.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.canvas().resolution(), Resolution::new(200, 100));

    setup.video.update(|v| v.display = DisplaySize::new(300.4, 99.6));
    scheduler.tick();
    scheduler.tick();
    assert_eq!(resizes.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.canvas().resolution(), Resolution::new(300, 100));
}

#[test]
fn render_errors_still_publish() {
    let setup = Setup::new();
    setup.video.update(|v| v.display = DisplaySize::new(0.0, 0.0));
    let mut scheduler = setup.playing();
    scheduler.tick();
    scheduler.tick();

    let stats = scheduler.stats();
    assert_eq!(stats.render_errors, 2);
    assert_eq!(stats.frames_processed, 2);
    assert_eq!(setup.published().len(), 2);
    assert_eq!(scheduler.state(), State::Looping);
}

/// A clock that never sleeps, reports a fixed number of missed frames, and unmounts the overlay
/// after `limit` frames.
struct NoWaitClock {
    controls: OverlayControls,
    frames: u32,
    limit: u32,
    missed: u32,
}

impl NoWaitClock {
    fn new(controls: OverlayControls, limit: u32) -> Self {
        Self {
            controls,
            frames: 0,
            limit,
            missed: 0,
        }
    }
}

impl FrameClock for NoWaitClock {
    fn wait_for_frame(&mut self) -> u32 {
        self.frames += 1;
        if self.frames == self.limit {
            self.controls.unmount();
        }
        self.missed
    }
}

#[test]
fn run_loop_until_unmounted() {
    let setup = Setup::new();
    let mut scheduler = setup.scheduler_with(OverlayCanvas::default(), OverlayOptions::default());
    scheduler.controls().set_playing(true);

    let mut clock = NoWaitClock::new(scheduler.controls(), 10);
    clock.missed = 2;
    let stats = scheduler.run(&mut clock);

    // Frame 1 mounts, frames 2 to 9 detect, frame 10 unmounts.
    assert_eq!(scheduler.state(), State::Stopped);
    assert_eq!(stats.frames_processed, 8);
    assert_eq!(setup.detects(), 8);
    // Missed frames only count once the loop is running (frames 3 to 10).
    assert_eq!(stats.frames_dropped, 16);
    assert_eq!(setup.closes(), 1);
}
