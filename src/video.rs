//! The playing video the overlay is attached to, and the clock that paces the overlay loop.

use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{
    geometry::{DisplaySize, Resolution},
    image::Image,
};

/// How much media data a video has buffered around its current playback position.
///
/// Variants are ordered, so `state >= ReadyState::HaveCurrentData` checks for "at least one
/// decoded frame".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    /// Nothing is known about the media yet.
    #[default]
    HaveNothing,
    /// Duration and intrinsic size are known, but no frame is decoded.
    HaveMetadata,
    /// The frame at the current playback position is available.
    HaveCurrentData,
    /// The current frame and at least the next one are available.
    HaveFutureData,
    /// Enough data is buffered to play through to the end at the current rate.
    HaveEnoughData,
}

impl ReadyState {
    /// Returns whether a frame can be read at the current playback position.
    #[inline]
    pub fn has_current_frame(self) -> bool {
        self >= Self::HaveCurrentData
    }
}

/// Read-only view of a playing video.
///
/// The overlay never controls playback; it only observes it. Implementations are typically thin
/// wrappers around the host's media player.
pub trait VideoSource {
    /// Returns the video's native resolution, if its metadata has been loaded.
    fn intrinsic_resolution(&self) -> Option<Resolution>;

    /// Returns the size of the box the video is rendered into on screen.
    fn display_size(&self) -> DisplaySize;

    fn ready_state(&self) -> ReadyState;

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;

    /// Returns a copy of the frame at the current playback position.
    ///
    /// Returns [`None`] if no frame can be read right now.
    fn current_frame(&mut self) -> Option<Image>;
}

impl<V: VideoSource + ?Sized> VideoSource for &mut V {
    fn intrinsic_resolution(&self) -> Option<Resolution> {
        (**self).intrinsic_resolution()
    }

    fn display_size(&self) -> DisplaySize {
        (**self).display_size()
    }

    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn is_ended(&self) -> bool {
        (**self).is_ended()
    }

    fn current_frame(&mut self) -> Option<Image> {
        (**self).current_frame()
    }
}

impl<V: VideoSource + ?Sized> VideoSource for Box<V> {
    fn intrinsic_resolution(&self) -> Option<Resolution> {
        (**self).intrinsic_resolution()
    }

    fn display_size(&self) -> DisplaySize {
        (**self).display_size()
    }

    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn is_ended(&self) -> bool {
        (**self).is_ended()
    }

    fn current_frame(&mut self) -> Option<Image> {
        (**self).current_frame()
    }
}

/// The host's display refresh signal.
pub trait FrameClock {
    /// Blocks until the next display frame should be produced.
    ///
    /// Returns the number of display frames that were missed since the previous call (because the
    /// caller took longer than one frame interval).
    fn wait_for_frame(&mut self) -> u32;
}

/// A [`FrameClock`] ticking at a fixed rate.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalClock {
    /// Creates a clock that ticks `fps` times per second.
    ///
    /// # Panics
    ///
    /// Panics if `fps` is zero.
    pub fn new(fps: u32) -> Self {
        assert_ne!(fps, 0, "frame rate must be positive");
        Self::with_interval(Duration::from_secs(1) / fps)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameClock for IntervalClock {
    fn wait_for_frame(&mut self) -> u32 {
        let now = Instant::now();
        let next = match self.next {
            // First tick fires right away.
            None => {
                self.next = Some(now + self.interval);
                return 0;
            }
            Some(next) => next,
        };

        if now < next {
            thread::sleep(next - now);
            self.next = Some(next + self.interval);
            return 0;
        }

        if self.interval.is_zero() {
            self.next = Some(now);
            return 0;
        }

        // Late: skip the deadlines we missed and realign to the interval grid.
        let late = now - next;
        let missed = (late.as_nanos() / self.interval.as_nanos()) as u32;
        self.next = Some(next + self.interval * (missed + 1));
        missed
    }
}
