//! Throughput and latency measurement for the overlay loop.

use std::{
    cell::{Cell, RefCell},
    fmt::{self, Arguments},
    time::{Duration, Instant},
};

const MAX_DURATIONS: usize = 250;

/// Measures and averages how long an operation (like a detector round trip) takes.
///
/// Collected timings are averaged and reset when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    durations: RefCell<Vec<Duration>>,
    overflowed: Cell<bool>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            durations: Default::default(),
            overflowed: Cell::new(false),
        }
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&mut self, start: Instant) {
        if self.overflowed.get() {
            return;
        }

        let duration = start.elapsed();
        let durations = self.durations.get_mut();
        if durations.len() < MAX_DURATIONS {
            durations.push(duration);
        } else {
            // Nobody is displaying this timer; stop collecting until someone does.
            self.overflowed.set(true);
            durations.clear();
        }
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overflowed.replace(false) {
            return write!(f, "{}: <overflowed>", self.name);
        }

        let mut durations = self.durations.borrow_mut();
        let len = durations.len();
        let num = len as f32;
        let avg_ms = durations
            .iter()
            .fold(0.0, |prev, new| prev + new.as_secs_f32() * 1000.0 / num);
        durations.clear();

        write!(f, "{}: {len}x{avg_ms:.01}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Logs frames per second with optional extra data.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS and `extra` data if one second has passed.
    ///
    /// `extra` is only formatted when a line is actually logged.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) {
        struct DisplayExtra<D: fmt::Display, I: Iterator<Item = D>>(Cell<Option<I>>);

        impl<D: fmt::Display, I: Iterator<Item = D>> fmt::Display for DisplayExtra<D, I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut iter = match self.0.take() {
                    Some(iter) => iter,
                    None => return Ok(()),
                };
                if let Some(item) = iter.next() {
                    write!(f, " ({item}")?;
                    for item in iter {
                        write!(f, ", {item}")?;
                    }
                    f.write_str(")")?;
                }
                Ok(())
            }
        }

        self.tick_impl(format_args!(
            "{}",
            DisplayExtra(Cell::new(Some(extra.into_iter())))
        ));
    }

    fn tick_impl(&mut self, args: Arguments<'_>) {
        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            log::debug!("{}: {} FPS{}", self.name, self.frames, args);

            self.frames = 0;
            self.start = Instant::now();
        }
    }
}
