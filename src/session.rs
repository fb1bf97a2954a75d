//! A pose detector running on its own worker thread.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    detector::{DetectorConfig, DetectorFactory, InitError, PoseDetector},
    image::Image,
    landmark::PoseFrame,
    worker::{promise, Promise, PromiseHandle, Worker},
};

/// Result of running the detector on one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Pose(PoseFrame),
    /// No person was found, or the detector failed on this image.
    NoDetection,
}

impl Detection {
    pub fn pose(&self) -> Option<&PoseFrame> {
        match self {
            Detection::Pose(frame) => Some(frame),
            Detection::NoDetection => None,
        }
    }

    pub fn into_pose(self) -> Option<PoseFrame> {
        match self {
            Detection::Pose(frame) => Some(frame),
            Detection::NoDetection => None,
        }
    }
}

struct Request {
    image: Image,
    promise: Promise<Detection>,
}

/// Owns the detector on the worker thread and closes it when the worker exits.
struct Backend {
    detector: Box<dyn PoseDetector>,
    detections: u64,
}

impl Backend {
    fn handle(&mut self, Request { image, promise }: Request) {
        self.detections += 1;
        // A panicking model only loses this frame, not the session.
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.detector.detect(&image)));
        let detection = match result {
            Ok(Ok(Some(frame))) => Detection::Pose(frame),
            Ok(Ok(None)) => Detection::NoDetection,
            Ok(Err(e)) => {
                log::warn!("pose detection failed on {} frame: {e:#}", image.resolution());
                Detection::NoDetection
            }
            Err(_) => {
                log::error!("pose detector panicked on {} frame", image.resolution());
                Detection::NoDetection
            }
        };
        promise.fulfill(detection);
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        log::debug!("closing pose detector after {} images", self.detections);
        self.detector.close();
    }
}

/// Handle to a configured pose detector.
///
/// Images are processed one at a time on a dedicated worker thread. [`process_image`] hands out a
/// [`PromiseHandle`] per call; the caller is expected to wait for it before submitting the next
/// image.
///
/// [`process_image`]: DetectorSession::process_image
pub struct DetectorSession {
    worker: Option<Worker<Request>>,
}

impl DetectorSession {
    /// Creates a detector with `config` and starts the worker thread it runs on.
    pub fn initialize(
        factory: &dyn DetectorFactory,
        config: &DetectorConfig,
    ) -> Result<Self, InitError> {
        log::debug!("creating pose detector with {config:?}");
        let detector = factory.create(config).map_err(InitError::Detector)?;
        Self::spawn(detector)
    }

    /// Wraps an already created detector.
    pub fn spawn(detector: Box<dyn PoseDetector>) -> Result<Self, InitError> {
        let mut backend = Backend {
            detector,
            detections: 0,
        };
        let worker = Worker::builder()
            .name("pose detector")
            .spawn(move |request| backend.handle(request))
            .map_err(InitError::Spawn)?;
        Ok(Self {
            worker: Some(worker),
        })
    }

    /// Submits `image` to the detector.
    ///
    /// The returned handle resolves once the detector is done with the image. Failing or panicking
    /// detections resolve to [`Detection::NoDetection`]. If the session is closed, or its worker thread has
    /// died, the promise is dropped and the handle reports that instead.
    pub fn process_image(&mut self, image: Image) -> PromiseHandle<Detection> {
        let (promise, handle) = promise();
        let worker = match &mut self.worker {
            Some(worker) => worker,
            None => {
                log::trace!("process_image called on closed session");
                return handle;
            }
        };
        if worker.send(Request { image, promise }).is_err() {
            log::error!("pose detector worker is gone, closing session");
            self.worker = None;
        }
        handle
    }

    /// Closes the detector and stops the worker thread.
    ///
    /// If an image is still being processed, this waits for it to finish. Calling this on a closed
    /// session does nothing.
    pub fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            log::debug!("closing detector session");
            drop(worker);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.worker.is_none()
    }
}

impl Drop for DetectorSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DetectorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorSession")
            .field("closed", &self.is_closed())
            .finish()
    }
}
