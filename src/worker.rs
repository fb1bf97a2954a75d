//! Worker threads and single-use promises.
//!
//! The pose detector runs on a [`Worker`] thread. Every request sent to it carries a [`Promise`],
//! which the worker fulfills with the result. The requesting side waits on the connected
//! [`PromiseHandle`], optionally giving up early when a [`Cancellation`] is triggered.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, select, Receiver, Sender};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity of 1 means that `Promise::fulfill` will never block, which is the property we want.
    let (sender, recv) = channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
///
/// A connected pair of [`Promise`] and [`PromiseHandle`] can be created by calling [`promise`].
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// This method does not block or fail. If the connected [`PromiseHandle`] was dropped (because
    /// the requester lost interest), `value` is dropped and nothing happens.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Creates a handle that is already resolved to `value`.
    pub fn ready(value: T) -> Self {
        let (promise, handle) = promise();
        promise.fulfill(value);
        handle
    }

    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Blocks the calling thread until the [`Promise`] is fulfilled or `cancellation` is
    /// triggered, whichever happens first.
    ///
    /// If `cancellation` was already triggered when this is called, it returns immediately without
    /// looking at the promise.
    pub fn block_or_cancel(self, cancellation: &Cancellation) -> Result<T, Interrupted> {
        if cancellation.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        select! {
            recv(self.recv) -> res => res.map_err(|_| Interrupted::Dropped),
            recv(cancellation.wake) -> _ => Err(Interrupted::Cancelled),
        }
    }

    /// Returns whether the associated [`Promise`] has been fulfilled.
    ///
    /// If this returns `true`, calling [`PromiseHandle::block`] on `self` will return immediately,
    /// without blocking.
    pub fn is_fulfilled(&self) -> bool {
        !self.recv.is_empty()
    }
}

/// An error returned by [`PromiseHandle::block`] indicating that the connected [`Promise`] object
/// was dropped without being fulfilled.
#[derive(Debug, Clone, Copy)]
pub struct PromiseDropped {
    _priv: (),
}

/// Reason why [`PromiseHandle::block_or_cancel`] returned without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The [`Cancellation`] was triggered.
    Cancelled,
    /// The [`Promise`] was dropped without being fulfilled.
    Dropped,
}

/// A cancellation flag that can wake up a thread blocked in
/// [`PromiseHandle::block_or_cancel`].
///
/// Clones share the same flag. Once cancelled, a [`Cancellation`] stays cancelled.
#[derive(Clone)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    waker: Sender<()>,
    wake: Receiver<()>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (waker, wake) = channel::bounded(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            waker,
            wake,
        }
    }

    /// Triggers the cancellation, waking up a thread waiting on it.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            // Only one waiter exists per cancellation; a full channel already has a wakeup queued.
            self.waker.try_send(()).ok();
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone)]
pub struct WorkerBuilder {
    name: Option<String>,
    capacity: usize,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the channel capacity of the [`Worker`].
    ///
    /// By default, a capacity of 0 is used, which means that [`Worker::send`] will block until the
    /// worker has finished processing any preceding message.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Spawns a [`Worker`] thread that uses `handler` to process incoming messages.
    ///
    /// `handler` is dropped on the worker thread once the [`Worker`] is dropped and all queued
    /// messages are processed, so values it owns can release their resources in [`Drop`].
    pub fn spawn<I, F>(self, mut handler: F) -> io::Result<Worker<I>>
    where
        I: Send + 'static,
        F: FnMut(I) + Send + 'static,
    {
        let (sender, recv) = channel::bounded(self.capacity);
        let mut builder = thread::Builder::new();
        if let Some(name) = self.name.clone() {
            builder = builder.name(name);
        }
        let name = self.name.unwrap_or_else(|| "<unnamed>".into());
        let handle = builder.spawn(move || {
            log::trace!("worker '{name}' starting");
            for message in recv {
                handler(message);
            }
            drop(handler);
            log::trace!("worker '{name}' exiting");
        })?;

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread will be dropped and the thread will be joined. If the
/// thread has panicked, the panic is logged instead of being propagated to the dropping thread.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        // Close the channel to signal the thread to exit.
        drop(self.sender.take());

        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder {
            name: None,
            capacity: 0,
        }
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        if let Some(handle) = self.handle.take() {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.join().is_err() {
                log::error!("worker '{name}' panicked");
            }
        }
    }

    /// Sends a message to the worker thread.
    ///
    /// This will block until the thread is available to accept the message.
    ///
    /// If the worker thread has exited (eg. because it panicked), the message is handed back as the
    /// error.
    pub fn send(&mut self, msg: I) -> Result<(), I> {
        let sender = match &self.sender {
            Some(sender) => sender,
            None => return Err(msg),
        };
        match sender.send(msg) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.wait_for_exit();
                Err(err.into_inner())
            }
        }
    }

    /// Returns whether the worker thread is still able to accept messages.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}
