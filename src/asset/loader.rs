// asset/loader.rs
// Decode on the rayon pool, publish on the thread that calls `poll`.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::image::LoadOptions;
use crate::error::{ErrorQueue, LoadError};
use crate::io;
use crate::renderer::GraphicsDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadMode {
    /// Decode on a worker; publish during a later `poll`.
    #[default]
    Async,
    /// Decode and publish before `load` returns.
    Blocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

type Payload = Box<dyn Any + Send>;
type PublishFn = Box<dyn FnOnce(Result<Payload, LoadError>, &mut dyn GraphicsDevice) -> Result<(), LoadError>>;

struct PendingLoad {
    path: PathBuf,
    publish: PublishFn,
}

struct Finished {
    ticket: LoadTicket,
    result: Result<Payload, LoadError>,
}

/// Schedules file reads and decodes off the main thread.
///
/// The publish callback always runs on the thread that owns the loader, with
/// the graphics device, so GPU objects are only ever created there. It receives
/// the decode result; an `Err` it returns is pushed to the error queue instead
/// of being handed back to whoever requested the load.
pub struct AssetLoader {
    sender: Sender<Finished>,
    receiver: Receiver<Finished>,
    pending: HashMap<LoadTicket, PendingLoad>,
    next_ticket: u64,
    errors: ErrorQueue,
}

impl AssetLoader {
    pub fn new(errors: ErrorQueue) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            pending: HashMap::new(),
            next_ticket: 0,
            errors,
        }
    }

    pub fn load<D, Decode, Publish>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        path: impl Into<PathBuf>,
        decode: Decode,
        publish: Publish,
        options: LoadOptions,
        mode: LoadMode,
    ) -> LoadTicket
    where
        D: Send + 'static,
        Decode: FnOnce(&Path, &[u8], &LoadOptions) -> Result<D, LoadError> + Send + 'static,
        Publish: FnOnce(Result<D, LoadError>, &mut dyn GraphicsDevice) -> Result<(), LoadError> + 'static,
    {
        let path = path.into();
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        let payload_path = path.clone();
        let publish: PublishFn = Box::new(move |result, device| {
            let decoded = result.and_then(|payload| {
                payload
                    .downcast::<D>()
                    .map(|boxed| *boxed)
                    .map_err(|_| LoadError::Worker { path: payload_path })
            });
            publish(decoded, device)
        });

        match mode {
            LoadMode::Blocking => {
                let result = Self::read_and_decode::<D, Decode>(&path, decode, &options);
                self.complete(device, &path, publish, result);
            }
            LoadMode::Async => {
                log::debug!("Queued async load {:?} ({:?})", path, ticket);
                let sender = self.sender.clone();
                let worker_path = path.clone();
                rayon::spawn(move || {
                    let result = Self::read_and_decode::<D, Decode>(&worker_path, decode, &options);
                    // The receiver is owned by the loader; if it is gone nobody is
                    // waiting for this result anymore.
                    let _ = sender.send(Finished { ticket, result });
                });
                self.pending.insert(ticket, PendingLoad { path, publish });
            }
        }

        ticket
    }

    fn read_and_decode<D, Decode>(path: &Path, decode: Decode, options: &LoadOptions) -> Result<Payload, LoadError>
    where
        D: Send + 'static,
        Decode: FnOnce(&Path, &[u8], &LoadOptions) -> Result<D, LoadError>,
    {
        let bytes = io::load_binary(path)?;
        let decoded = decode(path, &bytes, options)?;
        Ok(Box::new(decoded))
    }

    fn complete(
        &self,
        device: &mut dyn GraphicsDevice,
        path: &Path,
        publish: PublishFn,
        result: Result<Payload, LoadError>,
    ) {
        match publish(result, device) {
            Ok(()) => log::debug!("Published {:?}", path),
            Err(err) => {
                log::warn!("Load of {:?} failed: {}", path, err);
                self.errors.push(path.display().to_string(), err);
            }
        }
    }

    fn finish(&mut self, device: &mut dyn GraphicsDevice, finished: Finished) {
        match self.pending.remove(&finished.ticket) {
            Some(load) => self.complete(device, &load.path, load.publish, finished.result),
            None => log::warn!("Finished load {:?} has no pending entry", finished.ticket),
        }
    }

    /// Publish every load that finished since the last call. Returns how many
    /// were published.
    pub fn poll(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let finished: Vec<Finished> = self.receiver.try_iter().collect();
        let count = finished.len();
        for done in finished {
            self.finish(device, done);
        }
        count
    }

    /// Block until every in-flight load is published or `timeout` elapses.
    /// Returns true when nothing is left in flight.
    pub fn wait_idle(&mut self, device: &mut dyn GraphicsDevice, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(done) => self.finish(device, done),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("{} loads still in flight after {:?}", self.pending.len(), timeout);
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RecordingDevice;
    use std::cell::Cell;
    use std::rc::Rc;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("wgpu_sprites_loader_{}_{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn decode_len(_: &Path, bytes: &[u8], _: &LoadOptions) -> Result<usize, LoadError> {
        Ok(bytes.len())
    }

    #[test]
    fn blocking_load_publishes_before_returning() {
        let path = temp_file("blocking.bin", b"12345");
        let mut device = RecordingDevice::new();
        let mut loader = AssetLoader::new(ErrorQueue::new());
        let seen = Rc::new(Cell::new(0));

        let sink = seen.clone();
        loader.load(
            &mut device,
            &path,
            decode_len,
            move |len, _device| {
                sink.set(len?);
                Ok(())
            },
            LoadOptions::default(),
            LoadMode::Blocking,
        );

        assert_eq!(seen.get(), 5);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn async_load_publishes_on_poll() {
        let path = temp_file("async.bin", b"abc");
        let mut device = RecordingDevice::new();
        let mut loader = AssetLoader::new(ErrorQueue::new());
        let seen = Rc::new(Cell::new(0));

        let sink = seen.clone();
        loader.load(
            &mut device,
            &path,
            decode_len,
            move |len, _device| {
                sink.set(len?);
                Ok(())
            },
            LoadOptions::default(),
            LoadMode::Async,
        );
        assert_eq!(loader.in_flight(), 1);

        assert!(loader.wait_idle(&mut device, Duration::from_secs(10)));
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn missing_file_error_is_queued_not_returned() {
        let errors = ErrorQueue::new();
        let mut device = RecordingDevice::new();
        let mut loader = AssetLoader::new(errors.clone());

        loader.load(
            &mut device,
            "missing/texture.png",
            decode_len,
            |len, _device| len.map(|_| ()),
            LoadOptions::default(),
            LoadMode::Async,
        );
        assert!(loader.wait_idle(&mut device, Duration::from_secs(10)));

        let drained = errors.drain();
        assert_eq!(drained.len(), 1);
        assert!(matches!(drained[0].error, LoadError::Io { .. }));
    }
}
