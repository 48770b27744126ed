// error.rs
use std::fmt;
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

use crate::renderer::render_pass::PassState;

/// Configuration and programming errors. These are surfaced immediately and are
/// expected to terminate the application at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown shader `{0}`")]
    UnknownShader(String),

    #[error("unknown texture slot `{0}`")]
    UnknownTextureSlot(String),

    #[error("render pass `{pass}` cannot move from {from:?} to {to:?}")]
    InvalidPassTransition {
        pass: String,
        from: PassState,
        to: PassState,
    },

    #[error("graphics device error: {0}")]
    Device(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Failures of the asynchronous asset path. These never interrupt a frame; they
/// are queued on an [`ErrorQueue`] and drained by the main loop.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path:?} has zero size")]
    EmptyImage { path: PathBuf },

    #[error("load worker for {path:?} returned an unexpected payload")]
    Worker { path: PathBuf },

    #[error("texture `{label}` is {width}x{height}, device limit is {max}")]
    TextureTooLarge {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("device rejected texture `{label}`: {reason}")]
    TextureCreation { label: String, reason: String },
}

#[derive(Debug)]
pub struct QueuedError {
    pub resource: String,
    pub error: LoadError,
}

impl fmt::Display for QueuedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.error)
    }
}

/// Process-level queue of errors raised away from the frame that caused them.
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct ErrorQueue {
    sender: Sender<QueuedError>,
    receiver: Receiver<QueuedError>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, resource: impl Into<String>, error: LoadError) {
        let queued = QueuedError {
            resource: resource.into(),
            error,
        };
        // Both ends live in `self`, so the channel cannot be disconnected here.
        if let Err(err) = self.sender.send(queued) {
            log::error!("Dropping error, queue disconnected: {}", err.0);
        }
    }

    pub fn drain(&self) -> Vec<QueuedError> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new()
    }
}
