//! Error taxonomy for the presentation and input core
//!
//! Only fatal setup failures and resource errors are represented here.
//! Benign races (keyboard events before a keymap, zero-sized configures) and
//! compatibility fallbacks are not errors; they are logged and absorbed where
//! they happen.

use std::io;

use thiserror::Error;
use wayland_client::{ConnectError, DispatchError};

/// Fatal conditions while bringing the surface up. None of these are retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not connect to a Wayland display")]
    Connect(#[from] ConnectError),

    #[error("compositor does not advertise {0}")]
    MissingGlobal(&'static str),

    #[error("compositor did not advertise any outputs")]
    NoOutputs,

    #[error("target output {0:?} was not found")]
    OutputNotFound(String),

    #[error("failed to set up shared memory buffers")]
    Shm(#[from] SwapchainError),

    #[error("round-trip with the compositor failed")]
    Dispatch(#[from] DispatchError),

    #[error("event loop failed")]
    EventLoop(#[from] calloop::Error),

    #[error("event queue is already owned by the event loop")]
    QueueTaken,
}

/// Failures of the double-buffered shared memory pool.
#[derive(Debug, Error)]
pub enum SwapchainError {
    #[error("buffer size {width}x{height} is not representable")]
    InvalidSize { width: u32, height: u32 },

    #[error("failed to allocate shared memory file")]
    Allocate(#[source] io::Error),

    #[error("failed to map shared memory")]
    Map(#[source] io::Error),

    #[error("swapchain has already been destroyed")]
    Destroyed,
}

/// Failures while loading a keymap sent by the compositor.
#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("unsupported keymap format")]
    UnsupportedFormat,

    #[error("failed to map keymap file")]
    Map(#[source] io::Error),

    #[error("keymap is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to compile keymap")]
    Compile,
}
