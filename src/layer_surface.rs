//! Layer surface lifecycle
//!
//! Tracks the configure/ack handshake of the visible launcher surface and the
//! pixel size negotiated with the compositor. The protocol object is reached
//! through [`LayerRole`] so the state machine can run without a compositor.

use log::{debug, info};

use crate::scale::ScaleState;

/// Requests the controller sends back to the compositor.
pub trait LayerRole {
    fn ack_configure(&self, serial: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// Role assigned, initial state not yet committed.
    Created,
    /// Initial commit sent, waiting for the first usable configure.
    AwaitingConfigure,
    /// At least one configure acknowledged; buffers may be attached.
    Ready,
    /// The compositor closed the surface; no more attaches or commits.
    Closing,
}

/// What a configure event did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// The compositor left the size up to us; nothing was acknowledged.
    Deferred,
    /// First configure, surface became ready.
    Initial,
    /// Surface was already ready and its logical or pixel size changed.
    Resized,
    /// Surface was already ready and kept its size.
    Unchanged,
    /// Configure arrived after close and was ignored.
    Ignored,
}

pub struct LayerSurface<R> {
    role: R,
    state: LayerState,
    scale: ScaleState,
    /// Size from the last usable configure, in surface-local units.
    logical_width: u32,
    logical_height: u32,
    /// Buffer size in device pixels.
    pixel_width: u32,
    pixel_height: u32,
}

impl<R: LayerRole> LayerSurface<R> {
    pub fn new(role: R, scale: ScaleState) -> Self {
        Self {
            role,
            state: LayerState::Created,
            scale,
            logical_width: 0,
            logical_height: 0,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    pub fn role(&self) -> &R {
        &self.role
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    pub fn scale(&self) -> ScaleState {
        self.scale
    }

    /// Viewport destination for the current buffers.
    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    pub fn is_ready(&self) -> bool {
        self.state == LayerState::Ready
    }

    pub fn is_closing(&self) -> bool {
        self.state == LayerState::Closing
    }

    /// Record that the initial state has been committed.
    pub fn committed(&mut self) {
        if self.state == LayerState::Created {
            self.state = LayerState::AwaitingConfigure;
        }
    }

    /// Handle `zwlr_layer_surface_v1.configure`.
    pub fn configure(&mut self, serial: u32, width: u32, height: u32) -> ConfigureOutcome {
        if self.state == LayerState::Closing {
            return ConfigureOutcome::Ignored;
        }
        if width == 0 || height == 0 {
            debug!("Layer surface configure with no width or height");
            return ConfigureOutcome::Deferred;
        }

        let pixel_width = self.scale.apply(width);
        let pixel_height = self.scale.apply(height);
        debug!(
            "Layer surface configure {}x{} -> {}x{} px",
            width, height, pixel_width, pixel_height
        );

        let changed = (self.logical_width, self.logical_height) != (width, height)
            || (self.pixel_width, self.pixel_height) != (pixel_width, pixel_height);
        self.logical_width = width;
        self.logical_height = height;
        self.pixel_width = pixel_width;
        self.pixel_height = pixel_height;
        self.role.ack_configure(serial);

        if self.state == LayerState::Ready {
            if changed {
                ConfigureOutcome::Resized
            } else {
                ConfigureOutcome::Unchanged
            }
        } else {
            self.state = LayerState::Ready;
            ConfigureOutcome::Initial
        }
    }

    /// Handle `zwlr_layer_surface_v1.closed`.
    pub fn close(&mut self) {
        if self.state != LayerState::Closing {
            info!("Layer surface closed by compositor");
            self.state = LayerState::Closing;
        }
    }
}
