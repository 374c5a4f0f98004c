//! Surface-level handlers and adapters

use log::{debug, trace};
use std::os::fd::BorrowedFd;
use wayland_client::protocol::{wl_buffer, wl_shm, wl_shm_pool, wl_surface};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols::wp::fractional_scale::v1::client::wp_fractional_scale_v1;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1;

use super::State;
use crate::layer_surface::{ConfigureOutcome, LayerRole};
use crate::swapchain::BufferSink;

/// Which of our two surfaces a protocol object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    /// Throwaway 1x1 surface used to discover the output and its scale.
    Probe,
    /// The visible launcher surface.
    Main,
}

impl Dispatch<wl_surface::WlSurface, SurfaceRole> for State {
    fn event(
        state: &mut Self,
        _: &wl_surface::WlSurface,
        event: wl_surface::Event,
        role: &SurfaceRole,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match (event, role) {
            (wl_surface::Event::Enter { output }, SurfaceRole::Probe) => {
                debug!("Probe surface entered {:?}", state.outputs.get(&output).map(|o| &o.name));
                state.probe.entered = Some(output);
            }
            (wl_surface::Event::Enter { .. }, SurfaceRole::Main) => {
                trace!("Surface entered output")
            }
            _ => {}
        }
    }
}

impl Dispatch<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1, SurfaceRole> for State {
    fn event(
        state: &mut Self,
        layer_surface: &zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        role: &SurfaceRole,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match (event, role) {
            // The probe is never drawn at any real size; ack whatever arrives.
            (zwlr_layer_surface_v1::Event::Configure { serial, .. }, SurfaceRole::Probe) => {
                layer_surface.ack_configure(serial);
            }
            (
                zwlr_layer_surface_v1::Event::Configure {
                    serial,
                    width,
                    height,
                },
                SurfaceRole::Main,
            ) => {
                let Some(layer) = state.layer.as_mut() else {
                    return;
                };
                match layer.configure(serial, width, height) {
                    ConfigureOutcome::Initial | ConfigureOutcome::Resized => {
                        state.needs_redraw = true;
                    }
                    ConfigureOutcome::Deferred
                    | ConfigureOutcome::Unchanged
                    | ConfigureOutcome::Ignored => {}
                }
            }
            (zwlr_layer_surface_v1::Event::Closed, SurfaceRole::Main) => {
                if let Some(layer) = state.layer.as_mut() {
                    layer.close();
                }
            }
            (zwlr_layer_surface_v1::Event::Closed, SurfaceRole::Probe) => {
                debug!("Probe surface closed");
            }
            _ => {}
        }
    }
}

impl Dispatch<wp_fractional_scale_v1::WpFractionalScaleV1, ()> for State {
    fn event(
        state: &mut Self,
        _: &wp_fractional_scale_v1::WpFractionalScaleV1,
        event: wp_fractional_scale_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wp_fractional_scale_v1::Event::PreferredScale { scale } = event {
            debug!("Preferred fractional scale {}/120", scale);
            state.probe.fractional_scale = Some(scale);
        }
    }
}

impl LayerRole for zwlr_layer_surface_v1::ZwlrLayerSurfaceV1 {
    fn ack_configure(&self, serial: u32) {
        zwlr_layer_surface_v1::ZwlrLayerSurfaceV1::ack_configure(self, serial);
    }
}

/// Buffers for one surface, allocated from `wl_shm`.
pub struct ShmSink {
    shm: wl_shm::WlShm,
    surface: wl_surface::WlSurface,
    qh: QueueHandle<State>,
}

impl ShmSink {
    pub fn new(shm: wl_shm::WlShm, surface: wl_surface::WlSurface, qh: QueueHandle<State>) -> Self {
        Self { shm, surface, qh }
    }
}

impl BufferSink for ShmSink {
    type Pool = wl_shm_pool::WlShmPool;
    type Buffer = wl_buffer::WlBuffer;

    fn create_pool(&mut self, fd: BorrowedFd<'_>, size: i32) -> Self::Pool {
        self.shm.create_pool(fd, size, &self.qh, ())
    }

    fn create_buffer(
        &mut self,
        pool: &Self::Pool,
        offset: i32,
        width: i32,
        height: i32,
        stride: i32,
    ) -> Self::Buffer {
        pool.create_buffer(
            offset,
            width,
            height,
            stride,
            wl_shm::Format::Argb8888,
            &self.qh,
            (),
        )
    }

    fn present(&mut self, buffer: &Self::Buffer) {
        self.surface.attach(Some(buffer), 0, 0);
        if self.surface.version() >= 4 {
            self.surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        } else {
            self.surface.damage(0, 0, i32::MAX, i32::MAX);
        }
        self.surface.commit();
    }

    fn destroy_pool(&mut self, pool: Self::Pool) {
        pool.destroy();
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        buffer.destroy();
    }
}
