//! Connection lifecycle and the main loop
//!
//! A [`Session`] owns the connection, the event queue and the dispatch
//! state. Setup runs strictly in order: bind globals, probe the output,
//! resolve the geometry, create the launcher surface. After that
//! [`Session::run`] hands the queue to a calloop event loop, where a
//! one-shot timer drives key repeat, until the surface is closed or the
//! input consumer asks to quit.

use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle, RegistrationToken};
use calloop_wayland_source::WaylandSource;
use log::{debug, info, trace, warn};
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, EventQueue, QueueHandle};
use wayland_protocols::wp::viewporter::client::wp_viewport::WpViewport;
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

use crate::error::SetupError;
use crate::geometry::{self, GeometrySpec, ResolvedGeometry};
use crate::keyboard::InputHandler;
use crate::layer_surface::LayerSurface;
use crate::probe::Probed;
use crate::render::Renderer;
use crate::scale::ScaleState;
use crate::swapchain::Swapchain;
use crate::wayland::{ShmSink, State, SurfaceRole};

/// Layer-shell namespace of the launcher surface.
pub const NAMESPACE: &str = "launcher";

/// How the launcher surface should be placed.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Output name to render on; empty for the compositor's choice.
    pub output: String,
    pub geometry: GeometrySpec,
}

struct Window {
    surface: WlSurface,
    layer_surface: zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
    viewport: Option<WpViewport>,
    swapchain: Option<Swapchain<ShmSink>>,
    geometry: ResolvedGeometry,
}

pub struct Session {
    conn: Connection,
    pub(crate) qh: QueueHandle<State>,
    /// Moves into the event loop once [`Session::run`] starts.
    queue: Option<EventQueue<State>>,
    pub(crate) state: State,
    window: Option<Window>,
    repeat_timer: Option<RegistrationToken>,
}

impl Session {
    /// Connect to the display named by the environment and bind globals.
    pub fn connect(input: Box<dyn InputHandler>) -> Result<Self, SetupError> {
        let conn = Connection::connect_to_env()?;
        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        conn.display().get_registry(&qh, ());

        let mut state = State::new(input);
        // The first round-trip binds globals, the second collects the
        // output and seat events they trigger.
        queue.roundtrip(&mut state)?;
        queue.roundtrip(&mut state)?;

        state.globals.compositor()?;
        state.globals.shm()?;
        state.globals.layer_shell()?;
        if state.globals.seat.is_none() {
            warn!("No seat advertised, keyboard input is unavailable");
        }
        debug!("Found {} outputs", state.outputs.len());

        Ok(Self {
            conn,
            qh,
            queue: Some(queue),
            state,
            window: None,
            repeat_timer: None,
        })
    }

    /// Block until the compositor has processed every request sent so far.
    pub(crate) fn roundtrip(&mut self) -> Result<(), SetupError> {
        let queue = self.queue.as_mut().ok_or(SetupError::QueueTaken)?;
        queue.roundtrip(&mut self.state)?;
        Ok(())
    }

    /// Probe the output, resolve the layout and map the launcher surface.
    pub fn setup(&mut self, options: &SessionOptions) -> Result<ResolvedGeometry, SetupError> {
        let probed = self.probe_output(&options.output)?;
        let geometry = geometry::resolve(
            &options.geometry,
            probed.output.width,
            probed.output.height,
            probed.scale,
        );
        info!(
            "Surface {}x{}, margins {:?}, exclusive zone {}",
            geometry.width, geometry.height, geometry.margin, geometry.exclusive_zone
        );
        self.create_window(&probed, geometry)?;
        Ok(geometry)
    }

    fn create_window(
        &mut self,
        probed: &Probed,
        geometry: ResolvedGeometry,
    ) -> Result<(), SetupError> {
        let qh = self.qh.clone();
        let compositor = self.state.globals.compositor()?.clone();
        let layer_shell = self.state.globals.layer_shell()?;

        let surface = compositor.create_surface(&qh, SurfaceRole::Main);
        let layer_surface = layer_shell.get_layer_surface(
            &surface,
            Some(&probed.output.handle),
            zwlr_layer_shell_v1::Layer::Overlay,
            NAMESPACE.to_owned(),
            &qh,
            SurfaceRole::Main,
        );
        layer_surface.set_keyboard_interactivity(
            zwlr_layer_surface_v1::KeyboardInteractivity::Exclusive,
        );
        layer_surface.set_anchor(geometry.anchor.edges());
        layer_surface.set_exclusive_zone(geometry.exclusive_zone);
        layer_surface.set_margin(
            clamp_i32(geometry.margin.top),
            clamp_i32(geometry.margin.right),
            clamp_i32(geometry.margin.bottom),
            clamp_i32(geometry.margin.left),
        );
        layer_surface.set_size(geometry.width, geometry.height);

        // A viewport needs a destination, so a size left to the compositor
        // falls back to integer buffer scaling.
        let sized = geometry.width > 0 && geometry.height > 0;
        let viewport = match self.state.globals.viewporter.as_ref() {
            Some(viewporter) if sized => {
                let viewport = viewporter.get_viewport(&surface, &qh, ());
                viewport.set_destination(clamp_i32(geometry.width), clamp_i32(geometry.height));
                Some(viewport)
            }
            _ => None,
        };
        let scale = if viewport.is_some() {
            probed.scale
        } else {
            if probed.scale.is_fractional() {
                warn!("Viewporter unavailable, falling back to integer scale");
            }
            surface.set_buffer_scale(clamp_i32(probed.output.scale));
            ScaleState::Integer(probed.output.scale)
        };

        let mut layer = LayerSurface::new(layer_surface.clone(), scale);
        surface.commit();
        layer.committed();
        self.state.layer = Some(layer);

        self.window = Some(Window {
            surface,
            layer_surface,
            viewport,
            swapchain: None,
            geometry,
        });
        Ok(())
    }

    /// Dispatch events and fire key repeats until the session ends.
    pub fn run(&mut self, renderer: &mut dyn Renderer) -> Result<(), SetupError> {
        let queue = self.queue.take().ok_or(SetupError::QueueTaken)?;
        let mut event_loop: EventLoop<'static, State> = EventLoop::try_new()?;
        let handle = event_loop.handle();
        WaylandSource::new(self.conn.clone(), queue)
            .insert(handle.clone())
            .map_err(|e| e.error)?;

        // Pending requests are flushed by the Wayland source before the
        // loop sleeps.
        while !self.should_stop() {
            self.present(renderer)?;
            self.sync_repeat_timer(&handle)?;
            event_loop.dispatch(None::<Duration>, &mut self.state)?;
        }
        self.close();
        Ok(())
    }

    /// Point the one-shot repeat timer at the pending repeat, if any.
    fn sync_repeat_timer(&mut self, handle: &LoopHandle<'static, State>) -> Result<(), SetupError> {
        if !self.state.repeat_timer_stale() {
            return Ok(());
        }
        if let Some(token) = self.repeat_timer.take() {
            // An expired timer has already removed itself.
            if self.state.repeat_armed.is_some() {
                handle.remove(token);
            }
        }

        let deadline = self.state.keyboard.repeat.deadline();
        if let Some(deadline) = deadline {
            trace!("Repeat timer armed");
            let token = handle
                .insert_source(Timer::from_deadline(deadline), |_, _, state| {
                    state.fire_repeat(Instant::now());
                    TimeoutAction::Drop
                })
                .map_err(|e| e.error)?;
            self.repeat_timer = Some(token);
        }
        self.state.repeat_armed = deadline;
        Ok(())
    }

    fn should_stop(&self) -> bool {
        if self.state.input.should_quit() {
            debug!("Input handler requested exit");
            return true;
        }
        self.state
            .layer
            .as_ref()
            .map_or(true, |layer| layer.is_closing())
    }

    /// Draw a frame if the surface is ready and something changed.
    fn present(&mut self, renderer: &mut dyn Renderer) -> Result<(), SetupError> {
        let (Some(layer), Some(window)) = (self.state.layer.as_ref(), self.window.as_mut()) else {
            return Ok(());
        };
        if !layer.is_ready() || !self.state.needs_redraw {
            return Ok(());
        }
        let (width, height) = layer.pixel_size();
        let (logical_width, logical_height) = layer.logical_size();
        let scale = layer.scale();

        let stale = window
            .swapchain
            .as_ref()
            .map_or(true, |s| (s.width(), s.height()) != (width, height));
        if stale {
            if let Some(mut old) = window.swapchain.take() {
                old.destroy();
            }
            let shm = self.state.globals.shm()?.clone();
            let sink = ShmSink::new(shm, window.surface.clone(), self.qh.clone());
            window.swapchain = Some(Swapchain::new(sink, width, height)?);
            // The buffer is larger than the surface under fractional scale.
            if let Some(viewport) = window.viewport.as_ref() {
                viewport.set_destination(clamp_i32(logical_width), clamp_i32(logical_height));
            }
        }

        if let Some(swapchain) = window.swapchain.as_mut() {
            let mut frame = swapchain.frame()?;
            renderer.render(&mut frame, &window.geometry, scale);
            swapchain.draw()?;
        }
        self.state.needs_redraw = false;
        Ok(())
    }

    /// Tear down the launcher surface. Safe to call more than once.
    pub fn close(&mut self) {
        let Some(mut window) = self.window.take() else {
            return;
        };
        if let Some(mut swapchain) = window.swapchain.take() {
            swapchain.destroy();
        }
        window.layer_surface.destroy();
        if let Some(viewport) = window.viewport.take() {
            viewport.destroy();
        }
        window.surface.destroy();
        self.state.layer = None;
        if let Err(e) = self.conn.flush() {
            debug!("Flush during shutdown failed: {}", e);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
