//! Wayland client state and event handlers
//!
//! [`State`] is the dispatch target for every protocol object. Each object
//! type gets its own `Dispatch` implementation; the state is the explicit
//! context shared between them.

mod surface;

use std::time::Instant;

use log::{debug, info, trace, warn};
use wayland_client::protocol::{
    wl_buffer, wl_compositor, wl_keyboard, wl_output, wl_registry, wl_seat, wl_shm, wl_shm_pool,
};
use wayland_client::{delegate_noop, Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols::wp::fractional_scale::v1::client::wp_fractional_scale_manager_v1;
use wayland_protocols::wp::viewporter::client::{wp_viewport, wp_viewporter};
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

use crate::error::SetupError;
use crate::keyboard::{InputHandler, Keyboard};
use crate::layer_surface::LayerSurface;
use crate::output::{OutputRegistry, Transform};

pub use surface::{ShmSink, SurfaceRole};

/// Globals bound from the registry.
#[derive(Default)]
pub struct Globals {
    pub compositor: Option<wl_compositor::WlCompositor>,
    pub shm: Option<wl_shm::WlShm>,
    pub seat: Option<wl_seat::WlSeat>,
    pub layer_shell: Option<zwlr_layer_shell_v1::ZwlrLayerShellV1>,
    pub viewporter: Option<wp_viewporter::WpViewporter>,
    pub fractional_scale_manager:
        Option<wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1>,
}

impl Globals {
    pub fn compositor(&self) -> Result<&wl_compositor::WlCompositor, SetupError> {
        self.compositor
            .as_ref()
            .ok_or(SetupError::MissingGlobal("wl_compositor"))
    }

    pub fn shm(&self) -> Result<&wl_shm::WlShm, SetupError> {
        self.shm.as_ref().ok_or(SetupError::MissingGlobal("wl_shm"))
    }

    pub fn layer_shell(&self) -> Result<&zwlr_layer_shell_v1::ZwlrLayerShellV1, SetupError> {
        self.layer_shell
            .as_ref()
            .ok_or(SetupError::MissingGlobal("zwlr_layer_shell_v1"))
    }
}

/// What the probe surface has learned so far.
#[derive(Debug, Default)]
pub struct ProbeState {
    /// Output the probe surface entered.
    pub entered: Option<wl_output::WlOutput>,
    /// Preferred fractional scale, in 1/120 units.
    pub fractional_scale: Option<u32>,
}

pub struct State {
    pub globals: Globals,
    pub outputs: OutputRegistry<wl_output::WlOutput>,
    /// Registry global name of each bound output.
    output_globals: Vec<(u32, wl_output::WlOutput)>,
    pub wl_keyboard: Option<wl_keyboard::WlKeyboard>,
    pub keyboard: Keyboard,
    pub probe: ProbeState,
    pub layer: Option<LayerSurface<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1>>,
    pub input: Box<dyn InputHandler>,
    pub needs_redraw: bool,
    /// Deadline the event loop's repeat timer is set for.
    pub repeat_armed: Option<Instant>,
}

impl State {
    pub fn new(input: Box<dyn InputHandler>) -> Self {
        Self {
            globals: Globals::default(),
            outputs: OutputRegistry::new(),
            output_globals: Vec::new(),
            wl_keyboard: None,
            keyboard: Keyboard::new(),
            probe: ProbeState::default(),
            layer: None,
            input,
            needs_redraw: false,
            repeat_armed: None,
        }
    }

    /// Whether the repeat timer no longer matches the pending repeat.
    pub fn repeat_timer_stale(&self) -> bool {
        self.keyboard.repeat.deadline() != self.repeat_armed
    }

    /// Repeat timer expiry. The timer is one-shot, so it counts as disarmed.
    pub fn fire_repeat(&mut self, now: Instant) {
        self.repeat_armed = None;
        if let Some(input) = self.keyboard.fire_repeat(now) {
            trace!("Key repeat");
            self.input.on_key_press(&input);
            self.needs_redraw = true;
        }
    }

    /// Release outputs that are no longer tracked.
    pub fn release_outputs(&mut self, outputs: impl IntoIterator<Item = wl_output::WlOutput>) {
        for output in outputs {
            self.output_globals.retain(|(_, o)| *o != output);
            if output.version() >= 3 {
                output.release();
            }
        }
    }

    fn bind_global(
        &mut self,
        registry: &wl_registry::WlRegistry,
        name: u32,
        interface: &str,
        version: u32,
        qh: &QueueHandle<Self>,
    ) {
        if interface == wl_compositor::WlCompositor::interface().name {
            trace!("Binding wl_compositor");
            self.globals.compositor = Some(registry.bind(name, 4.min(version), qh, ()));
        } else if interface == wl_seat::WlSeat::interface().name {
            trace!("Binding wl_seat");
            self.globals.seat = Some(registry.bind(name, 7.min(version), qh, ()));
        } else if interface == wl_output::WlOutput::interface().name {
            trace!("Binding wl_output {}", name);
            let output: wl_output::WlOutput = registry.bind(name, 4.min(version), qh, ());
            self.outputs.add(output.clone());
            // Names arrive only from version 4 on.
            if version < 4 {
                self.outputs.update_name(&output, "");
            }
            self.output_globals.push((name, output));
        } else if interface == wl_shm::WlShm::interface().name {
            trace!("Binding wl_shm");
            self.globals.shm = Some(registry.bind(name, 1, qh, ()));
        } else if interface == zwlr_layer_shell_v1::ZwlrLayerShellV1::interface().name {
            trace!("Binding zwlr_layer_shell_v1");
            self.globals.layer_shell = Some(registry.bind(name, 3.min(version), qh, ()));
        } else if interface == wp_viewporter::WpViewporter::interface().name {
            trace!("Binding wp_viewporter");
            self.globals.viewporter = Some(registry.bind(name, 1, qh, ()));
        } else if interface
            == wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1::interface().name
        {
            trace!("Binding wp_fractional_scale_manager_v1");
            self.globals.fractional_scale_manager = Some(registry.bind(name, 1, qh, ()));
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for State {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => state.bind_global(registry, name, &interface, version, qh),
            wl_registry::Event::GlobalRemove { name } => {
                let Some(index) = state.output_globals.iter().position(|(n, _)| *n == name) else {
                    return;
                };
                let (_, output) = state.output_globals.remove(index);
                state.outputs.remove(&output);
                if output.version() >= 3 {
                    output.release();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_output::WlOutput, ()> for State {
    fn event(
        state: &mut Self,
        output: &wl_output::WlOutput,
        event: wl_output::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_output::Event::Geometry { transform, .. } => {
                if let WEnum::Value(transform) = transform {
                    state.outputs.update_transform(output, transform.into());
                }
            }
            wl_output::Event::Mode {
                flags,
                width,
                height,
                ..
            } => {
                let current = match flags {
                    WEnum::Value(flags) => flags.contains(wl_output::Mode::Current),
                    WEnum::Unknown(_) => false,
                };
                if current {
                    state
                        .outputs
                        .update_geometry(output, width.max(0) as u32, height.max(0) as u32);
                }
            }
            wl_output::Event::Scale { factor } => {
                state.outputs.update_scale(output, factor.max(1) as u32);
            }
            wl_output::Event::Name { name } => {
                state.outputs.update_name(output, &name);
            }
            wl_output::Event::Done => {
                if let Some(info) = state.outputs.get(output) {
                    debug!(
                        "Output {:?}: {}x{} scale {} {:?}",
                        info.name, info.width, info.height, info.scale, info.transform
                    );
                }
            }
            _ => {}
        }
    }
}

impl From<wl_output::Transform> for Transform {
    fn from(transform: wl_output::Transform) -> Self {
        match transform {
            wl_output::Transform::_90 => Transform::Rotate90,
            wl_output::Transform::_180 => Transform::Rotate180,
            wl_output::Transform::_270 => Transform::Rotate270,
            wl_output::Transform::Flipped => Transform::Flipped,
            wl_output::Transform::Flipped90 => Transform::Flipped90,
            wl_output::Transform::Flipped180 => Transform::Flipped180,
            wl_output::Transform::Flipped270 => Transform::Flipped270,
            _ => Transform::Normal,
        }
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for State {
    fn event(
        state: &mut Self,
        seat: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let wl_seat::Event::Capabilities { capabilities } = event else {
            return;
        };
        let have_keyboard = match capabilities {
            WEnum::Value(caps) => caps.contains(wl_seat::Capability::Keyboard),
            WEnum::Unknown(_) => false,
        };
        if have_keyboard && state.wl_keyboard.is_none() {
            debug!("Seat gained a keyboard");
            state.wl_keyboard = Some(seat.get_keyboard(qh, ()));
        } else if !have_keyboard {
            if let Some(keyboard) = state.wl_keyboard.take() {
                debug!("Seat lost its keyboard");
                if keyboard.version() >= 3 {
                    keyboard.release();
                }
            }
        }
    }
}

impl Dispatch<wl_keyboard::WlKeyboard, ()> for State {
    fn event(
        state: &mut Self,
        _: &wl_keyboard::WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                let format = match format {
                    WEnum::Value(format) => format,
                    WEnum::Unknown(raw) => {
                        warn!("Unknown keymap format {}", raw);
                        return;
                    }
                };
                if let Err(e) = state.keyboard.load_keymap(format, fd, size) {
                    warn!("Failed to load keymap: {}", e);
                }
            }
            wl_keyboard::Event::Key {
                key,
                state: key_state,
                ..
            } => {
                let now = Instant::now();
                if key_state == WEnum::Value(wl_keyboard::KeyState::Pressed) {
                    if let Some(input) = state.keyboard.key_press(key, now) {
                        state.input.on_key_press(&input);
                        state.needs_redraw = true;
                    }
                } else {
                    state.keyboard.key_release(key, now);
                }
            }
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => {
                state
                    .keyboard
                    .update_modifiers(mods_depressed, mods_latched, mods_locked, group);
            }
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                state.keyboard.set_repeat_info(rate, delay);
            }
            wl_keyboard::Event::Enter { .. } => trace!("Keyboard focus entered"),
            wl_keyboard::Event::Leave { .. } => {
                info!("Keyboard focus left");
                state.keyboard.repeat.active = false;
            }
            _ => {}
        }
    }
}

delegate_noop!(State: wl_compositor::WlCompositor);
delegate_noop!(State: ignore wl_shm::WlShm);
delegate_noop!(State: wl_shm_pool::WlShmPool);
delegate_noop!(State: ignore wl_buffer::WlBuffer);
delegate_noop!(State: zwlr_layer_shell_v1::ZwlrLayerShellV1);
delegate_noop!(State: wp_viewporter::WpViewporter);
delegate_noop!(State: wp_viewport::WpViewport);
delegate_noop!(State: wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1);
