//! Output and scale discovery
//!
//! Layer shell gives no way to ask which output a surface will land on or at
//! what scale, so a throwaway 1x1 background surface is mapped first. The
//! compositor tells it which output it entered and, if supported, the
//! preferred fractional scale. The probe is torn down before the real
//! surface is created.

use log::{debug, info};
use wayland_client::protocol::wl_output::WlOutput;
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

use crate::error::SetupError;
use crate::output::SelectedOutput;
use crate::scale::ScaleState;
use crate::session::Session;
use crate::swapchain::Swapchain;
use crate::wayland::{ShmSink, SurfaceRole};

/// Result of probing: the output to render on and the scale to render at.
#[derive(Debug, Clone)]
pub struct Probed {
    pub output: SelectedOutput<WlOutput>,
    pub scale: ScaleState,
}

impl Session {
    /// Map a 1x1 probe surface, then settle on a single output.
    ///
    /// `target` names the output to use; empty means "wherever the
    /// compositor puts us". Every other output is released.
    pub fn probe_output(&mut self, target: &str) -> Result<Probed, SetupError> {
        if self.state.outputs.is_empty() {
            return Err(SetupError::NoOutputs);
        }
        let qh = self.qh.clone();
        let compositor = self.state.globals.compositor()?.clone();
        let layer_shell = self.state.globals.layer_shell()?.clone();
        let shm = self.state.globals.shm()?.clone();

        let surface = compositor.create_surface(&qh, SurfaceRole::Probe);
        let fractional = self
            .state
            .globals
            .fractional_scale_manager
            .as_ref()
            .map(|manager| manager.get_fractional_scale(&surface, &qh, ()));

        // Unknown names are caught below, after the probe is gone.
        let hint = if target.is_empty() {
            None
        } else {
            self.state.outputs.find_by_name(target).cloned()
        };

        let layer = layer_shell.get_layer_surface(
            &surface,
            hint.as_ref(),
            zwlr_layer_shell_v1::Layer::Background,
            "probe".to_owned(),
            &qh,
            SurfaceRole::Probe,
        );
        layer.set_keyboard_interactivity(zwlr_layer_surface_v1::KeyboardInteractivity::Exclusive);
        layer.set_size(1, 1);
        surface.commit();
        self.roundtrip()?;

        // Mapping the probe is what makes the compositor send enter and
        // preferred_scale.
        let mut swapchain = Swapchain::new(ShmSink::new(shm, surface.clone(), qh.clone()), 1, 1)?;
        swapchain.draw()?;
        self.roundtrip()?;

        swapchain.destroy();
        layer.destroy();
        if let Some(fractional) = fractional {
            fractional.destroy();
        }
        surface.destroy();

        let entered = self.state.probe.entered.take();
        let chosen = self
            .state
            .outputs
            .resolve_target(target, entered.as_ref())?;
        let released = self.state.outputs.retain_only(&chosen);
        debug!("Releasing {} unused outputs", released.len());
        self.state
            .release_outputs(released.into_iter().map(|(output, _)| output));

        let output = self
            .state
            .outputs
            .selected(&chosen)
            .ok_or_else(|| SetupError::OutputNotFound(target.to_owned()))?;
        let scale = match self.state.probe.fractional_scale {
            Some(fraction) => ScaleState::Fractional(fraction),
            None => ScaleState::Integer(output.scale),
        };
        info!(
            "Using output {:?} ({}x{}, scale {}/120)",
            output.name,
            output.width,
            output.height,
            scale.effective()
        );
        Ok(Probed { output, scale })
    }
}
