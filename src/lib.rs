//! # Slate Launcher Library
//!
//! Presentation and input core of a keyboard-driven launcher that runs as a
//! wlr-layer-shell overlay on Wayland compositors.
//!
//! ## Architecture
//!
//! Slate is built on a modular architecture:
//! - `output`: Output registry and target selection
//! - `scale`: Integer and fractional scale bookkeeping
//! - `geometry`: Percentage and scale aware layout resolution
//! - `swapchain`: Double-buffered shared memory buffers
//! - `layer_surface`: Configure/ack lifecycle of the launcher surface
//! - `keyboard`: Keymap loading, key decoding and repeat scheduling
//! - `wayland`: Protocol event handlers
//! - `probe`: Output and scale discovery with a throwaway surface
//! - `session`: Connection setup and the main loop
//! - `config`: Configuration parsing and management
//! - `render`: Frame painting and the default input consumer
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slate::{AppConfig, PanelRenderer, QueryInput, Session, SessionOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let options = SessionOptions {
//!         output: config.output.name.clone(),
//!         geometry: config.geometry_spec()?,
//!     };
//!     let mut session = Session::connect(Box::new(QueryInput::new()))?;
//!     session.setup(&options)?;
//!     let mut renderer = PanelRenderer {
//!         background: slate::config::parse_color(&config.colors.background)?,
//!         panel: slate::config::parse_color(&config.colors.panel)?,
//!         use_scale: config.window.use_scale,
//!     };
//!     session.run(&mut renderer)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod keyboard;
pub mod layer_surface;
pub mod output;
pub mod probe;
pub mod render;
pub mod scale;
pub mod session;
pub mod swapchain;
pub mod wayland;

// Re-export main types for easy access
pub use config::AppConfig;
pub use error::{KeymapError, SetupError, SwapchainError};
pub use geometry::{GeometrySpec, ResolvedGeometry};
pub use keyboard::{Input, InputHandler, Keyboard};
pub use render::{PanelRenderer, QueryInput, Renderer};
pub use scale::ScaleState;
pub use session::{Session, SessionOptions};
