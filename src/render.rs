//! Frame painting and the default input consumer
//!
//! The presentation core only hands out ARGB8888 frames; what ends up in
//! them is decided here.

use log::{debug, info, warn};
use tiny_skia::{Color, PixmapMut, Rect, Transform};
use xkbcommon::xkb::keysyms;

use crate::geometry::{Edges, ResolvedGeometry};
use crate::keyboard::{Input, InputHandler};
use crate::scale::ScaleState;
use crate::swapchain::Frame;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// tiny-skia writes RGBA bytes; ARGB8888 is BGRA in memory on
    /// little-endian machines, so red and blue trade places.
    fn to_argb8888(self) -> Color {
        Color::from_rgba8(self.b, self.g, self.r, self.a)
    }
}

/// Paints one frame into the back buffer.
pub trait Renderer {
    fn render(&mut self, frame: &mut Frame<'_>, geometry: &ResolvedGeometry, scale: ScaleState);
}

/// Flat background with an inset panel bounded by the padding.
pub struct PanelRenderer {
    pub background: Rgba,
    pub panel: Rgba,
    /// Padding is in logical units and must be scaled to device pixels.
    pub use_scale: bool,
}

impl PanelRenderer {
    fn padding_px(&self, padding: &Edges<u32>, scale: ScaleState) -> Edges<u32> {
        if !self.use_scale {
            return *padding;
        }
        Edges {
            top: scale.apply(padding.top),
            right: scale.apply(padding.right),
            bottom: scale.apply(padding.bottom),
            left: scale.apply(padding.left),
        }
    }
}

impl Renderer for PanelRenderer {
    fn render(&mut self, frame: &mut Frame<'_>, geometry: &ResolvedGeometry, scale: ScaleState) {
        let Some(mut pixmap) = PixmapMut::from_bytes(frame.data, frame.width, frame.height) else {
            warn!("Frame {}x{} cannot be painted", frame.width, frame.height);
            return;
        };
        pixmap.fill(self.background.to_argb8888());

        let padding = self.padding_px(&geometry.padding, scale);
        let inner_width = frame
            .width
            .saturating_sub(padding.left.saturating_add(padding.right));
        let inner_height = frame
            .height
            .saturating_sub(padding.top.saturating_add(padding.bottom));
        let Some(rect) = Rect::from_xywh(
            padding.left as f32,
            padding.top as f32,
            inner_width as f32,
            inner_height as f32,
        ) else {
            debug!("Padding leaves no room for the panel");
            return;
        };

        let mut paint = tiny_skia::Paint::default();
        paint.set_color(self.panel.to_argb8888());
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

/// Collects typed text until Escape or Return.
#[derive(Debug, Default)]
pub struct QueryInput {
    query: String,
    quit: bool,
}

impl QueryInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl InputHandler for QueryInput {
    fn on_key_press(&mut self, input: &Input) {
        let keysym = input.symbol.keysym.raw();
        match keysym {
            keysyms::KEY_Escape => self.quit = true,
            keysyms::KEY_c if input.mod_ctrl => self.quit = true,
            keysyms::KEY_Return | keysyms::KEY_KP_Enter => {
                info!("Selected {:?}", self.query);
                self.quit = true;
            }
            keysyms::KEY_BackSpace => {
                self.query.pop();
            }
            keysyms::KEY_u if input.mod_ctrl => self.query.clear(),
            keysyms::KEY_w if input.mod_ctrl => {
                let trimmed = self.query.trim_end().len();
                self.query.truncate(trimmed);
                let word_start = self.query.rfind(' ').map_or(0, |i| i + 1);
                self.query.truncate(word_start);
            }
            _ => {
                if input.mod_ctrl || input.mod_alt || input.mod_super {
                    return;
                }
                if let Some(c) = input.symbol.as_char().filter(|c| !c.is_control()) {
                    self.query.push(c);
                }
            }
        }
        debug!("Query is now {:?}", self.query);
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}
