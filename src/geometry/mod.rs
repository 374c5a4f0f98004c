//! Geometry resolution
//!
//! Turns the user's symbolic window configuration (absolute pixels or
//! percentages of the output) into concrete pixel values for the layer
//! surface. Resolution is a pure function of the spec, the selected output
//! size and the authoritative scale.

use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1;

use crate::scale::{self, ScaleState};

/// A configured length, either in pixels or as a percentage of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub value: u32,
    pub is_percent: bool,
}

impl Dimension {
    pub const fn px(value: u32) -> Self {
        Self {
            value,
            is_percent: false,
        }
    }

    pub const fn percent(value: u32) -> Self {
        Self {
            value,
            is_percent: true,
        }
    }

    fn resolve(&self, basis: u32) -> u32 {
        fixup_percentage(self.value, basis, self.is_percent)
    }
}

/// The exclusive zone, which may be negative to opt out entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveZone {
    pub value: i32,
    pub is_percent: bool,
}

impl Default for ExclusiveZone {
    fn default() -> Self {
        Self {
            value: -1,
            is_percent: false,
        }
    }
}

/// Where the surface is pinned on the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    /// Layer-shell edge flags for this anchor.
    pub fn edges(&self) -> zwlr_layer_surface_v1::Anchor {
        use zwlr_layer_surface_v1::Anchor as Edge;
        match self {
            Anchor::TopLeft => Edge::Top | Edge::Left,
            Anchor::Top => Edge::Top,
            Anchor::TopRight => Edge::Top | Edge::Right,
            Anchor::Left => Edge::Left,
            Anchor::Center => Edge::empty(),
            Anchor::Right => Edge::Right,
            Anchor::BottomLeft => Edge::Bottom | Edge::Left,
            Anchor::Bottom => Edge::Bottom,
            Anchor::BottomRight => Edge::Bottom | Edge::Right,
        }
    }
}

/// Per-edge lengths (margins or paddings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

/// The user's requested layout, before any output is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySpec {
    pub width: Dimension,
    pub height: Dimension,
    pub margin: Edges<Dimension>,
    pub padding: Edges<Dimension>,
    pub exclusive_zone: ExclusiveZone,
    pub anchor: Anchor,
    /// The renderer applies the output scale itself.
    pub use_scale: bool,
}

impl Default for GeometrySpec {
    fn default() -> Self {
        Self {
            width: Dimension::percent(50),
            height: Dimension::percent(50),
            margin: Edges::default(),
            padding: Edges::default(),
            exclusive_zone: ExclusiveZone::default(),
            anchor: Anchor::Center,
            use_scale: true,
        }
    }
}

/// Fully numeric layout. Width and height are in surface-local units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGeometry {
    pub width: u32,
    pub height: u32,
    pub margin: Edges<u32>,
    pub padding: Edges<u32>,
    pub exclusive_zone: i32,
    pub anchor: Anchor,
}

/// `value * basis / 100` for percentages, `value` otherwise.
pub fn fixup_percentage(value: u32, basis: u32, is_percent: bool) -> u32 {
    if is_percent {
        u32::try_from(value as u64 * basis as u64 / 100).unwrap_or(u32::MAX)
    } else {
        value
    }
}

/// Resolve `spec` against an output of `output_width` x `output_height`
/// device pixels (already rotation-normalized).
pub fn resolve(
    spec: &GeometrySpec,
    output_width: u32,
    output_height: u32,
    scale: ScaleState,
) -> ResolvedGeometry {
    let effective = scale.effective();

    // A renderer that scales on its own expects logical values.
    let (base_width, base_height) = if spec.use_scale {
        (
            scale::apply_inverse(output_width, effective),
            scale::apply_inverse(output_height, effective),
        )
    } else {
        (output_width, output_height)
    };

    let margin = Edges {
        top: spec.margin.top.resolve(base_height),
        right: spec.margin.right.resolve(base_width),
        bottom: spec.margin.bottom.resolve(base_height),
        left: spec.margin.left.resolve(base_width),
    };
    let padding = Edges {
        top: spec.padding.top.resolve(base_height),
        right: spec.padding.right.resolve(base_width),
        bottom: spec.padding.bottom.resolve(base_height),
        left: spec.padding.left.resolve(base_width),
    };

    // The layer surface size is always surface-local, so device pixels get
    // scaled down. An absolute size under `use_scale` is already logical.
    let mut width = spec.width.resolve(output_width);
    let mut height = spec.height.resolve(output_height);
    if spec.width.is_percent || !spec.use_scale {
        width = scale::apply_inverse(width, effective);
    }
    if spec.height.is_percent || !spec.use_scale {
        height = scale::apply_inverse(height, effective);
    }

    let exclusive_zone = resolve_exclusive_zone(
        spec.exclusive_zone,
        spec.anchor,
        base_width,
        base_height,
    );

    ResolvedGeometry {
        width,
        height,
        margin,
        padding,
        exclusive_zone,
        anchor: spec.anchor,
    }
}

fn resolve_exclusive_zone(
    zone: ExclusiveZone,
    anchor: Anchor,
    base_width: u32,
    base_height: u32,
) -> i32 {
    if zone.value <= 0 {
        return zone.value;
    }
    let value = zone.value as u32;
    let resolved = match anchor {
        Anchor::Top | Anchor::Bottom => fixup_percentage(value, base_height, zone.is_percent),
        Anchor::Left | Anchor::Right => fixup_percentage(value, base_width, zone.is_percent),
        // Off-edge surfaces can't reserve space.
        _ => return zone.value.min(0),
    };
    i32::try_from(resolved).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests;
