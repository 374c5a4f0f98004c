//! Surface scale bookkeeping
//!
//! Scales are kept in the fixed-point unit of the fractional scale protocol,
//! where 120 means 1.0. An integer scale `n` is therefore `n * 120`.

/// Denominator of the fractional scale protocol.
pub const SCALE_DENOMINATOR: u32 = 120;

/// The one authoritative scale of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleState {
    /// Classic `wl_output.scale` factor.
    Integer(u32),
    /// Preferred scale from `wp_fractional_scale_v1`, in 1/120 units.
    Fractional(u32),
}

impl Default for ScaleState {
    fn default() -> Self {
        ScaleState::Integer(1)
    }
}

impl ScaleState {
    /// Scale in 1/120 units, whichever kind is authoritative.
    pub fn effective(&self) -> u32 {
        match *self {
            ScaleState::Integer(n) => n.max(1) * SCALE_DENOMINATOR,
            ScaleState::Fractional(f) => f.max(1),
        }
    }

    pub fn is_fractional(&self) -> bool {
        matches!(self, ScaleState::Fractional(_))
    }

    /// Logical size to device pixels.
    pub fn apply(&self, logical: u32) -> u32 {
        match *self {
            ScaleState::Integer(n) => logical.saturating_mul(n.max(1)),
            ScaleState::Fractional(f) => apply(logical, f),
        }
    }
}

/// `base * scale / 120`, rounded to the nearest pixel.
pub fn apply(base: u32, scale: u32) -> u32 {
    (base as f64 * scale as f64 / SCALE_DENOMINATOR as f64).round() as u32
}

/// `base * 120 / scale`, rounded to the nearest pixel.
pub fn apply_inverse(base: u32, scale: u32) -> u32 {
    if scale == 0 {
        return base;
    }
    (base as f64 * SCALE_DENOMINATOR as f64 / scale as f64).round() as u32
}
