//! Unit tests for geometry resolution

use super::*;

fn spec() -> GeometrySpec {
    GeometrySpec {
        width: Dimension::px(640),
        height: Dimension::px(480),
        margin: Edges::default(),
        padding: Edges::default(),
        exclusive_zone: ExclusiveZone::default(),
        anchor: Anchor::Center,
        use_scale: false,
    }
}

#[test]
fn test_half_size_centered_on_1080p() {
    let spec = GeometrySpec {
        width: Dimension::percent(50),
        height: Dimension::percent(50),
        anchor: Anchor::Center,
        use_scale: false,
        ..spec()
    };
    let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
    assert_eq!(resolved.width, 960);
    assert_eq!(resolved.height, 540);
}

#[test]
fn test_absolute_values_pass_through_at_scale_one() {
    let mut spec = spec();
    spec.margin = Edges {
        top: Dimension::px(10),
        right: Dimension::px(20),
        bottom: Dimension::px(30),
        left: Dimension::px(40),
    };
    spec.padding.left = Dimension::px(8);
    let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
    assert_eq!((resolved.width, resolved.height), (640, 480));
    assert_eq!(resolved.margin.top, 10);
    assert_eq!(resolved.margin.right, 20);
    assert_eq!(resolved.margin.bottom, 30);
    assert_eq!(resolved.margin.left, 40);
    assert_eq!(resolved.padding.left, 8);
}

#[test]
fn test_percent_margins_use_matching_axis() {
    let mut spec = spec();
    spec.margin = Edges {
        top: Dimension::percent(10),
        right: Dimension::percent(10),
        bottom: Dimension::percent(5),
        left: Dimension::percent(5),
    };
    let resolved = resolve(&spec, 2000, 1000, ScaleState::Integer(1));
    assert_eq!(resolved.margin.top, 100);
    assert_eq!(resolved.margin.right, 200);
    assert_eq!(resolved.margin.bottom, 50);
    assert_eq!(resolved.margin.left, 100);
}

#[test]
fn test_percentages_truncate() {
    assert_eq!(fixup_percentage(33, 1000, true), 330);
    assert_eq!(fixup_percentage(33, 999, true), 329);
    assert_eq!(fixup_percentage(33, 999, false), 33);
}

#[test]
fn test_percentages_over_full_saturate() {
    assert_eq!(fixup_percentage(150, u32::MAX, true), u32::MAX);
    assert_eq!(fixup_percentage(u32::MAX, 200, true), u32::MAX);
    assert_eq!(fixup_percentage(150, 1000, true), 1500);
}

#[test]
fn test_integer_scale_two_divides_device_sizes() {
    let spec = GeometrySpec {
        width: Dimension::percent(50),
        height: Dimension::px(400),
        use_scale: false,
        ..spec()
    };
    let resolved = resolve(&spec, 3840, 2160, ScaleState::Integer(2));
    // 50% of 3840 device px = 1920 device px = 960 logical.
    assert_eq!(resolved.width, 960);
    assert_eq!(resolved.height, 200);
}

#[test]
fn test_use_scale_keeps_absolute_size_logical() {
    let mut spec = GeometrySpec {
        width: Dimension::px(800),
        height: Dimension::percent(50),
        use_scale: true,
        ..spec()
    };
    spec.margin.top = Dimension::percent(10);
    spec.padding.left = Dimension::px(12);
    let resolved = resolve(&spec, 3840, 2160, ScaleState::Integer(2));
    assert_eq!(resolved.width, 800);
    assert_eq!(resolved.height, 540);
    // Margins are computed against the logical 1920x1080 basis.
    assert_eq!(resolved.margin.top, 108);
    assert_eq!(resolved.padding.left, 12);
}

#[test]
fn test_fractional_scale_supersedes_integer_basis() {
    let spec = GeometrySpec {
        width: Dimension::percent(100),
        height: Dimension::percent(100),
        use_scale: true,
        ..spec()
    };
    // 1.5x: 2880x1620 device pixels is 1920x1080 logical.
    let resolved = resolve(&spec, 2880, 1620, ScaleState::Fractional(180));
    assert_eq!((resolved.width, resolved.height), (1920, 1080));
}

#[test]
fn test_zero_size_survives_resolution() {
    let spec = GeometrySpec {
        width: Dimension::px(0),
        height: Dimension::percent(0),
        ..spec()
    };
    let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(2));
    assert_eq!((resolved.width, resolved.height), (0, 0));
}

#[test]
fn test_exclusive_zone_top_and_bottom_use_height() {
    for anchor in [Anchor::Top, Anchor::Bottom] {
        let spec = GeometrySpec {
            exclusive_zone: ExclusiveZone {
                value: 10,
                is_percent: true,
            },
            anchor,
            ..spec()
        };
        let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
        assert_eq!(resolved.exclusive_zone, 108, "{anchor:?}");
    }
}

#[test]
fn test_exclusive_zone_left_and_right_use_width() {
    for anchor in [Anchor::Left, Anchor::Right] {
        let spec = GeometrySpec {
            exclusive_zone: ExclusiveZone {
                value: 10,
                is_percent: true,
            },
            anchor,
            ..spec()
        };
        let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
        assert_eq!(resolved.exclusive_zone, 192, "{anchor:?}");
    }
}

#[test]
fn test_exclusive_zone_off_edge_is_clamped() {
    for anchor in [
        Anchor::Center,
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
    ] {
        let spec = GeometrySpec {
            exclusive_zone: ExclusiveZone {
                value: 40,
                is_percent: false,
            },
            anchor,
            ..spec()
        };
        let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
        assert_eq!(resolved.exclusive_zone, 0, "{anchor:?}");
    }
}

#[test]
fn test_negative_exclusive_zone_is_untouched() {
    let spec = GeometrySpec {
        exclusive_zone: ExclusiveZone {
            value: -1,
            is_percent: true,
        },
        anchor: Anchor::Top,
        ..spec()
    };
    let resolved = resolve(&spec, 1920, 1080, ScaleState::Integer(1));
    assert_eq!(resolved.exclusive_zone, -1);
}

#[test]
fn test_anchor_edges() {
    use zwlr_layer_surface_v1::Anchor as Edge;
    assert_eq!(Anchor::Center.edges(), Edge::empty());
    assert_eq!(Anchor::TopRight.edges(), Edge::Top | Edge::Right);
    assert_eq!(Anchor::Bottom.edges(), Edge::Bottom);
}
