use ledscene_app::{
    scale,
    types::{unpack_rgb, Animation, AnimationKind, ColorSegment, Pattern, PatternId},
    PixelSurface, StripConfig,
};
use smart_leds::RGB8;

fn surface(pixel_count: u16) -> PixelSurface {
    let _ = env_logger::try_init();
    let mut surface = PixelSurface::new(&StripConfig::new(0, pixel_count, "S0"));
    surface.set_enabled(true);
    surface
}

fn rainbow(len: u16) -> Vec<ColorSegment> {
    (0..len)
        .map(|i| ColorSegment::flat(i, i, 0x01_0000 * u32::from(i) + 0x10))
        .collect()
}

#[test]
fn test_trail_full_period_is_identity() {
    let mut surface = surface(10);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_segment(ColorSegment::flat(0, 9, 0xFF_0000))
        .with_animation(Animation::trail(0, 9, 1));

    for _ in 0..10 {
        surface.render(&pattern, 1);
    }
    assert_eq!(surface.pixels(), surface.initial_pixels());
    assert!(surface
        .pixels()
        .iter()
        .all(|pixel| *pixel == RGB8::new(0xFF, 0, 0)));
}

#[test]
fn test_trail_gradient_full_period_is_identity() {
    let mut surface = surface(10);
    let mut pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_animation(Animation::trail(0, 9, 1));
    pattern.segments = rainbow(10);

    surface.render(&pattern, 1);
    assert_ne!(surface.pixels(), surface.initial_pixels());
    for _ in 1..10 {
        surface.render(&pattern, 1);
    }
    assert_eq!(surface.pixels(), surface.initial_pixels());
}

#[test]
fn test_trail_forward_shifts_towards_end() {
    let mut surface = surface(10);
    surface.apply_colors(&rainbow(10), 255);
    let before = surface.pixels().to_vec();

    surface.apply_trail(0, 9);
    let after = surface.pixels();
    for i in 0..9 {
        assert_eq!(after[i + 1], before[i]);
    }
    assert_eq!(after[0], before[9]);
}

#[test]
fn test_trail_reverse_shifts_towards_start() {
    let mut surface = surface(10);
    surface.apply_colors(&rainbow(10), 255);
    let before = surface.pixels().to_vec();

    surface.apply_trail(9, 0);
    let after = surface.pixels();
    for i in 0..9 {
        assert_eq!(after[i], before[i + 1]);
    }
    assert_eq!(after[9], before[0]);
}

#[test]
fn test_trail_keeps_pixels_outside_the_window() {
    let mut surface = surface(10);
    surface.apply_colors(&rainbow(10), 255);
    let before = surface.pixels().to_vec();

    surface.apply_trail(2, 5);
    let after = surface.pixels();
    assert_eq!(after[..2], before[..2]);
    assert_eq!(after[6..], before[6..]);

    let mut window = after[2..=5].to_vec();
    let mut expected = before[2..=5].to_vec();
    window.sort_by_key(|pixel| (pixel.r, pixel.g, pixel.b));
    expected.sort_by_key(|pixel| (pixel.r, pixel.g, pixel.b));
    assert_eq!(window, expected);
}

#[test]
fn test_trail_speed_throttles_steps() {
    let mut surface = surface(4);
    let mut pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_animation(Animation::trail(0, 3, 3));
    pattern.segments = rainbow(4);

    let mut changes = Vec::new();
    let mut last = None;
    for frame in 1..=9 {
        surface.render(&pattern, 1);
        let current = surface.pixels().to_vec();
        if last.as_ref().map_or(true, |last| *last != current) {
            changes.push(frame);
        }
        last = Some(current);
    }
    // The first render also paints the colors.
    assert_eq!(changes, [1, 3, 6, 9]);
}

#[test]
fn test_breath_is_triangle_wave() {
    let mut surface = surface(10);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(4)
        .with_segment(ColorSegment::flat(0, 9, 0xFF_FFFF))
        .with_animation(Animation::breath(0, 9, 1));

    let levels = (0..12)
        .map(|_| {
            surface.render(&pattern, 1);
            surface.brightness()
        })
        .collect::<Vec<_>>();
    assert_eq!(levels, [3, 2, 1, 0, 1, 2, 3, 4, 3, 2, 1, 0]);

    for window in levels.windows(2) {
        assert_eq!(window[0].abs_diff(window[1]), 1);
    }
}

#[test]
fn test_breath_recomputes_from_initial_pixels() {
    let mut surface = surface(4);
    surface.apply_colors(&[ColorSegment::flat(0, 1, 0xC8_6432)], 200);
    assert_eq!(surface.initial_pixels()[0], RGB8::new(200, 100, 50));
    assert_eq!(surface.pixels()[0], scale(RGB8::new(200, 100, 50), 200));

    surface.apply_breath(0, 1);
    assert_eq!(surface.brightness(), 199);
    assert_eq!(surface.pixels()[0], scale(RGB8::new(200, 100, 50), 199));
    assert_eq!(surface.pixels()[1], surface.pixels()[0]);
    // Pixels outside of the window are untouched.
    assert_eq!(surface.pixels()[2], RGB8::default());
}

#[test]
fn test_zero_brightness_breath_stays_dark() {
    let mut surface = surface(2);
    surface.apply_colors(&[ColorSegment::flat(0, 1, 0xFF_FFFF)], 0);
    for _ in 0..5 {
        surface.apply_breath(0, 1);
        assert_eq!(surface.brightness(), 0);
        assert_eq!(surface.pixels()[0], RGB8::default());
    }
}

#[test]
fn test_gradient_fill() {
    let mut surface = surface(6);
    surface.apply_colors(&[ColorSegment::gradient(0, 4, 0x00_0000, 0x00_00FF)], 255);

    let blue = surface.pixels().iter().map(|pixel| pixel.b).collect::<Vec<_>>();
    assert_eq!(blue, [0, 63, 127, 191, 255, 0]);
}

#[test]
fn test_reversed_gradient_fill() {
    let mut surface = surface(5);
    surface.apply_colors(&[ColorSegment::gradient(4, 0, 0xFF_0000, 0x00_0000)], 255);

    let red = surface.pixels().iter().map(|pixel| pixel.r).collect::<Vec<_>>();
    assert_eq!(red, [0, 64, 128, 192, 255]);
}

#[test]
fn test_colors_are_scaled_by_pattern_brightness() {
    let mut surface = surface(3);
    surface.apply_colors(&[ColorSegment::flat(0, 2, 0xFF_8000)], 25);

    assert_eq!(surface.pixels()[0], RGB8::new(25, 12, 0));
    assert_eq!(surface.initial_pixels()[0], unpack_rgb(0xFF_8000));
}

#[test]
fn test_out_of_range_indices_are_clamped() {
    let mut surface = surface(10);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_segment(ColorSegment::flat(5, 500, 0x00_FF00))
        .with_segment(ColorSegment::flat(300, 400, 0xFF_0000))
        .with_animation(Animation::trail(0, 119, 1))
        .with_animation(Animation::breath(100, 200, 1));

    surface.render(&pattern, 1);
    let green = surface
        .pixels()
        .iter()
        .filter(|pixel| **pixel == RGB8::new(0, 0xFF, 0))
        .count();
    assert_eq!(green, 5);
    assert_eq!(surface.pixels().len(), 10);
}

#[test]
fn test_disabled_surface_is_not_rendered() {
    let mut surface = surface(3);
    surface.set_enabled(false);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_segment(ColorSegment::flat(0, 2, 0xFF_FFFF));

    surface.render(&pattern, 1);
    assert_eq!(surface.frame(), 0);
    assert!(surface.pixels().iter().all(|pixel| *pixel == RGB8::default()));
}

#[test]
fn test_recolor_only_on_new_revision() {
    let mut surface = surface(3);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_segment(ColorSegment::flat(0, 2, 0xFF_FFFF));

    surface.render(&pattern, 1);
    assert!(!surface.needs_recolor(PatternId(0), 1));
    assert!(surface.needs_recolor(PatternId(0), 2));
    assert!(surface.needs_recolor(PatternId(1), 1));

    let dimmed = pattern.clone().with_brightness(0);
    // Same revision keeps the cached colors.
    surface.render(&dimmed, 1);
    assert_eq!(surface.pixels()[0], RGB8::new(255, 255, 255));
    surface.render(&dimmed, 2);
    assert_eq!(surface.pixels()[0], RGB8::default());

    surface.invalidate();
    assert!(surface.needs_recolor(PatternId(0), 2));
}

#[test]
fn test_unknown_animation_is_ignored() {
    let mut surface = surface(3);
    let pattern = Pattern::new(PatternId(0), "P0")
        .with_brightness(255)
        .with_segment(ColorSegment::gradient(0, 2, 0xFF_0000, 0x00_00FF))
        .with_animation(Animation {
            kind: AnimationKind::Unknown(7),
            start_index: 0,
            end_index: 2,
            speed: 1,
        });

    surface.render(&pattern, 1);
    assert_eq!(surface.pixels(), surface.initial_pixels());
}

#[test]
fn test_scale() {
    assert_eq!(scale(RGB8::new(255, 255, 255), 255), RGB8::new(255, 255, 255));
    assert_eq!(scale(RGB8::new(255, 100, 0), 25), RGB8::new(25, 9, 0));
    assert_eq!(scale(RGB8::new(255, 255, 255), 0), RGB8::default());
}
