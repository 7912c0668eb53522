use ratatui::style::Color;

/// HSL to RGB. `hue` in degrees (any value, wrapped), `saturation` and
/// `lightness` in [0, 1].
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - chroma / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

/// Particle dot colour for a hue tag
pub fn particle_color(hue: f32) -> Color {
    let (r, g, b) = hsl_to_rgb(hue, 0.8, 0.65);
    Color::Rgb(r, g, b)
}

/// Link colour: dim blue, brighter for closer pairs
pub fn link_color(strength: f32) -> Color {
    let t = 0.25 + 0.75 * strength.clamp(0.0, 1.0);
    Color::Rgb((90.0 * t) as u8, (140.0 * t) as u8, (255.0 * t) as u8)
}

/// Fading trail colour for a hue tag at `intensity` in [0, 1]
pub fn trail_color(hue: f32, intensity: f32) -> Color {
    let (r, g, b) = hsl_to_rgb(hue, 0.6, 0.15 + 0.35 * intensity.clamp(0.0, 1.0));
    Color::Rgb(r, g, b)
}
