//! Pure color math: hex/RGB/HSL conversions, circular hue statistics,
//! warm/cool temperature, and the lightness/saturation shifts used by
//! template filters.
//!
//! Everything here is deterministic and free of I/O. Inputs are clamped
//! to valid ranges; no function panics or produces NaN.

use palette::{FromColor, Hsl, IntoColor, Srgb};

/// Parses a `#RRGGBB` (or `RRGGBB`) string into RGB channels.
///
/// Returns `None` for anything that is not exactly six hex digits.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Formats RGB channels as an uppercase `#RRGGBB` string.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Returns true for strings of the canonical `#RRGGBB` form.
pub fn is_valid_hex(hex: &str) -> bool {
    hex.starts_with('#') && hex_to_rgb(hex).is_some()
}

/// Converts RGB channels to HSL (hue in degrees `[0, 360)`, saturation and
/// lightness in `[0, 1]`).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let hsl = Hsl::from_color(rgb);
    (
        hsl.hue.into_positive_degrees(),
        hsl.saturation.clamp(0.0, 1.0),
        hsl.lightness.clamp(0.0, 1.0),
    )
}

/// Converts HSL components back to RGB channels.
///
/// Hue wraps modulo 360; saturation and lightness are clamped to `[0, 1]`.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let hsl = Hsl::new(
        hue.rem_euclid(360.0),
        saturation.clamp(0.0, 1.0),
        lightness.clamp(0.0, 1.0),
    );
    let rgb: Srgb<f32> = hsl.into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    (rgb.red, rgb.green, rgb.blue)
}

/// Parses a hex string straight to HSL components.
pub fn hex_to_hsl(hex: &str) -> Option<(f32, f32, f32)> {
    let (r, g, b) = hex_to_rgb(hex)?;
    Some(rgb_to_hsl(r, g, b))
}

/// Formats HSL components as an uppercase hex string.
///
/// Round-trip law: `hsl_to_hex(hex_to_hsl(c))` equals `c` modulo ±1 per
/// RGB channel.
pub fn hsl_to_hex(hue: f32, saturation: f32, lightness: f32) -> String {
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    rgb_to_hex(r, g, b)
}

/// Mean of hue angles on the unit circle, in degrees `[0, 360)`.
///
/// Handles the wrap: the mean of 359° and 1° is 0°, not 180°. An empty
/// slice, or hues whose vectors cancel exactly, yields 0.0.
pub fn circular_hue_mean(hues: &[f32]) -> f32 {
    if hues.is_empty() {
        return 0.0;
    }

    let (sin_sum, cos_sum) = hues.iter().fold((0.0_f32, 0.0_f32), |(s, c), hue| {
        let rad = hue.to_radians();
        (s + rad.sin(), c + rad.cos())
    });

    if sin_sum.abs() < f32::EPSILON && cos_sum.abs() < f32::EPSILON {
        return 0.0;
    }

    sin_sum.atan2(cos_sum).to_degrees().rem_euclid(360.0)
}

/// Warm/cool temperature of a set of colors, in `[-1, +1]`.
///
/// Hues in 0–60° and 300–360° count as warm, 180–240° as cool; each
/// color votes with its saturation so grey pixels stay neutral. The
/// result grows monotonically with warm-hue mass.
pub fn color_temperature<S: AsRef<str>>(colors: &[S]) -> f32 {
    let mut warm = 0.0_f32;
    let mut cool = 0.0_f32;

    for color in colors {
        let Some((hue, saturation, _)) = hex_to_hsl(color.as_ref()) else {
            continue;
        };

        if hue <= 60.0 || hue >= 300.0 {
            warm += saturation;
        } else if (180.0..=240.0).contains(&hue) {
            cool += saturation;
        }
    }

    let mass = warm + cool;
    if mass < f32::EPSILON {
        return 0.0;
    }

    ((warm - cool) / mass).clamp(-1.0, 1.0)
}

/// Distance between two HSL points with a wrap-aware hue component.
///
/// Used for preview ranking only; the scale is relative, not perceptually
/// uniform.
pub fn perceptual_distance(a: (f32, f32, f32), b: (f32, f32, f32)) -> f32 {
    let raw = (a.0 - b.0).abs().rem_euclid(360.0);
    let hue_delta = raw.min(360.0 - raw) / 180.0;
    let sat_delta = a.1 - b.1;
    let light_delta = a.2 - b.2;

    (hue_delta * hue_delta + sat_delta * sat_delta + light_delta * light_delta).sqrt()
}

/// Whether two hex colors are within `tolerance` of each other per RGB
/// channel (tolerance as a fraction of the channel range).
///
/// Unparseable inputs fall back to exact string comparison.
pub fn colors_equivalent(a: &str, b: &str, tolerance: f32) -> bool {
    match (hex_to_rgb(a), hex_to_rgb(b)) {
        (Some((ar, ag, ab)), Some((br, bg, bb))) => {
            let limit = (tolerance.clamp(0.0, 1.0) * 255.0).round() as i16;
            (i16::from(ar) - i16::from(br)).abs() <= limit
                && (i16::from(ag) - i16::from(bg)).abs() <= limit
                && (i16::from(ab) - i16::from(bb)).abs() <= limit
        }
        _ => a.eq_ignore_ascii_case(b),
    }
}

/// Shifts lightness down by an absolute amount in HSL space.
///
/// Unparseable input is returned unchanged.
pub fn darken(hex: &str, amount: f32) -> String {
    shift_lightness(hex, -amount)
}

/// Shifts lightness up by an absolute amount in HSL space.
///
/// Unparseable input is returned unchanged.
pub fn lighten(hex: &str, amount: f32) -> String {
    shift_lightness(hex, amount)
}

/// Shifts saturation up by an absolute amount in HSL space.
///
/// Unparseable input is returned unchanged.
pub fn saturate(hex: &str, amount: f32) -> String {
    shift_saturation(hex, amount)
}

/// Shifts saturation down by an absolute amount in HSL space.
///
/// Unparseable input is returned unchanged.
pub fn desaturate(hex: &str, amount: f32) -> String {
    shift_saturation(hex, -amount)
}

/// Mixes two colors in RGB space; `weight` is the share of `other`,
/// clamped to `[0, 1]`.
///
/// If either color fails to parse, `hex` is returned unchanged.
pub fn blend(hex: &str, other: &str, weight: f32) -> String {
    let (Some((ar, ag, ab)), Some((br, bg, bb))) = (hex_to_rgb(hex), hex_to_rgb(other)) else {
        return hex.to_string();
    };

    let w = weight.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| -> u8 {
        (f32::from(a) * (1.0 - w) + f32::from(b) * w).round() as u8
    };

    rgb_to_hex(mix(ar, br), mix(ag, bg), mix(ab, bb))
}

fn shift_lightness(hex: &str, amount: f32) -> String {
    let Some((hue, saturation, lightness)) = hex_to_hsl(hex) else {
        return hex.to_string();
    };
    hsl_to_hex(hue, saturation, (lightness + amount).clamp(0.0, 1.0))
}

fn shift_saturation(hex: &str, amount: f32) -> String {
    let Some((hue, saturation, lightness)) = hex_to_hsl(hex) else {
        return hex.to_string();
    };
    hsl_to_hex(hue, (saturation + amount).clamp(0.0, 1.0), lightness)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_close(a: &str, b: &str) -> bool {
        let (ar, ag, ab) = hex_to_rgb(a).unwrap();
        let (br, bg, bb) = hex_to_rgb(b).unwrap();
        (i16::from(ar) - i16::from(br)).abs() <= 1
            && (i16::from(ag) - i16::from(bg)).abs() <= 1
            && (i16::from(ab) - i16::from(bb)).abs() <= 1
    }

    #[test]
    fn hex_parses_with_and_without_hash() {
        assert_eq!(hex_to_rgb("#80C0FF"), Some((0x80, 0xC0, 0xFF)));
        assert_eq!(hex_to_rgb("80c0ff"), Some((0x80, 0xC0, 0xFF)));
    }

    #[test]
    fn hex_rejects_garbage() {
        assert_eq!(hex_to_rgb("#80C0F"), None);
        assert_eq!(hex_to_rgb("#80C0FG"), None);
        assert_eq!(hex_to_rgb(""), None);
        assert_eq!(hex_to_rgb("#80C0FF00"), None);
    }

    #[test]
    fn rgb_hex_round_trip_is_exact() {
        assert_eq!(rgb_to_hex(0x80, 0xC0, 0xFF), "#80C0FF");
        let (r, g, b) = hex_to_rgb("#1A2B3C").unwrap();
        assert_eq!(rgb_to_hex(r, g, b), "#1A2B3C");
    }

    #[test]
    fn hsl_round_trip_within_one_lsb() {
        for hex in ["#80C0FF", "#000000", "#FFFFFF", "#B4BEFE", "#123456"] {
            let (h, s, l) = hex_to_hsl(hex).unwrap();
            let back = hsl_to_hex(h, s, l);
            assert!(channel_close(hex, &back), "{hex} -> {back}");
        }
    }

    #[test]
    fn hsl_inputs_are_clamped() {
        let hex = hsl_to_hex(400.0, 2.0, -0.5);
        assert!(is_valid_hex(&hex));
    }

    #[test]
    fn hue_mean_handles_wrap() {
        let mean = circular_hue_mean(&[359.0, 1.0]);
        assert!(mean < 1.0 || mean > 359.0, "mean was {mean}");
    }

    #[test]
    fn hue_mean_of_empty_is_zero() {
        assert_eq!(circular_hue_mean(&[]), 0.0);
    }

    #[test]
    fn hue_mean_of_identical_hues() {
        let mean = circular_hue_mean(&[120.0, 120.0, 120.0]);
        assert!((mean - 120.0).abs() < 0.01);
    }

    #[test]
    fn opposite_hues_stay_in_range() {
        let mean = circular_hue_mean(&[0.0, 180.0]);
        assert!(mean.is_finite());
        assert!((0.0..360.0).contains(&mean));
    }

    #[test]
    fn temperature_of_reds_is_warm() {
        let temp = color_temperature(&["#FF0000", "#FF8000"]);
        assert!(temp > 0.9);
    }

    #[test]
    fn temperature_of_blues_is_cool() {
        let temp = color_temperature(&["#0000FF", "#0080FF"]);
        assert!(temp < -0.9);
    }

    #[test]
    fn temperature_of_greys_is_neutral() {
        let temp = color_temperature(&["#808080", "#C0C0C0"]);
        assert_eq!(temp, 0.0);
    }

    #[test]
    fn temperature_grows_with_warm_mass() {
        let cooler = color_temperature(&["#FF0000", "#0000FF", "#0000FF"]);
        let warmer = color_temperature(&["#FF0000", "#FF0000", "#0000FF"]);
        assert!(warmer > cooler);
    }

    #[test]
    fn distance_is_wrap_aware() {
        let near = perceptual_distance((359.0, 0.5, 0.5), (1.0, 0.5, 0.5));
        let far = perceptual_distance((0.0, 0.5, 0.5), (180.0, 0.5, 0.5));
        assert!(near < far);
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(perceptual_distance((200.0, 0.3, 0.7), (200.0, 0.3, 0.7)), 0.0);
    }

    #[test]
    fn equivalence_respects_tolerance() {
        assert!(colors_equivalent("#808080", "#818181", 0.01));
        assert!(!colors_equivalent("#808080", "#909090", 0.01));
        assert!(colors_equivalent("#808080", "#909090", 0.1));
    }

    #[test]
    fn equivalence_falls_back_to_string_compare() {
        assert!(colors_equivalent("nonsense", "NONSENSE", 0.5));
        assert!(!colors_equivalent("nonsense", "other", 0.5));
    }

    #[test]
    fn lighten_clamps_to_white() {
        assert_eq!(lighten("#FFFFFF", 0.5), "#FFFFFF");
    }

    #[test]
    fn darken_clamps_to_black() {
        assert_eq!(darken("#000000", 0.5), "#000000");
    }

    #[test]
    fn lighten_raises_lightness() {
        let (_, _, before) = hex_to_hsl("#336699").unwrap();
        let (_, _, after) = hex_to_hsl(&lighten("#336699", 0.2)).unwrap();
        assert!(after > before);
    }

    #[test]
    fn desaturate_lowers_saturation() {
        let (_, before, _) = hex_to_hsl("#FF0000").unwrap();
        let (_, after, _) = hex_to_hsl(&desaturate("#FF0000", 0.4)).unwrap();
        assert!(after < before);
    }

    #[test]
    fn blend_midpoint() {
        assert_eq!(blend("#000000", "#FFFFFF", 0.5), "#808080");
    }

    #[test]
    fn blend_weight_clamped() {
        assert_eq!(blend("#000000", "#FFFFFF", 2.0), "#FFFFFF");
        assert_eq!(blend("#000000", "#FFFFFF", -1.0), "#000000");
    }

    #[test]
    fn filters_pass_through_bad_input() {
        assert_eq!(darken("not-a-color", 0.1), "not-a-color");
        assert_eq!(blend("not-a-color", "#FFFFFF", 0.5), "not-a-color");
    }
}
