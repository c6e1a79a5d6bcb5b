//! The selection weight function.
//!
//! Pure and deterministic: `(image, source, palette, now, config,
//! color context) -> non-negative scalar`. The weight is the product of
//! five factors (recency, source balance, favorite boost, new-image
//! boost, color closeness), each individually in `[0, ∞)`.

use varia_catalog::{ImageRecord, PaletteRecord, SourceRecord};

use crate::config::{ColorContext, DecayCurve, SelectionConfig};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Computes the selection weight of one candidate at time `now`.
pub fn weight(
    image: &ImageRecord,
    source: Option<&SourceRecord>,
    palette: Option<&PaletteRecord>,
    now: i64,
    config: &SelectionConfig,
    color: Option<&ColorContext>,
) -> f64 {
    let recency = cooldown_factor(
        image.last_shown_at,
        config.recency_cooldown_days,
        config.decay,
        now,
    );
    let source_balance = cooldown_factor(
        source.and_then(|s| s.last_shown_at),
        config.source_cooldown_days,
        config.decay,
        now,
    );
    let favorite = if image.is_favorite {
        config.favorite_boost.max(0.0)
    } else {
        1.0
    };
    let newness = if image.times_shown == 0 {
        config.new_image_boost.max(0.0)
    } else {
        1.0
    };

    recency * source_balance * favorite * newness * color_factor(palette, color)
}

/// Penalty that relaxes as the cooldown elapses.
///
/// Never-shown entities are neutral (1.0). `progress` is elapsed time
/// over the cooldown span; the curve maps it into `[0, 1]`.
fn cooldown_factor(last_shown_at: Option<i64>, cooldown_days: f64, decay: DecayCurve, now: i64) -> f64 {
    let Some(last_shown_at) = last_shown_at else {
        return 1.0;
    };

    let cooldown_secs = cooldown_days * SECONDS_PER_DAY;
    if cooldown_secs <= 0.0 {
        return 1.0;
    }

    let elapsed = now.saturating_sub(last_shown_at).max(0) as f64;
    let progress = elapsed / cooldown_secs;

    match decay {
        DecayCurve::Step => {
            if progress < 1.0 {
                0.0
            } else {
                1.0
            }
        }
        DecayCurve::Linear => progress.clamp(0.0, 1.0),
        DecayCurve::Exponential => 1.0 - (-progress).exp(),
    }
}

/// Closeness of a candidate's palette temperature to the requested one.
///
/// Neutral without a context or without a palette; otherwise a linear
/// falloff over the context tolerance, floored at zero.
fn color_factor(palette: Option<&PaletteRecord>, color: Option<&ColorContext>) -> f64 {
    let Some(context) = color else {
        return 1.0;
    };
    let Some(palette) = palette else {
        return 1.0;
    };

    let distance = (f64::from(palette.color_temperature) - context.target_temperature).abs();
    if context.tolerance <= 0.0 {
        return if distance == 0.0 { 1.0 } else { 0.0 };
    }

    (1.0 - distance / context.tolerance).max(0.0)
}
