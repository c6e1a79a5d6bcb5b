//! Palette cache file parsing.
//!
//! Wallust cache files come in two shapes depending on version and
//! backend: a flat object mapping `color0..color15` to hex strings, or
//! a list (sometimes a position-keyed object) of RGB triples. Both are
//! normalized to an ordered list of uppercase hex colors.

use serde_json::Value;

use crate::error::Error;

/// The two cache file shapes.
#[derive(Debug)]
enum RawPalette {
    /// `(slot, hex)` pairs from a flat `color0..color15` object.
    Flat(Vec<(usize, String)>),
    /// RGB triples in palette order.
    Indexed(Vec<[u8; 3]>),
}

/// Parses cache file contents into ordered uppercase hex colors.
///
/// Unknown keys and unparseable slots are ignored; a palette without
/// `color0` is a hard failure.
pub(crate) fn parse_palette(content: &str) -> Result<Vec<String>, Error> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| Error::Malformed(e.to_string()))?;

    let colors = match classify(value)? {
        RawPalette::Flat(mut slots) => {
            if !slots.iter().any(|(slot, _)| *slot == 0) {
                return Err(Error::Malformed(String::from("color0 missing")));
            }
            slots.sort_by_key(|(slot, _)| *slot);
            slots.into_iter().map(|(_, hex)| hex).collect()
        }
        RawPalette::Indexed(triples) => triples
            .into_iter()
            .map(|[r, g, b]| varia_color::rgb_to_hex(r, g, b))
            .collect::<Vec<_>>(),
    };

    if colors.is_empty() {
        return Err(Error::InsufficientColors);
    }

    Ok(colors)
}

fn classify(value: Value) -> Result<RawPalette, Error> {
    match value {
        Value::Array(items) => Ok(RawPalette::Indexed(parse_triples(items.into_iter())?)),
        Value::Object(map) => {
            if map.keys().any(|key| key.starts_with("color")) {
                let slots = map
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let slot: usize = key.strip_prefix("color")?.parse().ok()?;
                        let hex = normalize_hex(value.as_str()?)?;
                        Some((slot, hex))
                    })
                    .collect();
                Ok(RawPalette::Flat(slots))
            } else if map.keys().all(|key| key.parse::<usize>().is_ok()) && !map.is_empty() {
                let mut entries: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(key, value)| Some((key.parse().ok()?, value)))
                    .collect();
                entries.sort_by_key(|(index, _)| *index);
                Ok(RawPalette::Indexed(parse_triples(
                    entries.into_iter().map(|(_, value)| value),
                )?))
            } else {
                Err(Error::Malformed(String::from(
                    "object has neither color slots nor positional keys",
                )))
            }
        }
        other => Err(Error::Malformed(format!(
            "expected object or array, got {other}"
        ))),
    }
}

fn parse_triples(values: impl Iterator<Item = Value>) -> Result<Vec<[u8; 3]>, Error> {
    values
        .map(|value| {
            let channels = value
                .as_array()
                .ok_or_else(|| Error::Malformed(String::from("palette entry is not a triple")))?;
            if channels.len() != 3 {
                return Err(Error::Malformed(format!(
                    "expected 3 channels, got {}",
                    channels.len()
                )));
            }
            let mut triple = [0_u8; 3];
            for (i, channel) in channels.iter().enumerate() {
                let n = channel
                    .as_u64()
                    .ok_or_else(|| Error::Malformed(String::from("non-integer channel")))?;
                triple[i] = u8::try_from(n)
                    .map_err(|_| Error::Malformed(format!("channel {n} out of range")))?;
            }
            Ok(triple)
        })
        .collect()
}

fn normalize_hex(raw: &str) -> Option<String> {
    let (r, g, b) = varia_color::hex_to_rgb(raw)?;
    Some(varia_color::rgb_to_hex(r, g, b))
}
