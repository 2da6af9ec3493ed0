//! Color palette and default depths
//!
//! A drawing's palette is the sorted set of lowercase colors its fills and
//! strokes use. Colors without a configured depth can be given one from their
//! brightness: darker colors stand taller.

use crate::config::BASE_KEY;
use crate::discretize::VectorPath;
use crate::geometry::truncate;
use std::collections::{BTreeMap, BTreeSet};

/// Depth given to pure black
pub const DEFAULT_MAX_DEPTH: f64 = 3.0;

/// Floor thickness used by [`default_type_depths`]
pub const DEFAULT_BASE_DEPTH: f64 = 1.0;

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` color; alpha is ignored
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }

    match hex.len() {
        3 => {
            // #RGB expands each digit
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        6 | 8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Brightness-based depth for a hex color, rounded to 2 decimals
///
/// Black maps to [`DEFAULT_MAX_DEPTH`], white to nearly zero.
pub fn default_depth(color: &str) -> Option<f64> {
    let (r, g, b) = parse_hex_color(color)?;
    let brightness = (r as f64 + g as f64 + b as f64) / 256.0 / 3.0;
    Some(truncate(DEFAULT_MAX_DEPTH - brightness * DEFAULT_MAX_DEPTH, 2))
}

/// Sorted distinct lowercase colors used by fills and strokes
pub fn collect_palette(paths: &[VectorPath]) -> Vec<String> {
    let colors: BTreeSet<String> = paths
        .iter()
        .flat_map(|p| {
            p.fill
                .iter()
                .map(String::as_str)
                .chain(p.stroke.iter().map(|s| s.color.as_str()))
        })
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();
    colors.into_iter().collect()
}

/// A depth table covering every palette color, plus the floor
///
/// Colors that are not hex colors are left out.
pub fn default_type_depths(paths: &[VectorPath]) -> BTreeMap<String, f64> {
    let mut depths = BTreeMap::new();
    depths.insert(BASE_KEY.to_string(), DEFAULT_BASE_DEPTH);
    for color in collect_palette(paths) {
        match default_depth(&color) {
            Some(depth) => {
                depths.insert(color, depth);
            }
            None => log::warn!("No default depth for color {}", color),
        }
    }
    depths
}
