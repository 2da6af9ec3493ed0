//! SVG document intake
//!
//! Pulls `<path>` elements and their paint out of an SVG document with
//! quick-xml. Paint comes from presentation attributes or the `style`
//! declaration list, which wins when both are given, and is inherited from
//! enclosing elements such as `<g>`. Transforms, `<use>` and basic shapes
//! other than `<path>` are not interpreted.

use crate::discretize::{LineCap, LineJoin, StrokeStyle, VectorPath};
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::BufRead;

/// Fill used when a path names none
pub const DEFAULT_FILL: &str = "#000000";

/// Stroke width used when a stroked path names none
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Paths and canvas of an SVG document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SvgDocument {
    /// Painted paths, bottom-first
    pub paths: Vec<VectorPath>,
    /// Declared canvas box (`viewBox`, else `width`/`height`)
    pub canvas: Option<BoundingBox>,
}

/// Paint properties that inherit down the element tree
const INHERITED: [&str; 6] = [
    "fill",
    "stroke",
    "stroke-width",
    "stroke-linejoin",
    "stroke-linecap",
    "stroke-miterlimit",
];

type Properties = HashMap<String, String>;

fn parse_attributes(e: &BytesStart) -> Result<Properties> {
    let mut attrs = HashMap::with_capacity(8);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Svg(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Split a `style` attribute into declarations
fn parse_style(style: &str) -> impl Iterator<Item = (String, String)> + '_ {
    style.split(';').filter_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        (!name.is_empty() && !value.is_empty()).then(|| (name, value.to_string()))
    })
}

/// Inherited paint overridden by an element's attributes, then its style
fn effective_properties(parent: &Properties, attrs: &Properties) -> Properties {
    let mut props = parent.clone();
    for key in INHERITED {
        if let Some(value) = attrs.get(key) {
            props.insert(key.to_string(), value.trim().to_string());
        }
    }
    if let Some(style) = attrs.get("style") {
        for (name, value) in parse_style(style) {
            if INHERITED.contains(&name.as_str()) {
                props.insert(name, value);
            }
        }
    }
    props
}

/// `none` and `transparent` mean no paint
fn paint(value: Option<&String>) -> Option<String> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "none" || v == "transparent" || v.is_empty() => None,
        other => other,
    }
}

/// Leading number of a length such as `12.5px`
fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

fn parse_canvas(attrs: &Properties) -> Option<BoundingBox> {
    if let Some(view_box) = attrs.get("viewBox") {
        let numbers: Vec<f64> = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        if let [x, y, w, h] = numbers[..] {
            return Some(BoundingBox::new(x, y, x + w, y + h));
        }
        log::warn!("Ignoring malformed viewBox {:?}", view_box);
    }
    let width = attrs.get("width").and_then(|w| parse_length(w))?;
    let height = attrs.get("height").and_then(|h| parse_length(h))?;
    Some(BoundingBox::new(0.0, 0.0, width, height))
}

fn stroke_style(color: String, props: &Properties) -> StrokeStyle {
    // An unreadable width is kept as NaN so validation reports the path
    let width = props
        .get("stroke-width")
        .map(|w| parse_length(w).unwrap_or(f64::NAN))
        .unwrap_or(DEFAULT_STROKE_WIDTH);
    let mut style = StrokeStyle::new(color, width);

    if let Some(join) = props.get("stroke-linejoin") {
        match join.parse::<LineJoin>() {
            Ok(join) => style = style.with_join(join),
            Err(e) => log::warn!("{}; using miter", e),
        }
    }
    if let Some(cap) = props.get("stroke-linecap") {
        match cap.parse::<LineCap>() {
            Ok(cap) => style = style.with_cap(cap),
            Err(e) => log::warn!("{}; using butt", e),
        }
    }
    if let Some(limit) = props.get("stroke-miterlimit").and_then(|l| parse_length(l)) {
        style = style.with_miter_limit(limit);
    }
    style
}

fn path_from_element(attrs: &Properties, props: &Properties) -> Option<VectorPath> {
    let Some(d) = attrs.get("d").filter(|d| !d.trim().is_empty()) else {
        log::debug!("Skipping <path> without path data");
        return None;
    };

    let fill = match props.get("fill") {
        Some(value) => paint(Some(value)),
        None => Some(DEFAULT_FILL.to_string()),
    };
    let stroke = paint(props.get("stroke")).map(|color| stroke_style(color, props));
    if fill.is_none() && stroke.is_none() {
        log::debug!("Skipping unpainted <path>");
        return None;
    }

    let mut path = VectorPath::from_path_data(d.clone());
    path.fill = fill;
    path.stroke = stroke;
    Some(path)
}

/// Parse an SVG document from a buffered reader
pub fn parse_svg<R: BufRead>(input: R) -> Result<SvgDocument> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut document = SvgDocument::default();
    let mut inherited: Vec<Properties> = vec![Properties::new()];
    let mut seen_root = false;

    loop {
        let event_result = reader.read_event_into(&mut buf);
        let is_empty_element = matches!(&event_result, Ok(Event::Empty(_)));

        match event_result {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let attrs = parse_attributes(e)?;
                let parent = inherited.last().cloned().unwrap_or_default();
                let props = effective_properties(&parent, &attrs);

                match e.local_name().as_ref() {
                    b"svg" if !seen_root => {
                        seen_root = true;
                        document.canvas = parse_canvas(&attrs);
                    }
                    b"path" => {
                        if let Some(path) = path_from_element(&attrs, &props) {
                            document.paths.push(path);
                        }
                    }
                    _ => {}
                }

                if !is_empty_element {
                    inherited.push(props);
                }
            }
            Ok(Event::End(_)) => {
                if inherited.len() > 1 {
                    inherited.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Svg(e)),
            _ => {}
        }
        buf.clear();
    }

    log::debug!(
        "Parsed SVG: {} paths, canvas {:?}",
        document.paths.len(),
        document.canvas
    );
    Ok(document)
}

/// Parse an SVG document held in memory
pub fn parse_svg_str(text: &str) -> Result<SvgDocument> {
    parse_svg(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_view_box() {
        let doc = parse_svg_str(
            r##"<?xml version="1.0"?>
            <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100" width="20cm">
              <path d="M0 0 L10 0 L10 10 Z" fill="#FF0000"/>
              <path d="M0 0 L10 0" fill="none" stroke="#00FF00" stroke-width="2"
                    stroke-linecap="round"/>
              <path d="M5 5 L6 5 L6 6 Z"/>
            </svg>"##,
        )
        .expect("Failed to parse SVG");

        assert_eq!(doc.canvas, Some(BoundingBox::new(0.0, 0.0, 200.0, 100.0)));
        assert_eq!(doc.paths.len(), 3);
        assert_eq!(doc.paths[0].fill.as_deref(), Some("#ff0000"));
        assert!(doc.paths[0].stroke.is_none());

        assert_eq!(doc.paths[1].fill, None);
        let stroke = doc.paths[1].stroke.as_ref().expect("Stroke expected");
        assert_eq!(stroke.color, "#00ff00");
        assert_eq!(stroke.width, 2.0);
        assert_eq!(stroke.cap, LineCap::Round);

        assert_eq!(doc.paths[2].fill.as_deref(), Some(DEFAULT_FILL));
    }

    #[test]
    fn test_style_overrides_attributes_and_groups_inherit() {
        let doc = parse_svg_str(
            r##"<svg width="50px" height="40">
              <g fill="#123456" stroke="#000000">
                <path d="M0 0 L1 0 L1 1 Z" style="stroke: none; fill:#ABCDEF"/>
                <path d="M0 0 L1 0 L1 1 Z" stroke-linejoin="bevel"/>
              </g>
              <path d="M0 0 L1 0 L1 1 Z"/>
            </svg>"##,
        )
        .expect("Failed to parse SVG");

        assert_eq!(doc.canvas, Some(BoundingBox::new(0.0, 0.0, 50.0, 40.0)));
        assert_eq!(doc.paths[0].fill.as_deref(), Some("#abcdef"));
        assert!(doc.paths[0].stroke.is_none());

        assert_eq!(doc.paths[1].fill.as_deref(), Some("#123456"));
        let stroke = doc.paths[1].stroke.as_ref().expect("Stroke expected");
        assert_eq!(stroke.width, DEFAULT_STROKE_WIDTH);
        assert_eq!(stroke.join, LineJoin::Bevel);

        // Outside the group nothing is inherited
        assert_eq!(doc.paths[2].fill.as_deref(), Some(DEFAULT_FILL));
        assert!(doc.paths[2].stroke.is_none());
    }

    #[test]
    fn test_unpainted_and_empty_paths_skipped() {
        let doc = parse_svg_str(
            r#"<svg><path d="M0 0 L1 1" fill="none"/><path d=""/><path fill="red"/></svg>"#,
        )
        .expect("Failed to parse SVG");
        assert!(doc.paths.is_empty());
        assert_eq!(doc.canvas, None);
    }

    #[test]
    fn test_bad_stroke_width_kept_as_nan() {
        let doc = parse_svg_str(r#"<svg><path d="M0 0 L1 1" stroke="red" stroke-width="wide"/></svg>"#)
            .expect("Failed to parse SVG");
        let stroke = doc.paths[0].stroke.as_ref().expect("Stroke expected");
        assert!(stroke.width.is_nan());
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_svg_str("<svg><path d=\"M0 0\"></svg>").unwrap_err();
        assert_eq!(err.code(), "E1005");
    }
}
