//! Scene to SVG conversion.
//!
//! The SVG is an intermediate representation: it is parsed by usvg and
//! rasterized by resvg into a tiny-skia pixmap.

use std::fmt::Write;

use folio_core::element::kind;
use folio_core::{Scene, SceneObject, ViewportTransform};
use serde_json::Value;

/// Identifier of the page clip path inside the generated SVG.
const CLIP_ID: &str = "page-clip";

/// Build an SVG document of `width` x `height` pixels for the scene.
#[must_use]
pub fn scene_to_svg(
    scene: &Scene,
    width: u32,
    height: u32,
    transform: ViewportTransform,
    clip: Option<&SceneObject>,
) -> String {
    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );

    if let Some(clip) = clip {
        let size = clip.scaled_size();
        let _ = write!(
            svg,
            "<defs><clipPath id=\"{CLIP_ID}\" clipPathUnits=\"userSpaceOnUse\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"/></clipPath></defs>",
            clip.left, clip.top, size.width, size.height,
        );
    }

    if let Some(background) = scene.background.as_ref().and_then(Value::as_str) {
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(background)
        );
    }

    let [a, b, c, d, e, f] = transform.to_matrix();
    let _ = write!(svg, "<g transform=\"matrix({a} {b} {c} {d} {e} {f})\"");
    if clip.is_some() {
        let _ = write!(svg, " clip-path=\"url(#{CLIP_ID})\"");
    }
    svg.push('>');

    for object in scene.objects.iter().filter(|o| o.visible) {
        render_object_svg(&mut svg, object);
    }

    svg.push_str("</g></svg>");
    svg
}

/// Render a single object. Geometry is drawn in the object's local box
/// (origin at its top-left corner) inside a positioning group.
fn render_object_svg(svg: &mut String, obj: &SceneObject) {
    let _ = write!(
        svg,
        "<g transform=\"translate({} {}) rotate({}) scale({} {})\" opacity=\"{}\">",
        obj.left, obj.top, obj.angle, obj.scale_x, obj.scale_y, obj.opacity,
    );

    let paint = paint_attrs(obj);
    let (w, h) = (obj.width, obj.height);

    match obj.kind.as_str() {
        kind::RECT => {
            let rx = obj.rx.unwrap_or(0.0);
            let ry = obj.ry.unwrap_or(rx);
            let _ = write!(
                svg,
                "<rect width=\"{w}\" height=\"{h}\" rx=\"{rx}\" ry=\"{ry}\"{paint}/>"
            );
        }
        kind::CIRCLE => {
            let r = obj.radius.unwrap_or(w / 2.0);
            let _ = write!(svg, "<circle cx=\"{r}\" cy=\"{r}\" r=\"{r}\"{paint}/>");
        }
        kind::ELLIPSE => {
            let rx = obj.rx.unwrap_or(w / 2.0);
            let ry = obj.ry.unwrap_or(h / 2.0);
            let _ = write!(
                svg,
                "<ellipse cx=\"{rx}\" cy=\"{ry}\" rx=\"{rx}\" ry=\"{ry}\"{paint}/>"
            );
        }
        kind::TRIANGLE => {
            let half = w / 2.0;
            let _ = write!(
                svg,
                "<polygon points=\"{half},0 {w},{h} 0,{h}\"{paint}/>"
            );
        }
        kind::TEXT | kind::I_TEXT | kind::TEXTBOX => render_text_svg(svg, obj),
        kind::IMAGE => {
            if let Some(src) = obj.src.as_deref() {
                let _ = write!(
                    svg,
                    "<image width=\"{w}\" height=\"{h}\" preserveAspectRatio=\"none\" xlink:href=\"{}\"/>",
                    escape_xml(src)
                );
            }
        }
        kind::PATH => {
            if let Some(d) = obj.extra.get("path").and_then(path_data) {
                let (dx, dy) = path_offset(obj);
                let _ = write!(
                    svg,
                    "<path transform=\"translate({dx} {dy})\" d=\"{}\"{paint}/>",
                    escape_xml(&d)
                );
            }
        }
        kind::POLYGON => {
            if let Some(points) = obj.extra.get("points").and_then(polygon_points) {
                let (dx, dy) = path_offset(obj);
                let _ = write!(
                    svg,
                    "<polygon transform=\"translate({dx} {dy})\" points=\"{points}\"{paint}/>"
                );
            }
        }
        other => {
            tracing::trace!("Skipping unsupported object type '{other}'");
        }
    }

    svg.push_str("</g>");
}

fn render_text_svg(svg: &mut String, obj: &SceneObject) {
    let Some(content) = obj.text.as_deref() else {
        return;
    };
    let font_size = obj.font_size.unwrap_or(40.0);
    let family = obj.font_family.as_deref().unwrap_or("sans-serif");
    let fill = obj.fill_color().unwrap_or("#000000");
    let line_height = font_size * 1.16;

    let _ = write!(
        svg,
        "<text font-size=\"{font_size}\" font-family=\"{}\" fill=\"{}\">",
        escape_xml(family),
        escape_xml(fill)
    );
    for (idx, line) in content.split('\n').enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = font_size + line_height * idx as f32;
        let _ = write!(svg, "<tspan x=\"0\" y=\"{y}\">{}</tspan>", escape_xml(line));
    }
    svg.push_str("</text>");
}

/// Fill and stroke attributes, with a leading space.
fn paint_attrs(obj: &SceneObject) -> String {
    let mut attrs = String::new();
    let fill = obj.fill_color().unwrap_or("none");
    let _ = write!(attrs, " fill=\"{}\"", escape_xml(fill));
    if let Some(stroke) = obj.stroke_color() {
        let width = obj.stroke_width.unwrap_or(1.0);
        let _ = write!(
            attrs,
            " stroke=\"{}\" stroke-width=\"{width}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"",
            escape_xml(stroke)
        );
    }
    attrs
}

/// Offset that maps absolute path coordinates into the object's local box.
fn path_offset(obj: &SceneObject) -> (f32, f32) {
    let offset = obj.extra.get("pathOffset");
    #[allow(clippy::cast_possible_truncation)]
    let coord = |key: &str| {
        offset
            .and_then(|o| o.get(key))
            .and_then(Value::as_f64)
            .map(|v| v as f32)
    };
    match (coord("x"), coord("y")) {
        (Some(x), Some(y)) => (obj.width / 2.0 - x, obj.height / 2.0 - y),
        _ => (0.0, 0.0),
    }
}

/// Convert `[["M", x, y], ["Q", x1, y1, x, y], ...]` into SVG path data.
fn path_data(value: &Value) -> Option<String> {
    let commands = value.as_array()?;
    let mut d = String::new();
    for command in commands {
        let parts = command.as_array()?;
        for part in parts {
            match part {
                Value::String(s) => d.push_str(s),
                Value::Number(n) => {
                    let _ = write!(d, "{n}");
                }
                _ => return None,
            }
            d.push(' ');
        }
    }
    let d = d.trim_end().to_string();
    (!d.is_empty()).then_some(d)
}

/// Convert `[{"x": 1, "y": 2}, ...]` into SVG polygon points.
fn polygon_points(value: &Value) -> Option<String> {
    let points = value.as_array()?;
    let mut out = String::new();
    for point in points {
        let x = point.get("x")?.as_f64()?;
        let y = point.get("y")?.as_f64()?;
        let _ = write!(out, "{x},{y} ");
    }
    let out = out.trim_end().to_string();
    (!out.is_empty()).then_some(out)
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
