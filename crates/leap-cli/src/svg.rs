use leap_core::{RenderItem, Rgb, svg_path_data};

/// Ink colour for strokes on the highlighted world line.
const HIGHLIGHT: Rgb = [0.0, 180.0, 255.0];

/// Render a frame's draw list as a standalone SVG document on a white page.
pub fn render_svg(items: &[RenderItem], width: f64, height: f64) -> String {
    let mut out = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    out.push('\n');
    out.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    for item in items {
        let color = if item.highlighted { HIGHLIGHT } else { item.color };
        out.push_str(&format!(
            r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-opacity="{:.3}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            svg_path_data(&item.path),
            css_rgb(color),
            item.width,
            item.opacity.clamp(0.0, 1.0),
        ));
        out.push('\n');
    }
    out.push_str("</svg>\n");
    out
}

fn css_rgb(c: Rgb) -> String {
    let channel = |v: f64| v.clamp(0.0, 255.0).round() as u8;
    format!("rgb({},{},{})", channel(c[0]), channel(c[1]), channel(c[2]))
}
