//! Midpoint-quadratic smoothing for drawing strokes.
//!
//! Each interior sample becomes a quadratic control point whose curve ends
//! halfway to the next sample, which hides the polyline corners of raw
//! pointer input without moving the ink off its samples.

use crate::stroke::InkPoint;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    QuadTo { cx: f64, cy: f64, x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

/// Smoothed outline of a sample sequence. Empty for no samples.
pub fn midpoint_path(points: &[InkPoint]) -> Vec<PathCommand> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut path = Vec::with_capacity(points.len() + 1);
    path.push(PathCommand::MoveTo {
        x: first.x,
        y: first.y,
    });
    for w in points.windows(2).skip(1) {
        let (ctrl, next) = (w[0], w[1]);
        path.push(PathCommand::QuadTo {
            cx: ctrl.x,
            cy: ctrl.y,
            x: (ctrl.x + next.x) / 2.0,
            y: (ctrl.y + next.y) / 2.0,
        });
    }
    if let Some(last) = points.last().filter(|_| points.len() >= 2) {
        path.push(PathCommand::LineTo {
            x: last.x,
            y: last.y,
        });
    }
    path
}

/// SVG `d` attribute for a path.
pub fn svg_path_data(path: &[PathCommand]) -> String {
    path.iter()
        .map(|cmd| match *cmd {
            PathCommand::MoveTo { x, y } => format!("M{x:.2} {y:.2}"),
            PathCommand::QuadTo { cx, cy, x, y } => format!("Q{cx:.2} {cy:.2} {x:.2} {y:.2}"),
            PathCommand::LineTo { x, y } => format!("L{x:.2} {y:.2}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
