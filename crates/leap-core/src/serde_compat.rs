//! JSON serde for the flat snapshot format.
//!
//! ```text
//! { "virtual_time": f64,
//!   "strokes": [ { "points": [[x, y, pressure], ...], "width": f64,
//!                  "color": [r, g, b], "time_created": f64, "base_alpha": f64 } ] }
//! ```
//!
//! Strokes are written in commit order. Creation times are not required to
//! be sorted: a decrease marks the start of another world line.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::stroke::{InkPoint, Stroke};

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct WireSnapshot {
    #[serde(default)]
    pub virtual_time: f64,
    #[serde(default)]
    pub strokes: Vec<WireStroke>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireStroke {
    /// `[x, y, pressure]`; `[x, y]` is accepted on import with pressure 1.
    pub points: Vec<Vec<f64>>,
    pub width: f64,
    pub color: [f64; 3],
    pub time_created: f64,
    #[serde(default = "full_alpha")]
    pub base_alpha: f64,
}

fn full_alpha() -> f64 {
    1.0
}

/// A validated snapshot, ready to replace a session's state in one step.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub virtual_time: f64,
    /// Frontier: the larger of `virtual_time` and every creation time.
    pub max_virtual_time: f64,
    pub strokes: Vec<Stroke>,
}

// --- Conversion: Wire → Domain ---

impl WireSnapshot {
    /// Validate and convert. Fails on the first bad value.
    pub fn into_snapshot(self) -> Result<Snapshot, SnapshotError> {
        let virtual_time = non_negative("virtual_time", self.virtual_time)?;
        let mut max_virtual_time = virtual_time;

        let mut strokes = Vec::with_capacity(self.strokes.len());
        for (i, wire) in self.strokes.into_iter().enumerate() {
            let stroke = wire_stroke_to_domain(wire).map_err(|e| match e {
                SnapshotError::Invalid(msg) => {
                    SnapshotError::Invalid(format!("stroke {i}: {msg}"))
                }
                other => other,
            })?;
            max_virtual_time = max_virtual_time.max(stroke.creation_time());
            strokes.push(stroke);
        }

        Ok(Snapshot {
            virtual_time,
            max_virtual_time,
            strokes,
        })
    }

    /// Capture strokes (commit order) and the current virtual time.
    pub fn from_parts(strokes: &[Stroke], virtual_time: f64) -> Self {
        WireSnapshot {
            virtual_time,
            strokes: strokes.iter().map(domain_stroke_to_wire).collect(),
        }
    }
}

fn wire_stroke_to_domain(wire: WireStroke) -> Result<Stroke, SnapshotError> {
    let time_created = non_negative("time_created", wire.time_created)?;
    let width = non_negative("width", wire.width)?;
    if wire.color.iter().any(|c| !c.is_finite()) {
        return Err(SnapshotError::Invalid("color must be finite".into()));
    }
    if !wire.base_alpha.is_finite() {
        return Err(SnapshotError::Invalid("base_alpha must be finite".into()));
    }

    let points = wire
        .points
        .iter()
        .map(|p| wire_point_to_domain(p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stroke::new(points, width, wire.color, time_created).with_alpha(wire.base_alpha))
}

fn wire_point_to_domain(p: &[f64]) -> Result<InkPoint, SnapshotError> {
    if p.iter().any(|v| !v.is_finite()) {
        return Err(SnapshotError::Invalid("point coordinates must be finite".into()));
    }
    match *p {
        [x, y] => Ok(InkPoint::new(x, y, 1.0)),
        [x, y, pressure] => Ok(InkPoint::new(x, y, pressure)),
        _ => Err(SnapshotError::Invalid(format!(
            "point must have 2 or 3 components, got {}",
            p.len()
        ))),
    }
}

fn non_negative(field: &str, v: f64) -> Result<f64, SnapshotError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(SnapshotError::Invalid(format!(
            "{field} must be a finite non-negative number, got {v}"
        )))
    }
}

fn domain_stroke_to_wire(stroke: &Stroke) -> WireStroke {
    WireStroke {
        points: stroke
            .points()
            .iter()
            .map(|p| p.to_array().to_vec())
            .collect(),
        width: stroke.width(),
        color: stroke.color(),
        time_created: stroke.creation_time(),
        base_alpha: stroke.visible_alpha(),
    }
}

/// Parse and validate a snapshot document.
pub fn import_json(json: &str) -> Result<Snapshot, SnapshotError> {
    let wire: WireSnapshot = serde_json::from_str(json)?;
    wire.into_snapshot()
}

/// Serialize strokes and virtual time to the snapshot format.
pub fn export_json(strokes: &[Stroke], virtual_time: f64) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&WireSnapshot::from_parts(strokes, virtual_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::BLACK;

    fn make_strokes() -> Vec<Stroke> {
        vec![
            Stroke::new(
                vec![InkPoint::new(1.0, 2.0, 1.0), InkPoint::new(3.0, 4.0, 0.5)],
                6.0,
                BLACK,
                1.0,
            ),
            Stroke::new(
                vec![InkPoint::new(10.0, 10.0, 1.0), InkPoint::new(20.0, 5.0, 1.0)],
                3.0,
                [255.0, 0.0, 0.0],
                4.5,
            ),
            Stroke::new(
                vec![InkPoint::new(7.0, 7.0, 1.0), InkPoint::new(8.0, 9.0, 1.0)],
                6.0,
                BLACK,
                2.0,
            ),
        ]
    }

    #[test]
    fn test_roundtrip() {
        let strokes = make_strokes();
        let json = export_json(&strokes, 3.25).unwrap();
        let snap = import_json(&json).unwrap();

        assert_eq!(snap.virtual_time, 3.25);
        assert_eq!(snap.strokes, strokes);
    }

    #[test]
    fn test_commit_order_kept() {
        let json = export_json(&make_strokes(), 0.0).unwrap();
        let snap = import_json(&json).unwrap();
        let times: Vec<f64> = snap.strokes.iter().map(|s| s.creation_time()).collect();
        assert_eq!(times, vec![1.0, 4.5, 2.0]);
    }

    #[test]
    fn test_max_time_from_strokes() {
        let json = export_json(&make_strokes(), 3.0).unwrap();
        assert_eq!(import_json(&json).unwrap().max_virtual_time, 4.5);

        let json = export_json(&make_strokes(), 9.0).unwrap();
        assert_eq!(import_json(&json).unwrap().max_virtual_time, 9.0);
    }

    #[test]
    fn test_base_alpha_optional() {
        let json = r#"{
            "virtual_time": 2.0,
            "strokes": [
                { "points": [[0, 0, 1], [5, 5, 1]], "width": 6,
                  "color": [0, 0, 0], "time_created": 1.5 }
            ]
        }"#;
        let snap = import_json(json).unwrap();
        assert_eq!(snap.strokes[0].visible_alpha(), 1.0);
        assert_eq!(snap.strokes[0].creation_time(), 1.5);
    }

    #[test]
    fn test_missing_fields_default() {
        let snap = import_json("{}").unwrap();
        assert_eq!(snap.virtual_time, 0.0);
        assert!(snap.strokes.is_empty());
    }

    #[test]
    fn test_two_component_points() {
        let json = r#"{"strokes": [{"points": [[1, 2], [3, 4]], "width": 2,
            "color": [0, 0, 0], "time_created": 0}]}"#;
        let snap = import_json(json).unwrap();
        assert_eq!(snap.strokes[0].points()[1], InkPoint::new(3.0, 4.0, 1.0));
    }

    #[test]
    fn test_rejects_bad_point_arity() {
        let json = r#"{"strokes": [{"points": [[1]], "width": 2,
            "color": [0, 0, 0], "time_created": 0}]}"#;
        let err = import_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)), "{err}");
        assert!(err.to_string().contains("stroke 0"));
    }

    #[test]
    fn test_rejects_negative_time() {
        let json = r#"{"virtual_time": -1.0, "strokes": []}"#;
        assert!(matches!(import_json(json), Err(SnapshotError::Invalid(_))));
    }

    #[test]
    fn test_rejects_negative_width() {
        let json = r#"{"strokes": [{"points": [[1, 2], [3, 4]], "width": -2,
            "color": [0, 0, 0], "time_created": 0}]}"#;
        let err = import_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)), "{err}");
        let msg = err.to_string();
        assert!(msg.contains("stroke 0") && msg.contains("width"), "{msg}");
    }

    #[test]
    fn test_rejects_negative_creation_time() {
        let json = r#"{"strokes": [
            {"points": [[1, 2], [3, 4]], "width": 2, "color": [0, 0, 0], "time_created": 1},
            {"points": [[1, 2], [3, 4]], "width": 2, "color": [0, 0, 0], "time_created": -0.5}
        ]}"#;
        let err = import_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::Invalid(_)), "{err}");
        let msg = err.to_string();
        assert!(msg.contains("stroke 1") && msg.contains("time_created"), "{msg}");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(import_json("not json"), Err(SnapshotError::Json(_))));
        assert!(matches!(
            import_json(r#"{"strokes": [{"width": 1}]}"#),
            Err(SnapshotError::Json(_))
        ));
    }
}
