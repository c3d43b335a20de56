//! Drawing operations and their wire codec.
//!
//! An [`Operation`] is the atomic unit exchanged with the server. On the wire it
//! is a loosely shaped JSON object:
//!
//! ```text
//! { "t": "line" | "circle" | "erase" | "clear",
//!   "p": { "pts": [[x, y], ...], "cx": .., "cy": .., "r": ..,
//!          "c": "#rrggbb", "w": 4, "erase": 1, "clear": 1, "cid": ".." } }
//! ```
//!
//! Decoding is tolerant of the variants older clients produced: a flat payload
//! without `p`, a missing `t`, and erase/clear expressed as flags on a
//! line-shaped payload. Anything that still lacks the geometry its kind needs
//! decodes to `None` and is dropped.

use crate::lenient;
use crate::stroke::{StrokeStyle, normalize_width};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Points and style of a line or free-form stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePayload {
    pub points: Vec<Point>,
    pub style: StrokeStyle,
}

impl LinePayload {
    pub fn new(points: Vec<Point>, style: StrokeStyle) -> Self {
        Self { points, style }
    }
}

/// Center, radius and style of a circle outline.
#[derive(Debug, Clone, PartialEq)]
pub struct CirclePayload {
    pub center: Point,
    pub radius: f64,
    pub style: StrokeStyle,
}

impl CirclePayload {
    pub fn new(center: Point, radius: f64, style: StrokeStyle) -> Self {
        Self { center, radius, style }
    }
}

/// Path and width of an eraser swath.
#[derive(Debug, Clone, PartialEq)]
pub struct ErasePayload {
    pub points: Vec<Point>,
    pub width: f64,
}

impl ErasePayload {
    pub fn new(points: Vec<Point>, width: f64) -> Self {
        Self {
            points,
            width: normalize_width(width),
        }
    }
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Line(LinePayload),
    Circle(CirclePayload),
    Erase(ErasePayload),
    Clear,
}

/// Discriminant of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Line,
    Circle,
    Erase,
    Clear,
}

impl OpKind {
    /// Value of the wire `t` field.
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Line => "line",
            OpKind::Circle => "circle",
            OpKind::Erase => "erase",
            OpKind::Clear => "clear",
        }
    }
}

/// Canonical form of an operation's visual content, used for echo dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Line(_) => OpKind::Line,
            Operation::Circle(_) => OpKind::Circle,
            Operation::Erase(_) => OpKind::Erase,
            Operation::Clear => OpKind::Clear,
        }
    }

    /// Whether the operation carries the geometry its kind needs.
    pub fn is_well_formed(&self) -> bool {
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        match self {
            Operation::Line(line) => line.points.len() >= 2 && line.points.iter().all(finite),
            Operation::Circle(circle) => {
                finite(&circle.center) && circle.radius.is_finite() && circle.radius >= 0.0
            }
            Operation::Erase(erase) => !erase.points.is_empty() && erase.points.iter().all(finite),
            Operation::Clear => true,
        }
    }

    /// Signature over kind, geometry and style only.
    pub fn signature(&self) -> Signature {
        let wire = WireOperation::from_operation(self, None);
        Signature(serde_json::to_string(&wire).unwrap_or_else(|_| format!("{:?}", self)))
    }
}

/// An operation plus the client id it was stamped with, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedOperation {
    pub op: Operation,
    /// Client-generated operation id, echoed back by the server.
    pub cid: Option<String>,
}

impl TaggedOperation {
    pub fn new(op: Operation, cid: Option<String>) -> Self {
        Self { op, cid }
    }

    /// Untagged wrapper, as for operations replayed from a snapshot.
    pub fn untagged(op: Operation) -> Self {
        Self { op, cid: None }
    }

    /// Wire representation.
    pub fn to_wire(&self) -> WireOperation {
        WireOperation::from_operation(&self.op, self.cid.clone())
    }
}

impl From<Operation> for TaggedOperation {
    fn from(op: Operation) -> Self {
        Self::untagged(op)
    }
}

/// Wire payload (`p`) of an operation.
///
/// Numbers are read leniently: numeric strings are accepted and points may
/// carry extra elements after `x` and `y`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_points")]
    pub pts: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_number")]
    pub cx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_number")]
    pub cy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_number")]
    pub r: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_string")]
    pub c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_number")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erase: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<Value>,
}

/// Wire shape of an operation: `{ "t": .., "p": { .. } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireOperation {
    pub t: String,
    pub p: WirePayload,
}

fn to_pairs(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

fn from_pairs(pairs: &[[f64; 2]]) -> Vec<Point> {
    pairs.iter().map(|[x, y]| Point::new(*x, *y)).collect()
}

/// Truthiness of a flag field (`1`, `true`, `"1"`).
fn flag_set(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

fn cid_string(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

impl WireOperation {
    /// Canonical encoding of an operation.
    pub fn from_operation(op: &Operation, cid: Option<String>) -> Self {
        let mut p = WirePayload {
            cid: cid.map(Value::String),
            ..WirePayload::default()
        };
        match op {
            Operation::Line(line) => {
                p.pts = Some(to_pairs(&line.points));
                p.c = Some(line.style.color.clone());
                p.w = Some(line.style.width);
            }
            Operation::Circle(circle) => {
                p.cx = Some(circle.center.x);
                p.cy = Some(circle.center.y);
                p.r = Some(circle.radius);
                p.c = Some(circle.style.color.clone());
                p.w = Some(circle.style.width);
            }
            Operation::Erase(erase) => {
                p.pts = Some(to_pairs(&erase.points));
                p.w = Some(erase.width);
                p.erase = Some(Value::from(1));
            }
            Operation::Clear => {
                p.clear = Some(Value::from(1));
            }
        }
        Self {
            t: op.kind().as_str().to_string(),
            p,
        }
    }

    /// Interpret the wire form, dropping operations without usable geometry.
    pub fn into_operation(self) -> Option<TaggedOperation> {
        self.into_operation_with(&StrokeStyle::default())
    }

    /// Like [`into_operation`](Self::into_operation), filling a missing color
    /// or width from `defaults`.
    pub fn into_operation_with(self, defaults: &StrokeStyle) -> Option<TaggedOperation> {
        let WireOperation { t, p } = self;
        let cid = cid_string(&p.cid);
        let width = p.w.unwrap_or(defaults.width);
        let style = || StrokeStyle::new(p.c.clone().unwrap_or_else(|| defaults.color.clone()), width);

        let op = if t == "clear" || flag_set(&p.clear) {
            Operation::Clear
        } else if t == "erase" || flag_set(&p.erase) {
            let points = from_pairs(p.pts.as_deref()?);
            Operation::Erase(ErasePayload::new(points, width))
        } else if t == "circle" {
            let center = Point::new(p.cx?, p.cy?);
            Operation::Circle(CirclePayload::new(center, p.r?, style()))
        } else if t == "line" {
            let points = from_pairs(p.pts.as_deref()?);
            Operation::Line(LinePayload::new(points, style()))
        } else {
            return None;
        };

        op.is_well_formed().then(|| TaggedOperation::new(op, cid))
    }
}

/// Decode one operation from arbitrary JSON.
///
/// Accepts `{t, p}`, a flat object with the payload fields beside `t`, and a
/// missing `t` (treated as a line).
pub fn decode_operation(value: &Value) -> Option<TaggedOperation> {
    decode_operation_with(value, &StrokeStyle::default())
}

/// Decode one operation, taking a missing color or width from `defaults`.
pub fn decode_operation_with(value: &Value, defaults: &StrokeStyle) -> Option<TaggedOperation> {
    let obj = value.as_object()?;
    let t = obj
        .get("t")
        .and_then(Value::as_str)
        .unwrap_or("line")
        .to_ascii_lowercase();
    let payload = match obj.get("p") {
        Some(p @ Value::Object(_)) => p.clone(),
        _ => value.clone(),
    };
    let p: WirePayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("Dropping operation with malformed payload: {}", e);
            return None;
        }
    };
    let decoded = WireOperation { t, p }.into_operation_with(defaults);
    if decoded.is_none() {
        log::debug!("Dropping incomplete operation: {}", value);
    }
    decoded
}
