//! B 样条分解为三次贝塞尔曲线。
//!
//! 做法是标准的节点插入：把曲线定义域内每个节点值的重数补足到阶数 `p`，
//! 此后每个非零长度节点区间 `[u_i, u_{i+1})` 对应的控制点 `P_{i-p}..=P_i`
//! 就是该段贝塞尔曲线的控制多边形。一、二阶段精确升阶为三次；
//! 高于三阶的段用端点与端切线一致的三次曲线近似。

use dxfsvg_core::geometry::Point2;
use glam::DVec2;

use crate::errors::GeometryError;

/// 三次贝塞尔曲线。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bezier2 {
    pub start: Point2,
    pub control1: Point2,
    pub control2: Point2,
    pub end: Point2,
}

impl Bezier2 {
    pub fn new(start: DVec2, control1: DVec2, control2: DVec2, end: DVec2) -> Self {
        Self {
            start: Point2::from_vec(start),
            control1: Point2::from_vec(control1),
            control2: Point2::from_vec(control2),
            end: Point2::from_vec(end),
        }
    }

    /// 在局部参数 `t ∈ [0, 1]` 处求值。
    pub fn point_at(&self, t: f64) -> Point2 {
        let mt = 1.0 - t;
        let p = self.start.as_vec2() * (mt * mt * mt)
            + self.control1.as_vec2() * (3.0 * mt * mt * t)
            + self.control2.as_vec2() * (3.0 * mt * t * t)
            + self.end.as_vec2() * (t * t * t);
        Point2::from_vec(p)
    }
}

pub fn decompose(
    degree: i32,
    control_points: &[Point2],
    knots: &[f64],
) -> Result<Vec<Bezier2>, GeometryError> {
    let degree = validate(degree, control_points, knots)?;

    let mut points: Vec<DVec2> = control_points.iter().map(|point| point.as_vec2()).collect();
    let mut knots = knots.to_vec();

    let domain_start = knots[degree];
    let domain_end = knots[points.len()];
    let mut breakpoints: Vec<f64> = knots
        .iter()
        .copied()
        .filter(|value| *value >= domain_start && *value <= domain_end)
        .collect();
    breakpoints.dedup();

    for value in breakpoints {
        while multiplicity(&knots, value) < degree {
            insert_knot(&mut points, &mut knots, degree, value);
        }
    }

    let mut curves = Vec::new();
    for span in degree..points.len() {
        if knots[span] < knots[span + 1] {
            curves.push(to_cubic(&points[span - degree..=span]));
        }
    }
    Ok(curves)
}

fn validate(degree: i32, control_points: &[Point2], knots: &[f64]) -> Result<usize, GeometryError> {
    let degree = usize::try_from(degree)
        .ok()
        .filter(|degree| *degree >= 1)
        .ok_or_else(|| GeometryError::InvalidSpline(format!("degree {degree} is below 1")))?;
    let count = control_points.len();
    if count < degree + 1 {
        return Err(GeometryError::InvalidSpline(format!(
            "{count} control points cannot define a degree {degree} curve"
        )));
    }
    if knots.len() != count + degree + 1 {
        return Err(GeometryError::InvalidSpline(format!(
            "expected {} knots, found {}",
            count + degree + 1,
            knots.len()
        )));
    }
    if knots.iter().any(|value| !value.is_finite()) {
        return Err(GeometryError::InvalidSpline("knot vector is not finite".to_string()));
    }
    if knots.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(GeometryError::InvalidSpline("knot vector is decreasing".to_string()));
    }
    if knots[degree] >= knots[count] {
        return Err(GeometryError::InvalidSpline("curve domain is empty".to_string()));
    }
    Ok(degree)
}

fn multiplicity(knots: &[f64], value: f64) -> usize {
    knots.iter().filter(|knot| **knot == value).count()
}

/// Boehm 单次节点插入。`value` 须位于定义域内且当前重数小于阶数。
fn insert_knot(points: &mut Vec<DVec2>, knots: &mut Vec<f64>, degree: usize, value: f64) {
    let span = knots.partition_point(|knot| *knot <= value) - 1;
    let existing = knots[..=span]
        .iter()
        .rev()
        .take_while(|knot| **knot == value)
        .count();

    let mut refined = Vec::with_capacity(points.len() + 1);
    for i in 0..=points.len() {
        let point = if i + degree <= span {
            points[i]
        } else if i + existing > span {
            points[i - 1]
        } else {
            let alpha = (value - knots[i]) / (knots[i + degree] - knots[i]);
            points[i - 1].lerp(points[i], alpha)
        };
        refined.push(point);
    }

    *points = refined;
    knots.insert(span + 1, value);
}

fn to_cubic(control: &[DVec2]) -> Bezier2 {
    match control {
        [a, b] => Bezier2::new(*a, a.lerp(*b, 1.0 / 3.0), a.lerp(*b, 2.0 / 3.0), *b),
        [a, b, c] => Bezier2::new(*a, a.lerp(*b, 2.0 / 3.0), c.lerp(*b, 2.0 / 3.0), *c),
        [a, b, c, d] => Bezier2::new(*a, *b, *c, *d),
        _ => {
            // 高阶段：保持端点与端切线。
            let last = control.len() - 1;
            let factor = last as f64 / 3.0;
            let start = control[0];
            let end = control[last];
            Bezier2::new(
                start,
                start + (control[1] - start) * factor,
                end - (end - control[last - 1]) * factor,
                end,
            )
        }
    }
}
