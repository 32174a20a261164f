use std::f64::consts::{PI, TAU};

use dxfsvg_core::drawing::{Arc, Circle, Ellipse, Image, Insert, Line, Polyline, Spline};
use dxfsvg_core::geometry::{Point2, Vector2};
use glam::DVec2;

use crate::errors::GeometryError;
use crate::format::Num;
use crate::path::Path;
use crate::spline::{self, Bezier2};
use crate::svg::SvgElement;

/// 判定整圈的参数容差（弧度）。
pub const FULL_TURN_TOLERANCE: f64 = 1e-9;
/// 凸度、弦长与点重合判定使用的容差。
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// 曲线编译的结果：路径，或可直接表达的原生图形。
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledShape {
    Path(Path),
    Circle {
        center: Point2,
        radius: f64,
    },
    Ellipse {
        center: Point2,
        rx: f64,
        ry: f64,
        rotation: f64,
    },
    Line {
        start: Point2,
        end: Point2,
    },
}

impl CompiledShape {
    pub fn into_element(self) -> SvgElement {
        match self {
            CompiledShape::Path(path) => SvgElement::new("path").attr("d", path.to_svg_data()),
            CompiledShape::Circle { center, radius } => SvgElement::new("circle")
                .num_attr("cx", center.x())
                .num_attr("cy", center.y())
                .num_attr("r", radius),
            CompiledShape::Ellipse {
                center,
                rx,
                ry,
                rotation,
            } => {
                let element = SvgElement::new("ellipse")
                    .num_attr("cx", center.x())
                    .num_attr("cy", center.y())
                    .num_attr("rx", rx)
                    .num_attr("ry", ry);
                if rotation.abs() > GEOMETRY_EPSILON {
                    element.attr(
                        "transform",
                        format!(
                            "rotate({} {} {})",
                            Num(rotation),
                            Num(center.x()),
                            Num(center.y())
                        ),
                    )
                } else {
                    element
                }
            }
            CompiledShape::Line { start, end } => SvgElement::new("line")
                .num_attr("x1", start.x())
                .num_attr("y1", start.y())
                .num_attr("x2", end.x())
                .num_attr("y2", end.y()),
        }
    }
}

/// 圆弧按等轴椭圆处理，角度由度转换为弧度。
pub fn compile_arc(arc: &Arc) -> CompiledShape {
    elliptical_shape(
        arc.center,
        DVec2::new(arc.radius.abs(), 0.0),
        1.0,
        arc.start_angle.to_radians(),
        arc.end_angle.to_radians(),
    )
}

pub fn compile_circle(circle: &Circle) -> CompiledShape {
    CompiledShape::Circle {
        center: circle.center,
        radius: circle.radius.abs(),
    }
}

pub fn compile_ellipse(ellipse: &Ellipse) -> CompiledShape {
    elliptical_shape(
        ellipse.center,
        ellipse.major_axis.as_vec2(),
        ellipse.ratio,
        ellipse.start_parameter,
        ellipse.end_parameter,
    )
}

pub fn compile_line(line: &Line) -> CompiledShape {
    CompiledShape::Line {
        start: line.start,
        end: line.end,
    }
}

#[inline]
fn is_full_turn(start: f64, end: f64) -> bool {
    start.abs() <= FULL_TURN_TOLERANCE && (end - TAU).abs() <= FULL_TURN_TOLERANCE
}

/// 由中心、主轴向量、短长轴比与参数范围生成椭圆弧。
///
/// 参数沿逆时针增长，路径位于图纸局部坐标中，因此 sweep 恒为正向。
/// 起点为 0、终点为 2π 的整圈直接输出原生圆/椭圆；
/// 带起始偏移的整圈拆成两段半圈，避免首尾重合的单段弧。
pub fn elliptical_shape(
    center: Point2,
    major_axis: DVec2,
    ratio: f64,
    start: f64,
    end: f64,
) -> CompiledShape {
    let rx = major_axis.length();
    let ratio = ratio.abs();
    let ry = rx * ratio;
    let rotation = major_axis.y.atan2(major_axis.x).to_degrees();

    if is_full_turn(start, end) {
        return if (ratio - 1.0).abs() <= GEOMETRY_EPSILON {
            CompiledShape::Circle { center, radius: rx }
        } else {
            CompiledShape::Ellipse {
                center,
                rx,
                ry,
                rotation,
            }
        };
    }

    let minor_axis = major_axis.perp() * ratio;
    let point_at = |t: f64| Point2::from_vec(center.as_vec2() + major_axis * t.cos() + minor_axis * t.sin());

    let mut span = (end - start).rem_euclid(TAU);
    if span <= FULL_TURN_TOLERANCE || TAU - span <= FULL_TURN_TOLERANCE {
        span = TAU;
    }

    let mut path = Path::starting_at(point_at(start));
    if span >= TAU {
        path.arc_to(rx, ry, rotation, false, true, point_at(start + PI));
        path.arc_to(rx, ry, rotation, false, true, point_at(start));
    } else {
        path.arc_to(rx, ry, rotation, span > PI, true, point_at(start + span));
    }
    CompiledShape::Path(path)
}

/// 多段线：逐对顶点生成直线或凸度圆弧，闭合时追加尾首相连的一段。
pub fn compile_polyline(polyline: &Polyline) -> Result<Path, GeometryError> {
    let first = polyline
        .vertices
        .first()
        .ok_or(GeometryError::EmptyPolyline)?;
    let mut path = Path::starting_at(first.position);

    for (last, next) in polyline.edges() {
        let distance = last.position.distance(next.position);
        if last.bulge.abs() <= GEOMETRY_EPSILON || distance <= GEOMETRY_EPSILON {
            path.line_to(next.position);
            continue;
        }
        let included_angle = 4.0 * last.bulge.abs().atan();
        let radius = (distance / 2.0) / (included_angle / 2.0).sin();
        path.arc_to(
            radius,
            radius,
            0.0,
            included_angle > PI,
            last.bulge > 0.0,
            next.position,
        );
    }
    Ok(path)
}

pub fn compile_spline(spline: &Spline) -> Result<Path, GeometryError> {
    let curves = spline::decompose(spline.degree, &spline.control_points, &spline.knot_values)?;
    beziers_to_path(&curves)
        .ok_or_else(|| GeometryError::InvalidSpline("no bezier segments produced".to_string()))
}

/// 贝塞尔序列转为路径；起点与当前点不重合时插入 `MoveTo` 断开子路径。
pub fn beziers_to_path(curves: &[Bezier2]) -> Option<Path> {
    let first = curves.first()?;
    let mut path = Path::starting_at(first.start);
    for curve in curves {
        if path.current_point().distance(curve.start) > GEOMETRY_EPSILON {
            path.move_to(curve.start);
        }
        path.cubic_to(curve.control1, curve.control2, curve.end);
    }
    Some(path)
}

/// 图像在输出中的摆放参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub anchor: Point2,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl ImagePlacement {
    /// 平移到锚点、按 U 方向旋转，再在局部翻转 Y 轴抵消外层的坐标翻转。
    pub fn transform(&self) -> String {
        format!(
            "translate({} {}) rotate({}) scale({} {})",
            Num(self.anchor.x()),
            Num(self.anchor.y()),
            Num(self.rotation),
            Num(1.0),
            Num(-1.0)
        )
    }
}

pub fn image_placement(image: &Image) -> Result<ImagePlacement, GeometryError> {
    let u_length = image.u_vector.length();
    if u_length <= GEOMETRY_EPSILON {
        return Err(GeometryError::DegenerateImage);
    }
    let width = u_length * image.image_size.x();
    let height = image.v_vector.length() * image.image_size.y();
    let rotation = image.u_vector.y().atan2(image.u_vector.x()).to_degrees();
    let up = Vector2::from(image.u_vector.perp().as_vec2() / u_length * height);
    Ok(ImagePlacement {
        anchor: image.location.translate(up),
        width,
        height,
        rotation,
    })
}

/// 块参照的局部变换：平移到插入点，旋转（非零时），再按轴缩放。
pub fn insert_transform(insert: &Insert) -> String {
    let translate = format!(
        "translate({} {})",
        Num(insert.location.x()),
        Num(insert.location.y())
    );
    let scale = format!("scale({} {})", Num(insert.x_scale), Num(insert.y_scale));
    if insert.rotation.abs() > GEOMETRY_EPSILON {
        format!("{translate} rotate({}) {scale}", Num(insert.rotation))
    } else {
        format!("{translate} {scale}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;
    use dxfsvg_core::drawing::PolylineVertex;

    fn vertex(x: f64, y: f64, bulge: f64) -> PolylineVertex {
        PolylineVertex::with_bulge(Point2::new(x, y), bulge)
    }

    #[test]
    fn zero_bulge_emits_line() {
        let polyline = Polyline::new(vec![vertex(0.0, 0.0, 0.0), vertex(4.0, 3.0, 0.0)], false);
        let path = compile_polyline(&polyline).expect("valid polyline");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::MoveTo { x: 0.0, y: 0.0 },
                PathSegment::LineTo { x: 4.0, y: 3.0 },
            ]
        );
    }

    #[test]
    fn bulge_radius_matches_half_chord() {
        for bulge in [0.25, -0.5, 1.0, 2.5, -3.0] {
            let polyline =
                Polyline::new(vec![vertex(0.0, 0.0, bulge), vertex(6.0, 8.0, 0.0)], false);
            let path = compile_polyline(&polyline).expect("valid polyline");
            let PathSegment::ArcTo {
                rx,
                ry,
                large_arc,
                sweep_positive,
                x,
                y,
                ..
            } = path.segments()[1]
            else {
                panic!("expected arc segment for bulge {bulge}");
            };
            let included = 4.0 * f64::atan(bulge.abs());
            assert!((rx * (included / 2.0).sin() - 5.0).abs() < 1e-9);
            assert_eq!(rx, ry);
            assert_eq!(large_arc, included > PI);
            assert_eq!(sweep_positive, bulge > 0.0);
            assert_eq!((x, y), (6.0, 8.0));
        }
    }

    #[test]
    fn coincident_points_emit_line_even_with_bulge() {
        let polyline = Polyline::new(vec![vertex(1.0, 1.0, 0.7), vertex(1.0, 1.0, 0.0)], false);
        let path = compile_polyline(&polyline).expect("valid polyline");
        assert!(matches!(path.segments()[1], PathSegment::LineTo { .. }));
    }

    #[test]
    fn closed_polyline_has_one_segment_per_vertex() {
        let polyline = Polyline::new(
            vec![
                vertex(0.0, 0.0, 0.0),
                vertex(10.0, 0.0, 0.0),
                vertex(10.0, 10.0, 0.0),
                vertex(0.0, 10.0, -1.0),
            ],
            true,
        );
        let path = compile_polyline(&polyline).expect("valid polyline");
        assert_eq!(path.len(), 1 + polyline.vertices.len());
        assert!(path.segments()[0].is_move());
        // 闭合段使用最后一个顶点的凸度。
        let PathSegment::ArcTo {
            sweep_positive, x, y, ..
        } = path.segments()[4]
        else {
            panic!("closing edge should be an arc");
        };
        assert!(!sweep_positive);
        assert_eq!((x, y), (0.0, 0.0));
    }

    #[test]
    fn empty_polyline_is_malformed() {
        let polyline = Polyline::new(Vec::new(), true);
        assert!(matches!(
            compile_polyline(&polyline),
            Err(GeometryError::EmptyPolyline)
        ));
    }

    #[test]
    fn full_arc_becomes_native_circle() {
        let arc = Arc {
            center: Point2::new(1.0, 2.0),
            radius: 3.0,
            start_angle: 0.0,
            end_angle: 360.0,
            thickness: 0.0,
        };
        assert_eq!(
            compile_arc(&arc),
            CompiledShape::Circle {
                center: Point2::new(1.0, 2.0),
                radius: 3.0
            }
        );
    }

    #[test]
    fn full_ellipse_becomes_native_ellipse_with_rotation() {
        let ellipse = Ellipse {
            center: Point2::new(0.0, 0.0),
            major_axis: Vector2::new(0.0, 4.0),
            ratio: 0.5,
            start_parameter: 0.0,
            end_parameter: TAU,
        };
        let CompiledShape::Ellipse { rx, ry, rotation, .. } = compile_ellipse(&ellipse) else {
            panic!("expected native ellipse");
        };
        assert_eq!((rx, ry), (4.0, 2.0));
        assert!((rotation - 90.0).abs() < 1e-9);
        let element = compile_ellipse(&ellipse).into_element();
        let transform = element.get_attr("transform").expect("rotated ellipse");
        assert!(transform.starts_with("rotate(90"));
        assert!(transform.ends_with(" 0.0 0.0)"));
    }

    #[test]
    fn quarter_arc_is_small_positive_sweep() {
        let arc = Arc {
            center: Point2::new(0.0, 0.0),
            radius: 2.0,
            start_angle: 0.0,
            end_angle: 90.0,
            thickness: 0.0,
        };
        let CompiledShape::Path(path) = compile_arc(&arc) else {
            panic!("expected path");
        };
        let PathSegment::ArcTo {
            large_arc,
            sweep_positive,
            x,
            y,
            ..
        } = path.segments()[1]
        else {
            panic!("expected arc segment");
        };
        assert!(!large_arc);
        assert!(sweep_positive);
        assert!(x.abs() < 1e-9);
        assert!((y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn wrapped_arc_uses_large_flag() {
        // 从 270° 逆时针到 180°，跨度 270°。
        let arc = Arc {
            center: Point2::new(0.0, 0.0),
            radius: 1.0,
            start_angle: 270.0,
            end_angle: 180.0,
            thickness: 0.0,
        };
        let CompiledShape::Path(path) = compile_arc(&arc) else {
            panic!("expected path");
        };
        assert!(matches!(
            path.segments()[1],
            PathSegment::ArcTo { large_arc: true, .. }
        ));
    }

    #[test]
    fn offset_full_turn_is_split_in_two_arcs() {
        let ellipse = Ellipse {
            center: Point2::new(0.0, 0.0),
            major_axis: Vector2::new(2.0, 0.0),
            ratio: 0.5,
            start_parameter: 1.0,
            end_parameter: 1.0 + TAU,
        };
        let CompiledShape::Path(path) = compile_ellipse(&ellipse) else {
            panic!("expected path");
        };
        assert_eq!(path.len(), 3);
        let start = path.segments()[0].end_point();
        assert!(start.distance(path.current_point()) < 1e-9);
    }

    #[test]
    fn spline_chain_breaks_only_on_gaps() {
        let spline = Spline {
            degree: 1,
            control_points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(5.0, 5.0),
                Point2::new(6.0, 6.0),
            ],
            knot_values: vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        };
        let path = compile_spline(&spline).expect("valid spline");
        let kinds: Vec<bool> = path.segments().iter().map(PathSegment::is_move).collect();
        assert_eq!(kinds, vec![true, false, true, false]);
    }

    #[test]
    fn image_anchor_is_offset_by_height_perpendicular_to_u() {
        let image = Image {
            location: Point2::new(10.0, 20.0),
            u_vector: Vector2::new(0.0, 0.5),
            v_vector: Vector2::new(-0.5, 0.0),
            image_size: Vector2::new(100.0, 40.0),
            file_path: "plan.png".to_string(),
        };
        let placement = image_placement(&image).expect("valid image");
        assert_eq!(placement.width, 50.0);
        assert_eq!(placement.height, 20.0);
        assert!((placement.rotation - 90.0).abs() < 1e-9);
        assert!((placement.anchor.x() + 10.0).abs() < 1e-9);
        assert!((placement.anchor.y() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn image_transform_formats_every_parameter() {
        let placement = ImagePlacement {
            anchor: Point2::new(3.0, 4.5),
            width: 1.0,
            height: 1.0,
            rotation: 0.0,
        };
        assert_eq!(
            placement.transform(),
            "translate(3.0 4.5) rotate(0.0) scale(1.0 -1.0)"
        );
    }

    #[test]
    fn insert_transform_orders_translate_rotate_scale() {
        let mut insert = Insert::new("BLK", Point2::new(5.0, -2.0), Vec::new());
        insert.x_scale = 2.0;
        insert.y_scale = 0.5;
        assert_eq!(insert_transform(&insert), "translate(5.0 -2.0) scale(2.0 0.5)");
        insert.rotation = 30.0;
        assert_eq!(
            insert_transform(&insert),
            "translate(5.0 -2.0) rotate(30.0) scale(2.0 0.5)"
        );
    }
}
