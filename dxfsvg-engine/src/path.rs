use dxfsvg_core::geometry::Point2;

use crate::format::Num;

/// 单条绘图指令。坐标均为图纸局部坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    ArcTo {
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep_positive: bool,
        x: f64,
        y: f64,
    },
    CubicBezierTo {
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    },
}

impl PathSegment {
    /// 指令执行后的当前点。
    pub fn end_point(&self) -> Point2 {
        match *self {
            PathSegment::MoveTo { x, y }
            | PathSegment::LineTo { x, y }
            | PathSegment::ArcTo { x, y, .. }
            | PathSegment::CubicBezierTo { x, y, .. } => Point2::new(x, y),
        }
    }

    #[inline]
    pub fn is_move(&self) -> bool {
        matches!(self, PathSegment::MoveTo { .. })
    }

    fn write_data(&self, out: &mut String) {
        use std::fmt::Write;

        // 写入 String 不会失败。
        let _ = match *self {
            PathSegment::MoveTo { x, y } => write!(out, "M {} {}", Num(x), Num(y)),
            PathSegment::LineTo { x, y } => write!(out, "L {} {}", Num(x), Num(y)),
            PathSegment::ArcTo {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep_positive,
                x,
                y,
            } => write!(
                out,
                "A {} {} {} {} {} {} {}",
                Num(rx),
                Num(ry),
                Num(x_axis_rotation),
                u8::from(large_arc),
                u8::from(sweep_positive),
                Num(x),
                Num(y)
            ),
            PathSegment::CubicBezierTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => write!(
                out,
                "C {} {} {} {} {} {}",
                Num(c1x),
                Num(c1y),
                Num(c2x),
                Num(c2y),
                Num(x),
                Num(y)
            ),
        };
    }
}

/// 有序的绘图指令序列，首条指令恒为 `MoveTo`。
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn starting_at(point: Point2) -> Self {
        Self {
            segments: vec![PathSegment::MoveTo {
                x: point.x(),
                y: point.y(),
            }],
        }
    }

    pub fn move_to(&mut self, point: Point2) {
        self.segments.push(PathSegment::MoveTo {
            x: point.x(),
            y: point.y(),
        });
    }

    pub fn line_to(&mut self, point: Point2) {
        self.segments.push(PathSegment::LineTo {
            x: point.x(),
            y: point.y(),
        });
    }

    pub fn arc_to(
        &mut self,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep_positive: bool,
        point: Point2,
    ) {
        self.segments.push(PathSegment::ArcTo {
            rx,
            ry,
            x_axis_rotation,
            large_arc,
            sweep_positive,
            x: point.x(),
            y: point.y(),
        });
    }

    pub fn cubic_to(&mut self, control1: Point2, control2: Point2, point: Point2) {
        self.segments.push(PathSegment::CubicBezierTo {
            c1x: control1.x(),
            c1y: control1.y(),
            c2x: control2.x(),
            c2y: control2.y(),
            x: point.x(),
            y: point.y(),
        });
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current_point(&self) -> Point2 {
        self.segments
            .last()
            .map(PathSegment::end_point)
            .unwrap_or(Point2::new(0.0, 0.0))
    }

    /// SVG `d` 属性文本。
    pub fn to_svg_data(&self) -> String {
        let mut out = String::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                out.push(' ');
            }
            segment.write_data(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_data_uses_formatted_numbers_and_flags() {
        let mut path = Path::starting_at(Point2::new(0.0, 0.0));
        path.line_to(Point2::new(10.0, 0.0));
        path.arc_to(5.0, 5.0, 0.0, false, true, Point2::new(10.0, 10.0));
        path.cubic_to(
            Point2::new(8.0, 12.0),
            Point2::new(2.0, 12.0),
            Point2::new(0.5, 10.0),
        );
        assert_eq!(
            path.to_svg_data(),
            "M 0.0 0.0 L 10.0 0.0 A 5.0 5.0 0.0 0 1 10.0 10.0 C 8.0 12.0 2.0 12.0 0.5 10.0"
        );
        assert_eq!(path.current_point(), Point2::new(0.5, 10.0));
        assert!(path.segments()[0].is_move());
    }
}
