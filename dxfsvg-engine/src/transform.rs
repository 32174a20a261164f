//! 图纸坐标到视口坐标的变换栈。
//!
//! 由外到内依次为：Y 轴翻转、平移（pan）、等比缩放、图纸原点偏移。
//! 块参照的局部变换嵌套在最内层组之下。

use dxfsvg_core::geometry::{Point2, Rect};
use glam::DVec2;
use tracing::warn;

use crate::format::Num;
use crate::svg::SvgElement;

/// 交给嵌入模板的四个初始变换参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParameters {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    drawing: Rect,
    viewport: Rect,
    pan: DVec2,
    scale: f64,
}

impl ViewTransform {
    /// 适配视口的变换，初始 pan 为零。
    pub fn fit(drawing: Rect, viewport: Rect) -> Self {
        Self {
            drawing,
            viewport,
            pan: DVec2::ZERO,
            scale: fit_scale(&drawing, &viewport),
        }
    }

    /// 把缩放后的图纸在留白方向上居中。
    pub fn centered(mut self) -> Self {
        let slack = DVec2::new(
            self.viewport.width - self.drawing.width * self.scale,
            self.viewport.height - self.drawing.height * self.scale,
        );
        self.pan = slack / 2.0;
        self
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn pan(&self) -> DVec2 {
        self.pan
    }

    #[inline]
    pub fn drawing(&self) -> Rect {
        self.drawing
    }

    #[inline]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn parameters(&self) -> TransformParameters {
        TransformParameters {
            pan_x: self.pan.x,
            pan_y: self.pan.y,
            scale_x: self.scale,
            scale_y: self.scale,
        }
    }

    /// 把图纸坐标映射到输出坐标，与 [`ViewTransform::wrap`] 生成的组嵌套等价。
    pub fn apply(&self, point: Point2) -> Point2 {
        let origin = DVec2::new(self.drawing.left, self.drawing.bottom);
        let scaled = (point.as_vec2() - origin) * self.scale + self.pan;
        Point2::new(scaled.x, self.viewport.height - scaled.y)
    }

    /// 生成四层嵌套的变换组，`children` 放在最内层。
    pub fn wrap(&self, children: Vec<SvgElement>) -> SvgElement {
        let mut offset = SvgElement::new("g").attr(
            "transform",
            format!(
                "translate({} {})",
                Num(-self.drawing.left),
                Num(-self.drawing.bottom)
            ),
        );
        for child in children {
            offset.push(child);
        }

        let scale = SvgElement::new("g")
            .attr(
                "transform",
                format!("scale({} {})", Num(self.scale), Num(self.scale)),
            )
            .child(offset);

        let pan = SvgElement::new("g")
            .attr(
                "transform",
                format!("translate({} {})", Num(self.pan.x), Num(self.pan.y)),
            )
            .child(scale);

        SvgElement::new("g")
            .attr(
                "transform",
                format!(
                    "translate({} {}) scale({} {})",
                    Num(0.0),
                    Num(self.viewport.height),
                    Num(1.0),
                    Num(-1.0)
                ),
            )
            .child(pan)
    }
}

/// 等比适配比例：视口比图纸“更窄”时按宽度适配，否则按高度适配。
pub fn fit_scale(drawing: &Rect, viewport: &Rect) -> f64 {
    if !drawing.has_area() || !viewport.has_area() {
        warn!(?drawing, ?viewport, "矩形面积为零，缩放比例回退为 1");
        return 1.0;
    }
    if viewport.width / viewport.height < drawing.width / drawing.height {
        viewport.width / drawing.width
    } else {
        viewport.height / drawing.height
    }
}
