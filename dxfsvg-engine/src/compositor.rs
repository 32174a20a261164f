//! 场景合成：按图层分组、排序图元、解析颜色，并把图像解析与组装分开。
//!
//! 转换分三步：先生成带图像槽位的计划树（槽位按文档顺序编号），
//! 再并发解析全部图像，最后按计划顺序组装。输出顺序只取决于文档顺序。

use std::sync::Arc;

use dxfsvg_core::color::{Color, ColorPalette, Rgb, StandardPalette};
use dxfsvg_core::drawing::{Drawing, Entity, EntityKind};
use dxfsvg_core::geometry::Rect;
use futures::future::try_join_all;
use tracing::{debug, trace, warn};

use crate::curve::{self, CompiledShape, ImagePlacement};
use crate::embed::{DataAttributeTemplate, EmbedParameters, EmbedTemplate};
use crate::errors::{ConvertError, GeometryError};
use crate::format::Num;
use crate::resolver::{IdentityResolver, ImageResolver};
use crate::svg::{SVG_NAMESPACE, SvgElement};
use crate::transform::ViewTransform;

/// 单次转换的输入。
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest<'a> {
    pub drawing: &'a Drawing,
    pub drawing_rect: Rect,
    pub viewport: Rect,
    pub identifier: Option<&'a str>,
}

impl<'a> ConversionRequest<'a> {
    pub fn new(drawing: &'a Drawing, drawing_rect: Rect, viewport: Rect) -> Self {
        Self {
            drawing,
            drawing_rect,
            viewport,
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: &'a str) -> Self {
        self.identifier = Some(identifier);
        self
    }
}

/// 图纸到 SVG 的转换器，持有色表、图像解析器与嵌入模板。
#[derive(Clone)]
pub struct Converter {
    palette: Arc<dyn ColorPalette>,
    resolver: Arc<dyn ImageResolver>,
    template: Arc<dyn EmbedTemplate>,
    center_drawing: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    pub fn new() -> Self {
        Self {
            palette: Arc::new(StandardPalette),
            resolver: Arc::new(IdentityResolver),
            template: Arc::new(DataAttributeTemplate),
            center_drawing: false,
        }
    }

    pub fn with_palette(mut self, palette: impl ColorPalette + 'static) -> Self {
        self.palette = Arc::new(palette);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ImageResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_template(mut self, template: impl EmbedTemplate + 'static) -> Self {
        self.template = Arc::new(template);
        self
    }

    pub fn center_drawing(mut self, enabled: bool) -> Self {
        self.center_drawing = enabled;
        self
    }

    pub async fn convert(&self, request: &ConversionRequest<'_>) -> Result<SvgElement, ConvertError> {
        let mut transform = ViewTransform::fit(request.drawing_rect, request.viewport);
        if self.center_drawing {
            transform = transform.centered();
        }

        let plan = self.plan(request.drawing)?;
        debug!(
            layers = plan.layers.len(),
            images = plan.images.len(),
            scale = transform.scale(),
            "场景计划已生成"
        );

        let hrefs = self.resolve_images(&plan.images).await?;
        let content: Vec<SvgElement> = plan
            .nodes
            .into_iter()
            .map(|node| node.assemble(&hrefs))
            .collect();

        let viewport = request.viewport;
        let svg = SvgElement::new("svg")
            .attr("xmlns", SVG_NAMESPACE)
            .attr("version", "1.1")
            .num_attr("width", viewport.width)
            .num_attr("height", viewport.height)
            .attr(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    Num(viewport.left),
                    Num(viewport.bottom),
                    Num(viewport.width),
                    Num(viewport.height)
                ),
            )
            .child(transform.wrap(content));

        Ok(match request.identifier {
            Some(identifier) => {
                let params = EmbedParameters {
                    identifier: identifier.to_string(),
                    layers: plan.layers,
                    transform: transform.parameters(),
                };
                self.template.wrap(svg, &params)
            }
            None => svg,
        })
    }

    async fn resolve_images(&self, paths: &[String]) -> Result<Vec<String>, ConvertError> {
        let resolver = self.resolver.as_ref();
        try_join_all(paths.iter().enumerate().map(|(slot, path)| async move {
            let href = resolver
                .resolve(path)
                .await
                .map_err(|source| ConvertError::ImageResolution {
                    path: path.clone(),
                    source,
                })?;
            trace!(slot, path = path.as_str(), "图像已解析");
            Ok::<_, ConvertError>(href)
        }))
        .await
    }

    fn plan(&self, drawing: &Drawing) -> Result<ScenePlan, ConvertError> {
        for (id, entity) in drawing.entities() {
            if drawing.layer(&entity.layer).is_none() {
                warn!(
                    entity = id.get(),
                    layer = entity.layer.as_str(),
                    "图元引用了不存在的图层，已跳过"
                );
            }
        }

        let layers = drawing.layers_sorted();
        let mut planner = Planner {
            drawing,
            palette: self.palette.as_ref(),
            images: Vec::new(),
        };
        let mut nodes = Vec::new();

        for layer in &layers {
            let mut children = Vec::new();
            for (_, entity) in drawing.entities_on(&layer.name).filter(|(_, e)| e.is_image()) {
                children.extend(planner.entity(entity, &layer.name)?);
            }
            if !children.is_empty() {
                nodes.push(PlanNode::Group {
                    element: planner.layer_group(&layer.name),
                    children,
                });
            }
        }

        for layer in &layers {
            let mut children = Vec::new();
            for (_, entity) in drawing.entities_on(&layer.name).filter(|(_, e)| !e.is_image()) {
                children.extend(planner.entity(entity, &layer.name)?);
            }
            debug!(
                layer = layer.name.as_str(),
                elements = children.len(),
                "图层分组完成"
            );
            nodes.push(PlanNode::Group {
                element: planner.layer_group(&layer.name),
                children,
            });
        }

        Ok(ScenePlan {
            nodes,
            images: planner.images,
            layers: layers.iter().map(|layer| layer.name.clone()).collect(),
        })
    }
}

struct ScenePlan {
    nodes: Vec<PlanNode>,
    /// 图像槽位，下标即槽位编号。
    images: Vec<String>,
    layers: Vec<String>,
}

enum PlanNode {
    Element(SvgElement),
    Image { slot: usize, placement: ImagePlacement },
    Group { element: SvgElement, children: Vec<PlanNode> },
}

impl PlanNode {
    fn assemble(self, hrefs: &[String]) -> SvgElement {
        match self {
            PlanNode::Element(element) => element,
            PlanNode::Image { slot, placement } => SvgElement::new("image")
                .attr("transform", placement.transform())
                .num_attr("width", placement.width)
                .num_attr("height", placement.height)
                .attr("href", hrefs.get(slot).cloned().unwrap_or_default())
                .attr("preserveAspectRatio", "none"),
            PlanNode::Group {
                mut element,
                children,
            } => {
                for child in children {
                    element.push(child.assemble(hrefs));
                }
                element
            }
        }
    }
}

struct Planner<'a> {
    drawing: &'a Drawing,
    palette: &'a dyn ColorPalette,
    images: Vec<String>,
}

impl Planner<'_> {
    fn layer_color(&self, name: &str) -> Rgb {
        self.drawing
            .layer(name)
            .and_then(|layer| layer.color)
            .and_then(|color| color.resolve(self.palette))
            .unwrap_or(Rgb::BLACK)
    }

    fn layer_group(&self, name: &str) -> SvgElement {
        let color = self.layer_color(name).to_hex();
        SvgElement::new("g")
            .attr("class", name)
            .attr("stroke", color.clone())
            .attr("fill", color)
    }

    /// 图元的显式描边色；随层且图层与所在组不同时取该图层颜色。
    fn stroke_override(&self, entity: &Entity, group_layer: &str) -> Option<Rgb> {
        match entity.color {
            Color::ByLayer if entity.layer != group_layer => Some(self.layer_color(&entity.layer)),
            color => color.resolve(self.palette),
        }
    }

    fn entity(&mut self, entity: &Entity, group_layer: &str) -> Result<Option<PlanNode>, ConvertError> {
        let geometry_error = |source: GeometryError| ConvertError::Geometry {
            entity: entity.geometry.type_name().to_string(),
            source,
        };

        let node = match &entity.geometry {
            EntityKind::Arc(arc) => stroked(curve::compile_arc(arc), arc.thickness),
            EntityKind::Circle(circle) => stroked(curve::compile_circle(circle), circle.thickness),
            EntityKind::Ellipse(ellipse) => stroked(curve::compile_ellipse(ellipse), 0.0),
            EntityKind::Line(line) => stroked(curve::compile_line(line), line.thickness),
            EntityKind::Polyline(polyline) => {
                let path = curve::compile_polyline(polyline).map_err(geometry_error)?;
                stroked(CompiledShape::Path(path), 0.0)
            }
            EntityKind::Spline(spline) => {
                let path = curve::compile_spline(spline).map_err(geometry_error)?;
                stroked(CompiledShape::Path(path), 0.0)
            }
            EntityKind::Image(image) => {
                let placement = curve::image_placement(image).map_err(geometry_error)?;
                let slot = self.images.len();
                self.images.push(image.file_path.clone());
                return Ok(Some(PlanNode::Image { slot, placement }));
            }
            EntityKind::Insert(insert) => {
                let mut children = Vec::with_capacity(insert.children.len());
                for child in &insert.children {
                    children.extend(self.entity(child, &entity.layer)?);
                }
                let mut element = SvgElement::new("g")
                    .attr("data-block", insert.name.as_str())
                    .attr("transform", curve::insert_transform(insert));
                if let Some(color) = self.stroke_override(entity, group_layer) {
                    element.set_attr("stroke", color.to_hex());
                }
                return Ok(Some(PlanNode::Group { element, children }));
            }
            EntityKind::Unsupported { type_name } => {
                debug!(
                    kind = type_name.as_str(),
                    layer = entity.layer.as_str(),
                    "跳过不支持的图元"
                );
                return Ok(None);
            }
        };

        let node = match self.stroke_override(entity, group_layer) {
            Some(color) => node.attr("stroke", color.to_hex()),
            None => node,
        };
        Ok(Some(PlanNode::Element(node)))
    }
}

/// 描边图形的公共属性。
fn stroked(shape: CompiledShape, thickness: f64) -> SvgElement {
    shape
        .into_element()
        .attr("fill", "none")
        .num_attr("stroke-width", thickness.max(1.0))
        .attr("vector-effect", "non-scaling-stroke")
}

#[cfg(test)]
mod tests {
    use dxfsvg_core::drawing::{Insert, Layer, PolylineVertex};
    use dxfsvg_core::geometry::Point2;

    use super::*;

    fn square_request(drawing: &Drawing) -> ConversionRequest<'_> {
        ConversionRequest::new(
            drawing,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
    }

    #[tokio::test]
    async fn explicit_color_overrides_layer_color() {
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::with_color("walls", Color::Index(1)));
        drawing.add_entity(
            Entity::new(
                "walls",
                EntityKind::Line(dxfsvg_core::drawing::Line {
                    start: Point2::new(0.0, 0.0),
                    end: Point2::new(1.0, 0.0),
                    thickness: 3.0,
                }),
            )
            .with_color(Color::Index(5)),
        );
        drawing.add_line(Point2::new(0.0, 1.0), Point2::new(1.0, 1.0), "walls");

        let svg = Converter::new()
            .convert(&square_request(&drawing))
            .await
            .expect("conversion");
        let group = svg
            .find_all("g")
            .into_iter()
            .find(|g| g.get_attr("class") == Some("walls"))
            .expect("walls group");
        assert_eq!(group.get_attr("stroke"), Some("#ff0000"));
        let lines = group.find_all("line");
        assert_eq!(lines[0].get_attr("stroke"), Some("#0000ff"));
        assert_eq!(lines[0].get_attr("stroke-width"), Some("3.0"));
        assert_eq!(lines[1].get_attr("stroke"), None);
        assert_eq!(lines[1].get_attr("stroke-width"), Some("1.0"));
        assert_eq!(lines[1].get_attr("fill"), Some("none"));
        assert_eq!(lines[1].get_attr("vector-effect"), Some("non-scaling-stroke"));
    }

    #[tokio::test]
    async fn insert_children_are_nested_and_recolored_by_their_layer() {
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::with_color("red", Color::Index(1)));
        let child = Entity::new(
            "red",
            EntityKind::Circle(dxfsvg_core::drawing::Circle {
                center: Point2::new(0.0, 0.0),
                radius: 1.0,
                thickness: 0.0,
            }),
        );
        let mut insert = Insert::new("BOLT", Point2::new(4.0, 4.0), vec![child]);
        insert.x_scale = 2.0;
        drawing.add_insert(insert, "0");

        let svg = Converter::new()
            .convert(&square_request(&drawing))
            .await
            .expect("conversion");
        let block = svg
            .find_all("g")
            .into_iter()
            .find(|g| g.get_attr("data-block") == Some("BOLT"))
            .expect("insert group");
        assert_eq!(
            block.get_attr("transform"),
            Some("translate(4.0 4.0) scale(2.0 1.0)")
        );
        let circle = &block.children()[0];
        assert_eq!(circle.tag(), "circle");
        assert_eq!(circle.get_attr("stroke"), Some("#ff0000"));
    }

    #[tokio::test]
    async fn block_named_like_a_layer_does_not_take_its_class() {
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::with_color("doors", Color::Index(5)));
        drawing.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "doors");
        let child = Entity::new(
            "0",
            EntityKind::Line(dxfsvg_core::drawing::Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(1.0, 0.0),
                thickness: 0.0,
            }),
        );
        drawing.add_insert(Insert::new("doors", Point2::new(2.0, 2.0), vec![child]), "0");

        let svg = Converter::new()
            .convert(&square_request(&drawing))
            .await
            .expect("conversion");
        let classed: Vec<_> = svg
            .find_all("g")
            .into_iter()
            .filter(|g| g.get_attr("class") == Some("doors"))
            .collect();
        assert_eq!(classed.len(), 1);
        assert_eq!(classed[0].get_attr("stroke"), Some("#0000ff"));

        let block = svg
            .find_all("g")
            .into_iter()
            .find(|g| g.get_attr("data-block") == Some("doors"))
            .expect("insert group");
        assert_eq!(block.get_attr("class"), None);
    }

    #[tokio::test]
    async fn unsupported_entities_are_skipped() {
        let mut drawing = Drawing::new();
        drawing.add_entity(Entity::new(
            "0",
            EntityKind::Unsupported {
                type_name: "MTEXT".to_string(),
            },
        ));
        let svg = Converter::new()
            .convert(&square_request(&drawing))
            .await
            .expect("conversion");
        let group = svg
            .find_all("g")
            .into_iter()
            .find(|g| g.get_attr("class") == Some("0"))
            .expect("layer group");
        assert!(group.children().is_empty());
    }

    #[tokio::test]
    async fn malformed_polyline_fails_conversion() {
        let mut drawing = Drawing::new();
        drawing.add_polyline(Vec::<PolylineVertex>::new(), false, "0");
        let result = Converter::new().convert(&square_request(&drawing)).await;
        assert!(matches!(
            result,
            Err(ConvertError::Geometry {
                source: GeometryError::EmptyPolyline,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn entities_on_unknown_layers_are_skipped() {
        let drawing: Drawing = serde_json::from_value(serde_json::json!({
            "layers": [{ "name": "0" }],
            "entities": [
                [0, { "layer": "ghost", "geometry": { "kind": "line", "start": [0.0, 0.0], "end": [1.0, 1.0] } }],
                [1, { "layer": "0", "geometry": { "kind": "line", "start": [0.0, 0.0], "end": [2.0, 2.0] } }]
            ]
        }))
        .expect("drawing json");
        let svg = Converter::new()
            .convert(&square_request(&drawing))
            .await
            .expect("conversion");
        assert_eq!(svg.find_all("line").len(), 1);
        assert!(
            svg.find_all("g")
                .iter()
                .all(|g| g.get_attr("class") != Some("ghost"))
        );
    }
}
