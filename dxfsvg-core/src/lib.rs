pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于主轴、图像 U/V 方向等。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        /// 逆时针旋转 90° 得到的垂直向量。
        #[inline]
        pub fn perp(self) -> Self {
            Self(self.0.perp())
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维点，仅用于带标高的多段线顶点，进入编译器前会被压平。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 投影到 XY 平面。
        #[inline]
        pub fn flatten(self) -> Point2 {
            Point2::new(self.x(), self.y())
        }
    }

    /// 轴对齐边界框，用于估算图纸范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point2::from_vec(self.min.as_vec2().min(point.as_vec2()));
            self.max = Point2::from_vec(self.max.as_vec2().max(point.as_vec2()));
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 四个角点，按 左下、右下、右上、左上 排列。
        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }
    }

    /// 以左下角加宽高描述的矩形，图纸范围与视口共用这一表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Rect {
        pub left: f64,
        pub bottom: f64,
        pub width: f64,
        pub height: f64,
    }

    impl Rect {
        #[inline]
        pub fn new(left: f64, bottom: f64, width: f64, height: f64) -> Self {
            Self {
                left,
                bottom,
                width,
                height,
            }
        }

        pub fn from_bounds(bounds: &Bounds2D) -> Self {
            let min = bounds.min();
            let max = bounds.max();
            Self::new(min.x(), min.y(), max.x() - min.x(), max.y() - min.y())
        }

        #[inline]
        pub fn has_area(&self) -> bool {
            self.width.abs() > f64::EPSILON && self.height.abs() > f64::EPSILON
        }
    }
}

pub mod color {
    use serde::{Deserialize, Serialize};

    /// 24 位 RGB 颜色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rgb {
        pub r: u8,
        pub g: u8,
        pub b: u8,
    }

    impl Rgb {
        pub const BLACK: Rgb = Rgb::new(0, 0, 0);

        #[inline]
        pub const fn new(r: u8, g: u8, b: u8) -> Self {
            Self { r, g, b }
        }

        #[inline]
        pub const fn from_u32(value: u32) -> Self {
            Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
        }

        /// `#rrggbb` 形式，供 SVG 属性使用。
        pub fn to_hex(self) -> String {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }

    /// 实体或图层上的颜色定义。`ByLayer`/`ByBlock` 表示元素本身未指定颜色。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Color {
        #[default]
        ByLayer,
        ByBlock,
        Index(u8),
        Rgb(Rgb),
    }

    impl Color {
        pub fn resolve(&self, palette: &dyn ColorPalette) -> Option<Rgb> {
            match self {
                Color::ByLayer | Color::ByBlock => None,
                Color::Index(index) => palette.rgb(*index),
                Color::Rgb(rgb) => Some(*rgb),
            }
        }
    }

    /// 颜色索引到 RGB 的查表接口，由调用方提供完整色表。
    pub trait ColorPalette: Send + Sync {
        fn rgb(&self, index: u8) -> Option<Rgb>;
    }

    /// 内置的基础 ACI 色表，只覆盖常用索引；7 号（白/黑）按白底渲染为黑色。
    #[derive(Debug, Default, Clone, Copy)]
    pub struct StandardPalette;

    impl ColorPalette for StandardPalette {
        fn rgb(&self, index: u8) -> Option<Rgb> {
            let value = match index {
                1 => 0xFF0000,
                2 => 0xFFFF00,
                3 => 0x00FF00,
                4 => 0x00FFFF,
                5 => 0x0000FF,
                6 => 0xFF00FF,
                7 => 0x000000,
                8 => 0x808080,
                9 => 0xC0C0C0,
                250 => 0x333333,
                251 => 0x505050,
                252 => 0x696969,
                253 => 0x828282,
                254 => 0xBEBEBE,
                255 => 0xFFFFFF,
                _ => return None,
            };
            Some(Rgb::from_u32(value))
        }
    }
}

pub mod drawing {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::color::Color;
    use crate::geometry::{Bounds2D, Point2, Point3, Rect, Vector2};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub color: Option<Color>,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: None,
            }
        }

        #[inline]
        pub fn with_color(name: impl Into<String>, color: Color) -> Self {
            Self {
                name: name.into(),
                color: Some(color),
            }
        }
    }

    /// 图元：所在图层、自身颜色与几何描述。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Entity {
        pub layer: String,
        #[serde(default)]
        pub color: Color,
        pub geometry: EntityKind,
    }

    impl Entity {
        #[inline]
        pub fn new(layer: impl Into<String>, geometry: EntityKind) -> Self {
            Self {
                layer: layer.into(),
                color: Color::ByLayer,
                geometry,
            }
        }

        #[inline]
        pub fn with_color(mut self, color: Color) -> Self {
            self.color = color;
            self
        }

        #[inline]
        pub fn is_image(&self) -> bool {
            matches!(self.geometry, EntityKind::Image(_))
        }

        /// 计算图元的 2D 轴对齐范围；块参照会递归包含子图元。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match &self.geometry {
                EntityKind::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                EntityKind::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                EntityKind::Arc(arc) => {
                    arc_bounds(
                        arc.center,
                        arc.radius,
                        arc.start_angle.to_radians(),
                        arc.end_angle.to_radians(),
                        &mut bounds,
                    );
                }
                EntityKind::Ellipse(ellipse) => ellipse_bounds(ellipse, &mut bounds),
                EntityKind::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                    for (start, end) in polyline.edges() {
                        bulge_bounds(start.position, end.position, start.bulge, &mut bounds);
                    }
                }
                EntityKind::Spline(spline) => {
                    for point in &spline.control_points {
                        bounds.include_point(*point);
                    }
                }
                EntityKind::Image(image) => {
                    for corner in image.corners() {
                        bounds.include_point(corner);
                    }
                }
                EntityKind::Insert(insert) => {
                    let mut local = Bounds2D::empty();
                    for child in &insert.children {
                        if let Some(child_bounds) = child.bounds() {
                            local.include_bounds(&child_bounds);
                        }
                    }
                    if local.is_empty() {
                        bounds.include_point(insert.location);
                    } else {
                        for corner in local.corners() {
                            bounds.include_point(insert.to_parent(corner));
                        }
                    }
                }
                EntityKind::Unsupported { .. } => {}
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    /// 几何描述的封闭集合。`Unsupported` 代表来源格式中编译器不认识的类型。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum EntityKind {
        Arc(Arc),
        Circle(Circle),
        Ellipse(Ellipse),
        Line(Line),
        Polyline(Polyline),
        Image(Image),
        Insert(Insert),
        Spline(Spline),
        Unsupported { type_name: String },
    }

    impl EntityKind {
        pub fn type_name(&self) -> &str {
            match self {
                EntityKind::Arc(_) => "ARC",
                EntityKind::Circle(_) => "CIRCLE",
                EntityKind::Ellipse(_) => "ELLIPSE",
                EntityKind::Line(_) => "LINE",
                EntityKind::Polyline(_) => "POLYLINE",
                EntityKind::Image(_) => "IMAGE",
                EntityKind::Insert(_) => "INSERT",
                EntityKind::Spline(_) => "SPLINE",
                EntityKind::Unsupported { type_name } => type_name,
            }
        }
    }

    /// 圆弧，角度以度为单位，遵循数学正方向。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        #[serde(default)]
        pub thickness: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        #[serde(default)]
        pub thickness: f64,
    }

    /// 椭圆，记录主轴向量、短长轴比与参数范围（弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
    }

    impl Ellipse {
        /// 短轴向量：主轴逆时针旋转 90° 后乘以比例。
        #[inline]
        pub fn minor_axis(&self) -> Vector2 {
            Vector2::from(self.major_axis.as_vec2().perp() * self.ratio)
        }

        pub fn point_at(&self, parameter: f64) -> Point2 {
            let offset = self.major_axis.as_vec2() * parameter.cos()
                + self.minor_axis().as_vec2() * parameter.sin();
            self.center.translate(Vector2::from(offset))
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        #[serde(default)]
        pub thickness: f64,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        #[serde(default)]
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 带标高的三维多段线顶点（POLYLINE/VERTEX）。
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct PolylineVertex3 {
        pub position: Point3,
        #[serde(default)]
        pub bulge: f64,
    }

    /// 多段线，二维与带标高两种来源统一为 `(x, y, bulge)` 顶点。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
    }

    impl Polyline {
        pub fn new(vertices: Vec<PolylineVertex>, is_closed: bool) -> Self {
            Self {
                vertices,
                is_closed,
            }
        }

        pub fn from_3d_vertices<I>(vertices: I, is_closed: bool) -> Self
        where
            I: IntoIterator<Item = PolylineVertex3>,
        {
            let vertices = vertices
                .into_iter()
                .map(|vertex| PolylineVertex::with_bulge(vertex.position.flatten(), vertex.bulge))
                .collect();
            Self::new(vertices, is_closed)
        }

        /// 依次返回每条边的起止顶点；闭合时追加尾首相连的一条边。
        pub fn edges(&self) -> impl Iterator<Item = (PolylineVertex, PolylineVertex)> + '_ {
            let closing = match (self.is_closed, self.vertices.first(), self.vertices.last()) {
                (true, Some(first), Some(last)) => Some((*last, *first)),
                _ => None,
            };
            self.vertices
                .windows(2)
                .map(|pair| (pair[0], pair[1]))
                .chain(closing)
        }
    }

    /// 光栅图像，`u_vector`/`v_vector` 为单个像素在图纸中的方向与尺寸。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Image {
        pub location: Point2,
        pub u_vector: Vector2,
        pub v_vector: Vector2,
        pub image_size: Vector2,
        pub file_path: String,
    }

    impl Image {
        pub fn corners(&self) -> [Point2; 4] {
            let u = self.u_vector.as_vec2() * self.image_size.x();
            let v = self.v_vector.as_vec2() * self.image_size.y();
            let origin = self.location.as_vec2();
            [
                Point2::from_vec(origin),
                Point2::from_vec(origin + u),
                Point2::from_vec(origin + u + v),
                Point2::from_vec(origin + v),
            ]
        }
    }

    /// 块参照。子图元在块的局部坐标中定义，先缩放、再旋转、最后平移到插入点。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Insert {
        pub name: String,
        pub location: Point2,
        #[serde(default = "Insert::unit_scale")]
        pub x_scale: f64,
        #[serde(default = "Insert::unit_scale")]
        pub y_scale: f64,
        #[serde(default)]
        pub rotation: f64,
        #[serde(default)]
        pub children: Vec<Entity>,
    }

    impl Insert {
        fn unit_scale() -> f64 {
            1.0
        }

        pub fn new(name: impl Into<String>, location: Point2, children: Vec<Entity>) -> Self {
            Self {
                name: name.into(),
                location,
                x_scale: 1.0,
                y_scale: 1.0,
                rotation: 0.0,
                children,
            }
        }

        /// 将块局部坐标映射到父坐标系。
        pub fn to_parent(&self, point: Point2) -> Point2 {
            let scaled = DVec2::new(point.x() * self.x_scale, point.y() * self.y_scale);
            let rotated = DVec2::from_angle(self.rotation.to_radians()).rotate(scaled);
            Point2::from_vec(self.location.as_vec2() + rotated)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub control_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
    }

    /// 只读的图纸模型：图层表与按文档顺序排列的图元。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Drawing {
        layers: Vec<Layer>,
        entities: Vec<(EntityId, Entity)>,
        #[serde(default)]
        next_entity_id: u64,
    }

    impl Drawing {
        pub fn new() -> Self {
            let mut drawing = Self::default();
            drawing.ensure_layer("0");
            drawing
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            if self.layer(key).is_none() {
                self.layers.push(Layer::new(key));
            }
        }

        /// 添加或替换同名图层。
        pub fn add_layer(&mut self, layer: Layer) {
            match self.layers.iter_mut().find(|existing| existing.name == layer.name) {
                Some(existing) => *existing = layer,
                None => self.layers.push(layer),
            }
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(&entity.layer);
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        pub fn add_line(&mut self, start: Point2, end: Point2, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::new(
                layer,
                EntityKind::Line(Line {
                    start,
                    end,
                    thickness: 0.0,
                }),
            ))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::new(
                layer,
                EntityKind::Circle(Circle {
                    center,
                    radius,
                    thickness: 0.0,
                }),
            ))
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::new(
                layer,
                EntityKind::Arc(Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    thickness: 0.0,
                }),
            ))
        }

        pub fn add_ellipse(
            &mut self,
            center: Point2,
            major_axis: Vector2,
            ratio: f64,
            start_parameter: f64,
            end_parameter: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::new(
                layer,
                EntityKind::Ellipse(Ellipse {
                    center,
                    major_axis,
                    ratio,
                    start_parameter,
                    end_parameter,
                }),
            ))
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            let polyline = Polyline::new(vertices.into_iter().collect(), is_closed);
            self.add_entity(Entity::new(layer, EntityKind::Polyline(polyline)))
        }

        pub fn add_spline(
            &mut self,
            degree: i32,
            control_points: Vec<Point2>,
            knot_values: Vec<f64>,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::new(
                layer,
                EntityKind::Spline(Spline {
                    degree,
                    control_points,
                    knot_values,
                }),
            ))
        }

        pub fn add_image(&mut self, image: Image, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::new(layer, EntityKind::Image(image)))
        }

        pub fn add_insert(&mut self, insert: Insert, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::new(layer, EntityKind::Insert(insert)))
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.iter().find(|layer| layer.name == name)
        }

        /// 按图层名升序返回图层。
        pub fn layers_sorted(&self) -> Vec<&Layer> {
            let mut layers: Vec<&Layer> = self.layers.iter().collect();
            layers.sort_by(|a, b| a.name.cmp(&b.name));
            layers
        }

        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        /// 指定图层上的图元，保持文档顺序。
        pub fn entities_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a (EntityId, Entity)> {
            self.entities
                .iter()
                .filter(move |(_, entity)| entity.layer == layer)
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        pub fn extents(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// 图纸范围矩形，无几何时返回 `None`。
        pub fn extents_rect(&self) -> Option<Rect> {
            self.extents().map(|bounds| Rect::from_bounds(&bounds))
        }

        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        angle.rem_euclid(TAU)
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
    }

    fn arc_bounds(center: Point2, radius: f64, start: f64, end: f64, bounds: &mut Bounds2D) {
        let radius = radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(center);
            return;
        }

        let (start, end) = canonical_interval(start, end);
        bounds.include_point(arc_point(center, radius, start));
        bounds.include_point(arc_point(center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(center, radius, candidate));
            }
        }
    }

    fn ellipse_bounds(ellipse: &Ellipse, bounds: &mut Bounds2D) {
        if ellipse.major_axis.length() <= f64::EPSILON {
            bounds.include_point(ellipse.center);
            return;
        }

        let start = ellipse.start_parameter;
        let mut end = ellipse.end_parameter;
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else {
            while end < start {
                end += TAU;
            }
        }
        let span = end - start;
        let step_count = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            bounds.include_point(ellipse.point_at(t));
        }
    }

    /// 凸度弧段的范围：先求圆心，再按圆弧象限极值包含。
    fn bulge_bounds(start: Point2, end: Point2, bulge: f64, bounds: &mut Bounds2D) {
        if bulge.abs() <= 1e-9 {
            return;
        }
        let chord = end.as_vec2() - start.as_vec2();
        let chord_len = chord.length();
        if chord_len <= f64::EPSILON {
            return;
        }

        let theta = 4.0 * bulge.atan();
        let radius = chord_len / (2.0 * (theta / 2.0).sin());
        let midpoint = (start.as_vec2() + end.as_vec2()) * 0.5;
        // 圆心到弦中点的有符号距离。
        let apothem = radius * (theta / 2.0).cos();
        let center = midpoint + chord.perp() / chord_len * apothem;

        let start_dir = start.as_vec2() - center;
        let start_angle = start_dir.y.atan2(start_dir.x);
        let (from, to) = if theta > 0.0 {
            (start_angle, start_angle + theta)
        } else {
            (start_angle + theta, start_angle)
        };
        arc_bounds(Point2::from_vec(center), radius, from, to, bounds);
    }

}
