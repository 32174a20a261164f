use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use dxfsvg_core::color::Color;
use dxfsvg_core::drawing::{Drawing, Entity, EntityKind, Insert, Layer, PolylineVertex};
use dxfsvg_core::geometry::{Point2, Rect, Vector2};
use serde::Deserialize;
use tracing::info;

use crate::errors::FrontendError;

/// 图纸来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum DrawingSource {
    Json(PathBuf),
    Demo,
}

/// 加载后的图纸及其元信息。
#[derive(Debug)]
pub struct LoadedDrawing {
    pub drawing: Drawing,
    /// 文件中显式给出的图纸范围。
    pub extents: Option<Rect>,
    pub source: DrawingSource,
}

impl LoadedDrawing {
    /// 图像相对路径的基准目录。
    pub fn base_dir(&self) -> Option<&Path> {
        match &self.source {
            DrawingSource::Json(path) => path.parent(),
            DrawingSource::Demo => None,
        }
    }
}

/// 磁盘上的图纸 JSON：图层表、按文档顺序排列的图元与可选范围。
#[derive(Debug, Deserialize)]
struct DrawingFile {
    #[serde(default)]
    layers: Vec<Layer>,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    extents: Option<Rect>,
}

pub fn parse_drawing(text: &str) -> Result<(Drawing, Option<Rect>), serde_json::Error> {
    let file: DrawingFile = serde_json::from_str(text)?;
    let mut drawing = Drawing::new();
    for layer in file.layers {
        drawing.add_layer(layer);
    }
    for entity in file.entities {
        drawing.add_entity(entity);
    }
    Ok((drawing, file.extents))
}

pub async fn load_drawing(path: &Path) -> Result<LoadedDrawing, FrontendError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FrontendError::Load {
            path: path.to_path_buf(),
            source,
        })?;
    let (drawing, extents) = parse_drawing(&text).map_err(|source| FrontendError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        layers = drawing.layers().count(),
        entities = drawing.entities().count(),
        "从 JSON 加载图纸成功"
    );
    Ok(LoadedDrawing {
        drawing,
        extents,
        source: DrawingSource::Json(path.to_path_buf()),
    })
}

/// 指定路径时读取 JSON 图纸，否则构建内置示例。
pub async fn load_or_demo(path: Option<&Path>) -> Result<LoadedDrawing, FrontendError> {
    match path {
        Some(path) => load_drawing(path).await,
        None => {
            info!("未指定输入文件，使用内置示例图纸");
            Ok(LoadedDrawing {
                drawing: demo_drawing(),
                extents: None,
                source: DrawingSource::Demo,
            })
        }
    }
}

/// 覆盖每种几何类型的示例图纸。
pub fn demo_drawing() -> Drawing {
    let mut drawing = Drawing::new();
    drawing.add_layer(Layer::with_color("walls", Color::Index(1)));
    drawing.add_layer(Layer::with_color("fixtures", Color::Index(5)));
    drawing.add_layer(Layer::new("annotations"));

    drawing.add_polyline(
        [
            PolylineVertex::new(Point2::new(0.0, 0.0)),
            PolylineVertex::new(Point2::new(40.0, 0.0)),
            PolylineVertex::with_bulge(Point2::new(40.0, 20.0), 0.5),
            PolylineVertex::new(Point2::new(0.0, 20.0)),
        ],
        true,
        "walls",
    );
    drawing.add_line(Point2::new(20.0, 0.0), Point2::new(20.0, 20.0), "walls");
    drawing.add_arc(Point2::new(10.0, 10.0), 4.0, 0.0, 270.0, "fixtures");
    drawing.add_ellipse(
        Point2::new(30.0, 10.0),
        Vector2::new(5.0, 2.0),
        0.5,
        0.0,
        2.0 * PI,
        "fixtures",
    );
    drawing.add_spline(
        3,
        vec![
            Point2::new(2.0, 25.0),
            Point2::new(10.0, 32.0),
            Point2::new(20.0, 22.0),
            Point2::new(30.0, 32.0),
            Point2::new(38.0, 25.0),
        ],
        vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0],
        "annotations",
    );

    let bolt = vec![
        Entity::new(
            "0",
            EntityKind::Circle(dxfsvg_core::drawing::Circle {
                center: Point2::new(0.0, 0.0),
                radius: 1.0,
                thickness: 0.0,
            }),
        ),
        Entity::new(
            "0",
            EntityKind::Line(dxfsvg_core::drawing::Line {
                start: Point2::new(-1.0, 0.0),
                end: Point2::new(1.0, 0.0),
                thickness: 0.0,
            }),
        )
        .with_color(Color::Index(3)),
    ];
    let mut insert = Insert::new("BOLT", Point2::new(5.0, 5.0), bolt);
    insert.x_scale = 1.5;
    insert.y_scale = 1.5;
    insert.rotation = 45.0;
    drawing.add_insert(insert, "fixtures");

    drawing.add_entity(Entity::new(
        "annotations",
        EntityKind::Unsupported {
            type_name: "MTEXT".to_string(),
        },
    ));
    drawing
}
