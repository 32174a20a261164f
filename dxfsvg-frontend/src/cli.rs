use std::path::PathBuf;

use dxfsvg_config::AppConfig;
use dxfsvg_core::geometry::Rect;
use dxfsvg_engine::{ConversionRequest, Converter};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{DrawingSource, load_or_demo};
use crate::resource_locator::{ImageLocator, data_uri_resolver};

/// 命令行传入的转换选项；未给出的项取配置值。
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub layers: usize,
    pub entities: usize,
    pub bytes: usize,
}

/// 加载图纸、转换并写出 SVG 文本。
pub async fn run_conversion(
    config: &AppConfig,
    options: &ConvertOptions,
) -> Result<ConversionSummary, FrontendError> {
    let loaded = load_or_demo(options.input.as_deref()).await?;
    let drawing = &loaded.drawing;

    let viewport = Rect::new(
        0.0,
        0.0,
        config.output.viewport_width,
        config.output.viewport_height,
    );
    let drawing_rect = match loaded.extents.or_else(|| drawing.extents_rect()) {
        Some(rect) => rect,
        None => {
            warn!("图纸没有可计算范围的几何，使用视口作为图纸范围");
            viewport
        }
    };

    let mut converter = Converter::new().center_drawing(config.output.center_drawing);
    if config.resources.embed_images {
        let locator = ImageLocator::from_config(loaded.base_dir(), config);
        converter = converter.with_resolver(data_uri_resolver(locator));
    }

    let identifier = options
        .identifier
        .as_deref()
        .or(config.output.identifier.as_deref());
    let mut request = ConversionRequest::new(drawing, drawing_rect, viewport);
    if let Some(identifier) = identifier {
        request = request.with_identifier(identifier);
    }

    let document = converter.convert(&request).await?.to_xml_string();
    write_output(options.output.as_ref(), document.as_bytes()).await?;

    let summary = ConversionSummary {
        layers: drawing.layers().count(),
        entities: drawing.entities().count(),
        bytes: document.len(),
    };
    let source = match &loaded.source {
        DrawingSource::Json(path) => path.display().to_string(),
        DrawingSource::Demo => "demo".to_string(),
    };
    info!(
        source,
        layers = summary.layers,
        entities = summary.entities,
        bytes = summary.bytes,
        "SVG 转换完成"
    );
    Ok(summary)
}

async fn write_output(target: Option<&PathBuf>, bytes: &[u8]) -> Result<(), FrontendError> {
    match target {
        Some(path) => tokio::fs::write(path, bytes)
            .await
            .map_err(|source| FrontendError::Write {
                target: path.display().to_string(),
                source,
            }),
        None => {
            let mut stdout = tokio::io::stdout();
            let result = match stdout.write_all(bytes).await {
                Ok(()) => stdout.flush().await,
                Err(err) => Err(err),
            };
            result.map_err(|source| FrontendError::Write {
                target: "stdout".to_string(),
                source,
            })
        }
    }
}
