use std::path::PathBuf;

use dxfsvg_engine::errors::ConvertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("读取图纸文件 {path:?} 失败: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析图纸文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("转换失败: {0}")]
    Convert(#[from] ConvertError),
    #[error("写入 SVG 到 {target} 失败: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
}
