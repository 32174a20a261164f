pub mod cli;
pub mod errors;
pub mod loader;
pub mod resource_locator;

pub use cli::{ConversionSummary, ConvertOptions};

use dxfsvg_config::AppConfig;
use errors::FrontendError;
use tracing::info;

/// 执行一次命令行转换。
pub async fn run_cli(config: &AppConfig, options: &ConvertOptions) -> Result<ConversionSummary, FrontendError> {
    info!(
        input = ?options.input,
        output = ?options.output,
        "启动 SVG 转换"
    );
    cli::run_conversion(config, options).await
}
