use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dxfsvg_config::AppConfig;
use dxfsvg_engine::errors::ResolveError;
use dxfsvg_engine::resolver::{DataUriResolver, ImageResolver};
use tracing::{debug, trace};

const IMAGE_ROOTS_ENV: &str = "DXFSVG_IMAGE_ROOTS";

/// 在图纸目录、配置目录与环境变量目录中查找图像文件。
#[derive(Debug, Clone, Default)]
pub struct ImageLocator {
    search_roots: Vec<PathBuf>,
}

impl ImageLocator {
    pub fn from_config(base_dir: Option<&Path>, config: &AppConfig) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        if let Some(dir) = base_dir {
            roots.push(dir.to_path_buf());
        }

        roots.extend(
            config
                .resources
                .image_roots
                .iter()
                .filter(|path| path.is_dir())
                .cloned(),
        );

        if let Some(env_paths) = env::var_os(IMAGE_ROOTS_ENV) {
            roots.extend(env::split_paths(&env_paths).filter(|path| path.is_dir()));
        }

        Self::with_roots(roots)
    }

    /// 去重，保持靠前优先级。
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_roots: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !search_roots.contains(&root) {
                search_roots.push(root);
            }
        }
        Self { search_roots }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn resolve(&self, path_str: &str) -> Option<PathBuf> {
        let raw_path = Path::new(path_str);
        if raw_path.is_absolute() {
            if raw_path.exists() {
                return Some(raw_path.to_path_buf());
            }
            debug!(path = %raw_path.display(), "图像路径为绝对路径但未找到对应文件");
            return None;
        }

        self.search_roots.iter().find_map(|root| {
            let candidate = root.join(raw_path);
            trace!(candidate = %candidate.display(), "图像候选路径");
            candidate.exists().then_some(candidate)
        })
    }

    /// 定位并读取图像字节。
    pub async fn read_image(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        let located = self
            .resolve(path)
            .ok_or_else(|| ResolveError::NotFound(path.to_string()))?;
        tokio::fs::read(&located)
            .await
            .map_err(|source| ResolveError::Io {
                path: located.display().to_string(),
                source,
            })
    }
}

/// 以定位器读取字节并编码为 data URI 的解析器。
pub fn data_uri_resolver(locator: ImageLocator) -> impl ImageResolver {
    let locator = Arc::new(locator);
    DataUriResolver::new(move |path: String| {
        let locator = Arc::clone(&locator);
        async move { locator.read_image(&path).await }
    })
}
