//! 图像引用解析。转换过程只依赖 [`ImageResolver`]，字节读取由调用方注入。

use std::future::Future;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::trace;

use crate::errors::ResolveError;

/// 把图元中的图像路径解析为可写入 `href` 的字符串。
pub trait ImageResolver: Send + Sync {
    fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ResolveError>>;
}

/// 原样返回路径。
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl ImageResolver for IdentityResolver {
    fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ResolveError>> {
        futures::future::ready(Ok(path.to_string())).boxed()
    }
}

/// 读取图像字节。闭包 `Fn(String) -> impl Future<Output = Result<Vec<u8>, ResolveError>>` 自动实现。
pub trait ByteFetcher: Send + Sync {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ResolveError>>;
}

impl<F, Fut> ByteFetcher for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>, ResolveError>> + Send + 'static,
{
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ResolveError>> {
        (self)(path.to_string()).boxed()
    }
}

/// 读取字节后编码为 `data:<mime>;base64,...`。
pub struct DataUriResolver<F> {
    fetcher: F,
}

impl<F: ByteFetcher> DataUriResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: ByteFetcher> ImageResolver for DataUriResolver<F> {
    fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ResolveError>> {
        async move {
            let bytes = self.fetcher.fetch(path).await?;
            trace!(path, bytes = bytes.len(), "图像已编码为 data URI");
            Ok(data_uri(path, &bytes))
        }
        .boxed()
    }
}

/// 按扩展名（不区分大小写）推断 MIME 类型。
pub fn mime_type(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "image/unknown",
    }
}

pub fn data_uri(path: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes))
}
