pub mod compositor;
pub mod curve;
pub mod embed;
pub mod format;
pub mod path;
pub mod resolver;
pub mod spline;
pub mod svg;
pub mod transform;

pub use compositor::{ConversionRequest, Converter};
pub use svg::SvgElement;

pub mod errors {
    use thiserror::Error;

    /// 几何输入不合法，转换无法继续。
    #[derive(Debug, Error)]
    pub enum GeometryError {
        #[error("polyline has no vertices")]
        EmptyPolyline,
        #[error("invalid spline: {0}")]
        InvalidSpline(String),
        #[error("image u-vector has zero length")]
        DegenerateImage,
    }

    #[derive(Debug, Error)]
    pub enum ResolveError {
        #[error("failed to read image {path:?}: {source}")]
        Io {
            path: String,
            #[source]
            source: std::io::Error,
        },
        #[error("image {0:?} not found")]
        NotFound(String),
        #[error("{0}")]
        Other(String),
    }

    #[derive(Debug, Error)]
    pub enum ConvertError {
        #[error("malformed geometry in {entity}: {source}")]
        Geometry {
            entity: String,
            #[source]
            source: GeometryError,
        },
        #[error("failed to resolve image {path:?}: {source}")]
        ImageResolution {
            path: String,
            #[source]
            source: ResolveError,
        },
    }
}
