use crate::format::format_number;
use crate::svg::SvgElement;
use crate::transform::TransformParameters;

/// 带标识符输出时交给嵌入模板的数据。
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedParameters {
    pub identifier: String,
    /// 按输出顺序排列的图层名。
    pub layers: Vec<String>,
    pub transform: TransformParameters,
}

/// 把生成的 SVG 包装进宿主页面的片段；样式与脚本由模板自行提供。
pub trait EmbedTemplate: Send + Sync {
    fn wrap(&self, svg: SvgElement, params: &EmbedParameters) -> SvgElement;
}

/// 以 `data-*` 属性携带参数的 `<div>` 容器。
#[derive(Debug, Default, Clone, Copy)]
pub struct DataAttributeTemplate;

impl EmbedTemplate for DataAttributeTemplate {
    fn wrap(&self, svg: SvgElement, params: &EmbedParameters) -> SvgElement {
        SvgElement::new("div")
            .attr("id", params.identifier.clone())
            .attr("data-layers", params.layers.join(","))
            .attr("data-pan-x", format_number(params.transform.pan_x))
            .attr("data-pan-y", format_number(params.transform.pan_y))
            .attr("data-scale-x", format_number(params.transform.scale_x))
            .attr("data-scale-y", format_number(params.transform.scale_y))
            .child(svg)
    }
}
