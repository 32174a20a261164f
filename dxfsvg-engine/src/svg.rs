use crate::format::format_number;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// 输出文档的通用元素树：标签、按插入顺序保存的属性与子元素。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SvgElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<SvgElement>,
}

impl SvgElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 设置属性并返回自身；同名属性会被覆盖。
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn num_attr(self, name: impl Into<String>, value: f64) -> Self {
        self.attr(name, format_number(value))
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn child(mut self, child: SvgElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: SvgElement) {
        self.children.push(child);
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    #[inline]
    pub fn children(&self) -> &[SvgElement] {
        &self.children
    }

    /// 深度优先、文档顺序遍历自身及全部后代。
    pub fn descendants(&self) -> Vec<&SvgElement> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    pub fn find_all(&self, tag: &str) -> Vec<&SvgElement> {
        self.descendants()
            .into_iter()
            .filter(|element| element.tag == tag)
            .collect()
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out, 0);
        out
    }

    fn write_xml(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />\n");
            return;
        }
        out.push_str(">\n");
        for child in &self.children {
            child.write_xml(out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push_str(">\n");
    }
}

fn escape_into(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
