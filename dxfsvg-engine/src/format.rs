use std::fmt;

/// 小数位上限，超出部分四舍五入。
const MAX_FRACTION_DIGITS: usize = 15;

/// 以 `.` 为小数点输出实数，去掉末尾多余的 0 但至少保留一位小数。
///
/// Rust 的格式化不受区域设置影响，因此输出在任何主机上都一致：
/// `3.0 -> "3.0"`，`0.5 -> "0.5"`，`-0.0 -> "0.0"`。
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let mut text = format!("{value:.prec$}", prec = MAX_FRACTION_DIGITS);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.push('0');
    }
    if text == "-0.0" {
        text.remove(0);
    }
    text
}

/// 便于在 `format!` 中直接使用的包装。
#[derive(Debug, Clone, Copy)]
pub struct Num(pub f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_number(self.0))
    }
}
