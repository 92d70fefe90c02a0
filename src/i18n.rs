// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持西班牙语（默认）和英文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 产品默认语言
pub const DEFAULT_LOCALE: &str = "es";

/// 设置默认语言（进程启动时调用一次）
pub fn init() {
    rust_i18n::set_locale(DEFAULT_LOCALE);
}

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"es" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use forge_core::i18n::t;
/// let msg = t("quote.validation.no_items");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use forge_core::i18n::t_with_args;
/// let msg = t_with_args("alerts.unassigned_orders.title", &[("count", "3")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key).to_string(), args)
}

/// 按指定语言翻译（不修改全局语言）
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn interpolate(mut result: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // rust-i18n 的 locale 为全局状态；本模块测试只写入默认语言，
    // 其他语言通过 t_in 显式指定，避免与并行测试互相干扰。

    #[test]
    fn test_init_sets_spanish() {
        init();
        assert_eq!(current_locale(), DEFAULT_LOCALE);
        assert!(t("quote.validation.no_items").contains("al menos un item"));
    }

    #[test]
    fn test_translate_in_english() {
        let msg = t_in("en", "quote.validation.no_items", &[]);
        assert!(msg.contains("at least one service item"));
    }

    #[test]
    fn test_translate_with_args() {
        init();
        let msg = t_with_args("alerts.unassigned_orders.title", &[("count", "3")]);
        assert_eq!(msg, "Órdenes Sin Asignar: 3");

        let msg = t_in("en", "alerts.more_suffix", &[("count", "2")]);
        assert_eq!(msg, " and 2 more");
    }
}
