// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和法文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "fr"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数，当前语言）
///
/// # 示例
/// ```no_run
/// use model_repository::i18n::t;
/// let msg = t("error.errorDatabase.DB_NOT_CONNECTED");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，当前语言）
///
/// # 示例
/// ```no_run
/// use model_repository::i18n::t_with_args;
/// let msg = t_with_args("error.errorDatabase.MODEL_NOT_FOUND", &[("tableName", "users")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    interpolate(rust_i18n::t!(key).to_string(), args)
}

/// 翻译消息（带参数，指定语言）
///
/// 不修改全局语言设置；空字符串回退到默认语言 "en"。
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    let locale = if locale.trim().is_empty() { "en" } else { locale };
    interpolate(rust_i18n::t!(key, locale = locale).to_string(), args)
}

fn interpolate(mut message: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        message = message.replace(&placeholder, v);
    }
    message
}
