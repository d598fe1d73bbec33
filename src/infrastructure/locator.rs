//! 元素定位描述 - 基础设施层
//!
//! 页面样式类名随前端发版漂移，所以每个控件都用一条"候选谓词链"描述，
//! 按声明顺序逐个尝试，第一个可见的命中即为结果。

use std::fmt;

/// 单个元素定位谓词
///
/// 由 CSS 选择器加可选的文本过滤组成，语义与常见的 `:has-text()` 一致：
/// 文本匹配不区分大小写、按子串匹配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    css: String,
    text: Option<String>,
    descendant_text: Option<String>,
    ancestor: usize,
}

impl Predicate {
    /// 以 CSS 选择器创建
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            css: selector.into(),
            text: None,
            descendant_text: None,
            ancestor: 0,
        }
    }

    /// 按 `data-testid` 属性创建
    pub fn test_id(id: &str) -> Self {
        Self::css(format!("[data-testid=\"{}\"]", id))
    }

    /// 要求元素自身文本包含 `text`
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// 要求某个后代元素的文本包含 `text`
    pub fn with_descendant_text(mut self, text: impl Into<String>) -> Self {
        self.descendant_text = Some(text.into());
        self
    }

    /// 命中后向上取第 `levels` 层父元素作为最终目标
    pub fn ancestor(mut self, levels: usize) -> Self {
        self.ancestor = levels;
        self
    }

    pub fn css_selector(&self) -> &str {
        &self.css
    }

    /// 生成定位脚本
    ///
    /// 脚本找到第一个可见命中后给目标元素打上唯一的 `data-coasty-ref` 标记，
    /// 返回 `{ "ref": "<标记>" }`，未命中时返回 `{ "ref": null }`。
    pub fn resolve_script(&self) -> String {
        format!(
            r#"
            (() => {{
                {matcher}
                const el = __coastyFind();
                if (!el) return {{ ref: null }};
                let target = el;
                for (let i = 0; i < {ancestor} && target.parentElement; i++) {{
                    target = target.parentElement;
                }}
                window.__coastyRefSeq = (window.__coastyRefSeq || 0) + 1;
                const id = 'coasty-' + window.__coastyRefSeq;
                target.setAttribute('{attr}', id);
                return {{ ref: id }};
            }})()
            "#,
            matcher = self.matcher_script(),
            ancestor = self.ancestor,
            attr = REF_ATTRIBUTE,
        )
    }

    /// 生成可见性检测脚本，返回 `{ "visible": bool }`
    pub fn visibility_script(&self) -> String {
        format!(
            r#"
            (() => {{
                {matcher}
                return {{ visible: __coastyFind() !== null }};
            }})()
            "#,
            matcher = self.matcher_script(),
        )
    }

    fn matcher_script(&self) -> String {
        format!(
            r#"
                const __css = {css};
                const __text = {text};
                const __descendant = {descendant};
                const __norm = (s) => (s || '').toLowerCase();
                const __visible = (el) => {{
                    const rect = el.getBoundingClientRect();
                    const style = window.getComputedStyle(el);
                    return rect.width > 0 && rect.height > 0
                        && style.visibility !== 'hidden' && style.display !== 'none';
                }};
                const __coastyFind = () => {{
                    for (const el of document.querySelectorAll(__css)) {{
                        if (__text !== null && !__norm(el.innerText || el.textContent).includes(__norm(__text))) continue;
                        if (__descendant !== null && !Array.from(el.querySelectorAll('*'))
                            .some((c) => __norm(c.textContent).includes(__norm(__descendant)))) continue;
                        if (!__visible(el)) continue;
                        return el;
                    }}
                    return null;
                }};
            "#,
            css = js_string(&self.css),
            text = js_optional(self.text.as_deref()),
            descendant = js_optional(self.descendant_text.as_deref()),
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.text {
            write!(f, ":has-text(\"{}\")", text)?;
        }
        if let Some(text) = &self.descendant_text {
            write!(f, ":has(text=\"{}\")", text)?;
        }
        if self.ancestor > 0 {
            write!(f, " >> parent×{}", self.ancestor)?;
        }
        Ok(())
    }
}

/// 定位脚本写入的标记属性名
pub const REF_ATTRIBUTE: &str = "data-coasty-ref";

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn js_optional(value: Option<&str>) -> String {
    value.map(js_string).unwrap_or_else(|| "null".to_string())
}

/// 候选项：谓词 + 日志中使用的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub predicate: Predicate,
    pub description: String,
}

/// 某个 UI 控件的有序候选链
///
/// 构造时必须给出第一个候选，因此链永远非空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSpec {
    name: String,
    candidates: Vec<Candidate>,
}

impl LocatorSpec {
    /// 以第一个候选创建
    pub fn new(name: impl Into<String>, first: Predicate) -> Self {
        Self {
            name: name.into(),
            candidates: vec![describe(first)],
        }
    }

    /// 追加一个后备候选
    pub fn or(mut self, predicate: Predicate) -> Self {
        self.candidates.push(describe(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

fn describe(predicate: Predicate) -> Candidate {
    Candidate {
        description: predicate.to_string(),
        predicate,
    }
}
