use chromiumoxide::error::CdpError;
use thiserror::Error;

/// 自动化错误类型
///
/// 按失败的"可恢复程度"划分：只有导航超时是非致命的，
/// 其余错误都会终止当前条目，由批处理层记录为失败后继续下一条。
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 所有候选定位器都未命中（页面结构很可能已变化）
    #[error("步骤 [{step}] 未找到元素: 已尝试 {tried} 个候选定位器")]
    LocatorExhausted { step: String, tried: usize },

    /// 页面导航超时（非致命，页面可能已基本加载）
    #[error("导航到 {url} 超时 ({secs} 秒)")]
    NavigationTimeout { url: String, secs: u64 },

    /// 文件选择器拦截或文件赋值失败
    #[error("PDF 上传失败: {reason}")]
    UploadFailure { reason: String },

    /// 远端异步构建在时限内未完成
    #[error("表单构建超时: 等待 {secs} 秒后仍未完成")]
    BuildTimeout { secs: u64 },

    /// 页面内脚本或协议命令返回的错误（执行上下文被销毁、节点已分离等）
    #[error("{0}")]
    Page(String),

    /// 自动化层抛出的其他错误（原样保留消息），如浏览器已关闭、连接断开、请求超时
    #[error("{0}")]
    Unknown(String),
}

impl AutomationError {
    /// 是否终止当前条目
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AutomationError::NavigationTimeout { .. })
    }

    /// 轮询等待时是否可以忽略并继续
    ///
    /// 只有页面内的错误是暂时的；连接层的错误说明浏览器已不可用。
    pub fn is_transient(&self) -> bool {
        matches!(self, AutomationError::Page(_))
    }

    /// 创建上传失败错误
    pub fn upload_failed(reason: impl Into<String>) -> Self {
        AutomationError::UploadFailure {
            reason: reason.into(),
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<CdpError> for AutomationError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Chrome(_)
            | CdpError::ChromeMessage(_)
            | CdpError::JavascriptException(_)
            | CdpError::NotFound
            | CdpError::FrameNotFound(_)
            | CdpError::ScrollingFailed(_)
            | CdpError::Serde(_) => AutomationError::Page(err.to_string()),
            other => AutomationError::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Page(format!("JSON 解析失败: {}", err))
    }
}

// ========== Result 类型别名 ==========

/// 自动化操作结果类型
pub type AutomationResult<T> = Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_navigation_timeout_is_non_fatal() {
        let nav = AutomationError::NavigationTimeout {
            url: "https://app.coastapp.com/".to_string(),
            secs: 60,
        };
        assert!(!nav.is_fatal());
        assert!(AutomationError::upload_failed("x").is_fatal());
        assert!(AutomationError::BuildTimeout { secs: 180 }.is_fatal());
        assert!(AutomationError::Unknown("boom".to_string()).is_fatal());
    }

    #[test]
    fn test_cdp_errors_split_into_page_and_connection_failures() {
        let context_lost: AutomationError =
            CdpError::ChromeMessage("Execution context was destroyed.".to_string()).into();
        assert!(context_lost.is_transient());
        assert!(context_lost.is_fatal());
        assert_eq!(context_lost.to_string(), "Execution context was destroyed.");

        let timed_out: AutomationError = CdpError::Timeout.into();
        assert!(matches!(timed_out, AutomationError::Unknown(_)));
        assert!(!timed_out.is_transient());
        assert_eq!(timed_out.to_string(), "Request timed out.");

        let no_response: AutomationError = CdpError::NoResponse.into();
        assert!(!no_response.is_transient());

        let decode: AutomationError = serde_json::from_str::<bool>("null").unwrap_err().into();
        assert!(decode.is_transient());
    }

    #[test]
    fn test_unknown_keeps_message_verbatim() {
        let err = AutomationError::Unknown("Node is detached from document".to_string());
        assert_eq!(err.to_string(), "Node is detached from document");
    }
}
