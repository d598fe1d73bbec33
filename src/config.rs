use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 默认配置文件名（可通过 COASTY_CONFIG 覆盖）
const DEFAULT_CONFIG_FILE: &str = "coasty.toml";

/// 程序配置
///
/// 加载顺序：内置默认值 → `coasty.toml`（可选，字段均可省略）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目标应用入口 URL
    pub target_url: String,
    /// 持久化浏览器配置目录（登录状态保存在这里）
    pub profile_dir: String,
    /// 浏览器可执行文件路径，未设置时由 chromiumoxide 自动查找
    pub chrome_executable: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// AI 优化版 PDF 根目录（默认库）
    pub pdf_base_dir: String,
    /// 标准版 PDF 根目录
    pub pdf_standard_dir: String,
    /// 根目录下的子文件夹编号
    pub folders: Vec<String>,
    /// 表格数据源
    pub csv_file: String,
    /// 单条测试所用的 PDF
    pub test_pdf_folder: String,
    pub test_pdf_name: String,
    /// 检查点文件
    pub checkpoint_file: String,
    /// 诊断截图目录
    pub screenshot_dir: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 数字键快速批处理的条数上限，None 表示处理整个文件夹
    pub quick_batch_limit: Option<usize>,
    // --- 超时配置 ---
    /// 每个候选定位器的等待时间
    pub candidate_timeout_ms: u64,
    /// 导航步骤中候选定位器的等待时间
    pub navigation_candidate_timeout_ms: u64,
    /// 文件选择器拦截等待时间
    pub upload_timeout_ms: u64,
    /// 等待"构建中"提示出现的时间
    pub build_appear_timeout_ms: u64,
    /// 等待远端构建完成的时间
    pub build_timeout_secs: u64,
    /// 打开入口页面的导航超时
    pub entry_navigation_timeout_secs: u64,
    // --- 节奏控制 ---
    /// 每个步骤之后的稳定等待
    pub settle_ms: u64,
    /// 条目之间的固定间隔
    pub pacing_ms: u64,
    /// 手动登录后的稳定等待
    pub login_settle_ms: u64,
    /// 轮询页面元素的间隔
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://app.coastapp.com/".to_string(),
            profile_dir: "./browser-session".to_string(),
            chrome_executable: None,
            viewport_width: 1400,
            viewport_height: 750,
            pdf_base_dir: "./subforms_pdf_ai".to_string(),
            pdf_standard_dir: "./subforms_pdf".to_string(),
            folders: (1..=8).map(|n| n.to_string()).collect(),
            csv_file: "checklist.csv".to_string(),
            test_pdf_folder: "2".to_string(),
            test_pdf_name: "2.16-ACCU-Semi-Annual".to_string(),
            checkpoint_file: "batch-progress.json".to_string(),
            screenshot_dir: "screenshots".to_string(),
            output_log_file: "output.txt".to_string(),
            quick_batch_limit: None,
            candidate_timeout_ms: 5_000,
            navigation_candidate_timeout_ms: 10_000,
            upload_timeout_ms: 10_000,
            build_appear_timeout_ms: 10_000,
            build_timeout_secs: 180,
            entry_navigation_timeout_secs: 60,
            settle_ms: 1_000,
            pacing_ms: 2_000,
            login_settle_ms: 2_000,
            poll_interval_ms: 100,
        }
    }
}

impl Config {
    /// 加载完整配置（默认值 → 配置文件 → 环境变量）
    pub fn load() -> Result<Self> {
        let path = std::env::var("COASTY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        if !Path::new(&path).exists() {
            return Ok(Self::from_env());
        }

        let mut config = Self::from_toml_file(Path::new(&path))?;
        config.apply_env();
        Ok(config)
    }

    /// 只从环境变量覆盖默认值
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    fn apply_env(&mut self) {
        set_from_env(&mut self.target_url, "COAST_URL");
        set_from_env(&mut self.profile_dir, "PROFILE_DIR");
        if let Ok(path) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(path);
        }
        set_from_env(&mut self.pdf_base_dir, "PDF_BASE_DIR");
        set_from_env(&mut self.pdf_standard_dir, "PDF_STANDARD_DIR");
        if let Ok(folders) = std::env::var("PDF_FOLDERS") {
            self.folders = folders
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        set_from_env(&mut self.csv_file, "CSV_FILE");
        set_from_env(&mut self.checkpoint_file, "CHECKPOINT_FILE");
        set_from_env(&mut self.screenshot_dir, "SCREENSHOT_DIR");
        set_from_env(&mut self.output_log_file, "OUTPUT_LOG_FILE");
        if let Some(limit) = env_parse("QUICK_BATCH_LIMIT") {
            self.quick_batch_limit = Some(limit);
        }
        set_from_env(&mut self.candidate_timeout_ms, "CANDIDATE_TIMEOUT_MS");
        set_from_env(&mut self.build_timeout_secs, "BUILD_TIMEOUT_SECS");
        set_from_env(&mut self.pacing_ms, "PACING_MS");
        set_from_env(&mut self.settle_ms, "SETTLE_MS");
    }

    pub fn candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.candidate_timeout_ms)
    }

    pub fn navigation_candidate_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_candidate_timeout_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn build_appear_timeout(&self) -> Duration {
        Duration::from_millis(self.build_appear_timeout_ms)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn entry_navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.entry_navigation_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 测试 PDF 的完整路径
    pub fn test_pdf_path(&self) -> PathBuf {
        Path::new(&self.pdf_base_dir)
            .join(&self.test_pdf_folder)
            .join(format!("{}.pdf", self.test_pdf_name))
    }

    /// 所有超时和等待都压到最小，供单元测试使用
    #[cfg(test)]
    pub(crate) fn for_tests(root: &Path) -> Self {
        Self {
            pdf_base_dir: root.join("pdf_ai").to_string_lossy().to_string(),
            pdf_standard_dir: root.join("pdf").to_string_lossy().to_string(),
            csv_file: root.join("checklist.csv").to_string_lossy().to_string(),
            checkpoint_file: root.join("batch-progress.json").to_string_lossy().to_string(),
            screenshot_dir: root.join("screenshots").to_string_lossy().to_string(),
            candidate_timeout_ms: 10,
            navigation_candidate_timeout_ms: 10,
            upload_timeout_ms: 10,
            build_appear_timeout_ms: 10,
            build_timeout_secs: 1,
            entry_navigation_timeout_secs: 1,
            settle_ms: 0,
            pacing_ms: 0,
            login_settle_ms: 0,
            poll_interval_ms: 1,
            ..Self::default()
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn set_from_env<T: FromStr>(field: &mut T, name: &str) {
    if let Some(value) = env_parse(name) {
        *field = value;
    }
}
