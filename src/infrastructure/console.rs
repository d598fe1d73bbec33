//! 终端输入 - 基础设施层
//!
//! 单键读取只在读取期间进入 raw 模式，批处理运行时终端保持正常模式，
//! 所以运行中的 Ctrl-C 仍然以 SIGINT 的形式到达进程。

use anyhow::{Context, Result};
use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::Write;
use tracing::warn;

/// 一次按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    CtrlC,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        match event.code {
            KeyCode::Char('c') | KeyCode::Char('C')
                if event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Key::CtrlC
            }
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            _ => Key::Other,
        }
    }
}

/// 恢复终端正常模式
///
/// 外部中断落在按键读取期间时，raw 模式不会自己退出。未进入 raw 模式时不做任何事。
pub fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!("⚠️ 恢复终端模式失败: {}", e);
    }
}

/// 交互输入能力
#[async_trait]
pub trait Console: Send {
    /// 读取一个按键
    async fn read_key(&mut self) -> Result<Key>;

    /// 切换到行模式读取一行（不含换行符）
    async fn read_line(&mut self, prompt: &str) -> Result<String>;
}

/// 基于 crossterm 的真实终端
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

fn read_key_blocking() -> Result<Key> {
    enable_raw_mode().context("无法进入 raw 模式")?;
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(Key::from(key)),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    disable_raw_mode().context("无法退出 raw 模式")?;
    result.context("读取按键失败")
}

#[async_trait]
impl Console for TerminalConsole {
    async fn read_key(&mut self) -> Result<Key> {
        tokio::task::spawn_blocking(read_key_blocking)
            .await
            .context("按键读取任务异常退出")?
    }

    async fn read_line(&mut self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut stdout = std::io::stdout();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().read_line(&mut line).context("读取输入失败")?;
            Ok(line.trim_end_matches(['\r', '\n']).to_string())
        })
        .await
        .context("行读取任务异常退出")?
    }
}

/// 预先写好输入序列的控制台
#[cfg(test)]
pub(crate) struct ScriptedConsole {
    keys: std::collections::VecDeque<Key>,
    lines: std::collections::VecDeque<String>,
    pub(crate) prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedConsole {
    pub(crate) fn new(keys: &[Key], lines: &[&str]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            lines: lines.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Console for ScriptedConsole {
    async fn read_key(&mut self) -> Result<Key> {
        // 脚本读完后按退出处理
        Ok(self.keys.pop_front().unwrap_or(Key::Char('q')))
    }

    async fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front().unwrap_or_default())
    }
}
