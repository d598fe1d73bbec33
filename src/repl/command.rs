//! 按键到命令的映射
//!
//! `F` / `R` 是前缀键：只对紧接着的一个按键有效，
//! 下一个按键不是文件夹编号时前缀失效，该按键按普通命令解释。

use crate::infrastructure::Key;

/// PDF 库
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Library {
    /// AI 优化版（默认）
    Ai,
    Standard,
}

/// 两键命令的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    FullBatch,
    Resume,
}

/// 解析完成的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 上传测试 PDF
    TestItem,
    /// 按名称上传单个 PDF
    ByName(Library),
    /// 文件夹快速批处理
    QuickBatch(String),
    /// 整个文件夹（需确认）
    FullBatch(String),
    /// 续传（需确认）
    Resume(String),
    /// 表格批处理
    CsvBatch,
    Status,
    ClearCheckpoint,
    Reload,
    Quit,
}

/// 一次按键的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    /// 已记录前缀，等待文件夹编号
    AwaitingFolder(Prefix),
    Ignored,
}

/// 带前缀槽的按键解析器
#[derive(Debug)]
pub struct CommandParser {
    folders: Vec<String>,
    pending: Option<Prefix>,
}

impl CommandParser {
    pub fn new(folders: Vec<String>) -> Self {
        Self {
            folders,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<Prefix> {
        self.pending
    }

    /// 解析一个按键
    pub fn feed(&mut self, key: Key) -> Parsed {
        if let Some(prefix) = self.pending.take() {
            if let Some(folder) = self.folder_of(key) {
                return Parsed::Command(match prefix {
                    Prefix::FullBatch => Command::FullBatch(folder),
                    Prefix::Resume => Command::Resume(folder),
                });
            }
        }

        let c = match key {
            Key::CtrlC => return Parsed::Command(Command::Quit),
            Key::Char(c) => c,
            Key::Enter | Key::Other => return Parsed::Ignored,
        };

        let command = match c {
            'c' => Command::TestItem,
            'p' => Command::ByName(Library::Ai),
            'a' => Command::ByName(Library::Standard),
            'b' => Command::CsvBatch,
            's' => Command::Status,
            'x' => Command::ClearCheckpoint,
            'r' => Command::Reload,
            'q' => Command::Quit,
            'F' => return self.arm(Prefix::FullBatch),
            'R' => return self.arm(Prefix::Resume),
            _ => match self.folder_of(key) {
                Some(folder) => Command::QuickBatch(folder),
                None => return Parsed::Ignored,
            },
        };
        Parsed::Command(command)
    }

    fn arm(&mut self, prefix: Prefix) -> Parsed {
        self.pending = Some(prefix);
        Parsed::AwaitingFolder(prefix)
    }

    fn folder_of(&self, key: Key) -> Option<String> {
        let Key::Char(c) = key else {
            return None;
        };
        let id = c.to_string();
        self.folders.contains(&id).then_some(id)
    }
}
