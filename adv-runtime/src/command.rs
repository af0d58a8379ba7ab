//! # Command 模块
//!
//! 定义脚本中的命令。
//!
//! ## 设计原则
//!
//! - **封闭和类型**：每种命令一个变体，分发器对 [`CommandKind`] 做穷尽匹配，
//!   遗漏的处理器在编译期就会被发现
//! - **不可变**：命令在加载后不再修改，参数中的变量引用在执行时展开
//! - **本地化标签**：带 `locale` 的命令只在当前语言匹配时执行

use serde::{Deserialize, Serialize};

/// 脚本命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// 本地化标签（如 `"en"`），`None` 表示所有语言通用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// 命令类型与参数
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    /// 创建通用命令
    pub fn new(kind: CommandKind) -> Self {
        Self { locale: None, kind }
    }

    /// 创建带本地化标签的命令
    pub fn localized(locale: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            locale: Some(locale.into()),
            kind,
        }
    }

    /// 从作者写法解析本地化前缀
    ///
    /// `+en+Hello` 返回 `(Some("en"), "Hello")`；没有前缀时原样返回。
    pub fn split_locale_prefix(text: &str) -> (Option<&str>, &str) {
        let Some(rest) = text.strip_prefix('+') else {
            return (None, text);
        };
        match rest.find('+') {
            Some(end) if end > 0 && rest[..end].chars().all(|c| c.is_ascii_alphabetic()) => {
                (Some(&rest[..end]), &rest[end + 1..])
            }
            _ => (None, text),
        }
    }

    /// 该命令在指定语言下是否应被跳过
    pub fn is_skipped_for(&self, active_locale: &str) -> bool {
        match &self.locale {
            Some(tag) => !tag.is_empty() && tag != active_locale,
            None => false,
        }
    }
}

/// 命令类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CommandKind {
    /// 标签（无操作）
    Label { name: String },

    /// 旁白消息
    Message { text: String },

    /// 台词（带说话者和可选语音）
    Serif {
        name: String,
        #[serde(default)]
        voice: Option<String>,
        text: String,
    },

    /// 跳转
    Goto { label: String },

    /// 子程序调用
    Gosub {
        label: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// 从子程序返回
    Return,

    /// 变量赋值 `lhs op rhs`
    Set { lhs: String, op: String, rhs: String },

    /// 条件成立时跳转
    If {
        lhs: String,
        op: String,
        rhs: String,
        label: String,
    },

    /// 条件不成立时跳转（`label` 不存在时跳到 `finally`）
    Unless {
        lhs: String,
        op: String,
        rhs: String,
        label: String,
        #[serde(default)]
        finally: String,
    },

    /// 定时等待
    Wait { span: f32 },

    /// 等待点击
    Click,

    /// 背景切换
    Background {
        file: String,
        #[serde(default)]
        span: f32,
        #[serde(default = "default_method")]
        method: String,
    },

    /// 角色立绘切换（`file` 为空表示移除）
    Character {
        position: String,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        span: f32,
        #[serde(default = "default_method")]
        method: String,
    },

    /// 画面震动
    Shake {
        direction: String,
        span: f32,
        times: u32,
        amplitude: i32,
    },

    /// 背景音乐（`file` 为空表示停止）
    Bgm {
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        once: bool,
    },

    /// 音效（`voice` 为真时在语音流播放）
    Se {
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        voice: bool,
    },

    /// 音量变化
    Volume {
        stream: String,
        vol: f32,
        #[serde(default)]
        span: f32,
    },

    /// 章节名
    Chapter { name: String },

    /// 允许/禁止存读档
    SetSave { enabled: bool },

    /// 允许/禁止用户跳过（禁止时进入 non-interruptible 模式）
    Skip { enabled: bool },

    /// 运行 GUI 覆盖层
    Gui {
        file: String,
        #[serde(default)]
        cancelable: bool,
    },
}

fn default_method() -> String {
    "normal".to_string()
}

impl CommandKind {
    /// 命令名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Label { .. } => "label",
            CommandKind::Message { .. } => "message",
            CommandKind::Serif { .. } => "serif",
            CommandKind::Goto { .. } => "goto",
            CommandKind::Gosub { .. } => "gosub",
            CommandKind::Return => "return",
            CommandKind::Set { .. } => "set",
            CommandKind::If { .. } => "if",
            CommandKind::Unless { .. } => "unless",
            CommandKind::Wait { .. } => "wait",
            CommandKind::Click => "click",
            CommandKind::Background { .. } => "bg",
            CommandKind::Character { .. } => "ch",
            CommandKind::Shake { .. } => "shake",
            CommandKind::Bgm { .. } => "bgm",
            CommandKind::Se { .. } => "se",
            CommandKind::Volume { .. } => "vol",
            CommandKind::Chapter { .. } => "chapter",
            CommandKind::SetSave { .. } => "setsave",
            CommandKind::Skip { .. } => "skip",
            CommandKind::Gui { .. } => "gui",
        }
    }

    /// 是否是消息类命令
    pub fn is_message(&self) -> bool {
        matches!(self, CommandKind::Message { .. } | CommandKind::Serif { .. })
    }

    /// 引用的跳转目标标签
    pub fn jump_targets(&self) -> Vec<&str> {
        match self {
            CommandKind::Goto { label } | CommandKind::Gosub { label, .. } => vec![label.as_str()],
            CommandKind::If { label, .. } => vec![label.as_str()],
            CommandKind::Unless { label, finally, .. } => {
                let mut targets = vec![label.as_str()];
                if !finally.is_empty() {
                    targets.push(finally.as_str());
                }
                targets
            }
            _ => Vec::new(),
        }
    }

    /// 引用的资源文件（背景、立绘、音频、语音、GUI）
    ///
    /// 纯色背景 `#RRGGBB` 不算文件。
    pub fn resource_files(&self) -> Vec<&str> {
        match self {
            CommandKind::Background { file, .. } if !file.starts_with('#') => vec![file.as_str()],
            CommandKind::Character { file: Some(file), .. }
            | CommandKind::Bgm { file: Some(file), .. }
            | CommandKind::Se { file: Some(file), .. }
            | CommandKind::Serif {
                voice: Some(file), ..
            }
            | CommandKind::Gui { file, .. } => vec![file.as_str()],
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_prefix() {
        assert_eq!(Command::split_locale_prefix("+en+Hello"), (Some("en"), "Hello"));
        assert_eq!(Command::split_locale_prefix("Hello"), (None, "Hello"));
        assert_eq!(Command::split_locale_prefix("+1+2"), (None, "+1+2"));
        assert_eq!(Command::split_locale_prefix("++x"), (None, "++x"));
    }

    #[test]
    fn test_locale_skip() {
        let cmd = Command::localized("en", CommandKind::Label { name: "a".into() });
        assert!(cmd.is_skipped_for("ja"));
        assert!(!cmd.is_skipped_for("en"));

        let plain = Command::new(CommandKind::Return);
        assert!(!plain.is_skipped_for("ja"));

        let empty = Command::localized("", CommandKind::Return);
        assert!(!empty.is_skipped_for("ja"));
    }

    #[test]
    fn test_json_form() {
        let json = r#"{"cmd":"serif","name":"Alice","text":"Hi","locale":"en"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.locale.as_deref(), Some("en"));
        assert!(matches!(
            cmd.kind,
            CommandKind::Serif { ref name, voice: None, .. } if name == "Alice"
        ));

        let bg: Command = serde_json::from_str(r#"{"cmd":"background","file":"room.png"}"#).unwrap();
        assert!(matches!(
            bg.kind,
            CommandKind::Background { ref method, span, .. } if method == "normal" && span == 0.0
        ));
    }

    #[test]
    fn test_jump_targets() {
        let kind = CommandKind::Unless {
            lhs: "$1".into(),
            op: "==".into(),
            rhs: "0".into(),
            label: "a".into(),
            finally: "b".into(),
        };
        assert_eq!(kind.jump_targets(), vec!["a", "b"]);
        assert!(CommandKind::Return.jump_targets().is_empty());
    }

    #[test]
    fn test_resource_files() {
        let bg = CommandKind::Background {
            file: "#000000".into(),
            span: 0.0,
            method: "normal".into(),
        };
        assert!(bg.resource_files().is_empty());

        let serif = CommandKind::Serif {
            name: "Alice".into(),
            voice: Some("voice/a001.ogg".into()),
            text: "Hi".into(),
        };
        assert_eq!(serif.resource_files(), vec!["voice/a001.ogg"]);

        let stop = CommandKind::Bgm {
            file: None,
            once: false,
        };
        assert!(stop.resource_files().is_empty());
    }
}
