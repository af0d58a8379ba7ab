//! # Cursor 模块
//!
//! 脚本游标：当前命令索引 + 子程序调用栈。
//!
//! ## 不变量
//!
//! `command_index` 始终位于 `[0, command_count)`。执行完最后一条命令后，
//! 游标停留在最后一条命令上并标记为 `ended`，由游戏循环结束运行。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScriptError;
use crate::script::Script;

/// 最多支持的调用参数个数（`&1`..`&9`）
pub const CALL_ARGS: usize = 9;

/// 子程序返回点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPoint {
    /// 返回后执行的命令索引
    pub index: usize,
    /// 调用前的参数（返回时恢复）
    #[serde(default)]
    pub saved_args: Vec<String>,
}

/// 脚本游标
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptCursor {
    command_index: usize,
    call_return_stack: Vec<ReturnPoint>,
    #[serde(default)]
    call_args: Vec<String>,
    #[serde(default)]
    ended: bool,
}

impl ScriptCursor {
    /// 创建位于脚本开头的游标
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前命令索引
    pub fn index(&self) -> usize {
        self.command_index
    }

    /// 是否已越过最后一条命令
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// 调用栈深度
    pub fn depth(&self) -> usize {
        self.call_return_stack.len()
    }

    /// 调用参数 `&n`（从 0 开始）
    pub fn call_arg(&self, index: usize) -> &str {
        self.call_args.get(index).map(String::as_str).unwrap_or("")
    }

    /// 前进到下一条命令
    pub fn move_to_next(&mut self, script: &Script) {
        if self.command_index + 1 >= script.len() {
            debug!(index = self.command_index, "到达脚本末尾");
            self.ended = true;
        } else {
            self.command_index += 1;
        }
    }

    /// 跳转到标签
    pub fn move_to_label(&mut self, script: &Script, label: &str) -> Result<(), ScriptError> {
        let index = script
            .find_label(label)
            .ok_or_else(|| ScriptError::LabelNotFound {
                label: label.to_string(),
            })?;
        debug!(label, index, "跳转到标签");
        self.jump_to(index);
        Ok(())
    }

    /// 跳转到 `label`，不存在时跳转到 `finally`
    pub fn move_to_label_finally(
        &mut self,
        script: &Script,
        label: &str,
        finally: &str,
    ) -> Result<(), ScriptError> {
        if script.find_label(label).is_some() || finally.is_empty() {
            self.move_to_label(script, label)
        } else {
            self.move_to_label(script, finally)
        }
    }

    /// 直接跳转到索引（调用者保证范围）
    pub fn jump_to(&mut self, index: usize) {
        self.command_index = index;
        self.ended = false;
    }

    /// 记录返回点为下一条命令，并设置新的调用参数
    pub fn push_return_point(&mut self, args: &[String]) {
        let saved_args = std::mem::take(&mut self.call_args);
        self.call_return_stack.push(ReturnPoint {
            index: self.command_index + 1,
            saved_args,
        });
        self.call_args = args.iter().take(CALL_ARGS).cloned().collect();
    }

    /// 记录返回点为当前命令（返回后重新执行当前命令）
    ///
    /// 用于消息框系统菜单中的自定义子程序。
    pub fn push_return_point_here(&mut self) {
        self.call_return_stack.push(ReturnPoint {
            index: self.command_index,
            saved_args: self.call_args.clone(),
        });
    }

    /// 弹出返回点并跳转
    pub fn pop_return_point(&mut self, script: &Script) -> Result<(), ScriptError> {
        let point = self
            .call_return_stack
            .pop()
            .ok_or(ScriptError::EmptyReturnStack)?;
        self.call_args = point.saved_args;
        if point.index >= script.len() {
            self.command_index = script.len().saturating_sub(1);
            self.ended = true;
        } else {
            self.jump_to(point.index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind};

    fn script() -> Script {
        Script::new(
            "main",
            vec![
                Command::new(CommandKind::Gosub {
                    label: "sub".into(),
                    args: vec!["x".into()],
                }),
                Command::new(CommandKind::Label { name: "end".into() }),
                Command::new(CommandKind::Label { name: "sub".into() }),
                Command::new(CommandKind::Return),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_advance_until_end() {
        let script = script();
        let mut cursor = ScriptCursor::new();
        for _ in 0..3 {
            cursor.move_to_next(&script);
        }
        assert_eq!(cursor.index(), 3);
        assert!(!cursor.is_ended());

        cursor.move_to_next(&script);
        assert_eq!(cursor.index(), 3);
        assert!(cursor.is_ended());
    }

    #[test]
    fn test_gosub_return() {
        let script = script();
        let mut cursor = ScriptCursor::new();

        cursor.push_return_point(&["x".to_string()]);
        cursor.move_to_label(&script, "sub").unwrap();
        assert_eq!(cursor.index(), 2);
        assert_eq!(cursor.call_arg(0), "x");
        assert_eq!(cursor.depth(), 1);

        cursor.pop_return_point(&script).unwrap();
        assert_eq!(cursor.index(), 1);
        assert_eq!(cursor.call_arg(0), "");
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn test_return_without_gosub() {
        let script = script();
        let mut cursor = ScriptCursor::new();
        assert_eq!(
            cursor.pop_return_point(&script),
            Err(ScriptError::EmptyReturnStack)
        );
    }

    #[test]
    fn test_return_here() {
        let script = script();
        let mut cursor = ScriptCursor::new();
        cursor.jump_to(1);
        cursor.push_return_point_here();
        cursor.move_to_label(&script, "sub").unwrap();
        cursor.pop_return_point(&script).unwrap();
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn test_label_finally() {
        let script = script();
        let mut cursor = ScriptCursor::new();
        cursor
            .move_to_label_finally(&script, "missing", "end")
            .unwrap();
        assert_eq!(cursor.index(), 1);
        assert!(cursor.move_to_label(&script, "missing").is_err());
    }
}
