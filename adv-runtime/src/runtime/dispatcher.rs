//! # Dispatcher 模块
//!
//! 按游标取命令并交给处理器，维护跨帧执行（repetition）协议。
//!
//! ## 协议
//!
//! ```text
//! dispatch ──► 语言不匹配？──► 跳过，同帧继续
//!    │
//!    ├─ 单帧命令 ──► Done { cont }
//!    │
//!    └─ 跨帧命令 ──► start ──► step ... step ──► stop（处理器移动游标）
//!                      └──── 游标冻结 ────┘
//! ```
//!
//! repetition 运行期间游标不允许移动；违反时返回
//! [`RuntimeError::RepetitionViolation`]。

use tracing::debug;

use crate::error::RuntimeError;
use crate::message::MessageState;
use crate::platform::{OverlayKind, Platform};
use crate::runtime::Session;

use super::handlers::{self, ActiveCommand, Handled, OverlayRequest, StepStatus};

/// 跨帧执行标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repetition {
    running: Option<usize>,
}

impl Repetition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// 冻结的命令索引
    pub fn index(&self) -> Option<usize> {
        self.running
    }

    /// 开始跨帧执行
    ///
    /// 已在运行时是引擎缺陷。
    pub fn start(&mut self, index: usize) -> Result<(), RuntimeError> {
        debug_assert!(self.running.is_none(), "repetition 重复开始");
        if let Some(running) = self.running {
            return Err(RuntimeError::RepetitionViolation {
                message: format!("命令 {running} 运行中又开始命令 {index}"),
            });
        }
        debug!(index, "repetition 开始");
        self.running = Some(index);
        Ok(())
    }

    /// 结束跨帧执行，返回冻结的索引
    pub fn stop(&mut self) -> Result<usize, RuntimeError> {
        let index = self
            .running
            .take()
            .ok_or_else(|| RuntimeError::RepetitionViolation {
                message: "没有运行中的 repetition".to_string(),
            })?;
        debug!(index, "repetition 结束");
        Ok(index)
    }

    /// 检查游标仍停在冻结的命令上
    pub fn check(&self, cursor_index: usize) -> Result<(), RuntimeError> {
        match self.running {
            Some(index) if index != cursor_index => Err(RuntimeError::RepetitionViolation {
                message: format!("repetition 期间游标从 {index} 移动到 {cursor_index}"),
            }),
            _ => Ok(()),
        }
    }

    /// 读档后清除
    pub fn reset(&mut self) {
        self.running = None;
    }
}

/// 一次分发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// `true` 表示在同一帧继续分发下一条命令
    Continue(bool),
    /// 需要进入覆盖层
    Overlay(OverlayRequest),
    /// 快速读档完成
    Loaded,
}

/// 命令分发器
#[derive(Debug, Default)]
pub struct Dispatcher {
    repetition: Repetition,
    active: Option<ActiveCommand>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分发当前命令
    pub fn dispatch(&mut self, s: &mut Session, p: &mut Platform) -> Result<Dispatch, RuntimeError> {
        if let Some(active) = self.active.as_mut() {
            self.repetition.check(s.cursor.index())?;
            let status = active.step(s, p)?;
            return self.settle(status, s);
        }

        let index = s.cursor.index();
        let command = s.script.command(index)?.clone();
        if command.is_skipped_for(&s.config.locale) {
            debug!(index, locale = ?command.locale, "跳过其他语言的命令");
            s.cursor.move_to_next(&s.script);
            return Ok(Dispatch::Continue(true));
        }

        match handlers::handle(&command, s, p)? {
            Handled::Done { cont } => Ok(Dispatch::Continue(cont)),
            Handled::Started(mut active) => {
                debug!(index, command = active.name(), "跨帧命令开始");
                let status = active.step(s, p)?;
                self.active = Some(active);
                self.settle(status, s)
            }
        }
    }

    fn settle(&mut self, status: StepStatus, s: &Session) -> Result<Dispatch, RuntimeError> {
        match status {
            StepStatus::Running => {
                if !self.repetition.is_running() {
                    self.repetition.start(s.cursor.index())?;
                }
                Ok(Dispatch::Continue(false))
            }
            StepStatus::Finished { cont } => {
                if self.repetition.is_running() {
                    self.repetition.stop()?;
                }
                self.active = None;
                Ok(Dispatch::Continue(cont))
            }
            StepStatus::Overlay(request) => {
                // 系统覆盖层期间消息被挂起，游标可能被覆盖层结果改变
                match request.kind {
                    OverlayKind::System(_) => {
                        if self.repetition.is_running() {
                            self.repetition.stop()?;
                        }
                    }
                    OverlayKind::Command => {
                        if !self.repetition.is_running() {
                            self.repetition.start(s.cursor.index())?;
                        }
                    }
                }
                Ok(Dispatch::Overlay(request))
            }
            StepStatus::Loaded => {
                self.reset();
                Ok(Dispatch::Loaded)
            }
        }
    }

    /// 取出挂起的消息（进入系统覆盖层时）
    pub fn take_message(&mut self) -> Option<Box<MessageState>> {
        match self.active.take() {
            Some(ActiveCommand::Message(m)) => Some(m),
            other => {
                self.active = other;
                None
            }
        }
    }

    /// 恢复从系统覆盖层返回的消息
    pub fn resume_message(&mut self, message: Box<MessageState>, index: usize) -> Result<(), RuntimeError> {
        self.repetition.start(index)?;
        self.active = Some(ActiveCommand::Message(message));
        Ok(())
    }

    /// 把 GUI 覆盖层的结果交给等待中的 `gui` 命令
    pub fn resolve_gui(&mut self, label: Option<String>) {
        if let Some(ActiveCommand::Gui(gui)) = self.active.as_mut() {
            gui.resolve(label);
        }
    }

    /// 丢弃运行中的命令
    pub fn reset(&mut self) {
        self.repetition.reset();
        self.active = None;
    }

    /// 显示中的消息
    pub fn active_message(&self) -> Option<&MessageState> {
        match &self.active {
            Some(ActiveCommand::Message(m)) => Some(m),
            _ => None,
        }
    }

    /// 冻结的命令索引
    pub fn repetition_index(&self) -> Option<usize> {
        self.repetition.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind};
    use crate::config::EngineConfig;
    use crate::script::Script;

    fn session(commands: Vec<Command>) -> Session {
        Session::new(EngineConfig::default(), Script::new("main", commands).unwrap())
    }

    fn message(text: &str) -> CommandKind {
        CommandKind::Message {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_repetition_start_stop() {
        let mut r = Repetition::new();
        r.start(3).unwrap();
        assert!(r.is_running());
        assert!(r.check(3).is_ok());
        assert!(matches!(
            r.check(4),
            Err(RuntimeError::RepetitionViolation { .. })
        ));
        assert_eq!(r.stop().unwrap(), 3);
        assert!(r.stop().is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "repetition 重复开始")]
    fn test_repetition_double_start_asserts() {
        let mut r = Repetition::new();
        r.start(1).unwrap();
        let _ = r.start(2);
    }

    #[test]
    fn test_locale_skip_continues_same_frame() {
        let mut s = session(vec![
            Command::localized("en", message("Hello")),
            Command::new(CommandKind::Label {
                name: "next".to_string(),
            }),
        ]);
        let mut p = Platform::headless();
        let mut d = Dispatcher::new();
        assert_eq!(d.dispatch(&mut s, &mut p).unwrap(), Dispatch::Continue(true));
        assert_eq!(s.cursor.index(), 1);
        assert!(s.history.is_empty());
    }

    #[test]
    fn test_message_freezes_cursor() {
        let mut s = session(vec![
            Command::new(message("あいう")),
            Command::new(message("えお")),
        ]);
        let mut p = Platform::headless();
        let mut d = Dispatcher::new();

        assert_eq!(d.dispatch(&mut s, &mut p).unwrap(), Dispatch::Continue(false));
        assert_eq!(d.repetition_index(), Some(0));
        assert!(d.active_message().is_some());

        for _ in 0..2 {
            s.clock.advance(5.0);
            d.dispatch(&mut s, &mut p).unwrap();
        }
        assert_eq!(s.cursor.index(), 0);
        assert!(d.active_message().is_some_and(|m| m.is_click_wait()));

        s.input.return_pressed = true;
        assert_eq!(d.dispatch(&mut s, &mut p).unwrap(), Dispatch::Continue(false));
        assert_eq!(s.cursor.index(), 1);
        assert_eq!(d.repetition_index(), None);
        assert!(d.active_message().is_none());
    }

    #[test]
    fn test_moved_cursor_is_violation() {
        let mut s = session(vec![
            Command::new(message("あ")),
            Command::new(message("い")),
        ]);
        let mut p = Platform::headless();
        let mut d = Dispatcher::new();
        d.dispatch(&mut s, &mut p).unwrap();
        s.cursor.move_to_next(&s.script);
        assert!(matches!(
            d.dispatch(&mut s, &mut p),
            Err(RuntimeError::RepetitionViolation { .. })
        ));
    }

    #[test]
    fn test_take_message_keeps_other_commands() {
        let mut s = session(vec![Command::new(CommandKind::Wait { span: 1.0 })]);
        let mut p = Platform::headless();
        let mut d = Dispatcher::new();
        d.dispatch(&mut s, &mut p).unwrap();
        assert!(d.take_message().is_none());
        assert_eq!(d.repetition_index(), Some(0));
    }
}
