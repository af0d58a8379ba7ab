//! # Mode 模块
//!
//! 会话级模式标志。
//!
//! ## 不变量
//!
//! - auto 模式与 skip 模式互斥，开启其一时另一个必须关闭
//! - 开启已开启的模式、关闭未开启的模式都会被拒绝
//! - non-interruptible 模式下，所有由用户输入触发的提前结束都被抑制
//!
//! 所有切换都通过返回 [`ModeError`] 的方法完成，字段不对外可写。

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModeError;

/// 会话模式状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionModeState {
    auto: bool,
    skip: bool,
    non_interruptible: bool,
    message_active: bool,
    save_load_enabled: bool,
}

impl Default for SessionModeState {
    fn default() -> Self {
        Self {
            auto: false,
            skip: false,
            non_interruptible: false,
            message_active: false,
            save_load_enabled: true,
        }
    }
}

impl SessionModeState {
    /// 创建默认状态（仅允许存读档）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn is_skip(&self) -> bool {
        self.skip
    }

    pub fn is_non_interruptible(&self) -> bool {
        self.non_interruptible
    }

    pub fn is_message_active(&self) -> bool {
        self.message_active
    }

    pub fn is_save_load_enabled(&self) -> bool {
        self.save_load_enabled
    }

    /// 开启 auto 模式
    pub fn start_auto(&mut self) -> Result<(), ModeError> {
        if self.skip {
            return Err(ModeError::AutoWhileSkip);
        }
        if self.auto {
            return Err(ModeError::AlreadyActive("auto"));
        }
        self.auto = true;
        info!("auto 模式开启");
        Ok(())
    }

    /// 关闭 auto 模式
    pub fn stop_auto(&mut self) -> Result<(), ModeError> {
        if !self.auto {
            return Err(ModeError::NotActive("auto"));
        }
        self.auto = false;
        info!("auto 模式关闭");
        Ok(())
    }

    /// 开启 skip 模式
    pub fn start_skip(&mut self) -> Result<(), ModeError> {
        if self.auto {
            return Err(ModeError::SkipWhileAuto);
        }
        if self.skip {
            return Err(ModeError::AlreadyActive("skip"));
        }
        self.skip = true;
        info!("skip 模式开启");
        Ok(())
    }

    /// 关闭 skip 模式
    pub fn stop_skip(&mut self) -> Result<(), ModeError> {
        if !self.skip {
            return Err(ModeError::NotActive("skip"));
        }
        self.skip = false;
        info!("skip 模式关闭");
        Ok(())
    }

    /// 关闭 auto/skip 中正在运行的那个（都未开启时无操作）
    pub fn stop_auto_or_skip(&mut self) {
        if self.skip {
            self.skip = false;
            info!("skip 模式关闭");
        } else if self.auto {
            self.auto = false;
            info!("auto 模式关闭");
        }
    }

    /// 设置 non-interruptible 模式
    pub fn set_non_interruptible(&mut self, on: bool) {
        self.non_interruptible = on;
    }

    /// 设置存读档是否允许
    pub fn set_save_load_enabled(&mut self, on: bool) {
        self.save_load_enabled = on;
    }

    /// 标记消息显示中
    ///
    /// 进入系统覆盖层时保持，离开消息命令或读档时清除。
    pub fn set_message_active(&mut self) -> Result<(), ModeError> {
        if self.message_active {
            return Err(ModeError::AlreadyActive("message"));
        }
        self.message_active = true;
        Ok(())
    }

    /// 清除消息显示中标记
    pub fn clear_message_active(&mut self) -> Result<(), ModeError> {
        if !self.message_active {
            return Err(ModeError::NotActive("message"));
        }
        self.message_active = false;
        Ok(())
    }

    /// 读档后重置易失的模式（auto/skip/消息显示中）
    pub fn reset_after_load(&mut self) {
        self.auto = false;
        self.skip = false;
        self.message_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        let mode = SessionModeState::new();
        assert!(!mode.is_auto());
        assert!(!mode.is_skip());
        assert!(mode.is_save_load_enabled());
    }

    #[test]
    fn test_auto_skip_exclusive() {
        let mut mode = SessionModeState::new();
        mode.start_skip().unwrap();
        assert_eq!(mode.start_auto(), Err(ModeError::AutoWhileSkip));
        assert!(!mode.is_auto());

        mode.stop_skip().unwrap();
        mode.start_auto().unwrap();
        assert_eq!(mode.start_skip(), Err(ModeError::SkipWhileAuto));
        assert!(!mode.is_skip());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut mode = SessionModeState::new();
        mode.start_auto().unwrap();
        assert_eq!(mode.start_auto(), Err(ModeError::AlreadyActive("auto")));
        assert_eq!(mode.stop_skip(), Err(ModeError::NotActive("skip")));
    }

    #[test]
    fn test_message_active_pairing() {
        let mut mode = SessionModeState::new();
        assert!(mode.clear_message_active().is_err());
        mode.set_message_active().unwrap();
        assert!(mode.set_message_active().is_err());
        mode.clear_message_active().unwrap();
    }

    #[test]
    fn test_stop_auto_or_skip() {
        let mut mode = SessionModeState::new();
        mode.stop_auto_or_skip();
        mode.start_skip().unwrap();
        mode.stop_auto_or_skip();
        assert!(!mode.is_skip());
    }
}
