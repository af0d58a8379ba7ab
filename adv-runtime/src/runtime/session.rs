//! # Session 模块
//!
//! 一次游玩会话的全部可变状态。
//!
//! 命令处理器与消息状态机都通过 `&mut Session` 读写状态，
//! 设备能力则通过单独的 [`Platform`](crate::platform::Platform) 传入。

use tracing::info;

use crate::config::EngineConfig;
use crate::cursor::ScriptCursor;
use crate::error::{ModeError, SaveError};
use crate::history::{History, SeenRegistry};
use crate::input::InputSnapshot;
use crate::message::PageBuffer;
use crate::mode::SessionModeState;
use crate::save::{SaveData, SaveVersion};
use crate::script::Script;
use crate::stage::{MixerState, StageState};
use crate::text::LayoutParams;
use crate::timer::FrameClock;
use crate::vars::Variables;

/// 会话状态
#[derive(Debug, Clone)]
pub struct Session {
    pub config: EngineConfig,
    pub script: Script,
    pub cursor: ScriptCursor,
    pub modes: SessionModeState,
    pub vars: Variables,
    pub stage: StageState,
    pub mixer: MixerState,
    pub history: History,
    pub seen: SeenRegistry,
    pub input: InputSnapshot,
    pub clock: FrameClock,
    /// 页模式缓冲
    pub page: PageBuffer,
    /// 上一条消息结束时的画笔位置（续行从这里开始）
    pub msgbox_pen: (i32, i32),
    /// 系统菜单自定义子程序调用时的调用栈深度
    pub sysmenu_gosub: Option<usize>,
    /// 刚从系统菜单自定义子程序返回（一次性）
    pub gosub_returned: bool,
    /// 刚读档（一次性）
    pub just_loaded: bool,
}

impl Session {
    pub fn new(config: EngineConfig, script: Script) -> Self {
        let msgbox_pen = LayoutParams::msgbox(&config).origin();
        Self {
            config,
            script,
            cursor: ScriptCursor::new(),
            modes: SessionModeState::new(),
            vars: Variables::new(),
            stage: StageState::new(),
            mixer: MixerState::default(),
            history: History::new(),
            seen: SeenRegistry::new(),
            input: InputSnapshot::new(),
            clock: FrameClock::new(),
            page: PageBuffer::new(),
            msgbox_pen,
            sysmenu_gosub: None,
            gosub_returned: false,
            just_loaded: false,
        }
    }

    /// 当前命令是否已读
    pub fn is_current_seen(&self) -> bool {
        self.seen.is_seen(self.script.name(), self.cursor.index())
    }

    /// 标记当前命令为已读
    pub fn mark_current_seen(&mut self) {
        self.seen.mark(self.script.name(), self.cursor.index());
    }

    /// 展开文本中的变量引用
    pub fn expand(&self, text: &str) -> String {
        self.vars.expand(text, &self.cursor)
    }

    /// 开启 auto 模式并显示提示条
    pub fn start_auto(&mut self) -> Result<(), ModeError> {
        self.modes.start_auto()?;
        self.stage.auto_banner = true;
        Ok(())
    }

    pub fn stop_auto(&mut self) -> Result<(), ModeError> {
        self.modes.stop_auto()?;
        self.stage.auto_banner = false;
        Ok(())
    }

    /// 开启 skip 模式并显示提示条
    pub fn start_skip(&mut self) -> Result<(), ModeError> {
        self.modes.start_skip()?;
        self.stage.skip_banner = true;
        Ok(())
    }

    pub fn stop_skip(&mut self) -> Result<(), ModeError> {
        self.modes.stop_skip()?;
        self.stage.skip_banner = false;
        Ok(())
    }

    /// 结束 auto 或 skip 模式（未开启时什么都不做）
    pub fn stop_auto_or_skip(&mut self) {
        self.modes.stop_auto_or_skip();
        self.stage.auto_banner = false;
        self.stage.skip_banner = false;
    }

    /// 生成存档数据
    pub fn snapshot(&self) -> SaveData {
        SaveData {
            version: SaveVersion::current(),
            script: self.script.name().to_string(),
            cursor: self.cursor.clone(),
            vars: self.vars.clone(),
            stage: self.stage.clone(),
            mixer: self.mixer.clone(),
            seen: self.seen.clone(),
            history: self.history.clone(),
            save_load_enabled: self.modes.is_save_load_enabled(),
        }
    }

    /// 从存档恢复
    ///
    /// 全局变量与已读标记保留当前值（已读标记取并集）；
    /// auto/skip 模式与消息状态被清除。
    pub fn restore(&mut self, data: SaveData) -> Result<(), SaveError> {
        if data.script != self.script.name() {
            return Err(SaveError::ScriptMismatch {
                saved: data.script,
                current: self.script.name().to_string(),
            });
        }

        let SaveData {
            cursor,
            vars,
            mut stage,
            mixer,
            seen,
            history,
            save_load_enabled,
            ..
        } = data;

        self.cursor = cursor;
        self.vars.restore_locals(&vars);
        stage.auto_banner = false;
        stage.skip_banner = false;
        self.stage = stage;
        self.mixer = mixer;
        self.seen.merge(&seen);
        self.history = history;

        self.modes.reset_after_load();
        self.modes.set_save_load_enabled(save_load_enabled);
        self.page = PageBuffer::new();
        self.msgbox_pen = LayoutParams::msgbox(&self.config).origin();
        self.sysmenu_gosub = None;
        self.gosub_returned = false;
        self.just_loaded = true;

        info!(script = self.script.name(), index = self.cursor.index(), "存档已恢复");
        Ok(())
    }
}
