//! # ADV Runtime
//!
//! ADV/视觉小说引擎的核心运行时库。
//!
//! ## 架构概述
//!
//! `adv-runtime` 按固定帧率逐帧执行脚本，不直接访问字体、音频或文件。
//! 设备能力通过 [`Platform`] 中的 trait 对象注入：
//!
//! ```text
//! Host                              Runtime
//!   │                                  │
//!   │──── InputEvent ────────────────►│
//!   │                                  │ Engine::step(dt)
//!   │                                  │   ├─ Dispatcher ──► handlers
//!   │                                  │   └─ MessageState（跨帧）
//!   │◄─── StageState / 绘制调用 ───────│
//!   │                                  │
//! ```
//!
//! 一条脚本命令可以跨越多帧执行（消息展开、过渡、等待……）：
//! 执行期间游标被冻结，由 [`runtime::dispatcher::Repetition`] 保证。
//!
//! ## 核心类型
//!
//! - [`Engine`]：游戏循环驱动
//! - [`Script`] / [`Command`]：脚本模型
//! - [`EngineConfig`]：引擎配置
//! - [`SessionModeState`]：auto/skip 等模式标志
//! - [`SaveData`]：存档数据
//!
//! ## 使用示例
//!
//! ```ignore
//! use adv_runtime::{Engine, EngineConfig, Platform, Script};
//!
//! let script = Script::from_source(serde_json::from_str(&json)?)?;
//! let mut engine = Engine::new(EngineConfig::default(), script, Platform::headless())?;
//!
//! while engine.step(1.0 / 60.0)? {
//!     for event in host.poll_events() {
//!         engine.apply_input(event);
//!     }
//!     host.present(&engine.session().stage);
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`command`] / [`script`] / [`cursor`]：脚本模型与执行位置
//! - [`vars`]：脚本变量
//! - [`history`]：消息历史与已读标记
//! - [`input`] / [`mode`] / [`timer`]：每帧输入、模式标志、帧时钟
//! - [`config`]：引擎配置
//! - [`platform`]：设备能力 trait 与无设备实现
//! - [`stage`]：舞台与混音器的逻辑状态
//! - [`text`]：文本指令解析与排版
//! - [`message`]：消息命令状态机
//! - [`runtime`]：会话、分发器、游戏循环
//! - [`save`]：存档
//! - [`error`]：错误类型

pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod history;
pub mod input;
pub mod message;
pub mod mode;
pub mod platform;
pub mod runtime;
pub mod save;
pub mod script;
pub mod stage;
pub mod text;
pub mod timer;
pub mod vars;

// 重导出核心类型
pub use command::{Command, CommandKind};
pub use config::{BoxOnBackground, EngineConfig, HistoryControl, SkipUnseen};
pub use cursor::ScriptCursor;
pub use error::{AdvError, AdvResult, ModeError, RuntimeError, SaveError, ScriptError};
pub use history::{History, HistoryEntry, SeenRegistry};
pub use input::{InputEvent, InputSnapshot, Key};
pub use message::{MessageFrame, MessageState};
pub use mode::SessionModeState;
pub use platform::{
    AudioMixer, GlyphRasterizer, OverlayHost, OverlayKind, OverlayOutcome, OverlayStatus,
    Platform, SaveStore, SystemOverlay,
};
pub use runtime::{Engine, Session};
pub use save::{SaveData, SaveVersion};
pub use script::{Script, ScriptSource};
pub use stage::{MixerState, StageState, Stream};
pub use vars::Variables;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let script = Script::new(
            "main",
            vec![Command::new(CommandKind::Message {
                text: "こんにちは".to_string(),
            })],
        )
        .unwrap();

        let _input = InputEvent::key(Key::Return);
        let _modes = SessionModeState::new();

        let engine = Engine::new(EngineConfig::default(), script, Platform::headless()).unwrap();
        assert_eq!(engine.session().cursor.index(), 0);
        assert_eq!(engine.snapshot().version, SaveVersion::current());
    }
}
