//! # Game Loop 模块
//!
//! 每帧调用一次的游戏循环驱动。
//!
//! ## 每帧流程
//!
//! ```text
//! step(dt)
//!   ├─ 时钟前进
//!   ├─ 覆盖层运行中？──► 运行一帧 ──► 结束则处理结果，继续分发
//!   ├─ 分发循环：dispatch 直到不再要求同帧继续
//!   └─ 帧后处理：音量渐变、清除帧作用域输入
//! ```
//!
//! 分发出错时直接返回错误，不做帧后处理。

use tracing::{error, info, warn};

use crate::command::Command;
use crate::config::EngineConfig;
use crate::error::{AdvResult, RuntimeError, SaveError};
use crate::input::InputEvent;
use crate::message::MessageState;
use crate::platform::{OverlayKind, OverlayOutcome, OverlayStatus, Platform, Surface};
use crate::runtime::Session;
use crate::save::{SaveData, SaveVersion};
use crate::script::Script;
use crate::stage::Stream;

use super::dispatcher::{Dispatch, Dispatcher};
use super::handlers::OverlayRequest;

/// 引擎
pub struct Engine {
    session: Session,
    platform: Platform,
    dispatcher: Dispatcher,
    /// 运行中的覆盖层
    overlay: Option<OverlayRequest>,
    /// 系统覆盖层期间挂起的消息
    suspended: Option<Box<MessageState>>,
    frame: u64,
}

impl Engine {
    /// 创建引擎
    ///
    /// 配置非法时返回错误；未定义的跳转目标只记录警告，执行到时才报错。
    pub fn new(config: EngineConfig, script: Script, platform: Platform) -> AdvResult<Self> {
        config.validate()?;
        for (index, label) in script.undefined_jump_targets() {
            warn!(index, label, "跳转目标未定义");
        }
        info!(script = script.name(), commands = script.len(), locale = config.locale, "引擎启动");
        Ok(Self {
            session: Session::new(config, script),
            platform,
            dispatcher: Dispatcher::new(),
            overlay: None,
            suspended: None,
            frame: 0,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut Platform {
        &mut self.platform
    }

    /// 写入输入事件（在下一次 `step` 中生效）
    pub fn apply_input(&mut self, event: InputEvent) {
        self.session.input.apply(event);
    }

    /// 当前命令
    pub fn current_command(&self) -> Option<&Command> {
        self.session.script.get(self.session.cursor.index())
    }

    /// 显示中的消息（包括被系统覆盖层挂起的消息）
    pub fn message(&self) -> Option<&MessageState> {
        self.dispatcher
            .active_message()
            .or(self.suspended.as_deref())
    }

    pub fn is_overlay_active(&self) -> bool {
        self.overlay.is_some()
    }

    /// 跨帧执行中的命令索引
    pub fn repetition_index(&self) -> Option<usize> {
        self.dispatcher.repetition_index()
    }

    /// 已执行的帧数
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// 脚本是否执行完毕
    pub fn is_finished(&self) -> bool {
        self.session.cursor.is_ended()
    }

    /// 生成存档数据
    pub fn snapshot(&self) -> SaveData {
        self.session.snapshot()
    }

    /// 从存档恢复，下一帧从存档位置开始执行
    pub fn restore(&mut self, data: SaveData) -> Result<(), RuntimeError> {
        if !data.version.is_compatible() {
            return Err(SaveError::VersionMismatch {
                save_version: data.version.to_string(),
                current_version: SaveVersion::current().to_string(),
            }
            .into());
        }
        self.session.restore(data)?;
        self.after_load();
        Ok(())
    }

    /// 执行一帧
    ///
    /// 返回 `Ok(false)` 表示脚本已执行完毕。
    pub fn step(&mut self, dt: f32) -> Result<bool, RuntimeError> {
        self.frame += 1;
        self.session.clock.advance(dt);

        if let Err(e) = self.run_frame() {
            error!(
                frame = self.frame,
                index = self.session.cursor.index(),
                error = %e,
                "命令执行失败，停止运行"
            );
            return Err(e);
        }

        self.platform.audio.tick_fades(dt);
        self.session.input.clear_frame_flags();
        Ok(!self.session.cursor.is_ended())
    }

    fn run_frame(&mut self) -> Result<(), RuntimeError> {
        if self.overlay.is_some() {
            if !self.step_overlay()? {
                return Ok(());
            }
            // 关闭覆盖层的输入不再传给脚本
            self.session.input.clear_input_state();
        }

        while !self.session.cursor.is_ended() {
            match self.dispatcher.dispatch(&mut self.session, &mut self.platform)? {
                Dispatch::Continue(true) => {}
                Dispatch::Continue(false) => break,
                Dispatch::Overlay(request) => {
                    self.enter_overlay(request)?;
                    break;
                }
                Dispatch::Loaded => self.after_load(),
            }
        }
        Ok(())
    }

    fn enter_overlay(&mut self, request: OverlayRequest) -> Result<(), RuntimeError> {
        if matches!(request.kind, OverlayKind::System(_)) {
            self.suspended = self.dispatcher.take_message();
        }
        self.platform
            .overlay
            .prepare(&request.file, request.kind)
            .map_err(|message| RuntimeError::Overlay {
                file: request.file.clone(),
                message,
            })?;
        info!(file = request.file, kind = ?request.kind, "进入覆盖层");
        self.overlay = Some(request);
        Ok(())
    }

    /// 运行覆盖层一帧；返回 true 表示覆盖层已结束
    fn step_overlay(&mut self) -> Result<bool, RuntimeError> {
        let Some(request) = self.overlay.as_ref() else {
            return Ok(true);
        };
        let status = self
            .platform
            .overlay
            .run_one_frame(&self.session.input)
            .map_err(|message| RuntimeError::Overlay {
                file: request.file.clone(),
                message,
            })?;
        let OverlayStatus::Finished(outcome) = status else {
            return Ok(false);
        };

        if let Some(request) = self.overlay.take() {
            info!(file = request.file, ?outcome, "覆盖层结束");
            self.resolve_overlay(request.kind, outcome)?;
        }
        Ok(true)
    }

    fn resolve_overlay(&mut self, kind: OverlayKind, outcome: OverlayOutcome) -> Result<(), RuntimeError> {
        match (kind, outcome) {
            (_, OverlayOutcome::Loaded(data)) => self.restore(*data)?,
            (OverlayKind::Command, OverlayOutcome::Jump(label)) => {
                self.dispatcher.resolve_gui(Some(label));
            }
            (OverlayKind::Command, OverlayOutcome::Closed) => self.dispatcher.resolve_gui(None),
            (OverlayKind::System(_), OverlayOutcome::Jump(label)) => {
                self.suspended = None;
                let s = &mut self.session;
                if s.modes.is_message_active() {
                    s.modes.clear_message_active()?;
                }
                s.stage.click = None;
                self.platform.audio.stop(Stream::Voice);
                s.cursor.move_to_label(&s.script, &label)?;
            }
            (OverlayKind::System(_), OverlayOutcome::Closed) => {
                if let Some(mut message) = self.suspended.take() {
                    message.resume_after_overlay(&mut self.session, &self.platform);
                    self.dispatcher
                        .resume_message(message, self.session.cursor.index())?;
                }
            }
        }
        Ok(())
    }

    /// 读档后让设备状态与会话一致
    fn after_load(&mut self) {
        self.dispatcher.reset();
        self.suspended = None;
        self.overlay = None;

        let s = &mut self.session;
        let p = &mut self.platform;
        p.audio.stop(Stream::Voice);
        match s.mixer.bgm.as_deref() {
            Some(file) => {
                if let Err(e) = p.audio.play(Stream::Bgm, file, s.mixer.bgm_looping) {
                    warn!(file, error = %e, "读档后 BGM 播放失败");
                }
            }
            None => p.audio.stop(Stream::Bgm),
        }
        for stream in [Stream::Bgm, Stream::Voice, Stream::Se] {
            p.audio.set_volume(stream, s.mixer.volume(stream), 0.0);
        }
        p.glyphs.clear(Surface::Msgbox);
        p.glyphs.clear(Surface::Namebox);

        s.stage.fade = None;
        s.stage.shake_offset = (0, 0);
        s.stage.click = None;
        s.stage.sysmenu_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::input::Key;
    use crate::platform::SystemOverlay;
    use crate::platform::headless::ScriptedOverlay;

    fn script(kinds: Vec<CommandKind>) -> Script {
        Script::new("main", kinds.into_iter().map(Command::new).collect()).unwrap()
    }

    fn message(text: &str) -> CommandKind {
        CommandKind::Message {
            text: text.to_string(),
        }
    }

    fn label(name: &str) -> CommandKind {
        CommandKind::Label {
            name: name.to_string(),
        }
    }

    fn engine_with_overlay(kinds: Vec<CommandKind>, overlay: ScriptedOverlay) -> Engine {
        let mut platform = Platform::headless();
        platform.overlay = Box::new(overlay);
        Engine::new(EngineConfig::default(), script(kinds), platform).unwrap()
    }

    #[test]
    fn test_runs_to_end() {
        let mut engine = Engine::new(
            EngineConfig::default(),
            script(vec![
                CommandKind::Set {
                    lhs: "$1".to_string(),
                    op: "=".to_string(),
                    rhs: "3".to_string(),
                },
                label("end"),
            ]),
            Platform::headless(),
        )
        .unwrap();
        assert!(!engine.step(1.0 / 60.0).unwrap());
        assert_eq!(engine.session().vars.get(1), 3);
        assert!(engine.is_finished());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.msgbox.speed = 0.0;
        assert!(Engine::new(config, script(vec![label("a")]), Platform::headless()).is_err());
    }

    #[test]
    fn test_error_stops_without_housekeeping() {
        let mut engine = Engine::new(
            EngineConfig::default(),
            script(vec![CommandKind::Goto {
                label: "nowhere".to_string(),
            }]),
            Platform::headless(),
        )
        .unwrap();
        engine.apply_input(InputEvent::key(Key::Return));
        assert!(engine.step(0.016).is_err());
        // 帧作用域输入没有被清除
        assert!(engine.session().input.return_pressed);
    }

    #[test]
    fn test_system_overlay_resumes_message() {
        let overlay = ScriptedOverlay {
            frames: 2,
            ..ScriptedOverlay::default()
        };
        let prepared = overlay.prepared.clone();
        let mut engine = engine_with_overlay(vec![message("あいうえお"), label("end")], overlay);

        engine.step(0.1).unwrap();
        engine.apply_input(InputEvent::key(Key::S));
        engine.step(0.1).unwrap();
        assert!(engine.is_overlay_active());
        assert!(engine.message().is_some());
        assert_eq!(engine.repetition_index(), None);
        assert_eq!(
            prepared.borrow()[0],
            ("system/save.txt".to_string(), OverlayKind::System(SystemOverlay::Save))
        );

        // 覆盖层运行两帧后关闭
        engine.step(0.1).unwrap();
        engine.step(0.1).unwrap();
        assert!(engine.is_overlay_active());
        engine.step(0.1).unwrap();
        assert!(!engine.is_overlay_active());
        assert_eq!(engine.repetition_index(), Some(0));
        assert_eq!(engine.session().cursor.index(), 0);
    }

    #[test]
    fn test_system_overlay_jump_abandons_message() {
        let overlay = ScriptedOverlay::default();
        overlay
            .outcomes
            .borrow_mut()
            .push_back(OverlayOutcome::Jump("title".to_string()));
        let mut engine = engine_with_overlay(
            vec![message("あいう"), label("title"), message("タイトル")],
            overlay,
        );
        engine.step(0.1).unwrap();
        engine.apply_input(InputEvent::key(Key::L));
        engine.step(0.1).unwrap();
        assert!(engine.is_overlay_active());

        engine.step(0.1).unwrap();
        assert!(!engine.is_overlay_active());
        assert_eq!(engine.session().cursor.index(), 2);
        assert!(engine.message().is_some_and(|m| m.text() == "タイトル"));
    }

    #[test]
    fn test_gui_command_overlay() {
        let overlay = ScriptedOverlay::default();
        overlay
            .outcomes
            .borrow_mut()
            .push_back(OverlayOutcome::Jump("start".to_string()));
        let prepared = overlay.prepared.clone();
        let mut engine = engine_with_overlay(
            vec![
                CommandKind::Gui {
                    file: "title.gui".to_string(),
                    cancelable: false,
                },
                message("スキップされる"),
                label("start"),
                message("始まり"),
            ],
            overlay,
        );
        engine.step(0.1).unwrap();
        assert!(engine.is_overlay_active());
        assert_eq!(engine.repetition_index(), Some(0));
        assert_eq!(prepared.borrow()[0].1, OverlayKind::Command);

        engine.step(0.1).unwrap();
        assert!(!engine.is_overlay_active());
        assert!(engine.message().is_some_and(|m| m.text() == "始まり"));
    }

    #[test]
    fn test_restore_replays_bgm() {
        let mut engine = Engine::new(
            EngineConfig::default(),
            script(vec![
                CommandKind::Bgm {
                    file: Some("theme.ogg".to_string()),
                    once: false,
                },
                message("あ"),
            ]),
            Platform::headless(),
        )
        .unwrap();
        engine.step(0.1).unwrap();
        let data = engine.snapshot();
        assert_eq!(data.mixer.bgm.as_deref(), Some("theme.ogg"));

        engine.restore(data).unwrap();
        assert_eq!(engine.repetition_index(), None);
        assert!(engine.message().is_none());
        engine.step(0.1).unwrap();
        assert_eq!(engine.repetition_index(), Some(1));
    }
}
