//! # Handlers 模块
//!
//! 每种命令的处理器。
//!
//! ## 职责
//!
//! - 单帧命令（标签、跳转、变量、音频……）在 [`handle`] 中直接完成并移动游标
//! - 跨帧命令（消息、过渡、震动、等待、点击、GUI）返回 [`ActiveCommand`]，
//!   由 Dispatcher 在之后的每帧调用 [`ActiveCommand::step`]，直到结束
//!
//! `handle` 对 [`CommandKind`] 做穷尽匹配，缺少处理器的命令无法通过编译。

use std::f32::consts::TAU;

use tracing::{debug, info};

use crate::command::{Command, CommandKind};
use crate::config::BoxOnBackground;
use crate::error::RuntimeError;
use crate::message::{MessageFrame, MessageSource, MessageStart, MessageState};
use crate::platform::{OverlayKind, Platform, SystemOverlay};
use crate::runtime::Session;
use crate::stage::{CharPosition, FadeMethod, FadeState, ShakeDirection, Stream, VolumeTarget};
use crate::timer::LapTimer;

/// auto 模式下 `click` 命令的等待时间（毫秒）
pub const CLICK_AUTO_WAIT_MS: u64 = 2000;

/// 覆盖层请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRequest {
    pub kind: OverlayKind,
    pub file: String,
}

/// 命令开始执行的结果
#[derive(Debug)]
pub enum Handled {
    /// 已完成，`cont` 表示是否在同一帧继续分发
    Done { cont: bool },
    /// 开始跨帧执行
    Started(ActiveCommand),
}

/// 跨帧命令单帧的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// 下一帧继续
    Running,
    /// 已结束，游标已移动
    Finished { cont: bool },
    /// 交给覆盖层，游标不动
    Overlay(OverlayRequest),
    /// 快速读档完成
    Loaded,
}

/// 正在跨帧执行的命令
#[derive(Debug)]
pub enum ActiveCommand {
    Message(Box<MessageState>),
    Fade(FadeCommand),
    Shake(ShakeCommand),
    Wait(WaitCommand),
    Click(ClickCommand),
    Gui(GuiCommand),
}

impl ActiveCommand {
    /// 命令名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            ActiveCommand::Message(_) => "message",
            ActiveCommand::Fade(_) => "fade",
            ActiveCommand::Shake(_) => "shake",
            ActiveCommand::Wait(_) => "wait",
            ActiveCommand::Click(_) => "click",
            ActiveCommand::Gui(_) => "gui",
        }
    }

    /// 执行一帧
    pub fn step(&mut self, s: &mut Session, p: &mut Platform) -> Result<StepStatus, RuntimeError> {
        match self {
            ActiveCommand::Message(m) => Ok(match m.frame(s, p)? {
                MessageFrame::Running => StepStatus::Running,
                MessageFrame::Finished => StepStatus::Finished { cont: false },
                MessageFrame::Overlay(kind) => StepStatus::Overlay(OverlayRequest {
                    kind: OverlayKind::System(kind),
                    file: system_overlay_file(kind, s).to_string(),
                }),
                MessageFrame::Loaded => StepStatus::Loaded,
            }),
            ActiveCommand::Fade(c) => c.step(s),
            ActiveCommand::Shake(c) => Ok(c.step(s)),
            ActiveCommand::Wait(c) => Ok(c.step(s)),
            ActiveCommand::Click(c) => Ok(c.step(s)),
            ActiveCommand::Gui(c) => c.step(s),
        }
    }
}

fn system_overlay_file(kind: SystemOverlay, s: &Session) -> &str {
    let gui = &s.config.gui;
    match kind {
        SystemOverlay::Save => &gui.save,
        SystemOverlay::Load => &gui.load,
        SystemOverlay::History => &gui.history,
        SystemOverlay::Config => &gui.config,
    }
}

/// 开始执行一条命令
pub fn handle(command: &Command, s: &mut Session, p: &mut Platform) -> Result<Handled, RuntimeError> {
    let done = Ok(Handled::Done { cont: true });
    match &command.kind {
        CommandKind::Label { .. } => {
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Message { text } => start_message(MessageSource::narration(text), s, p),

        CommandKind::Serif { name, voice, text } => start_message(
            MessageSource {
                name: Some(name.as_str()),
                voice: voice.as_deref(),
                text,
            },
            s,
            p,
        ),

        CommandKind::Goto { label } => {
            let label = s.expand(label);
            s.cursor.move_to_label(&s.script, &label)?;
            done
        }

        CommandKind::Gosub { label, args } => {
            let label = s.expand(label);
            let args: Vec<String> = args.iter().map(|a| s.expand(a)).collect();
            s.cursor.push_return_point(&args);
            s.cursor.move_to_label(&s.script, &label)?;
            debug!(label, depth = s.cursor.depth(), "gosub");
            done
        }

        CommandKind::Return => {
            if s.sysmenu_gosub == Some(s.cursor.depth()) {
                s.sysmenu_gosub = None;
                s.gosub_returned = true;
            }
            s.cursor.pop_return_point(&s.script)?;
            debug!(index = s.cursor.index(), "return");
            done
        }

        CommandKind::Set { lhs, op, rhs } => {
            s.vars.apply_set(lhs, op, rhs)?;
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::If { lhs, op, rhs, label } => {
            if s.vars.compare(lhs, op, rhs)? {
                let label = s.expand(label);
                s.cursor.move_to_label(&s.script, &label)?;
            } else {
                s.cursor.move_to_next(&s.script);
            }
            done
        }

        CommandKind::Unless {
            lhs,
            op,
            rhs,
            label,
            finally,
        } => {
            if s.vars.compare(lhs, op, rhs)? {
                s.cursor.move_to_next(&s.script);
            } else {
                let (label, finally) = (s.expand(label), s.expand(finally));
                s.cursor.move_to_label_finally(&s.script, &label, &finally)?;
            }
            done
        }

        CommandKind::Wait { span } => Ok(Handled::Started(ActiveCommand::Wait(WaitCommand {
            timer: LapTimer::started_at(&s.clock),
            span: *span,
        }))),

        CommandKind::Click => {
            s.stage.show_message_boxes(false, false);
            if s.modes.is_skip() {
                s.stop_skip()?;
            }
            Ok(Handled::Started(ActiveCommand::Click(ClickCommand {
                timer: LapTimer::started_at(&s.clock),
            })))
        }

        CommandKind::Background { file, span, method } => {
            let method: FadeMethod = method.parse()?;
            s.stage.background = Some(s.expand(file));
            let fade_boxes = match s.config.msgbox.show_on_bg {
                BoxOnBackground::FadeOut => true,
                BoxOnBackground::Keep => false,
                BoxOnBackground::Hide => {
                    s.stage.show_message_boxes(false, false);
                    false
                }
            };
            start_fade(method, *span, fade_boxes, s)
        }

        CommandKind::Character {
            position,
            file,
            span,
            method,
        } => {
            let position: CharPosition = position.parse()?;
            let method: FadeMethod = method.parse()?;
            let file = file.as_deref().map(|f| s.expand(f));
            s.stage.set_character(position, file);
            let fade_boxes = !s.config.msgbox.show_on_ch;
            start_fade(method, *span, fade_boxes, s)
        }

        CommandKind::Shake {
            direction,
            span,
            times,
            amplitude,
        } => {
            let direction: ShakeDirection = direction.parse()?;
            s.stage.show_message_boxes(false, false);
            Ok(Handled::Started(ActiveCommand::Shake(ShakeCommand {
                timer: LapTimer::started_at(&s.clock),
                direction,
                span: *span,
                times: *times,
                amplitude: *amplitude,
            })))
        }

        CommandKind::Bgm { file, once } => {
            match file.as_deref().filter(|f| !f.is_empty()) {
                Some(f) => {
                    let f = s.expand(f);
                    p.audio
                        .play(Stream::Bgm, &f, !once)
                        .map_err(|message| RuntimeError::Resource {
                            file: f.clone(),
                            message,
                        })?;
                    s.mixer.bgm = Some(f);
                    s.mixer.bgm_looping = !once;
                }
                None => {
                    p.audio.stop(Stream::Bgm);
                    s.mixer.bgm = None;
                }
            }
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Se { file, voice } => {
            let stream = if *voice { Stream::Voice } else { Stream::Se };
            match file.as_deref().filter(|f| !f.is_empty()) {
                Some(f) => {
                    let f = s.expand(f);
                    p.audio
                        .play(stream, &f, false)
                        .map_err(|message| RuntimeError::Resource { file: f, message })?;
                }
                None => p.audio.stop(stream),
            }
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Volume { stream, vol, span } => {
            let vol = vol.clamp(0.0, 1.0);
            match stream.parse::<VolumeTarget>()? {
                VolumeTarget::Local(stream) => {
                    s.mixer.set_volume(stream, vol);
                    p.audio.set_volume(stream, vol, span.max(0.0));
                }
                VolumeTarget::Global(stream) => p.audio.set_global_volume(stream, vol),
            }
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Chapter { name } => {
            s.stage.chapter = s.expand(name);
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::SetSave { enabled } => {
            s.modes.set_save_load_enabled(*enabled);
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Skip { enabled } => {
            s.modes.set_non_interruptible(!enabled);
            s.cursor.move_to_next(&s.script);
            done
        }

        CommandKind::Gui { file, cancelable } => {
            Ok(Handled::Started(ActiveCommand::Gui(GuiCommand {
                file: s.expand(file),
                cancelable: *cancelable,
                requested: false,
                result: None,
            })))
        }
    }
}

fn start_message(
    source: MessageSource<'_>,
    s: &mut Session,
    p: &mut Platform,
) -> Result<Handled, RuntimeError> {
    Ok(match MessageState::begin(source, s, p)? {
        MessageStart::Show(state) => Handled::Started(ActiveCommand::Message(state)),
        MessageStart::Skipped { cont } => Handled::Done { cont },
    })
}

/// `fade_boxes` 为真时消息框随过渡淡出
fn start_fade(
    method: FadeMethod,
    span: f32,
    fade_boxes: bool,
    s: &mut Session,
) -> Result<Handled, RuntimeError> {
    if fade_boxes {
        s.stage.show_message_boxes(false, false);
    }
    if span <= 0.0 {
        s.cursor.move_to_next(&s.script);
        return Ok(Handled::Done { cont: true });
    }
    s.stage.fade = Some(FadeState {
        method,
        progress: 0.0,
        fade_boxes,
    });
    Ok(Handled::Started(ActiveCommand::Fade(FadeCommand {
        timer: LapTimer::started_at(&s.clock),
        span,
    })))
}

/// 用户的推进输入（Return / Down / 左键点击）
fn user_advance(s: &Session) -> bool {
    let i = &s.input;
    i.return_pressed || i.down_pressed || i.left_clicked
}

/// 背景/角色过渡
#[derive(Debug)]
pub struct FadeCommand {
    timer: LapTimer,
    span: f32,
}

impl FadeCommand {
    fn step(&mut self, s: &mut Session) -> Result<StepStatus, RuntimeError> {
        let lap = self.timer.lap_secs(&s.clock);
        let non_interruptible = s.modes.is_non_interruptible();
        let pressed = !non_interruptible && user_advance(s);

        // 用户输入结束 auto/skip 模式
        if pressed && s.modes.is_auto() {
            s.stop_auto()?;
        } else if pressed && s.modes.is_skip() {
            s.stop_skip()?;
        }
        let interrupted = pressed || (!non_interruptible && s.input.control_pressed);

        if lap >= self.span || s.modes.is_skip() || interrupted {
            s.stage.fade = None;
            s.cursor.move_to_next(&s.script);
            return Ok(StepStatus::Finished { cont: false });
        }
        if let Some(fade) = s.stage.fade.as_mut() {
            fade.progress = (lap / self.span).clamp(0.0, 1.0);
        }
        Ok(StepStatus::Running)
    }
}

/// 画面震动
#[derive(Debug)]
pub struct ShakeCommand {
    timer: LapTimer,
    direction: ShakeDirection,
    span: f32,
    times: u32,
    amplitude: i32,
}

impl ShakeCommand {
    fn step(&mut self, s: &mut Session) -> StepStatus {
        let lap = self.timer.lap_secs(&s.clock);
        let interrupted = !s.modes.is_non_interruptible()
            && (s.input.control_pressed || user_advance(s));

        if lap >= self.span || self.span <= 0.0 || interrupted {
            s.stage.shake_offset = (0, 0);
            s.cursor.move_to_next(&s.script);
            return StepStatus::Finished { cont: false };
        }
        let phase = self.times as f32 * lap / self.span * TAU;
        let offset = (self.amplitude as f32 * phase.sin()).round() as i32;
        s.stage.shake_offset = self.direction.offset(offset);
        StepStatus::Running
    }
}

/// 定时等待
#[derive(Debug)]
pub struct WaitCommand {
    timer: LapTimer,
    span: f32,
}

impl WaitCommand {
    fn step(&mut self, s: &mut Session) -> StepStatus {
        let lap = self.timer.lap_secs(&s.clock);
        let m = &s.modes;
        let finished = lap >= self.span
            || (m.is_skip() && !m.is_non_interruptible())
            || (!m.is_auto() && !m.is_non_interruptible() && s.input.is_advance());
        if finished {
            s.cursor.move_to_next(&s.script);
            return StepStatus::Finished { cont: false };
        }
        StepStatus::Running
    }
}

/// 等待点击
#[derive(Debug)]
pub struct ClickCommand {
    timer: LapTimer,
}

impl ClickCommand {
    fn step(&mut self, s: &mut Session) -> StepStatus {
        let finished = if s.modes.is_auto() {
            self.timer.lap_millis(&s.clock) >= CLICK_AUTO_WAIT_MS
        } else {
            s.input.is_advance()
        };
        if finished {
            s.cursor.move_to_next(&s.script);
            return StepStatus::Finished { cont: false };
        }
        StepStatus::Running
    }
}

/// GUI 覆盖层
#[derive(Debug)]
pub struct GuiCommand {
    file: String,
    cancelable: bool,
    requested: bool,
    /// 覆盖层结束后的结果：`Some(label)` 跳转，`None` 继续
    result: Option<Option<String>>,
}

impl GuiCommand {
    /// 记录覆盖层的结果
    pub fn resolve(&mut self, label: Option<String>) {
        self.result = Some(label);
    }

    fn step(&mut self, s: &mut Session) -> Result<StepStatus, RuntimeError> {
        if let Some(result) = self.result.take() {
            match result {
                Some(label) => {
                    info!(file = self.file, label, "GUI 返回标签");
                    s.cursor.move_to_label(&s.script, &label)?;
                }
                None => s.cursor.move_to_next(&s.script),
            }
            return Ok(StepStatus::Finished { cont: true });
        }
        if self.requested {
            return Ok(StepStatus::Running);
        }
        self.requested = true;
        info!(file = self.file, cancelable = self.cancelable, "进入 GUI");
        Ok(StepStatus::Overlay(OverlayRequest {
            kind: OverlayKind::Command,
            file: self.file.clone(),
        }))
    }
}
