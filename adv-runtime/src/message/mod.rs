//! # Message 模块
//!
//! 消息命令（`message` / `serif`）的状态机。
//!
//! ## 状态
//!
//! ```text
//! begin ──► Displaying ⇄ ClickWait ──► (Dimming) ──► cleanup ──► 下一条命令
//!               │              │
//!               └──────┬───────┘
//!                      ▼
//!              系统覆盖层（游标不动，返回后 resume）
//! ```
//!
//! ## 每帧顺序
//!
//! 1. 前处理：行内等待取消 → auto 模式 → 消息框按钮 → 系统菜单，
//!    任意一步消费了输入就跳过后续步骤
//! 2. 绘制：按经过时间展开文字，或驱动点击等待提示
//! 3. 后处理：快速存档、覆盖层请求
//! 4. 不再重复时清理并前进游标
//!
//! 快速读档成功时状态已被替换，本帧既不绘制也不清理，直接返回
//! [`MessageFrame::Loaded`]。

pub mod buttons;
pub mod click;
pub mod pacing;
pub mod page;
pub mod sysmenu;

use tracing::{debug, info, warn};

use crate::config::{Color, HistoryControl};
use crate::error::RuntimeError;
use crate::history::HistoryEntry;
use crate::platform::{Platform, Surface, SystemOverlay};
use crate::runtime::Session;
use crate::stage::Stream;
use crate::text::layout::render_events;
use crate::text::tokenizer::is_directive_letter;
use crate::text::{
    IgnoreFlags, LayoutContext, LayoutParams, Margins, concat_serif, is_quote_started,
    is_quoted_serif,
};
use crate::timer::LapTimer;

pub use buttons::{ButtonGate, MsgboxButton};
pub use click::{ClickPrompt, ClickWaitFacts};
pub use pacing::PacingFacts;
pub use page::{PageBuffer, PageLine};
pub use sysmenu::{SysmenuItem, SysmenuState};

use pacing::{auto_wait_millis, chars_by_lap, is_canceled_by_skip, is_skippable, should_play_voice, should_repeat};

/// 消息框按钮与系统菜单共用的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    QSave,
    QLoad,
    Save,
    Load,
    Auto,
    Skip,
    History,
    Config,
    /// 自定义菜单项（1 或 2）
    Custom(usize),
}

/// 帧结束后交给调用方的请求
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Overlay(SystemOverlay),
    /// 系统菜单自定义子程序
    Custom(String),
}

/// 消息命令的参数（变量未展开）
#[derive(Debug, Clone, Copy)]
pub struct MessageSource<'a> {
    /// 台词的说话人；旁白为 `None`
    pub name: Option<&'a str>,
    pub voice: Option<&'a str>,
    pub text: &'a str,
}

impl<'a> MessageSource<'a> {
    pub fn narration(text: &'a str) -> Self {
        Self {
            name: None,
            voice: None,
            text,
        }
    }
}

/// 消息命令开始的结果
#[derive(Debug)]
pub enum MessageStart {
    /// 需要显示，进入多帧状态
    Show(Box<MessageState>),
    /// 不显示（页模式缓冲或只记录历史），游标已前进
    Skipped { cont: bool },
}

/// 消息命令单帧的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFrame {
    /// 继续显示
    Running,
    /// 已结束，游标已移动
    Finished,
    /// 进入系统覆盖层，游标仍指向本消息
    Overlay(SystemOverlay),
    /// 快速读档完成，会话状态已被替换
    Loaded,
}

/// 显示中的消息
#[derive(Debug)]
pub struct MessageState {
    /// 显示文本（已展开变量、已拼接名字）
    text: String,
    name: Option<String>,
    has_voice: bool,
    seen: bool,
    /// 从上一条消息的画笔位置继续
    continue_mode: bool,
    /// 页模式显示整页
    page_show: bool,

    layout: LayoutContext,
    dim_params: LayoutParams,

    repeating: bool,
    need_dimming: bool,
    reveal_timer: LapTimer,
    inline_wait: Option<(LapTimer, f32)>,
    inline_wait_total: f32,
    pause: Option<LapTimer>,
    paused_secs: f32,
    auto_wait: Option<(LapTimer, u64)>,

    click: ClickPrompt,
    pointed: Option<MsgboxButton>,
    hidden: bool,
    sysmenu: SysmenuState,

    from_system_overlay: bool,
    will_quick_save: bool,
    quick_loaded: bool,
    pending: Option<Pending>,
}

/// 以 `\` 开头、后面不是指令字母的文本是续行
fn continuation(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('\\')?;
    match rest.chars().next() {
        Some(c) if is_directive_letter(c) => None,
        _ => Some(rest),
    }
}

impl MessageState {
    /// 开始一条消息
    pub fn begin(
        source: MessageSource<'_>,
        s: &mut Session,
        p: &mut Platform,
    ) -> Result<MessageStart, RuntimeError> {
        // 页模式：普通行只进入缓冲
        let mut page_show = false;
        if s.config.msgbox.page_mode && source.name.is_none() {
            match PageLine::classify(source.text) {
                PageLine::Erase => {
                    debug!("页模式：清空页面");
                    s.page.erase();
                    p.glyphs.clear(Surface::Msgbox);
                    s.msgbox_pen = LayoutParams::msgbox(&s.config).origin();
                    s.cursor.move_to_next(&s.script);
                    return Ok(MessageStart::Skipped { cont: true });
                }
                PageLine::Append(line) => {
                    s.page.append(line);
                    s.cursor.move_to_next(&s.script);
                    return Ok(MessageStart::Skipped { cont: true });
                }
                PageLine::Show => page_show = true,
            }
        }

        let gosub_returned = std::mem::take(&mut s.gosub_returned);
        let just_loaded = std::mem::take(&mut s.just_loaded);
        let seen = s.is_current_seen();
        let policy = s.config.msgbox.skip_unseen;
        let history_control = s.config.msgbox.history_control;

        if history_control != HistoryControl::OnlyHistory {
            if s.modes.is_auto() {
                s.input.return_pressed = false;
                s.input.down_pressed = false;
            }
            if s.modes.is_skip() {
                let facts = PacingFacts::gather(&s.modes, &s.input, seen);
                let i = &s.input;
                let cancel = i.right_clicked
                    || i.left_clicked
                    || i.up_pressed
                    || i.down_pressed
                    || i.escape_pressed;
                if !is_skippable(policy, &facts) {
                    s.stop_skip()?;
                } else if cancel {
                    p.play_se(s.config.msgbox.se.skip_cancel.as_deref());
                    s.stop_skip()?;
                    s.input.clear_input_state();
                }
            }
        }

        let name = source.name.map(|n| s.expand(n));
        let voice = source
            .voice
            .map(|v| s.expand(v))
            .filter(|v| !v.is_empty());

        // 文字颜色
        let mut params = LayoutParams::msgbox(&s.config);
        let mut name_color = (params.color, params.outline_color);
        match (seen, s.config.msgbox.seen_color) {
            (true, Some(color)) => {
                let outline = s.config.msgbox.seen_outline_color.unwrap_or(params.outline_color);
                params.color = color;
                params.outline_color = outline;
                name_color = (color, outline);
            }
            _ => {
                if let Some(sc) = name.as_deref().and_then(|n| s.config.serif_color(n)) {
                    name_color = (sc.color, sc.outline_color);
                    if !sc.name_only {
                        params.color = sc.color;
                        params.outline_color = sc.outline_color;
                    }
                }
            }
        }

        // 续行从上一条消息的画笔位置开始
        let mut pen = s.msgbox_pen;
        let (continue_mode, raw) = if page_show {
            (true, s.page.text().to_string())
        } else if let Some(rest) = continuation(source.text) {
            let mut body = rest;
            let mut lf = 0;
            while let Some(next) = body.strip_prefix("\\n") {
                body = next;
                lf += 1;
            }
            if !just_loaded {
                for _ in 0..lf {
                    pen = params.line_feed(pen);
                }
            }
            if s.config.locale != "ja" && lf == 0 {
                pen = params.put_space(pen, p.glyphs.as_ref());
            }
            (true, body.to_string())
        } else {
            (false, source.text.to_string())
        };

        let text = s.expand(&raw);

        if history_control != HistoryControl::NoHistory && !gosub_returned {
            if !continue_mode || page_show {
                s.history.push(HistoryEntry {
                    name: name.clone(),
                    text: text.clone(),
                    voice: voice.clone(),
                });
            } else {
                s.history.append(&text);
            }
        }

        let serif_quote = s.config.msgbox.serif_quote;
        let display = match name.as_deref() {
            Some(n) if s.config.namebox.hidden => {
                concat_serif(n, &text, s.config.locale == "ja" || serif_quote)
            }
            Some(_) if serif_quote && !is_quote_started(&text) => concat_serif("", &text, true),
            _ => text,
        };

        if history_control == HistoryControl::OnlyHistory {
            s.cursor.move_to_next(&s.script);
            return Ok(MessageStart::Skipped { cont: false });
        }

        // 消息框
        if name.is_some() && serif_quote && !params.tategaki && is_quoted_serif(&display) {
            params.indent_for_quote(p.glyphs.as_ref());
        }
        if !continue_mode {
            pen = params.origin();
            p.glyphs.clear(Surface::Msgbox);
        }
        (params.pen_x, params.pen_y) = pen;
        s.stage.msgbox_visible = true;

        let mut dim_params = params.clone();
        dim_params.color = s.config.msgbox.dim_color;
        dim_params.outline_color = s.config.msgbox.dim_outline_color;
        dim_params.ignore = IgnoreFlags::dimming();

        // 台词：语音与名字框
        let facts = PacingFacts::gather(&s.modes, &s.input, seen);
        let mut has_voice = false;
        if let Some(n) = name.as_deref() {
            if let Some(v) = voice.as_deref() {
                if should_play_voice(policy, &facts, false) {
                    p.audio
                        .play(Stream::Voice, v, false)
                        .map_err(|message| RuntimeError::Resource {
                            file: v.to_string(),
                            message,
                        })?;
                    has_voice = true;
                }
            }
            if !s.config.namebox.hidden {
                draw_namebox(n, name_color, s, p);
            }
            s.stage.namebox_visible = !s.config.namebox.hidden;
        } else if !continue_mode {
            s.stage.namebox_visible = false;
        }

        if !s.modes.is_message_active() {
            s.modes.set_message_active()?;
        }

        let layout = LayoutContext::new(&display, params);
        let mut state = MessageState {
            text: display,
            name,
            has_voice,
            seen,
            continue_mode,
            page_show,
            layout,
            dim_params,
            repeating: should_repeat(policy, &facts),
            need_dimming: false,
            reveal_timer: LapTimer::started_at(&s.clock),
            inline_wait: None,
            inline_wait_total: 0.0,
            pause: None,
            paused_secs: 0.0,
            auto_wait: None,
            click: ClickPrompt::new(),
            pointed: None,
            hidden: false,
            sysmenu: SysmenuState::default(),
            from_system_overlay: false,
            will_quick_save: false,
            quick_loaded: false,
            pending: None,
        };
        s.stage.click = None;
        state.pointed = state.adjusted_button(s, p);

        // 没有可显示字符的消息：直接应用其中的指令
        if state.layout.total_chars() == 0 {
            let reveal = state.layout.reveal(0, p.glyphs.as_ref());
            render_events(&reveal.events, Surface::Msgbox, p.glyphs.as_mut());
            s.msgbox_pen = state.layout.pen();
        }

        debug!(
            index = s.cursor.index(),
            chars = state.layout.total_chars(),
            seen,
            "消息开始"
        );
        Ok(MessageStart::Show(Box::new(state)))
    }

    /// 已展开的字符数
    pub fn drawn_chars(&self) -> usize {
        self.layout.drawn_chars()
    }

    /// 字符总数
    pub fn total_chars(&self) -> usize {
        self.layout.total_chars()
    }

    /// 显示文本（已展开变量）
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 是否处于行内等待
    pub fn is_waiting(&self) -> bool {
        self.inline_wait.is_some()
    }

    /// 是否处于点击等待
    pub fn is_click_wait(&self) -> bool {
        self.layout.is_complete() && self.click.is_placed()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_sysmenu_open(&self) -> bool {
        self.sysmenu.open
    }

    pub fn has_voice(&self) -> bool {
        self.has_voice
    }

    /// 执行一帧
    pub fn frame(&mut self, s: &mut Session, p: &mut Platform) -> Result<MessageFrame, RuntimeError> {
        self.pre_process(s, p)?;
        if self.quick_loaded {
            return Ok(MessageFrame::Loaded);
        }
        self.blit_process(s, p);
        self.post_process(s, p);
        if self.repeating {
            return Ok(MessageFrame::Running);
        }
        self.cleanup(s, p)
    }

    /// 从系统覆盖层返回后恢复显示
    pub fn resume_after_overlay(&mut self, s: &mut Session, p: &Platform) {
        self.from_system_overlay = true;
        self.pending = None;
        self.hidden = false;
        self.end_pause(s);
        self.sysmenu = SysmenuState::default();
        s.stage.sysmenu_open = false;
        self.click = ClickPrompt::new();
        self.auto_wait = None;
        self.need_dimming = false;
        self.repeating = true;
        s.stage.msgbox_visible = true;
        if self.name.is_some() && !s.config.namebox.hidden {
            s.stage.namebox_visible = true;
        }
        self.pointed = self.adjusted_button(s, p);
        info!("从系统覆盖层返回消息");
    }

    fn facts(&self, s: &Session) -> PacingFacts {
        PacingFacts::gather(&s.modes, &s.input, self.seen)
    }

    fn gate(&self, s: &Session, p: &Platform) -> ButtonGate {
        ButtonGate {
            sysmenu_open: self.sysmenu.open,
            hidden: self.hidden,
            auto: s.modes.is_auto(),
            skip: s.modes.is_skip(),
            save_load_enabled: s.modes.is_save_load_enabled(),
            has_quick_save: p.saves.has_quick(),
            seen: self.seen,
            skip_unseen: s.config.msgbox.skip_unseen,
        }
    }

    fn adjusted_button(&self, s: &Session, p: &Platform) -> Option<MsgboxButton> {
        let pointed = buttons::pointed_button(&s.config.msgbox, &s.input);
        buttons::adjust(pointed, &self.gate(s, p))
    }

    /// 结束重复；有覆盖层请求时不做暗色重绘
    fn stop(&mut self, s: &Session) {
        if self.pending.is_some() || self.quick_loaded {
            self.repeating = false;
        } else if s.config.msgbox.dim {
            self.need_dimming = true;
        } else {
            self.repeating = false;
        }
    }

    fn begin_pause(&mut self, s: &Session) {
        if self.pause.is_none() {
            self.pause = Some(LapTimer::started_at(&s.clock));
        }
    }

    fn end_pause(&mut self, s: &Session) {
        if let Some(timer) = self.pause.take() {
            self.paused_secs += timer.lap_secs(&s.clock);
        }
    }

    // ------------------------------------------------------------------
    // 前处理
    // ------------------------------------------------------------------

    fn pre_process(&mut self, s: &mut Session, p: &mut Platform) -> Result<(), RuntimeError> {
        if let Some((timer, secs)) = self.inline_wait {
            if s.input.is_wait_cancel() {
                // 未等待的部分不计入展开时间
                let remaining = (secs - timer.lap_secs(&s.clock)).max(0.0);
                self.inline_wait_total -= remaining;
                self.inline_wait = None;
                s.input.clear_input_state();
                return Ok(());
            }
        }

        if self.frame_auto(s, p)? {
            return Ok(());
        }
        if self.frame_buttons(s, p)? {
            return Ok(());
        }
        self.frame_sysmenu(s, p)?;
        Ok(())
    }

    /// auto 模式；返回 true 表示消费了本帧
    fn frame_auto(&mut self, s: &mut Session, p: &mut Platform) -> Result<bool, RuntimeError> {
        if !s.modes.is_auto() {
            return Ok(false);
        }

        let i = &s.input;
        if i.left_clicked || i.right_clicked || i.escape_pressed || i.return_pressed || i.down_pressed {
            p.play_se(s.config.msgbox.se.auto_cancel.as_deref());
            s.input.clear_input_state();
            s.stop_auto()?;
            self.auto_wait = None;
            return Ok(true);
        }

        match self.auto_wait {
            None => {
                let end_of_msg = self.layout.is_complete();
                let ready = if self.from_system_overlay {
                    true
                } else if self.has_voice {
                    end_of_msg && p.audio.is_finished(Stream::Voice)
                } else {
                    end_of_msg
                };
                if ready {
                    let millis = auto_wait_millis(
                        self.has_voice,
                        self.layout.total_chars(),
                        s.config.msgbox.auto_speed,
                        s.config.settings.auto_speed,
                    );
                    self.auto_wait = Some((LapTimer::started_at(&s.clock), millis));
                }
                Ok(false)
            }
            Some((timer, millis)) => {
                if timer.lap_millis(&s.clock) >= millis {
                    self.stop(s);
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// 消息框按钮；返回 true 表示消费了本帧
    fn frame_buttons(&mut self, s: &mut Session, p: &mut Platform) -> Result<bool, RuntimeError> {
        self.pointed = self.adjusted_button(s, p);
        if self.sysmenu.open || s.modes.is_auto() {
            return Ok(false);
        }

        if self.process_hide(s, p) {
            s.input.clear_input_state();
            return Ok(true);
        }
        if self.hidden {
            return Ok(false);
        }

        let mut pressed = if s.input.left_clicked { self.pointed } else { None };
        if s.input.up_pressed {
            pressed = Some(MsgboxButton::History);
        }
        let Some(action) = pressed.and_then(MsgboxButton::action) else {
            return Ok(false);
        };

        p.play_se(s.config.msgbox.se.button.as_deref());
        self.perform(action, s, p)?;
        s.input.clear_input_state();
        Ok(true)
    }

    /// 隐藏与恢复消息框
    fn process_hide(&mut self, s: &mut Session, p: &mut Platform) -> bool {
        let i = &s.input;
        if !self.hidden {
            if i.space_pressed || (i.left_clicked && self.pointed == Some(MsgboxButton::Hide)) {
                p.play_se(s.config.msgbox.se.hide.as_deref());
                self.hide(s);
                return true;
            }
            return false;
        }

        if i.space_pressed || i.return_pressed || i.down_pressed || i.left_clicked || i.right_clicked {
            p.play_se(s.config.msgbox.se.show.as_deref());
            self.show(s);
            return true;
        }
        false
    }

    fn hide(&mut self, s: &mut Session) {
        self.hidden = true;
        s.stage.msgbox_visible = false;
        if self.name.is_some() {
            s.stage.namebox_visible = false;
        }
        s.stage.click = None;
        self.begin_pause(s);
        debug!("消息框隐藏");
    }

    fn show(&mut self, s: &mut Session) {
        self.hidden = false;
        s.stage.msgbox_visible = true;
        if self.name.is_some() && !s.config.namebox.hidden {
            s.stage.namebox_visible = true;
        }
        self.end_pause(s);
        debug!("消息框恢复");
    }

    /// 系统菜单；返回 true 表示消费了本帧
    fn frame_sysmenu(&mut self, s: &mut Session, p: &mut Platform) -> Result<bool, RuntimeError> {
        // 快捷键不论菜单是否展开都有效
        let i = &s.input;
        let save_load = s.modes.is_save_load_enabled();
        let hotkey = if i.s_pressed && save_load {
            Some(MenuAction::Save)
        } else if i.l_pressed && save_load {
            Some(MenuAction::Load)
        } else if i.h_pressed {
            Some(MenuAction::History)
        } else {
            None
        };
        if let Some(action) = hotkey {
            self.perform(action, s, p)?;
            s.input.clear_input_state();
            if self.sysmenu.open {
                self.close_sysmenu(s);
            }
            return Ok(true);
        }

        if !self.sysmenu.open {
            return Ok(self.process_collapsed(s, p));
        }

        let pointed = sysmenu::pointed_item(&s.config.sysmenu, &s.input);
        let i = &s.input;
        if i.right_clicked || i.escape_pressed || (i.left_clicked && pointed.is_none()) {
            p.play_se(s.config.sysmenu.leave_se.as_deref());
            self.close_sysmenu(s);
            s.input.clear_input_state();
            return Ok(true);
        }

        self.sysmenu.pointed = sysmenu::adjust(pointed, &s.config.sysmenu, &self.gate(s, p));
        self.sysmenu.first_frame = false;
        if !s.input.left_clicked {
            return Ok(false);
        }
        let Some(item) = self.sysmenu.pointed else {
            return Ok(false);
        };

        p.play_se(s.config.msgbox.se.button.as_deref());
        self.perform(item.action(), s, p)?;
        self.close_sysmenu(s);
        s.input.clear_input_state();
        Ok(true)
    }

    /// 折叠状态：右键、Esc 或点击入口时展开
    fn process_collapsed(&mut self, s: &mut Session, p: &mut Platform) -> bool {
        if s.config.sysmenu.hidden || self.hidden || s.modes.is_auto() || s.modes.is_skip() {
            return false;
        }
        let i = &s.input;
        let enter = i.right_clicked
            || i.escape_pressed
            || (i.left_clicked && sysmenu::is_collapsed_pointed(&s.config.sysmenu, i));
        if !enter {
            return false;
        }

        s.input.clear_input_state();
        p.play_se(s.config.sysmenu.enter_se.as_deref());
        self.sysmenu = SysmenuState {
            open: true,
            first_frame: true,
            finished: false,
            pointed: None,
        };
        let pointed = sysmenu::pointed_item(&s.config.sysmenu, &s.input);
        self.sysmenu.pointed = sysmenu::adjust(pointed, &s.config.sysmenu, &self.gate(s, p));
        self.pointed = None;
        s.stage.sysmenu_open = true;
        s.stage.click = None;
        self.begin_pause(s);
        debug!("系统菜单展开");
        true
    }

    fn close_sysmenu(&mut self, s: &mut Session) {
        self.sysmenu.open = false;
        self.sysmenu.finished = true;
        self.sysmenu.pointed = None;
        s.stage.sysmenu_open = false;
        self.end_pause(s);
        debug!("系统菜单关闭");
    }

    /// 执行按钮或菜单项动作
    fn perform(&mut self, action: MenuAction, s: &mut Session, p: &mut Platform) -> Result<(), RuntimeError> {
        match action {
            MenuAction::QSave => self.will_quick_save = true,
            MenuAction::QLoad => self.quick_load(s, p)?,
            MenuAction::Save => self.request_overlay(SystemOverlay::Save, p),
            MenuAction::Load => self.request_overlay(SystemOverlay::Load, p),
            MenuAction::Config => self.request_overlay(SystemOverlay::Config, p),
            MenuAction::History => {
                if !s.history.is_empty() {
                    self.request_overlay(SystemOverlay::History, p);
                }
            }
            MenuAction::Auto => {
                s.start_auto()?;
                self.auto_wait = None;
            }
            MenuAction::Skip => s.start_skip()?,
            MenuAction::Custom(slot) => {
                if let Some(label) = sysmenu::custom_gosub(&s.config.sysmenu, slot) {
                    p.audio.stop(Stream::Voice);
                    self.pending = Some(Pending::Custom(label.to_string()));
                }
            }
        }
        Ok(())
    }

    fn request_overlay(&mut self, kind: SystemOverlay, p: &mut Platform) {
        p.audio.stop(Stream::Voice);
        info!(?kind, "请求系统覆盖层");
        self.pending = Some(Pending::Overlay(kind));
    }

    fn quick_load(&mut self, s: &mut Session, p: &mut Platform) -> Result<(), RuntimeError> {
        let Some(data) = p.saves.load_quick()? else {
            warn!("快速存档不存在");
            return Err(RuntimeError::QuickLoadFailed);
        };
        p.audio.stop(Stream::Voice);
        s.restore(data)?;
        self.quick_loaded = true;
        info!("快速读档完成");
        Ok(())
    }

    // ------------------------------------------------------------------
    // 绘制
    // ------------------------------------------------------------------

    fn blit_process(&mut self, s: &mut Session, p: &mut Platform) {
        if self.need_dimming {
            let mut ctx = LayoutContext::new(&self.text, self.dim_params.clone());
            let reveal = ctx.reveal_all(p.glyphs.as_ref());
            render_events(&reveal.events, Surface::Msgbox, p.glyphs.as_mut());
            self.repeating = false;
            return;
        }
        self.blit_frame(s, p);
    }

    fn blit_frame(&mut self, s: &mut Session, p: &mut Platform) {
        if self.hidden || self.sysmenu.open {
            return;
        }

        let policy = s.config.msgbox.skip_unseen;
        if is_canceled_by_skip(policy, &self.facts(s)) {
            p.audio.stop(Stream::Voice);
        }

        if !self.layout.is_complete() {
            if let Some((timer, secs)) = self.inline_wait {
                if timer.lap_secs(&s.clock) >= secs {
                    self.inline_wait = None;
                }
            }
            if self.inline_wait.is_none() {
                self.blit_msgbox(s, p);
            }
        } else if !self.sysmenu.finished {
            self.set_click(s, p);
        }
    }

    fn blit_msgbox(&mut self, s: &mut Session, p: &mut Platform) {
        let (n, draw_all) = self.frame_chars(s);
        let reveal = if draw_all {
            self.layout.reveal_all(p.glyphs.as_ref())
        } else {
            self.layout.reveal(n, p.glyphs.as_ref())
        };
        render_events(&reveal.events, Surface::Msgbox, p.glyphs.as_mut());

        if let Some(secs) = reveal.wait {
            // 结尾的等待在全部展开后不再生效
            if secs > 0.0 && !draw_all && !self.layout.is_complete() {
                self.inline_wait = Some((LapTimer::started_at(&s.clock), secs));
                self.inline_wait_total += secs;
            }
        }

        if self.layout.is_complete() {
            s.msgbox_pen = self.layout.pen();
        }
    }

    /// 本帧展开的字数，以及是否忽略等待全部展开
    fn frame_chars(&mut self, s: &Session) -> (usize, bool) {
        let rest = self.layout.total_chars() - self.layout.drawn_chars();
        if !self.repeating || s.config.msgbox.nowait {
            return (rest, true);
        }
        if self.will_quick_save || self.pending.is_some() {
            return (rest, true);
        }

        let facts = self.facts(s);
        if is_canceled_by_skip(s.config.msgbox.skip_unseen, &facts) {
            self.stop(s);
            return (rest, true);
        }

        let i = &s.input;
        let fast_forward = i.return_pressed
            || i.down_pressed
            || (i.left_clicked && self.pointed.is_none());
        if !facts.non_interruptible && fast_forward {
            self.layout.set_ignore_wait();
            return (rest, true);
        }

        let lap = self.reveal_timer.lap_secs(&s.clock) - self.inline_wait_total - self.paused_secs;
        let n = chars_by_lap(
            s.config.msgbox.speed,
            s.config.settings.text_speed,
            lap,
            self.layout.drawn_chars(),
            self.layout.total_chars(),
        );
        (n, false)
    }

    /// 点击等待
    fn set_click(&mut self, s: &mut Session, p: &mut Platform) {
        if self.continue_mode && self.layout.total_chars() == 0 {
            if self.repeating {
                self.stop(s);
            }
            return;
        }

        if self.click_finished(s, p) {
            self.stop(s);
        }

        let msgbox = &s.config.msgbox;
        self.click
            .place(&msgbox.click, msgbox.rect, self.layout.pen(), &s.clock);
        s.stage.click = Some(self.click.indicator(&msgbox.click, &s.clock));
    }

    fn click_finished(&self, s: &Session, p: &Platform) -> bool {
        let facts = self.facts(s);
        let i = &s.input;
        let collapsed = !s.config.sysmenu.hidden
            && !facts.auto
            && !facts.skip
            && sysmenu::is_collapsed_pointed(&s.config.sysmenu, i);
        ClickWaitFacts {
            skip: facts.skip,
            auto: facts.auto,
            control: facts.control,
            skippable: is_skippable(s.config.msgbox.skip_unseen, &facts),
            non_interruptible: facts.non_interruptible,
            has_voice: self.has_voice,
            voice_finished: p.audio.is_finished(Stream::Voice),
            from_system_overlay: self.from_system_overlay,
            free_click: i.left_clicked && self.pointed.is_none() && !collapsed,
            advance_key: i.return_pressed || i.down_pressed,
        }
        .should_finish()
    }

    // ------------------------------------------------------------------
    // 后处理与清理
    // ------------------------------------------------------------------

    fn post_process(&mut self, s: &mut Session, p: &mut Platform) {
        if self.will_quick_save {
            self.will_quick_save = false;
            match p.saves.save_quick(&s.snapshot()) {
                Ok(()) => info!("快速存档完成"),
                Err(e) => warn!(error = %e, "快速存档失败"),
            }
        }
        if self.pending.is_some() && self.repeating {
            self.stop(s);
        }
        self.sysmenu.finished = false;
    }

    fn cleanup(&mut self, s: &mut Session, p: &mut Platform) -> Result<MessageFrame, RuntimeError> {
        s.msgbox_pen = self.layout.pen();
        p.audio.stop(Stream::Voice);
        s.stage.click = None;

        let overlay = match &self.pending {
            Some(Pending::Overlay(kind)) => Some(*kind),
            _ => None,
        };
        if overlay.is_none() {
            s.modes.clear_message_active()?;
        }

        s.mark_current_seen();
        if self.page_show {
            s.page.clear();
        }

        match self.pending.take() {
            Some(Pending::Overlay(kind)) => Ok(MessageFrame::Overlay(kind)),
            Some(Pending::Custom(label)) => {
                s.cursor.push_return_point_here();
                s.sysmenu_gosub = Some(s.cursor.depth());
                s.cursor.move_to_label(&s.script, &label)?;
                info!(label, "执行系统菜单子程序");
                Ok(MessageFrame::Finished)
            }
            None => {
                debug!(index = s.cursor.index(), "消息结束");
                s.cursor.move_to_next(&s.script);
                Ok(MessageFrame::Finished)
            }
        }
    }
}

/// 绘制名字框
fn draw_namebox(name: &str, (color, outline): (Color, Color), s: &Session, p: &mut Platform) {
    let namebox = &s.config.namebox;
    let mut params = LayoutParams::msgbox(&s.config);
    params.area_width = namebox.rect.w;
    params.area_height = namebox.rect.h;
    params.margins = Margins::default();
    params.fill = None;
    params.color = color;
    params.outline_color = outline;

    let extent: i32 = name
        .chars()
        .map(|c| {
            let m = p.glyphs.measure(params.font, params.font_size, c);
            if params.tategaki { m.height } else { m.advance }
        })
        .sum();
    (params.pen_x, params.pen_y) = match (namebox.centering, params.tategaki) {
        (true, false) => ((namebox.rect.w - extent) / 2, namebox.margin_top),
        (true, true) => (namebox.margin_left, (namebox.rect.h - extent) / 2),
        (false, _) => (namebox.margin_left, namebox.margin_top),
    };

    p.glyphs.clear(Surface::Namebox);
    let mut ctx = LayoutContext::new(name, params);
    let reveal = ctx.reveal_all(p.glyphs.as_ref());
    render_events(&reveal.events, Surface::Namebox, p.glyphs.as_mut());
}
