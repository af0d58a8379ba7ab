//! # Layout 模块
//!
//! 逐字展开消息的排版状态机。
//!
//! ## 设计说明
//!
//! [`LayoutContext`] 持有分词结果和画笔状态，[`LayoutContext::reveal`] 每次
//! 展开若干字符并返回 [`LayoutEvent`] 序列；它只调用
//! [`GlyphRasterizer::measure`]，不做任何绘制。调用方把事件交给
//! [`render_events`] 绘制到目标表面。
//!
//! ## 换行规则
//!
//! - 放置字符前若剩余宽度（竖排为高度）不足则换行
//! - 行首禁则字符溢出时挂在行尾，不换行
//! - 若下一个字符是行首禁则字符且会溢出，则推迟一次换行；
//!   推迟只生效一次，紧随其后的第二个禁则字符照常换行
//! - 行尾禁则字符（开括号）之后的字符放不下时，开括号提前换行
//! - 竖排使用纵向字形，禁则规则相同
//! - 横排时空格之后的西文单词放不下则整词换行

use serde::Serialize;
use tracing::warn;

use super::kinsoku::{is_gyomatsu, is_gyoto, is_small_kana, is_tategaki_punctuation, is_word_char, to_tategaki};
use super::tokenizer::{BackgroundFill, Directive, Token, count_chars, tokenize};
use crate::config::{Color, EmoticonConfig, EngineConfig, Rect};
use crate::platform::{FontSelect, GlyphMetrics, GlyphRasterizer, GlyphStyle, Surface};

/// 四周边距
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Margins {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// 忽略指定种类的指令
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreFlags {
    pub linefeed: bool,
    pub font: bool,
    pub outline: bool,
    pub color: bool,
    pub size: bool,
    pub position: bool,
    pub ruby: bool,
    pub wait: bool,
}

impl IgnoreFlags {
    /// 暗色重绘：保持暗色，不等待
    pub fn dimming() -> Self {
        Self {
            color: true,
            wait: true,
            ..Self::default()
        }
    }
}

/// 排版参数（每条消息开始时确定）
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    pub font: FontSelect,
    pub font_size: u32,
    pub ruby_size: u32,
    pub color: Color,
    pub outline_color: Color,
    pub outline: bool,
    pub outline_width: u32,
    pub pen_x: i32,
    pub pen_y: i32,
    pub area_width: i32,
    pub area_height: i32,
    pub margins: Margins,
    pub line_margin: i32,
    pub char_margin: i32,
    /// 默认背景填充
    pub fill: Option<Color>,
    pub tategaki: bool,
    pub ignore: IgnoreFlags,
    pub emoticons: Vec<EmoticonConfig>,
}

impl LayoutParams {
    /// 消息框的排版参数，画笔位于起始位置
    pub fn msgbox(config: &EngineConfig) -> Self {
        let msgbox = &config.msgbox;
        let mut params = Self {
            font: FontSelect::Global,
            font_size: config.font.size,
            ruby_size: config.font.ruby_size,
            color: config.font.color,
            outline_color: config.font.outline_color,
            outline: config.font.outline,
            outline_width: config.font.outline_width,
            pen_x: 0,
            pen_y: 0,
            area_width: msgbox.rect.w,
            area_height: msgbox.rect.h,
            margins: Margins {
                left: msgbox.margin_left,
                right: msgbox.margin_right,
                top: msgbox.margin_top,
                bottom: msgbox.margin_bottom,
            },
            line_margin: msgbox.margin_line,
            char_margin: msgbox.margin_char,
            fill: msgbox.fill,
            tategaki: msgbox.tategaki,
            ignore: IgnoreFlags::default(),
            emoticons: config.emoticons.clone(),
        };
        let (x, y) = params.origin();
        params.pen_x = x;
        params.pen_y = y;
        params
    }

    /// 页首的画笔位置
    pub fn origin(&self) -> (i32, i32) {
        if self.tategaki {
            (
                self.area_width - self.margins.right - self.font_size as i32,
                self.margins.top,
            )
        } else {
            (self.margins.left, self.margins.top)
        }
    }

    /// 从 `pen` 换到下一行（竖排为左侧的下一列）
    pub fn line_feed(&self, pen: (i32, i32)) -> (i32, i32) {
        if self.tategaki {
            (pen.0 - self.line_margin, self.margins.top)
        } else {
            (self.margins.left, pen.1 + self.line_margin)
        }
    }

    /// 在 `pen` 处空出一个半角空格，放不下时换行
    pub fn put_space(&self, pen: (i32, i32), metrics: &dyn GlyphRasterizer) -> (i32, i32) {
        let space = metrics.measure(self.font, self.font_size, ' ');
        if self.tategaki {
            if pen.1 + space.height >= self.area_height - self.margins.bottom {
                self.line_feed(pen)
            } else {
                (pen.0, pen.1 + space.height)
            }
        } else if pen.0 + space.advance >= self.area_width - self.margins.right {
            self.line_feed(pen)
        } else {
            (pen.0 + space.advance, pen.1)
        }
    }

    /// 带引号的台词：左边距缩进一个全角空格
    pub fn indent_for_quote(&mut self, metrics: &dyn GlyphRasterizer) {
        if !self.tategaki {
            self.margins.left += metrics.measure(self.font, self.font_size, '　').advance;
        }
    }
}

/// 排版事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayoutEvent {
    /// 正文字形
    Glyph {
        x: i32,
        y: i32,
        c: char,
        style: GlyphStyle,
    },
    /// 注音字形
    Ruby {
        x: i32,
        y: i32,
        c: char,
        style: GlyphStyle,
    },
    Emoticon {
        x: i32,
        y: i32,
        file: String,
    },
    /// 字符背景填充
    Fill { rect: Rect, color: Color },
    /// 换行后的画笔位置
    LineBreak { x: i32, y: i32 },
    /// 行内等待（秒）
    Wait(f32),
}

/// 一次展开的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reveal {
    pub events: Vec<LayoutEvent>,
    /// 本次展开的字符数
    pub revealed: usize,
    /// 遇到行内等待时的等待秒数
    pub wait: Option<f32>,
}

impl Reveal {
    pub fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }
}

/// 消息排版上下文
#[derive(Debug, Clone)]
pub struct LayoutContext {
    tokens: Vec<Token>,
    pos: usize,
    params: LayoutParams,

    pen_x: i32,
    pen_y: i32,
    font: FontSelect,
    size: u32,
    base_size: u32,
    color: Color,
    outline_color: Color,
    outline: bool,
    margins: Margins,
    line_margin: i32,
    fill: Option<Color>,
    ruby_x: i32,
    ruby_y: i32,

    line_top: bool,
    after_space: bool,
    gyoto_pending: bool,
    gyoto_second: bool,

    total_chars: usize,
    drawn_chars: usize,
    /// 区域已满，之后的字符只计数不放置
    overflowed: bool,
}

impl LayoutContext {
    pub fn new(text: &str, params: LayoutParams) -> Self {
        let tokens = tokenize(text);
        let total_chars = count_chars(&tokens);
        Self {
            tokens,
            pos: 0,
            pen_x: params.pen_x,
            pen_y: params.pen_y,
            font: params.font,
            size: params.font_size,
            base_size: params.font_size,
            color: params.color,
            outline_color: params.outline_color,
            outline: params.outline,
            margins: params.margins,
            line_margin: params.line_margin,
            fill: params.fill,
            ruby_x: 0,
            ruby_y: 0,
            line_top: true,
            after_space: true,
            gyoto_pending: false,
            gyoto_second: false,
            total_chars,
            drawn_chars: 0,
            overflowed: false,
            params,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn drawn_chars(&self) -> usize {
        self.drawn_chars
    }

    /// 全部字符已展开
    pub fn is_complete(&self) -> bool {
        self.drawn_chars == self.total_chars
    }

    pub fn pen(&self) -> (i32, i32) {
        (self.pen_x, self.pen_y)
    }

    /// 之后遇到的行内等待全部忽略（快进）
    pub fn set_ignore_wait(&mut self) {
        self.params.ignore.wait = true;
    }

    /// 展开最多 `n` 个字符
    ///
    /// 在字符之前（以及结尾处）的指令会被一并处理。遇到行内等待时提前返回，
    /// `revealed` 小于请求值，`wait` 为等待秒数。
    pub fn reveal(&mut self, n: usize, metrics: &dyn GlyphRasterizer) -> Reveal {
        let mut out = Reveal::default();
        let budget = n.min(self.total_chars - self.drawn_chars);
        if budget == 0 {
            // 字符已全部展开时仍要处理结尾（或只有）指令
            if self.is_complete() {
                out.wait = self.process_directives(metrics, &mut out.events);
            }
            return out;
        }

        let mut placed = 0;
        while placed < budget {
            if let Some(secs) = self.process_directives(metrics, &mut out.events) {
                self.drawn_chars += placed;
                out.revealed = placed;
                out.wait = Some(secs);
                return out;
            }
            let Some(Token::Char(c)) = self.tokens.get(self.pos) else {
                break;
            };
            let c = *c;
            if !self.overflowed {
                self.place_char(c, metrics, &mut out.events);
            }
            self.pos += 1;
            placed += 1;
        }

        out.wait = self.process_directives(metrics, &mut out.events);
        self.drawn_chars += placed;
        out.revealed = placed;
        out
    }

    /// 展开剩余全部字符（忽略行内等待）
    pub fn reveal_all(&mut self, metrics: &dyn GlyphRasterizer) -> Reveal {
        self.set_ignore_wait();
        self.reveal(usize::MAX, metrics)
    }

    fn style(&self, size: u32) -> GlyphStyle {
        GlyphStyle {
            font: self.font,
            size,
            color: self.color,
            outline: self
                .outline
                .then_some((self.outline_color, self.params.outline_width)),
        }
    }

    /// 处理当前位置连续的指令，返回累计的行内等待
    fn process_directives(
        &mut self,
        metrics: &dyn GlyphRasterizer,
        events: &mut Vec<LayoutEvent>,
    ) -> Option<f32> {
        let mut wait: Option<f32> = None;
        while let Some(Token::Directive(d)) = self.tokens.get(self.pos) {
            let d = d.clone();
            self.pos += 1;
            if let Some(secs) = self.apply(d, metrics, events) {
                *wait.get_or_insert(0.0) += secs;
            }
        }
        if let Some(secs) = wait {
            events.push(LayoutEvent::Wait(secs));
        }
        wait
    }

    fn apply(
        &mut self,
        directive: Directive,
        metrics: &dyn GlyphRasterizer,
        events: &mut Vec<LayoutEvent>,
    ) -> Option<f32> {
        let ignore = self.params.ignore;
        match directive {
            Directive::Center => {
                let width = self.rest_of_line_width(metrics);
                if self.params.tategaki {
                    self.pen_y = (self.params.area_height - width) / 2;
                } else {
                    self.pen_x = (self.params.area_width - width) / 2;
                }
            }
            Directive::Right => {
                let width = self.rest_of_line_width(metrics);
                if self.params.tategaki {
                    self.pen_y = self.params.area_height - self.margins.bottom - width;
                } else {
                    self.pen_x = self.params.area_width - self.margins.right - width - 1;
                }
            }
            Directive::Left => {
                if self.params.tategaki {
                    self.pen_y = self.margins.top;
                } else {
                    self.pen_x = self.margins.left;
                }
            }
            Directive::LineFeed => {
                if !ignore.linefeed {
                    self.advance_line();
                    events.push(LayoutEvent::LineBreak {
                        x: self.pen_x,
                        y: self.pen_y,
                    });
                }
            }
            Directive::Font(font) => {
                if let (false, Some(font)) = (ignore.font, font) {
                    self.font = font;
                }
            }
            Directive::Outline(outline) => {
                if let (false, Some(outline)) = (ignore.outline, outline) {
                    self.outline = outline;
                }
            }
            Directive::Color(color) => {
                if !ignore.color {
                    self.color = color.unwrap_or(self.params.color);
                }
            }
            Directive::Size { size, base } => {
                if !ignore.size {
                    self.size = size;
                    if base {
                        self.base_size = size;
                    }
                }
            }
            Directive::Wait(secs) => {
                if !ignore.wait && secs > 0.0 {
                    return Some(secs);
                }
            }
            Directive::Pen { x, y } => {
                if !ignore.position {
                    self.pen_x = x;
                    self.pen_y = y;
                }
            }
            Directive::Ruby(text) => {
                if !ignore.ruby {
                    self.place_ruby(&text, metrics, events);
                }
            }
            Directive::Emoticon(name) => self.place_emoticon(&name, events),
            Directive::LineMargin(margin) => self.line_margin = margin,
            Directive::Margins { left, top } => {
                if !ignore.position {
                    if self.params.tategaki {
                        self.margins.right = left;
                    } else {
                        self.margins.left = left;
                    }
                    self.margins.top = top;
                    self.pen_x = left;
                    self.pen_y = top;
                }
            }
            Directive::Background(fill) => match fill {
                BackgroundFill::Default => self.fill = self.params.fill,
                BackgroundFill::Off => self.fill = None,
                BackgroundFill::Color(color) => {
                    if !ignore.color {
                        self.fill = Some(color);
                    }
                }
            },
        }
        None
    }

    /// 从当前位置到行末（`\n`）的宽度
    fn rest_of_line_width(&self, metrics: &dyn GlyphRasterizer) -> i32 {
        let mut width = 0;
        for token in &self.tokens[self.pos..] {
            match token {
                Token::Char(c) => width += metrics.measure(self.font, self.size, *c).advance,
                Token::Directive(Directive::LineFeed) | Token::Malformed { .. } => break,
                Token::Directive(_) => {}
            }
        }
        width
    }

    /// 从当前位置开始的西文单词宽度
    fn word_width(&self, metrics: &dyn GlyphRasterizer) -> i32 {
        self.tokens[self.pos..]
            .iter()
            .map_while(|t| match t {
                Token::Char(c) if is_word_char(*c) => Some(*c),
                _ => None,
            })
            .map(|c| metrics.measure(self.font, self.size, c).advance)
            .sum()
    }

    /// 显式换行
    fn advance_line(&mut self) {
        if self.params.tategaki {
            self.pen_x -= self.line_margin;
            self.pen_y = self.margins.top;
        } else {
            self.pen_y += self.line_margin;
            self.pen_x = self.margins.left;
        }
    }

    /// 因宽度不足换行；返回 false 表示无法继续放置
    fn wrap_line(&mut self, events: &mut Vec<LayoutEvent>) -> bool {
        if self.params.ignore.linefeed && self.line_margin == 0 {
            return false;
        }
        self.advance_line();
        self.line_top = true;
        events.push(LayoutEvent::LineBreak {
            x: self.pen_x,
            y: self.pen_y,
        });
        if self.params.tategaki {
            self.pen_x + self.line_margin >= 0
        } else {
            self.pen_y + self.line_margin < self.params.area_height
        }
    }

    /// 横排整词换行
    fn word_wrap(&mut self, metrics: &dyn GlyphRasterizer, events: &mut Vec<LayoutEvent>) -> bool {
        if self.params.tategaki {
            return true;
        }
        if self.after_space {
            let limit = self.params.area_width - self.margins.right;
            if self.pen_x + self.word_width(metrics) >= limit {
                if self.params.ignore.linefeed {
                    return false;
                }
                self.advance_line();
                events.push(LayoutEvent::LineBreak {
                    x: self.pen_x,
                    y: self.pen_y,
                });
            }
        }
        self.after_space = matches!(self.tokens.get(self.pos), Some(Token::Char(' ')));
        true
    }

    /// 禁则处理：决定放置 `c` 前是否换行
    fn break_before(
        &mut self,
        c: char,
        m: GlyphMetrics,
        next: Option<(char, GlyphMetrics)>,
        events: &mut Vec<LayoutEvent>,
    ) -> bool {
        let line_top = self.line_top;
        let gyoto_second = self.gyoto_second;
        self.line_top = false;
        self.gyoto_second = false;

        // 上一个字符推迟了换行
        if self.gyoto_pending {
            self.gyoto_pending = false;
            self.gyoto_second = true;
            return !(self.params.ignore.linefeed && self.line_margin == 0);
        }

        let cm = self.params.char_margin;
        let (pos, extent, limit) = if self.params.tategaki {
            (self.pen_y, m.height, self.params.area_height - self.margins.bottom)
        } else {
            (self.pen_x, m.advance, self.params.area_width - self.margins.right)
        };

        if pos + extent + cm >= limit {
            if is_gyoto(c) && !line_top && !gyoto_second {
                return true;
            }
            return self.wrap_line(events);
        }

        if line_top {
            return true;
        }
        let Some((n, nm)) = next else {
            return true;
        };
        let next_extent = if self.params.tategaki { nm.height } else { nm.advance };
        if pos + extent + cm + next_extent + cm < limit {
            return true;
        }
        // 开括号不留在行尾，与下一个字符一起换行
        if is_gyomatsu(c) {
            return self.wrap_line(events);
        }
        if is_gyoto(n) {
            self.gyoto_pending = true;
        }
        true
    }

    fn place_char(&mut self, c: char, metrics: &dyn GlyphRasterizer, events: &mut Vec<LayoutEvent>) {
        if !self.word_wrap(metrics, events) {
            self.overflowed = true;
            return;
        }

        let next = match self.tokens.get(self.pos + 1) {
            Some(Token::Char(n)) => Some(*n),
            _ => None,
        };
        let tategaki = self.params.tategaki;
        let (c, next) = if tategaki {
            (to_tategaki(c), next.map(to_tategaki))
        } else {
            (c, next)
        };

        let m = metrics.measure(self.font, self.size, c);
        let next = next.map(|n| (n, metrics.measure(self.font, self.size, n)));
        if !self.break_before(c, m, next, events) {
            self.overflowed = true;
            return;
        }

        let size = self.size as i32;
        let (ofs_x, ofs_y) = if tategaki && is_small_kana(c) {
            (size / 10, -size / 6)
        } else if !tategaki {
            // 小于基准字号时底部对齐
            (0, (self.base_size as i32 - size).max(0))
        } else {
            (0, 0)
        };

        if let Some(color) = self.fill {
            events.push(LayoutEvent::Fill {
                rect: Rect::new(self.pen_x, self.pen_y, size, self.line_margin),
                color,
            });
        }
        events.push(LayoutEvent::Glyph {
            x: self.pen_x + ofs_x,
            y: self.pen_y + ofs_y,
            c,
            style: self.style(self.size),
        });

        if tategaki {
            self.ruby_x = self.pen_x + m.advance;
            self.ruby_y = self.pen_y;
            let step = if is_tategaki_punctuation(c) { size } else { m.height };
            self.pen_y += step + self.params.char_margin;
        } else {
            self.ruby_x = self.pen_x;
            self.ruby_y = self.pen_y - self.params.ruby_size as i32;
            self.pen_x += m.advance + self.params.char_margin;
        }
    }

    /// 注音绘制在上一个字符的位置
    fn place_ruby(&mut self, text: &str, metrics: &dyn GlyphRasterizer, events: &mut Vec<LayoutEvent>) {
        let style = self.style(self.params.ruby_size);
        for c in text.chars() {
            let m = metrics.measure(self.font, self.params.ruby_size, c);
            events.push(LayoutEvent::Ruby {
                x: self.ruby_x,
                y: self.ruby_y,
                c,
                style,
            });
            if self.params.tategaki {
                self.ruby_y += m.height;
            } else {
                self.ruby_x += m.advance;
            }
        }
    }

    fn place_emoticon(&mut self, name: &str, events: &mut Vec<LayoutEvent>) {
        let Some(emoticon) = self.params.emoticons.iter().find(|e| e.name == name) else {
            warn!(name, "未定义的表情符号，之后的文本不显示");
            self.overflowed = true;
            return;
        };
        let (w, h, file) = (emoticon.width, emoticon.height, emoticon.file.clone());
        if self.overflowed {
            return;
        }

        self.line_top = false;
        let cm = self.params.char_margin;
        let overflow = if self.params.tategaki {
            self.pen_y + h + cm >= self.params.area_height - self.margins.bottom
        } else {
            self.pen_x + w + cm >= self.params.area_width - self.margins.right
        };
        if overflow && !self.wrap_line(events) {
            self.overflowed = true;
            return;
        }

        events.push(LayoutEvent::Emoticon {
            x: self.pen_x,
            y: self.pen_y,
            file,
        });
        if self.params.tategaki {
            self.pen_y += h + cm;
        } else {
            self.pen_x += w + cm;
        }
    }
}

/// 把排版事件绘制到目标表面
pub fn render_events(events: &[LayoutEvent], target: Surface, glyphs: &mut dyn GlyphRasterizer) {
    for event in events {
        match event {
            LayoutEvent::Glyph { x, y, c, style } | LayoutEvent::Ruby { x, y, c, style } => {
                glyphs.render(target, *x, *y, *c, style);
            }
            LayoutEvent::Emoticon { x, y, file } => glyphs.draw_image(target, *x, *y, file),
            LayoutEvent::Fill { rect, color } => glyphs.fill_rect(target, *rect, *color),
            LayoutEvent::LineBreak { .. } | LayoutEvent::Wait(_) => {}
        }
    }
}

/// 字符放置位置（测试与快照用）
pub fn glyph_positions(events: &[LayoutEvent]) -> Vec<(char, i32, i32)> {
    events
        .iter()
        .filter_map(|e| match e {
            LayoutEvent::Glyph { x, y, c, .. } => Some((*c, *x, *y)),
            _ => None,
        })
        .collect()
}
