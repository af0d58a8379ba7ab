//! # Tokenizer 模块
//!
//! 把消息字符串切分为字符与转义指令。
//!
//! ## 指令语法
//!
//! | 写法 | 含义 |
//! |------|------|
//! | `\c` `\r` `\l` | 居中 / 右对齐 / 左对齐 |
//! | `\n` | 换行 |
//! | `\f{g\|m\|a\|b}` | 字体 |
//! | `\o{+\|-}` | 描边开关 |
//! | `\#{RRGGBB}` / `\#{DEF}` | 文字颜色 |
//! | `\@{n}` / `\@{!n}` | 字号（`!` 同时修改基准字号） |
//! | `\w{f}` | 行内等待（秒） |
//! | `\p{x,y}` | 移动画笔 |
//! | `\^{..}` | 注音（ruby） |
//! | `\e{name}` | 表情符号 |
//! | `\L{n}` | 行间距 |
//! | `\M{x,y}` | 左/上边距 |
//! | `\k{RRGGBB}` / `\k{DEF}` / `\k{OFF}` | 文字背景填充 |
//!
//! 不合法的指令产生 [`Token::Malformed`]，之后不再产生任何 token，
//! 布局在此处停止。

use serde::Serialize;

use crate::config::Color;
use crate::platform::FontSelect;

/// `\@{..}` 的最大载荷长度（字节）
const SIZE_PAYLOAD_MAX: usize = 7;
/// `\w{..}` 的最大载荷长度
const WAIT_PAYLOAD_MAX: usize = 15;
/// `\p{..}` `\L{..}` `\M{..}` 的最大载荷长度
const SHORT_PAYLOAD_MAX: usize = 31;
/// `\^{..}` 的最大载荷长度
const RUBY_PAYLOAD_MAX: usize = 63;
/// `\e{..}` 的最大载荷长度
const EMOTICON_PAYLOAD_MAX: usize = 255;

/// 背景填充指令
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BackgroundFill {
    /// 恢复配置的默认填充
    Default,
    /// 关闭填充
    Off,
    /// 指定颜色填充
    Color(Color),
}

/// 转义指令
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Directive {
    Center,
    Right,
    Left,
    LineFeed,
    /// 字体；未知字母为 None（不改变字体）
    Font(Option<FontSelect>),
    /// 描边；未知符号为 None（不改变）
    Outline(Option<bool>),
    /// 文字颜色；None 表示恢复默认
    Color(Option<Color>),
    /// 字号；`base` 为真时同时修改基准字号
    Size { size: u32, base: bool },
    /// 行内等待（秒）
    Wait(f32),
    Pen { x: i32, y: i32 },
    Ruby(String),
    Emoticon(String),
    LineMargin(i32),
    Margins { left: i32, top: i32 },
    Background(BackgroundFill),
}

/// 词法单元
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Token {
    /// 可显示字符
    Char(char),
    /// 转义指令
    Directive(Directive),
    /// 不合法的指令（终止）
    Malformed {
        /// 指令在原文中的字节偏移
        offset: usize,
    },
}

/// 判断 `\` 之后的字符是否为指令字母
pub fn is_directive_letter(c: char) -> bool {
    matches!(
        c,
        'c' | 'r' | 'l' | 'n' | 'f' | 'o' | '#' | '@' | 'w' | 'p' | 'e' | '^' | 'L' | 'M' | 'k'
    )
}

/// 消息分词器
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            done: false,
        }
    }

    /// 读取 `{...}` 载荷，返回 (载荷, 指令总长度)
    fn payload(&self, max: usize) -> Option<(&'a str, usize)> {
        let rest = &self.src[self.pos + 2..];
        let body = rest.strip_prefix('{')?;
        let end = body.find('}')?;
        if end > max {
            return None;
        }
        Some((&body[..end], 2 + 1 + end + 1))
    }

    fn parse_directive(&self, letter: char) -> Option<(Directive, usize)> {
        match letter {
            'c' => Some((Directive::Center, 2)),
            'r' => Some((Directive::Right, 2)),
            'l' => Some((Directive::Left, 2)),
            'n' => Some((Directive::LineFeed, 2)),
            'f' => {
                let (p, len) = self.single_char_payload()?;
                let font = match p {
                    'g' => Some(FontSelect::Global),
                    'm' => Some(FontSelect::Main),
                    'a' => Some(FontSelect::Alt1),
                    'b' => Some(FontSelect::Alt2),
                    _ => None,
                };
                Some((Directive::Font(font), len))
            }
            'o' => {
                let (p, len) = self.single_char_payload()?;
                let outline = match p {
                    '+' => Some(true),
                    '-' => Some(false),
                    _ => None,
                };
                Some((Directive::Outline(outline), len))
            }
            '#' => {
                let (p, len) = self.payload(6)?;
                let color = match p {
                    "DEF" => None,
                    hex => Some(Color::from_hex(hex)?),
                };
                Some((Directive::Color(color), len))
            }
            'k' => {
                let (p, len) = self.payload(6)?;
                let fill = match p {
                    "DEF" => BackgroundFill::Default,
                    "OFF" => BackgroundFill::Off,
                    hex => BackgroundFill::Color(Color::from_hex(hex)?),
                };
                Some((Directive::Background(fill), len))
            }
            '@' => {
                let (p, len) = self.payload(SIZE_PAYLOAD_MAX)?;
                let (digits, base) = match p.strip_prefix('!') {
                    Some(d) => (d, true),
                    None => (p, false),
                };
                let size = digits.trim().parse::<u32>().ok()?;
                Some((Directive::Size { size, base }, len))
            }
            'w' => {
                let (p, len) = self.payload(WAIT_PAYLOAD_MAX)?;
                let secs = p.trim().parse::<f32>().ok().filter(|s| s.is_finite())?;
                Some((Directive::Wait(secs), len))
            }
            'p' => {
                let (p, len) = self.payload(SHORT_PAYLOAD_MAX)?;
                let (x, y) = parse_pair(p)?;
                Some((Directive::Pen { x, y }, len))
            }
            'M' => {
                let (p, len) = self.payload(SHORT_PAYLOAD_MAX)?;
                let (left, top) = parse_pair(p)?;
                Some((Directive::Margins { left, top }, len))
            }
            'L' => {
                let (p, len) = self.payload(SHORT_PAYLOAD_MAX)?;
                let margin = p.trim().parse::<i32>().ok()?;
                Some((Directive::LineMargin(margin), len))
            }
            '^' => {
                let (p, len) = self.payload(RUBY_PAYLOAD_MAX)?;
                Some((Directive::Ruby(p.to_string()), len))
            }
            'e' => {
                let (p, len) = self.payload(EMOTICON_PAYLOAD_MAX)?;
                Some((Directive::Emoticon(p.to_string()), len))
            }
            _ => None,
        }
    }

    /// `\f{X}` `\o{X}`：恰好一个字符
    fn single_char_payload(&self) -> Option<(char, usize)> {
        let rest = &self.src[self.pos + 2..];
        let body = rest.strip_prefix('{')?;
        let mut chars = body.chars();
        let c = chars.next()?;
        if chars.next()? != '}' {
            return None;
        }
        Some((c, 2 + 1 + c.len_utf8() + 1))
    }
}

fn parse_pair(p: &str) -> Option<(i32, i32)> {
    let (a, b) = p.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let mut rest = self.src[self.pos..].chars();
        let c = rest.next()?;

        if c != '\\' {
            self.pos += c.len_utf8();
            return Some(Token::Char(c));
        }

        let offset = self.pos;
        let parsed = rest.next().and_then(|letter| self.parse_directive(letter));
        match parsed {
            Some((directive, len)) => {
                self.pos += len;
                Some(Token::Directive(directive))
            }
            None => {
                self.done = true;
                Some(Token::Malformed { offset })
            }
        }
    }
}

/// 分词整条消息
pub fn tokenize(src: &str) -> Vec<Token> {
    let tokens: Vec<Token> = Tokenizer::new(src).collect();
    if let Some(Token::Malformed { offset }) = tokens.last() {
        tracing::warn!(offset = *offset, text = src, "消息中存在不合法的转义指令，之后的文本不显示");
    }
    tokens
}

/// 统计可显示字符数（不含指令；遇到不合法指令时停止）
pub fn count_chars(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .take_while(|t| !matches!(t, Token::Malformed { .. }))
        .filter(|t| matches!(t, Token::Char(_)))
        .count()
}
