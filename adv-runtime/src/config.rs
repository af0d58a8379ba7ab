//! # Config 模块
//!
//! 引擎配置，集中管理消息框、系统菜单、字体等所有可调项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高，由 Host 覆盖）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）
//!
//! 所有字段都带 `#[serde(default)]`，配置文件只需写出与默认值不同的部分。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 矩形区域
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// 点是否在矩形内
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    /// 平移
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// RGB 颜色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 解析 `RRGGBB` 形式（不带 `#`）
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let v = u32::from_str_radix(s, 16).ok()?;
        Some(Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }
}

/// skip 模式可跳过的范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipUnseen {
    /// 只能跳过已读消息
    #[default]
    SeenOnly,
    /// 可以跳过所有消息
    Always,
    /// Ctrl 可以跳过所有消息，skip 模式只能跳过已读消息
    ControlAlways,
}

/// 背景过渡期间消息框的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxOnBackground {
    /// 随过渡一起淡出
    #[default]
    FadeOut,
    /// 保持显示
    Keep,
    /// 过渡开始前立即隐藏
    Hide,
}

/// 历史记录的显示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryControl {
    /// 正常显示并记录
    #[default]
    Normal,
    /// 只记录到历史，不显示
    OnlyHistory,
    /// 显示但不记录到历史
    NoHistory,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 当前语言（匹配命令的本地化标签）
    #[serde(default = "default_locale")]
    pub locale: String,

    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 字体配置
    #[serde(default)]
    pub font: FontConfig,

    /// 消息框配置
    #[serde(default)]
    pub msgbox: MsgboxConfig,

    /// 名字框配置
    #[serde(default)]
    pub namebox: NameboxConfig,

    /// 系统菜单配置
    #[serde(default)]
    pub sysmenu: SysmenuConfig,

    /// 表情符号
    #[serde(default)]
    pub emoticons: Vec<EmoticonConfig>,

    /// 按说话者指定的文字颜色
    #[serde(default)]
    pub serif_colors: Vec<SerifColorConfig>,

    /// 系统 GUI 文件
    #[serde(default)]
    pub gui: GuiConfig,

    /// 用户设置
    #[serde(default)]
    pub settings: UserSettings,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: i32,
    #[serde(default = "default_window_height")]
    pub height: i32,
}

/// 字体配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    /// 字号
    #[serde(default = "default_font_size")]
    pub size: u32,
    /// 注音字号
    #[serde(default = "default_ruby_size")]
    pub ruby_size: u32,
    /// 文字颜色
    #[serde(default = "default_font_color")]
    pub color: Color,
    /// 描边颜色
    #[serde(default)]
    pub outline_color: Color,
    /// 是否描边
    #[serde(default = "default_true")]
    pub outline: bool,
    /// 描边宽度
    #[serde(default = "default_outline_width")]
    pub outline_width: u32,
}

/// 消息框配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgboxConfig {
    /// 消息框位置（屏幕坐标）
    #[serde(default = "default_msgbox_rect")]
    pub rect: Rect,
    #[serde(default = "default_margin")]
    pub margin_left: i32,
    #[serde(default = "default_margin")]
    pub margin_top: i32,
    #[serde(default = "default_margin")]
    pub margin_right: i32,
    #[serde(default = "default_margin")]
    pub margin_bottom: i32,
    /// 行距
    #[serde(default = "default_margin_line")]
    pub margin_line: i32,
    /// 字距
    #[serde(default)]
    pub margin_char: i32,
    /// 基础显示速度（字/秒）
    #[serde(default = "default_msgbox_speed")]
    pub speed: f32,
    /// 瞬间显示
    #[serde(default)]
    pub nowait: bool,
    /// 竖排
    #[serde(default)]
    pub tategaki: bool,
    /// 分页模式：多条消息累积到同一页，直到 `\page` 或点击标记
    #[serde(default)]
    pub page_mode: bool,
    /// 文字背景填充色（`\k{DEF}` 恢复到此值）
    #[serde(default)]
    pub fill: Option<Color>,
    /// 已读文字颜色
    #[serde(default)]
    pub seen_color: Option<Color>,
    /// 已读描边颜色
    #[serde(default)]
    pub seen_outline_color: Option<Color>,
    /// 结束后以暗色重绘
    #[serde(default)]
    pub dim: bool,
    #[serde(default = "default_dim_color")]
    pub dim_color: Color,
    #[serde(default)]
    pub dim_outline_color: Color,
    /// 台词加引号
    #[serde(default)]
    pub serif_quote: bool,
    /// skip 可跳过范围
    #[serde(default)]
    pub skip_unseen: SkipUnseen,
    /// 历史显示方式
    #[serde(default)]
    pub history_control: HistoryControl,
    /// auto 模式每字等待秒数（0 表示使用内置值）
    #[serde(default)]
    pub auto_speed: f32,
    /// 消息框内按钮（相对消息框坐标）
    #[serde(default)]
    pub buttons: MsgboxButtons,
    /// 点击等待动画
    #[serde(default)]
    pub click: ClickConfig,
    /// 音效
    #[serde(default)]
    pub se: MsgboxSe,
    /// 切换背景时消息框的处理方式
    #[serde(default)]
    pub show_on_bg: BoxOnBackground,
    /// 切换角色时保持消息框显示
    #[serde(default)]
    pub show_on_ch: bool,
}

/// 消息框按钮区域（相对消息框）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsgboxButtons {
    #[serde(default)]
    pub qsave: Option<Rect>,
    #[serde(default)]
    pub qload: Option<Rect>,
    #[serde(default)]
    pub save: Option<Rect>,
    #[serde(default)]
    pub load: Option<Rect>,
    #[serde(default)]
    pub auto: Option<Rect>,
    #[serde(default)]
    pub skip: Option<Rect>,
    #[serde(default)]
    pub history: Option<Rect>,
    #[serde(default)]
    pub config: Option<Rect>,
    #[serde(default)]
    pub hide: Option<Rect>,
}

/// 点击等待动画
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickConfig {
    /// 固定位置（相对消息框）
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// 跟随笔位置显示
    #[serde(default)]
    pub move_with_pen: bool,
    /// 动画帧数
    #[serde(default = "default_click_frames")]
    pub frames: u32,
    /// 一轮动画的毫秒数
    #[serde(default = "default_click_interval")]
    pub interval_ms: u64,
}

/// 消息框音效
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsgboxSe {
    #[serde(default)]
    pub auto_cancel: Option<String>,
    #[serde(default)]
    pub skip_cancel: Option<String>,
    #[serde(default)]
    pub button: Option<String>,
    #[serde(default)]
    pub hide: Option<String>,
    #[serde(default)]
    pub show: Option<String>,
}

/// 名字框配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameboxConfig {
    #[serde(default = "default_namebox_rect")]
    pub rect: Rect,
    #[serde(default = "default_margin")]
    pub margin_left: i32,
    #[serde(default = "default_margin")]
    pub margin_top: i32,
    /// 名字居中
    #[serde(default = "default_true")]
    pub centering: bool,
    /// 不使用名字框，名字与台词一起显示在消息框
    #[serde(default)]
    pub hidden: bool,
}

/// 系统菜单配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysmenuConfig {
    /// 隐藏系统菜单
    #[serde(default)]
    pub hidden: bool,
    /// 折叠状态的入口区域（屏幕坐标）
    #[serde(default = "default_sysmenu_collapsed")]
    pub collapsed: Rect,
    /// 展开后的菜单区域（屏幕坐标）
    #[serde(default = "default_sysmenu_rect")]
    pub rect: Rect,
    /// 菜单项（相对菜单区域）
    #[serde(default)]
    pub items: SysmenuItems,
    /// 自定义项 1 的 gosub 标签
    #[serde(default)]
    pub custom1_gosub: Option<String>,
    /// 自定义项 2 的 gosub 标签
    #[serde(default)]
    pub custom2_gosub: Option<String>,
    #[serde(default)]
    pub enter_se: Option<String>,
    #[serde(default)]
    pub leave_se: Option<String>,
}

/// 系统菜单项区域（相对菜单区域）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysmenuItems {
    #[serde(default)]
    pub qsave: Option<Rect>,
    #[serde(default)]
    pub qload: Option<Rect>,
    #[serde(default)]
    pub save: Option<Rect>,
    #[serde(default)]
    pub load: Option<Rect>,
    #[serde(default)]
    pub auto: Option<Rect>,
    #[serde(default)]
    pub skip: Option<Rect>,
    #[serde(default)]
    pub history: Option<Rect>,
    #[serde(default)]
    pub config: Option<Rect>,
    #[serde(default)]
    pub custom1: Option<Rect>,
    #[serde(default)]
    pub custom2: Option<Rect>,
}

/// 表情符号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoticonConfig {
    pub name: String,
    pub file: String,
    pub width: i32,
    pub height: i32,
}

/// 说话者颜色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerifColorConfig {
    pub name: String,
    pub color: Color,
    #[serde(default)]
    pub outline_color: Color,
    /// 只改变名字的颜色，台词保持默认色
    #[serde(default)]
    pub name_only: bool,
}

/// 系统 GUI 文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuiConfig {
    #[serde(default = "default_gui_save")]
    pub save: String,
    #[serde(default = "default_gui_load")]
    pub load: String,
    #[serde(default = "default_gui_history")]
    pub history: String,
    #[serde(default = "default_gui_config")]
    pub config: String,
}

/// 用户设置（由配置 GUI 调整）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// 文字速度 (0.0 - 1.0)，1.0 表示瞬间显示
    #[serde(default = "default_user_speed")]
    pub text_speed: f32,
    /// auto 等待倍率 (0.0 - 1.0)
    #[serde(default = "default_user_speed")]
    pub auto_speed: f32,
}

// 默认值函数
fn default_locale() -> String {
    "ja".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> i32 {
    1280
}

fn default_window_height() -> i32 {
    720
}

fn default_font_size() -> u32 {
    32
}

fn default_ruby_size() -> u32 {
    14
}

fn default_font_color() -> Color {
    Color::WHITE
}

fn default_outline_width() -> u32 {
    2
}

fn default_msgbox_rect() -> Rect {
    Rect::new(40, 500, 1200, 200)
}

fn default_margin() -> i32 {
    20
}

fn default_margin_line() -> i32 {
    40
}

fn default_msgbox_speed() -> f32 {
    15.0
}

fn default_dim_color() -> Color {
    Color::rgb(0x80, 0x80, 0x80)
}

fn default_click_frames() -> u32 {
    1
}

fn default_click_interval() -> u64 {
    1000
}

fn default_namebox_rect() -> Rect {
    Rect::new(40, 440, 300, 56)
}

fn default_sysmenu_collapsed() -> Rect {
    Rect::new(1200, 0, 80, 40)
}

fn default_sysmenu_rect() -> Rect {
    Rect::new(880, 0, 400, 80)
}

fn default_gui_save() -> String {
    "system/save.txt".to_string()
}

fn default_gui_load() -> String {
    "system/load.txt".to_string()
}

fn default_gui_history() -> String {
    "system/history.txt".to_string()
}

fn default_gui_config() -> String {
    "system/config.txt".to_string()
}

fn default_user_speed() -> f32 {
    0.5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            window: WindowConfig::default(),
            font: FontConfig::default(),
            msgbox: MsgboxConfig::default(),
            namebox: NameboxConfig::default(),
            sysmenu: SysmenuConfig::default(),
            emoticons: Vec::new(),
            serif_colors: Vec::new(),
            gui: GuiConfig::default(),
            settings: UserSettings::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            size: default_font_size(),
            ruby_size: default_ruby_size(),
            color: default_font_color(),
            outline_color: Color::BLACK,
            outline: true,
            outline_width: default_outline_width(),
        }
    }
}

impl Default for MsgboxConfig {
    fn default() -> Self {
        Self {
            rect: default_msgbox_rect(),
            margin_left: default_margin(),
            margin_top: default_margin(),
            margin_right: default_margin(),
            margin_bottom: default_margin(),
            margin_line: default_margin_line(),
            margin_char: 0,
            speed: default_msgbox_speed(),
            nowait: false,
            tategaki: false,
            page_mode: false,
            fill: None,
            seen_color: None,
            seen_outline_color: None,
            dim: false,
            dim_color: default_dim_color(),
            dim_outline_color: Color::BLACK,
            serif_quote: false,
            skip_unseen: SkipUnseen::default(),
            history_control: HistoryControl::default(),
            auto_speed: 0.0,
            buttons: MsgboxButtons::default(),
            click: ClickConfig::default(),
            se: MsgboxSe::default(),
            show_on_bg: BoxOnBackground::default(),
            show_on_ch: false,
        }
    }
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            move_with_pen: true,
            frames: default_click_frames(),
            interval_ms: default_click_interval(),
        }
    }
}

impl Default for NameboxConfig {
    fn default() -> Self {
        Self {
            rect: default_namebox_rect(),
            margin_left: default_margin(),
            margin_top: default_margin(),
            centering: true,
            hidden: false,
        }
    }
}

impl Default for SysmenuConfig {
    fn default() -> Self {
        Self {
            hidden: false,
            collapsed: default_sysmenu_collapsed(),
            rect: default_sysmenu_rect(),
            items: SysmenuItems::default(),
            custom1_gosub: None,
            custom2_gosub: None,
            enter_se: None,
            leave_se: None,
        }
    }
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            save: default_gui_save(),
            load: default_gui_load(),
            history: default_gui_history(),
            config: default_gui_config(),
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            text_speed: default_user_speed(),
            auto_speed: default_user_speed(),
        }
    }
}

impl EngineConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationFailed(msg.to_string()));

        if self.window.width <= 0 || self.window.height <= 0 {
            return invalid("窗口尺寸必须为正数");
        }

        let mb = &self.msgbox;
        if mb.speed <= 0.0 {
            return invalid("msgbox.speed 必须大于 0");
        }
        if [mb.margin_left, mb.margin_top, mb.margin_right, mb.margin_bottom]
            .iter()
            .any(|m| *m < 0)
        {
            return invalid("msgbox 边距不能为负数");
        }
        if mb.rect.w <= mb.margin_left + mb.margin_right
            || mb.rect.h <= mb.margin_top + mb.margin_bottom
        {
            return invalid("msgbox 区域小于边距");
        }
        if mb.rect.x + mb.rect.w > self.window.width || mb.rect.y + mb.rect.h > self.window.height {
            return invalid("msgbox 超出窗口");
        }
        if mb.click.frames == 0 || mb.click.interval_ms == 0 {
            return invalid("click 动画帧数与间隔必须大于 0");
        }
        if self.font.size == 0 {
            return invalid("字号必须大于 0");
        }

        for (name, v) in [
            ("text_speed", self.settings.text_speed),
            ("auto_speed", self.settings.auto_speed),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::ValidationFailed(format!(
                    "{name} 必须在 0.0 - 1.0 之间"
                )));
            }
        }

        Ok(())
    }

    /// 按说话者查找颜色
    pub fn serif_color(&self, name: &str) -> Option<&SerifColorConfig> {
        self.serif_colors.iter().find(|c| c.name == name)
    }

    /// 按名字查找表情符号
    pub fn emoticon(&self, name: &str) -> Option<&EmoticonConfig> {
        self.emoticons.iter().find(|e| e.name == name)
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 解析失败
    #[error("配置解析失败: {0}")]
    ParseFailed(String),
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
