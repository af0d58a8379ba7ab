//! # Stage 模块
//!
//! 舞台与混音器的逻辑状态。
//!
//! Runtime 不持有图像或音频数据，只记录"当前应该显示/播放什么"，
//! Host 每帧读取 [`StageState`] 进行合成；存档时与变量一起序列化。

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// 淡入淡出方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FadeMethod {
    Normal,
    Mask,
    CurtainRight,
    CurtainLeft,
    CurtainUp,
    CurtainDown,
    SlideRight,
    SlideLeft,
    SlideUp,
    SlideDown,
    ShutterRight,
    ShutterLeft,
    ShutterUp,
    ShutterDown,
    Clockwise,
    CounterClockwise,
    EyeOpen,
    EyeClose,
    /// 规则图过渡 `rule:<file>`
    Rule(String),
    /// 溶解规则图过渡 `melt:<file>`
    Melt(String),
}

impl FromStr for FadeMethod {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScriptError::InvalidParameter {
            command: "fade",
            param: "method",
            message: format!("未知的过渡方式 '{s}'"),
        };

        if let Some(file) = s.strip_prefix("rule:") {
            return if file.is_empty() {
                Err(invalid())
            } else {
                Ok(Self::Rule(file.to_string()))
            };
        }
        if let Some(file) = s.strip_prefix("melt:") {
            return if file.is_empty() {
                Err(invalid())
            } else {
                Ok(Self::Melt(file.to_string()))
            };
        }

        Ok(match s {
            "" | "normal" | "n" | "標準" => Self::Normal,
            "mask" | "m" => Self::Mask,
            "curtain-right" | "curtain" | "cr" | "c" => Self::CurtainRight,
            "curtain-left" | "cl" => Self::CurtainLeft,
            "curtain-up" | "cu" => Self::CurtainUp,
            "curtain-down" | "cd" => Self::CurtainDown,
            "slide-right" | "sr" => Self::SlideRight,
            "slide-left" | "sl" => Self::SlideLeft,
            "slide-up" | "su" => Self::SlideUp,
            "slide-down" | "sd" => Self::SlideDown,
            "shutter-right" | "shr" => Self::ShutterRight,
            "shutter-left" | "shl" => Self::ShutterLeft,
            "shutter-up" | "shu" => Self::ShutterUp,
            "shutter-down" | "shd" => Self::ShutterDown,
            "clockwise" | "cw" => Self::Clockwise,
            "counterclockwise" | "ccw" => Self::CounterClockwise,
            "eye-open" => Self::EyeOpen,
            "eye-close" => Self::EyeClose,
            _ => return Err(invalid()),
        })
    }
}

/// 角色立绘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CharPosition {
    Back,
    Left,
    LeftCenter,
    Center,
    RightCenter,
    Right,
    Face,
}

impl FromStr for CharPosition {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "back" | "b" | "背面" => Self::Back,
            "left" | "l" | "左" => Self::Left,
            "left-center" | "left-centre" | "lc" | "左中" => Self::LeftCenter,
            "center" | "centre" | "c" | "中央" => Self::Center,
            "right-center" | "right-centre" | "rc" | "右中" => Self::RightCenter,
            "right" | "r" | "右" => Self::Right,
            "face" | "f" | "顔" => Self::Face,
            _ => {
                return Err(ScriptError::InvalidParameter {
                    command: "ch",
                    param: "position",
                    message: format!("未知的位置 '{s}'"),
                });
            }
        })
    }
}

/// 震动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakeDirection {
    Horizontal,
    Vertical,
}

impl ShakeDirection {
    /// 振幅 `offset` 对应的画面偏移
    pub fn offset(self, offset: i32) -> (i32, i32) {
        match self {
            Self::Horizontal => (offset, 0),
            Self::Vertical => (0, offset),
        }
    }
}

impl FromStr for ShakeDirection {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" | "h" | "横" => Ok(Self::Horizontal),
            "vertical" | "v" | "縦" => Ok(Self::Vertical),
            _ => Err(ScriptError::InvalidParameter {
                command: "shake",
                param: "direction",
                message: format!("未知的方向 '{s}'"),
            }),
        }
    }
}

/// 正在进行的过渡
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadeState {
    pub method: FadeMethod,
    /// 进度 (0.0 - 1.0)
    pub progress: f32,
    /// 消息框随过渡淡出（否则已在过渡前隐藏或保持显示）
    #[serde(default)]
    pub fade_boxes: bool,
}

/// 舞台状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// 背景文件（`#RRGGBB` 表示纯色）
    pub background: Option<String>,
    /// 角色立绘
    pub characters: BTreeMap<CharPosition, String>,
    /// 正在进行的过渡（跨帧命令运行期间）
    #[serde(skip)]
    pub fade: Option<FadeState>,
    /// 震动偏移
    #[serde(skip)]
    pub shake_offset: (i32, i32),
    /// 消息框是否显示
    pub msgbox_visible: bool,
    /// 名字框是否显示
    pub namebox_visible: bool,
    /// 当前章节名
    #[serde(default)]
    pub chapter: String,
    /// auto 模式提示条
    #[serde(skip)]
    pub auto_banner: bool,
    /// skip 模式提示条
    #[serde(skip)]
    pub skip_banner: bool,
    /// 点击等待提示
    #[serde(skip)]
    pub click: Option<ClickIndicator>,
    /// 系统菜单是否展开
    #[serde(skip)]
    pub sysmenu_open: bool,
}

/// 点击等待提示的位置与动画帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickIndicator {
    pub x: i32,
    pub y: i32,
    pub frame: u32,
}

impl StageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时设置消息框与名字框的可见性
    pub fn show_message_boxes(&mut self, msgbox: bool, namebox: bool) {
        self.msgbox_visible = msgbox;
        self.namebox_visible = namebox;
    }

    /// 设置或移除角色
    pub fn set_character(&mut self, pos: CharPosition, file: Option<String>) {
        match file {
            Some(f) if !f.is_empty() && f != "none" => {
                self.characters.insert(pos, f);
            }
            _ => {
                self.characters.remove(&pos);
            }
        }
    }
}

/// 音频流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Bgm,
    Voice,
    Se,
}

/// 音量目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTarget {
    /// 本地音量（随存档）
    Local(Stream),
    /// 全局音量（跨存档）
    Global(Stream),
}

impl FromStr for VolumeTarget {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bgm" | "b" | "音楽" => Self::Local(Stream::Bgm),
            "voice" | "v" | "声" => Self::Local(Stream::Voice),
            "se" | "s" | "効果音" => Self::Local(Stream::Se),
            "BGM" | "B" => Self::Global(Stream::Bgm),
            "VOICE" | "V" => Self::Global(Stream::Voice),
            "SE" | "S" => Self::Global(Stream::Se),
            _ => {
                return Err(ScriptError::InvalidParameter {
                    command: "vol",
                    param: "stream",
                    message: format!("未知的音频流 '{s}'"),
                });
            }
        })
    }
}

/// 混音器的逻辑状态（用于存档恢复）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerState {
    /// 当前 BGM
    pub bgm: Option<String>,
    /// BGM 是否循环
    pub bgm_looping: bool,
    pub bgm_volume: f32,
    pub voice_volume: f32,
    pub se_volume: f32,
}

impl Default for MixerState {
    fn default() -> Self {
        Self {
            bgm: None,
            bgm_looping: true,
            bgm_volume: 1.0,
            voice_volume: 1.0,
            se_volume: 1.0,
        }
    }
}

impl MixerState {
    /// 记录本地音量
    pub fn set_volume(&mut self, stream: Stream, vol: f32) {
        match stream {
            Stream::Bgm => self.bgm_volume = vol,
            Stream::Voice => self.voice_volume = vol,
            Stream::Se => self.se_volume = vol,
        }
    }

    pub fn volume(&self, stream: Stream) -> f32 {
        match stream {
            Stream::Bgm => self.bgm_volume,
            Stream::Voice => self.voice_volume,
            Stream::Se => self.se_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_method_parse() {
        assert_eq!("n".parse::<FadeMethod>().unwrap(), FadeMethod::Normal);
        assert_eq!("".parse::<FadeMethod>().unwrap(), FadeMethod::Normal);
        assert_eq!("ccw".parse::<FadeMethod>().unwrap(), FadeMethod::CounterClockwise);
        assert_eq!(
            "rule:wipe.png".parse::<FadeMethod>().unwrap(),
            FadeMethod::Rule("wipe.png".into())
        );
        assert!("rule:".parse::<FadeMethod>().is_err());
        assert!("spin".parse::<FadeMethod>().is_err());
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("lc".parse::<CharPosition>().unwrap(), CharPosition::LeftCenter);
        assert_eq!("右".parse::<CharPosition>().unwrap(), CharPosition::Right);
        assert!(matches!(
            "top".parse::<CharPosition>(),
            Err(ScriptError::InvalidParameter { param: "position", .. })
        ));
    }

    #[test]
    fn test_shake_direction() {
        let dir: ShakeDirection = "v".parse().unwrap();
        assert_eq!(dir.offset(5), (0, 5));
        assert!("diagonal".parse::<ShakeDirection>().is_err());
    }

    #[test]
    fn test_set_character() {
        let mut stage = StageState::new();
        stage.set_character(CharPosition::Left, Some("a.png".into()));
        assert_eq!(stage.characters.len(), 1);
        stage.set_character(CharPosition::Left, Some("none".into()));
        assert!(stage.characters.is_empty());
    }

    #[test]
    fn test_volume_target() {
        assert_eq!(
            "v".parse::<VolumeTarget>().unwrap(),
            VolumeTarget::Local(Stream::Voice)
        );
        assert_eq!(
            "SE".parse::<VolumeTarget>().unwrap(),
            VolumeTarget::Global(Stream::Se)
        );
        assert!("music".parse::<VolumeTarget>().is_err());
    }

    #[test]
    fn test_stage_serialization_skips_transient() {
        let mut stage = StageState::new();
        stage.background = Some("room.png".into());
        stage.fade = Some(FadeState {
            method: FadeMethod::Normal,
            progress: 0.5,
            fade_boxes: true,
        });
        let json = serde_json::to_string(&stage).unwrap();
        let loaded: StageState = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.background.as_deref(), Some("room.png"));
        assert!(loaded.fade.is_none());
    }
}
