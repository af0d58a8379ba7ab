//! # Platform 模块
//!
//! Runtime 消费的外部能力。
//!
//! ```text
//!            ┌──────────────────┐
//!            │     Engine       │
//!            └──┬───┬───┬───┬───┘
//!   measure/    │   │   │   │  prepare/
//!   render      │   │   │   │  run_one_frame
//!  ┌────────────▼┐ ┌▼───▼─┐ ┌▼────────────┐
//!  │GlyphRasterizer│AudioMixer│OverlayHost │  SaveStore
//!  └─────────────┘ └──────┘ └─────────────┘
//! ```
//!
//! 所有能力都是 trait，Host 提供具体实现；[`headless`] 子模块提供
//! 不依赖任何设备的实现，用于测试与无界面运行。

use tracing::warn;

use crate::config::{Color, Rect};
use crate::error::SaveError;
use crate::input::InputSnapshot;
use crate::save::SaveData;
use crate::stage::Stream;

/// 字体选择（`\f{g|m|a|b}`）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub enum FontSelect {
    /// 全局字体
    #[default]
    Global,
    /// 主字体
    Main,
    /// 备用字体 1
    Alt1,
    /// 备用字体 2
    Alt2,
}

/// 字形度量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct GlyphMetrics {
    /// 横向前进量
    pub advance: i32,
    /// 高度
    pub height: i32,
}

/// 绘制目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Surface {
    Msgbox,
    Namebox,
}

/// 字形绘制样式
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct GlyphStyle {
    pub font: FontSelect,
    pub size: u32,
    pub color: Color,
    /// 描边（颜色, 宽度）
    pub outline: Option<(Color, u32)>,
}

/// 字形光栅化能力
pub trait GlyphRasterizer {
    /// 测量字形
    fn measure(&self, font: FontSelect, size: u32, c: char) -> GlyphMetrics;

    /// 绘制字形，返回实际度量
    fn render(&mut self, target: Surface, x: i32, y: i32, c: char, style: &GlyphStyle)
    -> GlyphMetrics;

    /// 填充矩形（文字背景色）
    fn fill_rect(&mut self, target: Surface, rect: Rect, color: Color);

    /// 绘制表情符号图像
    fn draw_image(&mut self, target: Surface, x: i32, y: i32, file: &str);

    /// 清空绘制目标
    fn clear(&mut self, target: Surface);
}

/// 音频能力
pub trait AudioMixer {
    /// 播放文件
    fn play(&mut self, stream: Stream, file: &str, looped: bool) -> Result<(), String>;

    /// 停止播放
    fn stop(&mut self, stream: Stream);

    /// 播放是否结束（未播放视为结束）
    fn is_finished(&self, stream: Stream) -> bool;

    /// 设置本地音量，`span` 秒内渐变
    fn set_volume(&mut self, stream: Stream, vol: f32, span: f32);

    /// 设置全局音量
    fn set_global_volume(&mut self, stream: Stream, vol: f32);

    /// 推进音量渐变（每帧由游戏循环调用）
    fn tick_fades(&mut self, dt: f32);
}

/// 系统覆盖层种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOverlay {
    Save,
    Load,
    History,
    Config,
}

/// 覆盖层种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// 由消息框进入的系统覆盖层，结束后恢复消息
    System(SystemOverlay),
    /// 由 `gui` 命令进入
    Command,
}

/// 覆盖层结束时的结果
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOutcome {
    /// 正常关闭
    Closed,
    /// 选择了跳转标签
    Jump(String),
    /// 读档
    Loaded(Box<SaveData>),
}

/// 覆盖层单帧状态
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayStatus {
    Running,
    Finished(OverlayOutcome),
}

/// 覆盖层（菜单/GUI）能力
pub trait OverlayHost {
    /// 准备覆盖层
    fn prepare(&mut self, file: &str, kind: OverlayKind) -> Result<(), String>;

    /// 执行一帧
    fn run_one_frame(&mut self, input: &InputSnapshot) -> Result<OverlayStatus, String>;
}

/// 存档存储能力
pub trait SaveStore {
    /// 写入快速存档
    fn save_quick(&mut self, data: &SaveData) -> Result<(), SaveError>;

    /// 读取快速存档
    fn load_quick(&mut self) -> Result<Option<SaveData>, SaveError>;

    /// 是否存在快速存档
    fn has_quick(&self) -> bool;
}

/// 能力集合
pub struct Platform {
    pub glyphs: Box<dyn GlyphRasterizer>,
    pub audio: Box<dyn AudioMixer>,
    pub overlay: Box<dyn OverlayHost>,
    pub saves: Box<dyn SaveStore>,
}

impl Platform {
    /// 全部使用无设备实现
    pub fn headless() -> Self {
        Self {
            glyphs: Box::new(headless::MonospaceRasterizer::default()),
            audio: Box::new(headless::SilentMixer::default()),
            overlay: Box::new(headless::ScriptedOverlay::default()),
            saves: Box::new(headless::MemorySaveStore::default()),
        }
    }

    /// 播放效果音
    ///
    /// 未配置文件时什么都不做；播放失败只记录警告。
    pub fn play_se(&mut self, file: Option<&str>) {
        let Some(file) = file.filter(|f| !f.is_empty()) else {
            return;
        };
        if let Err(e) = self.audio.play(Stream::Se, file, false) {
            warn!(file, error = %e, "效果音播放失败");
        }
    }
}

pub mod headless {
    //! 不依赖设备的能力实现。
    //!
    //! 通过 `Rc<RefCell<..>>` 共享的日志句柄，测试可以在把实现交给
    //! [`Platform`](super::Platform) 之后继续观察调用记录。

    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    use super::*;

    /// 字形绘制记录
    #[derive(Debug, Clone, PartialEq, serde::Serialize)]
    pub struct DrawRecord {
        pub target: Surface,
        pub x: i32,
        pub y: i32,
        pub c: char,
        pub style: GlyphStyle,
    }

    /// 等宽光栅化器
    ///
    /// 全角字符（非 ASCII）宽度为字号，ASCII 为字号的一半。
    #[derive(Debug, Clone, Default)]
    pub struct MonospaceRasterizer {
        pub log: Rc<RefCell<Vec<DrawRecord>>>,
        /// 已清空的目标
        pub cleared: Rc<RefCell<Vec<Surface>>>,
    }

    impl MonospaceRasterizer {
        pub fn width_of(size: u32, c: char) -> i32 {
            if c.is_ascii() {
                (size / 2) as i32
            } else {
                size as i32
            }
        }
    }

    impl GlyphRasterizer for MonospaceRasterizer {
        fn measure(&self, _font: FontSelect, size: u32, c: char) -> GlyphMetrics {
            GlyphMetrics {
                advance: Self::width_of(size, c),
                height: size as i32,
            }
        }

        fn render(
            &mut self,
            target: Surface,
            x: i32,
            y: i32,
            c: char,
            style: &GlyphStyle,
        ) -> GlyphMetrics {
            self.log.borrow_mut().push(DrawRecord {
                target,
                x,
                y,
                c,
                style: *style,
            });
            self.measure(style.font, style.size, c)
        }

        fn fill_rect(&mut self, _target: Surface, _rect: Rect, _color: Color) {}

        fn draw_image(&mut self, _target: Surface, _x: i32, _y: i32, _file: &str) {}

        fn clear(&mut self, target: Surface) {
            self.cleared.borrow_mut().push(target);
        }
    }

    /// 音频调用记录
    #[derive(Debug, Clone, PartialEq)]
    pub enum AudioRecord {
        Play(Stream, String),
        Stop(Stream),
        Volume(Stream, f32, f32),
    }

    /// 静音混音器
    ///
    /// 每次播放持续 `play_secs` 秒后视为结束（默认 0，即立即结束）。
    #[derive(Debug, Clone, Default)]
    pub struct SilentMixer {
        pub log: Rc<RefCell<Vec<AudioRecord>>>,
        pub play_secs: f32,
        remaining: HashMap<Stream, f32>,
    }

    impl SilentMixer {
        /// 播放持续指定秒数的混音器
        pub fn with_play_secs(play_secs: f32) -> Self {
            Self {
                play_secs,
                ..Self::default()
            }
        }
    }

    impl AudioMixer for SilentMixer {
        fn play(&mut self, stream: Stream, file: &str, _looped: bool) -> Result<(), String> {
            self.log
                .borrow_mut()
                .push(AudioRecord::Play(stream, file.to_string()));
            self.remaining.insert(stream, self.play_secs);
            Ok(())
        }

        fn stop(&mut self, stream: Stream) {
            self.log.borrow_mut().push(AudioRecord::Stop(stream));
            self.remaining.remove(&stream);
        }

        fn is_finished(&self, stream: Stream) -> bool {
            self.remaining.get(&stream).is_none_or(|r| *r <= 0.0)
        }

        fn set_volume(&mut self, stream: Stream, vol: f32, span: f32) {
            self.log
                .borrow_mut()
                .push(AudioRecord::Volume(stream, vol, span));
        }

        fn set_global_volume(&mut self, _stream: Stream, _vol: f32) {}

        fn tick_fades(&mut self, dt: f32) {
            for r in self.remaining.values_mut() {
                *r -= dt;
            }
        }
    }

    /// 预设帧序列的覆盖层
    ///
    /// 每次 `prepare` 后运行 `frames` 帧，然后以队列中的下一个结果结束
    /// （队列为空时为 [`OverlayOutcome::Closed`]）。
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedOverlay {
        pub frames: u32,
        pub outcomes: Rc<RefCell<VecDeque<OverlayOutcome>>>,
        pub prepared: Rc<RefCell<Vec<(String, OverlayKind)>>>,
        pub(crate) remaining: u32,
    }

    impl OverlayHost for ScriptedOverlay {
        fn prepare(&mut self, file: &str, kind: OverlayKind) -> Result<(), String> {
            self.prepared.borrow_mut().push((file.to_string(), kind));
            self.remaining = self.frames;
            Ok(())
        }

        fn run_one_frame(&mut self, _input: &InputSnapshot) -> Result<OverlayStatus, String> {
            if self.remaining > 0 {
                self.remaining -= 1;
                return Ok(OverlayStatus::Running);
            }
            let outcome = self
                .outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(OverlayOutcome::Closed);
            Ok(OverlayStatus::Finished(outcome))
        }
    }

    /// 内存中的快速存档
    #[derive(Debug, Clone, Default)]
    pub struct MemorySaveStore {
        pub slot: Rc<RefCell<Option<SaveData>>>,
    }

    impl SaveStore for MemorySaveStore {
        fn save_quick(&mut self, data: &SaveData) -> Result<(), SaveError> {
            *self.slot.borrow_mut() = Some(data.clone());
            Ok(())
        }

        fn load_quick(&mut self) -> Result<Option<SaveData>, SaveError> {
            Ok(self.slot.borrow().clone())
        }

        fn has_quick(&self) -> bool {
            self.slot.borrow().is_some()
        }
    }
}
