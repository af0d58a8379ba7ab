//! 点击等待：提示动画与结束判定。

use crate::config::{ClickConfig, Rect};
use crate::stage::ClickIndicator;
use crate::timer::{FrameClock, LapTimer};

/// 点击等待提示
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClickPrompt {
    /// 位置已确定（进入点击等待后的首帧之后）
    placed: bool,
    x: i32,
    y: i32,
    timer: LapTimer,
}

impl ClickPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    /// 进入点击等待的首帧确定位置，并从第 0 帧开始动画
    ///
    /// `pen` 为消息框内的画笔位置。
    pub fn place(&mut self, config: &ClickConfig, msgbox: Rect, pen: (i32, i32), clock: &FrameClock) {
        if self.placed {
            return;
        }
        (self.x, self.y) = if config.move_with_pen {
            (msgbox.x + pen.0, msgbox.y + pen.1)
        } else {
            (config.x, config.y)
        };
        self.timer.reset(clock);
        self.placed = true;
    }

    /// 当前显示的提示
    pub fn indicator(&self, config: &ClickConfig, clock: &FrameClock) -> ClickIndicator {
        ClickIndicator {
            x: self.x,
            y: self.y,
            frame: frame_index(self.timer.lap_millis(clock), config.interval_ms, config.frames),
        }
    }
}

/// 动画帧号
pub fn frame_index(lap_ms: u64, interval_ms: u64, frames: u32) -> u32 {
    let frames = u64::from(frames.max(1));
    let interval = interval_ms.max(1);
    let per_frame = (interval / frames).max(1);
    ((lap_ms % interval) / per_frame % frames) as u32
}

/// 点击等待是否结束的判定事实
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickWaitFacts {
    pub skip: bool,
    pub auto: bool,
    pub control: bool,
    pub skippable: bool,
    pub non_interruptible: bool,
    pub has_voice: bool,
    pub voice_finished: bool,
    pub from_system_overlay: bool,
    /// 未指向按钮或菜单入口的左键点击
    pub free_click: bool,
    /// Return 或 Down
    pub advance_key: bool,
}

impl ClickWaitFacts {
    fn voice_allows(&self) -> bool {
        !self.non_interruptible || !self.has_voice || self.voice_finished
    }

    /// 是否结束点击等待
    pub fn should_finish(&self) -> bool {
        if self.skip {
            return self.skippable && self.voice_allows();
        }
        if self.control {
            return !self.auto && self.skippable && self.voice_allows();
        }
        let pressed = self.free_click || self.advance_key;
        if self.from_system_overlay {
            return pressed;
        }
        pressed && self.voice_allows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index() {
        assert_eq!(frame_index(0, 1000, 4), 0);
        assert_eq!(frame_index(260, 1000, 4), 1);
        assert_eq!(frame_index(999, 1000, 4), 3);
        assert_eq!(frame_index(1010, 1000, 4), 0);
        assert_eq!(frame_index(500, 1000, 1), 0);
        assert_eq!(frame_index(500, 0, 0), 0);
    }

    #[test]
    fn test_prompt_follows_pen() {
        let config = ClickConfig::default();
        let mut clock = FrameClock::new();
        let mut prompt = ClickPrompt::new();
        prompt.place(&config, Rect::new(40, 500, 1200, 200), (100, 20), &clock);
        // 位置只在首帧确定
        prompt.place(&config, Rect::new(40, 500, 1200, 200), (300, 80), &clock);
        clock.advance(0.1);
        let ind = prompt.indicator(&config, &clock);
        assert_eq!((ind.x, ind.y), (140, 520));
    }

    #[test]
    fn test_should_finish() {
        let click = ClickWaitFacts {
            free_click: true,
            ..ClickWaitFacts::default()
        };
        assert!(click.should_finish());
        assert!(!ClickWaitFacts::default().should_finish());

        // 不可中断时等语音结束
        let voiced = ClickWaitFacts {
            non_interruptible: true,
            has_voice: true,
            ..click
        };
        assert!(!voiced.should_finish());
        assert!(
            ClickWaitFacts {
                voice_finished: true,
                ..voiced
            }
            .should_finish()
        );

        let control = ClickWaitFacts {
            control: true,
            skippable: true,
            ..ClickWaitFacts::default()
        };
        assert!(control.should_finish());
        assert!(!ClickWaitFacts { auto: true, ..control }.should_finish());
        assert!(
            !ClickWaitFacts {
                skippable: false,
                ..control
            }
            .should_finish()
        );
    }
}
