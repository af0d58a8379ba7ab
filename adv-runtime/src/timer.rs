//! # Timer 模块
//!
//! 基于帧时间的计时器。
//!
//! 引擎不读取系统时钟：游戏循环每帧把 `dt` 累加到 [`FrameClock`]，
//! 各命令用 [`LapTimer`] 记录起点并计算经过时间，因此测试可以精确模拟时间流逝。

use serde::{Deserialize, Serialize};

/// 帧时钟（单调递增的累计秒数）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameClock {
    now: f64,
}

impl FrameClock {
    /// 创建时钟（从 0 秒开始）
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进时钟
    ///
    /// 负数或非有限的 `dt` 被视为 0，保证时间单调。
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.now += f64::from(dt);
        }
    }

    /// 当前累计时间（秒）
    pub fn now(&self) -> f64 {
        self.now
    }
}

/// 圈计时器
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LapTimer {
    start: f64,
}

impl LapTimer {
    /// 以当前时刻为起点创建计时器
    pub fn started_at(clock: &FrameClock) -> Self {
        Self { start: clock.now() }
    }

    /// 重置起点
    pub fn reset(&mut self, clock: &FrameClock) {
        self.start = clock.now();
    }

    /// 经过的秒数
    pub fn lap_secs(&self, clock: &FrameClock) -> f32 {
        (clock.now() - self.start).max(0.0) as f32
    }

    /// 经过的毫秒数
    pub fn lap_millis(&self, clock: &FrameClock) -> u64 {
        ((clock.now() - self.start).max(0.0) * 1000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_timer_follows_clock() {
        let mut clock = FrameClock::new();
        let timer = LapTimer::started_at(&clock);

        clock.advance(0.25);
        clock.advance(0.25);

        assert!((timer.lap_secs(&clock) - 0.5).abs() < 1e-6);
        assert_eq!(timer.lap_millis(&clock), 500);
    }

    #[test]
    fn test_clock_ignores_negative_dt() {
        let mut clock = FrameClock::new();
        clock.advance(1.0);
        clock.advance(-5.0);
        clock.advance(f32::NAN);
        assert!((clock.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::new();
        let mut timer = LapTimer::started_at(&clock);
        clock.advance(2.0);
        timer.reset(&clock);
        assert_eq!(timer.lap_millis(&clock), 0);
    }
}
