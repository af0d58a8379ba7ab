//! # Pacing 模块
//!
//! 消息显示节奏的纯函数：能否跳过、是否播放语音、auto 等待时间、
//! 每帧展开字数。全部只依赖传入的事实，便于单独测试。

use crate::config::SkipUnseen;
use crate::input::InputSnapshot;
use crate::mode::SessionModeState;

/// auto 模式下有语音时的等待毫秒数（乘以用户 auto 倍率）
pub const AUTO_MODE_VOICE_WAIT_MS: f32 = 4000.0;

/// auto 模式下每字等待秒数的内置值
pub const AUTO_MODE_TEXT_WAIT_SCALE: f32 = 0.15;

/// 判定所需的会话事实
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacingFacts {
    pub auto: bool,
    pub skip: bool,
    pub non_interruptible: bool,
    pub control: bool,
    /// 当前消息已读
    pub seen: bool,
}

impl PacingFacts {
    pub fn gather(modes: &SessionModeState, input: &InputSnapshot, seen: bool) -> Self {
        Self {
            auto: modes.is_auto(),
            skip: modes.is_skip(),
            non_interruptible: modes.is_non_interruptible(),
            control: input.control_pressed,
            seen,
        }
    }
}

/// 当前消息能否被跳过
pub fn is_skippable(policy: SkipUnseen, facts: &PacingFacts) -> bool {
    match policy {
        SkipUnseen::SeenOnly => facts.seen,
        SkipUnseen::Always => true,
        SkipUnseen::ControlAlways => facts.control || (facts.skip && facts.seen),
    }
}

/// skip 模式或 Ctrl 是否让消息立即显示完毕
pub fn is_canceled_by_skip(policy: SkipUnseen, facts: &PacingFacts) -> bool {
    is_skippable(policy, facts)
        && !facts.non_interruptible
        && (facts.skip || (facts.control && !facts.auto))
}

/// 消息是否需要跨帧显示
pub fn should_repeat(policy: SkipUnseen, facts: &PacingFacts) -> bool {
    !is_canceled_by_skip(policy, facts)
}

/// 是否播放台词语音
pub fn should_play_voice(policy: SkipUnseen, facts: &PacingFacts, from_system_overlay: bool) -> bool {
    if from_system_overlay {
        return false;
    }
    if facts.non_interruptible {
        return true;
    }
    let skippable = is_skippable(policy, facts);
    if facts.skip && skippable {
        return false;
    }
    if facts.auto || !skippable {
        return true;
    }
    !facts.control
}

/// auto 模式的等待毫秒数
///
/// `text_scale` 为配置的每字秒数，0 时使用 [`AUTO_MODE_TEXT_WAIT_SCALE`]。
pub fn auto_wait_millis(has_voice: bool, total_chars: usize, text_scale: f32, auto_speed: f32) -> u64 {
    if has_voice {
        return (AUTO_MODE_VOICE_WAIT_MS * auto_speed) as u64;
    }
    let scale = if text_scale == 0.0 {
        AUTO_MODE_TEXT_WAIT_SCALE
    } else {
        text_scale
    };
    (total_chars as f32 * scale * auto_speed * 1000.0) as u64
}

/// 按经过时间计算本帧应展开的字数
///
/// `lap_secs` 已扣除行内等待与暂停时间。用户文字速度为 1.0 时全部展开。
pub fn chars_by_lap(
    speed: f32,
    text_speed: f32,
    lap_secs: f32,
    drawn: usize,
    total: usize,
) -> usize {
    let remaining = total.saturating_sub(drawn);
    if text_speed >= 1.0 {
        return remaining;
    }

    // 加 0.1 使速度设置为 0 时仍能前进
    let progress = speed * lap_secs * (text_speed + 0.1);
    let target = progress.ceil().max(0.0) as usize;
    target.saturating_sub(drawn).min(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> PacingFacts {
        PacingFacts::default()
    }

    #[test]
    fn test_skippable_policies() {
        let unseen = facts();
        let seen = PacingFacts { seen: true, ..facts() };
        assert!(!is_skippable(SkipUnseen::SeenOnly, &unseen));
        assert!(is_skippable(SkipUnseen::SeenOnly, &seen));
        assert!(is_skippable(SkipUnseen::Always, &unseen));

        let control = PacingFacts { control: true, ..facts() };
        assert!(is_skippable(SkipUnseen::ControlAlways, &control));
        let skip_unseen = PacingFacts { skip: true, ..facts() };
        assert!(!is_skippable(SkipUnseen::ControlAlways, &skip_unseen));
    }

    #[test]
    fn test_control_skip_requires_interruptible() {
        let f = PacingFacts {
            control: true,
            seen: true,
            ..facts()
        };
        assert!(is_canceled_by_skip(SkipUnseen::SeenOnly, &f));
        assert!(!should_repeat(SkipUnseen::SeenOnly, &f));

        let locked = PacingFacts {
            non_interruptible: true,
            ..f
        };
        assert!(!is_canceled_by_skip(SkipUnseen::SeenOnly, &locked));

        // auto 模式中 Ctrl 不跳过
        let auto = PacingFacts { auto: true, ..f };
        assert!(!is_canceled_by_skip(SkipUnseen::SeenOnly, &auto));
    }

    #[test]
    fn test_voice_decision_table() {
        let p = SkipUnseen::SeenOnly;
        assert!(!should_play_voice(p, &facts(), true));
        assert!(should_play_voice(
            p,
            &PacingFacts {
                non_interruptible: true,
                skip: true,
                seen: true,
                ..facts()
            },
            false
        ));
        assert!(!should_play_voice(
            p,
            &PacingFacts {
                skip: true,
                seen: true,
                ..facts()
            },
            false
        ));
        assert!(should_play_voice(
            p,
            &PacingFacts {
                auto: true,
                seen: true,
                control: true,
                ..facts()
            },
            false
        ));
        // 未读：Ctrl 也播放
        assert!(should_play_voice(
            p,
            &PacingFacts {
                control: true,
                ..facts()
            },
            false
        ));
        assert!(!should_play_voice(
            p,
            &PacingFacts {
                control: true,
                seen: true,
                ..facts()
            },
            false
        ));
        assert!(should_play_voice(p, &PacingFacts { seen: true, ..facts() }, false));
    }

    #[test]
    fn test_auto_wait() {
        assert_eq!(auto_wait_millis(true, 100, 0.0, 0.5), 2000);
        assert_eq!(auto_wait_millis(false, 10, 0.0, 1.0), 1500);
        assert_eq!(auto_wait_millis(false, 10, 0.2, 0.5), 1000);
    }

    #[test]
    fn test_chars_by_lap() {
        // 10 字/秒，速度 0.9 → 每秒 10 字
        assert_eq!(chars_by_lap(10.0, 0.9, 0.0, 0, 20), 0);
        assert_eq!(chars_by_lap(10.0, 0.9, 0.25, 0, 20), 3);
        assert_eq!(chars_by_lap(10.0, 0.9, 0.25, 2, 20), 1);
        assert_eq!(chars_by_lap(10.0, 0.9, 5.0, 2, 20), 18);
        // 扣除等待后为负时不展开
        assert_eq!(chars_by_lap(10.0, 0.9, -1.0, 2, 20), 0);
        assert_eq!(chars_by_lap(10.0, 1.0, 0.0, 2, 20), 18);
    }
}
