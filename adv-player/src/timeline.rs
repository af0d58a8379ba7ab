//! # Timeline 模块
//!
//! 按帧号排列的输入事件。
//!
//! ```json
//! [
//!   { "frame": 30, "event": { "type": "key_down", "key": "return" } },
//!   { "frame": 45, "event": { "type": "control_down" } }
//! ]
//! ```

use std::path::Path;

use adv_runtime::InputEvent;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// 某一帧的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInput {
    /// 帧号（从 1 开始，在该帧执行前写入）
    pub frame: u64,
    pub event: InputEvent,
}

/// 输入时间线
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputTimeline {
    entries: Vec<TimedInput>,
}

impl InputTimeline {
    /// 由事件列表创建，同一帧的事件保持原有顺序
    pub fn new(mut entries: Vec<TimedInput>) -> Self {
        entries.sort_by_key(|e| e.frame);
        Self { entries }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let entries: Vec<TimedInput> = serde_json::from_str(json).context("输入时间线格式错误")?;
        Ok(Self::new(entries))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取输入时间线: {}", path.display()))?;
        Self::from_json(&json)
    }

    /// 指定帧的事件
    pub fn events_at(&self, frame: u64) -> impl Iterator<Item = InputEvent> + '_ {
        let start = self.entries.partition_point(|e| e.frame < frame);
        self.entries[start..]
            .iter()
            .take_while(move |e| e.frame == frame)
            .map(|e| e.event)
    }

    /// 最后一个事件所在的帧
    pub fn last_frame(&self) -> Option<u64> {
        self.entries.last().map(|e| e.frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adv_runtime::Key;

    #[test]
    fn test_events_grouped_by_frame() {
        let timeline = InputTimeline::from_json(
            r#"[
                { "frame": 10, "event": { "type": "key_down", "key": "return" } },
                { "frame": 3, "event": { "type": "mouse_move", "x": 5, "y": 6 } },
                { "frame": 3, "event": { "type": "left_down" } },
                { "frame": 3, "event": { "type": "left_up" } }
            ]"#,
        )
        .unwrap();

        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline.last_frame(), Some(10));
        assert_eq!(
            timeline.events_at(3).collect::<Vec<_>>(),
            InputEvent::click_at(5, 6).to_vec()
        );
        assert_eq!(
            timeline.events_at(10).collect::<Vec<_>>(),
            vec![InputEvent::key(Key::Return)]
        );
        assert_eq!(timeline.events_at(4).count(), 0);
    }

    #[test]
    fn test_rejects_unknown_event() {
        let result = InputTimeline::from_json(r#"[{ "frame": 1, "event": { "type": "jump" } }]"#);
        assert!(result.is_err());
    }
}
