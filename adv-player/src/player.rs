//! # Player 模块
//!
//! 以固定帧率驱动 [`Engine`]，在每帧开始前写入时间线上的输入。

use adv_runtime::Engine;
use tracing::{debug, info};

use crate::timeline::InputTimeline;

/// 运行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 实际执行的帧数
    pub frames: u64,
    /// 脚本是否执行完毕
    pub finished: bool,
    /// 结束时的命令索引
    pub index: usize,
    /// 历史记录条数
    pub history: usize,
}

/// 无窗口播放器
pub struct Player {
    engine: Engine,
    timeline: InputTimeline,
    frame_secs: f32,
    max_frames: u64,
}

impl Player {
    pub fn new(engine: Engine, timeline: InputTimeline, fps: u32, max_frames: u64) -> Self {
        Self {
            engine,
            timeline,
            frame_secs: 1.0 / fps.max(1) as f32,
            max_frames,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// 运行到脚本结束或达到帧数上限
    pub fn run(&mut self) -> anyhow::Result<RunSummary> {
        let mut last_index = None;
        let mut finished = self.engine.is_finished();

        while !finished && self.engine.frame_count() < self.max_frames {
            let frame = self.engine.frame_count() + 1;
            for event in self.timeline.events_at(frame) {
                debug!(frame, ?event, "输入");
                self.engine.apply_input(event);
            }

            finished = !self.engine.step(self.frame_secs)?;

            let index = self.engine.session().cursor.index();
            if last_index != Some(index) {
                let command = self.engine.current_command().map(|c| c.kind.name());
                debug!(frame, index, command, "命令");
                last_index = Some(index);
            }
            if let Some(m) = self.engine.message() {
                debug!(
                    frame,
                    drawn = m.drawn_chars(),
                    total = m.total_chars(),
                    click_wait = m.is_click_wait(),
                    "消息"
                );
            }
        }

        let summary = RunSummary {
            frames: self.engine.frame_count(),
            finished,
            index: self.engine.session().cursor.index(),
            history: self.engine.session().history.len(),
        };
        info!(
            frames = summary.frames,
            finished = summary.finished,
            index = summary.index,
            "运行结束"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimedInput;
    use adv_runtime::{
        Command, CommandKind, EngineConfig, InputEvent, Key, Platform, Script,
    };

    fn engine() -> Engine {
        let commands = ["はじめ", "おわり"]
            .into_iter()
            .map(|t| {
                Command::new(CommandKind::Message {
                    text: t.to_string(),
                })
            })
            .collect();
        let script = Script::new("main", commands).unwrap();
        Engine::new(EngineConfig::default(), script, Platform::headless()).unwrap()
    }

    fn press_return(frames: &[u64]) -> InputTimeline {
        InputTimeline::new(
            frames
                .iter()
                .map(|&frame| TimedInput {
                    frame,
                    event: InputEvent::key(Key::Return),
                })
                .collect(),
        )
    }

    #[test]
    fn test_runs_to_end_with_timeline() {
        // 第 2 帧快进，第 3 帧进入点击等待后在第 4 帧前进
        let mut player = Player::new(engine(), press_return(&[2, 4, 6, 8]), 60, 100);
        let summary = player.run().unwrap();
        assert!(summary.finished);
        assert_eq!(summary.history, 2);
        assert!(summary.frames <= 8);
    }

    #[test]
    fn test_stops_at_frame_limit() {
        let mut player = Player::new(engine(), InputTimeline::default(), 60, 30);
        let summary = player.run().unwrap();
        assert!(!summary.finished);
        assert_eq!(summary.frames, 30);
        assert_eq!(summary.index, 0);
    }
}
