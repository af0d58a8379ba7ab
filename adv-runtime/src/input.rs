//! # Input 模块
//!
//! 定义每帧的输入快照。
//!
//! ## 设计说明
//!
//! - [`InputSnapshot`] 是一组扁平的布尔/坐标字段，在分发开始时由命令只读访问
//! - 字段分为两类：
//!   - **帧作用域**：点击、方向键、Esc 等，由游戏循环在每帧结束时清除
//!   - **会话作用域**：鼠标按下、Ctrl 按住、鼠标坐标等，直到 Host 显式更新
//! - Host 通过 [`InputEvent`] 把平台事件写入快照，Runtime 不直接处理平台输入

use serde::{Deserialize, Serialize};

/// 键盘按键（Runtime 关心的子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Return,
    Space,
    Escape,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    /// `S` 键（保存快捷键）
    S,
    /// `L` 键（读档快捷键）
    L,
    /// `H` 键（历史快捷键）
    H,
}

/// Host 向 Runtime 传递的输入事件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// 鼠标移动
    MouseMove { x: i32, y: i32 },
    /// 左键按下
    LeftDown,
    /// 左键抬起（产生一次左键点击）
    LeftUp,
    /// 右键按下
    RightDown,
    /// 右键抬起（产生一次右键点击）
    RightUp,
    /// 按键按下
    KeyDown { key: Key },
    /// Ctrl 按下
    ControlDown,
    /// Ctrl 抬起
    ControlUp,
}

impl InputEvent {
    /// 在指定坐标处的一次完整左键点击
    pub fn click_at(x: i32, y: i32) -> [Self; 3] {
        [Self::MouseMove { x, y }, Self::LeftDown, Self::LeftUp]
    }

    /// 按键
    pub fn key(key: Key) -> Self {
        Self::KeyDown { key }
    }
}

/// 每帧输入快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    // ── 会话作用域 ──
    /// 左键处于按下状态
    pub left_button_pressed: bool,
    /// 右键处于按下状态
    pub right_button_pressed: bool,
    /// Ctrl 处于按下状态
    pub control_pressed: bool,
    /// 鼠标坐标
    pub mouse_x: i32,
    pub mouse_y: i32,

    // ── 帧作用域 ──
    /// 本帧发生了左键点击
    pub left_clicked: bool,
    /// 本帧发生了右键点击
    pub right_clicked: bool,
    pub return_pressed: bool,
    pub space_pressed: bool,
    pub escape_pressed: bool,
    pub up_pressed: bool,
    pub down_pressed: bool,
    pub left_arrow_pressed: bool,
    pub right_arrow_pressed: bool,
    pub page_up_pressed: bool,
    pub page_down_pressed: bool,
    pub s_pressed: bool,
    pub l_pressed: bool,
    pub h_pressed: bool,
}

impl InputSnapshot {
    /// 创建空快照
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个输入事件
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::MouseMove { x, y } => {
                self.mouse_x = x;
                self.mouse_y = y;
            }
            InputEvent::LeftDown => self.left_button_pressed = true,
            InputEvent::LeftUp => {
                if self.left_button_pressed {
                    self.left_clicked = true;
                }
                self.left_button_pressed = false;
            }
            InputEvent::RightDown => self.right_button_pressed = true,
            InputEvent::RightUp => {
                if self.right_button_pressed {
                    self.right_clicked = true;
                }
                self.right_button_pressed = false;
            }
            InputEvent::ControlDown => self.control_pressed = true,
            InputEvent::ControlUp => self.control_pressed = false,
            InputEvent::KeyDown { key } => match key {
                Key::Return => self.return_pressed = true,
                Key::Space => self.space_pressed = true,
                Key::Escape => self.escape_pressed = true,
                Key::Up => self.up_pressed = true,
                Key::Down => self.down_pressed = true,
                Key::Left => self.left_arrow_pressed = true,
                Key::Right => self.right_arrow_pressed = true,
                Key::PageUp => self.page_up_pressed = true,
                Key::PageDown => self.page_down_pressed = true,
                Key::S => self.s_pressed = true,
                Key::L => self.l_pressed = true,
                Key::H => self.h_pressed = true,
            },
        }
    }

    /// 清除帧作用域的标志（每帧结束时调用）
    ///
    /// 鼠标按下、Ctrl 按住、鼠标坐标保留。
    pub fn clear_frame_flags(&mut self) {
        self.left_clicked = false;
        self.right_clicked = false;
        self.return_pressed = false;
        self.space_pressed = false;
        self.escape_pressed = false;
        self.up_pressed = false;
        self.down_pressed = false;
        self.left_arrow_pressed = false;
        self.right_arrow_pressed = false;
        self.page_up_pressed = false;
        self.page_down_pressed = false;
        self.s_pressed = false;
        self.l_pressed = false;
        self.h_pressed = false;
    }

    /// 消费本帧的输入，使后续处理看不到它
    ///
    /// 与 [`clear_frame_flags`](Self::clear_frame_flags) 不同，会同时清除鼠标按下状态，
    /// 但保留 Ctrl 和坐标。
    pub fn clear_input_state(&mut self) {
        self.left_button_pressed = false;
        self.right_button_pressed = false;
        self.left_clicked = false;
        self.right_clicked = false;
        self.return_pressed = false;
        self.space_pressed = false;
        self.up_pressed = false;
        self.down_pressed = false;
        self.left_arrow_pressed = false;
        self.right_arrow_pressed = false;
        self.page_up_pressed = false;
        self.page_down_pressed = false;
        self.escape_pressed = false;
        self.s_pressed = false;
        self.l_pressed = false;
        self.h_pressed = false;
    }

    /// 推进类输入：Ctrl / Return / Down / 左键点击
    pub fn is_advance(&self) -> bool {
        self.control_pressed || self.return_pressed || self.down_pressed || self.left_clicked
    }

    /// 行内等待的取消类输入
    pub fn is_wait_cancel(&self) -> bool {
        self.left_clicked
            || self.right_clicked
            || self.control_pressed
            || self.space_pressed
            || self.return_pressed
            || self.up_pressed
            || self.down_pressed
            || self.page_up_pressed
            || self.page_down_pressed
            || self.escape_pressed
    }

    /// 鼠标位置是否在矩形内
    pub fn pointer_in(&self, rect: &crate::config::Rect) -> bool {
        rect.contains(self.mouse_x, self.mouse_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_sequence() {
        let mut input = InputSnapshot::new();
        for ev in InputEvent::click_at(10, 20) {
            input.apply(ev);
        }
        assert!(input.left_clicked);
        assert!(!input.left_button_pressed);
        assert_eq!((input.mouse_x, input.mouse_y), (10, 20));
    }

    #[test]
    fn test_left_up_without_down_is_not_click() {
        let mut input = InputSnapshot::new();
        input.apply(InputEvent::LeftUp);
        assert!(!input.left_clicked);
    }

    #[test]
    fn test_clear_frame_flags_keeps_session_flags() {
        let mut input = InputSnapshot::new();
        input.apply(InputEvent::ControlDown);
        input.apply(InputEvent::LeftDown);
        input.apply(InputEvent::MouseMove { x: 5, y: 6 });
        input.apply(InputEvent::key(Key::Escape));
        input.apply(InputEvent::RightDown);
        input.apply(InputEvent::RightUp);

        input.clear_frame_flags();

        assert!(input.control_pressed);
        assert!(input.left_button_pressed);
        assert_eq!(input.mouse_x, 5);
        assert!(!input.escape_pressed);
        assert!(!input.right_clicked);
    }

    #[test]
    fn test_clear_input_state_keeps_control() {
        let mut input = InputSnapshot::new();
        input.apply(InputEvent::ControlDown);
        input.apply(InputEvent::key(Key::Return));
        input.clear_input_state();
        assert!(input.control_pressed);
        assert!(!input.return_pressed);
        assert!(!input.is_wait_cancel() || input.control_pressed);
    }

    #[test]
    fn test_event_serialization() {
        let ev = InputEvent::key(Key::PageDown);
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"type":"key_down","key":"page_down"}"#);
        let back: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
