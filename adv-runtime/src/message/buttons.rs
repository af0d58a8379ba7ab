//! 消息框按钮的命中测试与可用性判定。

use crate::config::{MsgboxButtons, MsgboxConfig, Rect, SkipUnseen};
use crate::input::InputSnapshot;

use super::MenuAction;

/// 消息框按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgboxButton {
    QSave,
    QLoad,
    Save,
    Load,
    Auto,
    Skip,
    History,
    Config,
    Hide,
}

impl MsgboxButton {
    pub const ALL: [MsgboxButton; 9] = [
        Self::QSave,
        Self::QLoad,
        Self::Save,
        Self::Load,
        Self::Auto,
        Self::Skip,
        Self::History,
        Self::Config,
        Self::Hide,
    ];

    /// 按钮矩形（相对消息框），未配置时为 `None`
    pub fn rect(self, buttons: &MsgboxButtons) -> Option<Rect> {
        match self {
            Self::QSave => buttons.qsave,
            Self::QLoad => buttons.qload,
            Self::Save => buttons.save,
            Self::Load => buttons.load,
            Self::Auto => buttons.auto,
            Self::Skip => buttons.skip,
            Self::History => buttons.history,
            Self::Config => buttons.config,
            Self::Hide => buttons.hide,
        }
    }

    /// 按下后执行的动作；隐藏按钮单独处理
    pub fn action(self) -> Option<MenuAction> {
        Some(match self {
            Self::QSave => MenuAction::QSave,
            Self::QLoad => MenuAction::QLoad,
            Self::Save => MenuAction::Save,
            Self::Load => MenuAction::Load,
            Self::Auto => MenuAction::Auto,
            Self::Skip => MenuAction::Skip,
            Self::History => MenuAction::History,
            Self::Config => MenuAction::Config,
            Self::Hide => return None,
        })
    }
}

/// 鼠标所指的按钮
pub fn pointed_button(msgbox: &MsgboxConfig, input: &InputSnapshot) -> Option<MsgboxButton> {
    let x = input.mouse_x - msgbox.rect.x;
    let y = input.mouse_y - msgbox.rect.y;
    MsgboxButton::ALL.into_iter().find(|b| {
        b.rect(&msgbox.buttons)
            .is_some_and(|r| r.w > 0 && r.h > 0 && r.contains(x, y))
    })
}

/// 决定按钮与菜单项是否可用的会话事实
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonGate {
    pub sysmenu_open: bool,
    pub hidden: bool,
    pub auto: bool,
    pub skip: bool,
    pub save_load_enabled: bool,
    pub has_quick_save: bool,
    pub seen: bool,
    pub skip_unseen: SkipUnseen,
}

impl ButtonGate {
    /// 动作当前是否可用（与显示位置无关）
    pub fn allows(&self, action: MenuAction) -> bool {
        match action {
            MenuAction::QSave | MenuAction::Save | MenuAction::Load => self.save_load_enabled,
            MenuAction::QLoad => self.save_load_enabled && self.has_quick_save,
            MenuAction::Skip => self.seen || self.skip_unseen == SkipUnseen::Always,
            _ => true,
        }
    }
}

/// 过滤掉当前不可用的按钮
pub fn adjust(pointed: Option<MsgboxButton>, gate: &ButtonGate) -> Option<MsgboxButton> {
    if gate.sysmenu_open || gate.hidden || gate.auto || gate.skip {
        return None;
    }
    let button = pointed?;
    match button.action() {
        Some(action) if !gate.allows(action) => None,
        _ => Some(button),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn config() -> MsgboxConfig {
        let mut msgbox = EngineConfig::default().msgbox;
        msgbox.rect = Rect::new(100, 400, 800, 200);
        msgbox.buttons.qload = Some(Rect::new(700, 10, 40, 20));
        msgbox.buttons.skip = Some(Rect::new(750, 10, 40, 20));
        msgbox
    }

    fn gate() -> ButtonGate {
        ButtonGate {
            save_load_enabled: true,
            has_quick_save: true,
            seen: true,
            ..ButtonGate::default()
        }
    }

    #[test]
    fn test_pointed_button_is_relative_to_msgbox() {
        let msgbox = config();
        let mut input = InputSnapshot::new();
        input.mouse_x = 810;
        input.mouse_y = 415;
        assert_eq!(pointed_button(&msgbox, &input), Some(MsgboxButton::QLoad));

        input.mouse_x = 710;
        assert_eq!(pointed_button(&msgbox, &input), None);
    }

    #[test]
    fn test_adjust_gates() {
        let g = gate();
        assert_eq!(adjust(Some(MsgboxButton::QLoad), &g), Some(MsgboxButton::QLoad));

        let no_data = ButtonGate {
            has_quick_save: false,
            ..g
        };
        assert_eq!(adjust(Some(MsgboxButton::QLoad), &no_data), None);

        let locked = ButtonGate {
            save_load_enabled: false,
            ..g
        };
        assert_eq!(adjust(Some(MsgboxButton::Save), &locked), None);
        assert_eq!(adjust(Some(MsgboxButton::Auto), &locked), Some(MsgboxButton::Auto));

        let unseen = ButtonGate { seen: false, ..g };
        assert_eq!(adjust(Some(MsgboxButton::Skip), &unseen), None);
        let always = ButtonGate {
            skip_unseen: SkipUnseen::Always,
            ..unseen
        };
        assert_eq!(adjust(Some(MsgboxButton::Skip), &always), Some(MsgboxButton::Skip));

        let auto = ButtonGate { auto: true, ..g };
        assert_eq!(adjust(Some(MsgboxButton::Hide), &auto), None);
    }
}
