//! 系统菜单（折叠状态的入口与展开后的菜单项）。

use crate::config::{Rect, SysmenuConfig, SysmenuItems};
use crate::input::InputSnapshot;

use super::MenuAction;
use super::buttons::ButtonGate;

/// 系统菜单项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysmenuItem {
    QSave,
    QLoad,
    Save,
    Load,
    Auto,
    Skip,
    History,
    Config,
    Custom1,
    Custom2,
}

impl SysmenuItem {
    pub const ALL: [SysmenuItem; 10] = [
        Self::QSave,
        Self::QLoad,
        Self::Save,
        Self::Load,
        Self::Auto,
        Self::Skip,
        Self::History,
        Self::Config,
        Self::Custom1,
        Self::Custom2,
    ];

    /// 菜单项矩形（相对菜单），未配置时为 `None`
    pub fn rect(self, items: &SysmenuItems) -> Option<Rect> {
        match self {
            Self::QSave => items.qsave,
            Self::QLoad => items.qload,
            Self::Save => items.save,
            Self::Load => items.load,
            Self::Auto => items.auto,
            Self::Skip => items.skip,
            Self::History => items.history,
            Self::Config => items.config,
            Self::Custom1 => items.custom1,
            Self::Custom2 => items.custom2,
        }
    }

    pub fn action(self) -> MenuAction {
        match self {
            Self::QSave => MenuAction::QSave,
            Self::QLoad => MenuAction::QLoad,
            Self::Save => MenuAction::Save,
            Self::Load => MenuAction::Load,
            Self::Auto => MenuAction::Auto,
            Self::Skip => MenuAction::Skip,
            Self::History => MenuAction::History,
            Self::Config => MenuAction::Config,
            Self::Custom1 => MenuAction::Custom(1),
            Self::Custom2 => MenuAction::Custom(2),
        }
    }
}

/// 自定义菜单项对应的 gosub 标签
pub fn custom_gosub(config: &SysmenuConfig, slot: usize) -> Option<&str> {
    let label = match slot {
        1 => config.custom1_gosub.as_deref(),
        2 => config.custom2_gosub.as_deref(),
        _ => None,
    };
    label.filter(|l| !l.is_empty())
}

/// 展开状态的系统菜单
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SysmenuState {
    /// 是否展开
    pub open: bool,
    /// 展开后的第一帧
    pub first_frame: bool,
    /// 本帧刚刚关闭
    pub finished: bool,
    /// 鼠标所指的可用菜单项
    pub pointed: Option<SysmenuItem>,
}

/// 鼠标所指的菜单项
pub fn pointed_item(config: &SysmenuConfig, input: &InputSnapshot) -> Option<SysmenuItem> {
    let x = input.mouse_x - config.rect.x;
    let y = input.mouse_y - config.rect.y;
    SysmenuItem::ALL.into_iter().find(|item| {
        item.rect(&config.items)
            .is_some_and(|r| r.w > 0 && r.h > 0 && r.contains(x, y))
    })
}

/// 鼠标是否指向折叠状态的菜单入口
pub fn is_collapsed_pointed(config: &SysmenuConfig, input: &InputSnapshot) -> bool {
    !config.hidden && input.pointer_in(&config.collapsed)
}

/// 过滤掉当前不可用的菜单项
pub fn adjust(
    pointed: Option<SysmenuItem>,
    config: &SysmenuConfig,
    gate: &ButtonGate,
) -> Option<SysmenuItem> {
    if gate.hidden || gate.auto || gate.skip {
        return None;
    }
    let item = pointed?;
    let enabled = match item.action() {
        MenuAction::Custom(slot) => custom_gosub(config, slot).is_some(),
        action => gate.allows(action),
    };
    enabled.then_some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn config() -> SysmenuConfig {
        let mut sysmenu = EngineConfig::default().sysmenu;
        sysmenu.rect = Rect::new(1000, 0, 200, 300);
        sysmenu.items.history = Some(Rect::new(0, 0, 200, 30));
        sysmenu.items.custom1 = Some(Rect::new(0, 30, 200, 30));
        sysmenu
    }

    #[test]
    fn test_pointed_item() {
        let sysmenu = config();
        let mut input = InputSnapshot::new();
        input.mouse_x = 1010;
        input.mouse_y = 40;
        assert_eq!(pointed_item(&sysmenu, &input), Some(SysmenuItem::Custom1));
        input.mouse_x = 10;
        assert_eq!(pointed_item(&sysmenu, &input), None);
    }

    #[test]
    fn test_custom_item_requires_gosub() {
        let mut sysmenu = config();
        let gate = ButtonGate {
            save_load_enabled: true,
            ..ButtonGate::default()
        };
        assert_eq!(adjust(Some(SysmenuItem::Custom1), &sysmenu, &gate), None);

        sysmenu.custom1_gosub = Some("OMAKE".to_string());
        assert_eq!(
            adjust(Some(SysmenuItem::Custom1), &sysmenu, &gate),
            Some(SysmenuItem::Custom1)
        );
        assert_eq!(custom_gosub(&sysmenu, 1), Some("OMAKE"));
        assert_eq!(custom_gosub(&sysmenu, 2), None);
    }

    #[test]
    fn test_qload_requires_quick_save() {
        let sysmenu = config();
        let gate = ButtonGate {
            save_load_enabled: true,
            ..ButtonGate::default()
        };
        assert_eq!(adjust(Some(SysmenuItem::QLoad), &sysmenu, &gate), None);
        assert_eq!(
            adjust(Some(SysmenuItem::History), &sysmenu, &gate),
            Some(SysmenuItem::History)
        );
    }
}
