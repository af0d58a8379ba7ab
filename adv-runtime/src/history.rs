//! # History 模块
//!
//! 消息历史（回想）与已读标记。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// 默认最多保留的历史条数
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// 一条历史记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 说话者（旁白为 None）
    pub name: Option<String>,
    /// 展开变量后的消息文本
    pub text: String,
    /// 语音文件
    pub voice: Option<String>,
}

/// 历史记录容器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// 创建新的历史记录
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// 设置最大记录数
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// 添加记录
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(..overflow);
        }
    }

    /// 把文本追加到最后一条记录（续行消息）
    ///
    /// 没有记录时新建一条旁白。
    pub fn append(&mut self, text: &str) {
        match self.entries.last_mut() {
            Some(last) => last.text.push_str(text),
            None => self.push(HistoryEntry {
                name: None,
                text: text.to_string(),
                voice: None,
            }),
        }
    }

    /// 所有记录
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// 最后一条记录
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// 已读标记
///
/// 以 `(脚本名, 命令索引)` 标识一条消息。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRegistry {
    seen: BTreeSet<(String, usize)>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已读
    pub fn is_seen(&self, script: &str, index: usize) -> bool {
        self.seen.contains(&(script.to_string(), index))
    }

    /// 标记为已读
    pub fn mark(&mut self, script: &str, index: usize) {
        self.seen.insert((script.to_string(), index));
    }

    /// 合并另一份已读标记
    pub fn merge(&mut self, other: &SeenRegistry) {
        self.seen.extend(other.seen.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> HistoryEntry {
        HistoryEntry {
            name: None,
            text: text.to_string(),
            voice: None,
        }
    }

    #[test]
    fn test_history_max_entries() {
        let mut history = History::new().with_max_entries(5);
        for i in 0..10 {
            history.push(entry(&format!("对话 {}", i)));
        }
        assert_eq!(history.len(), 5);
        // 应该保留最后 5 条
        assert_eq!(history.entries()[0].text, "对话 5");
        assert_eq!(history.last().map(|e| e.text.as_str()), Some("对话 9"));
    }

    #[test]
    fn test_history_append() {
        let mut history = History::new();
        history.append("开头");
        history.push(entry("第一行"));
        history.append("第二行");
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[1].text, "第一行第二行");
    }

    #[test]
    fn test_seen_registry() {
        let mut seen = SeenRegistry::new();
        assert!(!seen.is_seen("main", 3));
        seen.mark("main", 3);
        seen.mark("main", 3);
        assert!(seen.is_seen("main", 3));
        assert!(!seen.is_seen("other", 3));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_history_serialization() {
        let mut history = History::new();
        history.push(HistoryEntry {
            name: Some("A".to_string()),
            text: "内容".to_string(),
            voice: Some("a001.ogg".to_string()),
        });
        let json = serde_json::to_string(&history).unwrap();
        let loaded: History = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, history);
    }
}
