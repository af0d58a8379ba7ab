//! # Script 模块
//!
//! 已加载的命令序列。
//!
//! 脚本源码的解析不在 Runtime 内完成：Host 或工具链把脚本转换为
//! JSON 形式的命令列表，Runtime 只负责索引标签并按游标执行。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandKind};
use crate::error::ScriptError;

/// 脚本的 JSON 形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSource {
    /// 脚本名
    pub name: String,
    /// 命令列表
    pub commands: Vec<Command>,
}

/// 已加载的脚本
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    name: String,
    commands: Vec<Command>,
    labels: HashMap<String, usize>,
}

impl Script {
    /// 由命令列表创建脚本并建立标签索引
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Result<Self, ScriptError> {
        let name = name.into();
        if commands.is_empty() {
            return Err(ScriptError::EmptyScript { script: name });
        }

        let mut labels = HashMap::new();
        for (index, cmd) in commands.iter().enumerate() {
            if let CommandKind::Label { name: label } = &cmd.kind {
                if let Some(first) = labels.insert(label.clone(), index) {
                    return Err(ScriptError::DuplicateLabel {
                        label: label.clone(),
                        first,
                        second: index,
                    });
                }
            }
        }

        Ok(Self {
            name,
            commands,
            labels,
        })
    }

    /// 由 JSON 形式创建脚本
    pub fn from_source(source: ScriptSource) -> Result<Self, ScriptError> {
        Self::new(source.name, source.commands)
    }

    /// 脚本名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 命令数量
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// 是否为空（构造时已拒绝空脚本，恒为 false）
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 获取命令
    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    /// 获取命令，越界时返回错误
    pub fn command(&self, index: usize) -> Result<&Command, ScriptError> {
        self.commands.get(index).ok_or(ScriptError::IndexOutOfRange {
            index,
            count: self.commands.len(),
        })
    }

    /// 所有命令
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// 查找标签所在的命令索引
    pub fn find_label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    /// 收集引用了未定义标签的命令
    ///
    /// 返回 `(命令索引, 标签名)` 列表。`unless` 的 `finally` 标签只有在主标签也不存在时才算缺失。
    pub fn undefined_jump_targets(&self) -> Vec<(usize, String)> {
        let mut missing = Vec::new();
        for (index, cmd) in self.commands.iter().enumerate() {
            if let CommandKind::Unless { label, finally, .. } = &cmd.kind {
                if self.find_label(label).is_none()
                    && (finally.is_empty() || self.find_label(finally).is_none())
                {
                    missing.push((index, label.clone()));
                }
                continue;
            }
            for target in cmd.kind.jump_targets() {
                if self.find_label(target).is_none() {
                    missing.push((index, target.to_string()));
                }
            }
        }
        missing
    }

    /// 转换回 JSON 形式
    pub fn to_source(&self) -> ScriptSource {
        ScriptSource {
            name: self.name.clone(),
            commands: self.commands.clone(),
        }
    }
}
