//! # Save 模块
//!
//! 存档数据结构，覆盖执行位置、舞台、混音器与变量。
//!
//! 字节格式由 [`SaveStore`](crate::platform::SaveStore) 的实现决定，
//! 这里只提供 JSON 形式的序列化。

use serde::{Deserialize, Serialize};

use crate::cursor::ScriptCursor;
use crate::error::SaveError;
use crate::history::{History, SeenRegistry};
use crate::stage::{MixerState, StageState};
use crate::vars::Variables;

/// 存档格式版本
///
/// 主版本不同视为不兼容；次版本只增加带默认值的字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
}

impl SaveVersion {
    pub fn current() -> Self {
        Self { major: 1, minor: 0 }
    }

    /// 是否能被当前版本读取
    pub fn is_compatible(&self) -> bool {
        self.major == Self::current().major
    }
}

impl std::fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// 存档数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: SaveVersion,
    /// 脚本名
    pub script: String,
    /// 执行位置与调用栈
    pub cursor: ScriptCursor,
    pub vars: Variables,
    pub stage: StageState,
    pub mixer: MixerState,
    #[serde(default)]
    pub seen: SeenRegistry,
    #[serde(default)]
    pub history: History,
    /// 是否允许存读档
    #[serde(default = "default_true")]
    pub save_load_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl SaveData {
    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let data: SaveData = serde_json::from_str(json)
            .map_err(|e| SaveError::DeserializationFailed(e.to_string()))?;

        // 检查版本兼容性
        if !data.version.is_compatible() {
            return Err(SaveError::VersionMismatch {
                save_version: data.version.to_string(),
                current_version: SaveVersion::current().to_string(),
            });
        }

        Ok(data)
    }
}
