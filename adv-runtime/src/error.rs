//! # Error 模块
//!
//! 定义 adv-runtime 中使用的错误类型。
//!
//! ## 分类
//!
//! - [`ScriptError`]：脚本作者错误（参数非法、标签缺失等），终止当前会话
//! - [`ModeError`]：被拒绝的模式切换（auto/skip 互斥等）
//! - [`SaveError`]：存档序列化/版本错误
//! - [`RuntimeError`]：引擎级错误，由游戏循环向上传播

use thiserror::Error;

use crate::config::ConfigError;

/// 脚本错误
///
/// 由脚本作者引起，命令中止当前帧并终止脚本执行。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// 标签未找到
    #[error("标签 '{label}' 未找到")]
    LabelNotFound { label: String },

    /// 标签重复定义
    #[error("标签 '{label}' 重复定义（命令 {first} 与 {second}）")]
    DuplicateLabel {
        label: String,
        first: usize,
        second: usize,
    },

    /// 空脚本
    #[error("脚本 '{script}' 不包含任何命令")]
    EmptyScript { script: String },

    /// 命令索引越界
    #[error("命令索引 {index} 越界（共 {count} 条命令）")]
    IndexOutOfRange { index: usize, count: usize },

    /// 无效的变量引用
    #[error("'{name}' 不是有效的变量")]
    InvalidVariable { name: String },

    /// 变量索引越界
    #[error("变量索引 {index} 越界")]
    VariableIndex { index: i64 },

    /// 无效的运算符
    #[error("无效的运算符 '{op}'")]
    InvalidOperator { op: String },

    /// 除数为零
    #[error("变量 '{lhs}' 的运算除数为零")]
    DivisionByZero { lhs: String },

    /// 无效的参数值
    #[error("命令 '{command}' 的参数 '{param}' 无效：{message}")]
    InvalidParameter {
        command: &'static str,
        param: &'static str,
        message: String,
    },

    /// 没有可返回的位置
    #[error("return 时调用栈为空")]
    EmptyReturnStack,
}

/// 模式切换错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeError {
    /// 试图在 skip 模式中开启 auto 模式
    #[error("skip 模式中不能开启 auto 模式")]
    AutoWhileSkip,

    /// 试图在 auto 模式中开启 skip 模式
    #[error("auto 模式中不能开启 skip 模式")]
    SkipWhileAuto,

    /// 模式已开启
    #[error("{0} 模式已开启")]
    AlreadyActive(&'static str),

    /// 模式未开启
    #[error("{0} 模式未开启")]
    NotActive(&'static str),
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    /// 序列化失败
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    /// 反序列化失败
    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    /// 版本不兼容
    #[error("存档版本不兼容: 存档版本 {save_version}, 当前版本 {current_version}")]
    VersionMismatch {
        save_version: String,
        current_version: String,
    },

    /// 存档属于其他脚本
    #[error("存档脚本 '{saved}' 与当前脚本 '{current}' 不一致")]
    ScriptMismatch { saved: String, current: String },

    /// 存储后端失败
    #[error("存储失败: {0}")]
    Store(String),
}

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 脚本错误
    #[error("脚本错误: {0}")]
    Script(#[from] ScriptError),

    /// 模式错误
    #[error("模式错误: {0}")]
    Mode(#[from] ModeError),

    /// 存档错误
    #[error("存档错误: {0}")]
    Save(#[from] SaveError),

    /// 覆盖层（GUI）失败
    #[error("覆盖层 '{file}' 执行失败: {message}")]
    Overlay { file: String, message: String },

    /// 资源（音频/图像）加载失败
    #[error("资源 '{file}' 加载失败: {message}")]
    Resource { file: String, message: String },

    /// 快速读档失败
    #[error("快速读档失败")]
    QuickLoadFailed,

    /// 跨帧协议被破坏（引擎缺陷）
    #[error("跨帧执行协议错误: {message}")]
    RepetitionViolation { message: String },
}

/// adv-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvError {
    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl From<ScriptError> for AdvError {
    fn from(e: ScriptError) -> Self {
        AdvError::Runtime(RuntimeError::Script(e))
    }
}

impl From<SaveError> for AdvError {
    fn from(e: SaveError) -> Self {
        AdvError::Runtime(RuntimeError::Save(e))
    }
}

/// Result 类型别名
pub type AdvResult<T> = Result<T, AdvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let err: AdvError = ScriptError::LabelNotFound {
            label: "end".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            AdvError::Runtime(RuntimeError::Script(ScriptError::LabelNotFound { .. }))
        ));
        assert!(err.to_string().contains("end"));
    }

    #[test]
    fn test_mode_error_display() {
        let err = RuntimeError::from(ModeError::AutoWhileSkip);
        assert!(err.to_string().contains("auto"));
    }
}
