//! # Runtime 模块
//!
//! 执行引擎：会话状态、命令分发与游戏循环。
//!
//! ## 模块结构
//!
//! - [`session`]：一次游玩会话的全部可变状态
//! - [`handlers`]：每种命令的处理器与跨帧命令
//! - [`dispatcher`]：命令分发与 repetition 协议
//! - [`game_loop`]：每帧驱动、覆盖层与读档

pub mod dispatcher;
pub mod game_loop;
pub mod handlers;
pub mod session;

pub use dispatcher::{Dispatch, Dispatcher, Repetition};
pub use game_loop::Engine;
pub use handlers::{ActiveCommand, OverlayRequest, StepStatus};
pub use session::Session;
