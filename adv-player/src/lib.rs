//! # ADV Player
//!
//! 无窗口的脚本播放器：从 JSON 加载脚本与配置，按输入时间线逐帧驱动
//! [`Engine`]。字形使用等宽度量，音频静音，覆盖层立即关闭。
//!
//! ## 模块结构
//!
//! - [`cli`]：命令行参数
//! - [`timeline`]：输入时间线
//! - [`store`]：文件形式的快速存档
//! - [`player`]：帧循环

pub mod cli;
pub mod player;
pub mod store;
pub mod timeline;

use std::path::Path;

use adv_runtime::{Engine, EngineConfig, Platform, Script, ScriptSource};
use anyhow::Context;

pub use cli::Cli;
pub use player::{Player, RunSummary};
pub use store::FileSaveStore;
pub use timeline::{InputTimeline, TimedInput};

/// 读取 JSON 形式的脚本
pub fn load_script(path: impl AsRef<Path>) -> anyhow::Result<Script> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取脚本: {}", path.display()))?;
    let source: ScriptSource = serde_json::from_str(&json)
        .with_context(|| format!("脚本格式错误: {}", path.display()))?;
    Ok(Script::from_source(source)?)
}

/// 按命令行参数组装播放器
///
/// 配置优先级：命令行 > 配置文件 > 默认值。
pub fn build_player(cli: &Cli) -> anyhow::Result<Player> {
    let mut config = EngineConfig::load(&cli.config);
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }

    let script = load_script(&cli.script)?;
    let timeline = match &cli.input {
        Some(path) => InputTimeline::load(path)?,
        None => InputTimeline::default(),
    };

    let mut platform = Platform::headless();
    if let Some(dir) = &cli.saves {
        platform.saves = Box::new(FileSaveStore::new(dir));
    }

    let engine = Engine::new(config, script, platform).context("引擎初始化失败")?;
    Ok(Player::new(engine, timeline, cli.fps, cli.frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;

    const SCRIPT: &str = r#"{
        "name": "main",
        "commands": [
            { "cmd": "label", "name": "start" },
            { "locale": "en", "cmd": "message", "text": "Hello" },
            { "locale": "ja", "cmd": "message", "text": "こんにちは" }
        ]
    }"#;

    #[test]
    fn test_build_player_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.json");
        std::fs::write(&script, SCRIPT).unwrap();
        let input = dir.path().join("input.json");
        std::fs::write(
            &input,
            r#"[
                { "frame": 2, "event": { "type": "key_down", "key": "return" } },
                { "frame": 4, "event": { "type": "key_down", "key": "return" } }
            ]"#,
        )
        .unwrap();

        let args: Vec<OsString> = vec![
            "adv-player".into(),
            "--script".into(),
            script.into_os_string(),
            "--config".into(),
            dir.path().join("missing.json").into_os_string(),
            "--input".into(),
            input.into_os_string(),
            "--locale".into(),
            "en".into(),
        ];
        let cli = Cli::parse_from(args);
        let mut player = build_player(&cli).unwrap();
        assert_eq!(player.engine().session().config.locale, "en");

        let summary = player.run().unwrap();
        assert!(summary.finished);
        assert_eq!(summary.history, 1);
        assert_eq!(player.engine().session().history.last().unwrap().text, "Hello");
    }

    #[test]
    fn test_load_script_reports_path() {
        let err = load_script("no/such/script.json").unwrap_err();
        assert!(err.to_string().contains("no/such/script.json"));
    }
}
