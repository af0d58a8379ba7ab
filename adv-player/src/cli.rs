//! 命令行参数。

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "adv-player")]
#[command(about = "无窗口播放器 - 按输入时间线逐帧运行脚本")]
#[command(version)]
pub struct Cli {
    /// 脚本文件（JSON）
    #[arg(short, long)]
    pub script: PathBuf,

    /// 配置文件（JSON，不存在时使用默认配置）
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// 输入时间线（JSON）
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 最多执行的帧数
    #[arg(short, long, default_value = "3600")]
    pub frames: u64,

    /// 帧率
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// 快速存档目录（不指定时存档只保存在内存中）
    #[arg(long)]
    pub saves: Option<PathBuf>,

    /// 覆盖配置文件中的语言
    #[arg(long)]
    pub locale: Option<String>,

    /// 输出每帧的调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["adv-player", "--script", "main.json"]);
        assert_eq!(cli.script, PathBuf::from("main.json"));
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.frames, 3600);
        assert_eq!(cli.fps, 60);
        assert!(cli.input.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "adv-player",
            "-s",
            "main.json",
            "--fps",
            "30",
            "--locale",
            "en",
            "--saves",
            "saves",
            "-v",
        ]);
        assert_eq!(cli.fps, 30);
        assert_eq!(cli.locale.as_deref(), Some("en"));
        assert_eq!(cli.saves, Some(PathBuf::from("saves")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_script_is_required() {
        assert!(Cli::try_parse_from(["adv-player"]).is_err());
    }
}
