//! # adv-player
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p adv-player -- --script main.json
//! cargo run -p adv-player -- --script main.json --input input.json --saves saves -v
//! ```

use std::process::ExitCode;

use adv_player::{Cli, build_player};
use clap::Parser;
use tracing::{Level, error};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut player = build_player(cli)?;
    let summary = player.run()?;
    println!(
        "frames={} finished={} index={} history={}",
        summary.frames, summary.finished, summary.index, summary.history
    );
    if !summary.finished {
        anyhow::bail!("达到帧数上限 {} 时脚本仍未结束", cli.frames);
    }
    Ok(())
}
