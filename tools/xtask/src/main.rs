//! # xtask
//!
//! 工作区内的开发命令：
//!
//! - `check-all`: 依次运行 fmt / clippy / test，任何一步失败即停止
//! - `lint-scripts [path] [--assets dir]`: 静态检查 JSON 脚本

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use adv_runtime::{CommandKind, Script, ScriptSource};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

/// `check-all` 的门禁步骤
const GATES: &[&[&str]] = &[
    &["fmt", "--all", "--", "--check"],
    &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    &["test", "--workspace"],
];

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "工作区开发命令")]
struct Cli {
    #[command(subcommand)]
    command: Tasks,
}

#[derive(Subcommand)]
enum Tasks {
    /// fmt + clippy + test
    CheckAll,

    /// 检查脚本
    ///
    /// error: JSON 无法解析、label 重复、跳转到不存在的 label；
    /// warn: gosub 与 return 不成对、引用的资源文件不存在。
    LintScripts {
        /// 脚本文件或目录
        #[arg(default_value = "assets/scripts")]
        path: PathBuf,

        /// 资源根目录
        #[arg(long, default_value = "assets")]
        assets: PathBuf,
    },
}

fn main() -> ExitCode {
    let result = match Cli::parse().command {
        Tasks::CheckAll => check_all(),
        Tasks::LintScripts { path, assets } => lint_scripts(&path, &assets),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn check_all() -> anyhow::Result<()> {
    for gate in GATES {
        let line = format!("cargo {}", gate.join(" "));
        eprintln!(">> {line}");
        let status = Command::new("cargo")
            .args(*gate)
            .status()
            .with_context(|| format!("无法启动 {line}"))?;
        if !status.success() {
            bail!("{line} 失败 ({status})");
        }
    }
    Ok(())
}

//-----------------------------------------------------------------------------
// lint-scripts
//-----------------------------------------------------------------------------

/// 诊断等级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warn,
}

/// 单条诊断
#[derive(Debug, PartialEq, Eq)]
struct Diagnostic {
    severity: Severity,
    message: String,
}

impl Diagnostic {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            message: message.into(),
        }
    }
}

fn lint_scripts(root: &Path, assets: &Path) -> anyhow::Result<()> {
    if !root.exists() {
        bail!("找不到 {}（请在工作区根目录运行）", root.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();

    let (mut errors, mut warnings) = (0, 0);
    for file in &files {
        let diagnostics = match std::fs::read_to_string(file) {
            Ok(json) => lint(&json, &|res| assets.join(res).is_file()),
            Err(e) => vec![Diagnostic::error(format!("读取失败: {e}"))],
        };
        for d in &diagnostics {
            let tag = match d.severity {
                Severity::Error => {
                    errors += 1;
                    "error"
                }
                Severity::Warn => {
                    warnings += 1;
                    "warn"
                }
            };
            eprintln!("{tag}: {}: {}", file.display(), d.message);
        }
    }

    eprintln!(
        "{} 个脚本，{errors} 个错误，{warnings} 个警告",
        files.len()
    );
    if errors > 0 {
        bail!("脚本检查未通过");
    }
    Ok(())
}

/// 检查一份脚本
///
/// `resource_exists` 以资源目录为根判断文件是否存在。
fn lint(json: &str, resource_exists: &dyn Fn(&str) -> bool) -> Vec<Diagnostic> {
    let script = match serde_json::from_str::<ScriptSource>(json)
        .map_err(|e| e.to_string())
        .and_then(|src| Script::from_source(src).map_err(|e| e.to_string()))
    {
        Ok(script) => script,
        Err(e) => return vec![Diagnostic::error(e)],
    };

    let mut out: Vec<Diagnostic> = script
        .undefined_jump_targets()
        .into_iter()
        .map(|(index, label)| Diagnostic::error(format!("#{index} 跳转到未定义的 label `{label}`")))
        .collect();

    let kinds = || script.commands().iter().map(|c| &c.kind);
    let gosubs = kinds()
        .filter(|k| matches!(k, CommandKind::Gosub { .. }))
        .count();
    let returns = kinds().filter(|k| matches!(k, CommandKind::Return)).count();
    match (gosubs, returns) {
        (g, 0) if g > 0 => out.push(Diagnostic::warn(format!("{g} 个 gosub，没有 return"))),
        (0, r) if r > 0 => out.push(Diagnostic::warn(format!(
            "{r} 个 return，没有 gosub（仅系统菜单子程序可用）"
        ))),
        _ => {}
    }

    for (index, kind) in kinds().enumerate() {
        out.extend(
            kind.resource_files()
                .into_iter()
                .filter(|&res| !resource_exists(res))
                .map(|res| Diagnostic::warn(format!("#{index} {} 引用的 {res} 不存在", kind.name()))),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everything(_: &str) -> bool {
        true
    }

    fn severities(diagnostics: &[Diagnostic]) -> Vec<Severity> {
        diagnostics.iter().map(|d| d.severity).collect()
    }

    #[test]
    fn test_clean_script() {
        let json = r#"{"name":"main","commands":[
            {"cmd":"gosub","label":"sub"},
            {"cmd":"message","text":"あ"},
            {"cmd":"label","name":"sub"},
            {"cmd":"return"}
        ]}"#;
        assert!(lint(json, &everything).is_empty());
    }

    #[test]
    fn test_undefined_label_is_error() {
        let json = r#"{"name":"main","commands":[{"cmd":"goto","label":"nowhere"}]}"#;
        let diagnostics = lint(json, &everything);
        assert_eq!(severities(&diagnostics), vec![Severity::Error]);
        assert!(diagnostics[0].message.contains("nowhere"));
    }

    #[test]
    fn test_duplicate_label_is_error() {
        let json = r#"{"name":"main","commands":[
            {"cmd":"label","name":"a"},
            {"cmd":"label","name":"a"}
        ]}"#;
        assert_eq!(severities(&lint(json, &everything)), vec![Severity::Error]);
    }

    #[test]
    fn test_unpaired_gosub_warns() {
        let json = r#"{"name":"main","commands":[
            {"cmd":"gosub","label":"sub"},
            {"cmd":"label","name":"sub"}
        ]}"#;
        assert_eq!(severities(&lint(json, &everything)), vec![Severity::Warn]);
    }

    #[test]
    fn test_missing_resource_warns() {
        let json = r#"{"name":"main","commands":[
            {"cmd":"background","file":"bg/room.png"},
            {"cmd":"bgm","file":"bgm/theme.ogg"}
        ]}"#;
        let diagnostics = lint(json, &|res| res == "bgm/theme.ogg");
        assert_eq!(severities(&diagnostics), vec![Severity::Warn]);
        assert!(diagnostics[0].message.contains("bg/room.png"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["xtask", "lint-scripts"]);
        assert!(matches!(
            cli.command,
            Tasks::LintScripts { path, assets }
                if path == Path::new("assets/scripts") && assets == Path::new("assets")
        ));
        assert!(matches!(
            Cli::parse_from(["xtask", "check-all"]).command,
            Tasks::CheckAll
        ));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert_eq!(severities(&lint("{", &everything)), vec![Severity::Error]);
    }
}
