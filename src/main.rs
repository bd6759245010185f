//! d2tool 실행 파일
//!
//! ## 사용법
//! ```text
//! d2tool [run]          # 백그라운드 업데이트 체크와 함께 실행 (Ctrl+C로 종료)
//! d2tool check          # 업데이트 확인
//! d2tool check --json   # JSON 출력
//! d2tool apply          # 확인 후 새 릴리스 적용
//! d2tool status         # 버전과 업데이트 설정 표시
//! d2tool help           # 도움말
//! ```
//!
//! ## 종료 코드 (check --json)
//! - `0`: 업데이트 있음
//! - `1`: 에러
//! - `2`: 업데이트 없음 (최신 상태)

use anyhow::Result;
use d2tool::app::{self, VERSION};
use d2tool::config::{config_file_path, GlobalConfig};
use d2tool_updater_lib::{platform, scheduler, UpdaterError};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args_ref: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    if matches!(args_ref.first(), Some(&("help" | "--help" | "-h"))) {
        print_help();
        return;
    }
    if matches!(args_ref.first(), Some(&("--version" | "-V"))) {
        println!("d2tool {}", VERSION);
        return;
    }

    let config = match GlobalConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("✗ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    app::init_logging(config.log_level.as_deref());

    if let Err(e) = dispatch(&args_ref, config).await {
        eprintln!("✗ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(args: &[&str], config: GlobalConfig) -> Result<()> {
    match args.first().copied().unwrap_or("run") {
        "run" => app::run(config).await,
        "check" => cmd_check(config, &args[1..]).await,
        "apply" => cmd_apply(config).await,
        "status" => cmd_status(config),
        other => {
            eprintln!("✗ Unknown command: {}", other);
            eprintln!("  Run 'd2tool help' for usage.");
            std::process::exit(1);
        }
    }
}

// ═══════════════════════════════════════════════════════
// 명령어 핸들러
// ═══════════════════════════════════════════════════════

async fn cmd_check(config: GlobalConfig, flags: &[&str]) -> Result<()> {
    let json_mode = flags.contains(&"--json");
    let engine = app::build_engine(&config)?;
    let result = scheduler::check_once(&*engine).await;

    if json_mode {
        println!("{}", scheduler::result_to_json(&result));
        std::process::exit(scheduler::exit_code(&result));
    }

    if let Some(err) = &result.error {
        eprintln!("✗ Check failed: {}", err);
        std::process::exit(1);
    }

    if result.update_available {
        println!(
            "📦 Update available: {} -> {}",
            result.current_version, result.latest_version
        );
        println!("💡 Run 'd2tool apply' to install it.");
    } else {
        println!("✓ d2tool {} is up to date.", result.current_version);
    }
    Ok(())
}

async fn cmd_apply(config: GlobalConfig) -> Result<()> {
    let engine = app::build_engine(&config)?;

    println!("⏳ Checking for updates...");
    let state = engine.check_for_update().await?;
    if !state.update_available {
        println!("✓ d2tool {} is up to date.", state.current_version);
        return Ok(());
    }

    println!("⏳ Applying {}...", state.latest_version);
    match engine.apply_update().await {
        Ok(applied) => {
            println!(
                "✓ Installed {} ({}, {} bytes, {} file(s))",
                applied.version, applied.asset_name, applied.bytes, applied.entries
            );
            if applied.restart_required {
                println!("💡 Restart d2tool to run the new version.");
            }
            Ok(())
        }
        Err(e @ UpdaterError::NoMatchingAsset { .. }) => {
            eprintln!("⚠ {}", e);
            eprintln!("  No build is published for this platform yet.");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_status(config: GlobalConfig) -> Result<()> {
    let updater = &config.updater;

    println!("📋 d2tool {}", VERSION);
    println!("─────────────────────────────────────────────");
    println!("  Config file:    {}", config_file_path().display());
    println!("  Install root:   {}", updater.resolve_install_root().display());
    println!("  Release feed:   {}/{}", updater.github_owner, updater.github_repo);
    if let Some(url) = &updater.api_base_url {
        println!("  API base URL:   {}", url);
    }
    println!("  Asset prefix:   {}", platform::asset_name_prefix(&updater.tool_name));
    if updater.enabled && updater.check_interval_hours > 0 {
        println!("  Auto check:     every {}h", updater.check_interval_hours);
    } else {
        println!("  Auto check:     disabled");
    }
    println!("  Startup check:  {}", if updater.check_on_startup { "yes" } else { "no" });
    Ok(())
}

fn print_help() {
    println!("d2tool {}", VERSION);
    println!();
    println!("USAGE:");
    println!("  d2tool [command] [args...]");
    println!();
    println!("COMMANDS:");
    println!("  run                 Run with background update checks (default)");
    println!("  check               Check for a newer release");
    println!("  check --json        Check and output JSON (exit 0/1/2)");
    println!("  apply               Check, then download and install the new release");
    println!("  status              Show version and updater configuration");
    println!("  help                This help message");
    println!("  --version           Print the version");
    println!();
    println!("CONFIG:");
    println!("  config/global.toml  [updater] section, next to the executable or in the CWD");
}
