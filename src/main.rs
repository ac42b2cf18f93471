use anyhow::Context;
use clap::Parser;
use nomination_board::app::{render, report};
use nomination_board::config::{Cli, Command};
use nomination_board::core::submission::{FormState, SubmissionPhase};
use nomination_board::utils::error::{BoardError, ErrorSeverity};
use nomination_board::utils::{logger, validation::Validate};
use nomination_board::{AppConfig, BoardSettings, FirestoreBackend, NominationApp};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("📁 Loading configuration from: {}", cli.config);

    let config = match AppConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate().and_then(|_| config.firebase().map(|_| ())) {
        exit_with(&e);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let firebase = config
        .firebase()
        .context("firebase section is required")?;
    let backend = Arc::new(FirestoreBackend::new(firebase).context("failed to build HTTP client")?);

    // 驗證失敗即為致命錯誤，不提供重試
    let app = match NominationApp::start(backend, BoardSettings::from(&config)).await {
        Ok(app) => app,
        Err(e) => exit_with(&e),
    };

    match cli.command {
        Command::Register(args) => {
            let state = app.submit(FormState::new(args.into())).await;
            if state.phase == SubmissionPhase::Succeeded {
                println!("{}", app.success_view().render());
            } else {
                eprint!("{}", render::render_form_feedback(&state));
                std::process::exit(2);
            }
        }
        Command::Tally { csv } => {
            let tally = app.current_tally().await;
            print!("{}", render::render_board(&tally));
            if let Some(path) = csv {
                report::export_tally_csv(&tally.days, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("📁 Tally saved to: {}", path.display());
            }
        }
        Command::Watch => {
            let mut view = app.mount_live_view();
            print!("{}", render::render_board(&view.current()));
            loop {
                tokio::select! {
                    update = view.changed() => match update {
                        Some(tally) => {
                            println!();
                            print!("{}", render::render_board(&tally));
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Stopping live view");
                        break;
                    }
                }
            }
            view.teardown();
        }
    }

    Ok(())
}

fn exit_with(e: &BoardError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
