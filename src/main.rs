use anyhow::Context;
use chaos_etl::utils::error::ErrorSeverity;
use chaos_etl::utils::{logger, validation::Validate};
use chaos_etl::{Action, ChaosError, CliConfig, IndexClient, Orchestrator, Settings};
use clap::{CommandFactory, Parser};

fn exit_code(e: &ChaosError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(context: &str, e: &ChaosError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    eprintln!("[-] {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e).max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("[-] {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_cli_logger(cli.verbose, settings.log_format);
    tracing::debug!("Settings: {:?}", settings);

    if let Err(e) = settings.validate() {
        fail("Configuration validation failed", &e);
    }

    let index_client = IndexClient::from_config(&settings)?;
    let index = match index_client.load_or_refresh(cli.refresh).await {
        Ok(index) => index,
        Err(e) => {
            tracing::error!("[-] Error loading index: {}", e);
            eprintln!("[-] Error loading index: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("{} programs in index", index.len());

    // 沒有指定動作時，索引照樣抓取後才顯示說明
    let Some(action) = cli.action() else {
        if !cli.refresh {
            CliConfig::command().print_help()?;
        }
        return Ok(());
    };

    let orchestrator = Orchestrator::from_config(&settings)?.new_with_monitoring(cli.monitor);
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match action {
        Action::List => {
            for entity in &index {
                println!("{}", entity.name);
            }
        }
        Action::Download(target) => {
            if let Err(e) = orchestrator.run_download(&index, &target).await {
                fail("Download failed", &e);
            }
        }
        Action::Query(term) => {
            let mut stdout = tokio::io::stdout();
            orchestrator
                .run_query(&term, &mut stdout)
                .await
                .with_context(|| format!("query '{}' failed", term))?;
        }
    }

    Ok(())
}
