use clap::Parser;
use commerce_etl::config::cli::{Command, StagePlan};
use commerce_etl::core::{StageReport, Storage};
use commerce_etl::utils::{logger, validation::Validate};
use commerce_etl::{
    Cli, CleanStage, DatabaseSettings, EtlEngine, EtlError, IngestStage, LoadStage, LocalStorage,
    PostgresWarehouse, Result, RunTimestamp, S3Storage, SchemaRegistry, SourceLayout,
    StorageSettings,
};
use std::sync::Arc;

/// Everything a command needs, resolved before any stage starts.
struct Prepared {
    plan: StagePlan,
    run_ts: RunTimestamp,
    registry: Arc<SchemaRegistry>,
    layout: Option<SourceLayout>,
    database: Option<DatabaseSettings>,
    monitor: bool,
}

#[tokio::main]
async fn main() {
    // .env 不存在時忽略
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Command::RunTs = cli.command {
        println!("{}", RunTimestamp::now());
        return;
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let prepared = prepare(&cli)?;

    match &cli.local_store {
        Some(dir) => {
            tracing::info!("📁 Using local store at {}", dir.display());
            execute(LocalStorage::new(dir), prepared).await
        }
        None => {
            let settings = StorageSettings::from_env()?;
            settings.validate()?;
            execute(S3Storage::from_settings(&settings).await, prepared).await
        }
    }
}

fn prepare(cli: &Cli) -> Result<Prepared> {
    let (Some(plan), Some(run_ts)) = (cli.command.plan(), cli.command.run_ts()) else {
        return Err(EtlError::ConfigValidationError {
            field: "command".to_string(),
            message: "run-ts does not execute any stage".to_string(),
        });
    };

    let registry = match &cli.schema {
        Some(path) => SchemaRegistry::from_file(path)?,
        None => SchemaRegistry::ecommerce()?,
    };

    let layout = match cli.command.ingest_args() {
        Some(args) => {
            let layout = match &args.sources {
                Some(path) => SourceLayout::from_file(path)?,
                None => SourceLayout::new(&args.source_dir),
            };
            layout.validate()?;
            Some(layout)
        }
        None => None,
    };

    let database = if plan.load {
        let settings = DatabaseSettings::from_env()?;
        settings.validate()?;
        Some(settings)
    } else {
        None
    };

    Ok(Prepared {
        plan,
        run_ts: run_ts.clone(),
        registry: Arc::new(registry),
        layout,
        database,
        monitor: cli.monitor,
    })
}

async fn execute<S: Storage + Clone + 'static>(storage: S, prepared: Prepared) -> Result<()> {
    let mut engine = EtlEngine::new_with_monitoring(prepared.monitor);

    if let Some(layout) = prepared.layout {
        engine.add_stage(Box::new(IngestStage::new(storage.clone(), layout)));
    }
    if prepared.plan.clean {
        engine.add_stage(Box::new(CleanStage::new(
            storage.clone(),
            prepared.registry.clone(),
        )));
    }
    if let Some(settings) = &prepared.database {
        let warehouse = PostgresWarehouse::connect(settings).await?;
        engine.add_stage(Box::new(LoadStage::new(
            storage.clone(),
            warehouse,
            settings.schema.clone(),
        )));
    }

    tracing::info!("🔧 Stages: {}", engine.stage_names().join(" → "));
    let reports = engine.run(&prepared.run_ts).await?;
    print_summary(&reports, &prepared.run_ts);
    Ok(())
}

fn print_summary(reports: &[StageReport], run_ts: &RunTimestamp) {
    println!("✅ Run {} completed", run_ts);
    for report in reports {
        for table in &report.tables {
            match table.dropped {
                Some((missing, duplicates)) => println!(
                    "  {:<6} {:<12} {:>8} rows  (-{} missing required, -{} duplicates)  {}",
                    report.stage,
                    table.table.as_str(),
                    table.rows,
                    missing,
                    duplicates,
                    table.key
                ),
                None => println!(
                    "  {:<6} {:<12} {:>8} rows  {}",
                    report.stage,
                    table.table.as_str(),
                    table.rows,
                    table.key
                ),
            }
        }
    }
}
