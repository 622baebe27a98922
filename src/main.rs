// ==========================================
// 试算平衡表导入系统 - 命令行入口
// ==========================================
// 子命令: ingest-file / ingest-batch / init-db
// 输出: 结果以 JSON 打印到 stdout，日志写 stderr
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tb_ingest::{db, logging, IngestionApi, IngestionJob};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tb-ingest")]
#[command(author, version, about = "Trial balance CSV ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (default: TB_INGEST_DB_PATH or user data dir)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a single trial balance file
    IngestFile {
        /// CSV file path
        path: PathBuf,

        #[arg(long)]
        entity: String,

        #[arg(long)]
        period: String,

        /// Re-ingest even if identical content was ingested before
        #[arg(long)]
        skip_duplicates: bool,

        /// Run the data quality validator before persisting
        #[arg(long)]
        validate: bool,
    },

    /// Ingest many files concurrently with retries
    IngestBatch {
        /// Job spec as path:entity:period (repeatable)
        #[arg(long = "job", required = true, value_parser = parse_job_spec)]
        jobs: Vec<JobSpec>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long)]
        max_retries: Option<usize>,

        #[arg(long)]
        skip_duplicates: bool,

        #[arg(long)]
        validate: bool,
    },

    /// Create the database schema
    InitDb,
}

#[derive(Debug, Clone, PartialEq)]
struct JobSpec {
    path: PathBuf,
    entity: String,
    period: String,
}

/// 解析 path:entity:period（从右侧切分，路径中可含冒号）
fn parse_job_spec(raw: &str) -> Result<JobSpec, String> {
    let mut parts = raw.rsplitn(3, ':');
    let period = parts.next().map(str::trim).unwrap_or_default();
    let entity = parts.next().map(str::trim).unwrap_or_default();
    let path = parts.next().map(str::trim).unwrap_or_default();

    if path.is_empty() || entity.is_empty() || period.is_empty() {
        return Err(format!("invalid job spec '{}', expected path:entity:period", raw));
    }

    Ok(JobSpec {
        path: PathBuf::from(path),
        entity: entity.to_string(),
        period: period.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let db_path = cli.db.clone().unwrap_or_else(db::default_db_path);
    info!("{} v{}", tb_ingest::APP_NAME, tb_ingest::VERSION);
    info!(db_path = %db_path, "使用数据库");

    match cli.command {
        Command::InitDb => {
            let conn = db::open_shared(&db_path)
                .with_context(|| format!("failed to initialise database at {}", db_path))?;
            let version = {
                let guard = conn.lock().map_err(|e| anyhow!("database lock poisoned: {}", e))?;
                db::read_schema_version(&guard)?
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "db_path": db_path,
                    "schema_version": version,
                }))?
            );
        }
        Command::IngestFile {
            path,
            entity,
            period,
            skip_duplicates,
            validate,
        } => {
            let api = Arc::new(IngestionApi::new(&db_path)?);
            let result = tokio::task::spawn_blocking(move || {
                api.ingest_file(&path, &entity, &period, skip_duplicates, validate)
            })
            .await
            .context("ingestion task panicked")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::IngestBatch {
            jobs,
            max_workers,
            max_retries,
            skip_duplicates,
            validate,
        } => {
            let api = IngestionApi::new(&db_path)?;
            let max_workers = max_workers.unwrap_or(api.config().max_workers);
            let max_retries = max_retries.unwrap_or(api.config().max_retries);

            let jobs: Vec<IngestionJob> = jobs
                .into_iter()
                .map(|spec| {
                    IngestionJob::new(spec.path, spec.entity, spec.period)
                        .with_skip_duplicates(skip_duplicates)
                        .with_validation(validate)
                })
                .collect();

            // Ctrl-C 只停止启动新任务
            let cancel = api.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号，取消剩余任务");
                    cancel.cancel();
                }
            });

            let batch = api.ingest_batch(jobs, max_workers, max_retries).await;
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
    }

    Ok(())
}
