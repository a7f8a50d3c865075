use alistsync_lib::config::{AppConfig, Cli};
use alistsync_lib::core::{count_files, SyncEngine};
use alistsync_lib::error::{error_chain, SyncError};
use alistsync_lib::logging::{self, LogConfig};
use alistsync_lib::storage::{AlistClient, RemoteFs};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig::load(cli.config.as_deref()), cli.verbose);

    let config = AppConfig::resolve(&cli);

    let client = AlistClient::new(&config.endpoint, &config.username, &config.password)
        .context("创建 Alist 客户端失败")?;
    let storage: Arc<dyn RemoteFs> = Arc::new(client);
    let engine = SyncEngine::new(storage, config.sync_config());

    if config.dry_run {
        let plan = engine
            .analyze()
            .await
            .inspect_err(log_fatal)
            .context("分析差异失败")?;
        for (dir, names) in &plan.deletions {
            info!("[dry-run] 删除 {}: {:?}", dir, names);
        }
        for (dir, names) in &plan.uploads {
            info!("[dry-run] 上传 {}: {:?}", dir, names);
        }
        info!(
            "[dry-run] 目标 {} 个文件, 源 {} 个文件; 将删除 {} 个, 上传 {} 个",
            plan.dest_files,
            plan.source_files,
            count_files(&plan.deletions),
            count_files(&plan.uploads)
        );
        return Ok(());
    }

    engine.run().await.inspect_err(log_fatal).context("同步失败")?;
    Ok(())
}

fn log_fatal(err: &SyncError) {
    error!("{}", error_chain(err));
}
