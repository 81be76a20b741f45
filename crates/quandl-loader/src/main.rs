//! Quandl → DynamoDB loader CLI.

use clap::Parser;
use quandl_data::dataset::item_to_json;
use quandl_data::{DynamoStore, QuandlClient};
use quandl_loader::modules::{self, DatasetLoader, TableCatalog};
use quandl_loader::{ConfigFile, LoaderConfig, LoaderError};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quandl-loader")]
#[command(about = "Load Quandl datasets and datatables into DynamoDB", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (INI)
    config: PathBuf,

    /// 설정 파일 섹션 (환경 이름)
    #[arg(long, default_value = "dev")]
    env: String,

    /// 설정의 데이터셋 목록 대신 적재할 데이터셋 (쉼표로 구분, 예: "WIKI,ZACKS_EE")
    #[arg(long)]
    datasets: Option<String>,

    /// 데이터셋 명세 테이블의 항목을 JSON으로 출력하고 종료
    #[arg(long, value_name = "DS_ID")]
    describe: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 인자 누락은 exit 1, --help/--version은 exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    dotenvy::dotenv().ok();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "quandl_loader={level},quandl_data={level}",
                    level = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Quandl Loader 시작");

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Quandl Loader 실패");
        return Err(e.into());
    }

    tracing::info!("Quandl Loader 종료");
    Ok(())
}

async fn run(cli: Cli) -> quandl_loader::Result<()> {
    // 설정 로드
    let section = ConfigFile::load(&cli.config, &cli.env)?;
    let mut config = LoaderConfig::from_section(&section)?;
    if let Some(list) = &cli.datasets {
        config.override_datasets(list)?;
    }
    tracing::debug!(
        env = %cli.env,
        region = %config.store.region,
        datasets = config.datasets.len(),
        "설정 로드 완료"
    );

    // DynamoDB 세션
    let store = match DynamoStore::connect(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = ?e, "DynamoDB 세션 초기화 실패");
            return Err(LoaderError::Session(e.to_string()));
        }
    };
    let catalog = match TableCatalog::capture(&store).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = ?e, "테이블 목록 조회 실패");
            return Err(LoaderError::Session(e.to_string()));
        }
    };

    if let Some(ds_id) = &cli.describe {
        let item = modules::fetch_dataset_spec(&store, &config.datasets_table, ds_id).await?;
        println!("{}", serde_json::to_string_pretty(&item_to_json(&item))?);
        return Ok(());
    }

    config.require_datasets()?;

    let api_key = modules::resolve_api_key(&config, &store).await?;
    let provider = QuandlClient::with_base_url(
        api_key,
        config.provider.base_url.as_str(),
        config.provider.timeout(),
    )?;

    tracing::info!("=== 적재 시작 ({}개 데이터셋) ===", config.datasets.len());

    let mut loader = DatasetLoader::new(&store, &provider, &config, catalog);
    let stats = loader.load_all(&config.datasets).await?;
    stats.log_summary("전체 적재");

    tracing::info!("=== 적재 완료 ===");
    Ok(())
}
