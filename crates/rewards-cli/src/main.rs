use anyhow::{Context, Result};
use clap::Parser;
use rewards_core::config;
use rewards_core::{AppBuilder, CardBytes, Config, StorageBackend};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// object storage から reward cards を取得して出力する
#[derive(Debug, Parser)]
#[command(name = "rewards-cli", version)]
struct Args {
    /// REWARDS_CARDS_BUCKET を上書き
    #[arg(long)]
    bucket: Option<String>,

    /// REWARDS_CARDS_KEY を上書き
    #[arg(long)]
    key: Option<String>,

    /// REWARDS_STORAGE_BACKEND を上書き（s3 / local）
    #[arg(long)]
    backend: Option<StorageBackend>,

    /// REWARDS_LOCAL_ROOT を上書き
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// REWARDS_S3_ENDPOINT を上書き
    #[arg(long)]
    endpoint: Option<String>,

    /// REWARDS_CARDS_FETCH_TIMEOUT_MS を上書き
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON としてデコードできるか検証する
    #[arg(long)]
    validate: bool,

    /// 整形した JSON を出力する（--validate を含む）
    #[arg(long)]
    pretty: bool,

    /// stdout の代わりにファイルへ書き出す
    #[arg(long, short)]
    output: Option<PathBuf>,
}

/// フラグで指定された値は環境変数より優先する
fn load_config(args: &Args) -> Result<Config> {
    Config::from_env_with(|name| flag_value(args, name)).context("loading configuration")
}

/// 環境変数名に対応するフラグの値
fn flag_value(args: &Args, name: &str) -> Option<String> {
    match name {
        config::ENV_CARDS_BUCKET => args.bucket.clone(),
        config::ENV_CARDS_KEY => args.key.clone(),
        config::ENV_CARDS_FETCH_TIMEOUT_MS => args.timeout_ms.map(|ms| ms.to_string()),
        config::ENV_STORAGE_BACKEND => args.backend.map(|b| b.to_string()),
        config::ENV_LOCAL_ROOT => args
            .local_root
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        config::ENV_S3_ENDPOINT => args.endpoint.clone(),
        _ => None,
    }
}

/// 出力するバイト列を決める
///
/// --pretty は元のバイト列を serde_json::Value 経由で整形するので、
/// CardsDocument にないフィールドも落とさない。
fn render(cards: &CardBytes, validate: bool, pretty: bool) -> Result<Vec<u8>> {
    if !(validate || pretty) {
        return Ok(cards.to_vec());
    }

    let doc = cards.decode().context("decoding cards document")?;
    tracing::info!(cards = doc.card.len(), "cards document is valid");
    if !pretty {
        return Ok(cards.to_vec());
    }

    let value: serde_json::Value = serde_json::from_slice(cards.as_bytes())?;
    let mut out = serde_json::to_vec_pretty(&value)?;
    out.push(b'\n');
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout はカードのバイト列専用なので、ログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let app = AppBuilder::new(config).build().await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling fetch");
                cancel.cancel();
            }
        }
    });

    let cards = app
        .fetcher
        .fetch_cards_as_bytes(&cancel)
        .await
        .with_context(|| format!("fetching cards from {}", app.config.cards.location()))?;

    let output = render(&cards, args.validate, args.pretty)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &output)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = output.len(), "cards written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&output).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
