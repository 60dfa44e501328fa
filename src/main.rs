mod archive;
mod args;
mod comment;
mod compose;
mod config;
mod filter;
mod ledger;
mod pipeline;
mod replicate;
mod selector;
mod store;
mod watermark;
mod youtube;

use archive::{ArchiveDirectory, LedgerLength};
use args::{Args, IndexFrom, RunArgs, Step};
use clap::Parser;
use config::{Context, FetchConfig, GenerateConfig, UploadConfig};
use ledger::Ledger;
use pipeline::{FetchOutcome, GenerateOutcome, SelectOutcome};
use replicate::Replicate;
use tracing::info;
use tracing_subscriber::EnvFilter;
use youtube::{ThumbnailUploader, YouTube};

const USER_AGENT: &str = "comment-thumbnail-bot-rust/0.1";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let ctx = Context::from_args(&args);
    let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    info!("Using data directory {}", ctx.paths.data_dir.display());

    match &args.command {
        Step::Fetch(fetch) => {
            let cfg = FetchConfig::from_args(&ctx, fetch)?;
            report_fetch(&pipeline::fetch(&ctx, &cfg, &YouTube::new(http, &cfg.api_key)).await?);
        }
        Step::Select => {
            report_select(&pipeline::select(&ctx, &mut rand::rng())?);
        }
        Step::Generate(generate) => {
            let cfg = GenerateConfig::from_args(generate)?;
            report_generate(&generate_thumbnail(&ctx, &cfg, http).await?);
        }
        Step::Upload(upload) => {
            let cfg = UploadConfig::from_args(&ctx, upload)?;
            publish_thumbnail(&ctx, &cfg, http).await?;
        }
        Step::Run(run) => run_all(&ctx, run, http).await?,
    }

    info!("Process complete.");
    Ok(())
}

async fn generate_thumbnail(
    ctx: &Context,
    cfg: &GenerateConfig,
    http: reqwest::Client,
) -> anyhow::Result<GenerateOutcome> {
    let generator = Replicate::new(http, &cfg.token, &cfg.model, cfg.poll_interval);
    let now = chrono::Utc::now().timestamp();
    match cfg.index_from {
        IndexFrom::Archive => {
            let archive = ArchiveDirectory::new(&ctx.paths.archives);
            pipeline::generate(ctx, cfg, &generator, &archive, now).await
        }
        IndexFrom::Ledger => {
            let ledger = Ledger::load(&ctx.paths.ledger);
            pipeline::generate(ctx, cfg, &generator, &LedgerLength(&ledger), now).await
        }
    }
}

fn report_fetch(outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Candidates(n) => info!("{} candidate comments written", n),
        FetchOutcome::NoComments => info!("No new comments, flag raised"),
    }
}

fn report_select(outcome: &SelectOutcome) {
    match outcome {
        SelectOutcome::Selected(s) => info!("Selected comment by {}", s.comment.author),
        SelectOutcome::Resumed(s) => info!("Kept pending comment by {}", s.comment.author),
        SelectOutcome::NoSelection => info!("No selection made, flag raised"),
    }
}

fn report_generate(outcome: &GenerateOutcome) {
    match outcome {
        GenerateOutcome::Rendered { index, final_path } => {
            info!("Thumbnail {} ready at {}", index, final_path.display())
        }
        GenerateOutcome::AlreadyRendered => info!("Nothing new to render"),
    }
}

async fn publish_thumbnail(ctx: &Context, cfg: &UploadConfig, http: reqwest::Client) -> anyhow::Result<()> {
    pipeline::upload(ctx, cfg, &ThumbnailUploader::new(http, &cfg.access_token)).await
}

async fn run_all(ctx: &Context, run: &RunArgs, http: reqwest::Client) -> anyhow::Result<()> {
    // Every secret is checked before any state is touched.
    let fetch_cfg = FetchConfig::from_args(ctx, &run.fetch)?;
    let generate_cfg = GenerateConfig::from_args(&run.generate)?;
    let upload_cfg = if run.skip_upload {
        None
    } else {
        Some(UploadConfig::from_args(ctx, &run.upload)?)
    };

    info!("Step 1/4: fetching comments");
    let youtube = YouTube::new(http.clone(), &fetch_cfg.api_key);
    let fetched = pipeline::fetch(ctx, &fetch_cfg, &youtube).await?;
    report_fetch(&fetched);
    if fetched == FetchOutcome::NoComments {
        return Ok(());
    }

    info!("Step 2/4: selecting a comment");
    let selected = pipeline::select(ctx, &mut rand::rng())?;
    report_select(&selected);
    if selected == SelectOutcome::NoSelection {
        return Ok(());
    }

    info!("Step 3/4: generating thumbnail");
    report_generate(&generate_thumbnail(ctx, &generate_cfg, http.clone()).await?);

    match upload_cfg {
        Some(cfg) => {
            info!("Step 4/4: uploading thumbnail");
            publish_thumbnail(ctx, &cfg, http).await?;
        }
        None => info!("Step 4/4: upload skipped"),
    }
    Ok(())
}
