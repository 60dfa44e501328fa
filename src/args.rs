use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(about = "Turns the most liked #comment on a video into its thumbnail")]
pub struct Args {
    /// Directory holding comments, selections, archives and the template.
    #[clap(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Where the no-op flag files are written.
    #[clap(long, global = true, default_value = ".")]
    pub sentinel_dir: PathBuf,

    #[clap(long, global = true, env = "YOUTUBE_VIDEO_ID", hide_env_values = true)]
    pub video_id: Option<String>,

    #[clap(subcommand)]
    pub command: Step,
}

#[derive(Subcommand, Debug)]
pub enum Step {
    /// Fetch recent #comments newer than the last update.
    Fetch(FetchArgs),
    /// Pick the most liked fetched comment.
    Select,
    /// Generate, composite and archive the thumbnail for the selection.
    Generate(GenerateArgs),
    /// Publish the final thumbnail to the video.
    Upload(UploadArgs),
    /// All steps in order.
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    #[clap(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[clap(long, default_value_t = 50)]
    pub max_results: usize,

    #[clap(long, default_value_t = 30)]
    pub first_run_cap: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub replicate_token: Option<String>,

    #[clap(long, default_value = "qwen/qwen-image")]
    pub model: String,

    #[clap(long, default_value_t = 2000)]
    pub poll_ms: u64,

    /// How the next archive number is counted.
    #[clap(long, value_enum, default_value_t = IndexFrom::Archive)]
    pub index_from: IndexFrom,

    /// TrueType font for the credit line under the picture.
    #[clap(
        long,
        env = "THUMBNAIL_FONT",
        default_value = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"
    )]
    pub font: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFrom {
    /// Finished thumbnails in the archive directory.
    Archive,
    /// Entries in the selection ledger.
    Ledger,
}

#[derive(clap::Args, Debug, Clone)]
pub struct UploadArgs {
    #[clap(long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[clap(flatten)]
    pub fetch: FetchArgs,

    #[clap(flatten)]
    pub generate: GenerateArgs,

    #[clap(flatten)]
    pub upload: UploadArgs,

    /// Stop after archiving; do not publish.
    #[clap(long)]
    pub skip_upload: bool,
}
