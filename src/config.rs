use crate::args::{Args, FetchArgs, GenerateArgs, IndexFrom, UploadArgs};
use crate::compose::Slot;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MARKER: char = '#';

/// Every file the pipeline reads or writes, derived from two roots.
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub comments: PathBuf,
    pub selection: PathBuf,
    pub ledger: PathBuf,
    pub watermark: PathBuf,
    pub archives: PathBuf,
    pub template: PathBuf,
    pub last_thumbnail: PathBuf,
    pub final_thumbnail: PathBuf,
    pub no_comments_flag: PathBuf,
    pub no_selection_flag: PathBuf,
}

impl Paths {
    pub fn new(data_dir: &Path, sentinel_dir: &Path) -> Self {
        let data = |name: &str| data_dir.join(name);
        Self {
            data_dir: data_dir.to_path_buf(),
            comments: data("comments.json"),
            selection: data("selected_comment.json"),
            ledger: data("selected_comments.json"),
            watermark: data("last_update.json"),
            archives: data("archives"),
            template: data("miniature.png"),
            last_thumbnail: data("last_thumbnail.png"),
            final_thumbnail: data("final_thumbnail.png"),
            no_comments_flag: sentinel_dir.join("no_comments.flag"),
            no_selection_flag: sentinel_dir.join("no_selection.flag"),
        }
    }

    /// Path as recorded in the ledger: relative to the data directory.
    pub fn relative_to_data(&self, path: &Path) -> String {
        path.strip_prefix(&self.data_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Built once in `main` and handed to every step by reference.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: Paths,
    pub video_id: Option<String>,
    pub marker: char,
}

impl Context {
    pub fn from_args(args: &Args) -> Self {
        Self {
            paths: Paths::new(&args.data_dir, &args.sentinel_dir),
            video_id: args.video_id.clone(),
            marker: MARKER,
        }
    }

    pub fn video_id(&self) -> anyhow::Result<&str> {
        require(self.video_id.as_deref(), "YOUTUBE_VIDEO_ID")
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> anyhow::Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("missing required secret {name}"),
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_key: String,
    pub video_id: String,
    pub max_results: usize,
    pub first_run_cap: usize,
}

impl FetchConfig {
    pub fn from_args(ctx: &Context, args: &FetchArgs) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: require(args.api_key.as_deref(), "YOUTUBE_API_KEY")?.to_string(),
            video_id: ctx.video_id()?.to_string(),
            max_results: args.max_results,
            first_run_cap: args.first_run_cap,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub token: String,
    pub model: String,
    pub poll_interval: Duration,
    pub slot: Slot,
    pub index_from: IndexFrom,
    /// `None` composes without a caption.
    pub font: Option<PathBuf>,
}

impl GenerateConfig {
    pub fn from_args(args: &GenerateArgs) -> anyhow::Result<Self> {
        Ok(Self {
            token: require(args.replicate_token.as_deref(), "REPLICATE_API_TOKEN")?.to_string(),
            model: args.model.clone(),
            poll_interval: Duration::from_millis(args.poll_ms),
            slot: Slot::default(),
            index_from: args.index_from,
            font: Some(args.font.clone()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub access_token: String,
    pub video_id: String,
}

impl UploadConfig {
    pub fn from_args(ctx: &Context, args: &UploadArgs) -> anyhow::Result<Self> {
        Ok(Self {
            access_token: require(args.access_token.as_deref(), "YOUTUBE_ACCESS_TOKEN")?.to_string(),
            video_id: ctx.video_id()?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn paths_derive_from_roots() {
        let paths = Paths::new(Path::new("state"), Path::new("flags"));
        assert_eq!(paths.watermark, Path::new("state/last_update.json"));
        assert_eq!(paths.archives, Path::new("state/archives"));
        assert_eq!(paths.no_comments_flag, Path::new("flags/no_comments.flag"));
        assert_eq!(
            paths.relative_to_data(&paths.archives.join("0001_final.png")),
            "archives/0001_final.png"
        );
    }

    #[test]
    fn missing_or_blank_secrets_are_fatal() {
        let args = Args::parse_from(["comment-thumbnail", "--video-id", "abc", "fetch", "--api-key", "  "]);
        let ctx = Context::from_args(&args);
        let crate::args::Step::Fetch(fetch) = &args.command else {
            panic!("expected fetch");
        };
        let err = FetchConfig::from_args(&ctx, fetch).unwrap_err();
        assert!(err.to_string().contains("YOUTUBE_API_KEY"));
    }

    #[test]
    fn generate_defaults() {
        let args = Args::parse_from(["comment-thumbnail", "generate", "--replicate-token", "r8_x"]);
        let crate::args::Step::Generate(generate) = &args.command else {
            panic!("expected generate");
        };
        let cfg = GenerateConfig::from_args(generate).unwrap();
        assert_eq!(cfg.model, "qwen/qwen-image");
        assert_eq!(cfg.poll_interval, Duration::from_secs(2));
        assert_eq!(cfg.index_from, IndexFrom::Archive);
        assert_eq!(
            cfg.font.as_deref(),
            Some(Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"))
        );
        assert_eq!(Context::from_args(&args).paths.data_dir, Path::new("data"));
    }
}
