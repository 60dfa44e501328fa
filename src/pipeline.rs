use crate::archive::{ArchiveIndex, IndexSource};
use crate::comment::{Comment, SelectedComment, has_marker};
use crate::compose::{Caption, compose_thumbnail, encode_png, load_font};
use crate::config::{Context, FetchConfig, GenerateConfig, UploadConfig};
use crate::filter;
use crate::ledger::Ledger;
use crate::replicate::ImageGenerator;
use crate::selector;
use crate::store::{Sentinel, load_json, save_json, write_atomic};
use crate::watermark::WatermarkStore;
use crate::youtube::{CommentSource, ThumbnailTarget};
use anyhow::Context as _;
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Candidates(usize),
    NoComments,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(SelectedComment),
    /// The previous run picked this comment but never rendered it.
    Resumed(SelectedComment),
    NoSelection,
}

#[derive(Debug, PartialEq, Eq)]
pub enum GenerateOutcome {
    Rendered { index: ArchiveIndex, final_path: PathBuf },
    AlreadyRendered,
}

/// Fetches recent comments and writes the candidates newer than the watermark.
pub async fn fetch<S: CommentSource>(
    ctx: &Context,
    cfg: &FetchConfig,
    source: &S,
) -> anyhow::Result<FetchOutcome> {
    let paths = &ctx.paths;
    let flag = Sentinel::new(&paths.no_comments_flag);
    flag.clear()?;

    let watermark = WatermarkStore::new(&paths.watermark).load();
    let fetched = source.recent_comments(&cfg.video_id, cfg.max_results).await?;

    let marked: Vec<Comment> = fetched
        .into_iter()
        .filter(|c| {
            let keep = has_marker(&c.text, ctx.marker);
            if !keep {
                debug!("Ignoring unmarked comment by {}", c.author);
            }
            keep
        })
        .collect();
    let candidates = filter::candidates(marked, watermark, cfg.first_run_cap);

    if candidates.is_empty() {
        info!("No new marked comments since {}", watermark.describe());
        if paths.comments.exists() {
            fs::remove_file(&paths.comments)
                .with_context(|| format!("cannot remove stale {}", paths.comments.display()))?;
        }
        flag.raise("no comments")?;
        return Ok(FetchOutcome::NoComments);
    }

    save_json(&paths.comments, &candidates)?;
    if watermark.is_unset() {
        info!("{} latest comments kept (no previous update)", candidates.len());
    } else {
        info!("{} new comments after {}", candidates.len(), watermark.describe());
    }
    Ok(FetchOutcome::Candidates(candidates.len()))
}

/// Picks this run's comment and stores it in the current-selection slot.
pub fn select<R: Rng + ?Sized>(ctx: &Context, rng: &mut R) -> anyhow::Result<SelectOutcome> {
    let paths = &ctx.paths;
    let flag = Sentinel::new(&paths.no_selection_flag);
    flag.clear()?;

    let comments: Vec<Comment> = if Sentinel::new(&paths.no_comments_flag).is_raised() {
        Vec::new()
    } else {
        load_json(&paths.comments)?.unwrap_or_default()
    };

    if comments.is_empty() {
        info!("No valid comment to choose from, nothing changes");
        flag.raise("no selection")?;
        return Ok(SelectOutcome::NoSelection);
    }

    if let Some(pending) = pending_selection(ctx) {
        if let Some(fresh) = comments.iter().find(|c| c.same_as(&pending.comment)) {
            let resumed = SelectedComment::pending(fresh.clone());
            save_json(&paths.selection, &resumed)?;
            info!(
                "Resuming unrendered selection by {} (likes {} -> {})",
                fresh.author, pending.comment.likes, fresh.likes
            );
            return Ok(SelectOutcome::Resumed(resumed));
        }
        debug!("Dropping stale pending selection by {}", pending.comment.author);
    }

    let winner = selector::select(&comments, rng)?;
    let selection = SelectedComment::pending(winner.clone());
    save_json(&paths.selection, &selection)?;

    info!("====================================");
    info!("New comment selected:");
    info!("Author   : {}", winner.author);
    info!("Text     : {}", winner.text);
    info!("Likes    : {}", winner.likes);
    info!("Published: {}", winner.published_at.format("%Y-%m-%d %H:%M:%S UTC"));
    info!("====================================");
    Ok(SelectOutcome::Selected(selection))
}

fn pending_selection(ctx: &Context) -> Option<SelectedComment> {
    match load_json::<SelectedComment>(&ctx.paths.selection) {
        Ok(Some(s)) if !s.is_rendered() => Some(s),
        Ok(_) => None,
        Err(e) => {
            warn!("Ignoring unreadable current selection ({e:#})");
            None
        }
    }
}

/// Renders the current selection, archives it, records it in the ledger and
/// only then moves the watermark to `now`.
pub async fn generate<G: ImageGenerator, I: IndexSource>(
    ctx: &Context,
    cfg: &GenerateConfig,
    generator: &G,
    index_source: &I,
    now: i64,
) -> anyhow::Result<GenerateOutcome> {
    let paths = &ctx.paths;
    let selection: SelectedComment = load_json(&paths.selection)?
        .with_context(|| format!("no current selection at {}", paths.selection.display()))?;
    if selection.is_rendered() {
        info!(
            "Selection by {} is already archived as #{:?}, nothing to generate",
            selection.comment.author, selection.index
        );
        return Ok(GenerateOutcome::AlreadyRendered);
    }

    let mut ledger = Ledger::load(&paths.ledger);
    if let Some(done) = ledger
        .selections()
        .into_iter()
        .rev()
        .find(|s| s.is_rendered() && s.comment.same_as(&selection.comment))
    {
        // An earlier run got as far as the ledger; finish its bookkeeping.
        warn!(
            "Comment by {} is already in the ledger as #{:?}, restoring the selection slot",
            done.comment.author, done.index
        );
        save_json(&paths.selection, &done)?;
        let store = WatermarkStore::new(&paths.watermark);
        store.commit(store.load().advanced_to(now))?;
        return Ok(GenerateOutcome::AlreadyRendered);
    }

    let index = index_source.next_index()?;
    let generated_path = paths.archives.join(index.generated_name());
    let final_archive_path = paths.archives.join(index.final_name());
    info!("Archive slot {} for comment by {}", index, selection.comment.author);

    let prompt = selection.comment.prompt_text(ctx.marker);
    let raw = generator.generate(&prompt).await?;
    write_atomic(&generated_path, &raw)?;
    write_atomic(&paths.last_thumbnail, &raw)?;
    info!("Raw image saved: {}", generated_path.display());

    let font = cfg.font.as_deref().and_then(load_font);
    let caption = font
        .as_ref()
        .map(|f| Caption::credit(&selection.comment.author, &prompt, f));
    let composed = compose_thumbnail(&paths.template, &raw, cfg.slot, caption.as_ref())?;
    let png = encode_png(&composed)?;
    write_atomic(&paths.final_thumbnail, &png)?;
    write_atomic(&final_archive_path, &png)?;
    info!("Final thumbnail saved: {}", paths.final_thumbnail.display());
    info!("Final thumbnail archived: {}", final_archive_path.display());

    // Both artifacts are on disk from here on; only now may state move.
    let enriched = SelectedComment {
        archive_image: Some(paths.relative_to_data(&final_archive_path)),
        generated_image: Some(paths.relative_to_data(&generated_path)),
        index: Some(index.0),
        ..selection
    };
    if ledger.is_empty() {
        info!("Starting a new ledger at {}", paths.ledger.display());
    }
    ledger.append(&enriched)?;
    save_json(&paths.selection, &enriched)?;

    let store = WatermarkStore::new(&paths.watermark);
    store.commit(store.load().advanced_to(now))?;

    Ok(GenerateOutcome::Rendered {
        index,
        final_path: paths.final_thumbnail.clone(),
    })
}

/// Publishes the final thumbnail.
pub async fn upload<T: ThumbnailTarget>(
    ctx: &Context,
    cfg: &UploadConfig,
    target: &T,
) -> anyhow::Result<()> {
    let path = &ctx.paths.final_thumbnail;
    if !path.exists() {
        anyhow::bail!("thumbnail not found: {}", path.display());
    }
    let png = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    target.publish(&cfg.video_id, png).await
}
