use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{info, warn};

const CAPTION_MAX_CHARS: usize = 70;
const CAPTION_GAP: i64 = 10;
const CAPTION_PX: f32 = 18.0;
const CAPTION_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Where the generated picture goes on the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            x: 458,
            y: 150,
            width: 785,
            height: 502,
        }
    }
}

/// Credit line drawn under the slot, right-aligned to its edge.
pub struct Caption<'a> {
    pub text: String,
    pub font: &'a FontVec,
}

impl<'a> Caption<'a> {
    /// `"{author} : {text}"`, cut to 70 chars with a trailing "...".
    pub fn credit(author: &str, text: &str, font: &'a FontVec) -> Self {
        Self {
            text: fit_caption(&format!("{author} : {text}")),
            font,
        }
    }
}

fn fit_caption(line: &str) -> String {
    if line.chars().count() <= CAPTION_MAX_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(CAPTION_MAX_CHARS - 3).collect();
    format!("{cut}...")
}

/// A missing or unreadable font only costs the caption.
pub fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("Caption font {} unavailable ({e}), drawing no caption", path.display());
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Caption font {} is not a usable font ({e}), drawing no caption", path.display());
            None
        }
    }
}

/// Resizes the generated image into the slot, overlays it on the template and
/// writes the caption below it when one is given.
pub fn compose_thumbnail(
    template: &Path,
    generated: &[u8],
    slot: Slot,
    caption: Option<&Caption<'_>>,
) -> anyhow::Result<RgbaImage> {
    let mut base = image::open(template)
        .with_context(|| format!("cannot open template {}", template.display()))?
        .to_rgba8();
    let picture = image::load_from_memory(generated)
        .context("generated image is not a readable raster")?
        .resize_exact(slot.width, slot.height, FilterType::Lanczos3)
        .to_rgba8();

    imageops::overlay(&mut base, &picture, slot.x, slot.y);
    info!(
        "Composited {}x{} picture at ({}, {}) onto {}",
        slot.width,
        slot.height,
        slot.x,
        slot.y,
        template.display()
    );

    if let Some(caption) = caption {
        draw_caption(&mut base, slot, caption);
    }
    Ok(base)
}

fn draw_caption(base: &mut RgbaImage, slot: Slot, caption: &Caption<'_>) {
    let scale = PxScale::from(CAPTION_PX);
    let (text_w, _) = text_size(scale, caption.font, &caption.text);
    let x = (slot.x + i64::from(slot.width) - i64::from(text_w)).max(0);
    let y = slot.y + i64::from(slot.height) + CAPTION_GAP;
    let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
        warn!("Caption position ({x}, {y}) is off the canvas, skipping it");
        return;
    };
    draw_text_mut(base, CAPTION_COLOR, x, y, scale, caption.font, &caption.text);
    info!("Caption drawn: {}", caption.text);
}

pub fn encode_png(img: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .context("cannot encode thumbnail as PNG")?;
    Ok(out.into_inner())
}
