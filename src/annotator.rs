// src/annotator.rs
//! Draws the grade banner onto a scanned paper.
//!
//! The banner is a red box with a dark-red border, centred horizontally near
//! the top edge, holding `Grade: <grade>` in white. Anything that falls
//! outside the page is clipped, so very long grades never fail.

use ab_glyph::{FontArc, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::errors::{GraderError, Result};

pub const FONT_SIZE: f32 = 40.0;
pub const BANNER_TOP: i32 = 20;
pub const BANNER_PADDING: i32 = 15;
pub const BORDER_WIDTH: i32 = 3;
pub const JPEG_QUALITY: u8 = 95;

/// Each 8x8 bitmap glyph pixel becomes a 4x4 block, close to the 40px face.
const BITMAP_SCALE: i32 = 4;

const BANNER_FILL: Rgb<u8> = Rgb([255, 0, 0]);
const BANNER_BORDER: Rgb<u8> = Rgb([139, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Bold sans-serif faces tried in order after the configured font.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "arialbd.ttf",
];

/// The face used for banner text.
#[derive(Clone)]
pub enum BannerFont {
    Vector(FontArc),
    /// Built-in 8x8 bitmap glyphs, used when no TrueType font can be loaded.
    Bitmap,
}

impl BannerFont {
    /// Walks the fallback chain: `preferred`, then the system candidates,
    /// then the bitmap font. Never fails.
    pub fn resolve(preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            match load_font(&path) {
                Ok(font) => {
                    log::info!("🔤 Using banner font {}", path.display());
                    return BannerFont::Vector(font);
                }
                Err(e) => log::debug!("Font {} unavailable: {}", path.display(), e),
            }
        }

        log::warn!("⚠️  No bold TrueType font found, using the built-in bitmap font");
        BannerFont::Bitmap
    }

    /// Pixel width and height of `text` in this face.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            BannerFont::Vector(font) => text_size(PxScale::from(FONT_SIZE), font, text),
            BannerFont::Bitmap => {
                let glyph = 8 * BITMAP_SCALE as u32;
                (text.chars().count() as u32 * glyph, glyph)
            }
        }
    }

    fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
        match self {
            BannerFont::Vector(font) => {
                draw_text_mut(canvas, TEXT_COLOR, x, y, PxScale::from(FONT_SIZE), font, text)
            }
            BannerFont::Bitmap => draw_bitmap_text(canvas, x, y, text),
        }
    }
}

fn load_font(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path)?;
    FontArc::try_from_vec(data)
        .map_err(|e| GraderError::Config(format!("invalid font {}: {}", path.display(), e)))
}

fn draw_bitmap_text(canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
    let advance = 8 * BITMAP_SCALE;

    for (i, c) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(c)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as i32 * advance;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u8 {
                // bit 0 is the leftmost pixel
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = origin_x + col as i32 * BITMAP_SCALE;
                let py = y + row as i32 * BITMAP_SCALE;
                draw_filled_rect_mut(
                    canvas,
                    Rect::at(px, py).of_size(BITMAP_SCALE as u32, BITMAP_SCALE as u32),
                    TEXT_COLOR,
                );
            }
        }
    }
}

/// Where the banner goes on a page of a given width.
///
/// Coordinates may be negative or run past the right edge when the text is
/// wider than the page; drawing clips to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerPlacement {
    pub text_x: i32,
    pub text_y: i32,
    pub rect_left: i32,
    pub rect_top: i32,
    pub rect_width: u32,
    pub rect_height: u32,
}

impl BannerPlacement {
    pub fn compute(image_width: u32, text_width: u32, text_height: u32) -> Self {
        let text_x = (image_width as i64 - text_width as i64).div_euclid(2) as i32;
        let text_y = BANNER_TOP;

        Self {
            text_x,
            text_y,
            rect_left: text_x - BANNER_PADDING,
            rect_top: text_y - BANNER_PADDING,
            rect_width: text_width + 2 * BANNER_PADDING as u32,
            rect_height: text_height + 2 * BANNER_PADDING as u32,
        }
    }

    /// Right edge, exclusive.
    pub fn rect_right(&self) -> i64 {
        self.rect_left as i64 + self.rect_width as i64
    }

    /// Bottom edge, exclusive.
    pub fn rect_bottom(&self) -> i64 {
        self.rect_top as i64 + self.rect_height as i64
    }

    fn outer(&self) -> Rect {
        Rect::at(self.rect_left, self.rect_top).of_size(self.rect_width, self.rect_height)
    }

    fn inner(&self) -> Rect {
        let inset = 2 * BORDER_WIDTH as u32;
        Rect::at(self.rect_left + BORDER_WIDTH, self.rect_top + BORDER_WIDTH)
            .of_size(self.rect_width - inset, self.rect_height - inset)
    }
}

pub fn banner_text(grade: &str) -> String {
    format!("Grade: {}", grade)
}

/// Stamps grades onto papers. Holds the font resolved at startup.
#[derive(Clone)]
pub struct Annotator {
    font: BannerFont,
}

impl Annotator {
    pub fn new(font: BannerFont) -> Self {
        Self { font }
    }

    pub fn with_font_path(preferred: Option<&Path>) -> Self {
        Self::new(BannerFont::resolve(preferred))
    }

    /// Decodes `image_bytes`, draws the grade banner and returns the page as
    /// a JPEG. The page keeps its dimensions.
    pub fn annotate(&self, image_bytes: &[u8], grade: &str) -> Result<Vec<u8>> {
        self.annotate_page(image::load_from_memory(image_bytes)?, grade)
    }

    /// Same as [`Annotator::annotate`] for a page that is already decoded.
    pub fn annotate_page(&self, page: DynamicImage, grade: &str) -> Result<Vec<u8>> {
        let mut canvas = page.to_rgb8();

        let text = banner_text(grade);
        let (text_width, text_height) = self.font.measure(&text);
        let placement = BannerPlacement::compute(canvas.width(), text_width, text_height);

        draw_filled_rect_mut(&mut canvas, placement.outer(), BANNER_BORDER);
        draw_filled_rect_mut(&mut canvas, placement.inner(), BANNER_FILL);
        self.font.draw(&mut canvas, placement.text_x, placement.text_y, &text);

        encode_jpeg(&canvas)
    }
}

fn encode_jpeg(canvas: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgb8)
        .map_err(|e| GraderError::Encode(e.to_string()))?;
    Ok(bytes)
}
