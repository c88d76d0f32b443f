//! PNG summary of the top countries by estimated GDP.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

pub const IMAGE_WIDTH: u32 = 1000;
pub const IMAGE_HEIGHT: u32 = 600;
pub const TOP_N: usize = 5;

const GLYPH_SIZE: u32 = 8;
const SCALE: u32 = 2;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryEntry {
    pub name: String,
    pub estimated_gdp: f64,
}

#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub total_countries: i64,
    pub refreshed_at: DateTime<Utc>,
    /// Already ordered; anything past [`TOP_N`] is ignored.
    pub top: Vec<SummaryEntry>,
}

impl SummaryInput {
    fn lines(&self) -> Vec<(u32, u32, String)> {
        let mut lines = vec![
            (
                20,
                20,
                format!("Country Data Summary - Total: {}", self.total_countries),
            ),
            (
                20,
                60,
                format!(
                    "Refreshed: {}",
                    self.refreshed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                ),
            ),
            (20, 100, "Top 5 Countries by GDP:".to_string()),
        ];
        for (i, entry) in self.top.iter().take(TOP_N).enumerate() {
            lines.push((
                40,
                150 + 40 * i as u32,
                format!("{}. {} - {}", i + 1, entry.name, format_gdp(entry.estimated_gdp)),
            ));
        }
        lines
    }
}

/// Two decimals with comma thousands separators, e.g. `1,234,567.89`.
pub fn format_gdp(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str) {
    let advance = GLYPH_SIZE * SCALE;
    for (col, ch) in text.chars().enumerate() {
        let origin_x = x.saturating_add(col as u32 * advance);
        if origin_x >= img.width() {
            break;
        }
        for (row, bits) in glyph(ch).iter().enumerate() {
            for bit in 0..GLYPH_SIZE {
                if bits & (1 << bit) == 0 {
                    continue;
                }
                for dy in 0..SCALE {
                    for dx in 0..SCALE {
                        let px = origin_x + bit * SCALE + dx;
                        let py = y + row as u32 * SCALE + dy;
                        if px < img.width() && py < img.height() {
                            img.put_pixel(px, py, INK);
                        }
                    }
                }
            }
        }
    }
}

/// Rasterize the summary and encode it as PNG bytes.
pub fn render_summary(input: &SummaryInput) -> Result<Vec<u8>> {
    let mut img = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, BACKGROUND);
    for (x, y, text) in input.lines() {
        draw_text(&mut img, x, y, &text);
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("png encode failed")?;
    debug!(bytes = bytes.len(), entries = input.top.len(), "summary rendered");
    Ok(bytes)
}

/// Render and atomically replace the image at `path`.
pub fn write_summary(path: &Path, input: &SummaryInput) -> Result<()> {
    let bytes = render_summary(input)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create cache dir {}", dir.display()))?;
    }
    let tmp = path.with_extension("png.tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("cannot write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("cannot move image into {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "summary image written");
    Ok(())
}
