use crate::config::toml_config::RenderConfig;
use crate::core::layout::{layout_words, LayoutSettings, Orientation, PlacedWord};
use crate::domain::model::{Sentiment, WeightedWord};
use crate::utils::error::{ProbeError, Result};
use ab_glyph::{FontVec, PxScale};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::Path;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LEGEND_BORDER: Rgba<u8> = Rgba([204, 204, 204, 255]);

/// DejaVu Sans, used when `render.font_path` is not set.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Configured font file, else the bundled one.
pub fn load_font(configured: Option<&str>) -> Result<FontVec> {
    let Some(path) = configured else {
        return FontVec::try_from_vec(BUNDLED_FONT.to_vec()).map_err(|e| ProbeError::RenderError {
            message: format!("bundled font is unreadable: {}", e),
        });
    };

    if !Path::new(path).exists() {
        return Err(ProbeError::InvalidConfigValueError {
            field: "render.font_path".to_string(),
            value: path.to_string(),
            reason: "font file does not exist".to_string(),
        });
    }

    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes).map_err(|e| ProbeError::RenderError {
        message: format!("invalid font {}: {}", path, e),
    })
}

pub struct CloudRenderer {
    font: FontVec,
    config: RenderConfig,
}

impl CloudRenderer {
    pub fn new(font: FontVec, config: RenderConfig) -> Self {
        Self { font, config }
    }

    fn scale(&self) -> u32 {
        self.config.scale.max(1)
    }

    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        text_size(PxScale::from(size), &self.font, text)
    }

    pub fn layout(&self, words: &[WeightedWord]) -> Vec<PlacedWord> {
        let scale = self.scale();
        let settings = LayoutSettings::for_canvas(
            self.config.width * scale,
            self.config.height * scale,
            self.config.prefer_horizontal,
            self.config.random_seed,
        );
        layout_words(words, &settings, |text, size| self.measure(text, size))
    }

    /// Title band, word canvas and legend, cropped to the drawn content.
    pub fn render(&self, words: &[WeightedWord], title: &str) -> Result<RgbaImage> {
        let scale = self.scale();
        let canvas_width = self.config.width * scale;
        let canvas_height = self.config.height * scale;
        let title_size = 14.0 * scale as f32;
        let title_band = (title_size * 2.0) as u32;

        let mut image = RgbaImage::from_pixel(canvas_width, canvas_height + title_band, WHITE);

        let (title_width, _) = self.measure(title, title_size);
        let title_x = canvas_width.saturating_sub(title_width) / 2;
        draw_text_mut(
            &mut image,
            BLACK,
            title_x as i32,
            (title_band / 4) as i32,
            PxScale::from(title_size),
            &self.font,
            title,
        );

        let placed = self.layout(words);
        tracing::debug!("🖼️ Placed {}/{} words for '{}'", placed.len(), words.len(), title);

        for word in &placed {
            self.draw_word(&mut image, word, title_band);
        }

        self.draw_legend(&mut image, title_band);

        Ok(crop_to_content(&image, 10 * scale))
    }

    fn draw_word(&self, image: &mut RgbaImage, word: &PlacedWord, y_offset: u32) {
        let [r, g, b] = word.sentiment.rgb();
        let color = Rgba([r, g, b, 255]);
        let scale = PxScale::from(word.font_size);
        let x = word.bounds.x as i64;
        let y = (word.bounds.y + y_offset) as i64;

        match word.orientation {
            Orientation::Horizontal => {
                draw_text_mut(image, color, x as i32, y as i32, scale, &self.font, &word.text);
            }
            Orientation::Vertical => {
                // 先畫在透明底的小圖，再逆時針轉 90 度貼上
                let (w, h) = self.measure(&word.text, word.font_size);
                let mut sprite = RgbaImage::new(w.max(1), h.max(1));
                draw_text_mut(&mut sprite, color, 0, 0, scale, &self.font, &word.text);
                let rotated = imageops::rotate270(&sprite);
                imageops::overlay(image, &rotated, x, y);
            }
        }
    }

    fn draw_legend(&self, image: &mut RgbaImage, y_offset: u32) {
        let scale = self.scale();
        let font_size = 10.0 * scale as f32;
        let swatch = (font_size * 0.8) as u32;
        let padding = 4 * scale;
        let row_height = swatch + padding;

        let label_width = Sentiment::ALL
            .iter()
            .map(|s| self.measure(s.label(), font_size).0)
            .max()
            .unwrap_or(0);
        let box_width = padding * 3 + swatch + label_width;
        let box_height = padding + row_height * Sentiment::ALL.len() as u32;

        let canvas_bottom = image.height();
        let box_x = image.width().saturating_sub(box_width + padding);
        let box_y = canvas_bottom
            .saturating_sub(box_height + padding)
            .max(y_offset);

        let frame = Rect::at(box_x as i32, box_y as i32).of_size(box_width, box_height);
        draw_filled_rect_mut(image, frame, WHITE);
        draw_hollow_rect_mut(image, frame, LEGEND_BORDER);

        for (row, sentiment) in Sentiment::ALL.iter().enumerate() {
            let [r, g, b] = sentiment.rgb();
            let y = box_y + padding + row as u32 * row_height;
            draw_filled_rect_mut(
                image,
                Rect::at((box_x + padding) as i32, y as i32).of_size(swatch, swatch),
                Rgba([r, g, b, 255]),
            );
            draw_text_mut(
                image,
                BLACK,
                (box_x + padding * 2 + swatch) as i32,
                y as i32,
                PxScale::from(font_size),
                &self.font,
                sentiment.label(),
            );
        }
    }
}

/// Smallest box around non-white pixels, grown by `padding`.
pub fn crop_to_content(image: &RgbaImage, padding: u32) -> RgbaImage {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        if a > 0 && (r, g, b) != (255, 255, 255) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x == u32::MAX {
        return image.clone();
    }

    let left = min_x.saturating_sub(padding);
    let top = min_y.saturating_sub(padding);
    let right = (max_x + 1 + padding).min(image.width());
    let bottom = (max_y + 1 + padding).min(image.height());

    imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
