//! Word placement for the word cloud.
//!
//! Words arrive sorted by count. Font size follows the previous word's size
//! scaled by relative frequency; each word walks an elliptical spiral from
//! the canvas center until its box fits, shrinking when no spot is left.

use crate::domain::model::{Sentiment, WeightedWord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub sentiment: Sentiment,
    pub font_size: f32,
    pub orientation: Orientation,
    /// Box on the canvas, already rotated for vertical words.
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub width: u32,
    pub height: u32,
    pub prefer_horizontal: f64,
    pub max_font_size: f32,
    pub min_font_size: f32,
    pub font_step: f32,
    pub relative_scaling: f32,
    pub margin: u32,
    pub spiral_step: f32,
    pub random_seed: u64,
}

impl LayoutSettings {
    pub fn for_canvas(width: u32, height: u32, prefer_horizontal: f64, random_seed: u64) -> Self {
        Self {
            width,
            height,
            prefer_horizontal,
            max_font_size: height as f32 * 0.4,
            min_font_size: 4.0,
            font_step: 1.0_f32.max(height as f32 / 200.0),
            relative_scaling: 0.5,
            margin: 2_u32.max(height / 200),
            spiral_step: 2.0_f32.max(height as f32 / 100.0),
            random_seed,
        }
    }
}

/// `measure` returns the horizontal text size `(width, height)` in pixels
/// for a font size.
pub fn layout_words<F>(words: &[WeightedWord], settings: &LayoutSettings, measure: F) -> Vec<PlacedWord>
where
    F: Fn(&str, f32) -> (u32, u32),
{
    let mut rng = StdRng::seed_from_u64(settings.random_seed);
    let mut placed: Vec<PlacedWord> = Vec::new();

    let Some(max_count) = words.iter().map(|w| w.count).max().filter(|&c| c > 0) else {
        return placed;
    };

    let rs = settings.relative_scaling;
    let mut font_size = settings.max_font_size;
    let mut last_freq = 1.0_f32;

    for word in words {
        let freq = word.count as f32 / max_count as f32;
        if rs != 0.0 {
            font_size = ((rs * (freq / last_freq)) + (1.0 - rs)) * font_size;
        }
        font_size = font_size.min(settings.max_font_size);

        let preferred = if rng.random_bool(settings.prefer_horizontal) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let start_angle = rng.random::<f32>() * std::f32::consts::TAU;

        let mut size = font_size;
        let found = loop {
            if size < settings.min_font_size {
                break None;
            }

            let alternate = match preferred {
                Orientation::Horizontal => Orientation::Vertical,
                Orientation::Vertical => Orientation::Horizontal,
            };
            let attempt = [preferred, alternate].into_iter().find_map(|orientation| {
                let (w, h) = measure(&word.text, size);
                let (w, h) = match orientation {
                    Orientation::Horizontal => (w, h),
                    Orientation::Vertical => (h, w),
                };
                find_position(w + settings.margin, h + settings.margin, &placed, settings, start_angle)
                    .map(|bounds| (orientation, bounds))
            });

            match attempt {
                Some(hit) => break Some((size, hit)),
                None => size -= settings.font_step,
            }
        };

        let Some((size, (orientation, bounds))) = found else {
            // 連最小字級都放不下，後面的字只會更小或一樣，直接結束
            tracing::debug!("Canvas full after {} words", placed.len());
            break;
        };

        placed.push(PlacedWord {
            text: word.text.clone(),
            sentiment: word.sentiment,
            font_size: size,
            orientation,
            bounds,
        });
        font_size = size;
        last_freq = freq;
    }

    placed
}

fn find_position(
    width: u32,
    height: u32,
    placed: &[PlacedWord],
    settings: &LayoutSettings,
    start_angle: f32,
) -> Option<BoundingBox> {
    if width > settings.width || height > settings.height {
        return None;
    }

    let cx = settings.width as f32 / 2.0;
    let cy = settings.height as f32 / 2.0;
    let aspect = settings.width as f32 / settings.height as f32;
    let max_radius = cx.max(cy) + width.max(height) as f32;
    let step = settings.spiral_step;

    let mut radius = 0.0_f32;
    while radius <= max_radius {
        let circumference = std::f32::consts::TAU * radius.max(1.0);
        let points = ((circumference / step).ceil() as usize).max(1);

        for i in 0..points {
            let theta = start_angle + std::f32::consts::TAU * i as f32 / points as f32;
            let px = cx + radius * theta.cos() * aspect.max(1.0) - width as f32 / 2.0;
            let py = cy + radius * theta.sin() / aspect.min(1.0) - height as f32 / 2.0;

            if px < 0.0 || py < 0.0 {
                continue;
            }
            let candidate = BoundingBox {
                x: px as u32,
                y: py as u32,
                width,
                height,
            };
            if candidate.right() > settings.width || candidate.bottom() > settings.height {
                continue;
            }
            if placed.iter().all(|p| !p.bounds.intersects(&candidate)) {
                return Some(candidate);
            }
        }

        radius += step;
    }

    None
}
