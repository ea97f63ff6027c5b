use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use reqwest::header::USER_AGENT;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::reddit::CLIENT_UA;

pub const CANVAS_SIZE: u32 = 1080;

/// Downloads the post image, letterboxes it onto a black 1080x1080 canvas and
/// persists it as `meme_NNN.jpg` under the output directory.
pub async fn compose_meme_image(
    client: &reqwest::Client,
    image_url: &str,
    output_dir: &str,
    count: u32,
) -> anyhow::Result<PathBuf> {
    let bytes = client
        .get(image_url)
        .header(USER_AGENT, CLIENT_UA)
        .send()
        .await
        .with_context(|| format!("Failed to fetch image {}", image_url))?
        .error_for_status()
        .with_context(|| format!("Image request rejected for {}", image_url))?
        .bytes()
        .await?;

    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("Downloaded bytes from {} are not a decodable image", image_url))?;

    let canvas = letterbox(&img.to_rgb8());

    let path = Path::new(output_dir).join(format!("meme_{:03}.jpg", count));
    canvas
        .save(&path)
        .with_context(|| format!("Failed to write composed image {}", path.display()))?;
    info!("Composed image written to {}", path.display());
    Ok(path)
}

/// Dimensions after shrinking (never growing) to fit inside a square bound
/// while keeping the aspect ratio.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width <= bound && height <= bound {
        return (width, height);
    }
    let scale = (bound as f64 / width as f64).min(bound as f64 / height as f64);
    let w = ((width as f64 * scale).round() as u32).clamp(1, bound);
    let h = ((height as f64 * scale).round() as u32).clamp(1, bound);
    (w, h)
}

/// Centers the (possibly downscaled) image on a solid black square canvas.
pub fn letterbox(img: &RgbImage) -> RgbImage {
    let (w, h) = fit_within(img.width(), img.height(), CANVAS_SIZE);
    let resized = if (w, h) == (img.width(), img.height()) {
        img.clone()
    } else {
        imageops::resize(img, w, h, FilterType::Lanczos3)
    };

    let mut canvas = RgbImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgb([0, 0, 0]));
    let x = (CANVAS_SIZE - w) / 2;
    let y = (CANVAS_SIZE - h) / 2;
    imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));
    canvas
}
