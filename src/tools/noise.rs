
// Генерация шумовых изображений для негативного класса: сплошной серый цвет, размытый
// RGB-шум или чистый RGB-шум. Генератор инициализируется seed, поэтому набор воспроизводим.

use super::{io_err, ToolError};
use image::{codecs::jpeg::JpegEncoder, imageops, Rgb, RgbImage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const JPEG_QUALITY: u8 = 85;

/// Вид шумового изображения
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseKind {
    Grayscale,
    Blur,
    Rgb,
}

fn random_noise(rng: &mut StdRng, size: u32) -> RgbImage {
    // Длина считается в usize: в u32 size * size * 3 переполняется уже при size > 37837
    let len = size as usize * size as usize * 3;
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    RgbImage::from_raw(size, size, buf).unwrap_or_else(|| RgbImage::new(size, size))
}

/// Одно шумовое изображение заданного вида
pub fn noise_image(rng: &mut StdRng, kind: NoiseKind, size: u32) -> RgbImage {
    match kind {
        NoiseKind::Grayscale => {
            let v: u8 = rng.random();
            RgbImage::from_pixel(size, size, Rgb([v, v, v]))
        }
        NoiseKind::Blur => {
            let noise = random_noise(rng, size);
            let sigma = rng.random_range(2.0f32..5.0);
            imageops::blur(&noise, sigma)
        }
        NoiseKind::Rgb => random_noise(rng, size),
    }
}

pub(crate) fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> Result<(), ToolError> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(img)
        .map_err(|source| ToolError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    // Ошибка записи хвоста буфера иначе потеряется при drop
    writer.flush().map_err(io_err(path))
}

/// Записывает count изображений <i>.jpg в папку, вид каждого выбирается случайно.
pub fn generate_noise_images(dir: &Path, count: usize, size: u32, seed: u64) -> Result<(), ToolError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let kind = match rng.random_range(0..3) {
            0 => NoiseKind::Grayscale,
            1 => NoiseKind::Blur,
            _ => NoiseKind::Rgb,
        };
        let img = noise_image(&mut rng, kind, size);
        save_jpeg(&img, &dir.join(format!("{i}.jpg")), JPEG_QUALITY)?;
    }
    tracing::info!(dir = %dir.display(), count, "noise images written");
    Ok(())
}

/// Генерирует изображения, только если в папке их меньше count. Возвращает true, если генерировал.
pub fn ensure_noise_images(dir: &Path, count: usize, size: u32, seed: u64) -> Result<bool, ToolError> {
    let existing = match fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    };
    if existing >= count {
        tracing::info!(dir = %dir.display(), existing, "noise images already present, skipping");
        return Ok(false);
    }
    generate_noise_images(dir, count, size, seed)?;
    Ok(true)
}
