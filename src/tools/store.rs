
// Сохранение уже скачанных изображений вида в корпус: <root>/<вид>/<n>.jpg. Изображение
// декодируется, приводится к RGB и квадрату 256x256 (Lanczos3) и записывается в JPEG.
// Нумерация продолжается с числа уже лежащих в папке .jpg, запись прекращается на пороге.
// Скачивание сюда не входит: вызывающий передаёт байты или путь к файлу.

use super::noise::save_jpeg;
use super::{io_err, ToolError};
use image::{imageops, imageops::FilterType, DynamicImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORE_IMAGE_SIDE: u32 = 256;
pub const STORE_JPEG_QUALITY: u8 = 75;

/// Имя папки вида: пробелы заменяются на подчёркивания
pub fn species_folder_name(species: &str) -> String {
    species.trim().replace(' ', "_")
}

fn count_jpegs(dir: &Path) -> Result<usize, ToolError> {
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        let is_jpg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg"));
        if is_jpg && path.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Итог сохранения пачки изображений
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub stored: usize,
    pub failed: usize,
    pub skipped: usize, // Не записаны, потому что порог уже достигнут
}

/// Папка одного вида с ограничением на число изображений
#[derive(Clone, Debug)]
pub struct SpeciesStore {
    folder: PathBuf,
    count: usize,
    cap: usize,
    side: u32,
    quality: u8,
}

impl SpeciesStore {
    /// Открывает (и при необходимости создаёт) папку вида и считает уже лежащие там .jpg
    pub fn open(root: &Path, species: &str, cap: usize) -> Result<Self, ToolError> {
        let folder = root.join(species_folder_name(species));
        fs::create_dir_all(&folder).map_err(io_err(&folder))?;
        let count = count_jpegs(&folder)?;
        tracing::debug!(folder = %folder.display(), count, cap, "species store opened");
        Ok(Self {
            folder,
            count,
            cap,
            side: STORE_IMAGE_SIDE,
            quality: STORE_JPEG_QUALITY,
        })
    }

    pub fn with_side(mut self, side: u32) -> Self {
        self.side = side;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.cap
    }

    /// Сохраняет изображение из байтов. Ok(None), если порог уже достигнут.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<Option<PathBuf>, ToolError> {
        if self.is_full() {
            return Ok(None);
        }
        let img = image::load_from_memory(bytes).map_err(|source| ToolError::Decode {
            origin: format!("{} in-memory bytes", bytes.len()),
            source,
        })?;
        self.store(img).map(Some)
    }

    /// Сохраняет изображение из файла. Ok(None), если порог уже достигнут.
    pub fn store_path(&mut self, path: &Path) -> Result<Option<PathBuf>, ToolError> {
        if self.is_full() {
            return Ok(None);
        }
        let img = image::open(path).map_err(|source| ToolError::Decode {
            origin: path.display().to_string(),
            source,
        })?;
        self.store(img).map(Some)
    }

    fn store(&mut self, img: DynamicImage) -> Result<PathBuf, ToolError> {
        let rgb = imageops::resize(&img.to_rgb8(), self.side, self.side, FilterType::Lanczos3);
        // Номер берётся из счётчика; занятые имена (дыры в нумерации) пропускаются
        let mut index = self.count;
        let mut target = self.folder.join(format!("{index}.jpg"));
        while target.exists() {
            index += 1;
            target = self.folder.join(format!("{index}.jpg"));
        }
        save_jpeg(&rgb, &target, self.quality)?;
        self.count += 1;
        Ok(target)
    }
}

/// Сохраняет пачку изображений из байтов. Ошибка одного элемента не прерывает пачку.
pub fn store_all<'a, I>(store: &mut SpeciesStore, items: I) -> StoreSummary
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut summary = StoreSummary::default();
    for bytes in items {
        match store.store_bytes(bytes) {
            Ok(Some(_)) => summary.stored += 1,
            Ok(None) => summary.skipped += 1,
            Err(err) => {
                tracing::warn!(error = %err, "image not stored");
                summary.failed += 1;
            }
        }
    }
    tracing::info!(
        folder = %store.folder().display(),
        stored = summary.stored,
        failed = summary.failed,
        skipped = summary.skipped,
        "species images stored"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        RgbImage::from_pixel(width, height, Rgb([30, 160, 90]))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn folder_name_replaces_spaces() {
        assert_eq!(species_folder_name("Phidippus audax"), "Phidippus_audax");
    }

    #[test]
    fn numbering_continues_from_existing_jpegs() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("Phidippus_audax");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("0.jpg"), b"x").unwrap();
        fs::write(folder.join("1.JPG"), b"x").unwrap();
        fs::write(folder.join("notes.txt"), b"x").unwrap();

        let mut store = SpeciesStore::open(tmp.path(), "Phidippus audax", 10).unwrap();
        assert_eq!(store.count(), 2);
        let written = store.store_bytes(&png_bytes(40, 30)).unwrap().unwrap();
        assert_eq!(written, folder.join("2.jpg"));

        let img = image::open(&written).unwrap();
        assert_eq!((img.width(), img.height()), (256, 256));
    }

    #[test]
    fn occupied_name_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("a");
        fs::create_dir_all(&folder).unwrap();
        // Один файл, но с номером 1: счётчик = 1, имя 1.jpg занято
        fs::write(folder.join("1.jpg"), b"x").unwrap();

        let mut store = SpeciesStore::open(tmp.path(), "a", 10).unwrap().with_side(8);
        let written = store.store_bytes(&png_bytes(4, 4)).unwrap().unwrap();
        assert_eq!(written, folder.join("2.jpg"));
        assert_eq!(fs::read(folder.join("1.jpg")).unwrap(), b"x");
    }

    #[test]
    fn stops_at_the_cap() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SpeciesStore::open(tmp.path(), "a", 2).unwrap().with_side(8);
        let bytes = png_bytes(4, 4);
        let summary = store_all(&mut store, [&bytes[..], &bytes[..], &bytes[..]]);
        assert_eq!(
            summary,
            StoreSummary {
                stored: 2,
                failed: 0,
                skipped: 1
            }
        );
        assert!(store.is_full());
        assert_eq!(store.store_bytes(&bytes).unwrap(), None);
        assert!(!store.folder().join("2.jpg").exists());
    }

    #[test]
    fn corrupt_bytes_fail_only_that_item() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SpeciesStore::open(tmp.path(), "a", 5).unwrap().with_side(8);
        let good = png_bytes(4, 4);

        let err = store.store_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ToolError::Decode { .. }));
        assert_eq!(store.count(), 0);

        let summary = store_all(&mut store, [&b"junk"[..], &good[..]]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.stored, 1);
        assert!(store.folder().join("0.jpg").exists());
    }

    #[test]
    fn stores_from_a_file_path() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("download.png");
        fs::write(&source, png_bytes(12, 20)).unwrap();

        let mut store = SpeciesStore::open(&tmp.path().join("corpus"), "Salticus scenicus", 3)
            .unwrap()
            .with_quality(85);
        let written = store.store_path(&source).unwrap().unwrap();
        assert_eq!(written, tmp.path().join("corpus/Salticus_scenicus/0.jpg"));
        assert_eq!(image::open(&written).unwrap().width(), 256);

        let missing = store.store_path(&tmp.path().join("nope.png")).unwrap_err();
        assert!(matches!(missing, ToolError::Decode { .. }));
    }
}
