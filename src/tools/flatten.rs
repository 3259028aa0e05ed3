
// Уплощение категорий вида base/<категория>/<вид>/<файл> в одну папку
// base/<категория>_flattened/<вид>_<файл>, чтобы категория стала одним классом корпуса.

use super::{io_err, ToolError};
use std::fs;
use std::path::{Path, PathBuf};

/// Итог уплощения одной категории
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenSummary {
    pub target: PathBuf,
    pub copied: usize,
}

/// Имя папки назначения для категории
pub fn flattened_name(category: &str) -> String {
    format!("{category}_flattened")
}

// Свободный путь в папке назначения: к занятому имени добавляется _1, _2, ...
fn free_destination(target: &Path, name: &str) -> PathBuf {
    let candidate = target.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut count = 1;
    loop {
        let candidate = target.join(format!("{stem}_{count}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        count += 1;
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        paths.push(entry.map_err(io_err(dir))?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Копирует все файлы видов категории в одну плоскую папку, не перезаписывая существующие.
pub fn flatten_category(base: &Path, category: &str) -> Result<FlattenSummary, ToolError> {
    let source = base.join(category);
    let target = base.join(flattened_name(category));
    fs::create_dir_all(&target).map_err(io_err(&target))?;

    let mut copied = 0;
    for species_path in sorted_entries(&source)? {
        if !species_path.is_dir() {
            continue;
        }
        let species = species_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for file in sorted_entries(&species_path)? {
            if !file.is_file() {
                continue;
            }
            let file_name = file
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let destination = free_destination(&target, &format!("{species}_{file_name}"));
            fs::copy(&file, &destination).map_err(io_err(&destination))?;
            tracing::debug!(from = %file.display(), to = %destination.display(), "copied");
            copied += 1;
        }
    }

    tracing::info!(category, copied, target = %target.display(), "category flattened");
    Ok(FlattenSummary { target, copied })
}
