
// Список видов с числом наблюдений, хранящийся в JSON. Свежие счётчики объединяются с
// существующим списком: виды без наблюдений выбрасываются, дополнительные поля записей
// сохраняются. Получение счётчиков из сети сюда не входит, их передаёт вызывающий.

use super::{io_err, ToolError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Запись о виде
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sightings: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SpeciesEntry {
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            sightings: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Объединяет существующий список со свежими счётчиками (в порядке свежих данных)
pub fn merge_sightings(existing: Vec<SpeciesEntry>, fresh: &[(String, u64)]) -> Vec<SpeciesEntry> {
    let mut by_name: HashMap<String, SpeciesEntry> = existing
        .into_iter()
        .map(|entry| (entry.scientific_name.clone(), entry))
        .collect();

    fresh
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| {
            let mut entry = by_name
                .remove(name)
                .unwrap_or_else(|| SpeciesEntry::new(name.clone()));
            entry.sightings = Some(*count);
            entry
        })
        .collect()
}

/// Загружает список. Отсутствующий файл - пустой список.
pub fn load_manifest(path: &Path) -> Result<Vec<SpeciesEntry>, ToolError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(path)(err)),
    };
    serde_json::from_slice(&bytes).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_manifest(path: &Path, entries: &[SpeciesEntry]) -> Result<(), ToolError> {
    let json = serde_json::to_string_pretty(entries).map_err(|source| ToolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err(path))?;
    tracing::info!(path = %path.display(), species = entries.len(), "manifest saved");
    Ok(())
}

/// Загружает, объединяет и сохраняет список. Возвращает число видов.
pub fn update_manifest(path: &Path, fresh: &[(String, u64)]) -> Result<usize, ToolError> {
    let merged = merge_sightings(load_manifest(path)?, fresh);
    save_manifest(path, &merged)?;
    Ok(merged.len())
}
