
// Типы ошибок конвейера подготовки данных. Ошибки построения (корпус, конфигурация) фатальны
// и возвращаются вызывающему сразу. Ошибки декодирования отдельного примера восстановимы:
// они возвращаются как значение для каждого элемента, чтобы их можно было посчитать.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки чтения корпуса
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus root {path} does not exist or is not a directory")]
    MissingRoot { path: PathBuf },
    #[error("corpus root {path} contains no class directories")]
    NoClasses { path: PathBuf },
    #[error("class directory name {path} is not valid UTF-8")]
    NonUtf8ClassName { path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ошибки конфигурации слияния и разбиения
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("merging {merged} of {total} classes leaves no distinct classes")]
    NoDistinctClasses { merged: usize, total: usize },
    #[error("validation fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("merged class name {0:?} collides with a kept class")]
    MergedNameCollision(String),
}

/// Ошибка декодирования одного примера
#[derive(Debug, Clone, Error)]
#[error("failed to decode {path}: {reason}")]
pub struct DecodeError {
    pub path: PathBuf,
    pub reason: String,
}

/// Ошибки доступа к представлению с перемаппленными метками
#[derive(Debug, Clone, Error)]
pub enum ViewError {
    #[error("position {position} is out of bounds for a view of length {len}")]
    OutOfBounds { position: usize, len: usize },
    #[error("sample at corpus position {position} has label {label} outside the class index map")]
    UnmappedLabel { position: usize, label: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
