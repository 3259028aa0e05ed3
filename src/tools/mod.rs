// Вспомогательные инструменты подготовки корпуса: уплощение вложенных папок видов,
// генерация шумовых изображений для класса мусора, сохранение скачанных изображений видов
// и обновление списка наблюдений видов.

mod flatten;
mod manifest;
mod noise;
mod store;

pub use flatten::*;
pub use manifest::*;
pub use noise::*;
pub use store::*;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode image {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image encode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ToolError {
    let path = path.into();
    move |source| ToolError::Io { path, source }
}
