
// Корпус изображений хранится на диске в виде "папка на класс": каждая непосредственная
// поддиректория корня является меткой класса, каждый обычный файл внутри неё (рекурсивно)
// является примером этого класса. Индексы классов назначаются в лексикографическом порядке
// имён директорий и стабильны между запусками.

use super::error::CorpusError;
use derive_new::new;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Пример корпуса: путь к файлу и исходный индекс класса
#[derive(new, Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf, // Путь к файлу изображения
    pub label: usize,  // Исходный индекс класса
}

/// Отображение имя класса <-> плотный индекс
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSpace {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSpace {
    /// Строит пространство меток из упорядоченного списка имён.
    /// Повторяющиеся имена получают индекс первого вхождения и не добавляются повторно.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut space = Self::default();
        for name in names {
            space.push(name.into());
        }
        space
    }

    pub(crate) fn push(&mut self, name: String) -> usize {
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.names.len();
        self.index.insert(name.clone(), idx);
        self.names.push(name);
        idx
    }

    /// Возвращает индекс класса по имени
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Возвращает имя класса по индексу
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Результат единственного прохода по корню корпуса
#[derive(Clone, Debug)]
pub struct Corpus {
    root: PathBuf,
    labels: LabelSpace,
    samples: Vec<Sample>,
}

impl Corpus {
    /// Читает корень корпуса: поддиректории становятся классами, файлы под ними - примерами.
    pub fn read(root: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CorpusError::MissingRoot { path: root });
        }

        let mut class_dirs = Vec::new();
        let entries = fs::read_dir(&root).map_err(|source| CorpusError::Io {
            path: root.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| CorpusError::Io {
                path: root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            // Имя класса должно быть корректным UTF-8, иначе разные директории склеятся в одну метку
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| CorpusError::NonUtf8ClassName { path: path.clone() })?;
            class_dirs.push((name, path));
        }

        if class_dirs.is_empty() {
            return Err(CorpusError::NoClasses { path: root });
        }
        class_dirs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut labels = LabelSpace::default();
        let mut samples = Vec::new();
        for (name, dir) in &class_dirs {
            let label = labels.push(name.clone());
            for path in files_under(dir)? {
                samples.push(Sample::new(path, label));
            }
        }

        tracing::info!(
            root = %root.display(),
            classes = labels.len(),
            samples = samples.len(),
            "corpus enumerated"
        );

        Ok(Self {
            root,
            labels,
            samples,
        })
    }

    /// Строит корпус из уже известных классов и примеров, без обращения к диску.
    pub fn from_parts(root: PathBuf, labels: LabelSpace, samples: Vec<Sample>) -> Self {
        Self {
            root,
            labels,
            samples,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Количество примеров в каждом исходном классе
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.labels.len()];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }
}

// Все обычные файлы под директорией, в отсортированном порядке
fn files_under(dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| CorpusError::Io {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf()),
            source: err.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
