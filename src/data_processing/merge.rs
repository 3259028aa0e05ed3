
// Слияние второстепенных классов в один синтетический класс. Классы, не входящие в набор
// слияния, сохраняют свой относительный порядок, синтетический класс всегда добавляется
// последним. Имена из набора слияния, которых нет в корпусе, ни на что не влияют.

use super::corpus::LabelSpace;
use super::error::ConfigError;
use std::collections::BTreeSet;

/// Отображение исходного индекса класса в новый индекс. Строится один раз, не изменяется.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassIndexMap {
    map: Vec<usize>,
}

impl ClassIndexMap {
    /// Новый индекс для исходного индекса
    pub fn get(&self, original: usize) -> Option<usize> {
        self.map.get(original).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Результат слияния: новое пространство меток и отображение индексов
#[derive(Clone, Debug)]
pub struct MergePlan {
    labels: LabelSpace,
    index_map: ClassIndexMap,
    merged_label: usize,
    merged_originals: Vec<usize>,
    unmatched: Vec<String>,
}

impl MergePlan {
    pub fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    pub fn index_map(&self) -> &ClassIndexMap {
        &self.index_map
    }

    /// Новый индекс синтетического класса (всегда последний)
    pub fn merged_label(&self) -> usize {
        self.merged_label
    }

    /// Исходные индексы, свёрнутые в синтетический класс
    pub fn merged_originals(&self) -> &[usize] {
        &self.merged_originals
    }

    /// Имена из набора слияния, не найденные в корпусе
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn into_parts(self) -> (LabelSpace, ClassIndexMap) {
        (self.labels, self.index_map)
    }
}

/// Слияние набора классов в один синтетический класс
#[derive(Clone, Debug)]
pub struct ClassMerger {
    merge_set: BTreeSet<String>,
    merged_name: String,
}

impl ClassMerger {
    pub fn new<I, S>(merge_set: I, merged_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            merge_set: merge_set.into_iter().map(Into::into).collect(),
            merged_name: merged_name.into(),
        }
    }

    pub fn merged_name(&self) -> &str {
        &self.merged_name
    }

    pub fn merge(&self, original: &LabelSpace) -> Result<MergePlan, ConfigError> {
        let mut labels = LabelSpace::default();
        let mut kept = Vec::with_capacity(original.len());
        let mut merged_originals = Vec::new();

        for (idx, name) in original.names().iter().enumerate() {
            if self.merge_set.contains(name) {
                merged_originals.push(idx);
                kept.push(None);
            } else {
                kept.push(Some(labels.push(name.clone())));
            }
        }

        if labels.is_empty() {
            return Err(ConfigError::NoDistinctClasses {
                merged: merged_originals.len(),
                total: original.len(),
            });
        }
        if labels.index_of(&self.merged_name).is_some() {
            return Err(ConfigError::MergedNameCollision(self.merged_name.clone()));
        }

        let merged_label = labels.push(self.merged_name.clone());
        let map = kept
            .into_iter()
            .map(|idx| idx.unwrap_or(merged_label))
            .collect();

        let unmatched: Vec<String> = self
            .merge_set
            .iter()
            .filter(|name| original.index_of(name).is_none())
            .cloned()
            .collect();
        for name in &unmatched {
            tracing::warn!(class = %name, "merge class not found in corpus, ignoring");
        }

        tracing::debug!(
            original = original.len(),
            remapped = labels.len(),
            merged = merged_originals.len(),
            "class merge planned"
        );

        Ok(MergePlan {
            labels,
            index_map: ClassIndexMap { map },
            merged_label,
            merged_originals,
            unmatched,
        })
    }
}
