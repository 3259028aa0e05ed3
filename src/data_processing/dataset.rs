
// Представление с перемаппленными метками: обёртка для чтения поверх корпуса, которая по
// позиции возвращает данные примера вместе с новой (после слияния) меткой. Загрузка данных
// вынесена в трейт SampleLoader, так что представление не зависит от формата данных.
// Ошибка декодирования одного примера не прерывает обход: она возвращается как значение.

use super::corpus::{Corpus, Sample};
use super::error::{DecodeError, ViewError};
use super::merge::ClassIndexMap;
use burn::data::dataset::Dataset;
use derive_new::new;
use image::imageops::FilterType;
use std::path::PathBuf;
use std::sync::Arc;

/// Загрузчик данных одного примера
pub trait SampleLoader: Send + Sync {
    type Output: Clone + Send + Sync + std::fmt::Debug;

    /// Загружает данные примера. Ошибка относится только к этому примеру.
    fn load(&self, sample: &Sample) -> Result<Self::Output, DecodeError>;
}

/// Декодированное изображение в формате CHW, значения в [0, 1]
#[derive(new, Clone, Debug, PartialEq)]
pub struct ImageTensorData {
    pub pixels: Vec<f32>, // Пиксели, каналы идут блоками: R..., G..., B...
    pub width: u32,
    pub height: u32,
}

/// Декодирует изображение и приводит его к квадрату заданной стороны
#[derive(Clone, Copy, Debug)]
pub struct ImageLoader {
    side: u32,
}

impl ImageLoader {
    pub fn new(side: u32) -> Self {
        Self { side }
    }

    pub fn side(&self) -> u32 {
        self.side
    }
}

impl SampleLoader for ImageLoader {
    type Output = ImageTensorData;

    fn load(&self, sample: &Sample) -> Result<ImageTensorData, DecodeError> {
        let img = image::open(&sample.path).map_err(|e| DecodeError {
            path: sample.path.clone(),
            reason: e.to_string(),
        })?;
        let rgb = img
            .resize_exact(self.side, self.side, FilterType::Triangle)
            .to_rgb8();
        let (width, height) = rgb.dimensions();

        let plane = (width * height) as usize;
        let mut pixels = vec![0.0f32; plane * 3];
        for (i, p) in rgb.pixels().enumerate() {
            for c in 0..3 {
                pixels[c * plane + i] = p[c] as f32 / 255.0;
            }
        }
        Ok(ImageTensorData::new(pixels, width, height))
    }
}

/// Успешно прочитанный элемент представления
#[derive(new, Clone, Debug, PartialEq)]
pub struct RemappedItem<T> {
    pub data: T,      // Данные примера
    pub label: usize, // Новая метка класса
}

/// Элемент для загрузчика burn: результат загрузки хранится внутри элемента
#[derive(new, Clone, Debug)]
pub struct LoadedSample<T> {
    pub path: PathBuf,
    pub label: usize,
    pub data: Result<T, DecodeError>,
}

/// Представление с новыми метками поверх выбранных позиций корпуса
#[derive(Clone)]
pub struct RemappedView<L: SampleLoader> {
    corpus: Arc<Corpus>,
    positions: Vec<usize>,
    labels: Vec<usize>, // Новая метка для каждой позиции, вычисляется при построении
    loader: L,
}

impl<L: SampleLoader> RemappedView<L> {
    /// Каждая позиция должна указывать на пример корпуса, а его метка - быть в отображении.
    pub fn new(
        corpus: Arc<Corpus>,
        index_map: Arc<ClassIndexMap>,
        positions: Vec<usize>,
        loader: L,
    ) -> Result<Self, ViewError> {
        let samples = corpus.samples();
        let mut labels = Vec::with_capacity(positions.len());
        for &position in &positions {
            let sample = samples.get(position).ok_or(ViewError::OutOfBounds {
                position,
                len: samples.len(),
            })?;
            let label = index_map
                .get(sample.label)
                .ok_or(ViewError::UnmappedLabel {
                    position,
                    label: sample.label,
                })?;
            labels.push(label);
        }
        Ok(Self {
            corpus,
            positions,
            labels,
            loader,
        })
    }

    fn sample(&self, position: usize) -> Option<&Sample> {
        self.positions
            .get(position)
            .and_then(|&p| self.corpus.samples().get(p))
    }

    /// Новая метка по позиции, без загрузки данных
    pub fn label(&self, position: usize) -> Option<usize> {
        self.labels.get(position).copied()
    }

    /// Путь к файлу по позиции
    pub fn path(&self, position: usize) -> Option<&std::path::Path> {
        self.sample(position).map(|s| s.path.as_path())
    }

    /// Данные примера вместе с новой меткой
    pub fn try_get(&self, position: usize) -> Result<RemappedItem<L::Output>, ViewError> {
        let (sample, label) = self
            .sample(position)
            .zip(self.label(position))
            .ok_or(ViewError::OutOfBounds {
                position,
                len: self.positions.len(),
            })?;
        let data = self.loader.load(sample)?;
        Ok(RemappedItem::new(data, label))
    }

    /// Позиции корпуса, на которые смотрит представление
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Количество элементов в каждом новом классе
    pub fn label_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; num_classes];
        for &label in &self.labels {
            if label < num_classes {
                counts[label] += 1;
            }
        }
        counts
    }
}

impl<L: SampleLoader> Dataset<LoadedSample<L::Output>> for RemappedView<L> {
    /// Возвращает элемент по индексу. None только для индекса вне диапазона.
    fn get(&self, index: usize) -> Option<LoadedSample<L::Output>> {
        let sample = self.sample(index)?;
        let label = self.label(index)?;
        let data = self.loader.load(sample);
        if let Err(err) = &data {
            tracing::warn!(error = %err, "sample failed to decode");
        }
        Some(LoadedSample::new(sample.path.clone(), label, data))
    }

    /// Возвращает количество элементов в представлении
    fn len(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_processing::corpus::LabelSpace;
    use crate::data_processing::merge::ClassMerger;

    // Загрузчик без диска: данные - это путь в виде строки
    struct PathLoader;

    impl SampleLoader for PathLoader {
        type Output = String;

        fn load(&self, sample: &Sample) -> Result<String, DecodeError> {
            let name = sample.path.to_string_lossy().into_owned();
            if name.ends_with(".bad") {
                return Err(DecodeError {
                    path: sample.path.clone(),
                    reason: "corrupt".into(),
                });
            }
            Ok(name)
        }
    }

    fn view(positions: Vec<usize>) -> RemappedView<PathLoader> {
        let labels = LabelSpace::from_names(["a", "b", "c"]);
        let samples = vec![
            Sample::new("a/0.jpg".into(), 0),
            Sample::new("b/0.jpg".into(), 1),
            Sample::new("c/0.bad".into(), 2),
            Sample::new("c/1.jpg".into(), 2),
        ];
        let plan = ClassMerger::new(["a", "c"], "other").merge(&labels).unwrap();
        let corpus = Corpus::from_parts("root".into(), labels, samples);
        RemappedView::new(
            Arc::new(corpus),
            Arc::new(plan.index_map().clone()),
            positions,
            PathLoader,
        )
        .unwrap()
    }

    #[test]
    fn returns_remapped_labels() {
        let view = view(vec![3, 1, 0]);
        let item = view.try_get(0).unwrap();
        assert_eq!(item, RemappedItem::new("c/1.jpg".to_string(), 1));
        assert_eq!(view.label(1), Some(0));
        assert_eq!(view.label(2), Some(1));
        assert_eq!(view.label_counts(2), vec![1, 2]);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let view = view(vec![0, 1, 3]);
        for position in 0..3 {
            assert_eq!(view.try_get(position).unwrap(), view.try_get(position).unwrap());
        }
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let view = view(vec![0, 1]);
        let err = view.try_get(2).unwrap_err();
        assert!(matches!(err, ViewError::OutOfBounds { position: 2, len: 2 }));
        assert!(Dataset::get(&view, 2).is_none());
    }

    #[test]
    fn decode_failure_is_local_to_the_item() {
        let view = view(vec![2, 3]);
        assert!(matches!(view.try_get(0), Err(ViewError::Decode(_))));
        assert!(view.try_get(1).is_ok());

        let item = Dataset::get(&view, 0).unwrap();
        assert_eq!(item.label, 1);
        assert!(item.data.is_err());
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn label_outside_the_index_map_is_rejected() {
        let labels = LabelSpace::from_names(["a", "b"]);
        let plan = ClassMerger::new(["a"], "other").merge(&labels).unwrap();
        // Метка 5 не входит в пространство меток, для неё нет записи в отображении
        let samples = vec![Sample::new("a/0.jpg".into(), 0), Sample::new("x/0.jpg".into(), 5)];
        let corpus = Corpus::from_parts("root".into(), labels, samples);

        let err = RemappedView::new(
            Arc::new(corpus),
            Arc::new(plan.index_map().clone()),
            vec![0, 1],
            PathLoader,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ViewError::UnmappedLabel { position: 1, label: 5 }));
    }

    #[test]
    fn position_outside_the_corpus_is_rejected_at_construction() {
        let labels = LabelSpace::from_names(["a", "b"]);
        let plan = ClassMerger::new(["a"], "other").merge(&labels).unwrap();
        let corpus = Corpus::from_parts("root".into(), labels, vec![Sample::new("a/0.jpg".into(), 0)]);

        let err = RemappedView::new(
            Arc::new(corpus),
            Arc::new(plan.index_map().clone()),
            vec![0, 3],
            PathLoader,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ViewError::OutOfBounds { position: 3, len: 1 }));
    }

    #[test]
    fn image_loader_writes_channels_as_planes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("red.png");
        image::RgbImage::from_pixel(6, 4, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let data = ImageLoader::new(3).load(&Sample::new(path, 0)).unwrap();
        let plane = 3 * 3;
        assert_eq!((data.width, data.height), (3, 3));
        assert_eq!(data.pixels.len(), plane * 3);
        assert!(data.pixels[..plane].iter().all(|&v| v == 1.0));
        assert!(data.pixels[plane..].iter().all(|&v| v == 0.0));
    }
}
