
// Базовая модель классификации изображений на Burn. Изображение сжимается адаптивным
// усредняющим пулингом до сетки pool_size x pool_size по каждому каналу, затем два
// линейных слоя дают логиты классов. Модель нужна, чтобы прогнать подготовленные данные
// через обучение и получить отчёт по классам на валидации.

use crate::data_processing::ImageClassificationBatch;
use burn::{
    config::Config,
    module::Module,
    nn::{
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig,
    },
    tensor::{
        activation::{relu, softmax},
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};

/// Операции классификатора изображений
pub trait ImageClassifier<B: Backend> {
    /// Прямой проход для обучения и валидации: логиты вместе с loss
    fn forward_classification(&self, batch: ImageClassificationBatch<B>) -> ClassificationOutput<B>;
    /// Вероятности классов [batch, n_classes]
    fn inference(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

#[derive(Module, Debug)]
pub struct PooledImageClassifier<B: Backend> {
    pool: AdaptiveAvgPool2d,
    hidden: Linear<B>,
    output: Linear<B>,
    features: usize,
    n_classes: usize,
}

impl<B: Backend> PooledImageClassifier<B> {
    /// Логиты классов для пакета изображений [batch, 3, side, side]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();
        let pooled = self.pool.forward(images).reshape([batch_size, self.features]);
        let hidden = relu(self.hidden.forward(pooled));
        self.output.forward(hidden)
    }

    pub fn num_classes(&self) -> usize {
        self.n_classes
    }
}

impl<B: Backend> ImageClassifier<B> for PooledImageClassifier<B> {
    fn forward_classification(&self, batch: ImageClassificationBatch<B>) -> ClassificationOutput<B> {
        // Перемещаем тензоры на устройство модели
        let device = &self.output.weight.device();
        let images = batch.images.to_device(device);
        let targets = batch.targets.to_device(device);

        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }

    fn inference(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}

// Конфигурация модели
#[derive(Config)]
pub struct PooledImageClassifierConfig {
    n_classes: usize,
    #[config(default = 8)]
    pool_size: usize,
    #[config(default = 64)]
    hidden_size: usize,
}

impl PooledImageClassifierConfig {
    /// Инициализация модели со случайными весами
    pub fn init<B: Backend>(&self, device: &B::Device) -> PooledImageClassifier<B> {
        let features = 3 * self.pool_size * self.pool_size;
        PooledImageClassifier {
            pool: AdaptiveAvgPool2dConfig::new([self.pool_size, self.pool_size]).init(),
            hidden: LinearConfig::new(features, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.n_classes).init(device),
            features,
            n_classes: self.n_classes,
        }
    }
}

/// Шаг обучения
impl<B: AutodiffBackend> TrainStep<ImageClassificationBatch<B>, ClassificationOutput<B>>
    for PooledImageClassifier<B>
{
    fn step(&self, batch: ImageClassificationBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        // Прямой проход, градиенты возвращаются вместе с выходом
        let item = self.forward_classification(batch);
        let grads = item.loss.backward();

        TrainOutput::new(self, grads, item)
    }
}

/// Шаг валидации
impl<B: Backend> ValidStep<ImageClassificationBatch<B>, ClassificationOutput<B>>
    for PooledImageClassifier<B>
{
    fn step(&self, batch: ImageClassificationBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch)
    }
}
