// Данный модуль готовит данные для обучения классификатора изображений. Сначала читается корпус
// "папка на класс", затем второстепенные классы сливаются в один синтетический класс, слитый
// класс ограничивается сверху случайной подвыборкой, и отобранные примеры разбиваются на
// обучающую и валидационную части. Результат - два представления с новыми метками и список имён
// классов для отчёта. Затем из представлений строятся загрузчики данных burn, и на них
// обучается классификатор: после каждой эпохи на валидации строится отчёт по классам.

use crate::data_processing::{
    BalancedSampler, ClassMerger, ConfigError, Corpus, CorpusError, ImageClassificationBatch,
    ImageClassificationBatcher, ImageLoader, LabelSpace, RemappedView, Split, SplitBuilder,
    ViewError,
};
use crate::report::{argmax_labels, int_labels, ClassificationReport};
use burn::{
    config::Config,
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Config)]
pub struct DatasetConfig {
    pub corpus_root: String,
    pub merge_classes: Vec<String>,
    #[config(default = "\"not_a_jumping_spider\".to_string()")]
    pub merged_class_name: String,
    #[config(default = 220)]
    pub merged_cap: usize,
    #[config(default = 0.05)]
    pub validation_fraction: f64,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 256)]
    pub image_size: u32,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 1)]
    pub num_workers: usize,
}

#[derive(Config)]
pub struct TrainingConfig {
    pub optimizer: AdamConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 1.0e-4)]
    pub learning_rate: f64,
}

/// Ошибки построения набора данных. Все они фатальны.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    View(#[from] ViewError),
}

/// Подготовленные данные: представления для обучения и валидации и новое пространство меток
pub struct PreparedDataset {
    labels: LabelSpace,
    merged_label: usize,
    split: Split,
    train: RemappedView<ImageLoader>,
    valid: RemappedView<ImageLoader>,
}

impl PreparedDataset {
    /// Имена классов в порядке новых индексов
    pub fn class_names(&self) -> &[String] {
        self.labels.names()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn merged_label(&self) -> usize {
        self.merged_label
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn train(&self) -> &RemappedView<ImageLoader> {
        &self.train
    }

    pub fn valid(&self) -> &RemappedView<ImageLoader> {
        &self.valid
    }
}

// Define prepare function
pub fn prepare(config: &DatasetConfig) -> Result<PreparedDataset, PipelineError> {
    // Read the corpus once; everything below works on this snapshot
    let corpus = Arc::new(Corpus::read(&config.corpus_root)?);

    // Collapse minor classes into the synthetic one
    let plan = ClassMerger::new(config.merge_classes.iter().cloned(), &config.merged_class_name)
        .merge(corpus.labels())?;
    let merged_label = plan.merged_label();
    let (labels, index_map) = plan.into_parts();

    // Cap the synthetic class and split what is left
    let sampled = BalancedSampler::new(config.merged_cap, config.seed).sample(
        corpus.samples(),
        &index_map,
        merged_label,
    );
    let split = SplitBuilder::new(config.validation_fraction, config.seed)?.split(&sampled);

    let index_map = Arc::new(index_map);
    let loader = ImageLoader::new(config.image_size);
    let (train_positions, valid_positions) = split.clone().into_parts();
    let train = RemappedView::new(corpus.clone(), index_map.clone(), train_positions, loader)?;
    let valid = RemappedView::new(corpus, index_map, valid_positions, loader)?;

    for (label, (name, count)) in labels
        .names()
        .iter()
        .zip(train.label_counts(labels.len()))
        .enumerate()
    {
        tracing::info!(label, class = %name, train = count, "class prepared");
    }

    Ok(PreparedDataset {
        labels,
        merged_label,
        split,
        train,
        valid,
    })
}

/// Загрузчики данных для обучения и валидации
pub struct DataLoaders<B: AutodiffBackend> {
    pub train: Arc<dyn DataLoader<ImageClassificationBatch<B>>>,
    pub valid: Arc<dyn DataLoader<ImageClassificationBatch<B::InnerBackend>>>,
}

pub fn build_dataloaders<B: AutodiffBackend>(
    prepared: &PreparedDataset,
    config: &DatasetConfig,
    device: B::Device, // Device on which batches are created
) -> DataLoaders<B> {
    let side = config.image_size as usize;

    // Initialize batchers for training and validation data
    let batcher_train = ImageClassificationBatcher::<B>::new(device.clone(), side);
    let batcher_valid = ImageClassificationBatcher::<B::InnerBackend>::new(device, side);

    // Training data is reshuffled every epoch, validation order is fixed
    let train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(prepared.train.clone());

    let valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(prepared.valid.clone());

    DataLoaders { train, valid }
}

/// Итог одной эпохи
#[derive(Clone, Debug)]
pub struct EpochSummary {
    pub epoch: usize,
    pub train_loss: f64, // Средний loss по непустым пакетам
    pub train_batches: usize,
    pub failed: usize, // Пропущенные из-за ошибок декодирования элементы (обучение и валидация)
    pub report: ClassificationReport,
}

/// Прогоняет модель по валидационному загрузчику и строит отчёт по классам.
/// Пустой набор даёт нулевой отчёт. Возвращает отчёт и число пропущенных элементов.
pub fn evaluate<B, M>(
    model: &M,
    loader: &dyn DataLoader<ImageClassificationBatch<B>>,
    class_names: &[String],
) -> (ClassificationReport, usize)
where
    B: Backend,
    M: ValidStep<ImageClassificationBatch<B>, ClassificationOutput<B>>,
{
    let mut targets = Vec::new();
    let mut predictions = Vec::new();
    let mut failed = 0;

    for batch in loader.iter() {
        failed += batch.failed;
        if batch.targets.dims()[0] == 0 {
            continue;
        }
        let output = model.step(batch);
        targets.extend(int_labels(output.targets));
        predictions.extend(argmax_labels(output.output));
    }

    let report = ClassificationReport::from_predictions(&targets, &predictions, class_names);
    (report, failed)
}

// Define train function
pub fn train<B, M>(
    mut model: M,             // Model to train
    loaders: &DataLoaders<B>, // Train and validation loaders
    class_names: &[String],   // Class names in label order, for the report
    config: &TrainingConfig,  // Optimizer and schedule
) -> (M, Vec<EpochSummary>)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + TrainStep<ImageClassificationBatch<B>, ClassificationOutput<B>>,
    M::InnerModule:
        ValidStep<ImageClassificationBatch<B::InnerBackend>, ClassificationOutput<B::InnerBackend>>,
{
    // Initialize optimizer
    let mut optim = config.optimizer.init::<B, M>();
    let mut summaries = Vec::with_capacity(config.num_epochs);

    for epoch in 1..=config.num_epochs {
        let mut loss_sum = 0.0;
        let mut train_batches = 0;
        let mut failed = 0;

        for batch in loaders.train.iter() {
            failed += batch.failed;
            // Пакет, в котором все элементы не декодировались, пропускается
            if batch.targets.dims()[0] == 0 {
                continue;
            }
            let TrainOutput { grads, item } = TrainStep::step(&model, batch);
            loss_sum += item.loss.into_scalar().elem::<f64>();
            model = optim.step(config.learning_rate, model, grads);
            train_batches += 1;
        }

        let (report, valid_failed) = evaluate(&model.valid(), loaders.valid.as_ref(), class_names);
        let train_loss = if train_batches == 0 {
            0.0
        } else {
            loss_sum / train_batches as f64
        };
        tracing::info!(
            epoch,
            train_loss,
            train_batches,
            failed = failed + valid_failed,
            accuracy = report.accuracy,
            "epoch complete\n{report}"
        );

        summaries.push(EpochSummary {
            epoch,
            train_loss,
            train_batches,
            failed: failed + valid_failed,
            report,
        });
    }

    (model, summaries)
}
