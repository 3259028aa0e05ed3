use burn::config::Config;
use burn::module::Module;
use burn::optim::AdamConfig;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use spider_dataset::model::PooledImageClassifierConfig;
use spider_dataset::training::{self, DatasetConfig, TrainingConfig};

const CONFIG_ENV: &str = "SPIDER_DATASET_CONFIG";
const DEFAULT_CONFIG: &str = "dataset.json";
const TRAINING_CONFIG_ENV: &str = "SPIDER_TRAINING_CONFIG";
const ARTIFACT_DIR: &str = "/tmp/spider-dataset";

#[cfg(not(feature = "f16"))]
#[allow(dead_code)]
type ElemType = f32;
#[cfg(feature = "f16")]
type ElemType = burn::tensor::f16;

pub fn launch<B: AutodiffBackend>(device: B::Device) -> anyhow::Result<()> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = DatasetConfig::load(&path)
        .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?;
    let train_config = match std::env::var(TRAINING_CONFIG_ENV) {
        Ok(path) => TrainingConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("failed to load training config {path}: {e}"))?,
        Err(_) => TrainingConfig::new(AdamConfig::new()),
    };

    let prepared = training::prepare(&config)?;
    tracing::info!(
        classes = ?prepared.class_names(),
        train = prepared.split().train().len(),
        validation = prepared.split().validation().len(),
        "dataset prepared"
    );

    // Initialize model and data loaders
    let model = PooledImageClassifierConfig::new(prepared.num_classes()).init::<B>(&device);
    let loaders = training::build_dataloaders::<B>(&prepared, &config, device);

    let (model, summaries) = training::train(model, &loaders, prepared.class_names(), &train_config);
    if let Some(last) = summaries.last() {
        println!("{}", last.report);
    }

    // Save the configuration and the trained model
    std::fs::create_dir_all(ARTIFACT_DIR)?;
    config.save(format!("{ARTIFACT_DIR}/config.json"))?;
    train_config.save(format!("{ARTIFACT_DIR}/training.json"))?;
    CompactRecorder::new()
        .record(model.into_record(), format!("{ARTIFACT_DIR}/model").into())
        .map_err(|e| anyhow::anyhow!("failed to save model: {e:?}"))?;
    Ok(())
}

#[cfg(feature = "wgpu")]
mod wgpu {
    use crate::{launch, ElemType};
    use burn::backend::wgpu::{AutoGraphicsApi, Wgpu, WgpuDevice};
    use burn::backend::Autodiff;

    pub fn run() -> anyhow::Result<()> {
        launch::<Autodiff<Wgpu<AutoGraphicsApi, ElemType, i32>>>(WgpuDevice::default())
    }
}

#[cfg(not(feature = "wgpu"))]
mod ndarray {
    use crate::{launch, ElemType};
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;

    pub fn run() -> anyhow::Result<()> {
        launch::<Autodiff<NdArray<ElemType>>>(NdArrayDevice::Cpu)
    }
}

fn main() -> anyhow::Result<()> {
    spider_dataset::logging::init()?;

    #[cfg(feature = "wgpu")]
    wgpu::run()?;
    #[cfg(not(feature = "wgpu"))]
    ndarray::run()?;
    Ok(())
}
