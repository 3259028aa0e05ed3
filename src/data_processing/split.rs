
// Разбиение отобранных позиций на обучающую и валидационную части. Позиции перемешиваются
// генератором с явным seed, первые floor(f * N) идут в валидацию, остальные в обучение.
// Стратификации по классам нет: доли классов сохраняются только в среднем.

use super::error::ConfigError;
use super::sampler::SampledIndexSet;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Обучающая и валидационная части. Вычисляются один раз и не изменяются.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    train: Vec<usize>,
    validation: Vec<usize>,
}

impl Split {
    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn validation(&self) -> &[usize] {
        &self.validation
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.train, self.validation)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SplitBuilder {
    validation_fraction: f64,
    seed: u64,
}

impl SplitBuilder {
    pub fn new(validation_fraction: f64, seed: u64) -> Result<Self, ConfigError> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(ConfigError::InvalidFraction(validation_fraction));
        }
        Ok(Self {
            validation_fraction,
            seed,
        })
    }

    /// Размер валидационной части для N отобранных позиций
    pub fn validation_size(&self, total: usize) -> usize {
        (self.validation_fraction * total as f64).floor() as usize
    }

    pub fn split(&self, sampled: &SampledIndexSet) -> Split {
        let mut shuffled = sampled.positions().to_vec();
        let mut rng = StdRng::seed_from_u64(self.seed);
        shuffled.shuffle(&mut rng);

        let validation_size = self.validation_size(shuffled.len());
        let train = shuffled.split_off(validation_size);
        if validation_size == 0 {
            tracing::warn!(total = train.len(), "validation split is empty");
        }
        tracing::info!(
            train = train.len(),
            validation = shuffled.len(),
            "split built"
        );

        Split {
            train,
            validation: shuffled,
        }
    }
}
