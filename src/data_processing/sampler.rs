
// Балансирующий сэмплер: все примеры обычных классов проходят без изменений, а для
// синтетического (слитого) класса выбирается ограниченное случайное подмножество без
// повторений. Генератор инициализируется явным seed, поэтому результат воспроизводим.

use super::corpus::Sample;
use super::merge::ClassIndexMap;
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// Упорядоченный набор позиций корпуса, отобранных для обучения и валидации
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampledIndexSet {
    positions: Vec<usize>,
    merged_count: usize,
}

impl SampledIndexSet {
    /// Позиции в корпусе: сначала обычные классы в порядке обхода, затем слитый класс
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Сколько позиций принадлежит слитому классу
    pub fn merged_count(&self) -> usize {
        self.merged_count
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn into_positions(self) -> Vec<usize> {
        self.positions
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BalancedSampler {
    pub cap: usize, // Максимум примеров слитого класса
    pub seed: u64,
}

impl BalancedSampler {
    pub fn new(cap: usize, seed: u64) -> Self {
        Self { cap, seed }
    }

    pub fn sample(
        &self,
        samples: &[Sample],
        index_map: &ClassIndexMap,
        merged_label: usize,
    ) -> SampledIndexSet {
        let mut positions = Vec::with_capacity(samples.len());
        let mut merged = Vec::new();

        for (position, sample) in samples.iter().enumerate() {
            match index_map.get(sample.label) {
                Some(label) if label == merged_label => merged.push(position),
                Some(_) => positions.push(position),
                None => {
                    tracing::warn!(position, label = sample.label, "sample label outside index map");
                }
            }
        }

        let available = merged.len();
        let amount = self.cap.min(available);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut chosen: Vec<usize> = index::sample(&mut rng, available, amount)
            .into_iter()
            .map(|i| merged[i])
            .collect();
        chosen.sort_unstable();

        tracing::info!(
            kept = positions.len(),
            merged_available = available,
            merged_sampled = amount,
            "balanced sample drawn"
        );

        positions.extend_from_slice(&chosen);
        SampledIndexSet {
            positions,
            merged_count: amount,
        }
    }
}
