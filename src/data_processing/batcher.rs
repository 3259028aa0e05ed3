
// Модуль определяет структуру ImageClassificationBatch для пакетов изображений во время обучения
// и валидации, и ImageClassificationBatcher, который эти пакеты собирает. Батчер параметризован
// типом B: Backend для поддержки различных вычислительных бэкэндов (например, CPU, CUDA).

// Элементы, которые не удалось декодировать, в пакет не попадают: они пропускаются,
// логируются и учитываются в поле failed, чтобы вызывающий мог посчитать общее число ошибок.

use super::dataset::{ImageTensorData, LoadedSample};
use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Data, Int, Shape, Tensor},
};
use derive_new::new;

/// Структура для упаковки элементов классификации изображений
#[derive(new)]
pub struct ImageClassificationBatcher<B: Backend> {
    device: B::Device, // Вычислительное устройство для создания тензоров
    side: usize,       // Сторона квадратного изображения после загрузки
}

/// Структура для пакета в задаче классификации изображений
#[derive(Debug, Clone, new)]
pub struct ImageClassificationBatch<B: Backend> {
    pub images: Tensor<B, 4>,       // Изображения [batch, 3, side, side]
    pub targets: Tensor<B, 1, Int>, // Новые метки классов
    pub failed: usize,              // Сколько элементов пропущено из-за ошибок декодирования
}

impl<B: Backend> Batcher<LoadedSample<ImageTensorData>, ImageClassificationBatch<B>>
    for ImageClassificationBatcher<B>
{
    /// Создает пакет из вектора загруженных элементов
    fn batch(&self, items: Vec<LoadedSample<ImageTensorData>>) -> ImageClassificationBatch<B> {
        let plane = self.side * self.side * 3;
        let mut pixels = Vec::with_capacity(items.len() * plane);
        let mut labels = Vec::with_capacity(items.len());
        let mut failed = 0;

        for item in items {
            match item.data {
                Ok(image) if image.pixels.len() == plane => {
                    pixels.extend_from_slice(&image.pixels);
                    labels.push(item.label as i64);
                }
                Ok(image) => {
                    tracing::warn!(
                        path = %item.path.display(),
                        width = image.width,
                        height = image.height,
                        "image has unexpected size, skipping"
                    );
                    failed += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping undecodable sample");
                    failed += 1;
                }
            }
        }

        let count = labels.len();
        let images = Tensor::<B, 4>::from_data(
            Data::new(pixels, Shape::new([count, 3, self.side, self.side]))
                .convert::<B::FloatElem>(),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            Data::new(labels, Shape::new([count])).convert::<B::IntElem>(),
            &self.device,
        );

        ImageClassificationBatch {
            images,
            targets,
            failed,
        }
    }
}
