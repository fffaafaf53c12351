use rand::{rngs::SmallRng, Rng, SeedableRng};
use tch::{Device, IndexOp, Kind, Tensor};

use crate::hypers::{INPUT_DIMS, NOISE, NUM_CLASSES};

/// Labelled examples kept on the CPU; minibatches are moved to the training
/// device as they are drawn.
#[derive(Debug)]
pub struct Dataset {
    /// `[len, INPUT_DIMS]` float features.
    pub features: Tensor,
    /// `[len]` int64 class indices.
    pub labels: Tensor,
}

impl Dataset {
    /// One random center per class, with examples scattered uniformly within
    /// `NOISE` of their center along every axis.
    pub fn synthetic(samples: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);

        let centers: Vec<Vec<f32>> = (0..NUM_CLASSES)
            .map(|_| (0..INPUT_DIMS).map(|_| rng.random_range(-2.0..2.0)).collect())
            .collect();

        let mut features = Vec::with_capacity(samples * INPUT_DIMS);
        let mut labels = Vec::with_capacity(samples);
        for _ in 0..samples {
            let class = rng.random_range(0..NUM_CLASSES);
            labels.push(class as i64);
            features.extend(
                centers[class]
                    .iter()
                    .map(|c| c + rng.random_range(-NOISE..NOISE)),
            );
        }

        Self {
            features: Tensor::from_slice(&features).view([samples as i64, INPUT_DIMS as i64]),
            labels: Tensor::from_slice(&labels),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits off the first `n` examples; the rest form the second dataset.
    pub fn split_at(&self, n: usize) -> (Dataset, Dataset) {
        let n = n.min(self.len()) as i64;
        let rest = self.len() as i64 - n;
        (
            Dataset {
                features: self.features.narrow(0, 0, n),
                labels: self.labels.narrow(0, 0, n),
            },
            Dataset {
                features: self.features.narrow(0, n, rest),
                labels: self.labels.narrow(0, n, rest),
            },
        )
    }

    /// Shuffled `(features, labels)` minibatches covering every example once.
    pub fn minibatches(
        &self,
        batch_size: usize,
        device: Device,
    ) -> impl Iterator<Item = (Tensor, Tensor)> + '_ {
        let perms = Tensor::randperm(self.len() as i64, (Kind::Int64, Device::Cpu));

        (0..self.len()).step_by(batch_size).map(move |start| {
            let upper = self.len().min(start + batch_size) as i64;
            let idxs = perms.i((start as i64)..upper);
            (
                self.features.index_select(0, &idxs).to(device),
                self.labels.index_select(0, &idxs).to(device),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_data_is_seeded() {
        let a = Dataset::synthetic(64, 3);
        let b = Dataset::synthetic(64, 3);
        assert_eq!(a.len(), 64);
        assert_eq!(a.features.size(), vec![64, INPUT_DIMS as i64]);
        assert!(a.features.equal(&b.features));
        assert!(a.labels.equal(&b.labels));

        let max_label = i64::try_from(a.labels.max()).unwrap();
        assert!(max_label < NUM_CLASSES as i64);
    }

    #[test]
    fn split_keeps_every_example() {
        let data = Dataset::synthetic(100, 1);
        let (train, test) = data.split_at(80);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        assert!(test.labels.equal(&data.labels.narrow(0, 80, 20)));
    }

    #[test]
    fn minibatches_cover_the_dataset() {
        let data = Dataset::synthetic(50, 2);
        let sizes: Vec<_> = data
            .minibatches(16, Device::Cpu)
            .map(|(xs, ys)| {
                assert_eq!(xs.size()[0], ys.size()[0]);
                ys.size()[0]
            })
            .collect();
        assert_eq!(sizes, vec![16, 16, 16, 2]);
    }
}
