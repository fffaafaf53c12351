use crate::hypers::{HIDDEN_DIMS, INPUT_DIMS, NUM_CLASSES};
use tch::{nn, Tensor};

pub struct Classifier {
    pub device: tch::Device,
    layers: tch::nn::Sequential,
}

impl Classifier {
    pub fn new(p: &nn::Path) -> Self {
        let layers = nn::seq()
            .add(nn::linear(
                p / "l1",
                INPUT_DIMS as i64,
                HIDDEN_DIMS as i64,
                Default::default(),
            ))
            .add_fn(|xs| xs.relu())
            .add(nn::linear(
                p / "l2",
                HIDDEN_DIMS as i64,
                NUM_CLASSES as i64,
                Default::default(),
            ));

        Self {
            layers,
            device: p.device(),
        }
    }

    /// Unnormalized class scores, `[batch, NUM_CLASSES]`.
    pub fn logits(&self, xs: &Tensor) -> Tensor {
        xs.apply(&self.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logits_have_one_score_per_class() {
        let vs = nn::VarStore::new(tch::Device::Cpu);
        let model = Classifier::new(&vs.root());
        let xs = Tensor::zeros([3, INPUT_DIMS as i64], (tch::Kind::Float, model.device));
        assert_eq!(model.logits(&xs).size(), vec![3, NUM_CLASSES as i64]);
    }
}
