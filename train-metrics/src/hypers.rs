/// Number of input features per synthetic example.
pub const INPUT_DIMS: usize = 8;

/// Number of classes the classifier predicts between.
pub const NUM_CLASSES: usize = 4;

pub const HIDDEN_DIMS: usize = 32;

/// Size of the synthetic dataset generated at startup.
pub const SAMPLES: usize = 4096;

/// Half-width of the noise added around each class center. Larger values
/// make the classes overlap and cap the reachable accuracy.
pub const NOISE: f32 = 0.75;

pub const EPOCHS: usize = 20;

/// The minibatch size for training.
pub const BATCH_SIZE: usize = 128;

pub const INITIAL_LEARNING_RATE: f64 = 1e-3;
pub const MIN_LEARNING_RATE: f64 = 1e-5;
pub const LEARNING_RATE_DECAY: f64 = 0.9;

/// Seed for the dataset so runs are comparable.
pub const DATA_SEED: u64 = 0;
