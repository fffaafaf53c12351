use std::error::Error;
use std::time::Instant;

use tch::nn::{self, OptimizerConfig};
use tch::{Kind, Tensor};
use train_metrics::{
    dataset::Dataset,
    hypers,
    model::Classifier,
    telemetry, Accuracy, Average, Computed, Metric, MultiMetric, Updates, Welford,
};

pub fn main() -> Result<(), Box<dyn Error>> {
    let device = tch::Device::cuda_if_available();
    let provider = telemetry::init_meter_provider()?;
    telemetry::record_training_start_time();
    telemetry::record_training_status(true);

    let vs = nn::VarStore::new(device);
    let model = Classifier::new(&vs.root());

    let data = Dataset::synthetic(hypers::SAMPLES, hypers::DATA_SEED);
    let (train, test) = data.split_at(hypers::SAMPLES * 4 / 5);

    // Per-batch mean loss feeds both the running average and its spread across
    // batches.
    let mut train_metrics = MultiMetric::new()
        .with("accuracy", Accuracy::new())?
        .with("loss", Average::with_argname("loss"))?
        .with("loss_spread", Welford::with_argname("loss"))?;

    // Per-example losses, so the average is over examples rather than batches.
    let mut eval_metrics = MultiMetric::new()
        .with("accuracy", Accuracy::new())?
        .with("loss", Average::with_argname("loss"))?;

    let mut lr = hypers::INITIAL_LEARNING_RATE;

    println!("Starting train loop");
    for epoch in 1..=hypers::EPOCHS {
        telemetry::record_epoch(epoch);
        let st = Instant::now();

        // A fresh optimizer each epoch so the decayed learning rate takes effect.
        let mut adam = nn::Adam::default().build(&vs, lr)?;
        telemetry::record_learning_rate(lr);

        train_metrics.reset();
        for (xs, ys) in train.minibatches(hypers::BATCH_SIZE, device) {
            let logits = model.logits(&xs);
            let loss = logits.cross_entropy_for_logits(&ys);
            adam.backward_step(&loss);

            let loss_value = f64::try_from(&loss)?;
            let logits = logits.detach();
            train_metrics.update(
                &Updates::new()
                    .with("logits", &logits)
                    .with("labels", &ys)
                    .with("loss", loss_value),
            )?;
            telemetry::increment_training_batches();
        }

        eval_metrics.reset();
        tch::no_grad(|| evaluate(&model, &test, &mut eval_metrics))?;

        let train_result = Computed::from(train_metrics.compute());
        let eval_result = Computed::from(eval_metrics.compute());
        telemetry::record_computed("train", &train_result);
        telemetry::record_computed("eval", &eval_result);

        println!(
            "Epoch: {}, Train: [{}], Eval: [{}], LR: {:.6}, Time: {:.2}s",
            epoch,
            train_result,
            eval_result,
            lr,
            (Instant::now() - st).as_secs_f32(),
        );

        lr = hypers::MIN_LEARNING_RATE.max(lr * hypers::LEARNING_RATE_DECAY);
    }

    telemetry::record_training_status(false);
    provider.shutdown()?;
    Ok(())
}

fn evaluate(
    model: &Classifier,
    data: &Dataset,
    metrics: &mut MultiMetric,
) -> train_metrics::Result<()> {
    for (xs, ys) in data.minibatches(hypers::BATCH_SIZE, model.device) {
        let logits = model.logits(&xs);
        let per_example_loss = logits
            .log_softmax(-1, Kind::Float)
            .gather(1, &ys.unsqueeze(1), false)
            .neg();

        metrics.update(&batch_updates(&logits, &ys, &per_example_loss))?;
    }

    Ok(())
}

fn batch_updates<'a>(logits: &'a Tensor, labels: &'a Tensor, loss: &'a Tensor) -> Updates<'a> {
    Updates::new()
        .with("logits", logits)
        .with("labels", labels)
        .with("loss", loss)
}
