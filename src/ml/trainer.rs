// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Manual train + validation loop with Adam and epoch-end
// callbacks.
//
//   per epoch:
//     steps_per_epoch   batches from the cycling train generator
//                       → forward_loss → backward → Adam step
//     validation_steps  batches from the cycling dev generator
//                       on model.valid() (no autodiff, no dropout)
//     callbacks         checkpoint (val_loss, best only, every
//                       `checkpoint_period` epochs) → early stop
//                       (val_top1_acc) → LR decay (val_loss)
//     monitor           metrics.csv / steps.csv
//
//   after training:
//     reload the best checkpoint when this run wrote one, then save
//     model.json and the final weights.

use anyhow::{bail, Context, Result};
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use std::{path::Path, sync::Arc};

use crate::data::{
    batcher::TextBatcher,
    dataset::Split,
    generator::{steps_for, PassMode, SampleGenerator},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    config::AppConfig,
    metrics::{Accumulator, EpochMetrics, MetricsLogger},
};
use crate::ml::{
    callbacks::{CheckpointPolicy, EarlyStopping, Mode, Monitor, ReduceLrOnPlateau},
    model::{to_host, top1_hits, TextOnly, TextOnlyConfig},
    InferBackend, TrainBackend,
};

/// What a finished run reports back to the use case.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub history:       Vec<EpochMetrics>,
    pub stopped_early: bool,
    pub restored_best: bool,
}

impl TrainingSummary {
    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }
}

pub fn run_training(
    cfg:         &AppConfig,
    train:       Arc<Split>,
    dev:         Arc<Split>,
    num_classes: usize,
    ckpt:        &CheckpointManager,
    log_dir:     &Path,
) -> Result<TrainingSummary> {
    let device = <InferBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);
    TrainBackend::seed(cfg.seed);

    train_loop(cfg, train, dev, num_classes, ckpt, log_dir, device)
}

fn train_loop(
    cfg:         &AppConfig,
    train:       Arc<Split>,
    dev:         Arc<Split>,
    num_classes: usize,
    ckpt:        &CheckpointManager,
    log_dir:     &Path,
    device:      <InferBackend as Backend>::Device,
) -> Result<TrainingSummary> {
    if train.rows() == 0 {
        bail!("Training split '{}' has no rows", train.name());
    }
    if !train.is_labelled() {
        bail!("Training split '{}' has no label column", train.name());
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = TextOnlyConfig::new(cfg.vocab_size(), cfg.max_len, cfg.embd_size, num_classes)
        .with_dropout(cfg.dropout);
    let mut model: TextOnly<TrainBackend> = model_cfg.init(&device);
    model.describe();

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let mut lr    = cfg.lr;

    // ── Generators (both cycle; the epoch length is fixed by step counts) ────
    let steps_per_epoch  = steps_for(train.rows(), cfg.batch_size);
    let validation_steps = steps_for(dev.rows(), cfg.batch_size);
    tracing::info!(
        "steps_per_epoch={}, validation_steps={}",
        steps_per_epoch, validation_steps,
    );

    let mut train_gen = SampleGenerator::new(train, cfg.batch_size, PassMode::Cycle)?;
    let mut dev_gen   = SampleGenerator::new(dev, cfg.batch_size, PassMode::Cycle)?;

    let train_batcher = TextBatcher::<TrainBackend>::new(device.clone(), num_classes, cfg.vocab_size());
    let valid_batcher = TextBatcher::<InferBackend>::new(device.clone(), num_classes, cfg.vocab_size());

    // ── Callbacks ─────────────────────────────────────────────────────────────
    let mut checkpoint = CheckpointPolicy::new(Monitor::ValLoss, Mode::Min, cfg.checkpoint_period);
    let mut early_stop = EarlyStopping::new(
        Monitor::ValTop1Acc, Mode::Max, cfg.early_stopping_patience, 0.0,
    );
    let mut lr_decay = ReduceLrOnPlateau::new(
        Monitor::ValLoss, Mode::Min,
        cfg.lr_decay_factor, cfg.lr_decay_patience, cfg.lr_decay_min_delta,
    )
    .with_cooldown(0)
    .with_min_lr(0.0);
    let mut monitor = MetricsLogger::new(log_dir)?;

    // a weights file left by an earlier run in the same directory must never be restored
    ckpt.discard_weights()?;
    let mut saved_best = false;

    let mut history       = Vec::with_capacity(cfg.num_epochs);
    let mut stopped_early = false;
    let mut global_step   = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.num_epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_acc = Accumulator::default();

        for _ in 0..steps_per_epoch {
            let batch = train_gen.next().context("Training generator ran dry")?;
            let batch = train_batcher.batch(&batch)?;
            let (targets, classes) = batch.targets.zip(batch.classes)
                .context("Training batch has no labels")?;

            let (loss, probs) = model.forward_loss(batch.uni, batch.w_uni, targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            let scores        = to_host(probs.detach())?;
            train_acc.add(loss_val, top1_hits(&scores, num_classes, &classes), classes.len());

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);

            global_step += 1;
            monitor.log_step(global_step, epoch, loss_val)?;
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_acc = Accumulator::default();

        for _ in 0..validation_steps {
            let batch = dev_gen.next().context("Validation generator ran dry")?;
            let batch = valid_batcher.batch(&batch)?;
            let (targets, classes) = batch.targets.zip(batch.classes)
                .context("Validation batch has no labels")?;

            let (loss, probs) = model_valid.forward_loss(batch.uni, batch.w_uni, targets);
            let loss_val: f64 = loss.into_scalar().elem::<f64>();
            let scores        = to_host(probs)?;
            val_acc.add(loss_val, top1_hits(&scores, num_classes, &classes), classes.len());
        }

        let metrics = EpochMetrics::new(
            epoch,
            train_acc.mean_loss(),
            train_acc.top1_acc(),
            val_acc.mean_loss(),
            val_acc.top1_acc(),
            lr,
        );
        tracing::info!(
            "Epoch {:>3}/{} | loss={:.4} | top1_acc={:.1}% | val_loss={:.4} | val_top1_acc={:.1}% | lr={:.1e}",
            epoch, cfg.num_epochs, metrics.loss, metrics.top1_acc * 100.0,
            metrics.val_loss, metrics.val_top1_acc * 100.0, lr,
        );

        // ── Callbacks ─────────────────────────────────────────────────────────
        if checkpoint.on_epoch_end(&metrics) {
            ckpt.save_weights(&model)?;
            saved_best = true;
        }
        let stop = early_stop.on_epoch_end(&metrics);
        lr = lr_decay.on_epoch_end(&metrics, lr);

        monitor.log_epoch(&metrics)?;
        history.push(metrics);

        if stop {
            stopped_early = true;
            break;
        }
    }

    // ── Restore best and persist ──────────────────────────────────────────────
    let restored_best = saved_best && ckpt.has_weights();
    if restored_best {
        model = ckpt.load_weights(model, &device)?;
        tracing::info!("Restored best weights (val_loss={:.5})", checkpoint.best());
    } else {
        tracing::warn!("No checkpoint was written, keeping the last epoch's weights");
    }

    ckpt.save_architecture(&model_cfg)?;
    ckpt.save_model(&model.valid())?;
    tracing::info!("Model saved to '{}'", ckpt.dir().display());

    Ok(TrainingSummary { history, stopped_early, restored_best })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::synthetic_split;

    fn tiny_config() -> AppConfig {
        AppConfig {
            batch_size:              16,
            embd_size:               8,
            num_epochs:              3,
            max_len:                 6,
            unigram_hash_size:       40,
            lr:                      1e-2,
            checkpoint_period:       1,
            early_stopping_patience: 10,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_training_writes_artifacts_and_metrics() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config();
        let ckpt = CheckpointManager::create(dir.path().join("train")).unwrap();
        let logs = dir.path().join("logs");

        let train = Arc::new(synthetic_split("train", 40, 6, 3));
        let dev   = Arc::new(synthetic_split("dev", 10, 6, 3));

        let summary = run_training(&cfg, train, dev, 3, &ckpt, &logs).unwrap();

        assert!(summary.epochs_run() >= 1 && summary.epochs_run() <= 3);
        assert!(summary.restored_best);
        assert!(summary.history.iter().all(|m| m.loss.is_finite()));
        assert!(ckpt.dir().join("model.json").is_file());

        let model: TextOnly<InferBackend> = ckpt.load_model(&Default::default()).unwrap();
        assert_eq!(model.output.weight.dims(), [8, 3]);

        // header + one row per epoch, and steps_per_epoch = ceil(40/16) = 3
        let epochs = std::fs::read_to_string(logs.join("metrics.csv")).unwrap();
        assert_eq!(epochs.lines().count(), summary.epochs_run() + 1);
        let steps = std::fs::read_to_string(logs.join("steps.csv")).unwrap();
        assert_eq!(steps.lines().count(), summary.epochs_run() * 3 + 1);
    }

    #[test]
    fn test_rerun_in_same_dir_ignores_previous_checkpoint() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::create(dir.path().join("train")).unwrap();
        let logs = dir.path().join("logs");

        let train = Arc::new(synthetic_split("train", 40, 6, 3));
        let dev   = Arc::new(synthetic_split("dev", 10, 6, 3));

        let first = AppConfig { num_epochs: 1, ..tiny_config() };
        let summary = run_training(&first, train.clone(), dev.clone(), 3, &ckpt, &logs).unwrap();
        assert!(summary.restored_best);

        // period 10 never reaches a checkpoint evaluation within 2 epochs
        let second = AppConfig { num_epochs: 2, checkpoint_period: 10, ..tiny_config() };
        let summary = run_training(&second, train, dev, 3, &ckpt, &logs).unwrap();
        assert_eq!(summary.epochs_run(), 2);
        assert!(!summary.restored_best);
        assert!(!ckpt.has_weights());
    }

    #[test]
    fn test_unlabelled_training_split_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::create(dir.path()).unwrap();

        let base  = synthetic_split("train", 8, 6, 2);
        let train = Split::new(
            "train",
            base.uni().to_owned(),
            base.w_uni().to_owned(),
            None,
            base.pid().map(|p| p.to_vec()),
        )
        .unwrap();

        let dev = Arc::new(synthetic_split("dev", 4, 6, 2));
        let err = run_training(&tiny_config(), Arc::new(train), dev, 2, &ckpt, &dir.path().join("logs"));
        assert!(err.is_err());
    }
}
