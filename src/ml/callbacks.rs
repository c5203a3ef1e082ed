// ============================================================
// Layer 5 — Training Control Policies
// ============================================================
// The epoch-end decisions of the training loop, kept free of
// Burn types so every rule can be unit tested:
//
//   CheckpointPolicy  val_loss, min, best only, every `period` epochs
//                     → "save weights now?"
//   EarlyStopping     val_top1_acc, max, `patience` stagnant epochs
//                     → "stop now?"
//   ReduceLrOnPlateau val_loss, min, ×factor after `patience` stagnant epochs
//                     → "new learning rate?"
//
// The trainer feeds each policy the same EpochMetrics once per
// epoch and acts on the answers.

use crate::infra::metrics::EpochMetrics;

/// Whether a smaller or a larger monitored value is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Min,
    Max,
}

impl Mode {
    fn initial_best(self) -> f64 {
        match self {
            Mode::Min => f64::INFINITY,
            Mode::Max => f64::NEG_INFINITY,
        }
    }

    /// `current` beats `best` by more than `min_delta`
    fn improves(self, current: f64, best: f64, min_delta: f64) -> bool {
        match self {
            Mode::Min => current < best - min_delta,
            Mode::Max => current - min_delta > best,
        }
    }
}

/// Which epoch metric a policy watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitor {
    ValLoss,
    ValTop1Acc,
}

impl Monitor {
    pub fn read(self, m: &EpochMetrics) -> f64 {
        match self {
            Monitor::ValLoss    => m.val_loss,
            Monitor::ValTop1Acc => m.val_top1_acc,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Monitor::ValLoss    => "val_loss",
            Monitor::ValTop1Acc => "val_top1_acc",
        }
    }
}

// ─── CheckpointPolicy ─────────────────────────────────────────────────────────
/// Save-best-only checkpointing, evaluated every `period` epochs.
#[derive(Debug, Clone)]
pub struct CheckpointPolicy {
    monitor:           Monitor,
    mode:              Mode,
    period:            usize,
    best:              f64,
    epochs_since_save: usize,
}

impl CheckpointPolicy {
    pub fn new(monitor: Monitor, mode: Mode, period: usize) -> Self {
        Self {
            monitor,
            mode,
            period: period.max(1),
            best: mode.initial_best(),
            epochs_since_save: 0,
        }
    }

    /// True when the weights of this epoch should be written
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> bool {
        self.epochs_since_save += 1;
        if self.epochs_since_save < self.period {
            return false;
        }
        self.epochs_since_save = 0;

        let current = self.monitor.read(metrics);
        if current.is_nan() {
            tracing::warn!("{} is NaN at epoch {}, checkpoint skipped", self.monitor.name(), metrics.epoch);
            return false;
        }
        if self.mode.improves(current, self.best, 0.0) {
            tracing::info!(
                "Epoch {}: {} improved from {:.5} to {:.5}, saving weights",
                metrics.epoch, self.monitor.name(), self.best, current,
            );
            self.best = current;
            true
        } else {
            tracing::info!(
                "Epoch {}: {} did not improve from {:.5}",
                metrics.epoch, self.monitor.name(), self.best,
            );
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

// ─── EarlyStopping ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    monitor:   Monitor,
    mode:      Mode,
    patience:  usize,
    min_delta: f64,
    best:      f64,
    wait:      usize,
}

impl EarlyStopping {
    pub fn new(monitor: Monitor, mode: Mode, patience: usize, min_delta: f64) -> Self {
        Self { monitor, mode, patience, min_delta, best: mode.initial_best(), wait: 0 }
    }

    /// True when training should stop after this epoch
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics) -> bool {
        let current = self.monitor.read(metrics);
        if self.mode.improves(current, self.best, self.min_delta) {
            self.best = current;
            self.wait = 0;
            return false;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            tracing::info!(
                "Epoch {}: early stopping, {} has not improved for {} epoch(s)",
                metrics.epoch, self.monitor.name(), self.wait,
            );
            return true;
        }
        false
    }
}

// ─── ReduceLrOnPlateau ────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    monitor:          Monitor,
    mode:             Mode,
    factor:           f64,
    patience:         usize,
    min_delta:        f64,
    cooldown:         usize,
    min_lr:           f64,
    best:             f64,
    wait:             usize,
    cooldown_counter: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(monitor: Monitor, mode: Mode, factor: f64, patience: usize, min_delta: f64) -> Self {
        Self {
            monitor,
            mode,
            factor,
            patience,
            min_delta,
            cooldown: 0,
            min_lr: 0.0,
            best: mode.initial_best(),
            wait: 0,
            cooldown_counter: 0,
        }
    }

    pub fn with_cooldown(mut self, cooldown: usize) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_min_lr(mut self, min_lr: f64) -> Self {
        self.min_lr = min_lr;
        self
    }

    /// The learning rate to use from the next epoch on
    pub fn on_epoch_end(&mut self, metrics: &EpochMetrics, lr: f64) -> f64 {
        let current = self.monitor.read(metrics);

        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            self.wait = 0;
        }

        if self.mode.improves(current, self.best, self.min_delta) {
            self.best = current;
            self.wait = 0;
            return lr;
        }
        if self.cooldown_counter > 0 {
            return lr;
        }

        self.wait += 1;
        if self.wait < self.patience || lr <= self.min_lr {
            return lr;
        }

        let new_lr = (lr * self.factor).max(self.min_lr);
        tracing::info!(
            "Epoch {}: {} plateaued, reducing learning rate {:.3e} → {:.3e}",
            metrics.epoch, self.monitor.name(), lr, new_lr,
        );
        self.cooldown_counter = self.cooldown;
        self.wait = 0;
        new_lr
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, val_loss: f64, val_top1_acc: f64) -> EpochMetrics {
        EpochMetrics::new(epoch, 1.0, 0.0, val_loss, val_top1_acc, 1e-3)
    }

    #[test]
    fn test_checkpoint_only_on_period_boundaries() {
        let mut policy = CheckpointPolicy::new(Monitor::ValLoss, Mode::Min, 3);
        let saves: Vec<bool> = (1..=9)
            .map(|e| policy.on_epoch_end(&epoch(e, 10.0 - e as f64, 0.0)))
            .collect();
        assert_eq!(saves, [false, false, true, false, false, true, false, false, true]);
    }

    #[test]
    fn test_checkpoint_best_only() {
        let mut policy = CheckpointPolicy::new(Monitor::ValLoss, Mode::Min, 1);
        assert!(policy.on_epoch_end(&epoch(1, 0.50, 0.0)));
        assert!(!policy.on_epoch_end(&epoch(2, 0.60, 0.0)));
        assert!(!policy.on_epoch_end(&epoch(3, 0.50, 0.0)));
        assert!(policy.on_epoch_end(&epoch(4, 0.40, 0.0)));
        assert_eq!(policy.best(), 0.40);
    }

    #[test]
    fn test_checkpoint_compares_against_checkpoint_epochs_only() {
        // epoch 1 has the lowest loss but is never evaluated with period 2
        let mut policy = CheckpointPolicy::new(Monitor::ValLoss, Mode::Min, 2);
        assert!(!policy.on_epoch_end(&epoch(1, 0.10, 0.0)));
        assert!(policy.on_epoch_end(&epoch(2, 0.30, 0.0)));
        assert!(!policy.on_epoch_end(&epoch(3, 0.20, 0.0)));
        assert!(!policy.on_epoch_end(&epoch(4, 0.35, 0.0)));
    }

    #[test]
    fn test_checkpoint_skips_nan() {
        let mut policy = CheckpointPolicy::new(Monitor::ValLoss, Mode::Min, 1);
        assert!(!policy.on_epoch_end(&epoch(1, f64::NAN, 0.0)));
        assert!(policy.on_epoch_end(&epoch(2, 0.5, 0.0)));
    }

    #[test]
    fn test_early_stopping_patience_one_stops_on_first_stagnant_epoch() {
        let mut stop = EarlyStopping::new(Monitor::ValTop1Acc, Mode::Max, 1, 0.0);
        assert!(!stop.on_epoch_end(&epoch(1, 0.0, 0.30)));
        assert!(!stop.on_epoch_end(&epoch(2, 0.0, 0.35)));
        assert!(stop.on_epoch_end(&epoch(3, 0.0, 0.35)));
    }

    #[test]
    fn test_early_stopping_resets_wait_on_improvement() {
        let mut stop = EarlyStopping::new(Monitor::ValTop1Acc, Mode::Max, 2, 0.0);
        assert!(!stop.on_epoch_end(&epoch(1, 0.0, 0.30)));
        assert!(!stop.on_epoch_end(&epoch(2, 0.0, 0.20)));
        assert!(!stop.on_epoch_end(&epoch(3, 0.0, 0.40)));
        assert!(!stop.on_epoch_end(&epoch(4, 0.0, 0.40)));
        assert!(stop.on_epoch_end(&epoch(5, 0.0, 0.39)));
    }

    #[test]
    fn test_lr_decays_after_patience_and_resets() {
        let mut plateau = ReduceLrOnPlateau::new(Monitor::ValLoss, Mode::Min, 0.1, 2, 1e-4);
        let mut lr = 1e-3;

        lr = plateau.on_epoch_end(&epoch(1, 1.0, 0.0), lr);
        assert_eq!(lr, 1e-3);
        lr = plateau.on_epoch_end(&epoch(2, 1.0, 0.0), lr);
        assert_eq!(lr, 1e-3);
        lr = plateau.on_epoch_end(&epoch(3, 1.0, 0.0), lr);
        assert!((lr - 1e-4).abs() < 1e-12);

        // wait counter restarted: two more stagnant epochs before the next cut
        lr = plateau.on_epoch_end(&epoch(4, 1.0, 0.0), lr);
        assert!((lr - 1e-4).abs() < 1e-12);
        lr = plateau.on_epoch_end(&epoch(5, 1.0, 0.0), lr);
        assert!((lr - 1e-5).abs() < 1e-12);
    }

    #[test]
    fn test_lr_tiny_improvements_count_as_stagnant() {
        let mut plateau = ReduceLrOnPlateau::new(Monitor::ValLoss, Mode::Min, 0.5, 1, 1e-4);
        let lr = plateau.on_epoch_end(&epoch(1, 1.0, 0.0), 1.0);
        assert_eq!(lr, 1.0);
        let lr = plateau.on_epoch_end(&epoch(2, 1.0 - 1e-5, 0.0), lr);
        assert_eq!(lr, 0.5);
    }

    #[test]
    fn test_lr_respects_min_lr_and_cooldown() {
        let mut plateau = ReduceLrOnPlateau::new(Monitor::ValLoss, Mode::Min, 0.1, 1, 0.0)
            .with_min_lr(0.05)
            .with_cooldown(2);

        let lr = plateau.on_epoch_end(&epoch(1, 1.0, 0.0), 1.0);
        let lr = plateau.on_epoch_end(&epoch(2, 1.0, 0.0), lr);
        assert_eq!(lr, 0.1);
        // cooldown epoch: no change even though still stagnant
        let lr = plateau.on_epoch_end(&epoch(3, 1.0, 0.0), lr);
        assert_eq!(lr, 0.1);
        let lr = plateau.on_epoch_end(&epoch(4, 1.0, 0.0), lr);
        assert_eq!(lr, 0.05);
    }
}
