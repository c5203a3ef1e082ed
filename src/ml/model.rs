use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

/// Clamp applied to probabilities before taking logs in the loss
pub const BCE_EPSILON: f64 = 1e-7;

#[derive(Config, Debug)]
pub struct TextOnlyConfig {
    /// Hashed unigram vocabulary, including the padding id 0
    pub vocab_size:  usize,
    pub max_len:     usize,
    pub embd_size:   usize,
    pub num_classes: usize,
    #[config(default = 0.25)]
    pub dropout:     f64,
}

impl TextOnlyConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TextOnly<B> {
        TextOnly {
            uni_embd:  EmbeddingConfig::new(self.vocab_size, self.embd_size).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            output:    LinearConfig::new(self.embd_size, self.num_classes).init(device),
            max_len:   self.max_len,
            embd_size: self.embd_size,
        }
    }
}

/// Embedding lookup → per-token weighted pooling → dropout → ReLU → dense → sigmoid.
#[derive(Module, Debug)]
pub struct TextOnly<B: Backend> {
    pub uni_embd:  Embedding<B>,
    pub dropout:   Dropout,
    pub output:    Linear<B>,
    pub max_len:   usize,
    pub embd_size: usize,
}

impl<B: Backend> TextOnly<B> {
    /// uni: [batch, max_len] token ids, w_uni: [batch, max_len] weights
    /// → per-class probabilities [batch, num_classes]
    pub fn forward(&self, uni: Tensor<B, 2, Int>, w_uni: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, max_len] = uni.dims();

        let embd = self.uni_embd.forward(uni); // [batch, max_len, embd]

        // Weighted sum over the token axis as a batched dot product:
        // [batch, embd, max_len] x [batch, max_len, 1] → [batch, embd, 1]
        let weights = w_uni.reshape([batch_size, max_len, 1]);
        let pooled  = embd
            .swap_dims(1, 2)
            .matmul(weights)
            .reshape([batch_size, self.embd_size]);

        let x = relu(self.dropout.forward(pooled));
        sigmoid(self.output.forward(x))
    }

    /// Mean binary cross-entropy over every output unit.
    pub fn forward_loss(
        &self,
        uni:     Tensor<B, 2, Int>,
        w_uni:   Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let probs = self.forward(uni, w_uni);
        let loss  = binary_cross_entropy(probs.clone(), targets);
        (loss, probs)
    }

    /// Log a layer summary, one line per layer, plus the parameter count
    pub fn describe(&self) {
        let [vocab_size, embd_size] = self.uni_embd.weight.dims();
        let [_, num_classes]        = self.output.weight.dims();

        tracing::info!("Layer (type)          Output shape");
        tracing::info!("input_1 (Input)       (None, {})", self.max_len);
        tracing::info!("input_2 (Input)       (None, {})", self.max_len);
        tracing::info!("uni_embd (Embedding)  (None, {}, {})  vocab={}", self.max_len, embd_size, vocab_size);
        tracing::info!("dot (WeightedPool)    (None, {})", embd_size);
        tracing::info!("dropout (Dropout)     (None, {})", embd_size);
        tracing::info!("relu1 (ReLU)          (None, {})", embd_size);
        tracing::info!("dense (Linear+Sigm.)  (None, {})", num_classes);
        tracing::info!("Total params: {}", self.num_params());
    }
}

/// -mean(y·log(p) + (1-y)·log(1-p)), with p clamped to [ε, 1-ε]
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let probs = probs.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);

    let positive = targets.clone() * probs.clone().log();
    let negative = (targets.neg() + 1.0) * (probs.neg() + 1.0).log();

    (positive + negative).neg().mean()
}

/// Copy a score matrix to the host as row-major f32
pub fn to_host<B: Backend>(scores: Tensor<B, 2>) -> anyhow::Result<Vec<f32>> {
    scores
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read scores back from the device: {e:?}"))
}

/// Index of the first maximal score of every row of a row-major matrix
pub fn argmax_rows(scores: &[f32], width: usize) -> Vec<usize> {
    if width == 0 {
        return Vec::new();
    }
    scores
        .chunks(width)
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Rows whose arg-max score equals the target class
pub fn top1_hits(scores: &[f32], width: usize, targets: &[usize]) -> usize {
    argmax_rows(scores, width)
        .iter()
        .zip(targets)
        .filter(|(pred, target)| pred == target)
        .count()
}
