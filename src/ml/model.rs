use anyhow::{bail, Result};
use burn::{
    nn::{
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct LinearModelConfig {
    /// Joints per pose; input is joints*2 wide, output joints*3
    #[config(default = 16)]
    pub num_joints:  usize,
    /// Width of every hidden layer
    #[config(default = 1024)]
    pub linear_size: usize,
    /// Number of residual blocks between the input and output layers
    #[config(default = 2)]
    pub num_stage:   usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl LinearModelConfig {
    pub fn input_size(&self) -> usize {
        self.num_joints * 2
    }

    pub fn output_size(&self) -> usize {
        self.num_joints * 3
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearModel<B> {
        let linear_stages: Vec<LinearBlock<B>> = (0..self.num_stage)
            .map(|_| self.build_block(device))
            .collect();
        LinearModel {
            w1:          LinearConfig::new(self.input_size(), self.linear_size).init(device),
            batch_norm1: BatchNormConfig::new(self.linear_size).init(device),
            linear_stages,
            w2:          LinearConfig::new(self.linear_size, self.output_size()).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> LinearBlock<B> {
        LinearBlock {
            w1:          LinearConfig::new(self.linear_size, self.linear_size).init(device),
            batch_norm1: BatchNormConfig::new(self.linear_size).init(device),
            w2:          LinearConfig::new(self.linear_size, self.linear_size).init(device),
            batch_norm2: BatchNormConfig::new(self.linear_size).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Residual block: two linear → batch-norm → relu → dropout layers
/// whose output is added back onto the block input.
///
/// Field names match the checkpoint's state-dict keys.
#[derive(Module, Debug)]
pub struct LinearBlock<B: Backend> {
    pub w1:          Linear<B>,
    pub batch_norm1: BatchNorm<B, 0>,
    pub w2:          Linear<B>,
    pub batch_norm2: BatchNorm<B, 0>,
    pub dropout:     Dropout,
}

impl<B: Backend> LinearBlock<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let y = self.w1.forward(x.clone());
        let y = self.dropout.forward(relu(self.batch_norm1.forward(y)));
        let y = self.w2.forward(y);
        let y = self.dropout.forward(relu(self.batch_norm2.forward(y)));
        x + y
    }

    fn check_shapes(&self, linear_size: usize, stage: usize) -> Result<()> {
        let name = format!("linear_stages.{stage}");
        check_linear(&self.w1, linear_size, linear_size, &format!("{name}.w1"))?;
        check_norm(&self.batch_norm1, linear_size, &format!("{name}.batch_norm1"))?;
        check_linear(&self.w2, linear_size, linear_size, &format!("{name}.w2"))?;
        check_norm(&self.batch_norm2, linear_size, &format!("{name}.batch_norm2"))
    }
}

/// Residual fully-connected 2D → 3D pose regressor.
///
/// In burn, batch-norm and dropout switch to inference behaviour
/// automatically on a backend without autodiff.
#[derive(Module, Debug)]
pub struct LinearModel<B: Backend> {
    pub w1:            Linear<B>,
    pub batch_norm1:   BatchNorm<B, 0>,
    pub linear_stages: Vec<LinearBlock<B>>,
    pub w2:            Linear<B>,
    pub dropout:       Dropout,
}

impl<B: Backend> LinearModel<B> {
    /// input: [batch, joints*2] → output: [batch, joints*3]
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let y = self.w1.forward(input);
        let mut y = self.dropout.forward(relu(self.batch_norm1.forward(y)));
        for stage in &self.linear_stages {
            y = stage.forward(y);
        }
        self.w2.forward(y)
    }

    /// Compare every parameter shape against `config`.
    ///
    /// Loading a record never checks shapes itself, so a checkpoint
    /// trained with another width would otherwise load silently.
    pub fn check_shapes(&self, config: &LinearModelConfig) -> Result<()> {
        if self.linear_stages.len() != config.num_stage {
            bail!(
                "Checkpoint has {} residual stages, expected {}",
                self.linear_stages.len(), config.num_stage
            );
        }
        check_linear(&self.w1, config.input_size(), config.linear_size, "w1")?;
        check_norm(&self.batch_norm1, config.linear_size, "batch_norm1")?;
        for (i, stage) in self.linear_stages.iter().enumerate() {
            stage.check_shapes(config.linear_size, i)?;
        }
        check_linear(&self.w2, config.linear_size, config.output_size(), "w2")
    }
}

fn check_linear<B: Backend>(layer: &Linear<B>, d_in: usize, d_out: usize, name: &str) -> Result<()> {
    // burn stores linear weights as [d_in, d_out]
    let weight = layer.weight.val().dims();
    if weight != [d_in, d_out] {
        bail!("Parameter '{name}.weight' has shape {weight:?}, expected [{d_in}, {d_out}]");
    }
    if let Some(bias) = &layer.bias {
        let bias = bias.val().dims();
        if bias != [d_out] {
            bail!("Parameter '{name}.bias' has shape {bias:?}, expected [{d_out}]");
        }
    }
    Ok(())
}

fn check_norm<B: Backend>(norm: &BatchNorm<B, 0>, features: usize, name: &str) -> Result<()> {
    let shapes = [
        ("weight",       norm.gamma.val().dims()),
        ("bias",         norm.beta.val().dims()),
        ("running_mean", norm.running_mean.value().dims()),
        ("running_var",  norm.running_var.value().dims()),
    ];
    for (param, dims) in shapes {
        if dims != [features] {
            bail!("Parameter '{name}.{param}' has shape {dims:?}, expected [{features}]");
        }
    }
    Ok(())
}
