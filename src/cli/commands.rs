// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `run` and `convert`
// and all their configurable flags.
//
// Defaults mirror the pretrained model: 16 joints, width 1024,
// two residual stages, weights under "state_dict".

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::convert_use_case::ConvertConfig;
use crate::application::lift_use_case::{InferenceDevice, RunConfig};
use crate::data::format::PoseFormat;
use crate::ml::model::LinearModelConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lift a dataset of 2D poses to 3D with a pretrained checkpoint
    Run(RunArgs),

    /// Convert a PyTorch checkpoint into a native Burn checkpoint
    Convert(ConvertArgs),
}

/// Architecture flags shared by both commands.
/// A model_config.json next to the checkpoint takes precedence.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Width of each hidden layer
    #[arg(long, default_value_t = 1024)]
    pub linear_size: usize,

    /// Number of residual blocks in the model
    #[arg(long, default_value_t = 2)]
    pub num_stage: usize,

    /// Number of joints per pose
    #[arg(long, default_value_t = 16)]
    pub num_joints: usize,

    /// Dict entry holding the weights in a PyTorch checkpoint;
    /// pass an empty string if the file is the state dict itself
    #[arg(long, default_value = "state_dict")]
    pub state_dict_key: String,
}

impl ModelArgs {
    fn model_config(&self) -> LinearModelConfig {
        LinearModelConfig::new()
            .with_linear_size(self.linear_size)
            .with_num_stage(self.num_stage)
            .with_num_joints(self.num_joints)
    }

    fn state_dict_key(&self) -> Option<String> {
        Some(self.state_dict_key.clone()).filter(|k| !k.is_empty())
    }
}

/// All arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Checkpoint to load (.pth / .tar from PyTorch, or model.mpk / model.mpk.gz)
    #[arg(long)]
    pub load: PathBuf,

    /// Dataset of 2D poses (.safetensors, or .json)
    #[arg(long, default_value = "data/2d3d_h36m")]
    pub data_dir: PathBuf,

    /// Directory that receives the 3dposes file
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Treat every entry as a video: [frames, joints, 2]
    #[arg(long)]
    pub process_as_video: bool,

    /// Encoding of the 3dposes file
    #[arg(long, value_enum, default_value_t = PoseFormat::Safetensors)]
    pub format: PoseFormat,

    /// Backend to run the model on
    #[arg(long, value_enum, default_value_t = InferenceDevice::Wgpu)]
    pub device: InferenceDevice,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Convert CLI RunArgs into the application-layer RunConfig.
impl From<RunArgs> for RunConfig {
    fn from(a: RunArgs) -> Self {
        RunConfig {
            load:             a.load,
            data_dir:         a.data_dir,
            output_dir:       a.output_dir,
            process_as_video: a.process_as_video,
            format:           a.format,
            device:           a.device,
            state_dict_key:   a.model.state_dict_key(),
            model:            a.model.model_config(),
        }
    }
}

/// All arguments for the `convert` command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// PyTorch checkpoint to import
    #[arg(long)]
    pub load: PathBuf,

    /// Directory that receives model.mpk and model_config.json
    #[arg(long, default_value = "checkpoint")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<ConvertArgs> for ConvertConfig {
    fn from(a: ConvertArgs) -> Self {
        ConvertConfig {
            load:           a.load,
            out_dir:        a.out_dir,
            state_dict_key: a.model.state_dict_key(),
            model:          a.model.model_config(),
        }
    }
}
