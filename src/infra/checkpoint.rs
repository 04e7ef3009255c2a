// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores the linear model's weights from one of two formats:
//
//   1. PyTorch checkpoint (.pth / .pt / .tar / anything else)
//      A pickled dict whose "state_dict" entry holds the weights.
//      Read with burn-import's PyTorchFileRecorder, which also
//      transposes linear weights and renames batch-norm
//      weight/bias to gamma/beta.
//
//   2. Native checkpoint (model.mpk, or a gzipped model.mpk.gz)
//      Burn's named MessagePack record at full precision,
//      written by `convert`.
//
// Architecture:
//   If model_config.json sits next to the checkpoint it wins
//   over the architecture flags given on the command line.
//
// File layout written by `convert`:
//   <out_dir>/
//     model.mpk           ← weights
//     model_config.json   ← LinearModelConfig
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Burn Book, "Importing PyTorch models"

use anyhow::{anyhow, bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, NamedMpkGzFileRecorder, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::ml::model::{LinearModel, LinearModelConfig, LinearModelRecord};

const NATIVE_SUFFIX: &str = ".mpk";
const GZ_SUFFIX:     &str = ".mpk.gz";
const CONFIG_FILE:   &str = "model_config.json";
const NATIVE_STEM:   &str = "model";

/// Checkpoints saved from a data-parallel wrapper prefix every key with "module."
const DATA_PARALLEL_PREFIX: (&str, &str) = (r"^module\.(.+)$", "$1");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    PyTorch,
    Native,
    NativeGz,
}

/// Loads (and for `convert`, writes) linear model checkpoints.
pub struct CheckpointManager {
    path:           PathBuf,
    /// Entry of the pickled dict that holds the weights; None means
    /// the file is the state dict itself
    state_dict_key: Option<String>,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>, state_dict_key: Option<String>) -> Self {
        Self { path: path.into(), state_dict_key }
    }

    pub fn kind(&self) -> CheckpointKind {
        let name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(GZ_SUFFIX) {
            CheckpointKind::NativeGz
        } else if name.ends_with(NATIVE_SUFFIX) {
            CheckpointKind::Native
        } else {
            CheckpointKind::PyTorch
        }
    }

    /// Architecture to build before loading weights.
    ///
    /// Uses the sibling model_config.json when present, `fallback` otherwise.
    pub fn resolve_config(&self, fallback: LinearModelConfig) -> Result<LinearModelConfig> {
        let dir  = self.path.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(fallback);
        }

        let config = LinearModelConfig::load(&path)
            .map_err(|e| anyhow!("Cannot read model config '{}': {e:?}", path.display()))?;
        tracing::info!("Using architecture from '{}'", path.display());
        Ok(config)
    }

    /// Build the model described by `config` and fill it with the
    /// checkpoint's weights.
    ///
    /// Fails if the file is missing, cannot be decoded, or any stored
    /// parameter disagrees with `config`.
    pub fn load_model<B: Backend>(
        &self,
        config: &LinearModelConfig,
        device: &B::Device,
    ) -> Result<LinearModel<B>> {
        if !self.path.is_file() {
            bail!("Checkpoint '{}' is not found", self.path.display());
        }

        let record = match self.kind() {
            CheckpointKind::PyTorch => self.load_pytorch_record::<B>(device)?,
            CheckpointKind::Native | CheckpointKind::NativeGz => self.load_native_record::<B>(device)?,
        };

        // Vec::load_record asserts equal lengths, so compare before loading
        if record.linear_stages.len() != config.num_stage {
            bail!(
                "Checkpoint '{}' has {} residual stages, expected {}",
                self.path.display(), record.linear_stages.len(), config.num_stage
            );
        }

        let model = config.init::<B>(device).load_record(record);
        model.check_shapes(config)
            .with_context(|| format!("Checkpoint '{}' does not match the model", self.path.display()))?;

        tracing::info!(
            "Loaded {:?} checkpoint '{}' ({} stages, width {})",
            self.kind(), self.path.display(), config.num_stage, config.linear_size
        );
        Ok(model)
    }

    fn load_pytorch_record<B: Backend>(&self, device: &B::Device) -> Result<LinearModelRecord<B>> {
        let (pattern, replacement) = DATA_PARALLEL_PREFIX;
        let mut args = LoadArgs::new(self.path.clone()).with_key_remap(pattern, replacement);
        if let Some(key) = &self.state_dict_key {
            args = args.with_top_level_key(key);
        }

        PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(args, device)
            .map_err(|e| anyhow!("Cannot load PyTorch checkpoint '{}': {e:?}", self.path.display()))
    }

    fn load_native_record<B: Backend>(&self, device: &B::Device) -> Result<LinearModelRecord<B>> {
        // The recorder appends its own extension
        let base = native_base(&self.path);
        let record = match self.kind() {
            CheckpointKind::NativeGz => NamedMpkGzFileRecorder::<FullPrecisionSettings>::new().load(base, device),
            _                        => NamedMpkFileRecorder::<FullPrecisionSettings>::new().load(base, device),
        };
        record.map_err(|e| anyhow!("Cannot load checkpoint '{}': {e:?}", self.path.display()))
    }

    /// Write `model` as a native checkpoint plus its config into `dir`.
    /// Returns the path of the weights file.
    pub fn save_native<B: Backend>(
        model:  &LinearModel<B>,
        config: &LinearModelConfig,
        dir:    &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create directory '{}'", dir.display()))?;

        let base = dir.join(NATIVE_STEM);
        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), base.clone())
            .map_err(|e| anyhow!("Failed to save checkpoint to '{}': {e:?}", base.display()))?;

        let config_path = dir.join(CONFIG_FILE);
        config.save(&config_path)
            .with_context(|| format!("Cannot write config to '{}'", config_path.display()))?;

        let weights = dir.join(format!("{NATIVE_STEM}{NATIVE_SUFFIX}"));
        tracing::debug!("Saved native checkpoint '{}'", weights.display());
        Ok(weights)
    }
}

fn native_base(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let stem = name
        .strip_suffix(GZ_SUFFIX)
        .or_else(|| name.strip_suffix(NATIVE_SUFFIX))
        .unwrap_or(name);
    path.with_file_name(stem)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> LinearModelConfig {
        LinearModelConfig::new().with_linear_size(8).with_num_stage(1)
    }

    #[test]
    fn test_kind_follows_extension() {
        assert_eq!(CheckpointManager::new("ckpt_best.pth.tar", None).kind(), CheckpointKind::PyTorch);
        assert_eq!(CheckpointManager::new("out/model.mpk", None).kind(),     CheckpointKind::Native);
        assert_eq!(CheckpointManager::new("out/model.mpk.gz", None).kind(),  CheckpointKind::NativeGz);
    }

    #[test]
    fn test_native_base_strips_suffix() {
        assert_eq!(native_base(Path::new("out/model.mpk")),    PathBuf::from("out/model"));
        assert_eq!(native_base(Path::new("out/model.mpk.gz")), PathBuf::from("out/model"));
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("nothing.pth"), Some("state_dict".into()));
        let err  = ckpt.load_model::<TestBackend>(&small_config(), &Default::default()).unwrap_err();
        assert!(err.to_string().contains("is not found"));
    }

    #[test]
    fn test_native_checkpoint_loads_back() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);

        let weights = CheckpointManager::save_native(&model, &cfg, dir.path()).unwrap();
        assert!(weights.is_file());
        assert!(dir.path().join(CONFIG_FILE).is_file());

        let ckpt   = CheckpointManager::new(&weights, None);
        let loaded = ckpt.load_model::<TestBackend>(&cfg, &device).unwrap();
        assert_eq!(loaded.linear_stages.len(), 1);
    }

    #[test]
    fn test_sibling_config_overrides_fallback() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);
        let weights = CheckpointManager::save_native(&model, &cfg, dir.path()).unwrap();

        let resolved = CheckpointManager::new(&weights, None)
            .resolve_config(LinearModelConfig::new())
            .unwrap();
        assert_eq!(resolved.linear_size, 8);
        assert_eq!(resolved.num_stage,   1);
    }

    #[test]
    fn test_rejects_mismatched_width() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);
        let weights = CheckpointManager::save_native(&model, &cfg, dir.path()).unwrap();

        let wider = small_config().with_linear_size(16);
        let err   = CheckpointManager::new(&weights, None)
            .load_model::<TestBackend>(&wider, &device)
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_rejects_mismatched_stage_count() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);
        let weights = CheckpointManager::save_native(&model, &cfg, dir.path()).unwrap();

        let deeper = small_config().with_num_stage(3);
        let err    = CheckpointManager::new(&weights, None)
            .load_model::<TestBackend>(&deeper, &device)
            .unwrap_err();
        assert!(err.to_string().contains("has 1 residual stages, expected 3"));
    }

    #[test]
    fn test_native_round_trip_keeps_outputs_exact() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);
        let input  = || Tensor::<TestBackend, 2>::from_floats([[0.37_f32; 32]], &device);
        let before = model.forward(input()).into_data().to_vec::<f32>().unwrap();

        let weights = CheckpointManager::save_native(&model, &cfg, dir.path()).unwrap();
        assert!(weights.ends_with("model.mpk"));

        let loaded = CheckpointManager::new(&weights, None).load_model::<TestBackend>(&cfg, &device).unwrap();
        let after  = loaded.forward(input()).into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_gzipped_native_checkpoint_loads() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = small_config();
        let model: LinearModel<TestBackend> = cfg.init(&device);
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), dir.path().join("model"))
            .unwrap();

        let weights = dir.path().join("model.mpk.gz");
        assert!(weights.is_file());
        let loaded = CheckpointManager::new(&weights, None).load_model::<TestBackend>(&cfg, &device).unwrap();
        assert_eq!(
            loaded.w2.weight.val().into_data().to_vec::<f32>().unwrap(),
            model.w2.weight.val().into_data().to_vec::<f32>().unwrap()
        );
    }

    // ─── PyTorch checkpoints (tests/fixtures, see make_fixtures.py) ──────────

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    /// Architecture the fixtures were written for
    fn fixture_config() -> LinearModelConfig {
        LinearModelConfig::new().with_num_joints(1).with_linear_size(4).with_num_stage(1)
    }

    fn lift(model: &LinearModel<TestBackend>, frame: [f32; 2]) -> Vec<f32> {
        let input = Tensor::<TestBackend, 2>::from_floats([frame], &Default::default());
        model.forward(input).into_data().to_vec::<f32>().unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4, "got {actual:?}, expected {expected:?}");
        }
    }

    #[test]
    fn test_pytorch_checkpoint_matches_reference_outputs() {
        let ckpt  = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("state_dict".into()));
        assert_eq!(ckpt.kind(), CheckpointKind::PyTorch);
        let model = ckpt.load_model::<TestBackend>(&fixture_config(), &Default::default()).unwrap();

        assert_close(&lift(&model, [0.5, -1.0]), &[0.368914, 0.090342, 0.015638]);
        assert_close(&lift(&model, [0.0, 0.0]),  &[0.297456, 0.070532, -0.073049]);
    }

    #[test]
    fn test_pytorch_linear_weights_are_transposed() {
        let ckpt  = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("state_dict".into()));
        let model = ckpt.load_model::<TestBackend>(&fixture_config(), &Default::default()).unwrap();

        // Stored [out=4, in=2] in the file, [in=2, out=4] in burn
        assert_eq!(model.w1.weight.dims(), [2, 4]);
        let w1 = model.w1.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_close(&w1[..4], &[-0.4, -0.1, 0.2, 0.5]);

        let gamma = model.batch_norm1.gamma.val().into_data().to_vec::<f32>().unwrap();
        assert_close(&gamma, &[1.2, 1.0, 1.1, 1.2]);
    }

    #[test]
    fn test_pytorch_data_parallel_prefix_is_stripped() {
        let plain   = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("state_dict".into()));
        let wrapped = CheckpointManager::new(fixture("tiny_data_parallel.pth.tar"), Some("state_dict".into()));
        let device  = Default::default();

        let a = plain.load_model::<TestBackend>(&fixture_config(), &device).unwrap();
        let b = wrapped.load_model::<TestBackend>(&fixture_config(), &device).unwrap();
        assert_eq!(lift(&a, [0.5, -1.0]), lift(&b, [0.5, -1.0]));
    }

    #[test]
    fn test_pytorch_bare_state_dict_loads_without_key() {
        let ckpt  = CheckpointManager::new(fixture("tiny_state_dict.pth"), None);
        let model = ckpt.load_model::<TestBackend>(&fixture_config(), &Default::default()).unwrap();
        assert_close(&lift(&model, [0.5, -1.0]), &[0.368914, 0.090342, 0.015638]);
    }

    #[test]
    fn test_pytorch_checkpoint_rejects_wrong_width() {
        let ckpt = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("state_dict".into()));
        let err  = ckpt
            .load_model::<TestBackend>(&fixture_config().with_linear_size(8), &Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("'w1.weight' has shape"));
    }

    #[test]
    fn test_pytorch_checkpoint_rejects_wrong_stage_count() {
        let ckpt = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("state_dict".into()));
        let err  = ckpt
            .load_model::<TestBackend>(&fixture_config().with_num_stage(2), &Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("residual stages"));
    }

    #[test]
    fn test_pytorch_missing_state_dict_key_is_error() {
        let ckpt = CheckpointManager::new(fixture("tiny_ckpt.pth.tar"), Some("model".into()));
        assert!(ckpt.load_model::<TestBackend>(&fixture_config(), &Default::default()).is_err());
    }
}
