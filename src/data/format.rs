use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// On-disk encoding for pose datasets and predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PoseFormat {
    /// Named tensors, one per sample key
    #[default]
    Safetensors,
    /// Nested number arrays keyed by sample
    Json,
}

impl PoseFormat {
    /// `.json` files are JSON, anything else is read as safetensors.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => PoseFormat::Json,
            _ => PoseFormat::Safetensors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_json_extension() {
        assert_eq!(PoseFormat::from_path(Path::new("poses.json")), PoseFormat::Json);
        assert_eq!(PoseFormat::from_path(Path::new("poses.JSON")), PoseFormat::Json);
    }

    #[test]
    fn test_defaults_to_safetensors() {
        assert_eq!(PoseFormat::from_path(Path::new("poses.safetensors")), PoseFormat::Safetensors);
        assert_eq!(PoseFormat::from_path(Path::new("out/3dposes")), PoseFormat::Safetensors);
    }
}
