// ============================================================
// Layer 4 — Pose Codec
// ============================================================
// Converts between pose maps and bytes.
//
// safetensors:
//   one named tensor per sample key, little-endian f32.
//   Video predictions are stacked to [T, joints, 3] and the
//   header metadata records process_as_video = "true".
//
// JSON:
//   { "key": [[x, y], ...] } — nested arrays, must be
//   rectangular. Video predictions are a list of frames.

use anyhow::{bail, Context, Result};
use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};

use crate::data::format::PoseFormat;
use crate::domain::pose::{Pose3d, PoseArray, PoseDataset, PosePredictions};

const VIDEO_METADATA_KEY: &str = "process_as_video";

/// Frame shape used when a video prediction has no frames to copy it from.
const EMPTY_FRAME_SHAPE: [usize; 2] = [0, 3];

// ─── Datasets ─────────────────────────────────────────────────────────────────

pub fn decode_dataset(bytes: &[u8], format: PoseFormat) -> Result<PoseDataset> {
    match format {
        PoseFormat::Safetensors => decode_safetensors(bytes).map(|(arrays, _)| arrays),
        PoseFormat::Json        => decode_json(bytes),
    }
}

/// Encode plain arrays (no prediction semantics attached).
#[cfg(test)]
pub fn encode_arrays(arrays: &BTreeMap<String, PoseArray>, format: PoseFormat) -> Result<Vec<u8>> {
    match format {
        PoseFormat::Safetensors => encode_safetensors(arrays, None),
        PoseFormat::Json => {
            let mut object = Map::new();
            for (key, array) in arrays {
                object.insert(key.clone(), array_to_json(array)?);
            }
            Ok(serde_json::to_vec(&Value::Object(object))?)
        }
    }
}

// ─── Predictions ──────────────────────────────────────────────────────────────

pub fn encode_predictions(predictions: &PosePredictions, format: PoseFormat) -> Result<Vec<u8>> {
    match format {
        PoseFormat::Safetensors => {
            let is_video = predictions.values().any(|p| matches!(p, Pose3d::Sequence(_)));
            let mut arrays = BTreeMap::new();
            for (key, prediction) in predictions {
                let array = match prediction {
                    Pose3d::Frame(frame)     => frame.clone(),
                    Pose3d::Sequence(frames) => PoseArray::stack(frames, &EMPTY_FRAME_SHAPE)
                        .with_context(|| format!("Cannot stack frames of '{key}'"))?,
                };
                arrays.insert(key.clone(), array);
            }
            let metadata = HashMap::from([(VIDEO_METADATA_KEY.to_string(), is_video.to_string())]);
            encode_safetensors(&arrays, Some(metadata))
        }
        PoseFormat::Json => {
            let mut object = Map::new();
            for (key, prediction) in predictions {
                let value = match prediction {
                    Pose3d::Frame(frame) => array_to_json(frame)?,
                    Pose3d::Sequence(frames) => Value::Array(
                        frames.iter().map(array_to_json).collect::<Result<_>>()?,
                    ),
                };
                object.insert(key.clone(), value);
            }
            Ok(serde_json::to_vec(&Value::Object(object))?)
        }
    }
}

/// Read back a predictions file written by `encode_predictions`.
#[cfg(test)]
pub fn decode_predictions(bytes: &[u8], format: PoseFormat) -> Result<PosePredictions> {
    let (arrays, is_video) = match format {
        PoseFormat::Safetensors => {
            let (arrays, metadata) = decode_safetensors(bytes)?;
            let is_video = metadata
                .and_then(|m| m.get(VIDEO_METADATA_KEY).cloned())
                .is_some_and(|v| v == "true");
            (arrays, Some(is_video))
        }
        // JSON carries no header, so a rank-3 (or empty) array means video
        PoseFormat::Json => (decode_json(bytes)?, None),
    };

    let mut predictions = PosePredictions::new();
    for (key, array) in arrays {
        let is_video = is_video.unwrap_or(array.shape().len() >= 3 || array.values().is_empty());
        let prediction = if is_video {
            Pose3d::Sequence(array.frames()?)
        } else {
            Pose3d::Frame(array)
        };
        predictions.insert(key, prediction);
    }
    Ok(predictions)
}

// ─── safetensors ──────────────────────────────────────────────────────────────

fn decode_safetensors(
    bytes: &[u8],
) -> Result<(BTreeMap<String, PoseArray>, Option<HashMap<String, String>>)> {
    let tensors = SafeTensors::deserialize(bytes)
        .context("Malformed safetensors data")?;
    let (_, header) = SafeTensors::read_metadata(bytes)
        .context("Malformed safetensors header")?;

    let mut arrays = BTreeMap::new();
    for (key, view) in tensors.tensors() {
        let values: Vec<f32> = match view.dtype() {
            Dtype::F32 => view.data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            Dtype::F64 => view.data()
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
                .collect(),
            other => bail!("Tensor '{key}' has unsupported dtype {other:?}; expected F32 or F64"),
        };
        let array = PoseArray::new(view.shape().to_vec(), values)
            .with_context(|| format!("Tensor '{key}' is inconsistent"))?;
        arrays.insert(key, array);
    }

    Ok((arrays, header.metadata().clone()))
}

fn encode_safetensors(
    arrays:   &BTreeMap<String, PoseArray>,
    metadata: Option<HashMap<String, String>>,
) -> Result<Vec<u8>> {
    let buffers: Vec<(&String, &[usize], Vec<u8>)> = arrays
        .iter()
        .map(|(key, array)| {
            let bytes = array.values().iter().flat_map(|v| v.to_le_bytes()).collect();
            (key, array.shape(), bytes)
        })
        .collect();

    let mut views = Vec::with_capacity(buffers.len());
    for (key, shape, bytes) in &buffers {
        let view = TensorView::new(Dtype::F32, shape.to_vec(), bytes)
            .with_context(|| format!("Cannot build tensor view for '{key}'"))?;
        views.push((key.as_str(), view));
    }

    Ok(safetensors::serialize(views, &metadata)?)
}

// ─── JSON ─────────────────────────────────────────────────────────────────────

fn decode_json(bytes: &[u8]) -> Result<BTreeMap<String, PoseArray>> {
    let root: Value = serde_json::from_slice(bytes).context("Malformed JSON pose data")?;
    let Value::Object(entries) = root else {
        bail!("Pose JSON must be an object mapping keys to arrays");
    };

    let mut arrays = BTreeMap::new();
    for (key, value) in entries {
        let array = array_from_json(&value)
            .with_context(|| format!("Invalid array for key '{key}'"))?;
        arrays.insert(key, array);
    }
    Ok(arrays)
}

fn array_from_json(value: &Value) -> Result<PoseArray> {
    // Shape comes from the first element at each depth; flatten() checks the rest
    let mut shape = Vec::new();
    let mut cursor = value;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None        => break,
        }
    }

    let mut values = Vec::with_capacity(shape.iter().product());
    flatten(value, &shape, 0, &mut values)?;
    PoseArray::new(shape, values)
}

fn flatten(value: &Value, shape: &[usize], depth: usize, out: &mut Vec<f32>) -> Result<()> {
    match value {
        Value::Number(n) if depth == shape.len() => {
            let Some(v) = n.as_f64() else { bail!("Number {n} is not representable") };
            out.push(v as f32);
        }
        Value::Array(items) if depth < shape.len() && items.len() == shape[depth] => {
            for item in items {
                flatten(item, shape, depth + 1, out)?;
            }
        }
        Value::Array(_) | Value::Number(_) => bail!("Array is ragged at depth {depth}"),
        other => bail!("Expected a number or array, found {other}"),
    }
    Ok(())
}

fn array_to_json(array: &PoseArray) -> Result<Value> {
    build_json(array.values(), array.shape())
}

fn build_json(values: &[f32], shape: &[usize]) -> Result<Value> {
    let Some((&count, rest)) = shape.split_first() else {
        let v = values.first().copied().unwrap_or_default();
        return Number::from_f64(v as f64)
            .map(Value::Number)
            .with_context(|| format!("Cannot encode non-finite value {v} as JSON"));
    };

    let chunk: usize = rest.iter().product();
    let items = (0..count)
        .map(|i| build_json(&values[i * chunk..(i + 1) * chunk], rest))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(items))
}
