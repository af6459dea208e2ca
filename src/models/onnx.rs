//! ONNX classifier backed by ONNX Runtime

use crate::error::ModelError;
use crate::models::Classifier;
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier exported to ONNX (e.g. a converted random forest).
///
/// The session needs exclusive access to run, so it sits behind a mutex
/// held for one inference call.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    label_output: Option<String>,
    proba_output: Option<String>,
}

impl OnnxClassifier {
    /// Load an ONNX model from file
    pub fn load<P: AsRef<Path>>(path: P, name: &str, threads: usize) -> Result<Self> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && proba_output.is_none() {
            bail!(
                "model {:?} exposes neither a label nor a probability output",
                path
            );
        }

        info!(
            model = %name,
            input = %input_name,
            label = ?label_output,
            probabilities = ?proba_output,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
        })
    }

    fn run(&self, features: &[f64]) -> Result<i64> {
        // Input tensor of shape [1, num_features]
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, row.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, row)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        self.extract_class(&outputs)
    }

    /// Read the predicted class, preferring the label output.
    fn extract_class(&self, outputs: &SessionOutputs) -> Result<i64> {
        if let Some(output) = self.label_output.as_deref().and_then(|n| outputs.get(n)) {
            if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                if let Some(&label) = labels.first() {
                    debug!(model = %self.name, label = label, "Extracted label tensor");
                    return Ok(label);
                }
            }
        }

        let output = self
            .proba_output
            .as_deref()
            .and_then(|n| outputs.get(n))
            .ok_or_else(|| anyhow!("model produced no usable output"))?;

        // [1, n_classes] probability tensor
        if let Ok((shape, proba)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let class = class_from_probabilities(&dims, proba)?;
            debug!(model = %self.name, class = class, "Extracted from probability tensor");
            return Ok(class);
        }

        // seq(map(int64, float)) as produced with zipmap enabled
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.extract_from_sequence_map(output);
        }

        Err(anyhow!("unsupported probability output type"))
    }

    /// Arg-max class of the first map in a `seq(map(int64, float))` output
    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<i64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps
            .first()
            .ok_or_else(|| anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        let (class_id, prob) = argmax_class(kv_pairs)
            .ok_or_else(|| anyhow!("probability map holds no finite value"))?;

        debug!(model = %self.name, class = class_id, prob = prob, "Extracted from seq(map)");
        Ok(class_id)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        self.run(features)
            .map_err(|e| ModelError::Inference(format!("{:#}", e)))
    }
}

/// Class index of a single-row probability tensor, `[1, n_classes]` or
/// `[n_classes]`. Column `i` is taken to be class label `i`.
fn class_from_probabilities(dims: &[i64], proba: &[f32]) -> Result<i64> {
    let n_classes = match dims {
        [1, n] | [n] => *n,
        _ => bail!("expected a single-row probability tensor, got shape {:?}", dims),
    };
    if n_classes < 2 || proba.len() as i64 != n_classes {
        bail!(
            "probability tensor of shape {:?} holds {} values",
            dims,
            proba.len()
        );
    }

    argmax_class(proba.iter().enumerate().map(|(i, &p)| (i as i64, p)))
        .map(|(class, _)| class)
        .ok_or_else(|| anyhow!("probability tensor holds no finite value"))
}

/// Highest finite `(class, probability)` pair; the first class wins ties.
fn argmax_class(scores: impl IntoIterator<Item = (i64, f32)>) -> Option<(i64, f32)> {
    scores
        .into_iter()
        .filter(|(_, p)| p.is_finite())
        .fold(None, |best, (k, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((k, p)),
        })
}
