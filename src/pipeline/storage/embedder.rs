use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::EmbeddingModel;
use super::StorageError;

/// Output dimension of all-MiniLM-L6-v2, the default embedding model.
pub const EMBEDDING_DIM: usize = 384;

/// Texts per `/api/embed` request.
const OLLAMA_EMBED_BATCH: usize = 32;

// ──────────────────────────────────────────────
// Ollama embedder
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from a local Ollama server (`POST /api/embed`).
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::ModelInit(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension: EMBEDDING_DIM,
            client,
        })
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    StorageError::EmbeddingConnection(self.base_url.clone())
                } else {
                    StorageError::Embedding(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::Embedding(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| StorageError::Embedding(format!("Invalid embed response: {e}")))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(StorageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        self.request(&[text])?
            .pop()
            .ok_or_else(|| StorageError::Embedding("Empty embed response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(OLLAMA_EMBED_BATCH) {
            all.extend(self.request(batch)?);
        }
        Ok(all)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ──────────────────────────────────────────────
// ONNX embedder, behind `onnx-embeddings`
// ──────────────────────────────────────────────

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;

    use super::{EmbeddingModel, StorageError, EMBEDDING_DIM};

    /// all-MiniLM-L6-v2 run in-process with ONNX Runtime.
    ///
    /// `model_dir` must contain `model.onnx` and `tokenizer.json`.
    /// The session sits behind a Mutex since `Session::run` takes `&mut self`.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, StorageError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            for path in [&model_path, &tokenizer_path] {
                if !path.exists() {
                    return Err(StorageError::ModelNotFound(path.clone()));
                }
            }

            let session = Session::builder()
                .and_then(|b| b.with_intra_threads(2))
                .and_then(|b| b.commit_from_file(&model_path))
                .map_err(|e: ort::Error| StorageError::ModelInit(format!("ONNX load failed: {e}")))?;

            let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer load failed: {e}")))?;

            tracing::info!(dir = %model_dir.display(), "ONNX embedder loaded");
            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        fn infer(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            use ort::value::TensorRef;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| StorageError::Tokenization(e.to_string()))?;

            let widen = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<i64>>();
            let input_ids = widen(encoding.get_ids());
            let attention_mask = widen(encoding.get_attention_mask());
            let token_type_ids = widen(encoding.get_type_ids());
            let seq_len = input_ids.len();

            let to_array = |values: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), values)
                    .map_err(|e| StorageError::Embedding(e.to_string()))
            };
            let ids_array = to_array(input_ids)?;
            let mask_array = to_array(attention_mask.clone())?;
            let type_array = to_array(token_type_ids)?;

            let tensor_err = |e: ort::Error| StorageError::Embedding(e.to_string());
            let ids_tensor = TensorRef::from_array_view(&ids_array).map_err(tensor_err)?;
            let mask_tensor = TensorRef::from_array_view(&mask_array).map_err(tensor_err)?;
            let type_tensor = TensorRef::from_array_view(&type_array).map_err(tensor_err)?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| StorageError::Embedding("Session lock poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| StorageError::Embedding(format!("ONNX inference failed: {e}")))?;

            let (shape, hidden) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| StorageError::Embedding(format!("Output extraction: {e}")))?;
            if shape.len() != 3 || shape[2] as usize != EMBEDDING_DIM {
                return Err(StorageError::Embedding(format!(
                    "Unexpected output shape: {shape:?}, expected [1, {seq_len}, {EMBEDDING_DIM}]"
                )));
            }

            let mut pooled = mean_pool(hidden, &attention_mask);
            super::l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    /// Attention-masked mean over the token axis of a `[1, seq, dim]` output.
    fn mean_pool(hidden: &[f32], attention_mask: &[i64]) -> Vec<f32> {
        let mut pooled = vec![0.0f32; EMBEDDING_DIM];
        let mut mask_sum = 0.0f32;
        for (token_idx, &mask) in attention_mask.iter().enumerate() {
            let mask = mask as f32;
            mask_sum += mask;
            let offset = token_idx * EMBEDDING_DIM;
            for (dim_idx, p) in pooled.iter_mut().enumerate() {
                *p += hidden[offset + dim_idx] * mask;
            }
        }
        if mask_sum > 0.0 {
            pooled.iter_mut().for_each(|v| *v /= mask_sum);
        }
        pooled
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            self.infer(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            texts.iter().map(|t| self.infer(t)).collect()
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }

        fn model_name(&self) -> &str {
            "all-MiniLM-L6-v2 (onnx)"
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

// ──────────────────────────────────────────────
// Mock embedder
// ──────────────────────────────────────────────

/// Deterministic embedder for tests.
///
/// Texts sharing words get similar vectors: each lower-cased word is hashed
/// into a bucket, so retrieval tests can rely on lexical overlap.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(deterministic_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts
            .iter()
            .map(|t| deterministic_vector(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        vec[hash as usize % dim] += 1.0;
    }
    if vec.iter().all(|v| *v == 0.0) {
        vec[0] = 1.0;
    }
    l2_normalize(&mut vec);
    vec
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vec.iter_mut().for_each(|v| *v /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn mock_embed_returns_correct_dimension() {
        let embedder = MockEmbedder::new();
        assert_eq!(embedder.embed("Hello world").unwrap().len(), EMBEDDING_DIM);
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn mock_embed_batch_returns_correct_count() {
        let embedder = MockEmbedder::new();
        let vecs = embedder
            .embed_batch(&["text one", "text two", "text three"])
            .unwrap();
        assert_eq!(vecs.len(), 3);
        assert!(vecs.iter().all(|v| v.len() == EMBEDDING_DIM));
    }

    #[test]
    fn mock_embed_is_deterministic_and_normalized() {
        let embedder = MockEmbedder::new();
        let v1 = embedder.embed("same text").unwrap();
        let v2 = embedder.embed("same text").unwrap();
        assert_eq!(v1, v2);

        let norm = dot(&v1, &v1).sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm = {norm}");
    }

    #[test]
    fn shared_words_score_higher() {
        let embedder = MockEmbedder::new();
        let query = embedder.embed("What is the hemoglobin level?").unwrap();
        let related = embedder.embed("Hemoglobin level 10.2 g/dL").unwrap();
        let unrelated = embedder.embed("Chest x-ray shows clear lungs").unwrap();
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn empty_text_still_embeds() {
        let embedder = MockEmbedder::new();
        let vec = embedder.embed("").unwrap();
        assert_eq!(vec.len(), EMBEDDING_DIM);
        assert!((dot(&vec, &vec) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ollama_embedder_unreachable_is_connection_error() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "all-minilm", 2).unwrap();
        let err = embedder.embed("anything").unwrap_err();
        assert!(
            matches!(err, StorageError::EmbeddingConnection(_)),
            "got {err:?}"
        );
    }
}
