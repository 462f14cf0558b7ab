//! Sentence embedders for catalogue queries.
//!
//! `MiniLmEmbedder` runs a BERT-family sentence encoder (all-MiniLM-L6-v2 by
//! default) through candle with mean pooling and L2 normalisation, producing
//! the same vectors the catalogue index was built with. `FakeEmbedder` is a
//! deterministic hashing embedder for tests and offline development; set
//! `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.use_fake = true` to select it.

pub mod device;
pub mod pool;
pub mod tokenize;

use anyhow::{Result, anyhow};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

use shinseina_core::config::EmbeddingSettings;
use shinseina_core::traits::Embedder;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl MiniLmEmbedder {
    /// Load tokenizer, config and weights from `model_dir`.
    ///
    /// Weights are read from `model.safetensors` when present, otherwise from
    /// `pytorch_model.bin`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!("Loading sentence encoder from {}", model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw.get("hidden_size").and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            debug!("Memory-mapping {}", safetensors.display());
            // SAFETY: the weights file is opened read-only and not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            debug!("Reading {}", weights_path.display());
            let weights = candle_core::pickle::read_all(&weights_path)?;
            let weights_map: std::collections::HashMap<String, candle_core::Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DType::F32, &device)
        };
        let model = BertModel::load(vb, &config)?;
        info!("Sentence encoder loaded (dim={})", dim);
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("dim mismatch: got {} expected {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { warn!("Slow embedding ({} ms)", start.elapsed().as_millis()); }
        Ok(emb)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Hashes whitespace tokens into buckets; deterministic and L2-normalised.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } } }

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Build the configured embedder. `model_dir` is the already-resolved model
/// directory; `APP_MODEL_DIR` overrides it when set.
pub fn get_default_embedder(settings: &EmbeddingSettings, model_dir: &Path) -> Result<Box<dyn Embedder>> {
    if settings.use_fake || use_fake_embeddings() {
        info!("Using FakeEmbedder (dim={})", settings.dimension);
        return Ok(Box::new(FakeEmbedder::new(settings.dimension)));
    }
    let dir = resolve_model_dir(model_dir)?;
    let embedder = MiniLmEmbedder::load(&dir, settings.max_len)?;
    if embedder.dim() != settings.dimension {
        return Err(anyhow!("model at {} has dim {} but embedding.dimension is {}", dir.display(), embedder.dim(), settings.dimension));
    }
    Ok(Box::new(embedder))
}

fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { info!("Using APP_MODEL_DIR: {}", p.display()); return Ok(p); } }
    if configured.exists() { return Ok(configured.to_path_buf()); }
    Err(anyhow!("Could not locate sentence encoder directory at {}", configured.display()))
}
