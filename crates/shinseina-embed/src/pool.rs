use anyhow::{Result, anyhow};
use candle_core::{DType, Tensor};

/// Mean over unmasked tokens followed by L2 normalisation.
///
/// `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]` (any numeric dtype).
/// Returns `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    if dims.len() != 3 { return Err(anyhow!("hidden shape must be [B,T,H], got {:?}", dims)); }
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_broadcast = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    let lengths = mask.sum_keepdim(1)?.clamp(1e-9, f64::MAX)?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps = match hidden.dtype() { DType::F16 => 1e-6f64, _ => 1e-12f64 };
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(eps, f64::MAX)?;
    let normalized = mean.broadcast_div(&norm)?;
    if normalized.dims() != &[batch, hidden_dim] {
        return Err(anyhow!("pooled shape {:?} != [{}, {}]", normalized.dims(), batch, hidden_dim));
    }
    Ok(normalized)
}
