//! Vector helpers shared by the embedding index and the context assembler.

use sha2::{Digest, Sha256};

use crate::errors::Error;

/// Encode an f32 vector as a little-endian byte blob for BLOB storage.
pub fn encode_vec_f32(vec: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Decode a little-endian f32 blob written by [`encode_vec_f32`].
pub fn decode_vec_f32(blob: &[u8]) -> Result<Vec<f32>, Error> {
    if blob.len() % 4 != 0 {
        return Err(Error::InvalidDbValue(format!(
            "embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    let mut out = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

/// Cosine similarity between two vectors.
///
/// Returns `None` on dimensionality mismatch or when either vector has
/// zero norm; callers skip such candidates.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Cache key for a query embedding: sha256 over model id and text.
pub fn embed_cache_key(model: &str, text: &str) -> String {
    let mut h = Sha256::new();
    h.update(model.as_bytes());
    h.update([0u8]);
    h.update(text.as_bytes());
    hex::encode(h.finalize())
}
