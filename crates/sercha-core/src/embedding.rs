//! Packed float32 embedding codec
//!
//! Vector embeddings are stored as a packed little-endian IEEE-754 32-bit
//! float sequence. The stored byte length must be a multiple of four; nil
//! and empty embeddings are interchangeable on read.

use thiserror::Error;

/// Errors from the embedding codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The byte slice length was not a multiple of four.
    #[error("embedding byte length {0} is not a multiple of 4")]
    InvalidLength(usize),
}

/// Encodes a slice of `f32` values as packed little-endian bytes.
#[must_use]
pub fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes packed little-endian bytes into a `Vec<f32>`.
///
/// An empty byte slice decodes to an empty vector (nil and empty
/// embeddings are interchangeable on read).
pub fn bytes_to_floats(bytes: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    if bytes.len() % 4 != 0 {
        return Err(EmbeddingError::InvalidLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(chunk);
            f32::from_le_bytes(buf)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values() {
        let values = vec![0.0_f32, 1.0, -1.0, 3.14159];
        let bytes = floats_to_bytes(&values);
        assert_eq!(bytes.len(), values.len() * 4);
        let recovered = bytes_to_floats(&bytes).unwrap();
        assert_eq!(values, recovered);
    }

    #[test]
    fn matches_known_byte_layout() {
        let values = vec![0.0_f32, 1.0, -1.0];
        let bytes = floats_to_bytes(&values);
        assert_eq!(
            bytes,
            vec![
                0x00, 0x00, 0x00, 0x00, // 0.0
                0x00, 0x00, 0x80, 0x3f, // 1.0
                0x00, 0x00, 0x80, 0xbf, // -1.0
            ]
        );
    }

    #[test]
    fn empty_is_interchangeable() {
        assert_eq!(bytes_to_floats(&[]).unwrap(), Vec::<f32>::new());
        assert_eq!(floats_to_bytes(&[]), Vec::<u8>::new());
    }

    #[test]
    fn rejects_non_multiple_of_four() {
        assert!(bytes_to_floats(&[0, 1, 2]).is_err());
    }
}
