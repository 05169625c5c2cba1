//! Bounded, order-preserving partitions of key sequences.

use std::slice::Chunks;

use crate::error::PersistorError;

/// Default number of keys rendered into a single statement.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Yield successive `size`-sized chunks of `sequence`; the last chunk may be shorter.
///
/// An empty sequence yields no chunks at all.
///
/// # Errors
/// Returns `PersistorError::ConfigError` if `size` is zero.
pub fn chunks<T>(sequence: &[T], size: usize) -> Result<Chunks<'_, T>, PersistorError> {
    if size == 0 {
        return Err(PersistorError::ConfigError(
            "chunk size must be at least 1".into(),
        ));
    }
    Ok(sequence.chunks(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence_yields_no_chunks() {
        let empty: [i64; 0] = [];
        assert_eq!(chunks(&empty, 3).unwrap().count(), 0);
    }

    #[test]
    fn chunks_concatenate_back_to_the_original() {
        let seq: Vec<i64> = (0..10).collect();
        let parts: Vec<&[i64]> = chunks(&seq, 4).unwrap().collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], &[8, 9]);
        assert_eq!(parts.concat(), seq);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(chunks(&[1, 2, 3], 0).is_err());
    }
}
