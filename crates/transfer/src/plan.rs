use crate::TransferMode;

/// Picks the transfer strategy for a file.
///
/// Chunked when `file_size >= threshold` (inclusive) or when forced.
pub fn plan(file_size: u64, force_chunk: bool, threshold: u64) -> TransferMode {
    if force_chunk || file_size >= threshold {
        TransferMode::Chunked
    } else {
        TransferMode::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CHUNK_THRESHOLD;

    #[test]
    fn small_files_go_direct() {
        assert_eq!(plan(0, false, CHUNK_THRESHOLD), TransferMode::Direct);
        assert_eq!(plan(1024 * 1024, false, CHUNK_THRESHOLD), TransferMode::Direct);
        assert_eq!(plan(CHUNK_THRESHOLD - 1, false, CHUNK_THRESHOLD), TransferMode::Direct);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(plan(CHUNK_THRESHOLD, false, CHUNK_THRESHOLD), TransferMode::Chunked);
        assert_eq!(plan(CHUNK_THRESHOLD + 1, false, CHUNK_THRESHOLD), TransferMode::Chunked);
    }

    #[test]
    fn force_always_chunks() {
        for size in [0, 1, 4096, CHUNK_THRESHOLD - 1, CHUNK_THRESHOLD, u64::MAX] {
            assert_eq!(plan(size, true, CHUNK_THRESHOLD), TransferMode::Chunked);
        }
    }

    #[test]
    fn direct_iff_below_threshold() {
        let threshold = 1000;
        for size in (0..3000).step_by(7) {
            let expected = if size < threshold {
                TransferMode::Direct
            } else {
                TransferMode::Chunked
            };
            assert_eq!(plan(size, false, threshold), expected, "size {size}");
        }
    }
}
