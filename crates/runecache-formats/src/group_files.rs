//! Splitting multi-file group payloads
//!
//! A group holding more than one file stores every file's bytes in a number
//! of interleaved chunks, followed by a trailer:
//!
//! ```text
//! chunk 0: file 0 | file 1 | ... | file n-1
//! chunk 1: file 0 | file 1 | ... | file n-1
//! ...
//! trailer: for each chunk, for each file, i32 length delta
//! chunk count (1)
//! ```
//!
//! Length deltas accumulate across the files of one chunk and reset at the
//! start of the next chunk. A group holding a single file has no trailer.

use crate::cursor::ByteCursor;
use thiserror::Error;

/// Group file errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupFileError {
    /// Trailer does not fit inside the payload
    #[error("group trailer of {trailer_len} bytes does not fit a {payload_len} byte payload")]
    TrailerOutOfBounds {
        /// Bytes needed by the trailer including the chunk count
        trailer_len: usize,
        /// Total payload size
        payload_len: usize,
    },

    /// A chunk length accumulated to a negative value
    #[error("negative length {length} for file {file} in chunk {chunk}")]
    NegativeChunkLength {
        /// File position within the group
        file: usize,
        /// Chunk index
        chunk: usize,
        /// Accumulated length
        length: i32,
    },

    /// Chunk lengths add up to more than the data region holds
    #[error("chunk lengths need {required} bytes but only {available} precede the trailer")]
    ChunkOverrun {
        /// Bytes described by the trailer
        required: usize,
        /// Bytes available before the trailer
        available: usize,
    },

    /// More than 255 chunks requested on encode
    #[error("too many chunks: {0} (max 255)")]
    TooManyChunks(usize),

    /// Chunks disagree on the number of files
    #[error("chunk {chunk} holds {actual} files, expected {expected}")]
    InconsistentChunk {
        /// Chunk index
        chunk: usize,
        /// File count of the first chunk
        expected: usize,
        /// File count of this chunk
        actual: usize,
    },

    /// A chunk is too large for its i32 length field
    #[error("chunk of {0} bytes is too large")]
    ChunkTooLarge(usize),
}

/// Split a decoded group payload into its files.
///
/// Returns one byte vector per file, in directory order.
pub fn split_group_files(
    payload: &[u8],
    file_count: usize,
) -> Result<Vec<Vec<u8>>, GroupFileError> {
    match file_count {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![payload.to_vec()]),
        _ => {}
    }

    let Some(&chunk_count) = payload.last() else {
        return Err(GroupFileError::TrailerOutOfBounds {
            trailer_len: 1,
            payload_len: 0,
        });
    };
    let chunk_count = chunk_count as usize;

    let trailer_len = chunk_count
        .checked_mul(file_count)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(1))
        .filter(|&n| n <= payload.len())
        .ok_or(GroupFileError::TrailerOutOfBounds {
            trailer_len: chunk_count.saturating_mul(file_count).saturating_mul(4) + 1,
            payload_len: payload.len(),
        })?;
    let data_len = payload.len() - trailer_len;

    // lengths[file][chunk]
    let mut lengths = vec![vec![0usize; chunk_count]; file_count];
    let mut totals = vec![0usize; file_count];

    let mut trailer = ByteCursor::new(&payload[data_len..payload.len() - 1]);
    for chunk in 0..chunk_count {
        let mut chunk_len = 0i32;
        for file in 0..file_count {
            let delta = trailer
                .read_i32()
                .map_err(|_| GroupFileError::TrailerOutOfBounds {
                    trailer_len,
                    payload_len: payload.len(),
                })?;
            chunk_len = chunk_len.wrapping_add(delta);
            if chunk_len < 0 {
                return Err(GroupFileError::NegativeChunkLength {
                    file,
                    chunk,
                    length: chunk_len,
                });
            }
            lengths[file][chunk] = chunk_len as usize;
            totals[file] += chunk_len as usize;
        }
    }

    let required: usize = totals.iter().sum();
    if required > data_len {
        return Err(GroupFileError::ChunkOverrun {
            required,
            available: data_len,
        });
    }

    let mut files: Vec<Vec<u8>> = totals.iter().map(|&len| Vec::with_capacity(len)).collect();
    let mut offset = 0;
    for chunk in 0..chunk_count {
        for (file, out) in files.iter_mut().enumerate() {
            let len = lengths[file][chunk];
            out.extend_from_slice(&payload[offset..offset + len]);
            offset += len;
        }
    }

    Ok(files)
}

/// Join files back into a group payload.
///
/// `chunks[c][f]` is the slice of file `f` stored in chunk `c`. Every chunk
/// must list the same number of files. A single file is written without a
/// trailer, concatenating its chunks.
pub fn encode_group_files(chunks: &[Vec<Vec<u8>>]) -> Result<Vec<u8>, GroupFileError> {
    let file_count = chunks.first().map_or(0, Vec::len);
    for (chunk, files) in chunks.iter().enumerate() {
        if files.len() != file_count {
            return Err(GroupFileError::InconsistentChunk {
                chunk,
                expected: file_count,
                actual: files.len(),
            });
        }
    }

    let mut out: Vec<u8> = chunks.iter().flatten().flatten().copied().collect();
    if file_count <= 1 {
        return Ok(out);
    }

    let chunk_count =
        u8::try_from(chunks.len()).map_err(|_| GroupFileError::TooManyChunks(chunks.len()))?;

    out.reserve(chunks.len() * file_count * 4 + 1);
    for files in chunks {
        let mut previous = 0i32;
        for file in files {
            let len =
                i32::try_from(file.len()).map_err(|_| GroupFileError::ChunkTooLarge(file.len()))?;
            out.extend_from_slice(&len.wrapping_sub(previous).to_be_bytes());
            previous = len;
        }
    }
    out.push(chunk_count);
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_three_files_two_chunks() {
        let data: Vec<u8> = (0u8..21).collect();
        let mut payload = data.clone();
        // chunk 0 lengths 4, 2, 5; chunk 1 lengths 6, 3, 1
        for delta in [4i32, -2, 3, 6, -3, -2] {
            payload.extend_from_slice(&delta.to_be_bytes());
        }
        payload.push(2);

        let files = split_group_files(&payload, 3).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0], [&data[0..4], &data[11..17]].concat());
        assert_eq!(files[1], [&data[4..6], &data[17..20]].concat());
        assert_eq!(files[2], [&data[6..11], &data[20..21]].concat());
        assert_eq!(
            files.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![10, 5, 6]
        );

        let chunks = vec![
            vec![data[0..4].to_vec(), data[4..6].to_vec(), data[6..11].to_vec()],
            vec![data[11..17].to_vec(), data[17..20].to_vec(), data[20..21].to_vec()],
        ];
        assert_eq!(encode_group_files(&chunks).unwrap(), payload);
    }

    #[test]
    fn test_single_file_has_no_trailer() {
        let payload = b"just one file".to_vec();
        assert_eq!(split_group_files(&payload, 1).unwrap(), vec![payload.clone()]);
        assert_eq!(encode_group_files(&[vec![payload.clone()]]).unwrap(), payload);
    }

    #[test]
    fn test_trailer_out_of_bounds() {
        let payload = [0u8, 0, 0, 0, 3];
        let err = split_group_files(&payload, 2).unwrap_err();
        assert_eq!(
            err,
            GroupFileError::TrailerOutOfBounds {
                trailer_len: 25,
                payload_len: 5
            }
        );

        assert!(matches!(
            split_group_files(&[], 2),
            Err(GroupFileError::TrailerOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_negative_length() {
        let mut payload = Vec::new();
        for delta in [1i32, -5] {
            payload.extend_from_slice(&delta.to_be_bytes());
        }
        payload.push(1);
        let err = split_group_files(&payload, 2).unwrap_err();
        assert_eq!(
            err,
            GroupFileError::NegativeChunkLength {
                file: 1,
                chunk: 0,
                length: -4
            }
        );
    }

    #[test]
    fn test_overrun() {
        let mut payload = vec![0u8; 3];
        for delta in [2i32, 0] {
            payload.extend_from_slice(&delta.to_be_bytes());
        }
        payload.push(1);
        assert_eq!(
            split_group_files(&payload, 2).unwrap_err(),
            GroupFileError::ChunkOverrun {
                required: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_inconsistent_chunks() {
        let chunks = vec![vec![vec![1], vec![2]], vec![vec![3]]];
        assert_eq!(
            encode_group_files(&chunks).unwrap_err(),
            GroupFileError::InconsistentChunk {
                chunk: 1,
                expected: 2,
                actual: 1
            }
        );
    }
}
