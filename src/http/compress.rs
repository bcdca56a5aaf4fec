//! Compression backends
//!
//! Maximum-effort encoders for the compressed representations kept in the
//! static cache. Each call is CPU bound; callers run it on the blocking pool.

use std::io::{Read, Write};

use brotli::enc::backward_references::BrotliEncoderMode;
use brotli::enc::BrotliEncoderParams;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use super::encoding::Encoding;
use crate::error::{Error, Result};

/// Highest brotli quality level
const BROTLI_MAX_QUALITY: i32 = 11;

/// Brotli window size (4MB)
const BROTLI_LGWIN: i32 = 22;

/// Internal buffer size for the brotli reader
const BROTLI_BUFFER_SIZE: usize = 64 * 1024;

/// Compress `data` with the given coding at maximum effort
///
/// `Encoding::Identity` returns a copy of the input.
pub fn compress(encoding: Encoding, data: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Identity => Ok(data.to_vec()),
        Encoding::Brotli => compress_brotli(data),
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
            encoder
                .write_all(data)
                .and_then(|()| encoder.finish())
                .map_err(|e| encode_error(encoding, &e))
        }
        Encoding::Deflate => {
            // HTTP "deflate" is the zlib container
            let mut encoder =
                ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
            encoder
                .write_all(data)
                .and_then(|()| encoder.finish())
                .map_err(|e| encode_error(encoding, &e))
        }
    }
}

fn compress_brotli(data: &[u8]) -> Result<Vec<u8>> {
    let params = BrotliEncoderParams {
        quality: BROTLI_MAX_QUALITY,
        lgwin: BROTLI_LGWIN,
        mode: BrotliEncoderMode::BROTLI_MODE_TEXT,
        size_hint: data.len(),
        ..Default::default()
    };

    let mut reader = brotli::CompressorReader::with_params(data, BROTLI_BUFFER_SIZE, &params);
    let mut output = Vec::with_capacity(data.len() / 2);
    reader
        .read_to_end(&mut output)
        .map_err(|e| encode_error(Encoding::Brotli, &e))?;
    Ok(output)
}

/// Decode a compressed body back to its original bytes
pub fn decompress(encoding: Encoding, data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let result = match encoding {
        Encoding::Identity => {
            output.extend_from_slice(data);
            Ok(0)
        }
        Encoding::Brotli => {
            brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE).read_to_end(&mut output)
        }
        Encoding::Gzip => flate2::read::GzDecoder::new(data).read_to_end(&mut output),
        Encoding::Deflate => flate2::read::ZlibDecoder::new(data).read_to_end(&mut output),
    };
    result.map_err(|e| encode_error(encoding, &e))?;
    Ok(output)
}

fn encode_error(encoding: Encoding, error: &std::io::Error) -> Error {
    Error::Encode {
        encoding: encoding.as_str(),
        reason: error.to_string(),
    }
}
