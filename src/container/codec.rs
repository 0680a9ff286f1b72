use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::foundation::error::{GenesisError, GenesisResult};

/// zlib at maximum effort; used both per block and for the outer record pass.
pub(crate) fn deflate(bytes: &[u8]) -> GenesisResult<Vec<u8>> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::best());
    enc.write_all(bytes)
        .map_err(|e| GenesisError::encode(format!("zlib compression failed: {e}")))?;
    enc.finish()
        .map_err(|e| GenesisError::encode(format!("zlib compression failed: {e}")))
}

/// Inflate a zlib stream.
pub(crate) fn inflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    ZlibDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

/// Concatenate blocks as `u32` little-endian length prefix + payload.
pub(crate) fn pack_blocks(blocks: &[Vec<u8>]) -> GenesisResult<Vec<u8>> {
    let total: usize = blocks.iter().map(|b| b.len() + 4).sum();
    let mut out = Vec::with_capacity(total);
    for (i, b) in blocks.iter().enumerate() {
        let len = u32::try_from(b.len()).map_err(|_| {
            GenesisError::encode(format!("frame block {i} exceeds u32 length prefix"))
        })?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(b);
    }
    Ok(out)
}

/// Split a length-prefixed block stream; `field` names the record key for error reports.
pub(crate) fn unpack_blocks(mut bytes: &[u8], field: &str) -> GenesisResult<Vec<Vec<u8>>> {
    let mut blocks = Vec::new();
    while !bytes.is_empty() {
        let idx = blocks.len();
        let Some((head, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(GenesisError::format(
                format!("{field}[{idx}]"),
                "truncated length prefix",
            ));
        };
        let len = u32::from_le_bytes(*head) as usize;
        if rest.len() < len {
            return Err(GenesisError::format(
                format!("{field}[{idx}]"),
                format!(
                    "length prefix {len} overruns remaining {} bytes",
                    rest.len()
                ),
            ));
        }
        let (block, tail) = rest.split_at(len);
        blocks.push(block.to_vec());
        bytes = tail;
    }
    Ok(blocks)
}
