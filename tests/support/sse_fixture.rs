//! Test fixture utilities: load SSE bodies and re-chunk them

#![allow(dead_code)]

use bytes::Bytes;
use futures_util::Stream;
use ragstream::RagError;
use std::path::{Path, PathBuf};

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("rag")
}

/// Raw bytes of a fixture file.
pub fn read_fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixtures_dir().join(name)).expect("read fixture")
}

pub fn read_fixture_text(name: &str) -> String {
    String::from_utf8(read_fixture(name)).expect("fixture is utf-8")
}

/// Split `raw` into chunks of at most `size` bytes, ignoring character
/// boundaries on purpose.
pub fn chunk_every(raw: &[u8], size: usize) -> Vec<Result<Bytes, RagError>> {
    raw.chunks(size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

/// Split `raw` at the given byte offsets (sorted, deduplicated, clamped).
pub fn chunk_at(raw: &[u8], cuts: &[usize]) -> Vec<Result<Bytes, RagError>> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| (*c).min(raw.len())).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(raw.len())) {
        if cut > start {
            out.push(Ok(Bytes::copy_from_slice(&raw[start..cut])));
            start = cut;
        }
    }
    out
}

pub fn byte_stream(
    chunks: Vec<Result<Bytes, RagError>>,
) -> impl Stream<Item = Result<Bytes, RagError>> + Send + Unpin + 'static {
    futures_util::stream::iter(chunks)
}
