//! Mock fallback decoder for testing.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::media::{DecodeError, Decoded, FallbackDecoder, OutputType};

/// Mock implementation of the FallbackDecoder trait with a fixed answer.
#[derive(Debug)]
pub struct MockDecoder {
    name: String,
    result: Option<(OutputType, Bytes)>,
    calls: AtomicUsize,
}

impl MockDecoder {
    /// A decoder that always succeeds with `output`.
    pub fn succeeding(name: &str, output: OutputType, bytes: &'static [u8]) -> Self {
        Self {
            name: name.to_string(),
            result: Some((output, Bytes::from_static(bytes))),
            calls: AtomicUsize::new(0),
        }
    }

    /// A decoder that never recognizes its input.
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackDecoder for MockDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decode(&self, _input: &[u8]) -> Result<Decoded, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.result {
            Some((output, bytes)) => Ok(Decoded {
                output: *output,
                bytes: bytes.clone(),
            }),
            None => Err(DecodeError::Unsupported(format!("{} rejects input", self.name))),
        }
    }
}
