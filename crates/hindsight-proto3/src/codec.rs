use hindsight_protocol::Span;

use crate::buffer::WriteBuffer;
use crate::log::{TracingWarnSink, WarnSink};
use crate::writer::{Proto3SpanWriter, WriterConfig};

/// Entry point for encoding spans in proto3 form.
#[derive(Clone, Debug, Default)]
pub struct Proto3Codec<S = TracingWarnSink> {
    writer: Proto3SpanWriter<S>,
}

impl Proto3Codec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            writer: Proto3SpanWriter::with_config(TracingWarnSink, config),
        }
    }
}

impl<S: WarnSink> Proto3Codec<S> {
    pub fn from_writer(writer: Proto3SpanWriter<S>) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &Proto3SpanWriter<S> {
        &self.writer
    }

    pub fn size_in_bytes(&self, span: &Span) -> usize {
        self.writer.size_in_bytes(span)
    }

    /// Encodes a single span message into a buffer allocated at its exact size.
    pub fn encode(&self, span: &Span) -> Vec<u8> {
        let mut out = vec![0u8; self.writer.size_in_bytes(span)];
        self.writer.write(span, &mut WriteBuffer::new(&mut out, 0));
        out
    }

    pub fn encode_list(&self, spans: &[Span]) -> Vec<u8> {
        self.writer.write_list(spans)
    }

    /// Writes the list encoding into `out` at `pos`, returning the bytes written.
    pub fn encode_list_into(&self, spans: &[Span], out: &mut [u8], pos: usize) -> usize {
        self.writer.write_list_into(spans, out, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_protocol::{SpanId, TraceId};

    #[test]
    fn encode_minimal_span() {
        let span = Span::new(
            TraceId::from_hex("1").unwrap(),
            SpanId::from_hex("2").unwrap(),
        );
        let codec = Proto3Codec::new();
        let bytes = codec.encode(&span);
        assert_eq!(bytes.len(), codec.size_in_bytes(&span));
        assert_eq!(
            bytes,
            [0x0a, 8, 0, 0, 0, 0, 0, 0, 0, 1, 0x1a, 8, 0, 0, 0, 0, 0, 0, 0, 2]
        );
    }

    #[test]
    fn with_config_keeps_threshold() {
        let codec = Proto3Codec::with_config(WriterConfig {
            large_field_threshold: 10,
        });
        assert_eq!(codec.writer().config().large_field_threshold, 10);
    }
}
