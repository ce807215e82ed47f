//! Hand-written proto3 encoding of the span schema.
//!
//! Field numbers all stay below 16, so every key fits in a single byte.
//!
//! ```text
//! message Span {
//!   bytes trace_id = 1;          bytes parent_id = 2;   bytes id = 3;
//!   Kind kind = 4;               string name = 5;       fixed64 timestamp = 6;
//!   uint64 duration = 7;         Endpoint local_endpoint = 8;
//!   Endpoint remote_endpoint = 9;
//!   repeated Annotation annotations = 10;
//!   map<string, string> tags = 11;
//!   bool debug = 12;             bool shared = 13;
//! }
//! message Endpoint { string service_name = 1; bytes ipv4 = 2; bytes ipv6 = 3; int32 port = 4; }
//! message Annotation { fixed64 timestamp = 1; string value = 2; }
//! message ListOfSpans { repeated Span spans = 1; }
//! ```

use hindsight_protocol::{Annotation, Endpoint, Span};
use serde::Deserialize;

use crate::buffer::{utf8_size_in_bytes, varint_size_in_bytes, WriteBuffer};
use crate::log::{TracingWarnSink, WarnSink};

pub(crate) const WIRETYPE_VARINT: u8 = 0;
pub(crate) const WIRETYPE_FIXED64: u8 = 1;
pub(crate) const WIRETYPE_LENGTH_DELIMITED: u8 = 2;

/// Fields whose encoding exceeds this many bytes are reported as huge.
pub const LARGE_FIELD_THRESHOLD: usize = 1024 * 1024;

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Encoded field size, in bytes, above which a warning is emitted
    pub large_field_threshold: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            large_field_threshold: LARGE_FIELD_THRESHOLD,
        }
    }
}

/// Computes the exact proto3 size of a span and writes it into a buffer of that size.
///
/// [`size_in_bytes`](Self::size_in_bytes) and [`write`](Self::write) mirror
/// each other field for field: the writer emits exactly the number of bytes
/// the size calculator predicts.
#[derive(Clone, Debug, Default)]
pub struct Proto3SpanWriter<S = TracingWarnSink> {
    sink: S,
    config: WriterConfig,
}

impl Proto3SpanWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: WarnSink> Proto3SpanWriter<S> {
    pub fn with_sink(sink: S) -> Self {
        Self::with_config(sink, WriterConfig::default())
    }

    pub fn with_config(sink: S, config: WriterConfig) -> Self {
        Self { sink, config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Exact number of bytes [`write`](Self::write) will emit for `span`.
    ///
    /// Warns through the sink for any name, annotation, tag or service name
    /// whose encoding exceeds the configured threshold.
    pub fn size_in_bytes(&self, span: &Span) -> usize {
        let mut size = 2 + span.trace_id.byte_len(); // tag + len + 8 or 16 bytes

        if span.parent_id.is_some() {
            size += 10; // tag + len + 8 bytes
        }

        size += 10; // id

        if span.kind.is_some() {
            size += 2; // tag + byte
        }

        if let Some(name) = &span.name {
            let size_of_name = size_of_string_field(name);
            self.warn_if_huge(size_of_name, span, "name");
            size += size_of_name;
        }

        if span.timestamp != 0 {
            size += 9; // tag + 8 byte number
        }

        if span.duration != 0 {
            size += 1 + varint_size_in_bytes(span.duration);
        }

        let size_of_local = size_of_endpoint_field(span.local_endpoint.as_ref());
        self.warn_if_huge(size_of_local, span, "local service name");
        size += size_of_local;

        let size_of_remote = size_of_endpoint_field(span.remote_endpoint.as_ref());
        self.warn_if_huge(size_of_remote, span, "remote service name");
        size += size_of_remote;

        for annotation in &span.annotations {
            let size_of_annotation = size_of_annotation_field(annotation);
            self.warn_if_huge(size_of_annotation, span, "annotation");
            size += size_of_annotation;
        }

        for (key, value) in &span.tags {
            let size_of_entry = size_of_map_entry_field(key, value);
            self.warn_if_huge(size_of_entry, span, "tag");
            size += size_of_entry;
        }

        if span.debug {
            size += 2;
        }
        if span.shared {
            size += 2;
        }

        size
    }

    fn warn_if_huge(&self, size: usize, span: &Span, context: &str) {
        if size > self.config.large_field_threshold && self.sink.enabled() {
            self.sink.warn(&format!(
                "Span {}/{} includes a huge {} that will take {} bytes to encode",
                span.trace_id, span.id, context, size
            ));
        }
    }

    /// Writes `span` at the buffer's position, in ascending field number order.
    ///
    /// The buffer must have at least [`size_in_bytes`](Self::size_in_bytes)
    /// bytes left.
    pub fn write(&self, span: &Span, b: &mut WriteBuffer<'_>) {
        write_lower_hex_field(1, span.trace_id.as_str(), b);

        if let Some(parent_id) = &span.parent_id {
            write_lower_hex_field(2, parent_id.as_str(), b);
        }

        write_lower_hex_field(3, span.id.as_str(), b);

        if let Some(kind) = span.kind {
            b.write_byte(key(4, WIRETYPE_VARINT))
                .write_byte(kind.wire_value());
        }

        if let Some(name) = &span.name {
            write_utf8_field(5, name, b);
        }

        if span.timestamp != 0 {
            b.write_byte(key(6, WIRETYPE_FIXED64))
                .write_u64_le(span.timestamp);
        }

        if span.duration != 0 {
            b.write_byte(key(7, WIRETYPE_VARINT))
                .write_varint(span.duration);
        }

        write_endpoint_field(8, span.local_endpoint.as_ref(), b);
        write_endpoint_field(9, span.remote_endpoint.as_ref(), b);

        for annotation in &span.annotations {
            write_annotation_field(10, annotation, b);
        }

        for (key, value) in &span.tags {
            write_map_entry_field(11, key, value, b);
        }

        if span.debug {
            b.write_byte(key(12, WIRETYPE_VARINT)).write_byte(1);
        }
        if span.shared {
            b.write_byte(key(13, WIRETYPE_VARINT)).write_byte(1);
        }
    }

    /// Encodes `spans` as a `ListOfSpans` message: field 1, repeated.
    ///
    /// An empty list returns an empty vector without allocating.
    pub fn write_list(&self, spans: &[Span]) -> Vec<u8> {
        if spans.is_empty() {
            return Vec::new();
        }

        let sizes: Vec<usize> = spans.iter().map(|span| self.size_in_bytes(span)).collect();
        let total: usize = sizes
            .iter()
            .map(|size| size_of_length_delimited_field(*size))
            .sum();

        let mut out = vec![0u8; total];
        let mut b = WriteBuffer::new(&mut out, 0);
        for (span, size) in spans.iter().zip(&sizes) {
            self.write_list_entry(span, *size, &mut b);
        }
        debug_assert_eq!(b.pos(), total);
        out
    }

    /// Same framing as [`write_list`](Self::write_list), written into `out`
    /// starting at `pos`. Returns the number of bytes written.
    ///
    /// Bytes outside `pos..pos + returned` are left untouched.
    pub fn write_list_into(&self, spans: &[Span], out: &mut [u8], pos: usize) -> usize {
        let mut b = WriteBuffer::new(out, pos);
        for span in spans {
            let size = self.size_in_bytes(span);
            self.write_list_entry(span, size, &mut b);
        }
        b.pos() - pos
    }

    fn write_list_entry(&self, span: &Span, size: usize, b: &mut WriteBuffer<'_>) {
        b.write_byte(key(1, WIRETYPE_LENGTH_DELIMITED))
            .write_varint(size as u64);
        self.write(span, b);
    }
}

/// `(field_number << 3) | wire_type`
pub(crate) fn key(field_number: u8, wire_type: u8) -> u8 {
    debug_assert!(field_number < 16);
    (field_number << 3) | wire_type
}

fn write_utf8_field(field_number: u8, value: &str, b: &mut WriteBuffer<'_>) {
    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_varint(utf8_size_in_bytes(value) as u64)
        .write_utf8(value);
}

fn write_bytes_field(field_number: u8, value: &[u8], b: &mut WriteBuffer<'_>) {
    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_varint(value.len() as u64)
        .write(value);
}

/// Decodes lowercase hex straight into the buffer, two characters per byte.
fn write_lower_hex_field(field_number: u8, hex: &str, b: &mut WriteBuffer<'_>) {
    let hex = hex.as_bytes();
    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_byte((hex.len() / 2) as u8);
    for pair in hex.chunks_exact(2) {
        b.write_byte(decode_lower_hex(pair[0]) << 4 | decode_lower_hex(pair[1]));
    }
}

fn decode_lower_hex(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        // ids are validated on construction
        _ => unreachable!("not lower hex: {:?}", c as char),
    }
}

pub(crate) fn size_of_length_delimited_field(size: usize) -> usize {
    1 + varint_size_in_bytes(size as u64) + size // tag + len + bytes
}

pub(crate) fn size_of_string_field(value: &str) -> usize {
    size_of_length_delimited_field(utf8_size_in_bytes(value))
}

/// Empty endpoints are not written, not even as an empty message.
pub(crate) fn size_of_endpoint_field(endpoint: Option<&Endpoint>) -> usize {
    match endpoint {
        Some(endpoint) if !endpoint.is_empty() => {
            size_of_length_delimited_field(size_of_endpoint(endpoint))
        }
        _ => 0,
    }
}

pub(crate) fn size_of_endpoint(endpoint: &Endpoint) -> usize {
    let mut size = 0;
    if let Some(service_name) = &endpoint.service_name {
        size += size_of_string_field(service_name);
    }
    if endpoint.ipv4.is_some() {
        size += 6; // tag + len + 4 bytes
    }
    if endpoint.ipv6.is_some() {
        size += 18; // tag + len + 16 bytes
    }
    if let Some(port) = endpoint.port {
        size += 1 + varint_size_in_bytes(port as u64);
    }
    size
}

fn write_endpoint_field(field_number: u8, endpoint: Option<&Endpoint>, b: &mut WriteBuffer<'_>) {
    let endpoint = match endpoint {
        Some(endpoint) if !endpoint.is_empty() => endpoint,
        _ => return,
    };

    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_varint(size_of_endpoint(endpoint) as u64);

    if let Some(service_name) = &endpoint.service_name {
        write_utf8_field(1, service_name, b);
    }
    if let Some(ipv4) = endpoint.ipv4 {
        write_bytes_field(2, &ipv4.octets(), b);
    }
    if let Some(ipv6) = endpoint.ipv6 {
        write_bytes_field(3, &ipv6.octets(), b);
    }
    if let Some(port) = endpoint.port {
        b.write_byte(key(4, WIRETYPE_VARINT)).write_varint(port as u64);
    }
}

pub(crate) fn size_of_annotation_field(annotation: &Annotation) -> usize {
    size_of_length_delimited_field(size_of_annotation(annotation))
}

fn size_of_annotation(annotation: &Annotation) -> usize {
    9 /* tag + 8 byte number */ + size_of_string_field(&annotation.value)
}

fn write_annotation_field(field_number: u8, annotation: &Annotation, b: &mut WriteBuffer<'_>) {
    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_varint(size_of_annotation(annotation) as u64);

    b.write_byte(key(1, WIRETYPE_FIXED64))
        .write_u64_le(annotation.timestamp);
    write_utf8_field(2, &annotation.value, b);
}

/// A map entry is an embedded message: field 1 is the key, field 2 the value.
pub(crate) fn size_of_map_entry_field(key: &str, value: &str) -> usize {
    size_of_length_delimited_field(size_of_string_field(key) + size_of_string_field(value))
}

fn write_map_entry_field(field_number: u8, k: &str, v: &str, b: &mut WriteBuffer<'_>) {
    b.write_byte(key(field_number, WIRETYPE_LENGTH_DELIMITED))
        .write_varint((size_of_string_field(k) + size_of_string_field(v)) as u64);

    write_utf8_field(1, k, b);
    write_utf8_field(2, v, b);
}
