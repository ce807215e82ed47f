//! Proto3 encoding of Hindsight spans without a protobuf runtime.
//!
//! Every encode computes the exact size first, allocates once, then writes:
//!
//! ```
//! use hindsight_proto3::Proto3Codec;
//! use hindsight_protocol::{Span, SpanId, TraceId};
//!
//! let span = Span::new(TraceId::from_hex("1").unwrap(), SpanId::from_hex("2").unwrap());
//! let codec = Proto3Codec::new();
//! let bytes = codec.encode(&span);
//! assert_eq!(bytes.len(), codec.size_in_bytes(&span));
//! ```

mod buffer;
mod codec;
mod log;
mod writer;

pub use buffer::{utf8_size_in_bytes, varint_size_in_bytes, WriteBuffer};
pub use codec::Proto3Codec;
pub use log::{TracingWarnSink, WarnSink};
pub use writer::{Proto3SpanWriter, WriterConfig, LARGE_FIELD_THRESHOLD};
