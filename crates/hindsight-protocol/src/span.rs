use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::ProtocolError;
use crate::trace_context::{SpanId, TraceId};

/// Role of the local endpoint in an RPC or messaging interaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    Client,
    Server,
    Producer,
    Consumer,
}

impl Kind {
    /// Value of this kind on the wire. Zero is reserved for "unspecified", so
    /// every variant maps to its ordinal plus one.
    pub fn wire_value(self) -> u8 {
        match self {
            Kind::Client => 1,
            Kind::Server => 2,
            Kind::Producer => 3,
            Kind::Consumer => 4,
        }
    }
}

/// Network context of a node in the service graph
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EndpointJson")]
pub struct Endpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Ipv6Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }

    /// An endpoint without any field set carries no information and is never encoded.
    pub fn is_empty(&self) -> bool {
        self.service_name.is_none()
            && self.ipv4.is_none()
            && self.ipv6.is_none()
            && self.port.is_none()
    }
}

/// Endpoint as it appears in json, before port and address normalization
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointJson {
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    ipv4: Option<Ipv4Addr>,
    #[serde(default)]
    ipv6: Option<Ipv6Addr>,
    #[serde(default)]
    port: Option<u16>,
}

impl From<EndpointJson> for Endpoint {
    fn from(json: EndpointJson) -> Self {
        let mut builder = Endpoint::builder();
        if let Some(service_name) = json.service_name {
            builder = builder.service_name(service_name);
        }
        if let Some(ipv4) = json.ipv4 {
            builder = builder.ipv4(ipv4);
        }
        if let Some(ipv6) = json.ipv6 {
            builder = builder.ipv6(ipv6);
        }
        if let Some(port) = json.port {
            builder = builder.port(port);
        }
        builder.build()
    }
}

#[derive(Clone, Debug, Default)]
pub struct EndpointBuilder {
    endpoint: Endpoint,
}

impl EndpointBuilder {
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.endpoint.service_name = Some(service_name.into());
        self
    }

    /// Parse a textual ipv4 or ipv6 address into the matching field.
    ///
    /// IPv4-mapped ipv6 addresses such as `::ffff:1.2.3.4` land in `ipv4`.
    pub fn ip(mut self, ip: &str) -> Result<Self, ProtocolError> {
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| ProtocolError::InvalidIp(ip.to_string()))?;
        Ok(match addr {
            IpAddr::V4(v4) => self.ipv4(v4),
            IpAddr::V6(v6) => self.ipv6(v6),
        })
    }

    pub fn ipv4(mut self, ipv4: Ipv4Addr) -> Self {
        self.endpoint.ipv4 = Some(ipv4);
        self
    }

    /// IPv4-mapped addresses are stored in `ipv4`.
    pub fn ipv6(mut self, ipv6: Ipv6Addr) -> Self {
        match ipv6.to_ipv4_mapped() {
            Some(v4) => self.endpoint.ipv4 = Some(v4),
            None => self.endpoint.ipv6 = Some(ipv6),
        }
        self
    }

    /// Port zero means "unknown" and clears the field.
    pub fn port(mut self, port: u16) -> Self {
        self.endpoint.port = (port != 0).then_some(port);
        self
    }

    pub fn build(self) -> Endpoint {
        self.endpoint
    }
}

/// Event within a span, timestamped in microseconds since UNIX epoch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub timestamp: u64,
    pub value: String,
}

impl Annotation {
    pub fn new(timestamp: u64, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// Span represents a single operation in a trace
///
/// Timestamps and durations are in microseconds; zero means "not recorded".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub trace_id: TraceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SpanId>,
    pub id: SpanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shared: bool,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Span {
    /// Minimal span: only the trace id and span id are set.
    pub fn new(trace_id: TraceId, id: SpanId) -> Self {
        Self {
            trace_id,
            parent_id: None,
            id,
            kind: None,
            name: None,
            timestamp: 0,
            duration: 0,
            local_endpoint: None,
            remote_endpoint: None,
            annotations: Vec::new(),
            tags: BTreeMap::new(),
            debug: false,
            shared: false,
        }
    }

    pub fn with_parent_id(mut self, parent_id: SpanId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_local_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.local_endpoint = Some(endpoint);
        self
    }

    pub fn with_remote_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.remote_endpoint = Some(endpoint);
        self
    }

    pub fn with_annotation(mut self, timestamp: u64, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(timestamp, value));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    pub fn local_service_name(&self) -> Option<&str> {
        self.local_endpoint.as_ref()?.service_name.as_deref()
    }

    pub fn remote_service_name(&self) -> Option<&str> {
        self.remote_endpoint.as_ref()?.service_name.as_deref()
    }
}
