//! Riemann protocol buffer messages.
//!
//! Hand-written `prost` definitions for the subset of `proto.proto` this
//! service produces and consumes. Fields are proto2 `optional`, so unset
//! values are omitted from the wire.

use crate::catcher::event::MonitoringEvent;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Msg {
    #[prost(bool, optional, tag = "2")]
    pub ok: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "3")]
    pub error: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "6")]
    pub events: ::prost::alloc::vec::Vec<Event>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(int64, optional, tag = "1")]
    pub time: ::core::option::Option<i64>,
    #[prost(string, optional, tag = "2")]
    pub state: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub service: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub host: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub description: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "7")]
    pub tags: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(float, optional, tag = "8")]
    pub ttl: ::core::option::Option<f32>,
    #[prost(message, repeated, tag = "9")]
    pub attributes: ::prost::alloc::vec::Vec<Attribute>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Attribute {
    #[prost(string, required, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub value: ::core::option::Option<::prost::alloc::string::String>,
}

impl From<&MonitoringEvent<'_>> for Event {
    fn from(event: &MonitoringEvent<'_>) -> Self {
        Self {
            host: Some(event.host.to_string()),
            service: Some(event.service.to_string()),
            attributes: event
                .attributes
                .iter()
                .map(|a| Attribute {
                    key: a.key.to_string(),
                    value: Some(a.value.to_string()),
                })
                .collect(),
            ..Default::default()
        }
    }
}

impl Msg {
    /// Wrap a single event.
    pub fn with_event(event: &MonitoringEvent<'_>) -> Self {
        Self {
            events: vec![Event::from(event)],
            ..Default::default()
        }
    }

    /// Positive acknowledgement as sent by the collector.
    pub fn ack() -> Self {
        Self {
            ok: Some(true),
            ..Default::default()
        }
    }

    /// Negative acknowledgement carrying the collector's error text.
    pub fn nack(error: impl Into<String>) -> Self {
        Self {
            ok: Some(false),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
