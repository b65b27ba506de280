// src/publisher/message.rs

use lapin::types::{AMQPValue, ByteArray, FieldArray, FieldTable};
use lapin::BasicProperties;
use tracing::trace;

use super::args::{HeaderMap, Part, ScriptValue};
use crate::common::errors::{PublishError, Result};

pub const CONTENT_TYPE: &str = "contentType";
pub const CORRELATION_ID: &str = "correlationId";
pub const REPLY_TO: &str = "replyTo";
pub const CONTENT_ENCODING: &str = "contentEncoding";

/// Longest value an AMQP short string (names, property values, table keys)
/// can carry.
pub const SHORT_STRING_MAX: usize = 255;

/// Properties sent along with a message. The four dedicated fields come out
/// of the merged header map; whatever is left stays a generic header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: HeaderMap,
}

impl MessageProperties {
    pub fn from_headers(mut headers: HeaderMap) -> Self {
        let mut take = |key: &str| headers.remove(key).map(|v| v.to_string());

        let content_type = take(CONTENT_TYPE);
        let correlation_id = take(CORRELATION_ID);
        let reply_to = take(REPLY_TO);
        let content_encoding = take(CONTENT_ENCODING);

        Self {
            content_type,
            correlation_id,
            reply_to,
            content_encoding,
            headers,
        }
    }

    pub fn to_basic_properties(&self) -> BasicProperties {
        let mut properties = BasicProperties::default();

        if let Some(content_type) = &self.content_type {
            properties = properties.with_content_type(content_type.as_str().into());
        }
        if let Some(correlation_id) = &self.correlation_id {
            properties = properties.with_correlation_id(correlation_id.as_str().into());
        }
        if let Some(reply_to) = &self.reply_to {
            properties = properties.with_reply_to(reply_to.as_str().into());
        }
        if let Some(content_encoding) = &self.content_encoding {
            properties = properties.with_content_encoding(content_encoding.as_str().into());
        }

        properties.with_headers(field_table(&self.headers))
    }
}

/// A single publish, assembled on the caller's thread and then moved into
/// the worker that sends it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub exchange: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

impl OutboundMessage {
    /// Map `exchange, routing_key, parts...` onto a message.
    ///
    /// Maps merge into the headers (later keys win), bytes and text append to
    /// the body in argument order, and every other value is skipped.
    pub fn from_args(args: Vec<ScriptValue>) -> Result<Self> {
        if args.len() < 2 {
            return Err(PublishError::InsufficientArguments { given: args.len() });
        }

        let mut args = args.into_iter();
        let exchange = args.next().map(|v| v.to_string()).unwrap_or_default();
        let routing_key = args.next().map(|v| v.to_string()).unwrap_or_default();

        let mut headers = HeaderMap::new();
        let mut body = Vec::new();

        for arg in args {
            match Part::classify(arg) {
                Part::Headers(map) => headers.extend(map),
                Part::Binary(bytes) => body.extend_from_slice(&bytes),
                Part::Text(text) => body.extend_from_slice(text.as_bytes()),
                Part::Unrecognized(kind) => trace!(kind, "Ignoring publish argument"),
            }
        }

        Ok(Self {
            exchange,
            routing_key,
            properties: MessageProperties::from_headers(headers),
            body,
        })
    }
}

impl OutboundMessage {
    /// Reject anything that would not fit an AMQP short string: exchange,
    /// routing key, the dedicated properties and every header table key,
    /// nested tables included.
    pub fn validate(&self) -> Result<()> {
        check_short("exchange", &self.exchange)?;
        check_short("routing key", &self.routing_key)?;

        let props = &self.properties;
        for (name, value) in [
            (CONTENT_TYPE, &props.content_type),
            (CORRELATION_ID, &props.correlation_id),
            (REPLY_TO, &props.reply_to),
            (CONTENT_ENCODING, &props.content_encoding),
        ] {
            if let Some(value) = value {
                check_short(name, value)?;
            }
        }

        check_table_keys(&props.headers)
    }
}

fn check_short(field: &str, value: &str) -> Result<()> {
    if value.len() > SHORT_STRING_MAX {
        return Err(PublishError::ShortStringTooLong {
            field: field.to_string(),
            len: value.len(),
        });
    }
    Ok(())
}

fn check_table_keys(headers: &HeaderMap) -> Result<()> {
    for (key, value) in headers {
        if key.len() > SHORT_STRING_MAX {
            let prefix: String = key.chars().take(16).collect();
            return Err(PublishError::ShortStringTooLong {
                field: format!("header key \"{}...\"", prefix),
                len: key.len(),
            });
        }
        check_nested_keys(value)?;
    }
    Ok(())
}

fn check_nested_keys(value: &ScriptValue) -> Result<()> {
    match value {
        ScriptValue::Map(map) => check_table_keys(map),
        ScriptValue::List(items) => items.iter().try_for_each(check_nested_keys),
        _ => Ok(()),
    }
}

pub fn field_table(headers: &HeaderMap) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers {
        table.insert(key.as_str().into(), amqp_value(value));
    }
    table
}

pub fn amqp_value(value: &ScriptValue) -> AMQPValue {
    match value {
        ScriptValue::Null => AMQPValue::Void,
        ScriptValue::Bool(b) => AMQPValue::Boolean(*b),
        ScriptValue::Int(i) => AMQPValue::LongLongInt(*i),
        ScriptValue::Float(x) => AMQPValue::Double(*x),
        ScriptValue::Text(s) => AMQPValue::LongString(s.as_str().into()),
        ScriptValue::Bytes(b) => AMQPValue::ByteArray(ByteArray::from(b.clone())),
        ScriptValue::List(items) => {
            let mut array = FieldArray::default();
            for item in items {
                array.push(amqp_value(item));
            }
            AMQPValue::FieldArray(array)
        }
        ScriptValue::Map(map) => AMQPValue::FieldTable(field_table(map)),
    }
}
