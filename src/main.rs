use anyhow::{bail, Context, Result};
use rabbit_dsl::{telemetry, ConnectionManager, Publisher, ScriptValue, Settings};
use std::fs;
use tracing::{error, info};

const USAGE: &str = "usage: rabbit-dsl <exchange> <routing-key> [{json headers} | @file | text]...";

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    telemetry::init_tracing(&settings.log_filter);

    let args = std::env::args()
        .skip(1)
        .enumerate()
        .map(|(i, raw)| parse_arg(i, raw))
        .collect::<Result<Vec<_>>>()?;
    if args.len() < 2 {
        bail!(USAGE);
    }

    let mut manager = ConnectionManager::new(&settings.connection);
    let connection = manager.connect().await.context("Failed to connect to RabbitMQ")?;
    let publisher = Publisher::from_current(connection)?;

    match publisher.publish_with_handle(args) {
        Some(handle) => {
            let id = handle.id().to_string();
            match handle.wait().await {
                Ok(()) => info!(publish_id = %id, "Message published"),
                Err(e) => error!(publish_id = %id, error = %e, "Message not published"),
            }
        }
        None => error!("Nothing to publish"),
    }

    manager.close().await?;
    Ok(())
}

/// The first two arguments are always text. After that `{...}` is a JSON
/// header object and `@path` is the raw content of a file.
fn parse_arg(index: usize, raw: String) -> Result<ScriptValue> {
    if index < 2 {
        return Ok(ScriptValue::Text(raw));
    }
    if raw.starts_with('{') {
        return serde_json::from_str(&raw).with_context(|| format!("Invalid header JSON: {}", raw));
    }
    if let Some(path) = raw.strip_prefix('@') {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path))?;
        return Ok(ScriptValue::Bytes(bytes));
    }
    Ok(ScriptValue::Text(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_kinds() {
        assert_eq!(
            parse_arg(0, "{not json".to_string()).unwrap(),
            ScriptValue::from("{not json")
        );
        assert_eq!(
            parse_arg(2, r#"{"replyTo":"q"}"#.to_string()).unwrap(),
            ScriptValue::map([("replyTo", "q".into())])
        );
        assert_eq!(parse_arg(3, "plain".to_string()).unwrap(), ScriptValue::from("plain"));
        assert!(parse_arg(2, "{broken".to_string()).is_err());
        assert!(parse_arg(2, "@/definitely/missing/file".to_string()).is_err());
    }
}
