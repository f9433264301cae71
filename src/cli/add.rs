use serde_json::Value;

use super::{fail, Context};
use crate::color::Outcome;
use crate::model::ModelDescriptor;
use crate::registry::register_model;
use crate::AddArgs;

/// Parses `KEY=VALUE`. Values which are valid JSON (numbers, booleans,
/// quoted strings, objects) are kept as JSON, anything else becomes a string.
pub(crate) fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, found \"{}\"", raw))?;

    let key = key.trim();

    if key.is_empty() {
        return Err(format!("missing key in \"{}\"", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    Ok((key.to_string(), value))
}

fn descriptor(args: &AddArgs) -> ModelDescriptor {
    let mut descriptor = ModelDescriptor::new(args.name.clone(), args.model.clone(), args.backend);

    descriptor.config = args.config.iter().cloned().collect();

    if !args.params.is_empty() {
        descriptor.params = Some(Value::Object(args.params.iter().cloned().collect()));
    }

    descriptor
}

pub(crate) fn add_cmd(ctx: &Context, args: &AddArgs) {
    match register_model(&ctx.store, args.category, descriptor(args)) {
        Ok(()) => println!(
            "{}  {} ({} model {})",
            Outcome::Added.tag(),
            args.name,
            args.backend,
            args.model
        ),
        Err(err) => fail(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("url=http://localhost:11434").unwrap(),
            ("url".to_string(), json!("http://localhost:11434"))
        );
        assert_eq!(
            parse_key_value("temperature=0.2").unwrap(),
            ("temperature".to_string(), json!(0.2))
        );
        assert_eq!(
            parse_key_value("stop=[\"\\n\"]").unwrap(),
            ("stop".to_string(), json!(["\n"]))
        );
        assert_eq!(
            parse_key_value("deployment=").unwrap(),
            ("deployment".to_string(), json!(""))
        );
    }

    #[test]
    fn test_parse_key_value_rejects_malformed() {
        assert!(parse_key_value("temperature").is_err());
        assert!(parse_key_value("=0.2").is_err());
    }
}
