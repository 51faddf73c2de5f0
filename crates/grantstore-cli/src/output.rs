use crate::cli::OutputFormat;
use colored::Colorize;
use grantstore::{Entity, KeyTtl};
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_entity(entity: Option<Entity>, format: OutputFormat) -> anyhow::Result<()> {
    let Some(entity) = entity else {
        print_error("Not found");
        return Ok(());
    };

    match format {
        OutputFormat::Json => {
            let value = json!({
                "kind": entity.kind,
                "id": entity.id,
                "consumed": entity.consumed,
                "payload": entity.payload,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            builder.push_record(["kind", entity.kind.as_str()]);
            builder.push_record(["id", entity.id.as_str()]);
            let consumed = entity
                .consumed
                .map(|ts| ts.to_string())
                .unwrap_or_else(|| "-".to_string());
            builder.push_record(["consumed", consumed.as_str()]);
            if let Value::Object(map) = &entity.payload {
                for (key, value) in map {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    builder.push_record([key.as_str(), rendered.as_str()]);
                }
            } else {
                builder.push_record(["payload", entity.payload.to_string().as_str()]);
            }
            let table = builder.build().with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
    Ok(())
}

pub fn print_ttl(grant_id: &str, ttl: KeyTtl) {
    match ttl {
        KeyTtl::Missing => print_error(&format!("Grant {grant_id} has no index")),
        KeyTtl::Persistent => println!("{}: {}", grant_id.cyan(), "no expiry"),
        KeyTtl::Expires(secs) => println!("{}: {secs}s", grant_id.cyan()),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
