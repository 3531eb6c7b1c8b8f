//! CLI command implementations for `sharepoint`.
//!
//! - **`read`**: `lists`, `count`, `items` and `item`
//! - **`write`**: `upload`, `update` and `delete`
//! - **`profile`**: `me` and `profile`
//! - **`context`**: `context-info`
//!
//! Each command prints its result as pretty JSON on stdout. Status lines go
//! to stderr so the output can be piped.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;
use serde_json::{Map, Value};
use sharepoint_rest::ExtraFields;

pub mod context;
pub mod profile;
pub mod read;
pub mod write;

/// `--extra` flags shared by the read commands.
#[derive(Args)]
pub struct ExtraArgs {
    /// Extra field to include, as `key=Field Name`. Can be repeated.
    #[arg(short = 'x', long = "extra", value_name = "KEY=FIELD", value_parser = parse_extra)]
    pub extra: Vec<(String, String)>,
}

impl ExtraArgs {
    pub fn fields(&self) -> ExtraFields {
        self.extra.iter().cloned().collect()
    }
}

fn parse_extra(value: &str) -> Result<(String, String), String> {
    let (key, field) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=FIELD, got `{value}`"))?;
    if key.is_empty() || field.is_empty() {
        return Err(format!("expected KEY=FIELD, got `{value}`"));
    }
    Ok((key.to_string(), field.to_string()))
}

/// Reads item properties given inline or as `@file.json`.
pub fn read_properties(input: &str) -> Result<Map<String, Value>> {
    let json = if let Some(path) = input.strip_prefix('@') {
        let path = PathBuf::from(path);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read properties file: {}", path.display()))?
    } else {
        input.to_string()
    };

    match serde_json::from_str(&json).context("invalid properties JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("properties must be a JSON object"),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
