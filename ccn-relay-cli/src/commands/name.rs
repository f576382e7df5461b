//! `name` command: show how a URI is parsed

use anyhow::{Context, Result};
use ccn_relay_common::{Prefix, Suite};
use serde_json::json;

use crate::utils::{hex, print_header};

pub fn show_name(uri: &str, suite: Suite, chunk: Option<u32>, as_json: bool) -> Result<()> {
    let prefix = Prefix::from_uri(uri, suite, None, chunk)
        .with_context(|| format!("Invalid name '{}'", uri))?;
    let components = prefix.wire_components()?;

    if as_json {
        let value = json!({
            "uri": uri,
            "suite": suite.as_str(),
            "path": prefix.to_display_path(),
            "chunk": prefix.chunknum(),
            "components": components.iter().map(|c| hex(c)).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_header(&prefix.to_display_path());
    println!("Suite:      {}", suite);
    println!("Components: {}", components.len());
    if let Some(chunk) = prefix.chunknum() {
        println!("Chunk:      {}", chunk);
    }
    for (i, component) in components.iter().enumerate() {
        let value = prefix
            .component_value(i)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default();
        println!("  [{:2}] {:<24} {}", i, value, hex(component));
    }
    Ok(())
}
