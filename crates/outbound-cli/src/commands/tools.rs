//! Tools introspection commands.
//!
//! `outbound tools list` - List the tool catalog (offline).
//! `outbound tools describe` - Show the input schema of one tool.

use anyhow::Result;
use outbound_mcp::{ToolDefinition, ToolRegistry};

fn badges(tool: &ToolDefinition) -> Vec<&'static str> {
    let annotations = tool.annotations.as_ref();
    let mut badges = Vec::new();
    if annotations.is_some_and(|a| a.read_only == Some(true)) {
        badges.push("read");
    } else {
        badges.push("write");
    }
    if annotations.is_some_and(|a| a.destructive == Some(true)) {
        badges.push("destructive");
    }
    if annotations.is_some_and(|a| a.idempotent == Some(true)) {
        badges.push("idempotent");
    }
    badges
}

/// List every tool the server exposes.
pub fn list(verbose: bool) -> Result<()> {
    let registry = ToolRegistry::catalog();
    registry.verify()?;
    let tools = registry.list();

    println!("\n🔧 Available Tools ({}):", tools.len());

    for tool in tools {
        println!("   • {} ({})", tool.name, badges(tool).join(", "));

        if let Some(desc) = &tool.description {
            println!("     {}", desc);
        }

        if verbose {
            println!(
                "     Schema: {}",
                serde_json::to_string_pretty(&tool.input_schema)?
            );
        }
    }

    println!();
    Ok(())
}

/// Show detailed schema for a specific tool.
pub fn describe(tool_name: &str) -> Result<()> {
    let registry = ToolRegistry::catalog();
    let (_, tool) = registry.get(tool_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Tool '{}' not found. Available: {}",
            tool_name,
            registry.names().join(", ")
        )
    })?;

    println!("\nTool: {}", tool.name);

    if let Some(desc) = &tool.description {
        println!("\nDescription: {}", desc);
    }

    println!("\nInput Schema:");
    println!("{}", serde_json::to_string_pretty(&tool.input_schema)?);

    println!("\nAnnotations:");
    for badge in badges(tool) {
        println!("  • {}", badge);
    }

    println!();
    Ok(())
}
