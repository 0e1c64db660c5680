//! Lifecycles command implementation
//!
//! Implements `weave lifecycles` to list the known lifecycles. Outside a
//! workspace the built-in lifecycles are listed.

use anyhow::Result;
use tracing::debug;

use super::{load_workspace, GlobalOptions};
use crate::core::lifecycle::{ALL, EACH};
use crate::core::session::{BuildSettings, SettingsOverrides};
use crate::core::workspace::WorkspaceSettings;
use crate::error::WorkspaceError;

/// Execute the lifecycles command
pub fn execute(options: &GlobalOptions, legacy_aliases: bool) -> Result<()> {
    let file = match load_workspace(options) {
        Ok(workspace) => workspace.workspace,
        Err(e)
            if options.file.is_none()
                && matches!(e.downcast_ref::<WorkspaceError>(), Some(WorkspaceError::NotFound { .. })) =>
        {
            debug!("No workspace found, listing the built-in lifecycles");
            WorkspaceSettings::default()
        }
        Err(e) => return Err(e),
    };
    let overrides = SettingsOverrides {
        legacy_aliases,
        ..SettingsOverrides::default()
    };
    let registry = BuildSettings::resolve(&file, &overrides)?.registry();

    if options.json {
        let lifecycles: Vec<serde_json::Value> = registry
            .lifecycles()
            .iter()
            .map(|l| {
                serde_json::json!({
                    "id": l.id(),
                    "phases": l.phases(),
                    "aliases": l
                        .aliases()
                        .iter()
                        .map(|(alias, target)| serde_json::json!({ "alias": alias, "target": target }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&lifecycles)?);
        return Ok(());
    }

    for lifecycle in registry.lifecycles() {
        println!("{}", lifecycle.id());
        println!("  phases: {}", lifecycle.phases().join(", "));
        for (alias, target) in lifecycle.aliases() {
            println!("  alias:  {alias} -> {target}");
        }
    }
    println!("\n'{ALL}' runs the whole default lifecycle, aggregators around their modules");
    println!("'{EACH}' runs the whole default lifecycle per module");
    Ok(())
}
