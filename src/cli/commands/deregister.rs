//! Implementation of the `piv deregister` command: removes a project from
//! the registry (spec §3 — "never deleted by the supervisor except on
//! explicit deregister", §4.1's documented `deregister` operation). Not
//! named in spec.md's CLI surface table, but without a CLI entry point the
//! documented registry operation would be unreachable.

use anyhow::{bail, Context, Result};

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::registry_store::RegistryStore;

#[derive(Debug, serde::Serialize)]
pub struct DeregisterOutput {
    pub name: String,
    pub removed: bool,
}

impl CommandOutput for DeregisterOutput {
    fn to_human(&self) -> String {
        if self.removed {
            format!("Deregistered `{}`.", self.name)
        } else {
            format!("No project named `{}` was registered.", self.name)
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(name: &str, registry: &RegistryStore, json_mode: bool) -> Result<()> {
    let mut removed = false;
    registry
        .update(|r| {
            removed = r.deregister(name).is_some();
            Ok(())
        })
        .context("failed to update registry")?;

    let result = DeregisterOutput { name: name.to_string(), removed };
    output(&result, json_mode);

    if !removed && !json_mode {
        bail!("no project named `{name}` was registered");
    }
    Ok(())
}
