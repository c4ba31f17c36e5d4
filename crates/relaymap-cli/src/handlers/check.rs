//! Manifest check command handler

use super::utils::load_into_store;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::redaction;
use crate::output::{CheckReport, OutputWriter, TemplateSummary};
use relaymap_core::{MemoryConfigStore, TransformRegistry};
use tracing::instrument;

/// Handle the check command
#[instrument(skip_all, fields(manifest = ?args.manifest))]
pub async fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let path = config.manifest_path(args.manifest.as_deref())?;
    output.info(&format!("Checking manifest: {}", path.display()))?;

    let loaded = load_into_store(&path)?;
    let report = CheckReport {
        manifest: path.display().to_string(),
        adapters: loaded.manifest.adapters.len(),
        templates: summarize(&loaded.store)?,
    };

    for warning in loaded.manifest.unknown_transforms(TransformRegistry::builtin()) {
        output.warning(&warning)?;
    }

    for template in &report.templates {
        if template.active_version.is_none() {
            output.warning(&format!(
                "Template {} has no active version; executions will be rejected",
                template.id
            ))?;
        }
    }

    output.check_report(&report)?;

    if args.detailed {
        output.section("Manifest")?;
        let manifest = serde_json::to_value(&loaded.manifest)?;
        output.data(&redaction::redacted(&manifest))?;
    }

    Ok(())
}

/// One row per template, in id order
fn summarize(store: &MemoryConfigStore) -> Result<Vec<TemplateSummary>> {
    let profile_name = |id: &str| -> Result<String> {
        Ok(store
            .profile(id)?
            .map(|profile| profile.name)
            .unwrap_or_else(|| id.to_string()))
    };

    let mut rows = Vec::new();
    for template in store.templates()? {
        let active_version = match template.active_version.as_deref() {
            Some(version_id) => store.version(version_id)?.map(|ruleset| ruleset.version_number),
            None => None,
        };

        rows.push(TemplateSummary {
            source: profile_name(&template.source)?,
            target: profile_name(&template.target)?,
            versions: store.versions(&template.id)?.len(),
            active_version,
            id: template.id,
            name: template.name,
        });
    }

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(rows)
}
