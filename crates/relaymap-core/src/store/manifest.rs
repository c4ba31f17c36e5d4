//! Declarative configuration: adapters (profiles) and templates
//!
//! Profiles are matched by name, so re-applying a manifest keeps their ids.
//! Templates listed in the manifest are rebuilt from scratch on every apply;
//! templates it does not mention are left alone unless they referenced a
//! profile the manifest dropped.

use super::config::{MemoryConfigStore, NewProfile, NewTemplate, SyncReport};
use crate::mapping::transform::TransformCall;
use crate::mapping::{Rule, TransformRegistry};
use crate::types::ProfileRole;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

/// One profile entry under `adapters`
pub type AdapterSpec = NewProfile;

/// One version entry under a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSpec {
    #[serde(default)]
    pub version_number: Option<u32>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// One template entry; `source`/`target` name adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub versions: Vec<VersionSpec>,
    /// Version number to activate; the latest when omitted
    #[serde(default)]
    pub active_version: Option<u32>,
}

/// The whole manifest document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub adapters: Vec<AdapterSpec>,
    #[serde(default)]
    pub templates: Vec<TemplateSpec>,
}

/// Outcome of [`Manifest::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestReport {
    pub profiles: SyncReport,
    pub templates: Vec<String>,
    pub versions: usize,
}

impl Manifest {
    /// Parse a JSON manifest
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Configuration {
            message: format!("Invalid manifest: {}", e),
            source: Some(anyhow::Error::new(e)),
        })
    }

    /// Check cross references without touching a store
    ///
    /// Returns every problem found rather than stopping at the first one.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut names = HashSet::new();
        for adapter in &self.adapters {
            if adapter.name.trim().is_empty() {
                problems.push("Adapter with an empty name".to_string());
            } else if !names.insert(adapter.name.as_str()) {
                problems.push(format!("Duplicate adapter name: {}", adapter.name));
            }
        }

        let role_of = |name: &str| {
            self.adapters
                .iter()
                .find(|adapter| adapter.name == name)
                .map(|adapter| adapter.role)
        };

        let mut ids = HashSet::new();
        for template in &self.templates {
            if !ids.insert(template.id.as_str()) {
                problems.push(format!("Duplicate template id: {}", template.id));
            }

            for (label, name, expected) in [
                ("source", &template.source, ProfileRole::Source),
                ("target", &template.target, ProfileRole::Target),
            ] {
                match role_of(name.as_str()) {
                    None => problems.push(format!(
                        "Template {} references unknown {} adapter: {}",
                        template.id, label, name
                    )),
                    Some(role) if role != expected => problems.push(format!(
                        "Template {} uses {} adapter {} as {}",
                        template.id, role, name, label
                    )),
                    Some(_) => {}
                }
            }

            for (index, version) in template.versions.iter().enumerate() {
                if version.rules.iter().any(|rule| rule.target_field.trim().is_empty()) {
                    problems.push(format!(
                        "Template {} version #{} has a rule with an empty target_field",
                        template.id,
                        index + 1
                    ));
                }
            }

            match resolved_numbers(&template.versions) {
                Err(problem) => problems.push(format!("Template {} {}", template.id, problem)),
                Ok(numbers) => {
                    if let Some(active) = template.active_version {
                        if !numbers.contains(&active) {
                            problems.push(format!(
                                "Template {} activates version {} which is not defined",
                                template.id, active
                            ));
                        }
                    }
                }
            }
        }

        problems
    }

    /// Transform names that `registry` does not know, as readable lines
    ///
    /// Unknown names are not an error: the rule passes its value through
    /// unchanged. Each name is reported once per template.
    pub fn unknown_transforms(&self, registry: &TransformRegistry) -> Vec<String> {
        let mut warnings = Vec::new();
        for template in &self.templates {
            let mut seen = HashSet::new();
            let calls = template
                .versions
                .iter()
                .flat_map(|version| &version.rules)
                .filter_map(|rule| TransformCall::parse(&rule.transform));
            for call in calls {
                if !registry.contains(&call.name) && seen.insert(call.name.clone()) {
                    warnings.push(format!(
                        "Template {} uses unknown transform {}; values pass through unchanged",
                        template.id, call.name
                    ));
                }
            }
        }
        warnings
    }

    /// Sync this manifest into `store`
    pub fn apply(&self, store: &MemoryConfigStore) -> Result<ManifestReport> {
        let problems = self.problems();
        if !problems.is_empty() {
            return Err(Error::validation(format!(
                "Manifest has {} problem(s): {}",
                problems.len(),
                problems.join("; ")
            )));
        }

        let mut report = ManifestReport {
            profiles: store.sync_profiles(self.adapters.clone())?,
            ..ManifestReport::default()
        };

        for spec in &self.templates {
            report.versions += apply_template(store, spec)?;
            report.templates.push(spec.id.clone());
        }

        info!(
            profiles = self.adapters.len(),
            templates = report.templates.len(),
            versions = report.versions,
            "Applied manifest"
        );
        Ok(report)
    }
}

/// Version numbers as the store would assign them
///
/// Fails when explicit numbers do not strictly increase or the automatic
/// numbering runs out, so `apply` never stops halfway through a template.
fn resolved_numbers(versions: &[VersionSpec]) -> std::result::Result<Vec<u32>, String> {
    let mut latest = 0u32;
    let mut numbers = Vec::with_capacity(versions.len());
    for (index, version) in versions.iter().enumerate() {
        latest = match version.version_number {
            Some(requested) if requested <= latest => {
                return Err(format!(
                    "version #{} has number {} which is not greater than {}",
                    index + 1,
                    requested,
                    latest
                ));
            }
            Some(requested) => requested,
            None => latest.checked_add(1).ok_or_else(|| {
                format!("version #{} exceeds the highest version number", index + 1)
            })?,
        };
        numbers.push(latest);
    }
    Ok(numbers)
}

fn apply_template(store: &MemoryConfigStore, spec: &TemplateSpec) -> Result<usize> {
    let profile_id = |name: &str| -> Result<String> {
        store
            .profile_by_name(name)?
            .map(|profile| profile.id)
            .ok_or_else(|| Error::NotFound {
                entity: "Profile",
                id: name.to_string(),
            })
    };

    if store.template(&spec.id)?.is_some() {
        store.delete_template(&spec.id)?;
    }

    let template = store.create_template(NewTemplate {
        id: Some(spec.id.clone()),
        name: spec.name.clone(),
        description: spec.description.clone(),
        source: profile_id(spec.source.as_str())?,
        target: profile_id(spec.target.as_str())?,
    })?;

    let mut active = None;
    for version in &spec.versions {
        let ruleset = store.create_version(&template.id, version.rules.clone(), version.version_number)?;
        let wanted = spec.active_version.map_or(true, |n| n == ruleset.version_number);
        if wanted {
            active = Some(ruleset.id.clone());
        }
    }

    if let Some(version_id) = active {
        store.activate_version(&template.id, &version_id)?;
    }

    Ok(spec.versions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConfigStore;
    use serde_json::json;

    fn manifest() -> Manifest {
        Manifest::from_json(json!({
            "adapters": [
                {"name": "erp", "type": "SOURCE", "api_url": "https://erp.example.com/companies/{cnpj}",
                 "auth": {"type": "Bearer", "token": "env:ERP_TOKEN"}},
                {"name": "crm", "type": "TARGET", "api_url": "https://crm.example.com/accounts",
                 "auth": {"type": "ApiKey", "value": "env:CRM_KEY"}}
            ],
            "templates": [
                {
                    "id": "erp-to-crm",
                    "name": "ERP to CRM",
                    "source": "erp",
                    "target": "crm",
                    "versions": [
                        {"rules": [{"source_path": "name", "target_field": "account_name"}]},
                        {"rules": [
                            {"source_path": "name", "target_field": "account_name", "transform": "UPPERCASE"},
                            {"source_path": "tax_id", "target_field": "document", "transform": "REMOVE_PUNCTUATION"}
                        ]}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_apply_activates_latest_by_default() {
        let store = MemoryConfigStore::new();
        let report = manifest().apply(&store).unwrap();

        assert_eq!(report.profiles.created.len(), 2);
        assert_eq!(report.templates, vec!["erp-to-crm".to_string()]);
        assert_eq!(report.versions, 2);

        let snapshot = store.snapshot("erp-to-crm").unwrap().unwrap();
        let ruleset = snapshot.ruleset.unwrap();
        assert_eq!(ruleset.version_number, 2);
        assert_eq!(ruleset.rules.len(), 2);
        assert_eq!(snapshot.source.name, "erp");
    }

    #[test]
    fn test_apply_explicit_active_version() {
        let mut manifest = manifest();
        manifest.templates[0].active_version = Some(1);
        let store = MemoryConfigStore::new();
        manifest.apply(&store).unwrap();

        let snapshot = store.snapshot("erp-to-crm").unwrap().unwrap();
        assert_eq!(snapshot.ruleset.unwrap().version_number, 1);
    }

    #[test]
    fn test_reapply_keeps_profile_ids() {
        let store = MemoryConfigStore::new();
        manifest().apply(&store).unwrap();
        let erp_id = store.profile_by_name("erp").unwrap().unwrap().id;

        let report = manifest().apply(&store).unwrap();
        assert_eq!(report.profiles.updated.len(), 2);
        assert_eq!(store.profile_by_name("erp").unwrap().unwrap().id, erp_id);
        assert_eq!(store.versions("erp-to-crm").unwrap().len(), 2);
    }

    #[test]
    fn test_problems_are_collected() {
        let mut manifest = manifest();
        manifest.templates[0].source = "crm".to_string();
        manifest.templates[0].target = "billing".to_string();
        manifest.templates[0].active_version = Some(9);

        let problems = manifest.problems();
        assert_eq!(problems.len(), 3, "{:?}", problems);

        let err = manifest.apply(&MemoryConfigStore::new()).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_decreasing_version_numbers_leave_store_untouched() {
        let mut manifest = manifest();
        manifest.templates[0].versions[0].version_number = Some(5);
        manifest.templates[0].versions[1].version_number = Some(3);

        let problems = manifest.problems();
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(problems[0].contains("version #2 has number 3"));

        let store = MemoryConfigStore::new();
        assert!(manifest.apply(&store).is_err());
        assert!(store.profiles().unwrap().is_empty());
        assert!(store.template("erp-to-crm").unwrap().is_none());
    }

    #[test]
    fn test_version_number_overflow_is_a_problem() {
        let mut manifest = manifest();
        manifest.templates[0].versions[0].version_number = Some(u32::MAX);
        manifest.templates[0].active_version = Some(u32::MAX);

        let problems = manifest.problems();
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(problems[0].contains("exceeds the highest version number"));

        assert_eq!(
            resolved_numbers(&manifest.templates[0].versions[..1]).unwrap(),
            vec![u32::MAX]
        );
    }

    #[test]
    fn test_unknown_transforms_are_reported_once() {
        let mut manifest = manifest();
        for version in &mut manifest.templates[0].versions {
            version.rules.push(
                Rule::new("name", "shout").with_transform("shout(3)"),
            );
        }

        let warnings = manifest.unknown_transforms(TransformRegistry::builtin());
        assert_eq!(
            warnings,
            vec!["Template erp-to-crm uses unknown transform SHOUT; values pass through unchanged".to_string()]
        );
        assert!(self::manifest().unknown_transforms(TransformRegistry::builtin()).is_empty());
    }

    #[test]
    fn test_unknown_auth_type_rejected() {
        let result = Manifest::from_json(json!({
            "adapters": [{"name": "x", "auth": {"type": "Digest"}}]
        }));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }
}
