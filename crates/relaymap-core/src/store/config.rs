//! In-memory configuration store
//!
//! Holds profiles, templates and rule-set versions behind one `RwLock`.
//! Critical sections are short and synchronous; nothing awaits while a guard
//! is held.

use super::{ConfigStore, TemplateSnapshot};
use crate::mapping::{Rule, RuleSet};
use crate::types::{AuthDescriptor, Profile, ProfileRole, Template};
use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Profile fields supplied by a caller; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub role: ProfileRole,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub auth: AuthDescriptor,
    #[serde(default)]
    pub schema: Option<Value>,
}

/// Template fields supplied by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    /// Explicit id; generated when `None`
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    /// Source profile id
    pub source: String,
    /// Target profile id
    pub target: String,
}

/// What a profile sync changed, by profile name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    /// Template ids removed because they referenced a deleted profile
    pub cascaded_templates: Vec<String>,
}

#[derive(Debug, Default)]
struct Inner {
    profiles: HashMap<String, Profile>,
    templates: HashMap<String, Template>,
    versions: HashMap<String, Arc<RuleSet>>,
}

impl Inner {
    fn profile_id_by_name(&self, name: &str) -> Option<String> {
        self.profiles
            .values()
            .find(|profile| profile.name == name)
            .map(|profile| profile.id.clone())
    }

    fn template_versions(&self, template_id: &str) -> impl Iterator<Item = &Arc<RuleSet>> {
        let template_id = template_id.to_string();
        self.versions
            .values()
            .filter(move |version| version.template_id == template_id)
    }

    fn remove_template(&mut self, template_id: &str) -> Option<Template> {
        let removed = self.templates.remove(template_id)?;
        self.versions.retain(|_, version| version.template_id != template_id);
        Some(removed)
    }

    /// Remove a profile and every template that references it
    fn remove_profile(&mut self, profile_id: &str) -> (Option<Profile>, Vec<String>) {
        let removed = self.profiles.remove(profile_id);
        let dependent: Vec<String> = self
            .templates
            .values()
            .filter(|template| template.source == profile_id || template.target == profile_id)
            .map(|template| template.id.clone())
            .collect();
        for template_id in &dependent {
            self.remove_template(template_id);
        }
        (removed, dependent)
    }
}

/// Process-local [`ConfigStore`] with the full editing API
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: RwLock<Inner>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| Error::store("Failed to acquire configuration read lock"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| Error::store("Failed to acquire configuration write lock"))
    }

    // ---- profiles ----

    /// Create or update the profile with this name; the id is kept on update
    pub fn upsert_profile(&self, new: NewProfile) -> Result<Profile> {
        if new.name.trim().is_empty() {
            return Err(Error::validation("Profile name cannot be empty"));
        }

        let mut inner = self.write()?;
        let id = inner
            .profile_id_by_name(&new.name)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let profile = Profile {
            id: id.clone(),
            name: new.name,
            role: new.role,
            api_url: new.api_url,
            auth: new.auth,
            schema: new.schema,
        };
        inner.profiles.insert(id, profile.clone());
        Ok(profile)
    }

    /// Make the stored profiles match `profiles` exactly, matching by name
    ///
    /// Profiles absent from the list are deleted along with the templates
    /// that use them.
    pub fn sync_profiles(&self, profiles: Vec<NewProfile>) -> Result<SyncReport> {
        let mut seen = HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.name.clone()) {
                return Err(Error::validation(format!(
                    "Duplicate profile name in sync: {}",
                    profile.name
                )));
            }
        }

        let mut report = SyncReport::default();
        for new in profiles {
            let existed = self.profile_by_name(&new.name)?.is_some();
            let profile = self.upsert_profile(new)?;
            if existed {
                report.updated.push(profile.name);
            } else {
                report.created.push(profile.name);
            }
        }

        let mut inner = self.write()?;
        let orphans: Vec<String> = inner
            .profiles
            .values()
            .filter(|profile| !seen.contains(&profile.name))
            .map(|profile| profile.id.clone())
            .collect();
        for id in orphans {
            let (removed, cascaded) = inner.remove_profile(&id);
            if let Some(profile) = removed {
                report.deleted.push(profile.name);
            }
            report.cascaded_templates.extend(cascaded);
        }
        drop(inner);

        report.deleted.sort();
        if !report.deleted.is_empty() {
            info!(deleted = ?report.deleted, "Deleted orphaned profiles");
        }
        Ok(report)
    }

    pub fn profile(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.read()?.profiles.get(id).cloned())
    }

    pub fn profile_by_name(&self, name: &str) -> Result<Option<Profile>> {
        let inner = self.read()?;
        Ok(inner
            .profile_id_by_name(name)
            .and_then(|id| inner.profiles.get(&id).cloned()))
    }

    /// All profiles, sorted by name
    pub fn profiles(&self) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.read()?.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    /// Delete a profile; returns the ids of templates removed with it
    pub fn delete_profile(&self, id: &str) -> Result<Vec<String>> {
        let mut inner = self.write()?;
        match inner.remove_profile(id) {
            (Some(_), cascaded) => Ok(cascaded),
            (None, _) => Err(Error::NotFound {
                entity: "Profile",
                id: id.to_string(),
            }),
        }
    }

    // ---- templates ----

    pub fn create_template(&self, new: NewTemplate) -> Result<Template> {
        let mut inner = self.write()?;

        for (label, profile_id) in [("Source", &new.source), ("Target", &new.target)] {
            if !inner.profiles.contains_key(profile_id) {
                return Err(Error::validation(format!(
                    "{} profile does not exist: {}",
                    label, profile_id
                )));
            }
        }

        let id = new.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if inner.templates.contains_key(&id) {
            return Err(Error::validation(format!("Template already exists: {}", id)));
        }

        let template = Template {
            id: id.clone(),
            name: new.name,
            description: new.description,
            source: new.source,
            target: new.target,
            active_version: None,
        };
        inner.templates.insert(id, template.clone());
        debug!(template_id = %template.id, "Created template");
        Ok(template)
    }

    pub fn template(&self, id: &str) -> Result<Option<Template>> {
        Ok(self.read()?.templates.get(id).cloned())
    }

    /// All templates, sorted by name
    pub fn templates(&self) -> Result<Vec<Template>> {
        let mut templates: Vec<Template> = self.read()?.templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(templates)
    }

    /// Delete a template and its versions; execution records are untouched
    pub fn delete_template(&self, id: &str) -> Result<Template> {
        self.write()?.remove_template(id).ok_or_else(|| Error::TemplateNotFound {
            id: id.to_string(),
        })
    }

    // ---- versions ----

    /// Freeze a new rule set for `template_id`
    ///
    /// Without an explicit number the version is `max + 1` (starting at 1);
    /// an explicit number must be greater than every existing one.
    pub fn create_version(
        &self,
        template_id: &str,
        rules: Vec<Rule>,
        version_number: Option<u32>,
    ) -> Result<Arc<RuleSet>> {
        if let Some(position) = rules.iter().position(|rule| rule.target_field.trim().is_empty()) {
            return Err(Error::validation(format!(
                "Rule {} has an empty target_field",
                position + 1
            )));
        }

        let mut inner = self.write()?;
        if !inner.templates.contains_key(template_id) {
            return Err(Error::TemplateNotFound {
                id: template_id.to_string(),
            });
        }

        let latest = inner
            .template_versions(template_id)
            .map(|version| version.version_number)
            .max()
            .unwrap_or(0);

        let version_number = match version_number {
            Some(requested) if requested <= latest => {
                return Err(Error::validation(format!(
                    "Version number {} must be greater than the latest version {}",
                    requested, latest
                )));
            }
            Some(requested) => requested,
            None => latest.checked_add(1).ok_or_else(|| {
                Error::validation(format!(
                    "Template {} has reached the highest version number {}",
                    template_id, latest
                ))
            })?,
        };

        let ruleset = Arc::new(RuleSet {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.to_string(),
            version_number,
            rules,
            created_at: Utc::now(),
        });
        inner.versions.insert(ruleset.id.clone(), Arc::clone(&ruleset));
        debug!(template_id, version_number, "Created mapping version");
        Ok(ruleset)
    }

    /// Point the template's active version at `version_id`
    pub fn activate_version(&self, template_id: &str, version_id: &str) -> Result<Template> {
        let mut inner = self.write()?;

        let owner = inner
            .versions
            .get(version_id)
            .map(|version| version.template_id.clone())
            .ok_or_else(|| Error::NotFound {
                entity: "Version",
                id: version_id.to_string(),
            })?;

        let template = inner
            .templates
            .get_mut(template_id)
            .ok_or_else(|| Error::TemplateNotFound {
                id: template_id.to_string(),
            })?;

        if owner != template_id {
            return Err(Error::validation(format!(
                "Version {} does not belong to template {}",
                version_id, template_id
            )));
        }

        template.active_version = Some(version_id.to_string());
        info!(template_id, version_id, "Activated mapping version");
        Ok(template.clone())
    }

    /// Versions of a template, newest first
    pub fn versions(&self, template_id: &str) -> Result<Vec<Arc<RuleSet>>> {
        let inner = self.read()?;
        let mut versions: Vec<Arc<RuleSet>> = inner.template_versions(template_id).cloned().collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    pub fn version(&self, version_id: &str) -> Result<Option<Arc<RuleSet>>> {
        Ok(self.read()?.versions.get(version_id).cloned())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn snapshot(&self, template_id: &str) -> Result<Option<TemplateSnapshot>> {
        let inner = self.read()?;

        let Some(template) = inner.templates.get(template_id) else {
            return Ok(None);
        };

        let lookup = |profile_id: &str| {
            inner.profiles.get(profile_id).cloned().ok_or_else(|| Error::NotFound {
                entity: "Profile",
                id: profile_id.to_string(),
            })
        };

        let ruleset = template
            .active_version
            .as_deref()
            .and_then(|version_id| inner.versions.get(version_id))
            .cloned();

        Ok(Some(TemplateSnapshot {
            template: template.clone(),
            source: lookup(&template.source)?,
            target: lookup(&template.target)?,
            ruleset,
        }))
    }
}
