//! Parent/child profile merge.
//!
//! Three rules apply, depending on the field:
//!
//! | Field                                   | Rule                                  |
//! |-----------------------------------------|---------------------------------------|
//! | `providers`, `tools`, `hooks`           | identity merge on `module`            |
//! | `config` maps, `session` extras, `ui`, `task` | recursive deep merge, child wins |
//! | `context`, `agents`                     | shallow merge, child keys replace     |
//!
//! Identity merge keeps the parent's order, folds a child entry into the parent
//! entry with the same `module` (child `source` wins only when present, `config`
//! deep-merged), and appends child entries the parent does not have.
//!
//! Session modules follow the identity rule when both sides name the same module;
//! a child naming a different module replaces the parent's wholesale.

use crate::profile::{ModuleRef, ProfileManifest, ResolvedProfile, SessionConfig};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Merges a parent manifest with a child manifest, child taking precedence.
///
/// The returned profile carries `inheritance_chain = [parent, child]`.
pub fn merge(parent: &ProfileManifest, child: &ProfileManifest) -> ResolvedProfile {
    let instruction =
        if child.instruction.trim().is_empty() { parent.instruction.clone() } else { child.instruction.clone() };

    ResolvedProfile {
        name: child.profile.name.clone(),
        schema_version: child.profile.schema_version,
        version: child.profile.version.clone(),
        description: child.profile.description.clone(),
        session: merge_session(&parent.session, &child.session),
        providers: merge_module_lists(&parent.providers, &child.providers),
        tools: merge_module_lists(&parent.tools, &child.tools),
        hooks: merge_module_lists(&parent.hooks, &child.hooks),
        agents: merge_shallow(&parent.agents, &child.agents),
        context: merge_shallow(&parent.context, &child.context),
        ui: merge_optional_maps(parent.ui.as_ref(), child.ui.as_ref()),
        task: merge_optional_maps(parent.task.as_ref(), child.task.as_ref()),
        instruction,
        inheritance_chain: vec![parent.profile.name.clone(), child.profile.name.clone()],
    }
}

/// Identity merge of two module lists keyed on `module`.
pub fn merge_module_lists(parent: &[ModuleRef], child: &[ModuleRef]) -> Vec<ModuleRef> {
    let mut merged: Vec<ModuleRef> = Vec::with_capacity(parent.len() + child.len());

    // Fold duplicates within the parent too, so the result never repeats an id
    for entry in parent.iter().chain(child) {
        match merged.iter_mut().find(|existing| existing.module == entry.module) {
            Some(existing) => *existing = merge_module(existing, entry),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

/// Merges two entries for the same module.
pub fn merge_module(parent: &ModuleRef, child: &ModuleRef) -> ModuleRef {
    ModuleRef {
        module: child.module.clone(),
        source: child.source.clone().or_else(|| parent.source.clone()),
        config: merge_optional_maps(parent.config.as_ref(), child.config.as_ref()),
    }
}

fn merge_session(parent: &SessionConfig, child: &SessionConfig) -> SessionConfig {
    SessionConfig {
        orchestrator: merge_session_module(parent.orchestrator.as_ref(), child.orchestrator.as_ref()),
        context_manager: merge_session_module(parent.context_manager.as_ref(), child.context_manager.as_ref()),
        extra: deep_merge_maps(&parent.extra, &child.extra),
    }
}

fn merge_session_module(parent: Option<&ModuleRef>, child: Option<&ModuleRef>) -> Option<ModuleRef> {
    match (parent, child) {
        (Some(p), Some(c)) if p.module == c.module => Some(merge_module(p, c)),
        (_, Some(c)) => Some(c.clone()),
        (Some(p), None) => Some(p.clone()),
        (None, None) => None,
    }
}

/// Shallow merge: child keys replace parent keys wholesale.
pub fn merge_shallow(parent: &BTreeMap<String, String>, child: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut merged = parent.clone();
    merged.extend(child.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn merge_optional_maps(
    parent: Option<&Map<String, Value>>,
    child: Option<&Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (parent, child) {
        (Some(p), Some(c)) => Some(deep_merge_maps(p, c)),
        (Some(p), None) => Some(p.clone()),
        (None, Some(c)) => Some(c.clone()),
        (None, None) => None,
    }
}

/// Deep merge of two JSON objects.
pub fn deep_merge_maps(parent: &Map<String, Value>, child: &Map<String, Value>) -> Map<String, Value> {
    match deep_merge_json(Value::Object(parent.clone()), &Value::Object(child.clone())) {
        Value::Object(map) => map,
        _ => child.clone(),
    }
}

/// Recursively merges `overrides` into `base`.
///
/// When both values are objects, keys are merged recursively; otherwise the
/// override replaces the base value. Arrays are replaced, not concatenated.
///
/// ```
/// use amplifier_profiles::merge::deep_merge_json;
/// use serde_json::json;
///
/// let base = json!({ "retry": { "attempts": 3, "backoff": "linear" } });
/// let overrides = json!({ "retry": { "backoff": "exponential" }, "verbose": true });
///
/// let result = deep_merge_json(base, &overrides);
/// assert_eq!(result, json!({ "retry": { "attempts": 3, "backoff": "exponential" }, "verbose": true }));
/// ```
pub fn deep_merge_json(mut base: Value, overrides: &Value) -> Value {
    match (base.as_object_mut(), overrides.as_object()) {
        (Some(base_obj), Some(override_obj)) => {
            for (key, override_value) in override_obj {
                match base_obj.get_mut(key) {
                    Some(base_value) if base_value.is_object() && override_value.is_object() => {
                        let merged = deep_merge_json(base_value.take(), override_value);
                        *base_value = merged;
                    }
                    _ => {
                        base_obj.insert(key.clone(), override_value.clone());
                    }
                }
            }
            base
        }
        _ => overrides.clone(),
    }
}
