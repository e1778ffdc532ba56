//! RuleRegistry — loads and indexes the versioned rule catalog.
//!
//! One recognized rule id per compliance check, keyed per module. Loaded
//! once at process start, then shared read-only; no module may mutate it.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::types::{ModuleKind, Rule};
use super::CatalogError;

/// The default rule catalog shipped with the crate. Deployments override it
/// with a versioned catalog file.
const DEFAULT_CATALOG: &str = include_str!("default_catalog.json");

/// Wire form of the catalog file.
#[derive(Deserialize)]
struct CatalogFile {
    version: String,
    modules: HashMap<String, Vec<Rule>>,
}

/// Read-only index over the rule catalog.
#[derive(Debug)]
pub struct RuleRegistry {
    version: String,
    /// Per module: insertion-ordered rules plus an id index into that Vec.
    modules: HashMap<ModuleKind, ModuleRules>,
}

#[derive(Debug)]
struct ModuleRules {
    rules: Vec<Rule>,
    by_id: HashMap<String, usize>,
}

impl RuleRegistry {
    /// Parse a catalog from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))?;

        let mut modules: HashMap<ModuleKind, ModuleRules> = HashMap::new();
        for (module_name, rules) in file.modules {
            let Some(kind) = ModuleKind::from_str(&module_name) else {
                // Catalogs may carry modules this build does not ship; skip
                // them rather than failing the whole load.
                tracing::warn!(module = %module_name, "Skipping unrecognized catalog module");
                continue;
            };

            let mut by_id = HashMap::with_capacity(rules.len());
            for (i, rule) in rules.iter().enumerate() {
                if by_id.insert(rule.id.clone(), i).is_some() {
                    return Err(CatalogError::DuplicateRule {
                        module: module_name.clone(),
                        rule_id: rule.id.clone(),
                    });
                }
            }
            modules.insert(kind, ModuleRules { rules, by_id });
        }

        if modules.values().all(|m| m.rules.is_empty()) {
            return Err(CatalogError::Empty);
        }

        tracing::info!(
            version = %file.version,
            modules = modules.len(),
            rules = modules.values().map(|m| m.rules.len()).sum::<usize>(),
            "Rule catalog loaded"
        );

        Ok(Self {
            version: file.version,
            modules,
        })
    }

    /// Load a catalog from a file on disk.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_json_str(DEFAULT_CATALOG).expect("embedded catalog must be valid")
    }

    /// Catalog version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All rules for a module, in catalog order. Empty if the module has no
    /// catalog entry.
    pub fn rules_for(&self, module: ModuleKind) -> &[Rule] {
        self.modules
            .get(&module)
            .map(|m| m.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `rule_id` is a recognized catalog entry for `module`.
    pub fn contains(&self, module: ModuleKind, rule_id: &str) -> bool {
        self.modules
            .get(&module)
            .is_some_and(|m| m.by_id.contains_key(rule_id))
    }

    /// Look up a rule by module and id.
    pub fn get(&self, module: ModuleKind, rule_id: &str) -> Option<&Rule> {
        let m = self.modules.get(&module)?;
        m.by_id.get(rule_id).map(|&i| &m.rules[i])
    }

    /// Total rule count across modules.
    pub fn rule_count(&self) -> usize {
        self.modules.values().map(|m| m.rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Severity;

    #[test]
    fn builtin_catalog_loads() {
        let registry = RuleRegistry::builtin();
        assert!(!registry.version().is_empty());
        assert!(registry.rule_count() > 0);
        for module in ModuleKind::all() {
            assert!(
                !registry.rules_for(*module).is_empty(),
                "builtin catalog should cover {module}"
            );
        }
    }

    #[test]
    fn contains_and_get_agree() {
        let registry = RuleRegistry::builtin();
        assert!(registry.contains(ModuleKind::Disclaimers, "1.1"));
        let rule = registry.get(ModuleKind::Disclaimers, "1.1").unwrap();
        assert_eq!(rule.severity, Severity::Critical);

        assert!(!registry.contains(ModuleKind::Disclaimers, "FR_INVENTED_001"));
        assert!(registry.get(ModuleKind::Disclaimers, "FR_INVENTED_001").is_none());
    }

    #[test]
    fn rule_id_is_scoped_to_module() {
        let registry = RuleRegistry::builtin();
        // "1.1" is a disclaimers id; it must not leak into other modules.
        assert!(!registry.contains(ModuleKind::Performance, "1.1"));
    }

    #[test]
    fn duplicate_rule_id_rejected() {
        let json = r#"{
            "version": "t",
            "modules": {
                "structure": [
                    {"id": "S.1", "description": "a", "severity": "minor"},
                    {"id": "S.1", "description": "b", "severity": "minor"}
                ]
            }
        }"#;
        let err = RuleRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRule { .. }));
    }

    #[test]
    fn unrecognized_module_skipped() {
        let json = r#"{
            "version": "t",
            "modules": {
                "structure": [{"id": "S.1", "description": "a", "severity": "minor"}],
                "astrology": [{"id": "A.1", "description": "b", "severity": "minor"}]
            }
        }"#;
        let registry = RuleRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.rule_count(), 1);
    }

    #[test]
    fn empty_catalog_rejected() {
        let json = r#"{"version": "t", "modules": {}}"#;
        assert!(matches!(
            RuleRegistry::from_json_str(json),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            RuleRegistry::from_json_str("{not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn rules_for_unknown_module_is_empty() {
        let json = r#"{
            "version": "t",
            "modules": {"structure": [{"id": "S.1", "description": "a", "severity": "minor"}]}
        }"#;
        let registry = RuleRegistry::from_json_str(json).unwrap();
        assert!(registry.rules_for(ModuleKind::Esg).is_empty());
    }
}
