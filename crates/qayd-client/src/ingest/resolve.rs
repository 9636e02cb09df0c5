use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::contracts::types::{
    CodeMapping, Confidence, DimensionResolution, OverrideRecord, ResolutionReport,
};
use crate::ingest::normalize::clean_text;
use crate::store::TargetStore;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Dimension {
    Account,
    Classification,
    Project,
    WorkAnalysis,
    SubTree,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Self::Account,
        Self::Classification,
        Self::Project,
        Self::WorkAnalysis,
        Self::SubTree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::Classification => "classifications",
            Self::Project => "projects",
            Self::WorkAnalysis => "work_analysis",
            Self::SubTree => "sub_tree",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accounts" | "account" => Some(Self::Account),
            "classifications" | "classification" => Some(Self::Classification),
            "projects" | "project" => Some(Self::Project),
            "work_analysis" | "work_analyses" => Some(Self::WorkAnalysis),
            "sub_tree" | "sub_tree_items" | "subtree" => Some(Self::SubTree),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::Classification => "transaction_classifications",
            Self::Project => "projects",
            Self::WorkAnalysis => "analysis_work_items",
            Self::SubTree => "sub_tree",
        }
    }

    /// Accounts match on their legacy code; the current `code` is a different numbering.
    pub fn match_column(&self) -> &'static str {
        match self {
            Self::Account => "legacy_code",
            _ => "code",
        }
    }

    pub fn line_column(&self) -> &'static str {
        match self {
            Self::Account => "account_id",
            Self::Classification => "classification_id",
            Self::Project => "project_id",
            Self::WorkAnalysis => "work_analysis_id",
            Self::SubTree => "sub_tree_id",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Resolution {
    Resolved { id: String, confidence: Confidence },
    /// No code was supplied.
    Absent,
    Unresolved,
}

pub(crate) type OverrideSet = BTreeMap<Dimension, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default)]
struct DimensionCache {
    observed: BTreeSet<String>,
    map: HashMap<String, (String, Confidence)>,
    unresolved: BTreeSet<String>,
    ambiguous: BTreeSet<String>,
    overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ReferenceResolver {
    tenant_id: Option<String>,
    skipped: bool,
    caches: BTreeMap<Dimension, DimensionCache>,
}

impl ReferenceResolver {
    /// Builds code→id caches for every dimension from the tenant's reference tables.
    pub(crate) fn build(
        store: &dyn TargetStore,
        tenant_id: &str,
        observed: &BTreeMap<Dimension, BTreeSet<String>>,
        overrides: &OverrideSet,
    ) -> ClientResult<Self> {
        let mut caches = BTreeMap::new();

        for dimension in Dimension::ALL {
            let mut cache = DimensionCache::default();
            let rows = store.reference_rows(dimension.table(), dimension.match_column(), tenant_id)?;

            let mut by_code: HashMap<String, Vec<String>> = HashMap::new();
            for row in rows {
                if let Some(code) = row.code.as_deref().map(fold_code)
                    && !code.is_empty()
                {
                    by_code.entry(code).or_default().push(row.id);
                }
            }

            for code in observed.get(&dimension).into_iter().flatten() {
                let folded = fold_code(code);
                cache.observed.insert(folded.clone());
                match by_code.get(&folded).map(Vec::as_slice) {
                    Some([id]) => {
                        cache.map.insert(folded, (id.clone(), Confidence::Exact));
                    }
                    Some(ids) if ids.len() > 1 => {
                        cache.ambiguous.insert(folded.clone());
                        cache.unresolved.insert(folded);
                    }
                    _ => {
                        cache.unresolved.insert(folded);
                    }
                }
            }

            if let Some(manual) = overrides.get(&dimension) {
                let targets = manual.values().cloned().collect::<Vec<String>>();
                let existing = store.existing_ids(dimension.table(), tenant_id, &targets)?;
                for (code, target_id) in manual {
                    let folded = fold_code(code);
                    let status = if existing.contains(target_id) {
                        cache
                            .map
                            .insert(folded.clone(), (target_id.clone(), Confidence::Manual));
                        cache.unresolved.remove(&folded);
                        cache.ambiguous.remove(&folded);
                        "applied"
                    } else {
                        warn!(
                            dimension = dimension.as_str(),
                            code = folded.as_str(),
                            target_id = target_id.as_str(),
                            "override target does not exist for tenant"
                        );
                        "override_target_missing"
                    };
                    cache.overrides.push(OverrideRecord {
                        dimension: dimension.as_str().to_string(),
                        code: folded,
                        target_id: target_id.clone(),
                        confidence: Confidence::Manual,
                        status: status.to_string(),
                    });
                }
            }

            debug!(
                dimension = dimension.as_str(),
                reference_codes = by_code.len(),
                resolved = cache.map.len(),
                unresolved = cache.unresolved.len(),
                "built code map"
            );
            if dimension != Dimension::Account && !cache.unresolved.is_empty() {
                warn!(
                    dimension = dimension.as_str(),
                    unresolved = cache.unresolved.len(),
                    "optional dimension codes did not resolve and will load as null"
                );
            }
            caches.insert(dimension, cache);
        }

        Ok(Self {
            tenant_id: Some(tenant_id.to_string()),
            skipped: false,
            caches,
        })
    }

    /// A resolver for dry runs without a tenant; every lookup is unresolved.
    pub(crate) fn skipped(observed: &BTreeMap<Dimension, BTreeSet<String>>) -> Self {
        let caches = Dimension::ALL
            .into_iter()
            .map(|dimension| {
                let observed = observed
                    .get(&dimension)
                    .into_iter()
                    .flatten()
                    .map(|code| fold_code(code))
                    .collect::<BTreeSet<String>>();
                (
                    dimension,
                    DimensionCache {
                        observed,
                        ..DimensionCache::default()
                    },
                )
            })
            .collect();
        Self {
            tenant_id: None,
            skipped: true,
            caches,
        }
    }

    pub(crate) fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub(crate) fn resolve(&self, dimension: Dimension, code: Option<&str>) -> Resolution {
        let Some(code) = code else {
            return Resolution::Absent;
        };
        let folded = fold_code(code);
        if folded.is_empty() {
            return Resolution::Absent;
        }
        match self
            .caches
            .get(&dimension)
            .and_then(|cache| cache.map.get(&folded))
        {
            Some((id, confidence)) => Resolution::Resolved {
                id: id.clone(),
                confidence: *confidence,
            },
            None => Resolution::Unresolved,
        }
    }

    pub(crate) fn is_ambiguous(&self, dimension: Dimension, code: &str) -> bool {
        self.caches
            .get(&dimension)
            .is_some_and(|cache| cache.ambiguous.contains(&fold_code(code)))
    }

    pub(crate) fn overrides(&self) -> Vec<OverrideRecord> {
        self.caches
            .values()
            .flat_map(|cache| cache.overrides.iter().cloned())
            .collect()
    }

    pub(crate) fn report(&self) -> ResolutionReport {
        let dimensions = self
            .caches
            .iter()
            .map(|(dimension, cache)| {
                let mut mappings = cache
                    .map
                    .iter()
                    .filter(|(code, _)| cache.observed.contains(*code))
                    .map(|(code, (id, confidence))| CodeMapping {
                        code: code.clone(),
                        target_id: id.clone(),
                        confidence: *confidence,
                    })
                    .collect::<Vec<CodeMapping>>();
                mappings.sort_by(|left, right| left.code.cmp(&right.code));
                DimensionResolution {
                    dimension: dimension.as_str().to_string(),
                    reference_table: dimension.table().to_string(),
                    match_column: dimension.match_column().to_string(),
                    observed: cache.observed.len() as i64,
                    resolved: mappings.len() as i64,
                    unresolved: if self.skipped {
                        Vec::new()
                    } else {
                        cache.unresolved.iter().cloned().collect()
                    },
                    ambiguous: cache.ambiguous.iter().cloned().collect(),
                    overrides: cache.overrides.clone(),
                    mappings,
                }
            })
            .collect();

        ResolutionReport {
            tenant_id: self.tenant_id.clone(),
            skipped: self.skipped,
            dimensions,
        }
    }
}

/// Folds a code for comparison: cleaned, digits folded, and `7.0` rendered as `7`.
pub(crate) fn fold_code(code: &str) -> String {
    let Some(cleaned) = clean_text(code, true) else {
        return String::new();
    };
    if let Some((whole, fraction)) = cleaned.split_once('.') {
        let whole_is_integer = !whole.is_empty()
            && whole
                .strip_prefix('-')
                .unwrap_or(whole)
                .chars()
                .all(|ch| ch.is_ascii_digit());
        if whole_is_integer && !fraction.is_empty() && fraction.chars().all(|ch| ch == '0') {
            return whole.to_string();
        }
    }
    cleaned
}

pub(crate) fn load_override_file(path: &Path) -> ClientResult<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)
        .map_err(|error| ClientError::override_file_invalid(path, &error.to_string()))?;
    let parsed = serde_json::from_str::<Value>(&content)
        .map_err(|error| ClientError::override_file_invalid(path, &error.to_string()))?;
    let Value::Object(object) = parsed else {
        return Err(ClientError::override_file_invalid(
            path,
            "top-level value must be an object",
        ));
    };

    let mut output = BTreeMap::new();
    for (code, target) in object {
        match target {
            Value::String(target_id) if !target_id.trim().is_empty() => {
                output.insert(code, target_id.trim().to_string());
            }
            other => {
                return Err(ClientError::override_file_invalid(
                    path,
                    &format!("target for `{code}` must be a non-empty string, got {other}"),
                ));
            }
        }
    }
    Ok(output)
}
