//! Production job rules shared by the service and the bridge.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::customize::{ResolvedAssets, VariantConfiguration};
use crate::error::CoreError;
use crate::types::DbId;

/// Instructions claimed per request when the caller does not say.
pub const DEFAULT_CLAIM_LIMIT: i64 = 5;

/// Upper bound on instructions claimed per request.
pub const MAX_CLAIM_LIMIT: i64 = 50;

pub fn clamp_claim_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_CLAIM_LIMIT)
        .clamp(1, MAX_CLAIM_LIMIT)
}

/// Final export formats, in preference order for the primary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Native editable master (`.ai`).
    Master,
    Vector,
    PrintReady,
    Raster,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Master,
        ExportFormat::Vector,
        ExportFormat::PrintReady,
        ExportFormat::Raster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Master => "master",
            ExportFormat::Vector => "vector",
            ExportFormat::PrintReady => "print_ready",
            ExportFormat::Raster => "raster",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Master => "ai",
            ExportFormat::Vector => "svg",
            ExportFormat::PrintReady => "pdf",
            ExportFormat::Raster => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Master => "application/postscript",
            ExportFormat::Vector => "image/svg+xml",
            ExportFormat::PrintReady => "application/pdf",
            ExportFormat::Raster => "image/png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    /// Accepts the format name or its file extension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s || f.extension() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown export format '{s}'")))
    }
}

/// Uploaded artifact refs keyed by format.
pub type ArtifactMap = BTreeMap<ExportFormat, String>;

/// The artifact recorded as a variant's final ref: the master when present,
/// otherwise the first available in format order.
pub fn primary_artifact(artifacts: &ArtifactMap) -> Option<&str> {
    artifacts.values().next().map(String::as_str)
}

/// Snapshot stored with an instruction when it is enqueued, so later
/// edits to the variant or catalog do not change what gets produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSnapshot {
    pub variant_name: String,
    pub template_id: DbId,
    pub configuration: VariantConfiguration,
    pub assets: ResolvedAssets,
}

/// Outcome of planning an enqueue request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnqueuePlan {
    pub create: Vec<DbId>,
    pub skipped: Vec<DbId>,
}

/// Split requested variant ids into ones that get a new instruction and
/// ones that are skipped. `eligible` decides for ids seen for the first
/// time; repeats within the request are always skipped.
pub fn plan_enqueue(requested: &[DbId], mut eligible: impl FnMut(DbId) -> bool) -> EnqueuePlan {
    let mut seen = HashSet::new();
    let mut plan = EnqueuePlan::default();
    for &id in requested {
        if seen.insert(id) && eligible(id) {
            plan.create.push(id);
        } else {
            plan.skipped.push(id);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!("master".parse::<ExportFormat>().ok(), Some(ExportFormat::Master));
        assert_eq!("pdf".parse::<ExportFormat>().ok(), Some(ExportFormat::PrintReady));
        assert_eq!("print_ready".parse::<ExportFormat>().ok(), Some(ExportFormat::PrintReady));
        assert_matches!("tiff".parse::<ExportFormat>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn format_serializes_snake_case() {
        let json = serde_json::to_string(&ExportFormat::PrintReady).expect("serialize");
        assert_eq!(json, "\"print_ready\"");
    }

    #[test]
    fn primary_prefers_master() {
        let mut artifacts = ArtifactMap::new();
        artifacts.insert(ExportFormat::Raster, "r.png".into());
        artifacts.insert(ExportFormat::Vector, "v.svg".into());
        assert_eq!(primary_artifact(&artifacts), Some("v.svg"));
        artifacts.insert(ExportFormat::Master, "m.ai".into());
        assert_eq!(primary_artifact(&artifacts), Some("m.ai"));
        assert_eq!(primary_artifact(&ArtifactMap::new()), None);
    }

    #[test]
    fn duplicates_are_created_once() {
        let plan = plan_enqueue(&[1, 2, 1, 3], |id| id != 3);
        assert_eq!(plan.create, vec![1, 2]);
        assert_eq!(plan.skipped, vec![1, 3]);
    }

    #[test]
    fn claim_limit_bounds() {
        assert_eq!(clamp_claim_limit(None), DEFAULT_CLAIM_LIMIT);
        assert_eq!(clamp_claim_limit(Some(0)), 1);
        assert_eq!(clamp_claim_limit(Some(500)), MAX_CLAIM_LIMIT);
    }
}
