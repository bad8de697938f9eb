use fleetguard_entity::{DbPatternKind, Platform, VulnKind};
use fleetguard_module_store::model::NewVulnerability;
use serde::Deserialize;

/// One decoded line of `labeled_update.jsonl` (`spec.md` §6.1). Every field
/// a malformed record might lack is `Option` so the caller decides whether
/// absence is fatal for *this* record, rather than serde rejecting the
/// whole line.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    pub bug_id: Option<String>,
    pub advisory_id: Option<String>,

    #[serde(alias = "vuln_type", alias = "type")]
    pub kind: Option<String>,

    pub platform: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub affected_versions: Option<AffectedVersions>,
    pub fixed_version: Option<String>,
    pub severity: Option<serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub hardware_model: Option<String>,
}

/// `affected_versions` is a string or an array of strings (`spec.md` §6.1);
/// an array is joined with spaces before handing it to
/// `VersionSemantics.parse_expression`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AffectedVersions {
    One(String),
    Many(Vec<String>),
}

impl AffectedVersions {
    fn joined(&self) -> String {
        match self {
            AffectedVersions::One(s) => s.clone(),
            AffectedVersions::Many(items) => items.join(" "),
        }
    }
}

fn parse_platform(raw: &str) -> Option<Platform> {
    match raw.trim() {
        "IOS-XE" => Some(Platform::IosXe),
        "IOS-XR" => Some(Platform::IosXr),
        "ASA" => Some(Platform::Asa),
        "FTD" => Some(Platform::Ftd),
        "NX-OS" => Some(Platform::NxOs),
        _ => None,
    }
}

fn parse_kind(raw: &str) -> Option<VulnKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bug" => Some(VulnKind::Bug),
        "psirt" | "advisory" => Some(VulnKind::Advisory),
        _ => None,
    }
}

/// Maps the two admissible `severity` encodings onto the internal 1-6 scale
/// (`spec.md` §6.1 "integer 1-6 or string {Critical, High, Medium, Low}
/// (mapped to 1/2/3/4)").
fn parse_severity(value: &serde_json::Value) -> Option<i16> {
    match value {
        serde_json::Value::Number(n) => {
            let i = n.as_i64()?;
            if (1..=6).contains(&i) { Some(i as i16) } else { None }
        }
        serde_json::Value::String(s) => match s.as_str() {
            "Critical" => Some(1),
            "High" => Some(2),
            "Medium" => Some(3),
            "Low" => Some(4),
            _ => None,
        },
        _ => None,
    }
}

/// A `RawRecord` that has passed every required-field and enum check, ready
/// to become a `NewVulnerability` (`spec.md` §6.1 apply step 2).
pub struct ParsedRecord {
    pub external_id: String,
    pub kind: VulnKind,
    pub platform: Platform,
    pub headline: String,
    pub summary: String,
    pub affected_versions_raw: String,
    pub fixed_version: Option<String>,
    pub severity: i16,
    pub labels: Vec<String>,
    pub hardware_model: Option<String>,
}

impl RawRecord {
    /// Validates all required fields, returning a human-readable error
    /// describing the first problem found (`spec.md` §7 `ValidationError`:
    /// "per-item rejection in batch").
    pub fn parse(self) -> Result<ParsedRecord, String> {
        let external_id = match (self.bug_id, self.advisory_id) {
            (Some(id), None) | (None, Some(id)) if !id.is_empty() => id,
            (Some(_), Some(_)) => {
                return Err("record has both bug_id and advisory_id, expected exactly one".into());
            }
            _ => return Err("record is missing bug_id/advisory_id".into()),
        };

        let kind = self
            .kind
            .as_deref()
            .and_then(parse_kind)
            .ok_or("record is missing a valid kind (bug/psirt/advisory)")?;

        let platform = self
            .platform
            .as_deref()
            .and_then(parse_platform)
            .ok_or("record is missing a valid platform")?;

        let headline = self.headline.filter(|s| !s.is_empty()).ok_or("record is missing headline")?;
        let summary = self.summary.filter(|s| !s.is_empty()).ok_or("record is missing summary")?;

        let affected_versions_raw = self
            .affected_versions
            .as_ref()
            .map(AffectedVersions::joined)
            .filter(|s| !s.is_empty())
            .ok_or("record is missing affected_versions")?;

        let severity = self
            .severity
            .as_ref()
            .and_then(parse_severity)
            .ok_or("record has an invalid severity")?;

        Ok(ParsedRecord {
            external_id,
            kind,
            platform,
            headline,
            summary,
            affected_versions_raw,
            fixed_version: self.fixed_version,
            severity,
            labels: self.labels,
            hardware_model: self.hardware_model,
        })
    }
}

impl ParsedRecord {
    /// Runs `affected_versions_raw` through `fleetguard_version::parse_expression`
    /// to populate the pattern fields `NewVulnerability` needs.
    pub fn into_new_vulnerability(self) -> NewVulnerability {
        let expr = fleetguard_version::parse_expression(&self.affected_versions_raw);
        let pattern_kind: DbPatternKind = expr
            .pattern_kind
            .unwrap_or(fleetguard_version::PatternKind::Unknown)
            .into();

        NewVulnerability {
            external_id: self.external_id,
            kind: self.kind,
            platform: self.platform,
            hardware_model: self.hardware_model,
            severity: self.severity,
            headline: self.headline,
            summary: self.summary,
            status: "confirmed".to_string(),
            advisory_url: None,
            affected_versions_raw: self.affected_versions_raw,
            pattern_kind,
            version_min: expr.version_min.map(|v| v.to_string()),
            version_max: expr.version_max.map(|v| v.to_string()),
            fixed_version: self.fixed_version,
            explicit_list: expr.explicit_list.iter().map(|v| v.to_string()).collect(),
            labels: self.labels,
            labels_source: fleetguard_entity::LabelsSource::Imported,
        }
    }
}
