//! Export profiles.
//!
//! A profile is one named combination of query, row transform, output path
//! and webhook policy. The built-in set can be extended or overridden from a
//! JSON file holding an array of profiles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use db::ScalarValue;
use serde::{Deserialize, Serialize};
use tracing::info;
use transform::{FieldMap, FieldType, Passthrough, RowTransformer};

use crate::EngineError;

// ---------------------------------------------------------------------------
// WebhookPolicy
// ---------------------------------------------------------------------------

/// Whether a profile forwards its records to `<NAME>_ENDPOINT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookPolicy {
    /// Never send.
    #[default]
    None,
    /// Send when an endpoint is configured, skip silently otherwise.
    Optional,
    /// A missing endpoint is a configuration error.
    Required,
}

impl std::fmt::Display for WebhookPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Optional => write!(f, "optional"),
            Self::Required => write!(f, "required"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransformSpec
// ---------------------------------------------------------------------------

/// Which [`RowTransformer`] a profile uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    #[default]
    Passthrough,
    Fields { fields: FieldMap },
}

// ---------------------------------------------------------------------------
// ExportProfile
// ---------------------------------------------------------------------------

/// A complete export definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportProfile {
    /// Also the webhook `service` value and the `<NAME>_ENDPOINT` key.
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub params: Vec<ScalarValue>,
    #[serde(default)]
    pub transform: TransformSpec,
    pub output_path: PathBuf,
    #[serde(default)]
    pub webhook: WebhookPolicy,
    /// Column compared against a caller-supplied brand filter.
    #[serde(default)]
    pub brand_column: Option<String>,
}

impl ExportProfile {
    /// Completed customer-journey jobs from the last 30 days, forwarded to
    /// the Birdeye review-request webhook.
    pub fn birdeye() -> Self {
        Self {
            name: "birdeye".into(),
            query: r#"
                SELECT
                    id,
                    brand_name,
                    customer_name,
                    email,
                    phone,
                    address,
                    city,
                    state,
                    zip,
                    service_type,
                    job_completed_date,
                    actual_value,
                    notes
                FROM customer_journey
                WHERE journey_stage = 'Job Completed'
                    AND active = 1
                    AND job_completed_date >= DATE_SUB(CURDATE(), INTERVAL 30 DAY)
                ORDER BY job_completed_date DESC
            "#
            .into(),
            params: Vec::new(),
            transform: TransformSpec::Passthrough,
            output_path: "exports/birdeye_export.json".into(),
            webhook: WebhookPolicy::Required,
            brand_column: Some("brand_name".into()),
        }
    }

    /// Template profile: active rows from `your_table`, reduced to id and name.
    pub fn example_service() -> Self {
        Self {
            name: "example_service".into(),
            query: r#"
                SELECT
                    id,
                    name,
                    created_date
                FROM your_table
                WHERE status = ?
            "#
            .into(),
            params: vec![ScalarValue::Text("active".into())],
            transform: TransformSpec::Fields {
                fields: FieldMap::new()
                    .copy("id", "id")
                    .copy_or("name", "name", FieldType::String),
            },
            output_path: "exports/example_export.json".into(),
            webhook: WebhookPolicy::None,
            brand_column: None,
        }
    }

    pub fn transformer(&self) -> &dyn RowTransformer {
        match &self.transform {
            TransformSpec::Passthrough => &Passthrough,
            TransformSpec::Fields { fields } => fields,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: String| EngineError::InvalidProfile {
            name: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        if self.query.trim().is_empty() {
            return Err(invalid("query must not be empty".into()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(invalid("output_path must not be empty".into()));
        }
        if let TransformSpec::Fields { fields } = &self.transform {
            fields.validate().map_err(|e| invalid(e.to_string()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProfileRegistry
// ---------------------------------------------------------------------------

/// Name → profile lookup.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ExportProfile>,
}

impl ProfileRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The profiles shipped with the binary.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for profile in [ExportProfile::birdeye(), ExportProfile::example_service()] {
            registry.profiles.insert(profile.name.clone(), profile);
        }
        registry
    }

    /// Validate and add `profile`, replacing any profile with the same name.
    pub fn insert(&mut self, profile: ExportProfile) -> Result<(), EngineError> {
        profile.validate()?;
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Merge profiles from a JSON file (an array of profiles) into this registry.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("cannot read profile file {}: {e}", path.display()))
        })?;
        let loaded: Vec<ExportProfile> = serde_json::from_str(&text).map_err(|e| {
            EngineError::Configuration(format!("invalid profile file {}: {e}", path.display()))
        })?;

        let count = loaded.len();
        for profile in loaded {
            self.insert(profile)?;
        }
        info!("Loaded {} export profiles from {}", count, path.display());
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Result<&ExportProfile, EngineError> {
        self.profiles
            .get(name)
            .ok_or_else(|| EngineError::UnknownProfile(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExportProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
