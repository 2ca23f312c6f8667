//! Activity create/patch documents.
//!
//! Both sync payloads and interactive requests deserialize into these, so
//! the two paths cannot disagree on what a field means.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::details::ActivityType;
use crate::error::CoreError;
use crate::types::DbId;

/// Fields required to create an activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    pub site_id: DbId,
    pub activity_type: ActivityType,
    pub activity_date: NaiveDate,
    #[serde(default = "empty_object")]
    pub details: Value,
    pub notes: Option<String>,
    /// Links an offline-created activity back to the device change that made it.
    pub client_change_id: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl CreateActivity {
    pub fn from_payload(payload: &Value) -> Result<Self, CoreError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed activity payload: {e}")))
    }
}

/// Last-write-wins patch: every present field overwrites, absent fields
/// are left untouched.
///
/// `notes` is doubly optional so an explicit `null` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPatch {
    pub site_id: Option<DbId>,
    pub activity_type: Option<ActivityType>,
    pub activity_date: Option<NaiveDate>,
    pub details: Option<Value>,
    pub notes: Option<Option<String>>,
}

fn field<T: serde::de::DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, CoreError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| CoreError::Validation(format!("Invalid '{key}': {e}"))),
    }
}

impl ActivityPatch {
    /// Build a patch from a JSON object. Unknown and server-owned keys
    /// (`status`, `createdBy`, `approvedBy`, ...) are ignored.
    pub fn from_payload(payload: &Value) -> Result<Self, CoreError> {
        let obj = payload.as_object().ok_or_else(|| {
            CoreError::Validation("Activity update payload must be a JSON object".to_string())
        })?;

        let details: Option<Value> = field(obj, "details")?;
        if let Some(d) = &details {
            if !d.is_object() {
                return Err(CoreError::Validation(
                    "Invalid 'details': expected an object".to_string(),
                ));
            }
        }

        Ok(Self {
            site_id: field(obj, "siteId")?,
            activity_type: field(obj, "activityType")?,
            activity_date: field(obj, "activityDate")?,
            details,
            notes: field(obj, "notes")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the derived quantities need recomputing.
    pub fn touches_details(&self) -> bool {
        self.details.is_some() || self.activity_type.is_some()
    }
}
