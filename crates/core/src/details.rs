//! Activity types, their detail schemas, and derived quantities.
//!
//! Each [`ActivityType`] maps to one [`ActivityDetails`] variant with its own
//! validated structure. Raw dimensional inputs come from the client; the
//! derived fields (`theoreticalVolume`, `actualVolume`, `truckVolumeTotal`,
//! `overconsumptionPct`) are written back into the stored document by
//! [`enrich_details`].

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

pub const KEY_THEORETICAL_VOLUME: &str = "theoreticalVolume";
pub const KEY_ACTUAL_VOLUME: &str = "actualVolume";
pub const KEY_TRUCK_VOLUME_TOTAL: &str = "truckVolumeTotal";
pub const KEY_OVERCONSUMPTION_PCT: &str = "overconsumptionPct";

const DERIVED_KEYS: &[&str] = &[
    KEY_THEORETICAL_VOLUME,
    KEY_ACTUAL_VOLUME,
    KEY_TRUCK_VOLUME_TOTAL,
    KEY_OVERCONSUMPTION_PCT,
];

// ---------------------------------------------------------------------------
// Activity types
// ---------------------------------------------------------------------------

/// The kind of field work an activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    BoredPiling,
    Micropile,
    Caisson,
    DiaphragmWall,
    Pilecap,
    DrivenPiling,
    SheetPiling,
    GroundAnchor,
    PileLoadTest,
}

pub const ALL_ACTIVITY_TYPES: &[ActivityType] = &[
    ActivityType::BoredPiling,
    ActivityType::Micropile,
    ActivityType::Caisson,
    ActivityType::DiaphragmWall,
    ActivityType::Pilecap,
    ActivityType::DrivenPiling,
    ActivityType::SheetPiling,
    ActivityType::GroundAnchor,
    ActivityType::PileLoadTest,
];

/// Unit a raw length input is captured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimetres,
    Metres,
}

impl LengthUnit {
    pub fn to_metres(self, value: f64) -> f64 {
        match self {
            LengthUnit::Millimetres => value / 1000.0,
            LengthUnit::Metres => value,
        }
    }
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::BoredPiling => "BORED_PILING",
            ActivityType::Micropile => "MICROPILE",
            ActivityType::Caisson => "CAISSON",
            ActivityType::DiaphragmWall => "DIAPHRAGM_WALL",
            ActivityType::Pilecap => "PILECAP",
            ActivityType::DrivenPiling => "DRIVEN_PILING",
            ActivityType::SheetPiling => "SHEET_PILING",
            ActivityType::GroundAnchor => "GROUND_ANCHOR",
            ActivityType::PileLoadTest => "PILE_LOAD_TEST",
        }
    }

    /// Unit the `diameter` input is captured in, for circular sections.
    ///
    /// Bored piles and micropiles are logged in millimetres, caissons in
    /// metres. Field crews enter them that way, so the asymmetry is kept.
    pub fn diameter_unit(self) -> Option<LengthUnit> {
        match self {
            ActivityType::BoredPiling | ActivityType::Micropile => Some(LengthUnit::Millimetres),
            ActivityType::Caisson => Some(LengthUnit::Metres),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_ACTIVITY_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown activity type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Detail schemas
// ---------------------------------------------------------------------------

/// One concrete delivery. Trucks are counted unless explicitly refused.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckLog {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub volume: f64,
    pub accepted: Option<bool>,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Circular pile / shaft section (bored pile, micropile, caisson).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularSection {
    pub diameter: Option<f64>,
    pub depth: Option<f64>,
    pub concrete_volume: Option<f64>,
    pub truck_logs: Option<Vec<TruckLog>>,
}

/// Rectangular section (diaphragm wall panel, pilecap). Metres throughout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectangularSection {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub concrete_volume: Option<f64>,
    pub truck_logs: Option<Vec<TruckLog>>,
}

/// Work with no geometric volume model (driven/sheet piles, anchors, tests).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmeasuredWork {
    pub concrete_volume: Option<f64>,
    pub truck_logs: Option<Vec<TruckLog>>,
}

/// Tagged union of per-type detail schemas.
#[derive(Debug, Clone)]
pub enum ActivityDetails {
    BoredPiling(CircularSection),
    Micropile(CircularSection),
    Caisson(CircularSection),
    DiaphragmWall(RectangularSection),
    Pilecap(RectangularSection),
    DrivenPiling(UnmeasuredWork),
    SheetPiling(UnmeasuredWork),
    GroundAnchor(UnmeasuredWork),
    PileLoadTest(UnmeasuredWork),
}

/// Quantities computed from raw detail inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedQuantities {
    /// Geometric volume in m³, rounded to 3 decimals.
    pub theoretical_volume: Option<f64>,
    /// Explicit `concreteVolume`, else the accepted truck total.
    pub actual_volume: Option<f64>,
    pub truck_volume_total: Option<f64>,
    /// Rounded to one decimal; zero when the theoretical volume is not positive.
    pub overconsumption_pct: Option<f64>,
}

fn parse_schema<T: DeserializeOwned>(kind: ActivityType, value: &Value) -> Result<T, CoreError> {
    serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Validation(format!("Malformed {kind} details: {e}")))
}

fn check_non_negative(kind: ActivityType, field: &str, v: Option<f64>) -> Result<(), CoreError> {
    match v {
        Some(x) if !x.is_finite() || x < 0.0 => Err(CoreError::Validation(format!(
            "{kind} details: '{field}' must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

impl CircularSection {
    fn validate(&self, kind: ActivityType) -> Result<(), CoreError> {
        check_non_negative(kind, "diameter", self.diameter)?;
        check_non_negative(kind, "depth", self.depth)?;
        check_non_negative(kind, "concreteVolume", self.concrete_volume)
    }

    fn theoretical_volume(&self, unit: LengthUnit) -> Option<f64> {
        let radius = unit.to_metres(self.diameter?) / 2.0;
        Some(PI * radius * radius * self.depth?)
    }
}

impl RectangularSection {
    fn validate(&self, kind: ActivityType) -> Result<(), CoreError> {
        check_non_negative(kind, "length", self.length)?;
        check_non_negative(kind, "width", self.width)?;
        check_non_negative(kind, "depth", self.depth)?;
        check_non_negative(kind, "concreteVolume", self.concrete_volume)
    }

    fn theoretical_volume(&self) -> Option<f64> {
        Some(self.length? * self.width? * self.depth?)
    }
}

impl ActivityDetails {
    /// Parse and validate a raw details document for the given type.
    pub fn parse(kind: ActivityType, value: &Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Err(CoreError::Validation(format!(
                "{kind} details must be a JSON object"
            )));
        }
        let details = match kind {
            ActivityType::BoredPiling => Self::BoredPiling(parse_schema(kind, value)?),
            ActivityType::Micropile => Self::Micropile(parse_schema(kind, value)?),
            ActivityType::Caisson => Self::Caisson(parse_schema(kind, value)?),
            ActivityType::DiaphragmWall => Self::DiaphragmWall(parse_schema(kind, value)?),
            ActivityType::Pilecap => Self::Pilecap(parse_schema(kind, value)?),
            ActivityType::DrivenPiling => Self::DrivenPiling(parse_schema(kind, value)?),
            ActivityType::SheetPiling => Self::SheetPiling(parse_schema(kind, value)?),
            ActivityType::GroundAnchor => Self::GroundAnchor(parse_schema(kind, value)?),
            ActivityType::PileLoadTest => Self::PileLoadTest(parse_schema(kind, value)?),
        };
        details.validate()?;
        Ok(details)
    }

    pub fn kind(&self) -> ActivityType {
        match self {
            Self::BoredPiling(_) => ActivityType::BoredPiling,
            Self::Micropile(_) => ActivityType::Micropile,
            Self::Caisson(_) => ActivityType::Caisson,
            Self::DiaphragmWall(_) => ActivityType::DiaphragmWall,
            Self::Pilecap(_) => ActivityType::Pilecap,
            Self::DrivenPiling(_) => ActivityType::DrivenPiling,
            Self::SheetPiling(_) => ActivityType::SheetPiling,
            Self::GroundAnchor(_) => ActivityType::GroundAnchor,
            Self::PileLoadTest(_) => ActivityType::PileLoadTest,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        let kind = self.kind();
        match self {
            Self::BoredPiling(c) | Self::Micropile(c) | Self::Caisson(c) => c.validate(kind)?,
            Self::DiaphragmWall(r) | Self::Pilecap(r) => r.validate(kind)?,
            Self::DrivenPiling(u)
            | Self::SheetPiling(u)
            | Self::GroundAnchor(u)
            | Self::PileLoadTest(u) => {
                check_non_negative(kind, "concreteVolume", u.concrete_volume)?
            }
        }
        if let (_, Some(trucks)) = self.volume_inputs() {
            for truck in trucks {
                check_non_negative(kind, "truckLogs.volume", Some(truck.volume))?;
            }
        }
        Ok(())
    }

    fn theoretical_volume(&self) -> Option<f64> {
        match self {
            Self::BoredPiling(c) | Self::Micropile(c) | Self::Caisson(c) => {
                c.theoretical_volume(self.kind().diameter_unit()?)
            }
            Self::DiaphragmWall(r) | Self::Pilecap(r) => r.theoretical_volume(),
            _ => None,
        }
    }

    fn volume_inputs(&self) -> (Option<f64>, Option<&[TruckLog]>) {
        match self {
            Self::BoredPiling(c) | Self::Micropile(c) | Self::Caisson(c) => {
                (c.concrete_volume, c.truck_logs.as_deref())
            }
            Self::DiaphragmWall(r) | Self::Pilecap(r) => {
                (r.concrete_volume, r.truck_logs.as_deref())
            }
            Self::DrivenPiling(u)
            | Self::SheetPiling(u)
            | Self::GroundAnchor(u)
            | Self::PileLoadTest(u) => (u.concrete_volume, u.truck_logs.as_deref()),
        }
    }

    /// Compute the derived quantities for this activity.
    pub fn derive(&self) -> DerivedQuantities {
        let theoretical = self.theoretical_volume();
        let (explicit, trucks) = self.volume_inputs();
        let truck_total = trucks.map(accepted_truck_volume);
        let actual = explicit.or(truck_total);

        DerivedQuantities {
            theoretical_volume: theoretical.map(|v| round_to(v, 3)),
            actual_volume: actual,
            truck_volume_total: truck_total.map(|v| round_to(v, 3)),
            overconsumption_pct: match (actual, theoretical) {
                (Some(a), Some(t)) => Some(overconsumption_pct(a, t)),
                _ => None,
            },
        }
    }
}

/// Sum of truck volumes not explicitly marked `accepted: false`.
pub fn accepted_truck_volume(trucks: &[TruckLog]) -> f64 {
    trucks
        .iter()
        .filter(|t| t.accepted != Some(false))
        .map(|t| t.volume)
        .sum()
}

/// `(actual − theoretical) / theoretical × 100`, one decimal; zero when
/// `theoretical <= 0`.
pub fn overconsumption_pct(actual: f64, theoretical: f64) -> f64 {
    if theoretical <= 0.0 {
        return 0.0;
    }
    round_to((actual - theoretical) / theoretical * 100.0, 1)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Validate `details` for `kind` and return a copy with the derived fields
/// written in. Stale derived keys are removed when no longer computable.
pub fn enrich_details(kind: ActivityType, details: &Value) -> Result<Value, CoreError> {
    let parsed = ActivityDetails::parse(kind, details)?;
    let derived = parsed.derive();

    let mut out: Map<String, Value> = details.as_object().cloned().unwrap_or_default();
    for key in DERIVED_KEYS {
        out.remove(*key);
    }
    let mut put = |key: &str, v: Option<f64>| {
        if let Some(v) = v {
            out.insert(key.to_string(), Value::from(v));
        }
    };
    put(KEY_THEORETICAL_VOLUME, derived.theoretical_volume);
    put(KEY_ACTUAL_VOLUME, derived.actual_volume);
    put(KEY_TRUCK_VOLUME_TOTAL, derived.truck_volume_total);
    put(KEY_OVERCONSUMPTION_PCT, derived.overconsumption_pct);

    Ok(Value::Object(out))
}
