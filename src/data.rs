use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Errors surfaced by the scheduling engine before or during a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// The case itself is malformed (missing fields, bad times, duplicate ids).
    Validation(String),
    /// The configuration is unusable (e.g. a zero discretization step).
    Configuration(String),
    /// The ILP backend failed for a reason other than a normal solver outcome.
    Solver(String),
}

impl fmt::Display for SchedulingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingError::Validation(msg) => write!(f, "validation error: {}", msg),
            SchedulingError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            SchedulingError::Solver(msg) => write!(f, "solver error: {}", msg),
        }
    }
}

impl std::error::Error for SchedulingError {}

/// Day of the scheduling week. Serialized as its English name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Offset of this day on the absolute weekly minute axis.
    pub fn offset_minutes(self) -> u32 {
        self as u32 * MINUTES_PER_DAY
    }

    pub fn from_index(index: u32) -> Option<Day> {
        Day::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Minute of day, carried on the wire as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn from_minutes(minutes: u32) -> Option<TimeOfDay> {
        if minutes < MINUTES_PER_DAY {
            Some(TimeOfDay(minutes as u16))
        } else {
            None
        }
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (hours, minutes) = value
            .split_once(':')
            .ok_or_else(|| format!("invalid time '{}', expected HH:MM", value))?;
        let hours: u16 = hours
            .parse()
            .map_err(|_| format!("invalid hour in time '{}'", value))?;
        let minutes: u16 = minutes
            .parse()
            .map_err(|_| format!("invalid minute in time '{}'", value))?;
        if hours > 23 || minutes > 59 {
            return Err(format!("time '{}' is outside 00:00-23:59", value));
        }
        Ok(TimeOfDay(hours * 60 + minutes))
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> String {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// One contiguous block of a doctor's weekly availability.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailabilitySlot {
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Doctor {
    pub id: String,
    pub availability: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Patient {
    pub id: String,
    pub duration_minutes: u32,
}

/// A full scheduling case: the immutable input to solver and verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Case {
    pub doctors: Vec<Doctor>,
    pub patients: Vec<Patient>,
}

impl Case {
    /// Rejects malformed input before any model construction begins.
    /// Availability slots of one doctor are assumed pairwise non-overlapping;
    /// that is an input precondition, not checked here.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        let mut doctor_ids = HashSet::new();
        for doctor in &self.doctors {
            if doctor.id.is_empty() {
                return Err(SchedulingError::Validation(
                    "doctor with empty id".to_string(),
                ));
            }
            if !doctor_ids.insert(doctor.id.as_str()) {
                return Err(SchedulingError::Validation(format!(
                    "duplicate doctor id '{}'",
                    doctor.id
                )));
            }
            for (idx, slot) in doctor.availability.iter().enumerate() {
                if slot.start >= slot.end {
                    return Err(SchedulingError::Validation(format!(
                        "doctor '{}' availability[{}]: end {} must be after start {}",
                        doctor.id, idx, slot.end, slot.start
                    )));
                }
            }
        }

        let mut patient_ids = HashSet::new();
        for patient in &self.patients {
            if patient.id.is_empty() {
                return Err(SchedulingError::Validation(
                    "patient with empty id".to_string(),
                ));
            }
            if !patient_ids.insert(patient.id.as_str()) {
                return Err(SchedulingError::Validation(format!(
                    "duplicate patient id '{}'",
                    patient.id
                )));
            }
            if patient.duration_minutes == 0 {
                return Err(SchedulingError::Validation(format!(
                    "patient '{}' has zero duration",
                    patient.id
                )));
            }
        }
        Ok(())
    }
}

/// Objective evaluated over the scheduled patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    /// Maximize the number of scheduled patients.
    Count,
    /// Maximize the total scheduled minutes.
    Duration,
}

/// The knobs the engine honors; everything else belongs to callers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub step_minutes: u32,
    pub time_limit_seconds: Option<u64>,
    pub objective_mode: ObjectiveMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            step_minutes: 5,
            time_limit_seconds: None,
            objective_mode: ObjectiveMode::Count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

/// A patient placed with a doctor at a concrete time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Assignment {
    pub patient_id: String,
    pub doctor_id: String,
    pub day: Day,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_minutes: u32,
}

/// The solver's output, and the verifier's second input.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleSolution {
    pub status: SolveStatus,
    pub objective_value: i64,
    pub scheduled: Vec<Assignment>,
    pub unscheduled: Vec<String>,
}
