use crate::data::{Case, Day, ObjectiveMode, ScheduleSolution, SolverConfig, TimeOfDay};
use crate::grid::TimeGrid;
use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single constraint violation found in a proposed solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Violation {
    DuplicatePatient {
        patient_id: String,
    },
    MissingPatient {
        patient_id: String,
    },
    UnknownPatient {
        patient_id: String,
    },
    UnknownDoctor {
        patient_id: String,
        doctor_id: String,
    },
    DurationMismatch {
        patient_id: String,
        expected_minutes: i64,
        actual_minutes: i64,
        declared_minutes: i64,
    },
    NotContainedInAvailability {
        patient_id: String,
        doctor_id: String,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
    },
    OverlappingAssignments {
        doctor_id: String,
        day: Day,
        first_patient: String,
        first_start: TimeOfDay,
        first_end: TimeOfDay,
        second_patient: String,
        second_start: TimeOfDay,
        second_end: TimeOfDay,
    },
    ObjectiveMismatch {
        declared: i64,
        recomputed: i64,
    },
}

impl Violation {
    fn sort_key(&self) -> (&str, &str) {
        match self {
            Violation::DuplicatePatient { patient_id, .. }
            | Violation::MissingPatient { patient_id, .. }
            | Violation::UnknownPatient { patient_id, .. }
            | Violation::DurationMismatch { patient_id, .. } => (patient_id, ""),
            Violation::UnknownDoctor {
                patient_id,
                doctor_id,
                ..
            }
            | Violation::NotContainedInAvailability {
                patient_id,
                doctor_id,
                ..
            } => (patient_id, doctor_id),
            Violation::OverlappingAssignments {
                first_patient,
                doctor_id,
                ..
            } => (first_patient, doctor_id),
            Violation::ObjectiveMismatch { .. } => ("", ""),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DuplicatePatient { patient_id } => {
                write!(f, "patient '{}' appears more than once in the solution", patient_id)
            }
            Violation::MissingPatient { patient_id } => write!(
                f,
                "patient '{}' is missing from both scheduled and unscheduled",
                patient_id
            ),
            Violation::UnknownPatient { patient_id } => {
                write!(f, "patient '{}' is not part of the case", patient_id)
            }
            Violation::UnknownDoctor {
                patient_id,
                doctor_id,
            } => write!(
                f,
                "patient '{}' is assigned to unknown doctor '{}'",
                patient_id, doctor_id
            ),
            Violation::DurationMismatch {
                patient_id,
                expected_minutes,
                actual_minutes,
                declared_minutes,
            } => write!(
                f,
                "patient '{}': expected {} minutes but the assignment spans {} (declared {})",
                patient_id, expected_minutes, actual_minutes, declared_minutes
            ),
            Violation::NotContainedInAvailability {
                patient_id,
                doctor_id,
                day,
                start,
                end,
            } => write!(
                f,
                "patient '{}' with doctor '{}' on {} {}-{} lies outside every availability slot",
                patient_id, doctor_id, day, start, end
            ),
            Violation::OverlappingAssignments {
                doctor_id,
                day,
                first_patient,
                first_start,
                first_end,
                second_patient,
                second_start,
                second_end,
            } => write!(
                f,
                "doctor '{}' on {}: patient '{}' ({}-{}) overlaps patient '{}' ({}-{})",
                doctor_id,
                day,
                first_patient,
                first_start,
                first_end,
                second_patient,
                second_start,
                second_end
            ),
            Violation::ObjectiveMismatch {
                declared,
                recomputed,
            } => write!(
                f,
                "objective_value {} does not match the recomputed objective {}",
                declared, recomputed
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationStats {
    pub total_patients: usize,
    pub scheduled: usize,
    pub unscheduled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub ok: bool,
    pub violations: Vec<Violation>,
    pub stats: VerificationStats,
}

/// Checks a proposed solution against the raw case, whatever produced it.
///
/// Containment and overlap are re-derived from `case.doctors[*].availability`
/// and the claimed assignments alone; the enumerator's candidate set is never
/// consulted, so a model-building bug cannot hide from this check. All
/// violations are collected in one pass, ordered by patient id then doctor
/// id, with the objective check reported last.
pub fn verify(
    case: &Case,
    solution: &ScheduleSolution,
    config: &SolverConfig,
) -> VerificationReport {
    let durations: HashMap<&str, u32> = case
        .patients
        .iter()
        .map(|p| (p.id.as_str(), p.duration_minutes))
        .collect();
    let availability: HashMap<&str, Vec<(u32, u32)>> = case
        .doctors
        .iter()
        .map(|d| {
            let slots = d
                .availability
                .iter()
                .map(|s| {
                    (
                        TimeGrid::to_absolute(s.day, s.start),
                        TimeGrid::to_absolute(s.day, s.end),
                    )
                })
                .collect();
            (d.id.as_str(), slots)
        })
        .collect();

    let mut violations = Vec::new();
    let mut scheduled_ids: HashSet<&str> = HashSet::new();

    for entry in &solution.scheduled {
        let pid = entry.patient_id.as_str();
        if !scheduled_ids.insert(pid) {
            violations.push(Violation::DuplicatePatient {
                patient_id: entry.patient_id.clone(),
            });
        }

        let start = TimeGrid::to_absolute(entry.day, entry.start);
        let end = TimeGrid::to_absolute(entry.day, entry.end);
        let actual = i64::from(end) - i64::from(start);

        match durations.get(pid) {
            None => violations.push(Violation::UnknownPatient {
                patient_id: entry.patient_id.clone(),
            }),
            Some(&expected) => {
                let expected = i64::from(expected);
                let declared = i64::from(entry.duration_minutes);
                if actual != expected || declared != actual {
                    violations.push(Violation::DurationMismatch {
                        patient_id: entry.patient_id.clone(),
                        expected_minutes: expected,
                        actual_minutes: actual,
                        declared_minutes: declared,
                    });
                }
            }
        }

        match availability.get(entry.doctor_id.as_str()) {
            None => violations.push(Violation::UnknownDoctor {
                patient_id: entry.patient_id.clone(),
                doctor_id: entry.doctor_id.clone(),
            }),
            Some(slots) => {
                let contained = slots.iter().any(|&(s, e)| s <= start && end <= e);
                if !contained {
                    violations.push(Violation::NotContainedInAvailability {
                        patient_id: entry.patient_id.clone(),
                        doctor_id: entry.doctor_id.clone(),
                        day: entry.day,
                        start: entry.start,
                        end: entry.end,
                    });
                }
            }
        }
    }

    // Pairwise overlap per (doctor, day). Full pairwise, not just adjacent
    // after sorting: one long interval can overlap several later ones.
    let by_doctor_day = solution
        .scheduled
        .iter()
        .map(|entry| ((entry.doctor_id.as_str(), entry.day), entry))
        .into_group_map();
    for key in by_doctor_day.keys().sorted() {
        let mut entries = by_doctor_day[key].clone();
        entries.sort_by_key(|e| (e.start, e.patient_id.as_str()));
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (first, second) = (entries[i], entries[j]);
                if second.start < first.end {
                    violations.push(Violation::OverlappingAssignments {
                        doctor_id: first.doctor_id.clone(),
                        day: first.day,
                        first_patient: first.patient_id.clone(),
                        first_start: first.start,
                        first_end: first.end,
                        second_patient: second.patient_id.clone(),
                        second_start: second.start,
                        second_end: second.end,
                    });
                }
            }
        }
    }

    let mut unscheduled_ids: HashSet<&str> = HashSet::new();
    for pid in &solution.unscheduled {
        if !unscheduled_ids.insert(pid.as_str()) || scheduled_ids.contains(pid.as_str()) {
            violations.push(Violation::DuplicatePatient {
                patient_id: pid.clone(),
            });
        }
        if !durations.contains_key(pid.as_str()) {
            violations.push(Violation::UnknownPatient {
                patient_id: pid.clone(),
            });
        }
    }

    for patient in &case.patients {
        let pid = patient.id.as_str();
        if !scheduled_ids.contains(pid) && !unscheduled_ids.contains(pid) {
            violations.push(Violation::MissingPatient {
                patient_id: patient.id.clone(),
            });
        }
    }

    violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    // Objective over distinct scheduled patients, reported last.
    let recomputed = match config.objective_mode {
        ObjectiveMode::Count => scheduled_ids.len() as i64,
        ObjectiveMode::Duration => {
            let mut seen = HashSet::new();
            solution
                .scheduled
                .iter()
                .filter(|e| seen.insert(e.patient_id.as_str()))
                .map(|e| i64::from(e.duration_minutes))
                .sum()
        }
    };
    if solution.objective_value != recomputed {
        violations.push(Violation::ObjectiveMismatch {
            declared: solution.objective_value,
            recomputed,
        });
    }

    let stats = VerificationStats {
        total_patients: case.patients.len(),
        scheduled: scheduled_ids.len(),
        unscheduled: unscheduled_ids.len(),
    };
    debug!(
        "Verification finished with {} violation(s) over {} scheduled entries.",
        violations.len(),
        solution.scheduled.len()
    );
    VerificationReport {
        ok: violations.is_empty(),
        violations,
        stats,
    }
}
