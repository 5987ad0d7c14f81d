use crate::candidates::{self, Candidate};
use crate::data::{
    Assignment, Case, ObjectiveMode, ScheduleSolution, SchedulingError, SolveStatus, SolverConfig,
};
use crate::grid::TimeGrid;
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint,
    default_solver,
};
use itertools::Itertools;
use log::{error, info, trace};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Builds the interval-packing ILP and solves it with the HiGHS backend.
///
/// One binary variable per placement candidate, at most one placement per
/// patient, and per-tick occupancy constraints so that the intervals
/// selected for a doctor never overlap. The builder only declares the
/// model; which candidate wins is entirely up to the solver.
pub fn solve(case: &Case, config: &SolverConfig) -> Result<ScheduleSolution, SchedulingError> {
    case.validate()?;
    let grid = TimeGrid::new(config.step_minutes)?;
    let start_time = Instant::now();

    let cands = candidates::enumerate(case, &grid);
    info!(
        "Setting up ILP model with {} doctors, {} patients, and {} placement candidates...",
        case.doctors.len(),
        case.patients.len(),
        cands.len()
    );

    if cands.is_empty() {
        // Scheduling nobody is the only, and therefore optimal, option.
        return Ok(empty_solution(case, SolveStatus::Optimal));
    }

    let mut problem = ProblemVariables::new();
    let vars = problem.add_vector(variable().binary(), cands.len());

    let objective: Expression = match config.objective_mode {
        ObjectiveMode::Count => vars.iter().map(|v| *v).sum(),
        ObjectiveMode::Duration => cands
            .iter()
            .zip(&vars)
            .map(|(c, v)| f64::from(c.end - c.start) * *v)
            .sum(),
    };

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", 1234);
    if let Some(limit) = config.time_limit_seconds {
        model = model.set_option("time_limit", limit as f64);
    }

    trace!("Adding 'at most one placement per patient' constraints...");
    let by_patient: HashMap<usize, Vec<usize>> = cands
        .iter()
        .enumerate()
        .map(|(i, c)| (c.patient, i))
        .into_group_map();
    for indices in by_patient.values() {
        let placed: Expression = indices.iter().map(|&i| vars[i]).sum();
        model.add_constraint(constraint!(placed <= 1));
    }

    // No overlap per doctor: at every grid tick of every availability slot,
    // at most one selected interval covers the tick. Starts are aligned to
    // the slot, so any overlap covers the later interval's start tick, and
    // slots of one doctor are disjoint, so cross-slot overlap cannot occur.
    trace!("Adding 'no doctor overlap' constraints...");
    let by_slot: HashMap<(usize, usize), Vec<usize>> = cands
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.doctor, c.slot), i))
        .into_group_map();
    for (&(doctor, slot), indices) in by_slot.iter().sorted() {
        let window = &case.doctors[doctor].availability[slot];
        let slot_start = TimeGrid::to_absolute(window.day, window.start);
        let slot_end = TimeGrid::to_absolute(window.day, window.end);
        for tick in grid.ticks(slot_start, slot_end) {
            let covering: Expression = indices
                .iter()
                .filter(|&&i| cands[i].start <= tick && tick < cands[i].end)
                .map(|&i| vars[i])
                .sum();
            model.add_constraint(constraint!(covering <= 1));
        }
    }

    info!("Starting ILP solver...");
    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            // The model is satisfiable by scheduling nobody; reaching this
            // branch means the model itself is wrong.
            error!("Solver reported an infeasible model: internal consistency failure.");
            return Ok(empty_solution(case, SolveStatus::Infeasible));
        }
        Err(e) => {
            if budget_expired(config, start_time) {
                info!("Time budget expired before any assignment was found.");
                return Ok(empty_solution(case, SolveStatus::Unknown));
            }
            return Err(SchedulingError::Solver(e.to_string()));
        }
    };
    let elapsed = start_time.elapsed();
    info!("Solver returned in {:.2?}", elapsed);

    // good_lp does not report proof of optimality separately, so a solve
    // that consumed the whole budget is only known to be feasible.
    let status = if budget_expired(config, start_time) {
        SolveStatus::Feasible
    } else {
        SolveStatus::Optimal
    };

    let mut scheduled = Vec::new();
    let mut objective_value: i64 = 0;
    for (c, var) in cands.iter().zip(&vars) {
        if solution.value(*var) > 0.9 {
            scheduled.push(to_assignment(case, c)?);
            objective_value += match config.objective_mode {
                ObjectiveMode::Count => 1,
                ObjectiveMode::Duration => i64::from(c.end - c.start),
            };
        }
    }
    scheduled.sort_by(|a, b| {
        (&a.doctor_id, a.day, a.start).cmp(&(&b.doctor_id, b.day, b.start))
    });

    let scheduled_ids: HashSet<&str> = scheduled.iter().map(|a| a.patient_id.as_str()).collect();
    let unscheduled: Vec<String> = case
        .patients
        .iter()
        .filter(|p| !scheduled_ids.contains(p.id.as_str()))
        .map(|p| p.id.clone())
        .sorted()
        .collect();

    info!(
        "Scheduled {} of {} patients (status {:?}).",
        scheduled.len(),
        case.patients.len(),
        status
    );
    Ok(ScheduleSolution {
        status,
        objective_value,
        scheduled,
        unscheduled,
    })
}

fn budget_expired(config: &SolverConfig, start_time: Instant) -> bool {
    match config.time_limit_seconds {
        Some(limit) => start_time.elapsed() >= Duration::from_secs(limit),
        None => false,
    }
}

fn to_assignment(case: &Case, candidate: &Candidate) -> Result<Assignment, SchedulingError> {
    let (day, start) = TimeGrid::from_absolute(candidate.start)?;
    let (_, end) = TimeGrid::from_absolute(candidate.end)?;
    let patient = &case.patients[candidate.patient];
    Ok(Assignment {
        patient_id: patient.id.clone(),
        doctor_id: case.doctors[candidate.doctor].id.clone(),
        day,
        start,
        end,
        duration_minutes: patient.duration_minutes,
    })
}

fn empty_solution(case: &Case, status: SolveStatus) -> ScheduleSolution {
    ScheduleSolution {
        status,
        objective_value: 0,
        scheduled: Vec::new(),
        unscheduled: case.patients.iter().map(|p| p.id.clone()).sorted().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Day;
    use crate::verifier;

    fn case(json: &str) -> Case {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn schedules_a_patient_that_fits() {
        let case = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "10:00"} ] } ],
                "patients": [ { "id": "patient_1", "duration_minutes": 30 } ]
            }"#,
        );
        let solution = solve(&case, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective_value, 1);
        assert!(solution.unscheduled.is_empty());
        assert_eq!(solution.scheduled.len(), 1);

        // Any grid-aligned 30-minute window inside the slot is acceptable;
        // the exact start is solver-defined.
        let visit = &solution.scheduled[0];
        assert_eq!(visit.day, Day::Monday);
        assert!(visit.start.minutes() >= 540);
        assert!(visit.end.minutes() <= 600);
        assert_eq!(visit.end.minutes() - visit.start.minutes(), 30);

        let report = verifier::verify(&case, &solution, &SolverConfig::default());
        assert!(report.ok, "verifier rejected solver output: {:?}", report);
    }

    #[test]
    fn reports_an_unschedulable_patient_without_failing() {
        let case = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "09:20"} ] } ],
                "patients": [ { "id": "patient_1", "duration_minutes": 30 } ]
            }"#,
        );
        let solution = solve(&case, &SolverConfig::default()).unwrap();

        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective_value, 0);
        assert!(solution.scheduled.is_empty());
        assert_eq!(solution.unscheduled, vec!["patient_1".to_string()]);
    }

    #[test]
    fn packs_two_patients_into_one_slot() {
        let case = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "10:00"} ] } ],
                "patients": [
                    { "id": "patient_1", "duration_minutes": 30 },
                    { "id": "patient_2", "duration_minutes": 30 }
                ]
            }"#,
        );
        let solution = solve(&case, &SolverConfig::default()).unwrap();

        assert_eq!(solution.objective_value, 2);
        assert!(solution.unscheduled.is_empty());
        let report = verifier::verify(&case, &solution, &SolverConfig::default());
        assert!(report.ok, "verifier rejected solver output: {:?}", report);
    }

    #[test]
    fn drops_a_patient_when_the_slot_cannot_hold_both() {
        let case = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "10:00"} ] } ],
                "patients": [
                    { "id": "patient_1", "duration_minutes": 40 },
                    { "id": "patient_2", "duration_minutes": 40 }
                ]
            }"#,
        );
        let solution = solve(&case, &SolverConfig::default()).unwrap();

        assert_eq!(solution.objective_value, 1);
        assert_eq!(solution.scheduled.len(), 1);
        assert_eq!(solution.unscheduled.len(), 1);
        let report = verifier::verify(&case, &solution, &SolverConfig::default());
        assert!(report.ok, "verifier rejected solver output: {:?}", report);
    }

    #[test]
    fn duration_objective_counts_minutes() {
        let case = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "10:30"} ] } ],
                "patients": [
                    { "id": "patient_1", "duration_minutes": 30 },
                    { "id": "patient_2", "duration_minutes": 45 }
                ]
            }"#,
        );
        let config = SolverConfig {
            objective_mode: ObjectiveMode::Duration,
            ..SolverConfig::default()
        };
        let solution = solve(&case, &config).unwrap();

        assert_eq!(solution.objective_value, 75);
        assert!(solution.unscheduled.is_empty());
        let report = verifier::verify(&case, &solution, &config);
        assert!(report.ok, "verifier rejected solver output: {:?}", report);
    }

    #[test]
    fn adding_availability_never_hurts_the_objective() {
        let cramped = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "09:20"} ] } ],
                "patients": [ { "id": "patient_1", "duration_minutes": 30 } ]
            }"#,
        );
        let relaxed = case(
            r#"{
                "doctors": [ { "id": "doctor_1",
                    "availability": [ {"day": "Monday", "start": "09:00", "end": "09:20"},
                                      {"day": "Tuesday", "start": "10:00", "end": "11:00"} ] } ],
                "patients": [ { "id": "patient_1", "duration_minutes": 30 } ]
            }"#,
        );
        let before = solve(&cramped, &SolverConfig::default()).unwrap();
        let after = solve(&relaxed, &SolverConfig::default()).unwrap();
        assert!(after.objective_value >= before.objective_value);
        assert_eq!(after.objective_value, 1);
    }

    #[test]
    fn zero_step_fails_before_enumeration() {
        let case = case(r#"{ "doctors": [], "patients": [] }"#);
        let config = SolverConfig {
            step_minutes: 0,
            ..SolverConfig::default()
        };
        assert!(matches!(
            solve(&case, &config),
            Err(SchedulingError::Configuration(_))
        ));
    }

    #[test]
    fn empty_case_is_trivially_optimal() {
        let case = case(r#"{ "doctors": [], "patients": [] }"#);
        let solution = solve(&case, &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective_value, 0);
        assert!(solution.scheduled.is_empty());
        assert!(solution.unscheduled.is_empty());
    }
}
