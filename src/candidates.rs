use crate::data::Case;
use crate::grid::TimeGrid;

/// A feasible placement of one patient with one doctor, in absolute week
/// minutes. Candidates exist only while the model is being built; the
/// verifier never sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub patient: usize,
    pub doctor: usize,
    pub slot: usize,
    pub start: u32,
    pub end: u32,
}

/// Feasible placements for one (patient, doctor) pair: one candidate per
/// step-aligned start that leaves room for the patient's full duration
/// inside a single availability slot. Every call returns a fresh iterator;
/// no cursor is shared between calls.
pub fn pair_candidates<'a>(
    case: &'a Case,
    grid: &'a TimeGrid,
    patient: usize,
    doctor: usize,
) -> impl Iterator<Item = Candidate> + 'a {
    let duration = case.patients[patient].duration_minutes;
    case.doctors[doctor]
        .availability
        .iter()
        .enumerate()
        .flat_map(move |(slot, window)| {
            let slot_start = TimeGrid::to_absolute(window.day, window.start);
            let slot_end = TimeGrid::to_absolute(window.day, window.end);
            grid.aligned_starts(slot_start, slot_end, duration)
                .map(move |start| Candidate {
                    patient,
                    doctor,
                    slot,
                    start,
                    end: start + duration,
                })
        })
}

/// All candidates of a case. A patient whose duration exceeds every slot
/// span contributes nothing here and ends up unscheduled.
///
/// Candidate count per (patient, doctor) pair is O(slot_span / step), so
/// the total is O(patients x doctors x slots x slot_span / step). This
/// product, not the solve itself, usually bounds the case size the model
/// builder can handle within a time budget.
pub fn enumerate(case: &Case, grid: &TimeGrid) -> Vec<Candidate> {
    let mut out = Vec::new();
    for patient in 0..case.patients.len() {
        for doctor in 0..case.doctors.len() {
            out.extend(pair_candidates(case, grid, patient, doctor));
        }
    }
    out
}
