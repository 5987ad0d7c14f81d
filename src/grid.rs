use crate::data::{Day, MINUTES_PER_DAY, SchedulingError, TimeOfDay};

/// Discretization of the weekly time axis.
///
/// Wall-clock `(day, HH:MM)` pairs map to absolute minutes counted from
/// Monday 00:00. Candidate starts are aligned to the step *relative to the
/// start of the availability slot they fall in*; durations are never
/// rounded, only starts snap to the grid.
#[derive(Debug, Clone, Copy)]
pub struct TimeGrid {
    step: u32,
}

impl TimeGrid {
    pub fn new(step_minutes: u32) -> Result<Self, SchedulingError> {
        if step_minutes == 0 {
            return Err(SchedulingError::Configuration(
                "step_minutes must be positive".to_string(),
            ));
        }
        Ok(TimeGrid { step: step_minutes })
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Absolute minute of `(day, time)` on the weekly axis.
    pub fn to_absolute(day: Day, time: TimeOfDay) -> u32 {
        day.offset_minutes() + time.minutes()
    }

    /// Inverse of [`TimeGrid::to_absolute`]. Errors past the end of Sunday.
    pub fn from_absolute(absolute: u32) -> Result<(Day, TimeOfDay), SchedulingError> {
        let day = Day::from_index(absolute / MINUTES_PER_DAY).ok_or_else(|| {
            SchedulingError::Validation(format!(
                "absolute minute {} lies outside the scheduling week",
                absolute
            ))
        })?;
        // The remainder is always a valid minute of day.
        let time = TimeOfDay::from_minutes(absolute % MINUTES_PER_DAY).ok_or_else(|| {
            SchedulingError::Validation(format!("absolute minute {} has no time of day", absolute))
        })?;
        Ok((day, time))
    }

    /// Step-aligned starts inside `[slot_start, slot_end)` that leave room
    /// for `duration` minutes before the slot ends. Empty when the duration
    /// does not fit at all.
    pub fn aligned_starts(
        &self,
        slot_start: u32,
        slot_end: u32,
        duration: u32,
    ) -> impl Iterator<Item = u32> {
        let upper = match slot_end.checked_sub(duration) {
            Some(last) => (last + 1).max(slot_start),
            None => slot_start,
        };
        (slot_start..upper).step_by(self.step as usize)
    }

    /// Grid ticks of one slot, used by the no-overlap constraints.
    pub fn ticks(&self, slot_start: u32, slot_end: u32) -> impl Iterator<Item = u32> {
        (slot_start..slot_end).step_by(self.step as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hhmm: &str) -> TimeOfDay {
        TimeOfDay::try_from(hhmm.to_string()).unwrap()
    }

    #[test]
    fn zero_step_is_a_configuration_error() {
        assert!(matches!(
            TimeGrid::new(0),
            Err(SchedulingError::Configuration(_))
        ));
    }

    #[test]
    fn absolute_minutes_round_trip() {
        let absolute = TimeGrid::to_absolute(Day::Tuesday, time("09:00"));
        assert_eq!(absolute, MINUTES_PER_DAY + 9 * 60);
        assert_eq!(
            TimeGrid::from_absolute(absolute).unwrap(),
            (Day::Tuesday, time("09:00"))
        );
        assert!(TimeGrid::from_absolute(7 * MINUTES_PER_DAY).is_err());
    }

    #[test]
    fn aligned_starts_cover_the_slot() {
        let grid = TimeGrid::new(5).unwrap();
        // Monday 09:00-10:00, 30 minute visit: starts 09:00..=09:30.
        let starts: Vec<u32> = grid.aligned_starts(540, 600, 30).collect();
        assert_eq!(starts, vec![540, 545, 550, 555, 560, 565, 570]);
    }

    #[test]
    fn aligned_starts_are_relative_to_the_slot_start() {
        let grid = TimeGrid::new(5).unwrap();
        // A slot starting off the global 5-minute raster still aligns to itself.
        let starts: Vec<u32> = grid.aligned_starts(542, 602, 30).collect();
        assert_eq!(starts.first(), Some(&542));
        assert_eq!(starts.last(), Some(&572));
        assert!(starts.iter().all(|s| (s - 542) % 5 == 0));
    }

    #[test]
    fn aligned_starts_is_empty_when_the_duration_does_not_fit() {
        let grid = TimeGrid::new(5).unwrap();
        assert_eq!(grid.aligned_starts(540, 560, 30).count(), 0);
        // Duration longer than the whole axis position.
        assert_eq!(grid.aligned_starts(0, 20, 30).count(), 0);
    }

    #[test]
    fn durations_are_not_rounded_to_the_step() {
        let grid = TimeGrid::new(5).unwrap();
        // 7-minute visit in a 20-minute slot: starts at 0, 5, 10 and 13 would
        // fit but 13 is off-grid.
        let starts: Vec<u32> = grid.aligned_starts(0, 20, 7).collect();
        assert_eq!(starts, vec![0, 5, 10]);
    }

    #[test]
    fn ticks_span_the_slot_at_step_resolution() {
        let grid = TimeGrid::new(5).unwrap();
        assert_eq!(grid.ticks(540, 600).count(), 12);
        assert_eq!(grid.ticks(540, 600).next(), Some(540));
    }
}
