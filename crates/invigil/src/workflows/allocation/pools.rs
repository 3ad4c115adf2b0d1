use crate::workflows::examination::domain::{SeniorityClass, StaffMember};

/// Pool consulted when a preferred seniority slot cannot be filled, and for
/// every slot after the senior/junior pair.
const FALLBACK_ORDER: [SeniorityClass; 3] = [
    SeniorityClass::Other,
    SeniorityClass::Senior,
    SeniorityClass::Junior,
];

/// Unassigned staff split by seniority class, each pool in arrival order.
#[derive(Debug, Default)]
pub(crate) struct SeniorityPools<'a> {
    senior: Vec<&'a StaffMember>,
    junior: Vec<&'a StaffMember>,
    other: Vec<&'a StaffMember>,
}

impl<'a> SeniorityPools<'a> {
    pub(crate) fn partition<I>(staff: I) -> Self
    where
        I: IntoIterator<Item = &'a StaffMember>,
    {
        let mut pools = Self::default();
        for member in staff {
            pools.pool_mut(member.seniority).push(member);
        }
        pools
    }

    pub(crate) fn remaining(&self) -> usize {
        self.senior.len() + self.junior.len() + self.other.len()
    }

    /// Draws up to `needed` staff for one room.
    ///
    /// Slot 0 prefers a senior, slot 1 a junior; everything else, and any
    /// preferred slot whose pool has no compatible candidate, goes through
    /// [`FALLBACK_ORDER`]. Drawn staff leave their pool even when the caller
    /// ends up discarding a short room.
    pub(crate) fn draw_for_room(&mut self, needed: usize) -> Vec<&'a StaffMember> {
        let mut selected: Vec<&'a StaffMember> = Vec::with_capacity(needed);

        for slot in 0..needed {
            let preferred = match slot {
                0 => Some(SeniorityClass::Senior),
                1 => Some(SeniorityClass::Junior),
                _ => None,
            };

            let candidate = preferred
                .and_then(|class| self.take_compatible(class, &selected))
                .or_else(|| self.take_fallback(&selected));

            match candidate {
                Some(member) => selected.push(member),
                None => break,
            }
        }

        selected
    }

    fn take_fallback(&mut self, selected: &[&'a StaffMember]) -> Option<&'a StaffMember> {
        FALLBACK_ORDER
            .iter()
            .find_map(|class| self.take_compatible(*class, selected))
    }

    /// Removes the earliest candidate of `class` whose department is not yet in
    /// the room. Skipped candidates keep their place in the pool.
    fn take_compatible(
        &mut self,
        class: SeniorityClass,
        selected: &[&'a StaffMember],
    ) -> Option<&'a StaffMember> {
        let pool = self.pool_mut(class);
        let index = pool.iter().position(|candidate| {
            !selected
                .iter()
                .any(|chosen| chosen.department == candidate.department)
        })?;
        Some(pool.remove(index))
    }

    fn pool_mut(&mut self, class: SeniorityClass) -> &mut Vec<&'a StaffMember> {
        match class {
            SeniorityClass::Senior => &mut self.senior,
            SeniorityClass::Junior => &mut self.junior,
            SeniorityClass::Other => &mut self.other,
        }
    }
}
