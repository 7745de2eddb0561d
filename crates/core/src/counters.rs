//! Per-state resource counters.
//!
//! The counters are maintained incrementally by the resource store on
//! every mutation; a full recount happens only when a snapshot is
//! loaded. Their sum must always equal the number of live records.

use crate::state::ResourceState;

/// One integer per [`ResourceState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateCounters {
    counts: [usize; ResourceState::ALL.len()],
}

impl StateCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources currently in `state`.
    pub fn get(&self, state: ResourceState) -> usize {
        self.counts[state.index()]
    }

    /// Sum over all states.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn increment(&mut self, state: ResourceState) {
        self.counts[state.index()] += 1;
    }

    /// Saturating decrement: a counter can never go below zero even if
    /// bookkeeping is handed a state it never counted.
    pub fn decrement(&mut self, state: ResourceState) {
        let slot = &mut self.counts[state.index()];
        *slot = slot.saturating_sub(1);
    }

    /// Zero every counter (experiment switch).
    pub fn reset(&mut self) {
        self.counts = Default::default();
    }

    /// Iterate `(state, count)` pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceState, usize)> + '_ {
        ResourceState::ALL
            .iter()
            .map(move |&s| (s, self.counts[s.index()]))
    }
}

impl std::fmt::Display for StateCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (state, count) in self.iter() {
            if count == 0 {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{state}={count}")?;
            first = false;
        }
        if first {
            f.write_str("empty")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let counters = StateCounters::new();
        assert_eq!(counters.total(), 0);
        for (_, count) in counters.iter() {
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn increment_and_decrement() {
        let mut counters = StateCounters::new();
        counters.increment(ResourceState::Running);
        counters.increment(ResourceState::Running);
        counters.increment(ResourceState::Done);
        assert_eq!(counters.get(ResourceState::Running), 2);
        assert_eq!(counters.get(ResourceState::Done), 1);
        assert_eq!(counters.total(), 3);

        counters.decrement(ResourceState::Running);
        assert_eq!(counters.get(ResourceState::Running), 1);
        assert_eq!(counters.total(), 2);
    }

    #[test]
    fn decrement_never_underflows() {
        let mut counters = StateCounters::new();
        counters.decrement(ResourceState::Error);
        assert_eq!(counters.get(ResourceState::Error), 0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut counters = StateCounters::new();
        counters.increment(ResourceState::Waiting);
        counters.increment(ResourceState::Killed);
        counters.reset();
        assert_eq!(counters.total(), 0);
    }

    #[test]
    fn display_skips_zero_counts() {
        let mut counters = StateCounters::new();
        counters.increment(ResourceState::Running);
        counters.increment(ResourceState::Done);
        counters.increment(ResourceState::Done);
        assert_eq!(counters.to_string(), "running=1 done=2");
    }
}
