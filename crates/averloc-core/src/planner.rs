//! Planning: decide which transform units a task applies.
//!
//! By default every atomic transform runs once, independently. With
//! [`Sampling`] the plan instead holds randomly drawn sequences of depth K.

use crate::transform::{TransformKind, TransformUnit};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, thread_rng};

/// Pass id given to each transform in the default plan.
pub const DEFAULT_PASS: u32 = 1;

/// Errors in sampling configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("sequence depth must be at least 1")]
    ZeroDepth,

    #[error("sample count must be at least 1")]
    ZeroSamples,
}

/// Random sequence sampling: `samples` sequences of `depth` transforms each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    depth: usize,
    samples: usize,
}

impl Sampling {
    pub fn new(depth: usize, samples: usize) -> Result<Self, PlanError> {
        if depth == 0 {
            return Err(PlanError::ZeroDepth);
        }
        if samples == 0 {
            return Err(PlanError::ZeroSamples);
        }
        Ok(Self { depth, samples })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn samples(&self) -> usize {
        self.samples
    }
}

/// Ordered transform units for one task. Always starts with identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    entries: Vec<TransformUnit>,
}

impl Plan {
    /// Identity followed by `units`.
    pub fn new(units: impl IntoIterator<Item = TransformUnit>) -> Self {
        let mut entries = vec![TransformUnit::Identity];
        entries.extend(units);
        Self { entries }
    }

    pub fn entries(&self) -> &[TransformUnit] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output names, in plan order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(TransformUnit::name).collect()
    }
}

/// Builds plans for tasks.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    sampling: Option<Sampling>,
    seed: Option<u64>,
}

impl Planner {
    /// Planner for the default catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw random sequences instead of the default catalog.
    pub fn sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Make sampled plans reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sampling_config(&self) -> Option<Sampling> {
        self.sampling
    }

    /// Plan for the task with the given index.
    ///
    /// Each task draws its own sequences. With a seed, task `n` uses
    /// `seed + n`, so runs repeat but tasks still differ from each other.
    pub fn plan_for(&self, task: usize) -> Plan {
        let Some(sampling) = self.sampling else {
            return default_plan();
        };
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(task as u64));
                sampled_plan(sampling, &mut rng)
            }
            None => sampled_plan(sampling, &mut thread_rng()),
        }
    }
}

/// Identity plus one instance of every atomic transform.
fn default_plan() -> Plan {
    Plan::new(
        TransformKind::ALL
            .iter()
            .map(|&kind| TransformUnit::atomic(kind, DEFAULT_PASS)),
    )
}

fn sampled_plan<R: Rng>(sampling: Sampling, rng: &mut R) -> Plan {
    let sequences = (1..=sampling.samples).map(|s| {
        let members = (0..sampling.depth)
            .filter_map(|i| {
                let kind = *TransformKind::ALL.choose(rng)?;
                Some(TransformUnit::atomic(kind, i as u32))
            })
            .collect();
        TransformUnit::Sequence {
            name: format!("depth-{}-sample-{s}", sampling.depth),
            members,
        }
    });
    Plan::new(sequences.collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::IDENTITY_NAME;

    #[test]
    fn test_default_plan() {
        let plan = Planner::new().plan_for(0);
        assert_eq!(plan.len(), 9);
        assert_eq!(plan.entries()[0], TransformUnit::Identity);

        for (entry, kind) in plan.entries()[1..].iter().zip(TransformKind::ALL) {
            assert_eq!(*entry, TransformUnit::atomic(kind, DEFAULT_PASS));
        }
    }

    #[test]
    fn test_sampled_names() {
        let planner = Planner::new().sampling(Sampling::new(3, 2).unwrap());
        let plan = planner.plan_for(0);

        assert_eq!(
            plan.names(),
            vec![IDENTITY_NAME, "depth-3-sample-1", "depth-3-sample-2"]
        );
    }

    #[test]
    fn test_sampled_pass_ids_follow_position() {
        let planner = Planner::new().sampling(Sampling::new(4, 3).unwrap());
        let plan = planner.plan_for(7);

        for entry in &plan.entries()[1..] {
            let TransformUnit::Sequence { members, .. } = entry else {
                panic!("expected a sequence, got {entry}");
            };
            assert_eq!(members.len(), 4);
            for (i, member) in members.iter().enumerate() {
                let TransformUnit::Atomic { pass, .. } = member else {
                    panic!("expected an atomic member");
                };
                assert_eq!(*pass, i as u32);
            }
        }
    }

    #[test]
    fn test_samples_are_independent_lists() {
        let planner = Planner::new().sampling(Sampling::new(2, 5).unwrap()).seed(11);
        let plan = planner.plan_for(0);

        for entry in &plan.entries()[1..] {
            let TransformUnit::Sequence { members, .. } = entry else {
                panic!("expected a sequence");
            };
            assert_eq!(members.len(), 2);
        }
    }

    #[test]
    fn test_seeded_plans_repeat() {
        let planner = Planner::new().sampling(Sampling::new(5, 4).unwrap()).seed(42);
        assert_eq!(planner.plan_for(3), planner.plan_for(3));
    }

    #[test]
    fn test_zero_sampling_rejected() {
        assert_eq!(Sampling::new(0, 2), Err(PlanError::ZeroDepth));
        assert_eq!(Sampling::new(3, 0), Err(PlanError::ZeroSamples));
    }
}
