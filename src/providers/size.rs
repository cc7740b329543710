use crate::models::{GenerationRequest, ProviderInput};

/// How a provider constrains output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Any value inside `[min, max]`.
    Clamp { min: u32, max: u32 },
    /// One of a fixed set. Ties resolve to the earlier candidate.
    Snap(&'static [u32]),
}

impl SizePolicy {
    pub fn fit(&self, requested: i64) -> u32 {
        match *self {
            SizePolicy::Clamp { min, max } => requested.clamp(min as i64, max as i64) as u32,
            SizePolicy::Snap(candidates) => snap(requested, candidates),
        }
    }

    pub fn apply(&self, request: GenerationRequest) -> ProviderInput {
        ProviderInput {
            width: self.fit(request.width),
            height: self.fit(request.height),
            prompt: request.prompt,
            extras: request.extras,
        }
    }
}

fn snap(requested: i64, candidates: &[u32]) -> u32 {
    let mut iter = candidates.iter().copied();
    let Some(first) = iter.next() else {
        return requested.clamp(1, u32::MAX as i64) as u32;
    };

    let distance = |candidate: u32| (candidate as i64).abs_diff(requested);
    let mut best = first;
    let mut best_distance = distance(first);
    for candidate in iter {
        let d = distance(candidate);
        if d < best_distance {
            best = candidate;
            best_distance = d;
        }
    }
    best
}
