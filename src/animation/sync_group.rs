use smallvec::SmallVec;

use crate::animation::ids::SamplerId;
use crate::animation::sampler::{ClipSampler, INFLUENCE_EPSILON};

/// Samplers that play back time-aligned to their dominant clip.
///
/// Members are referenced by id into the sampler list of the owning graph
/// instance; every method takes that list explicitly.
#[derive(Debug, Clone, Default)]
pub struct SyncGroup {
    members: SmallVec<[SamplerId; 4]>,
    /// Members sorted ascending by influence as of the last `update_lengths`.
    sorted: SmallVec<[SamplerId; 4]>,
    top_level: Option<SamplerId>,
}

impl SyncGroup {
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = SamplerId>) -> Self {
        let members: SmallVec<[SamplerId; 4]> = members.into_iter().collect();
        let sorted = members.clone();
        let top_level = members.last().copied();
        Self {
            members,
            sorted,
            top_level,
        }
    }

    #[must_use]
    pub fn members(&self) -> &[SamplerId] {
        &self.members
    }

    /// Members in ascending influence order.
    #[must_use]
    pub fn sorted_members(&self) -> &[SamplerId] {
        &self.sorted
    }

    /// The highest-influence member; drives this group's timelines.
    #[inline]
    #[must_use]
    pub fn top_level_sampler(&self) -> Option<SamplerId> {
        self.top_level
    }

    /// Resets every member's influence ahead of weight propagation.
    pub fn clear_influence(&self, samplers: &mut [ClipSampler]) {
        for &id in &self.members {
            if let Some(s) = samplers.get_mut(id.0 as usize) {
                s.clear_influence();
            }
        }
    }

    /// Recomputes each member's `length_scaled` from the influences it
    /// received this frame.
    ///
    /// The lowest-influence member starts at its native length; each
    /// consecutive pair `(a, b)` in ascending order is then pulled towards
    /// each other by `b`'s share of their combined influence. Pairs where
    /// `b` has no influence are left alone.
    pub fn update_lengths(&mut self, samplers: &mut [ClipSampler]) {
        let influence = |samplers: &[ClipSampler], id: SamplerId| {
            samplers
                .get(id.0 as usize)
                .map_or(0.0, ClipSampler::total_influence)
        };

        self.sorted.clone_from(&self.members);
        self.sorted
            .sort_by(|&a, &b| influence(samplers, a).total_cmp(&influence(samplers, b)));
        self.top_level = self.sorted.last().copied();

        let Some(&lowest) = self.sorted.first() else {
            return;
        };
        if let Some(s) = samplers.get_mut(lowest.0 as usize) {
            let native = s.native_length();
            s.set_length_scaled(native);
        }

        for pair in self.sorted.windows(2) {
            let (a, b) = (pair[0].0 as usize, pair[1].0 as usize);
            let (Some(sa), Some(sb)) = (samplers.get(a), samplers.get(b)) else {
                continue;
            };

            let infl_b = sb.total_influence();
            if infl_b == 0.0 {
                continue;
            }
            let infl_a = sa.total_influence();
            let n_b = infl_b / (infl_a + infl_b);

            let (len_a, len_b) = (sa.native_length(), sb.native_length());
            samplers[a].set_length_scaled(lerp(len_a, len_b, 1.0 - n_b));
            samplers[b].set_length_scaled(lerp(len_a, len_b, n_b));
        }
    }

    /// Advances every member by `dt` seconds, sampling those with
    /// non-negligible influence.
    ///
    /// A group whose top-level member has no influence is inert: no cursor
    /// moves.
    pub fn sample_clips(&self, samplers: &mut [ClipSampler], dt: f32) {
        let Some(top) = self.top_level else {
            return;
        };
        let top_influence = samplers
            .get(top.0 as usize)
            .map_or(0.0, ClipSampler::total_influence);
        if top_influence == 0.0 {
            return;
        }

        for &id in &self.members {
            if let Some(s) = samplers.get_mut(id.0 as usize) {
                let sample_new = s.total_influence() > INFLUENCE_EPSILON;
                s.sample_and_advance(dt, sample_new);
            }
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
