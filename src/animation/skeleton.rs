use rustc_hash::FxHashMap;

use crate::animation::sample::{Sample, SampleBuffer};

/// Node layout of the skeleton a graph animates.
///
/// Only the node count, the index-to-name mapping and the rest pose matter
/// here; hierarchy and skinning live with the skeleton owner.
#[derive(Debug, Clone, Default)]
pub struct SkeletonLayout {
    names: Vec<String>,
    rest_pose: Vec<Sample>,
    lookup: FxHashMap<String, usize>,
}

impl SkeletonLayout {
    /// Builds a layout whose rest pose is identity for every node.
    #[must_use]
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let rest_pose = vec![Sample::IDENTITY; names.len()];
        Self::with_rest_pose(names, rest_pose)
    }

    /// Builds a layout with an explicit rest pose (one sample per node).
    #[must_use]
    pub fn with_rest_pose(names: Vec<String>, mut rest_pose: Vec<Sample>) -> Self {
        rest_pose.resize(names.len(), Sample::IDENTITY);
        let lookup = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            rest_pose,
            lookup,
        }
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    #[inline]
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn rest_pose(&self) -> &[Sample] {
        &self.rest_pose
    }

    /// A fresh buffer holding the rest pose.
    #[must_use]
    pub fn rest_buffer(&self) -> SampleBuffer {
        SampleBuffer::from_samples(self.rest_pose.clone())
    }
}
