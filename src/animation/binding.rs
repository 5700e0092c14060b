/// Node property a clip track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
}

/// Maps track `track_index` of a clip to node `node_index` of the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackBinding {
    pub track_index: usize,
    pub node_index: usize,
    pub target: TargetPath,
}
