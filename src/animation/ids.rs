//! Dense ids handed out by a graph builder's [`IdTable`](crate::utils::IdTable)s.

use crate::utils::id_table::define_table_id;

define_table_id! {
    /// A clip sampler of a graph.
    SamplerId;
    /// A sync group of a graph.
    SyncGroupId;
    /// A float parameter written by gameplay.
    ParamId;
    /// A one-frame trigger written by gameplay.
    SignalId;
    /// A one-frame flag raised by the graph and read by gameplay.
    FeedbackEventId;
}
