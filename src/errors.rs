//! Error Types
//!
//! This module defines the error types used throughout the animation graph.
//!
//! # Overview
//!
//! The main error type [`AnimError`] covers configuration failures detected
//! while compiling an [`AnimGraphBuilder`](crate::graph::AnimGraphBuilder):
//! - Missing or dangling blend graph wiring
//! - Names that do not resolve to a registered sampler, sync group or state
//! - Expression programs that fail to compile
//! - Clips that cannot be played
//!
//! Steady-state lookups on a compiled graph never return errors: an unknown
//! id logs and degrades to a default value instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_animgraph::errors::{AnimError, Result};
//!
//! fn build() -> Result<()> {
//!     // Compilation steps return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::graph::NodeKey;

/// The main error type for graph compilation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    // ========================================================================
    // Graph Wiring Errors
    // ========================================================================
    /// The graph has no output node.
    #[error("Graph has no output node")]
    MissingOutputNode,

    /// A node handle does not refer to a node of this builder.
    #[error("Unknown blend node: {0:?}")]
    UnknownNode(NodeKey),

    /// A blend node input slot was left unconnected.
    #[error("Blend node {node:?} has no input connected to slot {slot}")]
    MissingBlendInput {
        /// The blend node with the dangling input
        node: NodeKey,
        /// Input slot index (0 = A, 1 = B)
        slot: usize,
    },

    /// The blend graph contains a cycle.
    #[error("Blend graph contains a cycle through node {0:?}")]
    CyclicGraph(NodeKey),

    // ========================================================================
    // Name Resolution Errors
    // ========================================================================
    /// A clip node names a sampler that was never registered.
    #[error("Clip node refers to unknown sampler '{0}'")]
    UnresolvedSampler(String),

    /// A sampler names a sync group that was never registered.
    #[error("Sampler '{sampler}' refers to unknown sync group '{group}'")]
    UnknownSyncGroup {
        /// Sampler name
        sampler: String,
        /// Missing group name
        group: String,
    },

    /// A state machine node has no states.
    #[error("State machine node {0:?} has no states")]
    EmptyStateMachine(NodeKey),

    /// A transition or initial state names a state that does not exist.
    #[error("State machine node {node:?} refers to unknown state '{state}'")]
    UnknownState {
        /// The state machine node
        node: NodeKey,
        /// Missing state name
        state: String,
    },

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// A clip cannot be played (non-positive length or fps).
    #[error("Clip '{name}' is invalid: {reason}")]
    InvalidClip {
        /// Clip name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A frame node extracts a frame outside its clip.
    #[error("Frame node {node:?} extracts frame {frame} outside clip of length {length}")]
    InvalidFrame {
        /// The frame node
        node: NodeKey,
        /// Requested frame
        frame: f32,
        /// Clip length
        length: f32,
    },

    // ========================================================================
    // Expression Errors
    // ========================================================================
    /// A weight expression or transition predicate failed to compile.
    #[error("Expression '{expr}' failed to compile at byte {offset}: {message}")]
    Expression {
        /// Expression source text
        expr: String,
        /// Byte offset of the failure
        offset: usize,
        /// Diagnostic message
        message: String,
    },
}

/// Alias for `Result<T, AnimError>`.
pub type Result<T> = std::result::Result<T, AnimError>;
