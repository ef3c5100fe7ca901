use thiserror::Error;

/// Shape and consistency errors raised while building the in-memory arrays.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("spike arrays differ in length: `{field}` has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{what}: shape {shape:?} needs {expected} values, found {found}")]
    Shape {
        what: &'static str,
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    #[error("spike {spike} uses template {template}, but only {n_templates} templates are indexed")]
    TemplateOutOfRange {
        spike: usize,
        template: u32,
        n_templates: usize,
    },

    #[error("`{field}` must be strictly ascending (violated at position {position})")]
    UnsortedIndex {
        field: &'static str,
        position: usize,
    },

    #[error("feature row refers to spike {spike}, but the recording has {n_spikes} spikes")]
    SpikeOutOfRange {
        spike: usize,
        n_spikes: usize,
    },

    #[error("{what} references channel position {channel}, but the channel map has {n_channels} entries")]
    ChannelOutOfRange {
        what: &'static str,
        channel: u32,
        n_channels: usize,
    },
}
