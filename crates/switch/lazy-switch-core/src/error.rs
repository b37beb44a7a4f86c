//! Error type for the switch core.

use thiserror::Error;

use crate::ids::SwitchId;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SwitchError {
    #[error("unknown switch: {0}")]
    UnknownSwitch(SwitchId),

    #[error("too many states: at most {max} states are supported")]
    TooManyStates { max: usize },

    #[error("state {state} does not exist (table has {count} states)")]
    NoSuchState { state: u8, count: usize },

    #[error("state 0 is implicit and has no separator to remove")]
    ImplicitSeparator,

    #[error("entry index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("group offset {offset} at separator {separator} is out of order")]
    InvalidOffsets { separator: usize, offset: usize },

    #[error("master chain forms a cycle: {}", format_chain(.chain))]
    MasterCycle { chain: Vec<SwitchId> },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

fn format_chain(chain: &[SwitchId]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_the_chain() {
        let err = SwitchError::MasterCycle {
            chain: vec![SwitchId(0), SwitchId(1), SwitchId(0)],
        };
        assert_eq!(
            err.to_string(),
            "master chain forms a cycle: switch#0 -> switch#1 -> switch#0"
        );
    }
}
