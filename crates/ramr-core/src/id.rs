//! Strongly-typed identifiers used across the workspace.
//!
//! Downstream crates (planner, exec, io) should *not* pass raw integers around
//! for step ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(StepId);

impl StepId {
    /// Default id of a plan's root stage.
    pub const ROOT: StepId = StepId(1);

    /// The id `n` steps after this one.
    pub const fn offset(self, n: u64) -> Self {
        Self(self.0 + n)
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::ROOT
    }
}
