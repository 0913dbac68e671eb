use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            /// Creates a new id from its database value.
            #[must_use]
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying i64 value.
            #[must_use]
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map($name::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user.
    UserId
);
define_id!(
    /// Unique identifier for a writing test session.
    SessionId
);
define_id!(
    /// Unique identifier for an essay.
    EssayId
);
define_id!(
    /// Unique identifier for a writing prompt.
    PromptId
);
define_id!(
    /// Unique identifier for a reading test.
    ReadingTestId
);
define_id!(
    /// Unique identifier for a reading question.
    QuestionId
);
