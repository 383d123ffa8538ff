//! The wire `error_code` enumeration (spec.md §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ErrorCode {
    BadInitialization,
    IncorrectType,
    UnregisteredClient,
    InvalidTask,
    ErrorInTask,
    TaskTimeout,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::BadInitialization => 0,
            ErrorCode::IncorrectType => 1,
            ErrorCode::UnregisteredClient => 2,
            ErrorCode::InvalidTask => 3,
            ErrorCode::ErrorInTask => 4,
            ErrorCode::TaskTimeout => 5,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, i32> {
        match value {
            0 => Ok(ErrorCode::BadInitialization),
            1 => Ok(ErrorCode::IncorrectType),
            2 => Ok(ErrorCode::UnregisteredClient),
            3 => Ok(ErrorCode::InvalidTask),
            4 => Ok(ErrorCode::ErrorInTask),
            5 => Ok(ErrorCode::TaskTimeout),
            other => Err(other),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(value: ErrorCode) -> Self {
        value.as_i32()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::BadInitialization => "BAD_INITIALIZATION",
            ErrorCode::IncorrectType => "INCORRECT_TYPE",
            ErrorCode::UnregisteredClient => "UNREGISTERED_CLIENT",
            ErrorCode::InvalidTask => "INVALID_TASK",
            ErrorCode::ErrorInTask => "ERROR_IN_TASK",
            ErrorCode::TaskTimeout => "TASK_TIMEOUT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_i32() {
        for code in [
            ErrorCode::BadInitialization,
            ErrorCode::IncorrectType,
            ErrorCode::UnregisteredClient,
            ErrorCode::InvalidTask,
            ErrorCode::ErrorInTask,
            ErrorCode::TaskTimeout,
        ] {
            assert_eq!(ErrorCode::try_from(code.as_i32()).unwrap(), code);
        }
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        assert!(ErrorCode::try_from(6).is_err());
    }
}
