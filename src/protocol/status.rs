//! Response status codes and reply classification.

use crate::error::{Result, ZestError};

/// Successful response statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The resource was created (65).
    Created,
    /// The resource was deleted (66).
    Deleted,
    /// The reply carries a resource representation (69).
    Content,
}

impl Status {
    /// The wire code for this status.
    pub const fn code(self) -> u8 {
        match self {
            Status::Created => 65,
            Status::Deleted => 66,
            Status::Content => 69,
        }
    }

    /// Classify a reply code into an outcome.
    ///
    /// The three success codes map to their [`Status`]; the seven known
    /// failure codes map to named [`ZestError`] variants; anything else maps
    /// to the generic [`ZestError::Protocol`].
    pub fn classify(code: u8) -> Result<Status> {
        match code {
            65 => Ok(Status::Created),
            66 => Ok(Status::Deleted),
            69 => Ok(Status::Content),
            code => Err(ZestError::from_status_code(code)),
        }
    }
}
