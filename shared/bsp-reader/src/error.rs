use snafu::Snafu;

use crate::bsp::LumpKind;

/// The broad class of a parse failure, independent of where it happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    InvalidHeader,
    InvalidBody,
    UnsupportedVersion,
    OutOfBoundsAccess,
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid header{}: {}", describe_lump(lump), message))]
    InvalidHeader {
        lump: Option<LumpKind>,
        message: String,
    },

    #[snafu(display("invalid body{}: {}", describe_lump(lump), message))]
    InvalidBody {
        lump: Option<LumpKind>,
        message: String,
    },

    #[snafu(display("unsupported version{}: {}", describe_lump(lump), message))]
    UnsupportedVersion {
        lump: Option<LumpKind>,
        message: String,
    },

    #[snafu(display("out of bounds access{}: {}", describe_lump(lump), message))]
    OutOfBoundsAccess {
        lump: Option<LumpKind>,
        message: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn describe_lump(lump: &Option<LumpKind>) -> String {
    match lump {
        Some(lump) => format!(" in {lump:?} lump"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            lump: None,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_body(
        lump: impl Into<Option<LumpKind>>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidBody {
            lump: lump.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported_version(message: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            lump: None,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_bounds(
        lump: impl Into<Option<LumpKind>>,
        message: impl Into<String>,
    ) -> Self {
        Self::OutOfBoundsAccess {
            lump: lump.into(),
            message: message.into(),
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            Self::InvalidHeader { .. } => Reason::InvalidHeader,
            Self::InvalidBody { .. } => Reason::InvalidBody,
            Self::UnsupportedVersion { .. } => Reason::UnsupportedVersion,
            Self::OutOfBoundsAccess { .. } => Reason::OutOfBoundsAccess,
        }
    }

    pub fn lump(&self) -> Option<LumpKind> {
        match self {
            Self::InvalidHeader { lump, .. }
            | Self::InvalidBody { lump, .. }
            | Self::UnsupportedVersion { lump, .. }
            | Self::OutOfBoundsAccess { lump, .. } => *lump,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidHeader { message, .. }
            | Self::InvalidBody { message, .. }
            | Self::UnsupportedVersion { message, .. }
            | Self::OutOfBoundsAccess { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Reason};
    use crate::bsp::LumpKind;

    #[test]
    fn display_names_lump() {
        let error = Error::out_of_bounds(LumpKind::Edges, "edge 7 of 3");
        assert_eq!(
            error.to_string(),
            "out of bounds access in Edges lump: edge 7 of 3",
        );
        assert_eq!(error.reason(), Reason::OutOfBoundsAccess);
        assert_eq!(error.lump(), Some(LumpKind::Edges));
    }
}
