use std::{fmt::Display, num::NonZero};

use crate::token::FrameError;

const ROUTINE_ERROR_MASK: u32 = 0x00ff_0000;
const ROUTINE_ERROR_OFFSET: u32 = 16;

/// A GSS-API major status carrying a routine error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GssErrorCode(NonZero<u32>);
impl GssErrorCode {
    pub const BAD_MECH: Self = Self::routine(1);
    pub const BAD_NAME: Self = Self::routine(2);
    pub const BAD_NAMETYPE: Self = Self::routine(3);
    pub const BAD_BINDINGS: Self = Self::routine(4);
    pub const BAD_STATUS: Self = Self::routine(5);
    pub const BAD_MIC: Self = Self::routine(6);
    pub const NO_CRED: Self = Self::routine(7);
    pub const NO_CONTEXT: Self = Self::routine(8);
    pub const DEFECTIVE_TOKEN: Self = Self::routine(9);
    pub const DEFECTIVE_CREDENTIAL: Self = Self::routine(10);
    pub const CREDENTIALS_EXPIRED: Self = Self::routine(11);
    pub const CONTEXT_EXPIRED: Self = Self::routine(12);
    pub const FAILURE: Self = Self::routine(13);
    pub const BAD_QOP: Self = Self::routine(14);
    pub const UNAUTHORIZED: Self = Self::routine(15);
    pub const UNAVAILABLE: Self = Self::routine(16);
    pub const DUPLICATE_ELEMENT: Self = Self::routine(17);
    pub const NAME_NOT_MN: Self = Self::routine(18);

    const fn routine(code: u32) -> Self {
        match NonZero::new(code << ROUTINE_ERROR_OFFSET) {
            Some(code) => Self(code),
            None => panic!("routine error codes start at 1"),
        }
    }
    pub fn new(val: u32) -> Option<Self> {
        NonZero::new(val).map(Self)
    }
    pub fn get(self) -> u32 {
        self.0.get()
    }
    fn routine_error(self) -> u32 {
        (self.0.get() & ROUTINE_ERROR_MASK) >> ROUTINE_ERROR_OFFSET
    }
}
impl Display for GssErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self.routine_error() {
            1 => "An unsupported mechanism was requested",
            2 => "An invalid name was supplied",
            3 => "A supplied name was of an unsupported type",
            4 => "Incorrect channel bindings were supplied",
            5 => "An invalid status code was supplied",
            6 => "A token had an invalid Message Integrity Check (MIC)",
            7 => "No credentials were supplied, or the credentials were unavailable or inaccessible",
            8 => "No context has been established",
            9 => "A token was invalid",
            10 => "A credential was invalid",
            11 => "The referenced credential has expired",
            12 => "The referenced context has expired",
            13 => "Unspecified GSS failure",
            14 => "The quality-of-protection requested could not be provided",
            15 => "The operation is forbidden by local security policy",
            16 => "The operation or option is not available or unsupported",
            17 => "The requested credential element already exists",
            18 => "The provided name was not a mechanism name",
            _ => return write!(f, "Unknown GSS major status {:#010x}", self.0),
        };
        f.write_str(message)
    }
}

/// A mechanism specific minor status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MechanismErrorCode(NonZero<u32>);
impl MechanismErrorCode {
    pub fn new(val: u32) -> Option<Self> {
        NonZero::new(val).map(Self)
    }
    pub fn get(self) -> u32 {
        self.0.get()
    }
}
impl Display for MechanismErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mechanism error {:#x}", self.0)
    }
}

/// Errors of the mediated capability objects.
///
/// Engine errors are handed through as they are.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Gss(GssErrorCode),
    #[error("{0}")]
    Mechanism(MechanismErrorCode),
    #[error("{major}: {message}")]
    Engine { major: GssErrorCode, message: String },
    #[error("Defective credential: {0}")]
    DefectiveCredential(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
impl Error {
    pub fn gss(val: u32) -> Option<Self> {
        GssErrorCode::new(val).map(Error::Gss)
    }
    pub fn mechanism(val: u32) -> Option<Self> {
        MechanismErrorCode::new(val).map(Error::Mechanism)
    }
    pub fn engine(major: GssErrorCode, message: impl Into<String>) -> Self {
        Self::Engine {
            major,
            message: message.into(),
        }
    }
    /// The major status a GSS caller would see for this error
    pub fn major(&self) -> GssErrorCode {
        match self {
            Self::Gss(code) | Self::Engine { major: code, .. } => *code,
            Self::Mechanism(_) => GssErrorCode::FAILURE,
            Self::DefectiveCredential(_) => GssErrorCode::DEFECTIVE_CREDENTIAL,
            Self::Unavailable(_) | Self::Frame(FrameError::Unavailable) => GssErrorCode::UNAVAILABLE,
            Self::Frame(_) => GssErrorCode::DEFECTIVE_TOKEN,
        }
    }
}
impl From<GssErrorCode> for Error {
    fn from(value: GssErrorCode) -> Self {
        Self::Gss(value)
    }
}
impl From<MechanismErrorCode> for Error {
    fn from(value: MechanismErrorCode) -> Self {
        Self::Mechanism(value)
    }
}
