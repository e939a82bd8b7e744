//! Wrappers reporting this provider as the owner of engine objects.
//!
//! Every wrapper owns exactly one engine delegate. Foreign objects, those not created through
//! this provider, are converted by rebuilding them from what they report about themselves.
use std::ops::Deref;

pub use context::MediatedContext;
pub use cred::MediatedCredential;
pub use name::MediatedName;

mod context;
mod cred;
mod name;

/// A capability object that was either mediated already or had to be converted
#[derive(Debug)]
pub enum Adopted<'a, T> {
    Existing(&'a T),
    Converted(T),
}
impl<T> Adopted<'_, T> {
    pub fn was_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }
    /// The converted object, if a new one had to be built
    pub fn into_converted(self) -> Option<T> {
        match self {
            Self::Existing(_) => None,
            Self::Converted(t) => Some(t),
        }
    }
}
impl<T> Deref for Adopted<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            Self::Existing(t) => t,
            Self::Converted(t) => t,
        }
    }
}
