//! The invoking user, as recorded in the password database.

use nix::errno::Errno;
use nix::unistd::{Uid, User};
use thiserror::Error;

/// Errors raised while looking up the invoking user.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The real uid has no password database entry.
    #[error("can't find you in the passwd database (uid {uid})")]
    Unknown {
        /// Real user id.
        uid: u32,
    },
    /// The lookup itself failed.
    #[error("passwd lookup for uid {uid} failed: {source}")]
    Lookup {
        /// Real user id.
        uid: u32,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
}

/// Login name and uid of the person running the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokingUser {
    /// Login name.
    pub name: String,
    /// Real user id.
    pub uid: u32,
}

impl InvokingUser {
    /// Looks up the real uid of this process.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Unknown`] when the uid has no entry.
    pub fn current() -> Result<Self, IdentityError> {
        Self::lookup(Uid::current())
    }

    fn lookup(uid: Uid) -> Result<Self, IdentityError> {
        let raw = uid.as_raw();
        match User::from_uid(uid) {
            Ok(Some(user)) => Ok(Self {
                name: user.name,
                uid: raw,
            }),
            Ok(None) => Err(IdentityError::Unknown { uid: raw }),
            Err(source) => Err(IdentityError::Lookup { uid: raw, source }),
        }
    }
}
