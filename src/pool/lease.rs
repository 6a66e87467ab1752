use std::ops::Deref;
use std::sync::Arc;

use super::{Credential, CredentialPool};

/// A credential bound to one streaming session.
///
/// Releases the credential exactly once: on [`release`](Self::release) or
/// when dropped, whichever comes first. Dropping covers every exit path of
/// the owner, including task cancellation.
pub struct CredentialLease {
    pool: CredentialPool,
    credential: Arc<Credential>,
    released: bool,
}

impl CredentialLease {
    pub(super) fn new(pool: CredentialPool, credential: Arc<Credential>) -> Self {
        Self {
            pool,
            credential,
            released: false,
        }
    }

    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.pool.release(&self.credential);
        }
    }
}

impl Deref for CredentialLease {
    type Target = Credential;

    fn deref(&self) -> &Credential {
        &self.credential
    }
}

impl Drop for CredentialLease {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for CredentialLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLease")
            .field("credential", &self.credential)
            .field("released", &self.released)
            .finish()
    }
}
