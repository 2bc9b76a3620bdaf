//! Capabilities the engine consumes from its caller.
//!
//! Passphrases and keys are not looked up by the engine itself.
//! Instead, operations that need them take a [`PassphraseProvider`]
//! or a [`KeyProvider`].  The [`KeyStore`] is a `KeyProvider`;
//! passphrase providers are typically prompts, and closures
//! implement the trait for convenience.
//!
//! [`KeyStore`]: crate::keystore::KeyStore

use std::fmt;

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::crypto::Password;
use crate::keystore::KeyRecord;
use crate::packet::Key;

/// The default number of times a passphrase is asked for.
pub const MAX_PASSPHRASE_ATTEMPTS: usize = 3;

/// The operation a passphrase is requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Signing data.
    Sign,
    /// Decrypting a session key.
    Decrypt,
    /// Unlocking a key for an unspecified operation.
    Unlock,
    /// Protecting a newly generated key.
    Protect,
    /// Binding a new subkey.
    AddSubkey,
    /// Certifying a new user ID.
    AddUserID,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Operation::Sign => "sign",
            Operation::Decrypt => "decrypt",
            Operation::Unlock => "unlock",
            Operation::Protect => "protect",
            Operation::AddSubkey => "add subkey",
            Operation::AddUserID => "add user ID",
        };
        f.write_str(s)
    }
}

/// What a passphrase is requested for.
#[derive(Debug)]
pub struct PassphraseContext<'a> {
    key: &'a Key,
    operation: Operation,
    attempt: usize,
}

impl<'a> PassphraseContext<'a> {
    /// Creates a context for the first attempt.
    pub fn new(key: &'a Key, operation: Operation) -> Self {
        PassphraseContext { key, operation, attempt: 1 }
    }

    /// Returns the key that is to be unlocked.
    pub fn key(&self) -> &Key {
        self.key
    }

    /// Returns the operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the number of the current attempt, starting at 1.
    pub fn attempt(&self) -> usize {
        self.attempt
    }
}

/// Supplies passphrases.
pub trait PassphraseProvider {
    /// Returns the passphrase for `ctx`, or `None` to give up.
    fn passphrase(&mut self, ctx: &PassphraseContext) -> Option<Password>;
}

impl<F> PassphraseProvider for F
    where F: FnMut(&PassphraseContext) -> Option<Password>
{
    fn passphrase(&mut self, ctx: &PassphraseContext) -> Option<Password> {
        self(ctx)
    }
}

/// A provider that always returns the same passphrase.
#[derive(Clone, Debug)]
pub struct FixedPassphrase(Password);

impl FixedPassphrase {
    /// Returns a provider for `password`.
    pub fn new<P: Into<Password>>(password: P) -> Self {
        FixedPassphrase(password.into())
    }
}

impl PassphraseProvider for FixedPassphrase {
    fn passphrase(&mut self, _: &PassphraseContext) -> Option<Password> {
        Some(self.0.clone())
    }
}

/// A provider that never has a passphrase.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPassphrase;

impl PassphraseProvider for NoPassphrase {
    fn passphrase(&mut self, _: &PassphraseContext) -> Option<Password> {
        None
    }
}

/// How often a passphrase is asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempts {
    /// At most this many times.
    Limited(usize),
    /// Until the provider gives up.
    Infinite,
}

impl Default for Attempts {
    fn default() -> Self {
        Attempts::Limited(MAX_PASSPHRASE_ATTEMPTS)
    }
}

impl Attempts {
    fn allows(&self, attempt: usize) -> bool {
        match self {
            Attempts::Limited(n) => attempt <= *n,
            Attempts::Infinite => true,
        }
    }
}

/// Returns a copy of `key` with its secret key material decrypted.
///
/// If the secret is not protected, the key is returned as is.
/// Otherwise `provider` is asked for a passphrase until one decrypts
/// the key, the provider returns `None`, or `attempts` are used up.
/// The decrypted material is wiped when the returned key is dropped.
///
/// # Errors
///
/// Returns `Error::MissingSecretKey` if `key` has no secret,
/// `Error::MissingPassphrase` if the provider gives up, and
/// `Error::BadPassphrase` if every attempt failed.
pub fn unlock_with(key: &Key, operation: Operation,
                   provider: &mut dyn PassphraseProvider,
                   attempts: Attempts)
                   -> Result<Key> {
    tracer!("unlock_with");

    if ! key.has_secret() {
        return Err(Error::MissingSecretKey.into());
    }
    if key.has_unencrypted_secret() {
        return Ok(key.clone());
    }

    let mut ctx = PassphraseContext::new(key, operation);
    while attempts.allows(ctx.attempt) {
        let password = match provider.passphrase(&ctx) {
            Some(p) => p,
            None => return Err(Error::MissingPassphrase.into()),
        };

        let mut unlocked = key.clone();
        match unlocked.decrypt_secret(&password) {
            Ok(()) => {
                t!("{} unlocked after {} attempts", key.keyid(), ctx.attempt);
                return Ok(unlocked);
            },
            Err(e) => match e.downcast_ref::<Error>() {
                Some(Error::BadPassphrase) => log::warn!(
                    "Bad passphrase for {} (attempt {})",
                    key.keyid(), ctx.attempt),
                _ => return Err(e),
            },
        }
        ctx.attempt += 1;
    }

    Err(Error::BadPassphrase.into())
}

/// What a [`KeyRequest`] searches for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySearch {
    /// A key ID.
    KeyID(KeyID),
    /// A fingerprint.
    Fingerprint(Fingerprint),
    /// A case-insensitive user ID substring.
    UserID(String),
}

/// A request for a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRequest {
    /// What to search for.
    pub search: KeySearch,
    /// Whether the key must carry secret key material.
    pub secret: bool,
}

impl KeyRequest {
    /// Requests the public key with the given key ID.
    pub fn by_keyid(id: KeyID) -> Self {
        KeyRequest { search: KeySearch::KeyID(id), secret: false }
    }

    /// Requests the public key with the given fingerprint.
    pub fn by_fingerprint(fp: Fingerprint) -> Self {
        KeyRequest { search: KeySearch::Fingerprint(fp), secret: false }
    }

    /// Requests the first public key with a matching user ID.
    pub fn by_userid<S: Into<String>>(name: S) -> Self {
        KeyRequest { search: KeySearch::UserID(name.into()), secret: false }
    }

    /// Requires secret key material.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Resolves keys.
pub trait KeyProvider {
    /// Returns the key matching `request`, if any.
    fn find_key(&self, request: &KeyRequest) -> Option<&KeyRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Curve;

    fn protected(password: &str) -> Key {
        let mut key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        key.encrypt_secret(&password.into()).unwrap();
        key
    }

    #[test]
    fn unprotected_keys_need_no_passphrase() {
        let key = Key::generate_ecc(true, Curve::Ed25519).unwrap();
        let unlocked = unlock_with(&key, Operation::Sign, &mut NoPassphrase,
                                   Attempts::default()).unwrap();
        assert_eq!(unlocked, key);

        let public = key.without_secret();
        let e = unlock_with(&public, Operation::Sign, &mut NoPassphrase,
                            Attempts::default()).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingSecretKey));
    }

    #[test]
    fn retries() {
        let key = protected("streng geheim");

        let mut asked = Vec::new();
        let mut provider = |ctx: &PassphraseContext| {
            asked.push((ctx.attempt(), ctx.operation()));
            let p = if ctx.attempt() < 3 { "wrong" } else { "streng geheim" };
            Some(p.into())
        };
        let unlocked = unlock_with(&key, Operation::Sign, &mut provider,
                                   Attempts::default()).unwrap();
        assert!(unlocked.has_unencrypted_secret());
        assert_eq!(asked, vec![(1, Operation::Sign), (2, Operation::Sign),
                               (3, Operation::Sign)]);
    }

    #[test]
    fn attempts_run_out() {
        let key = protected("streng geheim");

        let mut n = 0;
        let mut provider = |_: &PassphraseContext| {
            n += 1;
            Some("wrong".into())
        };
        let e = unlock_with(&key, Operation::Unlock, &mut provider,
                            Attempts::Limited(2)).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::BadPassphrase));
        assert_eq!(n, 2);

        let e = unlock_with(&key, Operation::Unlock, &mut NoPassphrase,
                            Attempts::Infinite).unwrap_err();
        assert_eq!(e.downcast_ref::<Error>(), Some(&Error::MissingPassphrase));

        // Infinite attempts end when the provider gives up.
        let mut n = 0;
        let mut provider = |_: &PassphraseContext| {
            n += 1;
            if n < 10 { Some("wrong".into()) } else { None }
        };
        assert!(unlock_with(&key, Operation::Unlock, &mut provider,
                            Attempts::Infinite).is_err());
        assert_eq!(n, 10);
    }

    #[test]
    fn fixed_passphrase() {
        let key = protected("hunter2");
        let unlocked = unlock_with(&key, Operation::Decrypt,
                                   &mut FixedPassphrase::new("hunter2"),
                                   Attempts::default()).unwrap();
        assert_eq!(unlocked.fingerprint(), key.fingerprint());
        assert!(unlocked.has_unencrypted_secret());
    }
}
