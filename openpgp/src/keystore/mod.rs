//! Key stores.
//!
//! A [`KeyStore`] is an ordered collection of [`KeyRecord`]s, public
//! or secret.  Records live in an arena and are addressed by
//! [`KeyHandle`]s; a primary key's subkeys are a list of handles into
//! the same store.  Handles stay valid until the record is removed.
//!
//! Records are only created by reading packets: [`KeyStore::read`]
//! feeds a [`PacketParser`]'s events to a reader that assembles keys,
//! user IDs, signatures and revocations.  Key generation goes through
//! the same path.
//!
//! # Examples
//!
//! ```
//! use openpgp_keyring as openpgp;
//! use openpgp::keystore::KeyStore;
//! use openpgp::serialize::Serialize;
//!
//! # fn main() -> openpgp::Result<()> {
//! let store = KeyStore::from_bytes(b"")?;
//! assert!(store.is_empty());
//! assert!(store.to_vec()?.is_empty());
//! # Ok(()) }
//! ```
//!
//! [`PacketParser`]: crate::parse::PacketParser

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::packet::{Key, Signature, Trust, UserAttribute, UserID};
use crate::parse::{PacketParser, ParseSummary, RawPacket};
use crate::provider::{KeyProvider, KeyRequest, KeySearch};
use crate::serialize::Serialize;
use crate::types::{Duration, KeyFlags, ReasonForRevocation, Timestamp};

mod reader;
use self::reader::KeyStoreReader;

/// Addresses a record in a [`KeyStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyHandle(usize);

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user ID or user attribute of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    /// A user ID.
    UserID(UserID),
    /// A user attribute.
    UserAttribute(UserAttribute),
}

impl Identity {
    /// Returns the user ID, if this is one.
    pub fn userid(&self) -> Option<&UserID> {
        match self {
            Identity::UserID(u) => Some(u),
            Identity::UserAttribute(_) => None,
        }
    }

    /// Returns the user attribute, if this is one.
    pub fn user_attribute(&self) -> Option<&UserAttribute> {
        match self {
            Identity::UserID(_) => None,
            Identity::UserAttribute(ua) => Some(ua),
        }
    }

    /// Returns whether this is a user ID containing `name`, ignoring
    /// case.
    pub fn matches(&self, name: &str) -> bool {
        self.userid().map(|u| u.contains_ignore_case(name)).unwrap_or(false)
    }
}

/// A signature, with the state recorded while reading it.
#[derive(Clone, Debug)]
pub struct SigRecord {
    signature: Signature,
    identity: Option<usize>,
    issuer: Option<KeyID>,
    creation_time: Option<Timestamp>,
    expiration: Option<Duration>,
    trust_signature: Option<(u8, u8)>,
    trust: Option<Trust>,
}

impl SigRecord {
    pub(crate) fn new(signature: Signature, identity: Option<usize>) -> Self {
        SigRecord {
            signature,
            identity,
            issuer: None,
            creation_time: None,
            expiration: None,
            trust_signature: None,
            trust: None,
        }
    }

    /// Returns the signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the index of the identity this signature follows.
    pub fn identity(&self) -> Option<usize> {
        self.identity
    }

    /// Returns the issuer's key ID.
    pub fn issuer(&self) -> Option<KeyID> {
        self.issuer
    }

    /// Returns the signature's creation time.
    pub fn creation_time(&self) -> Option<Timestamp> {
        self.creation_time
    }

    /// Returns how long the signature is valid.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Returns the trust level and amount of a trust signature.
    pub fn trust_signature(&self) -> Option<(u8, u8)> {
        self.trust_signature
    }

    /// Returns the trust packet that followed the signature.
    pub fn trust(&self) -> Option<&Trust> {
        self.trust.as_ref()
    }
}

/// What a revocation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationTarget {
    /// The whole key.
    Key,
    /// The identity with this index.
    UserID(usize),
}

/// A revocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revocation {
    code: ReasonForRevocation,
    reason: String,
    target: RevocationTarget,
}

impl Revocation {
    pub(crate) fn new(code: ReasonForRevocation, message: &[u8],
                      target: RevocationTarget)
                      -> Self {
        let reason = if message.is_empty() {
            code.to_string()
        } else {
            String::from_utf8_lossy(message).into_owned()
        };
        Revocation { code, reason, target }
    }

    /// Returns the reason code.
    pub fn code(&self) -> ReasonForRevocation {
        self.code
    }

    /// Returns the human-readable reason.
    ///
    /// If the revocation has no message, this describes the code.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns what is revoked.
    pub fn target(&self) -> RevocationTarget {
        self.target
    }
}

/// A primary key or subkey, and everything read about it.
#[derive(Clone, Debug)]
pub struct KeyRecord {
    handle: KeyHandle,
    key: Key,
    secret: bool,
    keyid: KeyID,
    fingerprint: Fingerprint,
    primary: Option<KeyHandle>,
    subkeys: Vec<KeyHandle>,
    identities: Vec<Identity>,
    signatures: Vec<SigRecord>,
    revocation: Option<Revocation>,
    uid_revocations: Vec<Revocation>,
    flags: Option<KeyFlags>,
    expiration: Option<Duration>,
    primary_identity: Option<usize>,
    packets: Vec<RawPacket>,
}

impl KeyRecord {
    pub(crate) fn new(key: Key, secret: bool, primary: Option<KeyHandle>)
                      -> Self {
        KeyRecord {
            handle: KeyHandle(0),
            keyid: key.keyid(),
            fingerprint: key.fingerprint(),
            key,
            secret,
            primary,
            subkeys: Vec::new(),
            identities: Vec::new(),
            signatures: Vec::new(),
            revocation: None,
            uid_revocations: Vec::new(),
            flags: None,
            expiration: None,
            primary_identity: None,
            packets: Vec::new(),
        }
    }

    /// Returns the record's handle in its store.
    pub fn handle(&self) -> KeyHandle {
        self.handle
    }

    /// Returns the key packet.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Returns whether this record was read from a secret key packet.
    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Returns whether this is a primary key.
    pub fn is_primary(&self) -> bool {
        self.primary.is_none()
    }

    /// Returns the key ID.
    pub fn keyid(&self) -> KeyID {
        self.keyid
    }

    /// Returns the fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the owning primary's handle, for subkeys.
    pub fn primary(&self) -> Option<KeyHandle> {
        self.primary
    }

    /// Returns the handles of a primary key's subkeys.
    pub fn subkeys(&self) -> &[KeyHandle] {
        &self.subkeys
    }

    /// Returns the user IDs and user attributes.
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    /// Returns the user IDs.
    pub fn userids(&self) -> impl Iterator<Item = &UserID> {
        self.identities.iter().filter_map(Identity::userid)
    }

    /// Returns the index of the primary identity.
    ///
    /// This is 0 if no identity is marked as primary.
    pub fn primary_identity(&self) -> usize {
        self.primary_identity.unwrap_or(0)
    }

    /// Returns the signatures.
    pub fn signatures(&self) -> &[SigRecord] {
        &self.signatures
    }

    /// Returns the key-wide revocation, if any.
    pub fn revocation(&self) -> Option<&Revocation> {
        self.revocation.as_ref()
    }

    /// Returns whether the key is revoked.
    pub fn is_revoked(&self) -> bool {
        self.revocation.is_some()
    }

    /// Returns the revocations of individual identities.
    pub fn uid_revocations(&self) -> &[Revocation] {
        &self.uid_revocations
    }

    /// Returns whether the identity with index `i` is revoked.
    pub fn is_identity_revoked(&self, i: usize) -> bool {
        self.uid_revocations.iter()
            .any(|r| r.target == RevocationTarget::UserID(i))
    }

    /// Returns the usage flags from the last self-signature read.
    pub fn key_flags(&self) -> Option<&KeyFlags> {
        self.flags.as_ref()
    }

    /// Returns the key's validity period.
    pub fn key_expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Returns whether the key may be used for signing.
    ///
    /// Without usage flags, the algorithm decides.
    pub fn can_sign(&self) -> bool {
        let algo = self.key.pk_algo();
        algo.for_signing()
            && self.flags.as_ref().map(|f| f.for_signing()).unwrap_or(true)
    }

    /// Returns whether the key may be used for encryption.
    pub fn can_encrypt(&self) -> bool {
        let algo = self.key.pk_algo();
        algo.for_encryption()
            && self.flags.as_ref()
            .map(|f| f.for_transport_encryption()
                 || f.for_storage_encryption())
            .unwrap_or(true)
    }

    /// Returns the retained raw packets.
    pub fn packets(&self) -> &[RawPacket] {
        &self.packets
    }

    /// Returns whether a user ID contains `name`, ignoring case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.identities.iter().any(|i| i.matches(name))
    }

    fn matches_keyid(&self, id: &KeyID) -> bool {
        &self.keyid == id
    }
}

/// What [`KeyStore::import`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Primary keys that were added.
    pub new_keys: usize,
    /// Subkeys that were added, including those of new keys.
    pub new_subkeys: usize,
    /// Keys and subkeys that were already present.
    pub unchanged: usize,
}

/// An ordered collection of keys.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    keys: Vec<Option<KeyRecord>>,
    path: Option<PathBuf>,
    dropped_subpackets: usize,
}

impl KeyStore {
    /// Returns an empty store.
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns an empty store backed by `path`.
    ///
    /// The file holds a stream of transferable public or secret keys.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        KeyStore {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Reads a store from `data`.
    pub fn from_bytes<D: AsRef<[u8]> + ?Sized>(data: &D) -> Result<Self> {
        let mut store = KeyStore::new();
        store.read(&mut PacketParser::from_bytes(data))?;
        Ok(store)
    }

    /// Returns the backing path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the number of records, subkeys included.
    pub fn len(&self) -> usize {
        self.keys.iter().filter(|k| k.is_some()).count()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of subpackets dropped while reading because
    /// there was no signature to apply them to.
    pub fn dropped_subpackets(&self) -> usize {
        self.dropped_subpackets
    }

    /// Returns the record `handle` refers to.
    pub fn key(&self, handle: KeyHandle) -> Option<&KeyRecord> {
        self.keys.get(handle.0).and_then(|k| k.as_ref())
    }

    fn key_mut(&mut self, handle: KeyHandle) -> Option<&mut KeyRecord> {
        self.keys.get_mut(handle.0).and_then(|k| k.as_mut())
    }

    /// Iterates over all records, subkeys included, in order.
    pub fn list(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.iter().filter_map(|k| k.as_ref())
    }

    /// Iterates over the primary keys.
    pub fn primaries(&self) -> impl Iterator<Item = &KeyRecord> {
        self.list().filter(|k| k.is_primary())
    }

    /// Returns the primary key owning `handle`.
    pub fn primary_of(&self, handle: KeyHandle) -> Option<&KeyRecord> {
        self.key(handle)?.primary.and_then(|p| self.key(p))
    }

    /// Iterates over the subkeys of `handle`.
    pub fn subkeys_of(&self, handle: KeyHandle)
                      -> impl Iterator<Item = &KeyRecord> {
        self.key(handle)
            .map(|k| &k.subkeys[..])
            .unwrap_or(&[])
            .iter()
            .filter_map(move |h| self.key(*h))
    }

    /// Returns the first record with the given key ID.
    pub fn get_by_id(&self, id: &KeyID) -> Option<&KeyRecord> {
        self.list().find(|k| k.matches_keyid(id))
    }

    /// Returns the record with the given fingerprint.
    pub fn get_by_fingerprint(&self, fp: &Fingerprint) -> Option<&KeyRecord> {
        self.list().find(|k| &k.fingerprint == fp)
    }

    /// Returns the next record with a user ID containing `name`,
    /// ignoring case.
    ///
    /// The search starts at `*cursor`, which is advanced past the
    /// match, so that calling this again returns the next match.
    /// Start with a cursor of 0.
    pub fn get_next_by_name(&self, name: &str, cursor: &mut usize)
                            -> Option<&KeyRecord> {
        while *cursor < self.keys.len() {
            let i = *cursor;
            *cursor += 1;
            if let Some(k) = &self.keys[i] {
                if k.matches_name(name) {
                    return Some(k);
                }
            }
        }
        None
    }

    /// Looks up a key by hexadecimal key ID, hexadecimal fingerprint,
    /// or user ID.
    ///
    /// Hexadecimal input may have a `0x` prefix and embedded spaces.
    /// An eight digit key ID matches the low 32 bits.
    pub fn search(&self, what: &str) -> Option<&KeyRecord> {
        let hex: String = what.trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X")
            .chars()
            .filter(|c| ! c.is_whitespace())
            .collect();

        if ! hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let found = match hex.len() {
                8 => self.list().find(|k| k.keyid.to_hex().ends_with(
                    &hex.to_uppercase())),
                16 => KeyID::from_hex(&hex).ok()
                    .and_then(|id| self.get_by_id(&id)),
                32 | 40 => Fingerprint::from_hex(&hex).ok()
                    .and_then(|fp| self.get_by_fingerprint(&fp)),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }

        self.get_next_by_name(what, &mut 0)
    }

    /// Adds a record.
    ///
    /// A primary key is added without subkeys.  A subkey's primary
    /// must be present in this store; the subkey is appended to its
    /// subkey list.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` if a key with the same
    /// fingerprint is present, and `Error::NoSuchKey` if a subkey's
    /// primary is not.
    pub fn add(&mut self, mut record: KeyRecord) -> Result<KeyHandle> {
        if self.get_by_fingerprint(&record.fingerprint).is_some() {
            return Err(Error::InvalidOperation(format!(
                "{} is already present", record.fingerprint)).into());
        }
        if let Some(p) = record.primary {
            if ! self.key(p).map(|p| p.is_primary()).unwrap_or(false) {
                return Err(Error::NoSuchKey(format!(
                    "primary {} of {}", p, record.fingerprint)).into());
            }
        }
        record.subkeys.clear();
        Ok(self.push(record))
    }

    /// Appends a record without any checks.
    fn push(&mut self, mut record: KeyRecord) -> KeyHandle {
        let handle = KeyHandle(self.keys.len());
        record.handle = handle;
        if let Some(p) = record.primary {
            if let Some(primary) = self.key_mut(p) {
                primary.subkeys.push(handle);
            }
        }
        self.keys.push(Some(record));
        handle
    }

    /// Removes a record.
    ///
    /// Removing a subkey detaches it from its primary.  Removing a
    /// primary removes its subkeys too.  Retained packets shared with
    /// other records or stores stay valid.
    pub fn remove(&mut self, handle: KeyHandle) -> Option<KeyRecord> {
        let record = self.keys.get_mut(handle.0)?.take()?;
        match record.primary {
            Some(p) => {
                if let Some(primary) = self.key_mut(p) {
                    primary.subkeys.retain(|h| *h != handle);
                }
            },
            None => for h in &record.subkeys {
                if let Some(slot) = self.keys.get_mut(h.0) {
                    *slot = None;
                }
            },
        }
        log::debug!("Removed {} ({})", record.fingerprint, handle);
        Some(record)
    }

    /// Merges the keys of `other` into this store.
    ///
    /// Keys are matched by fingerprint.  Keys already present are
    /// left untouched, but subkeys that are not yet present are
    /// attached to them.
    ///
    /// The merge is all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOperation` if a key is a primary key in
    /// one store and a subkey in the other.  This store is unchanged.
    pub fn import(&mut self, other: &KeyStore) -> Result<ImportSummary> {
        self.check_import(other)?;

        let mut summary = ImportSummary::default();
        for theirs in other.primaries() {
            let primary = match self.get_by_fingerprint(&theirs.fingerprint) {
                Some(ours) => {
                    summary.unchanged += 1;
                    ours.handle
                },
                None => {
                    summary.new_keys += 1;
                    self.add(theirs.clone())?
                },
            };

            for sub in other.subkeys_of(theirs.handle) {
                if self.get_by_fingerprint(&sub.fingerprint).is_some() {
                    summary.unchanged += 1;
                    continue;
                }
                let mut sub = sub.clone();
                sub.primary = Some(primary);
                self.add(sub)?;
                summary.new_subkeys += 1;
            }
        }

        log::debug!("Imported {} keys and {} subkeys, {} unchanged",
                    summary.new_keys, summary.new_subkeys, summary.unchanged);
        Ok(summary)
    }

    /// Checks that `other` can be merged without a key changing its
    /// role.
    fn check_import(&self, other: &KeyStore) -> Result<()> {
        for theirs in other.primaries() {
            if let Some(ours) = self.get_by_fingerprint(&theirs.fingerprint) {
                if ! ours.is_primary() {
                    return Err(Error::InvalidOperation(format!(
                        "Cannot import primary key {}: it is a subkey here",
                        theirs.fingerprint)).into());
                }
            }
            for sub in other.subkeys_of(theirs.handle) {
                if let Some(ours) = self.get_by_fingerprint(&sub.fingerprint) {
                    if ours.is_primary() {
                        return Err(Error::InvalidOperation(format!(
                            "Cannot import subkey {}: it is a primary key here",
                            sub.fingerprint)).into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads keys from `parser` into this store.
    ///
    /// Reading is all or nothing: the keys are collected in a
    /// separate store, which is only imported if parsing succeeds.
    /// Subpacket events are always enabled.
    ///
    /// # Errors
    ///
    /// Returns the parser's error, or `Error::InvalidOperation` if
    /// parsing was aborted.
    pub fn read(&mut self, parser: &mut PacketParser) -> Result<ParseSummary> {
        tracer!("KeyStore::read");

        let mut staging = KeyStore::new();
        parser.config_mut().emit_subpackets = true;
        let summary = {
            let mut reader = KeyStoreReader::new(&mut staging);
            parser.dispatch(&mut reader)?
        };
        if summary.finished_early {
            return Err(Error::InvalidOperation(
                "Reading keys was aborted".into()).into());
        }
        t!("read {} packets into {} records", summary.packets, staging.len());

        self.import(&staging)?;
        self.dropped_subpackets += staging.dropped_subpackets;
        Ok(summary)
    }

    /// Reads keys from `data` into this store.
    pub fn read_bytes<D: AsRef<[u8]> + ?Sized>(&mut self, data: &D)
                                               -> Result<ParseSummary> {
        self.read(&mut PacketParser::from_bytes(data))
    }

    /// Reads the store from its backing path.
    ///
    /// # Errors
    ///
    /// Fails if the store has no path.
    pub fn load(&mut self) -> Result<ParseSummary> {
        let path = self.backing_path()?.to_path_buf();
        log::debug!("Loading key store {}", path.display());
        let mut parser = PacketParser::from_file(&path)?;
        self.read(&mut parser)
    }

    /// Writes the store to its backing path.
    pub fn save(&self) -> Result<()> {
        let path = self.backing_path()?;
        log::debug!("Saving {} keys to {}", self.len(), path.display());
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        self.serialize(&mut file)?;
        io::Write::flush(&mut file)?;
        Ok(())
    }

    fn backing_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| Error::InvalidOperation(
            "Key store has no path".into()).into())
    }
}

impl Serialize for KeyStore {
    /// Writes the retained packets of every primary key followed by
    /// those of its subkeys.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        for primary in self.primaries() {
            for p in primary.packets.iter() {
                o.write_all(p.as_bytes())?;
            }
            for sub in self.subkeys_of(primary.handle) {
                for p in sub.packets.iter() {
                    o.write_all(p.as_bytes())?;
                }
            }
        }
        Ok(())
    }
}

impl KeyProvider for KeyStore {
    fn find_key(&self, request: &KeyRequest) -> Option<&KeyRecord> {
        let secret = request.secret;
        let ok = move |k: &&KeyRecord| ! secret || k.key.has_secret();
        match &request.search {
            KeySearch::KeyID(id) =>
                self.list().filter(|k| k.matches_keyid(id)).find(ok),
            KeySearch::Fingerprint(fp) =>
                self.get_by_fingerprint(fp).filter(ok),
            KeySearch::UserID(name) =>
                self.primaries().filter(|k| k.matches_name(name)).find(ok),
        }
    }
}

#[cfg(test)]
mod tests;
