//! Assembles parser events into key records.

use crate::Result;
use crate::packet::signature::subpacket::{Subpacket, SubpacketValue};
use crate::packet::Key;
use crate::parse::{Dispatch, Event, Handler};

use super::{
    Identity,
    KeyHandle,
    KeyRecord,
    KeyStore,
    Revocation,
    RevocationTarget,
    SigRecord,
};

/// The key store side of [`PacketParser::dispatch`].
///
/// Keys open a new record.  Everything else attaches to the current
/// record, and subpackets to its most recent signature.  Data that
/// has nowhere to go is dropped with a warning.
///
/// [`PacketParser::dispatch`]: crate::parse::PacketParser::dispatch
pub(super) struct KeyStoreReader<'a> {
    store: &'a mut KeyStore,
    /// The record packets are attached to.
    current: Option<KeyHandle>,
    /// The primary key subkeys are attached to.
    primary: Option<KeyHandle>,
    /// Whether the current packet was dropped.
    dropped: bool,
}

impl<'a> KeyStoreReader<'a> {
    pub fn new(store: &'a mut KeyStore) -> Self {
        KeyStoreReader {
            store,
            current: None,
            primary: None,
            dropped: false,
        }
    }

    fn current(&mut self) -> Option<&mut KeyRecord> {
        let h = self.current?;
        self.store.key_mut(h)
    }

    fn open_primary(&mut self, key: Key, secret: bool) {
        let handle = self.store.push(KeyRecord::new(key, secret, None));
        self.current = Some(handle);
        self.primary = Some(handle);
    }

    fn open_subkey(&mut self, key: Key, secret: bool) {
        match self.primary {
            Some(p) => {
                let handle = self.store.push(
                    KeyRecord::new(key, secret, Some(p)));
                self.current = Some(handle);
            },
            None => {
                log::warn!("Dropping subkey {} without a primary key",
                           key.keyid());
                self.dropped = true;
            },
        }
    }

    fn add_identity(&mut self, identity: Identity) {
        match self.current() {
            Some(k) => k.identities.push(identity),
            None => {
                log::warn!("Dropping {:?} without a key", identity);
                self.dropped = true;
            },
        }
    }

    fn add_signature(&mut self, sig: crate::packet::Signature) {
        match self.current() {
            Some(k) => {
                let identity = k.identities.len().checked_sub(1);
                k.signatures.push(SigRecord::new(sig, identity));
            },
            None => {
                log::warn!("Dropping {} signature without a key", sig.typ());
                self.dropped = true;
            },
        }
    }

    fn add_trust(&mut self, trust: crate::packet::Trust) {
        match self.current().and_then(|k| k.signatures.last_mut()) {
            Some(sig) => sig.trust = Some(trust),
            None => {
                log::warn!("Dropping trust packet without a signature");
                self.dropped = true;
            },
        }
    }

    /// Applies a subpacket to the current record's last signature.
    ///
    /// Subpackets that change the record itself are only honored in
    /// the hashed area.
    fn apply_subpacket(&mut self, hashed: bool, sp: Subpacket) {
        use self::SubpacketValue::*;

        let signed = self.current()
            .map(|k| ! k.signatures.is_empty())
            .unwrap_or(false);
        if ! signed {
            log::warn!("Dropping {:?} subpacket without a signature",
                       sp.tag());
            self.store.dropped_subpackets += 1;
            return;
        }
        let k = match self.current() {
            Some(k) => k,
            None => return,
        };
        let last_identity = k.identities.len().checked_sub(1);

        match sp.value() {
            Issuer(id) => if let Some(sig) = k.signatures.last_mut() {
                sig.issuer = Some(*id);
            },
            IssuerFingerprint(fp) => if let Some(sig) = k.signatures.last_mut() {
                if sig.issuer.is_none() {
                    sig.issuer = fp.to_keyid();
                }
            },
            SignatureCreationTime(t) => if let Some(sig) = k.signatures.last_mut() {
                sig.creation_time = Some(*t);
            },
            SignatureExpirationTime(d) => if let Some(sig) = k.signatures.last_mut() {
                sig.expiration = Some(*d);
            },
            TrustSignature { level, trust } =>
                if let Some(sig) = k.signatures.last_mut() {
                    sig.trust_signature = Some((*level, *trust));
                },
            KeyExpirationTime(d) if hashed => k.expiration = Some(*d),
            PrimaryUserID(true) if hashed =>
                if let Some(i) = last_identity {
                    k.primary_identity = Some(i);
                },
            ReasonForRevocation { code, reason } if hashed => match last_identity {
                None => k.revocation = Some(
                    Revocation::new(*code, reason, RevocationTarget::Key)),
                Some(i) => k.uid_revocations.push(
                    Revocation::new(*code, reason, RevocationTarget::UserID(i))),
            },
            KeyFlags(flags) if hashed => k.flags = Some(flags.clone()),
            _ => (),
        }
    }
}

impl<'a> Handler for KeyStoreReader<'a> {
    fn handle(&mut self, event: Event) -> Result<Dispatch> {
        match event {
            Event::PublicKey(k) => self.open_primary(k, false),
            Event::SecretKey(k) => self.open_primary(k, true),
            Event::PublicSubkey(k) => self.open_subkey(k, false),
            Event::SecretSubkey(k) => self.open_subkey(k, true),
            Event::UserID(u) => self.add_identity(Identity::UserID(u)),
            Event::UserAttribute(u) =>
                self.add_identity(Identity::UserAttribute(u)),
            Event::Signature(sig) => self.add_signature(sig),
            Event::Subpacket { hashed, subpacket } =>
                self.apply_subpacket(hashed, subpacket),
            Event::Trust(t) => self.add_trust(t),
            Event::Unknown(u) => {
                if let Some(e) = u.error() {
                    log::warn!("Skipping unreadable {} packet: {}", u.tag(), e);
                    self.dropped = true;
                }
            },
            Event::PacketEnd(raw) => {
                let dropped = std::mem::replace(&mut self.dropped, false);
                if ! dropped {
                    if let Some(k) = self.current() {
                        k.packets.push(raw);
                        return Ok(Dispatch::Retain);
                    }
                }
                return Ok(Dispatch::Release);
            },
        }
        Ok(Dispatch::Release)
    }
}
