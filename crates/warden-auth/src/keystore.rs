//! RSA key storage indexed by key id.
//!
//! Keys are loaded once at startup from a directory holding one PEM file per
//! key. The file stem is the key id (`kid`) that tokens carry in their
//! header, so rotating keys means adding a file and restarting.
//!
//! Private keys may be PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`);
//! the public half is derived from them. A public-only file (`PUBLIC KEY` or
//! `RSA PUBLIC KEY`) registers a verification-only key.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::der::pem;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{KeyKind, KeyLoadError, KeyNotFound};

struct KeyEntry {
    signing: Option<EncodingKey>,
    verifying: DecodingKey,
}

/// Immutable map from key id to key material.
///
/// Built once and shared behind an `Arc`; lookups take `&self` and never
/// lock.
pub struct KeyStore {
    keys: HashMap<String, KeyEntry>,
}

impl KeyStore {
    /// Loads every key file in `dir`.
    ///
    /// Hidden files and subdirectories are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read, holds no keys, two files share
    /// a stem, or any file is not a supported RSA key.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, KeyLoadError> {
        let dir = dir.as_ref();
        let read_err = |source| KeyLoadError::Read {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                return Err(KeyLoadError::InvalidKeyId { path });
            };
            if stem.starts_with('.') {
                continue;
            }
            if stem.is_empty() {
                return Err(KeyLoadError::InvalidKeyId { path });
            }

            let text = fs::read_to_string(&path).map_err(|source| KeyLoadError::Read {
                path: path.clone(),
                source,
            })?;
            entries.push((stem.to_string(), text));
        }

        if entries.is_empty() {
            return Err(KeyLoadError::Empty {
                path: dir.to_path_buf(),
            });
        }

        let store = Self::from_pem_entries(entries)?;
        tracing::info!(
            dir = %dir.display(),
            kids = ?store.key_ids(),
            "loaded signing keys"
        );
        Ok(store)
    }

    /// Builds a store from `(kid, pem)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on a repeated kid or any unparseable key.
    pub fn from_pem_entries<I, K, P>(entries: I) -> Result<Self, KeyLoadError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let mut keys = HashMap::new();
        for (kid, text) in entries {
            let kid = kid.into();
            let entry = decode_entry(&kid, text.as_ref())?;
            match keys.entry(kid) {
                Entry::Occupied(slot) => {
                    return Err(KeyLoadError::DuplicateKeyId {
                        kid: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }
        Ok(Self { keys })
    }

    /// Returns the signing key for `kid`.
    ///
    /// # Errors
    ///
    /// Fails if `kid` is unknown or verification-only.
    pub fn private_key(&self, kid: &str) -> Result<&EncodingKey, KeyNotFound> {
        self.keys
            .get(kid)
            .and_then(|entry| entry.signing.as_ref())
            .ok_or_else(|| KeyNotFound {
                kid: kid.to_string(),
                kind: KeyKind::Private,
            })
    }

    /// Returns the verification key for `kid`.
    ///
    /// # Errors
    ///
    /// Fails if `kid` is unknown.
    pub fn public_key(&self, kid: &str) -> Result<&DecodingKey, KeyNotFound> {
        self.keys
            .get(kid)
            .map(|entry| &entry.verifying)
            .ok_or_else(|| KeyNotFound {
                kid: kid.to_string(),
                kind: KeyKind::Public,
            })
    }

    /// Returns `true` if `kid` is present.
    #[must_use]
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// Returns `true` if `kid` can sign.
    #[must_use]
    pub fn can_sign(&self, kid: &str) -> bool {
        self.keys.get(kid).is_some_and(|e| e.signing.is_some())
    }

    /// All key ids, sorted.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("kids", &self.key_ids())
            .finish()
    }
}

fn decode_entry(kid: &str, text: &str) -> Result<KeyEntry, KeyLoadError> {
    let label = pem::decode_label(text.as_bytes()).map_err(|e| KeyLoadError::MalformedPem {
        kid: kid.to_string(),
        reason: e.to_string(),
    })?;
    let invalid = |reason: String| KeyLoadError::InvalidKey {
        kid: kid.to_string(),
        reason,
    };

    let (private, public) = match label {
        "RSA PRIVATE KEY" => {
            let key = RsaPrivateKey::from_pkcs1_pem(text).map_err(|e| invalid(e.to_string()))?;
            let public = key.to_public_key();
            (Some(key), public)
        }
        "PRIVATE KEY" => {
            let key = RsaPrivateKey::from_pkcs8_pem(text).map_err(|e| invalid(e.to_string()))?;
            let public = key.to_public_key();
            (Some(key), public)
        }
        "RSA PUBLIC KEY" => (None, legacy_public_key(text).map_err(invalid)?),
        "PUBLIC KEY" => {
            let key = RsaPublicKey::from_public_key_pem(text).map_err(|e| invalid(e.to_string()))?;
            (None, key)
        }
        other => {
            return Err(KeyLoadError::UnsupportedBlock {
                kid: kid.to_string(),
                label: other.to_string(),
            });
        }
    };

    let signing = match private {
        Some(key) => {
            let der = key.to_pkcs1_der().map_err(|e| invalid(e.to_string()))?;
            Some(EncodingKey::from_rsa_der(der.as_bytes()))
        }
        None => None,
    };
    let der = public.to_pkcs1_der().map_err(|e| invalid(e.to_string()))?;
    let verifying = DecodingKey::from_rsa_der(der.as_bytes());

    Ok(KeyEntry { signing, verifying })
}

/// `RSA PUBLIC KEY` is PKCS#1, but older admin tooling wrote SPKI bodies
/// under that label.
fn legacy_public_key(text: &str) -> Result<RsaPublicKey, String> {
    if let Ok(key) = RsaPublicKey::from_pkcs1_pem(text) {
        return Ok(key);
    }
    let (_, der) = pem::decode_vec(text.as_bytes()).map_err(|e| e.to_string())?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| e.to_string())
}
