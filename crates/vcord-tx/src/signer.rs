//! # Signing Capability
//!
//! Abstracts secp256k1 ECDSA signing behind two traits so the assembler never
//! touches key material:
//!
//! - [`HashSigner`]: signs a 32-byte sighash, exposes its public key.
//! - [`KeySource`]: derives a [`HashSigner`] by index.
//!
//! Implementations:
//!
//! - [`SecretKeySigner`]: a single in-memory key.
//! - [`HdKeySource`]: BIP32 derivation under the BIP84 account path
//!   `m/84'/{coin}'/0'/0`, seeded from a hex environment variable or a seed
//!   file.
//!
//! ## Security Invariants
//!
//! - Seed bytes are held in `Zeroizing` buffers and wiped after use.
//! - Signers are `Send + Sync` for use across async tasks.

use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::{ecdsa, All, Message, PublicKey, Secp256k1, SecretKey};
use bitcoin::{CompressedPublicKey, Network};
use zeroize::Zeroizing;

use crate::error::SignerError;

/// Signs sighashes with one key.
pub trait HashSigner: Send + Sync {
    /// The key that verifies this signer's signatures.
    fn public_key(&self) -> CompressedPublicKey;

    /// Sign a 32-byte message digest.
    fn sign(&self, hash: &[u8; 32]) -> Result<ecdsa::Signature, SignerError>;
}

/// Derives signers by child index.
pub trait KeySource: Send + Sync {
    /// Signer for the key at `index`.
    fn derive(&self, index: u32) -> Result<Box<dyn HashSigner>, SignerError>;
}

// ─── SecretKeySigner ─────────────────────────────────────────────────────

/// A single secp256k1 key held in memory.
pub struct SecretKeySigner {
    secp: Secp256k1<All>,
    secret: SecretKey,
    public: CompressedPublicKey,
}

impl SecretKeySigner {
    /// Wrap an existing secret key.
    pub fn new(secret: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public = CompressedPublicKey(PublicKey::from_secret_key(&secp, &secret));
        Self {
            secp,
            secret,
            public,
        }
    }
}

impl std::fmt::Debug for SecretKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeySigner")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl HashSigner for SecretKeySigner {
    fn public_key(&self) -> CompressedPublicKey {
        self.public
    }

    fn sign(&self, hash: &[u8; 32]) -> Result<ecdsa::Signature, SignerError> {
        Ok(self
            .secp
            .sign_ecdsa(&Message::from_digest(*hash), &self.secret))
    }
}

// ─── HdKeySource ─────────────────────────────────────────────────────────

/// Environment variable holding a hex-encoded BIP32 seed.
pub const SEED_HEX_VAR: &str = "VCORD_SEED_HEX";

/// Environment variable naming a seed file.
pub const SEED_PATH_VAR: &str = "SEED_PATH";

/// BIP32 key tree rooted at a seed, deriving under `m/84'/{coin}'/0'/0`.
pub struct HdKeySource {
    secp: Secp256k1<All>,
    master: Xpriv,
    base_path: DerivationPath,
}

impl std::fmt::Debug for HdKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdKeySource")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl HdKeySource {
    /// Build the key tree from raw seed bytes (16 to 64 bytes).
    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self, SignerError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(SignerError::InvalidSeed(format!(
                "expected 16 to 64 bytes, got {}",
                seed.len()
            )));
        }
        let master = Xpriv::new_master(network, seed)?;
        let coin = if network == Network::Bitcoin { 0 } else { 1 };
        let base_path = DerivationPath::from_str(&format!("m/84'/{coin}'/0'/0"))?;
        Ok(Self {
            secp: Secp256k1::new(),
            master,
            base_path,
        })
    }

    /// Load the seed from `VCORD_SEED_HEX`, else from the file at `SEED_PATH`.
    pub fn from_env(network: Network) -> Result<Self, SignerError> {
        if let Ok(hex_seed) = std::env::var(SEED_HEX_VAR) {
            let hex_seed = Zeroizing::new(hex_seed);
            let seed = Zeroizing::new(
                hex::decode(hex_seed.trim())
                    .map_err(|e| SignerError::InvalidSeed(format!("{SEED_HEX_VAR}: {e}")))?,
            );
            return Self::from_seed(&seed, network);
        }
        match std::env::var(SEED_PATH_VAR) {
            Ok(path) => Self::from_seed_file(&path, network),
            Err(_) => Err(SignerError::MissingSeed("VCORD_SEED_HEX or SEED_PATH")),
        }
    }

    /// Load the seed from a file holding either hex text or raw bytes.
    pub fn from_seed_file(path: &str, network: Network) -> Result<Self, SignerError> {
        let raw = Zeroizing::new(std::fs::read(path).map_err(|source| SignerError::SeedFile {
            path: path.to_string(),
            source,
        })?);
        let decoded = std::str::from_utf8(&raw)
            .ok()
            .and_then(|text| hex::decode(text.trim()).ok())
            .map(Zeroizing::new);
        match decoded {
            Some(seed) => Self::from_seed(&seed, network),
            None => Self::from_seed(&raw, network),
        }
    }

    /// The account-level path children are derived under.
    pub fn base_path(&self) -> &DerivationPath {
        &self.base_path
    }

    /// Secret key at `index` below the base path.
    fn derive_secret(&self, index: u32) -> Result<SecretKey, SignerError> {
        let path = self.base_path.child(ChildNumber::from_normal_idx(index)?);
        Ok(self.master.derive_priv(&self.secp, &path)?.private_key)
    }
}

impl KeySource for HdKeySource {
    fn derive(&self, index: u32) -> Result<Box<dyn HashSigner>, SignerError> {
        Ok(Box::new(SecretKeySigner::new(self.derive_secret(index)?)))
    }
}
