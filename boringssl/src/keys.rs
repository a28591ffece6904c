//! Asymmetric key pairs and signing.

use crate::{digest_into_openssl, openssl_err, openssl_err_as, ossl};
use alloc::vec::Vec;
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::{Algorithm, Digest};
use openssl::pkey::{Id, PKey, PKeyRef, Private};
use zeroize::Zeroizing;

/// Signature scheme used to sign certificate data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// ECDSA, producing a DER-encoded `Ecdsa-Sig-Value`.
    Ecdsa(Digest),
    /// RSASSA-PKCS1-v1_5.
    RsaPkcs1(Digest),
}

impl SignatureAlgorithm {
    /// The SHA-256 based scheme appropriate for a key of the given algorithm.
    pub fn sha256_for(algorithm: Algorithm) -> Result<Self, Error> {
        match algorithm {
            Algorithm::Ec => Ok(SignatureAlgorithm::Ecdsa(Digest::Sha256)),
            Algorithm::Rsa => Ok(SignatureAlgorithm::RsaPkcs1(Digest::Sha256)),
            alg => Err(ks_err!(UnsupportedAlgorithm, "no signature scheme for {:?}", alg)),
        }
    }

    /// Key algorithm that this scheme signs with.
    pub fn key_algorithm(&self) -> Algorithm {
        match self {
            SignatureAlgorithm::Ecdsa(_) => Algorithm::Ec,
            SignatureAlgorithm::RsaPkcs1(_) => Algorithm::Rsa,
        }
    }

    fn digest(&self) -> Digest {
        match self {
            SignatureAlgorithm::Ecdsa(d) | SignatureAlgorithm::RsaPkcs1(d) => *d,
        }
    }
}

/// An EC or RSA key pair.
#[derive(Clone)]
pub struct KeyPair {
    algorithm: Algorithm,
    pkey: PKey<Private>,
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // No key material.
        f.debug_struct("KeyPair").field("algorithm", &self.algorithm).finish()
    }
}

impl KeyPair {
    /// Wrap an OpenSSL private key, which must be an EC or RSA key.
    pub fn new(pkey: PKey<Private>) -> Result<Self, Error> {
        let algorithm = match pkey.id() {
            Id::EC => Algorithm::Ec,
            Id::RSA => Algorithm::Rsa,
            id => return Err(ks_err!(UnsupportedAlgorithm, "unsupported key type {:?}", id)),
        };
        Ok(Self { algorithm, pkey })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn pkey(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    /// DER-encoded `SubjectPublicKeyInfo` for the public half.
    pub fn public_key_info(&self) -> Result<Vec<u8>, Error> {
        ossl!(self.pkey.public_key_to_der())
    }

    /// DER-encoded PKCS#8 `PrivateKeyInfo`.
    pub fn private_key_der(&self) -> Result<Zeroizing<Vec<u8>>, Error> {
        Ok(Zeroizing::new(ossl!(self.pkey.private_key_to_pkcs8())?))
    }

    /// Sign `data` with the given scheme, which must match the key type.
    pub fn sign(&self, sig_alg: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>, Error> {
        if sig_alg.key_algorithm() != self.algorithm {
            return Err(ks_err!(
                SigningError,
                "{:?} cannot be produced with a {:?} key",
                sig_alg,
                self.algorithm
            ));
        }
        let digest = digest_into_openssl(sig_alg.digest())
            .ok_or_else(|| ks_err!(SigningError, "undigested signing not supported"))?;
        let mut signer = openssl::sign::Signer::new(digest, &self.pkey)
            .map_err(openssl_err_as!(SigningError, "failed to create signer"))?;
        signer.update(data).map_err(openssl_err!("failed to feed {} bytes", data.len()))?;
        signer.sign_to_vec().map_err(openssl_err_as!(SigningError, "failed to sign"))
    }
}
