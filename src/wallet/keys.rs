use crate::error::{LedgerError, Result};
use crate::utils::{
    ecdsa_p256_sha256_key_pair, ecdsa_p256_sha256_sign, ecdsa_p256_sha256_sign_verify,
    new_key_pair,
};
use data_encoding::BASE64;
use ring::signature::{EcdsaKeyPair, KeyPair as _};

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";
const PEM_LINE_LEN: usize = 64;

/// DER SubjectPublicKeyInfo header for an uncompressed P-256 point
/// (id-ecPublicKey, prime256v1, 65-byte BIT STRING).
const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];
const P256_POINT_LEN: usize = 65;

/// Signing identity of a node. The private half never leaves the process;
/// the PKCS#8 bytes are only held long enough to parse them.
pub struct KeyPair {
    key_pair: EcdsaKeyPair,
    public_key: Vec<u8>,
}

impl KeyPair {
    pub fn generate() -> Result<KeyPair> {
        let pkcs8 = new_key_pair()?;
        KeyPair::from_pkcs8(&pkcs8)
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<KeyPair> {
        let key_pair = ecdsa_p256_sha256_key_pair(pkcs8)?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(KeyPair {
            key_pair,
            public_key,
        })
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn public_key_pem(&self) -> String {
        public_key_to_pem(&self.public_key)
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        ecdsa_p256_sha256_sign(&self.key_pair, message)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &data_encoding::HEXLOWER.encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

pub fn public_key_to_pem(public_key: &[u8]) -> String {
    let mut der = P256_SPKI_PREFIX.to_vec();
    der.extend_from_slice(public_key);
    let body = BASE64.encode(&der);

    let mut pem = String::from(PEM_BEGIN);
    pem.push('\n');
    for chunk in body.as_bytes().chunks(PEM_LINE_LEN) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(PEM_END);
    pem.push('\n');
    pem
}

/// Accepts full PEM as well as the bare base64 body (armor lines stripped).
pub fn public_key_from_pem(pem: &str) -> Result<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();

    let der = BASE64
        .decode(body.as_bytes())
        .map_err(|e| LedgerError::Crypto(format!("Invalid PEM body: {e}")))?;

    if der.len() != P256_SPKI_PREFIX.len() + P256_POINT_LEN || !der.starts_with(&P256_SPKI_PREFIX)
    {
        return Err(LedgerError::Crypto(
            "Public key is not a P-256 SubjectPublicKeyInfo".to_string(),
        ));
    }

    Ok(der[P256_SPKI_PREFIX.len()..].to_vec())
}

/// Verify a detached signature against a PEM public key.
/// Any decoding problem counts as a failed verification.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key_pem: &str) -> bool {
    match public_key_from_pem(public_key_pem) {
        Ok(public_key) => ecdsa_p256_sha256_sign_verify(&public_key, signature, message),
        Err(_) => false,
    }
}
