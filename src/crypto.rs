use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use derive_more::{Display, Error};
use rand::Rng;

/// Stored passwords are `BASE64URL(nonce || AES-256-GCM(plaintext))` with a 12 byte nonce.
const NONCE_LEN: usize = 12;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[display(fmt = "encryption failed")]
    EncryptionFailed,
    #[display(fmt = "decryption failed")]
    DecryptionFailed,
    #[display(fmt = "invalid ciphertext encoding")]
    InvalidData,
}

fn generate_12b_nonce() -> [u8; NONCE_LEN] {
    rand::thread_rng().gen()
}

pub fn generate_secret_key() -> [u8; 32] {
    rand::thread_rng().gen()
}

fn cipher(key: &[u8; 32]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
}

/// Encrypts a password for storage. Every call uses a fresh nonce.
pub fn encrypt(key: &[u8; 32], plaintext: &str) -> Result<String, CryptoError> {
    let nonce_bytes = generate_12b_nonce();

    let ciphertext = cipher(key)
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(base64_url::encode(&sealed))
}

/// Decrypts a stored password produced by [`encrypt`].
pub fn decrypt(key: &[u8; 32], encoded: &str) -> Result<String, CryptoError> {
    let sealed = base64_url::decode(encoded).map_err(|_| CryptoError::InvalidData)?;

    if sealed.len() <= NONCE_LEN {
        return Err(CryptoError::InvalidData);
    }

    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let plaintext = cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidData)
}
