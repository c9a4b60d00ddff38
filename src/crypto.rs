use aes::Aes256;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use scrypt::Params;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const SCRYPT_SALT: &[u8] = b"mailport-vault";
// 2^14 iterations, the library default; slow enough to stretch a passphrase,
// fast enough to pay once per process.
const SCRYPT_LOG_N: u8 = 14;

#[derive(Debug)]
pub enum CryptoError {
    MalformedEnvelope(String),
    DecryptFailed,
    InvalidPlaintext,
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::MalformedEnvelope(msg) => write!(f, "malformed envelope: {msg}"),
            CryptoError::DecryptFailed => write!(f, "decryption failed"),
            CryptoError::InvalidPlaintext => write!(f, "decrypted data is not valid UTF-8"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// At-rest representation of an encrypted relay secret.
///
/// New writes always produce `Versioned` (`hex(iv):hex(ciphertext)`). `Legacy`
/// covers secrets written before envelopes carried an explicit IV; it is a
/// read-only compatibility path.
#[derive(Debug, PartialEq)]
pub enum Envelope {
    Versioned { iv: [u8; 16], ciphertext: Vec<u8> },
    Legacy { ciphertext: Vec<u8> },
}

impl Envelope {
    pub fn parse(raw: &str) -> Result<Self, CryptoError> {
        match raw.split_once(':') {
            Some((iv_hex, ct_hex)) => {
                let iv_bytes = hex::decode(iv_hex)
                    .map_err(|e| CryptoError::MalformedEnvelope(format!("bad IV hex: {e}")))?;
                let iv: [u8; 16] = iv_bytes.try_into().map_err(|_| {
                    CryptoError::MalformedEnvelope("IV is not 16 bytes".to_string())
                })?;
                let ciphertext = hex::decode(ct_hex).map_err(|e| {
                    CryptoError::MalformedEnvelope(format!("bad ciphertext hex: {e}"))
                })?;
                if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
                    return Err(CryptoError::MalformedEnvelope(
                        "ciphertext is not a whole number of blocks".to_string(),
                    ));
                }
                Ok(Envelope::Versioned { iv, ciphertext })
            }
            None => {
                let ciphertext = hex::decode(raw).map_err(|e| {
                    CryptoError::MalformedEnvelope(format!("bad ciphertext hex: {e}"))
                })?;
                if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
                    return Err(CryptoError::MalformedEnvelope(
                        "ciphertext is not a whole number of blocks".to_string(),
                    ));
                }
                Ok(Envelope::Legacy { ciphertext })
            }
        }
    }
}

/// Symmetric vault for relay secrets. Key derivation runs once at
/// construction; the vault is then read-only and safe to share across
/// requests.
pub struct Vault {
    key: [u8; 32],
    legacy_key: [u8; 32],
    legacy_iv: [u8; 16],
}

impl Vault {
    pub fn new(master_key: &str) -> Self {
        let params = Params::new(SCRYPT_LOG_N, 8, 1, 32)
            .expect("static scrypt parameters are valid");
        let mut key = [0u8; 32];
        scrypt::scrypt(master_key.as_bytes(), SCRYPT_SALT, &params, &mut key)
            .expect("32 bytes is a valid scrypt output length");

        let (legacy_key, legacy_iv) = legacy_key_iv(master_key);

        Self {
            key,
            legacy_key,
            legacy_iv,
        }
    }

    /// Encrypt a secret into a `hex(iv):hex(ciphertext)` envelope. A fresh
    /// random IV is drawn per call.
    pub fn encrypt(&self, secret: &str) -> String {
        let mut iv = [0u8; 16];
        rand::rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(secret.as_bytes());

        format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
    }

    pub fn decrypt(&self, raw: &str) -> Result<String, CryptoError> {
        let plaintext = match Envelope::parse(raw)? {
            Envelope::Versioned { iv, ciphertext } => {
                Aes256CbcDec::new(&self.key.into(), &iv.into())
                    .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                    .map_err(|_| CryptoError::DecryptFailed)?
            }
            Envelope::Legacy { ciphertext } => {
                Aes256CbcDec::new(&self.legacy_key.into(), &self.legacy_iv.into())
                    .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                    .map_err(|_| CryptoError::DecryptFailed)?
            }
        };

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
    }
}

/// Key and IV for the deprecated no-IV scheme: the OpenSSL EVP_BytesToKey
/// MD5 chain over the bare passphrase, no salt. Kept byte-compatible so
/// secrets written by the old scheme still decrypt. Never used for writes.
fn legacy_key_iv(master_key: &str) -> ([u8; 32], [u8; 16]) {
    let pass = master_key.as_bytes();

    let d1: [u8; 16] = Md5::digest(pass).into();

    let mut h = Md5::new();
    h.update(d1);
    h.update(pass);
    let d2: [u8; 16] = h.finalize().into();

    let mut h = Md5::new();
    h.update(d2);
    h.update(pass);
    let d3: [u8; 16] = h.finalize().into();

    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&d1);
    key[16..].copy_from_slice(&d2);

    (key, d3)
}
