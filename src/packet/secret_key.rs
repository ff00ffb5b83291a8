use std::io::{self, BufRead};

use chrono::{DateTime, SubsecRound, Utc};
use rand::{CryptoRng, Rng};
use zeroize::Zeroize;

use crate::config::Config;
use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::KeyType;
use crate::errors::{AlreadyDecryptedSnafu, AlreadyEncryptedSnafu, Result};
use crate::packet::public_key::{PubKeyInner, PublicKey, PublicSubkey};
use crate::ser::Serialize;
use crate::types::{
    AlgorithmInfo, DummyParams, EncryptedSecretParams, Fingerprint, KeyId, KeyVersion,
    PublicParams, S2kUsage, SecretParams, StringToKey, Tag,
};

macro_rules! impl_secret_key {
    ($name:ident, $tag:expr, $public:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            details: $public,
            secret_params: SecretParams,
        }

        impl $name {
            pub fn new(details: $public, secret_params: SecretParams) -> Self {
                Self {
                    details,
                    secret_params,
                }
            }

            /// Parses the packet from the given reader.
            /// Ref: <https://tools.ietf.org/html/rfc4880#section-5.5.3>
            pub fn try_from_reader<B: BufRead>(mut input: B) -> Result<Self> {
                let inner = PubKeyInner::try_from_reader(&mut input)?;
                let secret_params = SecretParams::try_from_reader(
                    &mut input,
                    inner.version(),
                    inner.algorithm(),
                    inner.public_params(),
                )?;

                Ok(Self {
                    details: $public::from_inner(inner),
                    secret_params,
                })
            }

            /// Creates a fresh, unprotected key.
            pub fn generate<R: Rng + CryptoRng>(
                rng: &mut R,
                key_type: KeyType,
                config: &Config,
            ) -> Result<Self> {
                let version = if config.v5_keys {
                    KeyVersion::V5
                } else {
                    KeyVersion::V4
                };

                let (public_params, secret_params) = key_type.generate(rng)?;
                let inner = PubKeyInner::new(
                    version,
                    key_type.to_alg(),
                    Utc::now().trunc_subsecs(0),
                    public_params,
                )?;

                Ok(Self {
                    details: $public::from_inner(inner),
                    secret_params: SecretParams::Plain(secret_params),
                })
            }

            /// The public packet corresponding to this key.
            pub fn public_portion(&self) -> &$public {
                &self.details
            }

            pub fn secret_params(&self) -> &SecretParams {
                &self.secret_params
            }

            pub fn version(&self) -> KeyVersion {
                self.details.version()
            }

            pub fn algorithm(&self) -> PublicKeyAlgorithm {
                self.details.algorithm()
            }

            pub fn created_at(&self) -> &DateTime<Utc> {
                self.details.created_at()
            }

            pub fn public_params(&self) -> &PublicParams {
                self.details.public_params()
            }

            pub fn algorithm_info(&self) -> AlgorithmInfo {
                self.details.algorithm_info()
            }

            pub fn fingerprint(&self) -> &Fingerprint {
                self.details.fingerprint()
            }

            pub fn key_id(&self) -> KeyId {
                self.details.key_id()
            }

            pub fn is_dummy(&self) -> bool {
                matches!(self.secret_params, SecretParams::Dummy(_))
            }

            pub fn is_decrypted(&self) -> bool {
                matches!(self.secret_params, SecretParams::Plain(_))
            }

            /// Protects the secret parameters with a passphrase.
            ///
            /// An empty passphrase leaves the key unprotected. Protecting
            /// an already protected key is an error; re-protecting
            /// requires a decrypt first.
            pub fn encrypt<R: Rng + CryptoRng>(
                &mut self,
                rng: &mut R,
                passphrase: &str,
                config: &Config,
            ) -> Result<()> {
                let new_params = match &self.secret_params {
                    SecretParams::Dummy(_) => return Ok(()),
                    SecretParams::Encrypted(_) => return AlreadyEncryptedSnafu.fail(),
                    SecretParams::Cleared => {
                        bail!("secret key material has been cleared")
                    }
                    SecretParams::Plain(plain) => {
                        if passphrase.is_empty() {
                            // stays unprotected
                            return Ok(());
                        }

                        let s2k = StringToKey::new_iterated(
                            rng,
                            HashAlgorithm::default(),
                            config.s2k_iteration_count_byte,
                        );
                        let sym_alg = SymmetricKeyAlgorithm::AES256;
                        let mut key = s2k.derive_key(passphrase, sym_alg.key_size())?;

                        let mut iv = vec![0u8; sym_alg.block_size()];
                        rng.fill(&mut iv[..]);

                        let mut cleartext = Vec::with_capacity(plain.write_len_raw());
                        plain.to_writer_raw(&mut cleartext)?;

                        let res = if config.aead_protect {
                            let aead = AeadAlgorithm::Eax;
                            let tag = aead.encrypt_in_place(
                                sym_alg,
                                &key,
                                &iv[..aead.nonce_size()],
                                &[],
                                &mut cleartext,
                            );
                            match tag {
                                Ok(tag) => {
                                    cleartext.extend_from_slice(&tag);
                                    Ok(EncryptedSecretParams::new(
                                        cleartext,
                                        iv,
                                        sym_alg,
                                        Some(aead),
                                        s2k,
                                        S2kUsage::Aead,
                                    ))
                                }
                                Err(err) => {
                                    cleartext.zeroize();
                                    Err(err)
                                }
                            }
                        } else {
                            let sha1 = plain.checksum_sha1()?;
                            cleartext.extend_from_slice(&sha1);

                            match sym_alg.encrypt_with_iv_regular(&key, &iv, &mut cleartext) {
                                Ok(()) => Ok(EncryptedSecretParams::new(
                                    cleartext,
                                    iv,
                                    sym_alg,
                                    None,
                                    s2k,
                                    S2kUsage::Cfb,
                                )),
                                Err(err) => {
                                    cleartext.zeroize();
                                    Err(err)
                                }
                            }
                        };

                        key.zeroize();
                        res?
                    }
                };

                // dropping the plain params zeroizes them
                self.secret_params = SecretParams::Encrypted(new_params);
                Ok(())
            }

            /// Unlocks the secret parameters with the given passphrase.
            ///
            /// Returns `false` for dummy keys, which carry nothing to
            /// decrypt. On failure the packet is left unchanged.
            pub fn decrypt(&mut self, passphrase: &str) -> Result<bool> {
                let plain = match &self.secret_params {
                    SecretParams::Dummy(_) => return Ok(false),
                    SecretParams::Plain(_) => return AlreadyDecryptedSnafu.fail(),
                    SecretParams::Cleared => {
                        bail!("secret key material has been cleared")
                    }
                    SecretParams::Encrypted(enc) => enc.unlock(
                        passphrase,
                        self.details.algorithm(),
                        self.details.public_params(),
                    )?,
                };

                self.secret_params = SecretParams::Plain(plain);
                Ok(true)
            }

            /// Checks the secret parameters against the public ones.
            ///
            /// A no-op for dummy keys; the key must be decrypted.
            pub fn validate(&self) -> Result<()> {
                match &self.secret_params {
                    SecretParams::Dummy(_) => Ok(()),
                    SecretParams::Plain(plain) => plain.validate(self.details.public_params()),
                    SecretParams::Encrypted(_) => {
                        bail!("secret key material must be decrypted before validation")
                    }
                    SecretParams::Cleared => {
                        bail!("secret key material has been cleared")
                    }
                }
            }

            /// Zeroizes and drops the secret parameters.
            pub fn clear_private_params(&mut self) {
                // dropping the old value zeroizes any plain material
                self.secret_params = SecretParams::Cleared;
            }

            /// Irreversibly discards the secret material, leaving a
            /// gnu-dummy placeholder.
            pub fn make_dummy(&mut self) {
                self.secret_params = SecretParams::Dummy(DummyParams::new());
            }
        }

        impl AsRef<PubKeyInner> for $name {
            fn as_ref(&self) -> &PubKeyInner {
                self.details.as_ref()
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.details.to_writer(writer)?;
                self.secret_params.to_writer(writer, self.version())?;
                Ok(())
            }

            fn write_len(&self) -> usize {
                self.details.write_len() + self.secret_params.write_len(self.version())
            }
        }

        impl crate::packet::PacketTrait for $name {
            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_secret_key!(SecretKey, Tag::SecretKey, PublicKey);
impl_secret_key!(SecretSubkey, Tag::SecretSubkey, PublicSubkey);

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::ECCCurve;
    use crate::errors::Error;

    fn generate_key(config: &Config) -> SecretKey {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        SecretKey::generate(&mut rng, KeyType::Ecdsa(ECCCurve::P256), config).unwrap()
    }

    #[test]
    fn test_unprotected_roundtrip() {
        for config in [
            Config::default(),
            Config {
                v5_keys: true,
                ..Config::default()
            },
        ] {
            let key = generate_key(&config);
            assert!(key.is_decrypted());

            let buf = key.to_bytes().unwrap();
            assert_eq!(buf.len(), key.write_len());

            let back = SecretKey::try_from_reader(&mut &buf[..]).unwrap();
            assert_eq!(key, back);
            assert_eq!(back.to_bytes().unwrap(), buf);
        }
    }

    #[test]
    fn test_protect_roundtrip_cfb() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let config = Config::default();
        let mut key = generate_key(&config);
        let original = key.clone();

        key.encrypt(&mut rng, "correct horse", &config).unwrap();
        assert!(!key.is_decrypted());

        // double encryption is a lifecycle violation
        let err = key.encrypt(&mut rng, "again", &config).unwrap_err();
        assert!(matches!(err, Error::AlreadyEncrypted { .. }));

        let buf = key.to_bytes().unwrap();
        let mut back = SecretKey::try_from_reader(&mut &buf[..]).unwrap();

        let err = back.decrypt("wrong horse").unwrap_err();
        assert!(matches!(err, Error::IncorrectPassphrase { .. }));

        assert!(back.decrypt("correct horse").unwrap());
        assert_eq!(back.secret_params(), original.secret_params());

        let err = back.decrypt("correct horse").unwrap_err();
        assert!(matches!(err, Error::AlreadyDecrypted { .. }));
    }

    #[test]
    fn test_protect_roundtrip_aead() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let config = Config {
            aead_protect: true,
            ..Config::default()
        };
        let mut key = generate_key(&config);
        let original = key.clone();

        key.encrypt(&mut rng, "passphrase", &config).unwrap();

        let buf = key.to_bytes().unwrap();
        let mut back = SecretKey::try_from_reader(&mut &buf[..]).unwrap();

        let err = back.decrypt("nope").unwrap_err();
        assert!(matches!(err, Error::IncorrectPassphrase { .. }));

        assert!(back.decrypt("passphrase").unwrap());
        assert_eq!(back.secret_params(), original.secret_params());
    }

    #[test]
    fn test_empty_passphrase_strips_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let config = Config::default();
        let mut key = generate_key(&config);

        key.encrypt(&mut rng, "", &config).unwrap();
        assert!(key.is_decrypted());
    }

    #[test]
    fn test_validate() {
        let config = Config::default();
        let key = generate_key(&config);
        key.validate().unwrap();
    }

    #[test]
    fn test_dummy() {
        let config = Config::default();
        let mut key = generate_key(&config);
        key.make_dummy();

        assert!(key.is_dummy());
        assert!(!key.is_decrypted());
        // decrypt is a no-op that signals "nothing done"
        assert!(!key.decrypt("anything").unwrap());
        // validate is a no-op
        key.validate().unwrap();

        // write is stable
        let buf = key.to_bytes().unwrap();
        let back = SecretKey::try_from_reader(&mut &buf[..]).unwrap();
        assert!(back.is_dummy());
        assert_eq!(back.to_bytes().unwrap(), buf);
    }

    #[test]
    fn test_clear_private_params() {
        let config = Config::default();
        let mut key = generate_key(&config);
        key.clear_private_params();

        assert!(!key.is_decrypted());
        assert!(key.to_bytes().is_err());
        assert!(key.validate().is_err());
    }
}
