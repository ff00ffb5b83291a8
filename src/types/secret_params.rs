use std::io::{self, BufRead};

use byteorder::{BigEndian, WriteBytesExt};
use num_enum::{FromPrimitive, IntoPrimitive};
use snafu::ResultExt;
use zeroize::Zeroize;

use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{
    IncorrectPassphraseSnafu, InsecureS2kSnafu, Result, UnknownAlgorithmSnafu,
};
use crate::parsing_reader::BufReadParsing;
use crate::ser::Serialize;
use crate::types::{KeyVersion, PlainSecretParams, PublicParams, StringToKey};

/// The S2K usage octet of a secret key packet.
/// Ref: <https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-04#section-5.5.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum S2kUsage {
    /// The secret parameters are stored in the clear.
    Unprotected = 0,
    /// AEAD protection.
    Aead = 253,
    /// CFB protection with a SHA-1 integrity tag.
    Cfb = 254,
    /// CFB protection with a two-octet checksum. Considered malleable,
    /// refused on decrypt.
    MalleableCfb = 255,
    /// The octet is a symmetric cipher id, with an implied simple MD5 S2K.
    /// Refused on decrypt.
    #[num_enum(catch_all)]
    LegacyCfb(u8) = 1,
}

/// Protected (or legacy-protected) secret key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecretParams {
    /// The encrypted data, including any trailing integrity tag.
    data: Vec<u8>,
    /// Block sized initialization vector.
    iv: Vec<u8>,
    /// The symmetric algorithm protecting the data.
    sym_alg: SymmetricKeyAlgorithm,
    /// Set iff usage is AEAD.
    aead: Option<AeadAlgorithm>,
    /// Absent for the legacy direct-cipher usage octets.
    s2k: Option<StringToKey>,
    usage: S2kUsage,
}

/// A gnu-dummy placeholder: framing without secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyParams {
    usage: S2kUsage,
    sym_alg: SymmetricKeyAlgorithm,
    aead: Option<AeadAlgorithm>,
    s2k: StringToKey,
}

/// The secret parameter portion of a secret key packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
    Dummy(DummyParams),
    /// The secrets were zeroized and dropped; the key can no longer be
    /// used or serialized.
    Cleared,
}

fn read_sym_alg<B: BufRead>(mut i: B) -> Result<SymmetricKeyAlgorithm> {
    let code = i.read_u8()?;
    SymmetricKeyAlgorithm::try_from(code).map_err(|_| {
        UnknownAlgorithmSnafu {
            typ: "symmetric",
            code,
        }
        .build()
    })
}

impl SecretParams {
    /// Parses the secret portion of a secret key packet, positioned right
    /// after the public fields.
    pub fn try_from_reader<B: BufRead>(
        mut i: B,
        version: KeyVersion,
        alg: PublicKeyAlgorithm,
        public_params: &PublicParams,
    ) -> Result<Self> {
        let usage = S2kUsage::from(i.read_u8()?);

        if version == KeyVersion::V5 {
            // combined octet count of the optional fields, only needed
            // to skip packets we would not understand
            let _opt_len = i.read_u8()?;
        }

        match usage {
            S2kUsage::Unprotected => {
                if version == KeyVersion::V5 {
                    let _material_len = i.read_be_u32()?;
                }

                let mut material = i.rest()?;
                ensure!(material.len() >= 2, "missing secret key checksum");

                let split = material.len() - 2;
                checksum::simple(&material[split..], &material[..split])?;

                let res = PlainSecretParams::try_from_reader(
                    &mut &material[..split],
                    alg,
                    public_params,
                );
                material.as_mut().zeroize();
                let params = res.context(crate::errors::MalformedSecretSnafu)?;

                Ok(SecretParams::Plain(params))
            }
            S2kUsage::Aead | S2kUsage::Cfb | S2kUsage::MalleableCfb => {
                let sym_alg = read_sym_alg(&mut i)?;
                let aead = if usage == S2kUsage::Aead {
                    let code = i.read_u8()?;
                    let aead = AeadAlgorithm::try_from(code).map_err(|_| {
                        UnknownAlgorithmSnafu { typ: "aead", code }.build()
                    })?;
                    Some(aead)
                } else {
                    None
                };

                let s2k = StringToKey::try_from_reader(&mut i)?;
                if s2k.is_gnu_dummy() {
                    // the remainder is absent for dummy keys
                    return Ok(SecretParams::Dummy(DummyParams {
                        usage,
                        sym_alg,
                        aead,
                        s2k,
                    }));
                }

                let iv = i.take_bytes(sym_alg.block_size())?.to_vec();
                if version == KeyVersion::V5 {
                    let _material_len = i.read_be_u32()?;
                }
                let data = i.rest()?.to_vec();

                Ok(SecretParams::Encrypted(EncryptedSecretParams {
                    data,
                    iv,
                    sym_alg,
                    aead,
                    s2k: Some(s2k),
                    usage,
                }))
            }
            S2kUsage::LegacyCfb(code) => {
                let sym_alg = SymmetricKeyAlgorithm::try_from(code).map_err(|_| {
                    UnknownAlgorithmSnafu {
                        typ: "symmetric",
                        code,
                    }
                    .build()
                })?;

                let iv = i.take_bytes(sym_alg.block_size())?.to_vec();
                if version == KeyVersion::V5 {
                    let _material_len = i.read_be_u32()?;
                }
                let data = i.rest()?.to_vec();

                Ok(SecretParams::Encrypted(EncryptedSecretParams {
                    data,
                    iv,
                    sym_alg,
                    aead: None,
                    s2k: None,
                    usage,
                }))
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }

    pub fn to_writer<W: io::Write>(&self, writer: &mut W, version: KeyVersion) -> Result<()> {
        match self {
            SecretParams::Plain(params) => {
                writer.write_u8(u8::from(S2kUsage::Unprotected))?;
                if version == KeyVersion::V5 {
                    // no optional fields
                    writer.write_u8(0)?;
                    writer.write_u32::<BigEndian>(params.write_len_raw().try_into()?)?;
                }
                // raw fields plus the two-octet checksum
                params.to_writer(writer)?;
                Ok(())
            }
            SecretParams::Encrypted(params) => params.to_writer(writer, version),
            SecretParams::Dummy(params) => params.to_writer(writer, version),
            SecretParams::Cleared => bail!("secret key material has been cleared"),
        }
    }

    pub fn write_len(&self, version: KeyVersion) -> usize {
        match self {
            SecretParams::Plain(params) => {
                let mut sum = 1;
                if version == KeyVersion::V5 {
                    sum += 1 + 4;
                }
                sum + params.write_len()
            }
            SecretParams::Encrypted(params) => params.write_len(version),
            SecretParams::Dummy(params) => params.write_len(version),
            SecretParams::Cleared => 0,
        }
    }
}

impl EncryptedSecretParams {
    pub(crate) fn new(
        data: Vec<u8>,
        iv: Vec<u8>,
        sym_alg: SymmetricKeyAlgorithm,
        aead: Option<AeadAlgorithm>,
        s2k: StringToKey,
        usage: S2kUsage,
    ) -> Self {
        debug_assert_ne!(usage, S2kUsage::Unprotected);
        EncryptedSecretParams {
            data,
            iv,
            sym_alg,
            aead,
            s2k: Some(s2k),
            usage,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn sym_alg(&self) -> SymmetricKeyAlgorithm {
        self.sym_alg
    }

    pub fn aead(&self) -> Option<AeadAlgorithm> {
        self.aead
    }

    pub fn string_to_key(&self) -> Option<&StringToKey> {
        self.s2k.as_ref()
    }

    pub fn usage(&self) -> S2kUsage {
        self.usage
    }

    /// Decrypts the secret parameters with the given passphrase.
    pub fn unlock(
        &self,
        passphrase: &str,
        alg: PublicKeyAlgorithm,
        public_params: &PublicParams,
    ) -> Result<PlainSecretParams> {
        match self.usage {
            S2kUsage::Unprotected => bail!("inconsistent state: unprotected encrypted params"),
            S2kUsage::MalleableCfb | S2kUsage::LegacyCfb(_) => InsecureS2kSnafu {
                usage: u8::from(self.usage),
            }
            .fail(),
            S2kUsage::Cfb => {
                let s2k = self.s2k.as_ref().ok_or_else(|| format_err!("missing s2k"))?;
                let mut key = s2k.derive_key(passphrase, self.sym_alg.key_size())?;

                let mut plaintext = self.data.clone();
                let decrypted =
                    self.sym_alg
                        .decrypt_with_iv_regular(&key, &self.iv, &mut plaintext);
                key.zeroize();
                decrypted?;

                if plaintext.len() < 20 {
                    plaintext.zeroize();
                    return IncorrectPassphraseSnafu.fail();
                }

                let split = plaintext.len() - 20;
                let expected = checksum::calculate_sha1([&plaintext[..split]])?;
                if expected[..] != plaintext[split..] {
                    plaintext.zeroize();
                    return IncorrectPassphraseSnafu.fail();
                }

                let res = PlainSecretParams::try_from_reader(
                    &mut &plaintext[..split],
                    alg,
                    public_params,
                );
                plaintext.zeroize();
                res.context(crate::errors::MalformedSecretSnafu)
            }
            S2kUsage::Aead => {
                let s2k = self.s2k.as_ref().ok_or_else(|| format_err!("missing s2k"))?;
                let aead = self
                    .aead
                    .ok_or_else(|| format_err!("missing aead algorithm"))?;

                let tag_size = aead.tag_size();
                let nonce_size = aead.nonce_size();
                ensure!(
                    self.data.len() >= tag_size && self.iv.len() >= nonce_size,
                    "invalid aead protected secret material"
                );

                let mut key = s2k.derive_key(passphrase, self.sym_alg.key_size())?;

                let split = self.data.len() - tag_size;
                let mut plaintext = self.data[..split].to_vec();
                let decrypted = aead.decrypt_in_place(
                    self.sym_alg,
                    &key,
                    &self.iv[..nonce_size],
                    &[],
                    &mut plaintext,
                    &self.data[split..],
                );
                key.zeroize();

                if decrypted.is_err() {
                    plaintext.zeroize();
                    return IncorrectPassphraseSnafu.fail();
                }

                let res =
                    PlainSecretParams::try_from_reader(&mut &plaintext[..], alg, public_params);
                plaintext.zeroize();
                res.context(crate::errors::MalformedSecretSnafu)
            }
        }
    }

    fn optional_fields_len(&self) -> usize {
        match self.usage {
            S2kUsage::Aead | S2kUsage::Cfb | S2kUsage::MalleableCfb => {
                let mut sum = 1; // symmetric algorithm
                if self.aead.is_some() {
                    sum += 1;
                }
                if let Some(ref s2k) = self.s2k {
                    sum += s2k.write_len();
                }
                sum + self.iv.len()
            }
            S2kUsage::LegacyCfb(_) => self.iv.len(),
            S2kUsage::Unprotected => 0,
        }
    }

    pub fn to_writer<W: io::Write>(&self, writer: &mut W, version: KeyVersion) -> Result<()> {
        writer.write_u8(u8::from(self.usage))?;
        if version == KeyVersion::V5 {
            writer.write_u8(self.optional_fields_len().try_into()?)?;
        }

        match self.usage {
            S2kUsage::Aead | S2kUsage::Cfb | S2kUsage::MalleableCfb => {
                writer.write_u8(u8::from(self.sym_alg))?;
                if let Some(aead) = self.aead {
                    writer.write_u8(u8::from(aead))?;
                }
                if let Some(ref s2k) = self.s2k {
                    s2k.to_writer(writer)?;
                }
            }
            // the usage octet itself carries the cipher id
            S2kUsage::LegacyCfb(_) => {}
            S2kUsage::Unprotected => bail!("inconsistent state: unprotected encrypted params"),
        }

        writer.write_all(&self.iv)?;
        if version == KeyVersion::V5 {
            writer.write_u32::<BigEndian>(self.data.len().try_into()?)?;
        }
        writer.write_all(&self.data)?;

        Ok(())
    }

    pub fn write_len(&self, version: KeyVersion) -> usize {
        let mut sum = 1; // usage
        if version == KeyVersion::V5 {
            sum += 1 + 4;
        }
        match self.usage {
            S2kUsage::Aead | S2kUsage::Cfb | S2kUsage::MalleableCfb => {
                sum += 1;
                if self.aead.is_some() {
                    sum += 1;
                }
                if let Some(ref s2k) = self.s2k {
                    sum += s2k.write_len();
                }
            }
            _ => {}
        }
        sum + self.iv.len() + self.data.len()
    }
}

impl DummyParams {
    /// The framing GnuPG uses for stubbed keys: usage 254, AES-256, and a
    /// gnu-dummy specifier.
    pub fn new() -> Self {
        DummyParams {
            usage: S2kUsage::Cfb,
            sym_alg: SymmetricKeyAlgorithm::AES256,
            aead: None,
            s2k: StringToKey::new_gnu_dummy(),
        }
    }

    pub fn to_writer<W: io::Write>(&self, writer: &mut W, version: KeyVersion) -> Result<()> {
        writer.write_u8(u8::from(self.usage))?;
        if version == KeyVersion::V5 {
            let mut opt_len = 1 + self.s2k.write_len();
            if self.aead.is_some() {
                opt_len += 1;
            }
            writer.write_u8(opt_len.try_into()?)?;
        }

        writer.write_u8(u8::from(self.sym_alg))?;
        if let Some(aead) = self.aead {
            writer.write_u8(u8::from(aead))?;
        }
        self.s2k.to_writer(writer)?;

        Ok(())
    }

    pub fn write_len(&self, version: KeyVersion) -> usize {
        let mut sum = 1; // usage
        if version == KeyVersion::V5 {
            sum += 1;
        }
        sum += 1; // symmetric algorithm
        if self.aead.is_some() {
            sum += 1;
        }
        sum + self.s2k.write_len()
    }
}

impl Default for DummyParams {
    fn default() -> Self {
        Self::new()
    }
}
