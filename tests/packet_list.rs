use std::io::Cursor;

use bytes::Bytes;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pgp_core::crypto::{ecdsa, ECCCurve, HashAlgorithm, KeyType, PublicKeyAlgorithm};
use pgp_core::errors::Error;
use pgp_core::packet::{
    write_streamed, LiteralData, OnePassSignature, Packet, PacketList, PacketTrait, PublicKey,
    Signature, SignatureType, Tag,
};
use pgp_core::ser::Serialize;
use pgp_core::types::{KeyId, KeyVersion, Mpi, PlainSecretParams, PublicParams};
use pgp_core::Config;

const ALL_TAGS: &[Tag] = &[
    Tag::PublicKey,
    Tag::PublicSubkey,
    Tag::SecretKey,
    Tag::SecretSubkey,
    Tag::OnePassSignature,
    Tag::Signature,
    Tag::LiteralData,
];

fn test_key(rng: &mut ChaCha8Rng) -> (PublicKey, Mpi) {
    let (public_params, secret_params) = KeyType::Ecdsa(ECCCurve::P256).generate(rng).unwrap();
    let PlainSecretParams::ECDSA { x } = &secret_params else {
        panic!("expected ECDSA secret params");
    };

    use chrono::SubsecRound;
    let key = PublicKey::new(
        KeyVersion::V4,
        PublicKeyAlgorithm::ECDSA,
        chrono::Utc::now().trunc_subsecs(0),
        public_params,
    )
    .unwrap();

    (key, x.clone())
}

/// An issuer subpacket area for the given key id.
fn issuer_area(key_id: &KeyId) -> Bytes {
    let mut area = vec![9u8, 16];
    area.extend_from_slice(key_id.as_ref());
    area.into()
}

/// Creates a real signature over `data` with the given key.
fn sign_data(
    key: &PublicKey,
    d: &Mpi,
    typ: SignatureType,
    hash: HashAlgorithm,
    data: &[u8],
) -> Signature {
    let template = Signature::new(
        typ,
        key.algorithm(),
        hash,
        Bytes::new(),
        issuer_area(&key.key_id()),
        [0, 0],
        vec![],
    );

    let payload = template.hashed_payload(data);
    let digest = hash.digest(&payload).unwrap();

    let PublicParams::ECDSA { curve, p } = key.public_params() else {
        panic!("expected an ECDSA key");
    };
    let (r, s) = ecdsa::sign(curve, hash, &digest, Some(&payload), d, p).unwrap();

    Signature::new(
        typ,
        key.algorithm(),
        hash,
        Bytes::new(),
        issuer_area(&key.key_id()),
        [digest[0], digest[1]],
        vec![r, s],
    )
}

#[test]
fn packets_are_delivered_in_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(200);
    let (key, d) = test_key(&mut rng);
    let data = b"signed content";
    let sig = sign_data(&key, &d, SignatureType::Binary, HashAlgorithm::SHA2_256, data);
    let ops = OnePassSignature::new(
        SignatureType::Binary,
        HashAlgorithm::SHA2_256,
        key.algorithm(),
        key.key_id(),
    );

    let mut wire = Vec::new();
    key.to_writer_with_header(&mut wire).unwrap();
    ops.to_writer_with_header(&mut wire).unwrap();
    sig.to_writer_with_header(&mut wire).unwrap();

    let list = PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].tag(), Tag::PublicKey);
    assert_eq!(list[1].tag(), Tag::OnePassSignature);
    assert_eq!(list[2].tag(), Tag::Signature);

    // helpers
    assert_eq!(list.index_of_tag(&[Tag::Signature]), vec![2]);
    assert!(list.find_packet(Tag::OnePassSignature).is_some());
    assert_eq!(list.filter_by_tag(&[Tag::PublicKey]).len(), 1);
}

#[test]
fn list_write_read_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(201);
    let (key, _) = test_key(&mut rng);

    let mut list = PacketList::new();
    list.push(key);
    list.push(LiteralData::from_bytes(&b"f"[..], &b"payload"[..]));

    let wire = list.to_bytes().unwrap();
    assert_eq!(wire.len(), list.write_len());

    let back = PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();
    assert_eq!(back, list);
}

#[test]
fn materialization_stops_at_streaming_packet() {
    let mut rng = ChaCha8Rng::seed_from_u64(202);
    let (key, _) = test_key(&mut rng);

    let mut wire = Vec::new();
    key.to_writer_with_header(&mut wire).unwrap();
    LiteralData::from_bytes(&b"a"[..], &b"first"[..])
        .to_writer_with_header(&mut wire)
        .unwrap();
    LiteralData::from_bytes(&b"b"[..], &b"second"[..])
        .to_writer_with_header(&mut wire)
        .unwrap();

    let mut list =
        PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();

    // everything up to and including the first streaming-capable packet
    assert_eq!(list.len(), 2);
    assert!(list.stream().is_some());

    list.drain_stream().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[2].tag(), Tag::LiteralData);
    assert!(list.stream().is_none());
}

#[test]
fn tolerant_read_skips_bad_packet() {
    let _ = pretty_env_logger::try_init();

    let mut rng = ChaCha8Rng::seed_from_u64(203);
    let (key, d) = test_key(&mut rng);
    let sig = sign_data(
        &key,
        &d,
        SignatureType::Binary,
        HashAlgorithm::SHA2_256,
        b"x",
    );

    let mut middle = Vec::new();
    key.to_writer_with_header(&mut middle).unwrap();
    // truncate the MPI data inside the body, keeping the framing intact
    let truncated_body_len = 10;
    let mut wire = Vec::new();
    key.to_writer_with_header(&mut wire).unwrap();
    wire.push(middle[0]); // same tag byte
    wire.push(truncated_body_len as u8);
    wire.extend_from_slice(&middle[2..2 + truncated_body_len]);
    sig.to_writer_with_header(&mut wire).unwrap();

    // tolerant: the middle packet is dropped
    let list = PacketList::try_from_reader(
        Cursor::new(wire.clone()),
        ALL_TAGS,
        &Config {
            tolerant: true,
            ..Config::default()
        },
    )
    .unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].tag(), Tag::PublicKey);
    assert_eq!(list[1].tag(), Tag::Signature);

    // strict: the read fails
    let res = PacketList::try_from_reader(
        Cursor::new(wire),
        ALL_TAGS,
        &Config {
            tolerant: false,
            ..Config::default()
        },
    );
    assert!(matches!(
        res.unwrap_err(),
        Error::InvalidPacketContent { .. }
    ));
}

#[test]
fn disallowed_packets_are_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(204);
    let (key, _) = test_key(&mut rng);

    let mut wire = Vec::new();
    key.to_writer_with_header(&mut wire).unwrap();

    let res = PacketList::try_from_reader(
        Cursor::new(wire),
        &[Tag::Signature],
        &Config {
            tolerant: false,
            ..Config::default()
        },
    );
    assert!(matches!(res.unwrap_err(), Error::DisallowedPacket { .. }));
}

#[test]
fn streamed_write_4096() {
    // a literal data body of exactly 4096 bytes
    let literal = LiteralData::from_bytes(&b"t"[..], vec![0x5A; 4089]);
    let body = literal.to_bytes().unwrap();
    assert_eq!(body.len(), 4096);

    let mut wire = Vec::new();
    write_streamed(Tag::LiteralData, &body[..], &mut wire).unwrap();

    // tag byte in new format encoding
    assert_eq!(wire[0], 0b1100_0000 | 11);
    // one partial segment of 4096 (224 + log2(4096))
    assert_eq!(wire[1], 224 + 12);
    assert_eq!(&wire[2..2 + 4096], &body[..]);
    // and an empty final segment with a simple length header
    assert_eq!(wire[2 + 4096], 0);
    assert_eq!(wire.len(), 2 + 4096 + 1);

    // the reader reassembles the same packet
    let list =
        PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0], Packet::LiteralData(literal));
}

#[test]
fn streamed_write_odd_length() {
    let literal = LiteralData::from_bytes(&b"t"[..], vec![0x3C; 4993]);
    let body = literal.to_bytes().unwrap();
    assert_eq!(body.len(), 5000);

    let mut wire = Vec::new();
    write_streamed(Tag::LiteralData, &body[..], &mut wire).unwrap();

    // chunks: 4096 + 512 partial, 392 fixed; all partial lengths are
    // powers of two and the concatenation equals the payload
    let mut offset = 1;
    assert_eq!(wire[offset], 224 + 12);
    offset += 1 + 4096;
    assert_eq!(wire[offset], 224 + 9);
    offset += 1 + 512;
    // two-octet fixed length encoding of 392
    assert_eq!(
        &wire[offset..offset + 2],
        &[192 + ((392 - 192) >> 8) as u8, ((392 - 192) & 0xFF) as u8]
    );
    offset += 2 + 392;
    assert_eq!(offset, wire.len());

    let payload: Vec<u8> = [
        &wire[2..2 + 4096],
        &wire[2 + 4096 + 1..2 + 4096 + 1 + 512],
        &wire[2 + 4096 + 1 + 512 + 2..],
    ]
    .concat();
    assert_eq!(payload, body);

    let list =
        PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();
    assert_eq!(list[0], Packet::LiteralData(literal));
}

#[test]
fn short_first_partial_segment_is_rejected() {
    // partial header announcing 256 bytes, below the 512 minimum
    let mut wire = vec![0b1100_0000 | 11, 224 + 8];
    wire.extend_from_slice(&[0u8; 256]);
    wire.push(0); // final empty segment

    let res = PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default());
    assert!(res.is_err());
}

#[test]
fn one_pass_signature_binding() {
    let mut rng = ChaCha8Rng::seed_from_u64(205);
    let (key, d) = test_key(&mut rng);
    let data = b"streamed message body";

    let sig = sign_data(&key, &d, SignatureType::Binary, HashAlgorithm::SHA2_256, data);

    let mut ops = OnePassSignature::new(
        SignatureType::Binary,
        HashAlgorithm::SHA2_256,
        key.algorithm(),
        key.key_id(),
    );

    // without the trailing signature there is nothing to verify
    let err = ops.verify(&key, data).unwrap_err();
    assert!(matches!(err, Error::MissingTrailingSignature { .. }));

    ops.set_signature(sig.clone()).unwrap();
    ops.verify(&key, data).unwrap();

    // the signature only pairs with a matching announcement
    let mut mismatched = OnePassSignature::new(
        SignatureType::Binary,
        HashAlgorithm::SHA2_512,
        key.algorithm(),
        key.key_id(),
    );
    mismatched.set_signature(sig).unwrap();
    let err = mismatched.verify(&key, data).unwrap_err();
    assert!(matches!(err, Error::MismatchedTrailingSignature { .. }));
}

#[test]
fn one_pass_signature_wire_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(206);
    let (key, d) = test_key(&mut rng);
    let data = b"wire roundtrip";

    let sig = sign_data(&key, &d, SignatureType::Binary, HashAlgorithm::SHA2_256, data);
    let ops = OnePassSignature::new(
        SignatureType::Binary,
        HashAlgorithm::SHA2_256,
        key.algorithm(),
        key.key_id(),
    );

    let mut wire = Vec::new();
    ops.to_writer_with_header(&mut wire).unwrap();
    sig.to_writer_with_header(&mut wire).unwrap();

    let list =
        PacketList::try_from_reader(Cursor::new(wire), ALL_TAGS, &Config::default()).unwrap();

    let Packet::OnePassSignature(mut parsed_ops) = list[0].clone() else {
        panic!("expected a one-pass signature");
    };
    let Packet::Signature(parsed_sig) = list[1].clone() else {
        panic!("expected a signature");
    };

    assert!(parsed_ops.matches(&parsed_sig));
    parsed_ops.set_signature(parsed_sig).unwrap();
    parsed_ops.verify(&key, data).unwrap();
}
