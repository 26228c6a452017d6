// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key agreement tests
//!
//! Client handshake against a known server key pair; the server side derives
//! with its static key and must land on the same symmetric key.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use secure_prompt_client::crypto::{
    derive_shared_key, encode_public_key, handshake, CryptoError, RemotePublicKey,
};
use sha2::{Digest, Sha256};

#[test]
fn test_both_sides_derive_same_key() {
    let server = SecretKey::random(&mut OsRng);
    let remote = RemotePublicKey::parse(&encode_public_key(&server.public_key())).unwrap();

    let (client_key, client_public) = handshake(&remote).unwrap();
    let client_point = PublicKey::from_sec1_bytes(&client_public).unwrap();
    let server_key = derive_shared_key(&server, &client_point).unwrap();

    assert_eq!(client_key, server_key);
}

#[test]
fn test_key_is_sha256_of_x_coordinate() {
    let a = SecretKey::random(&mut OsRng);
    let b = SecretKey::random(&mut OsRng);

    // Independent computation of the shared x-coordinate
    let shared = p256::ecdh::diffie_hellman(a.to_nonzero_scalar(), b.public_key().as_affine());
    let expected = Sha256::digest(shared.raw_secret_bytes());

    let key = derive_shared_key(&a, &b.public_key()).unwrap();
    assert_eq!(key.as_bytes().as_slice(), expected.as_slice());
}

#[test]
fn test_derivation_is_deterministic() {
    let a = SecretKey::random(&mut OsRng);
    let b = SecretKey::random(&mut OsRng);
    let first = derive_shared_key(&a, &b.public_key()).unwrap();
    let second = derive_shared_key(&a, &b.public_key()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_different_servers_give_different_keys() {
    let s1 = SecretKey::random(&mut OsRng);
    let s2 = SecretKey::random(&mut OsRng);
    let client = SecretKey::random(&mut OsRng);

    let k1 = derive_shared_key(&client, &s1.public_key()).unwrap();
    let k2 = derive_shared_key(&client, &s2.public_key()).unwrap();
    assert_ne!(k1, k2);
}

#[test]
fn test_fingerprint_is_sha256_of_point() {
    let server = SecretKey::random(&mut OsRng);
    let point = server.public_key().to_encoded_point(false);
    let remote = RemotePublicKey::parse(&STANDARD.encode(point.as_bytes())).unwrap();

    assert_eq!(remote.fingerprint(), hex::encode(Sha256::digest(point.as_bytes())));
}

#[test]
fn test_compressed_point_rejected() {
    let server = SecretKey::random(&mut OsRng);
    let compressed = server.public_key().to_encoded_point(true);
    let err = RemotePublicKey::parse(&STANDARD.encode(compressed.as_bytes())).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidRemoteKey { .. }));
}

#[test]
fn test_not_on_curve_rejected() {
    let server = SecretKey::random(&mut OsRng);
    let mut bytes = server.public_key().to_encoded_point(false).as_bytes().to_vec();
    // Perturb Y so the point leaves the curve
    bytes[64] ^= 0x01;

    let err = RemotePublicKey::parse(&STANDARD.encode(&bytes)).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidRemoteKey { .. }));
}
