//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vellum_auth::{Capability, PermissionRequest};
use vellum_core::{Ed25519PublicKey, Keypair, KeypairSigner};
use vellum_store::StoreOptions;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

pub fn signer() -> impl Strategy<Value = KeypairSigner> {
    keypair().prop_map(KeypairSigner::new)
}

pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Arbitrary bytes up to `max_len`.
pub fn document(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Text drawn from a small alphabet, which zstd shrinks well.
pub fn compressible_document(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    (min_len..=max_len, prop::collection::vec(b'a'..=b'e', 1..16)).prop_map(|(len, pattern)| {
        pattern.iter().copied().cycle().take(len).collect()
    })
}

/// A document title, sometimes with non-ASCII characters.
pub fn title() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9 ]{1,40}".prop_map(String::from),
        "[\\p{L} ]{1,20}".prop_map(String::from),
    ]
}

/// An `https://` origin.
pub fn origin() -> impl Strategy<Value = String> {
    "[a-z]{1,12}\\.(com|org|example)".prop_map(|host| format!("https://{}", host))
}

pub fn store_options() -> impl Strategy<Value = StoreOptions> {
    (any::<bool>(), prop::option::of(title()), prop::option::of("[a-z]{1,16}")).prop_map(
        |(encrypt, title, author)| StoreOptions {
            encrypt,
            title,
            author,
        },
    )
}

pub fn capability() -> impl Strategy<Value = Capability> {
    prop_oneof![
        Just(Capability::Sign),
        Just(Capability::Identity),
        Just(Capability::Transaction),
        Just(Capability::Certificate),
    ]
}

pub fn permission_request() -> impl Strategy<Value = PermissionRequest> {
    (capability(), any::<bool>()).prop_map(|(capability, required)| {
        if required {
            PermissionRequest::required(capability, format!("needs {:?}", capability))
        } else {
            PermissionRequest::optional(capability, format!("wants {:?}", capability))
        }
    })
}
