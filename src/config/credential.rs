//! Admin credential generation for the HAProxy stats page.

use rand::seq::SliceRandom;
use rand::Rng;

/// Characters a generated credential is drawn from.
pub const CREDENTIAL_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789~-_=+(){}[]^&%$@";

/// Length of a generated credential.
pub const CREDENTIAL_LEN: usize = 8;

/// Generate a credential using the thread-local RNG.
pub fn generate_admin_password() -> String {
    generate_with(&mut rand::thread_rng())
}

/// Generate a credential from the given RNG.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CREDENTIAL_LEN)
        .filter_map(|_| CREDENTIAL_ALPHABET.choose(&mut *rng))
        .map(|&b| char::from(b))
        .collect()
}
