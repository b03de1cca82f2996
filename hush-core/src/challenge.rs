use rand::Rng;

/// The fixed charset login challenges are drawn from (§4.5 step 2).
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz#$%&*+-?!";

/// Generates `len` random bytes drawn from [`CHARSET`]. Used both for the
/// 128-byte login challenge plaintext and for reusable-token bytes.
pub fn random_charset_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())]).collect()
}

/// Standard length of a login challenge (§4.5 step 2: "128-byte random token").
pub const CHALLENGE_LEN: usize = 128;
/// Length chosen for reusable tokens; the spec leaves this undocumented, so
/// this implementation reuses the login challenge's own length and charset.
pub const REUSABLE_TOKEN_LEN: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_only_from_the_fixed_charset() {
        let bytes = random_charset_bytes(256);
        assert_eq!(bytes.len(), 256);
        assert!(bytes.iter().all(|b| CHARSET.contains(b)));
    }
}
