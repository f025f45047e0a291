use rand::Rng;

/// Uppercase letters and digits without the look-alikes 0, 1, I and O.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;
/// Candidates tried against the uniqueness index before creation gives up.
pub const MAX_ATTEMPTS: usize = 10;

/// Produces candidate join codes. Uniqueness is checked by the caller.
pub trait ShortCodeSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random codes over `ALPHABET`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodes;

impl ShortCodeSource for RandomCodes {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..CODE_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Codes are case-insensitive on input.
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_restricted_alphabet() {
        for _ in 0..200 {
            let code = RandomCodes.generate();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
            assert!(!code.contains(['0', '1', 'I', 'O']));
        }
    }

    #[test]
    fn input_is_normalized() {
        assert_eq!(normalize("  abc23x "), "ABC23X");
    }
}
