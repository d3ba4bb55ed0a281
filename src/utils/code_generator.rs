use rand::Rng;

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 10;

/// Generate a coupon code when the creator did not supply one.
/// Ambiguous characters (0/O, 1/I) are excluded.
pub fn generate_coupon_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_coupon_code_shape() {
        let code = generate_coupon_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
    }

    #[test]
    fn test_generated_code_is_already_normalized() {
        let code = generate_coupon_code();
        assert_eq!(code, code.to_ascii_uppercase());
    }
}
