use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GROUP_LEN: usize = 4;
const GROUPS: usize = 2;

/// Produces codes like `K7QH-2MXP` without the easily confused `0/O` and `1/I`.
pub(crate) fn generate_access_code() -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(GROUPS * (GROUP_LEN + 1));
    for group in 0..GROUPS {
        if group > 0 {
            output.push('-');
        }
        for _ in 0..GROUP_LEN {
            output.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
        }
    }
    output
}

pub(crate) fn code_matches(expected: &str, provided: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(provided.trim())
}
