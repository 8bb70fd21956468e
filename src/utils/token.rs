use rand::{thread_rng, Rng};

/// No `0/O` or `1/I`, so keys survive being read aloud or retyped.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

fn sample(alphabet: &[u8], len: usize) -> String {
    let mut rng = thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Self-service access key in the form `XXXX-XXXX`.
pub fn generate_access_key() -> String {
    format!("{}-{}", sample(KEY_ALPHABET, 4), sample(KEY_ALPHABET, 4))
}

/// Uppercases and trims user input so `abcd-efgh ` matches `ABCD-EFGH`.
pub fn normalize_access_key(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn is_well_formed_access_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 9
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || KEY_ALPHABET.contains(b))
}

pub fn generate_room_code() -> String {
    format!(
        "{}-{}-{}",
        sample(ROOM_ALPHABET, 4),
        sample(ROOM_ALPHABET, 4),
        sample(ROOM_ALPHABET, 4)
    )
}

pub fn meeting_link(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), generate_room_code())
}
