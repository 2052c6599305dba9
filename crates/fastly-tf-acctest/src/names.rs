use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lowercase alphanumeric string, used to keep test resource names unique.
pub fn rand_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// `tf-test-<10 random>`
pub fn service_name() -> String {
    format!("tf-test-{}", rand_string(10))
}

/// `gcs <10 random>`
pub fn gcs_name() -> String {
    format!("gcs {}", rand_string(10))
}
