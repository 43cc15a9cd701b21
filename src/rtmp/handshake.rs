// RTMP handshake utils

use hmac::{Hmac, Mac};
use sha2::Sha256;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use std::sync::LazyLock;

use crate::{log::Logger, log_debug};

use super::{
    RtmpError, GENUINE_FMS, GENUINE_FP, RANDOM_CRUD, RTMP_SERVER_VERSION, RTMP_SIG_SIZE,
    RTMP_VERSION, SHA256DL,
};

// Full handshake keys (partial key + random crud)

static GENUINE_FP_FULL_KEY: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let mut v: Vec<u8> = GENUINE_FP.bytes().collect();
    v.extend(RANDOM_CRUD);
    v
});

static GENUINE_FMS_FULL_KEY: LazyLock<Vec<u8>> = LazyLock::new(|| {
    let mut v: Vec<u8> = GENUINE_FMS.bytes().collect();
    v.extend(RANDOM_CRUD);
    v
});

/// Generates the full RTMP handshake response (S0 + S1 + S2)
///
/// # Arguments
///
/// * `client_signature` - The C1 block sent by the client (1536 bytes)
/// * `logger` - Logger of the RTMP session
pub fn generate_s0_s1_s2(client_signature: &[u8], logger: &Logger) -> Result<Vec<u8>, RtmpError> {
    if client_signature.len() != RTMP_SIG_SIZE {
        return Err(RtmpError::HandshakeFailed(format!(
            "C1 size invalid: {}",
            client_signature.len()
        )));
    }

    let client_version = &client_signature[4..8];

    let mut all_bytes: Vec<u8> = Vec::with_capacity(1 + RTMP_SIG_SIZE * 2);

    if client_version.iter().all(|b| *b == 0) {
        // Old style client, no digest to verify
        log_debug!(logger, "Using simple handshake");

        all_bytes.push(RTMP_VERSION);
        all_bytes.extend(generate_simple_s1());
        all_bytes.extend(client_signature);
    } else {
        log_debug!(logger, "Using complex handshake");

        let client_digest = match find_client_digest(client_signature) {
            Some(d) => d,
            None => {
                return Err(RtmpError::HandshakeFailed(
                    "C1 digest did not verify with any known scheme".to_string(),
                ));
            }
        };

        let s1 = generate_s1(&client_signature[0..4]);
        let s2 = generate_s2(&client_digest);

        all_bytes.push(RTMP_VERSION);
        all_bytes.extend(s1);
        all_bytes.extend(s2);
    }

    Ok(all_bytes)
}

/// Generates S1 for the simple handshake (fresh random block)
fn generate_simple_s1() -> Vec<u8> {
    let mut s1 = vec![0; RTMP_SIG_SIZE];

    let mut rng = StdRng::from_os_rng();
    rng.fill_bytes(&mut s1[8..]);

    // Time and version stay zero
    s1
}

/// Generates S1 for the complex handshake
///
/// # Arguments
///
/// * `client_time` - The first 4 bytes of C1 (echoed as server time)
fn generate_s1(client_time: &[u8]) -> Vec<u8> {
    let mut s1 = vec![0; RTMP_SIG_SIZE];

    let mut rng = StdRng::from_os_rng();
    rng.fill_bytes(&mut s1[8..]);

    s1[0..4].copy_from_slice(client_time);
    s1[4..8].copy_from_slice(&RTMP_SERVER_VERSION.to_be_bytes());

    let digest_pos = calc_digest_pos(&s1, 8);
    let digest = make_digest(GENUINE_FMS.as_bytes(), &s1, Some(digest_pos));

    s1[digest_pos..digest_pos + SHA256DL].copy_from_slice(&digest);

    s1
}

/// Generates S2 for the complex handshake
///
/// # Arguments
///
/// * `client_digest` - The digest found in C1
fn generate_s2(client_digest: &[u8]) -> Vec<u8> {
    let mut s2 = vec![0; RTMP_SIG_SIZE];

    let mut rng = StdRng::from_os_rng();
    rng.fill_bytes(&mut s2);

    let gap = RTMP_SIG_SIZE - SHA256DL;

    let key = make_digest(&GENUINE_FMS_FULL_KEY, client_digest, None);
    let signature = make_digest(&key, &s2[0..gap], None);

    s2[gap..].copy_from_slice(&signature);

    s2
}

/// Locates and verifies the client digest within C1
/// Both digest schemes (base offsets 772 and 8) are tried
///
/// # Return value
///
/// Returns the 32 byte client digest, or None if neither scheme verifies
fn find_client_digest(client_signature: &[u8]) -> Option<Vec<u8>> {
    for base in [772, 8] {
        let digest_pos = calc_digest_pos(client_signature, base);

        let computed = make_digest(GENUINE_FP.as_bytes(), client_signature, Some(digest_pos));
        let provided = &client_signature[digest_pos..digest_pos + SHA256DL];

        if compare_signatures(&computed, provided) {
            return Some(provided.to_vec());
        }
    }

    None
}

/// Computes the digest offset for a scheme base offset
fn calc_digest_pos(p: &[u8], base: usize) -> usize {
    let mut pos: usize = 0;

    for i in 0..4 {
        pos += p[base + i] as usize;
    }

    (pos % 728) + base + 4
}

/// Calculates a HMAC-SHA256 digest
///
/// # Arguments
///
/// * `key` - The HMAC key
/// * `src` - The source bytes
/// * `gap` - When set, the 32 byte digest slot at this offset is skipped
fn make_digest(key: &[u8], src: &[u8], gap: Option<usize>) -> Vec<u8> {
    let mut mac: Hmac<Sha256> = Hmac::new_from_slice(key).expect("HMAC can take key of any size");

    match gap {
        Some(gap) => {
            mac.update(&src[..gap]);
            mac.update(&src[gap + SHA256DL..]);
        }
        None => {
            mac.update(src);
        }
    }

    mac.finalize().into_bytes().to_vec()
}

/// Compares 2 signatures
/// Returns true only if the 2 signatures are equal
fn compare_signatures(sig1: &[u8], sig2: &[u8]) -> bool {
    if sig1.len() != sig2.len() {
        return false;
    }

    let mut result = true;

    for i in 0..sig1.len() {
        result = result && (sig1[i] == sig2[i]);
    }

    result
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Logger;

    /// Builds a C1 block the way a digest-capable client would (scheme base 8)
    fn make_client_c1() -> Vec<u8> {
        let mut c1 = vec![0; RTMP_SIG_SIZE];

        let mut rng = StdRng::from_os_rng();
        rng.fill_bytes(&mut c1[8..]);

        c1[0..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x01]); // client time
        c1[4..8].copy_from_slice(&[0x80, 0x00, 0x07, 0x02]); // client version

        let digest_pos = calc_digest_pos(&c1, 8);
        let digest = make_digest(GENUINE_FP.as_bytes(), &c1, Some(digest_pos));

        c1[digest_pos..digest_pos + SHA256DL].copy_from_slice(&digest);

        c1
    }

    #[test]
    fn test_calc_digest_pos_bounds() {
        let mut p = vec![0xff; RTMP_SIG_SIZE];

        // Worst case stays within the signature for both bases
        assert!(calc_digest_pos(&p, 8) + SHA256DL <= RTMP_SIG_SIZE);
        assert!(calc_digest_pos(&p, 772) + SHA256DL <= RTMP_SIG_SIZE);

        p = vec![0x00; RTMP_SIG_SIZE];

        assert_eq!(calc_digest_pos(&p, 8), 12);
        assert_eq!(calc_digest_pos(&p, 772), 776);
    }

    #[test]
    fn test_simple_handshake_response() {
        let logger = Logger::new_disabled();

        let mut c1 = vec![0; RTMP_SIG_SIZE];
        c1[0..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x09]);
        // Client version stays zero: simple handshake
        c1[100] = 0x55;

        let response = generate_s0_s1_s2(&c1, &logger).unwrap();

        assert_eq!(response.len(), 1 + RTMP_SIG_SIZE * 2);
        assert_eq!(response[0], RTMP_VERSION);

        // S2 echoes C1
        assert_eq!(&response[1 + RTMP_SIG_SIZE..], &c1[..]);
    }

    #[test]
    fn test_complex_handshake_response() {
        let logger = Logger::new_disabled();

        let c1 = make_client_c1();
        let client_digest_pos = calc_digest_pos(&c1, 8);
        let client_digest = &c1[client_digest_pos..client_digest_pos + SHA256DL];

        let response = generate_s0_s1_s2(&c1, &logger).unwrap();

        assert_eq!(response.len(), 1 + RTMP_SIG_SIZE * 2);
        assert_eq!(response[0], RTMP_VERSION);

        let s1 = &response[1..1 + RTMP_SIG_SIZE];
        let s2 = &response[1 + RTMP_SIG_SIZE..];

        // S1 carries the server version and a digest
        // that verifies with the server partial key
        assert_eq!(&s1[4..8], &RTMP_SERVER_VERSION.to_be_bytes());

        let s1_digest_pos = calc_digest_pos(s1, 8);
        let s1_digest = make_digest(GENUINE_FMS.as_bytes(), s1, Some(s1_digest_pos));

        assert_eq!(&s1[s1_digest_pos..s1_digest_pos + SHA256DL], &s1_digest[..]);

        // S2 is signed with a key derived from the client digest
        let key = make_digest(&GENUINE_FMS_FULL_KEY, client_digest, None);
        let signature = make_digest(&key, &s2[..RTMP_SIG_SIZE - SHA256DL], None);

        assert_eq!(&s2[RTMP_SIG_SIZE - SHA256DL..], &signature[..]);
    }

    #[test]
    fn test_invalid_client_digest() {
        let logger = Logger::new_disabled();

        let mut c1 = make_client_c1();

        // Corrupt the digest
        let digest_pos = calc_digest_pos(&c1, 8);
        c1[digest_pos] = c1[digest_pos].wrapping_add(1);

        assert!(generate_s0_s1_s2(&c1, &logger).is_err());
    }
}
