use sha2::{Digest, Sha256};
use studio_core::JobId;

/// File name for a saved result: `video_{job_id}.mp4`, with characters that
/// are unsafe in file names replaced.
pub fn video_filename(job_id: &JobId) -> String {
    format!("video_{}.mp4", sanitize(job_id.as_str()))
}

/// Lowercase hex SHA-256 of a downloaded payload.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn sanitize(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.trim().chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        // Collapse runs of underscores.
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        cleaned.push(c);
    }
    let mut cleaned = cleaned.trim_matches(&['_', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "unnamed".to_string();
    }
    if cleaned.len() > 80 {
        let mut end = 80;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        cleaned.truncate(end);
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' | '\0'..='\u{1F}'
    )
}

#[cfg(test)]
mod tests {
    use super::{sha256_hex, video_filename};
    use studio_core::JobId;

    #[test]
    fn uuid_job_ids_pass_through() {
        let id = JobId::new("3f2b8c1e-52a4-4c2e-9a51-0d7e4f0c9b11");
        assert_eq!(
            video_filename(&id),
            "video_3f2b8c1e-52a4-4c2e-9a51-0d7e4f0c9b11.mp4"
        );
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(video_filename(&JobId::new("../a//b")), "video_a_b.mp4");
        assert_eq!(video_filename(&JobId::new("  ")), "video_unnamed.mp4");
        let long = JobId::new("x".repeat(200));
        assert_eq!(video_filename(&long).len(), "video_.mp4".len() + 80);
    }

    #[test]
    fn sha256_is_hex_encoded() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
