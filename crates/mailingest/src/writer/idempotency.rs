use sha2::{Digest, Sha256};

use crate::email::{Attachment, RawEmailRef};

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Deterministic key for one attachment of one stored email.
///
/// Canonical string is `bucket|key|index|filename|sha256(payload)`.
pub fn compute_ingestion_key(source: &RawEmailRef, attachment: &Attachment<'_>) -> String {
    let mut s = String::new();
    s.push_str(&source.bucket);
    s.push('|');
    s.push_str(&source.key);
    s.push('|');
    s.push_str(&attachment.index.to_string());
    s.push('|');
    s.push_str(attachment.filename);
    s.push('|');
    s.push_str(&sha256_hex(attachment.payload));

    sha256_hex(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{ParsedEmail, RawEmailRef};

    const RAW: &str = "From: a@x.com\r\n\
To: b@y.com\r\n\
Date: Mon, 11 Jan 2021 07:29:38 +0000\r\n\
Content-Type: multipart/mixed; boundary=\"B\"\r\n\
\r\n\
--B\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"a.csv\"\r\n\
\r\n\
x\r\n1\r\n\
--B\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"a.csv\"\r\n\
\r\n\
x\r\n1\r\n\
--B--\r\n";

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_is_stable_and_position_sensitive() {
        let source = RawEmailRef::new("mail", "raw/1");
        let email = ParsedEmail::parse(source.clone(), RAW.as_bytes()).unwrap();
        let attachments: Vec<_> = email.attachments().unwrap().collect();
        assert_eq!(attachments.len(), 2);

        let first = compute_ingestion_key(&source, &attachments[0]);
        let again = compute_ingestion_key(&source, &attachments[0]);
        let second = compute_ingestion_key(&source, &attachments[1]);
        let other_email = compute_ingestion_key(&RawEmailRef::new("mail", "raw/2"), &attachments[0]);

        assert_eq!(first, again);
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
        assert_ne!(first, other_email);
    }
}
