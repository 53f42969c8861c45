use std::env;
use std::path::{Component, Path, PathBuf};
use urlencoding::decode;

/// Normalise a source path so that the same file named different ways
/// (relative, `file://` URI, WSL mount, backslashes) compares equal.
pub fn canonicalize_path(source_path: &str) -> String {
    let mut path_str = source_path.to_string();

    // file:// URIs
    if let Some(rest) = path_str.strip_prefix("file://") {
        let decoded = decode(rest).map(|d| d.into_owned()).unwrap_or_else(|_| rest.to_string());
        path_str = decoded;

        // On Windows, file:///C:/... becomes /C:/...
        if cfg!(windows) && path_str.starts_with('/') && path_str.chars().nth(2) == Some(':') {
            path_str.remove(0);
        }
    }

    // WSL mount paths (/mnt/c/... -> C:/...)
    if path_str.starts_with("/mnt/") {
        let parts: Vec<&str> = path_str.split('/').collect();
        if parts.len() >= 3 && parts[2].len() == 1 {
            let drive_letter = parts[2].to_uppercase();
            let remaining = parts[3..].join("/");
            path_str = format!("{}:/{}", drive_letter, remaining);
        }
    }

    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_default().join(path)
    };

    // dunce resolves . and .. and drops the \\?\ prefix on Windows
    let canonical = dunce::canonicalize(&absolute).unwrap_or_else(|_| normalize_lexically(&absolute));
    let mut final_path = canonical.to_string_lossy().replace('\\', "/");

    // C:/ not c:/
    if cfg!(windows) && final_path.chars().nth(1) == Some(':') {
        let mut chars = final_path.chars();
        if let Some(drive) = chars.next() {
            final_path = format!("{}{}", drive.to_ascii_uppercase(), chars.as_str());
        }
    }

    final_path
}

/// Drop `.` and fold `..` without touching the filesystem, for files that
/// do not exist on the debugging host.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Parse an address given as "0x1234" or plain decimal "4660".
pub fn parse_address(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u64>().ok(),
    }
}

/// Lowercase hex rendering of a byte slice, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Decode a string of hex digit pairs. `None` on odd length or a non-hex digit.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(to_hex(&[0xaa, 0x0b, 0x00]), "aa0b00");
        assert_eq!(from_hex("aabbccdd"), Some(vec![0xaa, 0xbb, 0xcc, 0xdd]));
        assert_eq!(from_hex("abc"), None);
        assert_eq!(from_hex("zz"), None);
    }

    #[test]
    fn addresses_accept_hex_and_decimal() {
        assert_eq!(parse_address("0x100"), Some(0x100));
        assert_eq!(parse_address(" 100 "), Some(100));
        assert_eq!(parse_address("0xg"), None);
    }

    #[test]
    fn relative_and_dotted_paths_agree() {
        assert_eq!(canonicalize_path("main.c"), canonicalize_path("./main.c"));
        assert!(!canonicalize_path("main.c").contains('\\'));
    }
}
