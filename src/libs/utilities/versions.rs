//! Version-aware ordering of installer file names.
//!
//! Vendors publish names like `fldigi-4.2.05_x64-setup.exe` or `wsjtx-2.7.0-win64.exe`.
//! The dotted numeric run inside the name is compared component by component as
//! integers, so `1.10.0` sorts above `1.9.0`. Ties, and names without any dotted
//! number, fall back to plain string comparison so the order is always total and
//! deterministic. Pre-release suffixes such as `-rc1` or `-beta` are not interpreted.

use std::cmp::Ordering;

/// Returns the first `\d+(\.\d+)+` run in `name`, e.g. `"2.7.0"` for
/// `"wsjtx-2.7.0-win64.exe"`. A lone number such as the `64` in `win64` is not a version.
pub fn extract_dotted_version(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }

        let mut end = start;
        let mut dotted_end = None;
        loop {
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
                end += 1;
                dotted_end = Some(end);
                continue;
            }
            break;
        }

        if dotted_end.is_some() {
            return Some(&name[start..end]);
        }
        start = end;
    }
    None
}

/// Splits a dotted version into integer components. Components too large for `u64`
/// saturate rather than fail.
pub fn version_components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(u64::MAX))
        .collect()
}

/// Orders two file names: versioned names above unversioned ones, then by numeric
/// components, then lexicographically.
pub fn compare_file_names(a: &str, b: &str) -> Ordering {
    let va = extract_dotted_version(a).map(version_components);
    let vb = extract_dotted_version(b).map(version_components);
    va.cmp(&vb).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_dotted_run() {
        assert_eq!(extract_dotted_version("app-1.10.0_setup.exe"), Some("1.10.0"));
        assert_eq!(extract_dotted_version("wsjtx-2.7.0-win64.exe"), Some("2.7.0"));
        assert_eq!(extract_dotted_version("fldigi-4.2.05_x64-setup.exe"), Some("4.2.05"));
        assert_eq!(extract_dotted_version("VARA HF v4.8.7 setup.zip"), Some("4.8.7"));
        assert_eq!(extract_dotted_version("win64-setup.exe"), None);
        assert_eq!(extract_dotted_version("setup-2.exe"), None);
        assert_eq!(extract_dotted_version("build64.5"), Some("64.5"));
    }

    #[test]
    fn numeric_beats_lexicographic() {
        let mut names = vec!["app-1.2.0_setup.exe", "app-1.10.0_setup.exe", "app-1.9.0_setup.exe"];
        names.sort_by(|a, b| compare_file_names(a, b));
        assert_eq!(names, ["app-1.2.0_setup.exe", "app-1.9.0_setup.exe", "app-1.10.0_setup.exe"]);
    }

    #[test]
    fn ties_and_missing_versions_fall_back_to_strings() {
        assert_eq!(compare_file_names("b-1.0.exe", "a-1.0.exe"), Ordering::Greater);
        assert_eq!(compare_file_names("setup.exe", "app-0.1.exe"), Ordering::Less);
        assert_eq!(compare_file_names("beta.exe", "alpha.exe"), Ordering::Greater);
        // Suffixes after the numeric run only compare as plain text.
        assert_eq!(compare_file_names("app-2.0-rc1.exe", "app-2.0-beta.exe"), Ordering::Greater);
    }
}
