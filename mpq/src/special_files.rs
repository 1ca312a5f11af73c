//! Special MPQ files: (listfile), (attributes), (userdata) and friends

use crate::Result;

/// List of file names stored in the archive
pub const LISTFILE: &str = "(listfile)";
/// Per-file attributes (CRC32, timestamps, MD5)
pub const ATTRIBUTES: &str = "(attributes)";
/// Copy of the user data block
pub const USERDATA: &str = "(userdata)";
/// Weak digital signature
pub const SIGNATURE: &str = "(signature)";

/// Special files that are probed even when the listfile omits them
pub const IMPLICIT_FILES: [&str; 2] = [ATTRIBUTES, USERDATA];

/// Check if a name is one of the archive's bookkeeping files
pub fn is_special_file(name: &str) -> bool {
    matches!(name, LISTFILE | ATTRIBUTES | USERDATA | SIGNATURE)
}

/// Parse a (listfile) into individual filenames
///
/// The (listfile) format supports:
/// - One filename per line
/// - Comments starting with ';' or '#'
/// - Optional file metadata after ';' on each line
/// - Empty lines are ignored
pub fn parse_listfile(data: &[u8]) -> Result<Vec<String>> {
    let content = match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => {
            log::warn!("(listfile) contains invalid UTF-8, using lossy conversion");
            String::from_utf8_lossy(data).into_owned()
        }
    };

    let files: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .filter_map(|line| {
            let filename = line.split(';').next().unwrap_or(line).trim();
            (!filename.is_empty()).then(|| filename.to_string())
        })
        .collect();

    log::debug!("Parsed {} files from (listfile)", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_listfile() {
        let files = parse_listfile(b"file1.txt\r\nUnits\\Human\\Footman.mdx\nfile3.bin").unwrap();
        assert_eq!(files, ["file1.txt", "Units\\Human\\Footman.mdx", "file3.bin"]);
    }

    #[test]
    fn test_parse_listfile_with_comments() {
        let content = b"; This is a comment\n\
                       file1.txt\n\
                       # Another comment\n\
                       file2.dat\n\
                       ; file3.txt - commented out\n\
                       file4.bin";

        let files = parse_listfile(content).unwrap();
        assert_eq!(files, ["file1.txt", "file2.dat", "file4.bin"]);
    }

    #[test]
    fn test_parse_listfile_with_metadata() {
        let content = b"file1.txt;12345\nfile2.dat;67890;extra data\n   file3.bin   ;   metadata   ";
        let files = parse_listfile(content).unwrap();
        assert_eq!(files, ["file1.txt", "file2.dat", "file3.bin"]);
    }

    #[test]
    fn test_parse_listfile_blank_input() {
        assert!(parse_listfile(b"").unwrap().is_empty());
        assert!(parse_listfile(b"\n\n  \n; only a comment").unwrap().is_empty());
    }

    #[test]
    fn test_parse_listfile_invalid_utf8() {
        let files = parse_listfile(b"ok.txt\nbad\xFF.txt").unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], "ok.txt");
        assert!(files[1].starts_with("bad"));
    }

    #[test]
    fn test_special_file_names() {
        assert!(is_special_file("(listfile)"));
        assert!(is_special_file("(attributes)"));
        assert!(is_special_file("(userdata)"));
        assert!(!is_special_file("war3map.j"));
    }
}
