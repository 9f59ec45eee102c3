use std::path::Path;

use anyhow::{Context, Result};
use makemore_core::MakemoreError;

/// Loads a corpus file and splits it into one word per line. A file that
/// isn't UTF-8 text holds no usable words, so it fails as an empty corpus.
pub fn read_words<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("unable to read corpus from {}", path.display()))?;
    let content = String::from_utf8(bytes)
        .map_err(|_| MakemoreError::EmptyCorpus)
        .with_context(|| format!("corpus {} is not UTF-8 text", path.display()))?;
    Ok(split_words(&content))
}

fn split_words(content: &str) -> Vec<String> {
    content.lines().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("emma\nolivia\r\nava\n"), vec!["emma", "olivia", "ava"]);
        assert!(split_words("").is_empty());
    }

    #[test]
    fn test_binary_file_is_empty_corpus() {
        let path = std::env::temp_dir().join(format!("makemore-binary-{}.txt", std::process::id()));
        std::fs::write(&path, [0xff, 0xfe, b'a', b'\n']).unwrap();
        let err = read_words(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            err.downcast_ref::<MakemoreError>(),
            Some(MakemoreError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = read_words("this/file/does/not/exist.txt").unwrap_err();
        assert!(err.to_string().contains("unable to read corpus"));
    }
}
