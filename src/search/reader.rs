//! Cached line-block reader
//!
//! [`SearchFile`] wraps one candidate file and yields newline-aligned text
//! blocks. Every block read from disk is appended to an in-memory cache, so
//! the file can be scanned by any number of patterns, or replayed by a
//! downstream parser, without a single byte being read from disk twice.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read chunk size, equal to the common filesystem block size
pub const BLOCK_SIZE: usize = 4096;

/// Lazy, cache-backed reader over one candidate file.
///
/// Blocks are `(newline_count, text)` pairs. Every yielded block except
/// possibly the final one ends exactly at a newline boundary, so no block
/// ever contains a truncated trailing line and content matchers can compare
/// whole lines without re-buffering across block boundaries.
///
/// Access is by block index: [`SearchFile::block`] replays the cache first
/// and only reads from the live handle when asked for a block beyond it,
/// making any number of logical passes cheap.
pub struct SearchFile {
    path: PathBuf,
    filename: String,
    root: PathBuf,
    handle: Option<BufReader<File>>,
    /// Decode with invalid-sequence replacement once strict decoding failed
    lossy: bool,
    eof: bool,
    /// Bytes past the last newline of the previous chunk, carried forward
    pending: Vec<u8>,
    blocks: Vec<(usize, String)>,
    /// Bytes consumed from disk, also the resume offset after `close()`
    offset: u64,
    size: Option<Option<u64>>,
}

impl SearchFile {
    pub fn new(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        SearchFile {
            path,
            filename,
            root,
            handle: None,
            lossy: false,
            eof: false,
            pending: Vec::new(),
            blocks: Vec::new(),
            offset: 0,
            size: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File size in bytes, memoized; `None` when the file cannot be stat'ed
    pub fn filesize(&mut self) -> Option<u64> {
        if self.size.is_none() {
            self.size = Some(match std::fs::metadata(&self.path) {
                Ok(m) => Some(m.len()),
                Err(_) => {
                    tracing::debug!(
                        "Couldn't read file when checking filesize: {}",
                        self.filename
                    );
                    None
                }
            });
        }
        self.size.unwrap_or(None)
    }

    /// Total bytes read from disk so far; stays flat while passes replay the cache
    pub fn bytes_read(&self) -> u64 {
        self.offset
    }

    /// Number of blocks currently cached
    pub fn cached_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Fetch block `index`, reading further into the file only if the cache
    /// does not hold it yet. Returns `None` past the end of the file.
    pub fn block(&mut self, index: usize) -> Result<Option<(usize, &str)>> {
        while self.blocks.len() <= index {
            match self.read_next_block()? {
                Some(b) => self.blocks.push(b),
                None => return Ok(None),
            }
        }
        let (count, text) = &self.blocks[index];
        Ok(Some((*count, text.as_str())))
    }

    /// Release the file handle. The cache is preserved, and reading past it
    /// later transparently reopens the file at the saved offset.
    pub fn close(&mut self) {
        self.handle = None;
    }

    fn open_handle(&mut self) -> Result<()> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Couldn't open file: {}", self.path.display()))?;
        if self.offset > 0 {
            file.seek(SeekFrom::Start(self.offset))
                .with_context(|| format!("Couldn't seek in file: {}", self.path.display()))?;
        }
        self.handle = Some(BufReader::with_capacity(BLOCK_SIZE, file));
        Ok(())
    }

    fn read_next_block(&mut self) -> Result<Option<(usize, String)>> {
        if self.eof {
            return Ok(None);
        }
        if self.handle.is_none() {
            self.open_handle()?;
        }
        let handle = self.handle.as_mut().expect("handle opened above");

        let mut chunk = std::mem::take(&mut self.pending);
        let carried = chunk.len();
        chunk.resize(carried + BLOCK_SIZE, 0);
        let n = handle
            .read(&mut chunk[carried..])
            .with_context(|| format!("Read error: {}", self.path.display()))?;
        chunk.truncate(carried + n);
        self.offset += n as u64;

        if n == 0 {
            self.eof = true;
            if chunk.is_empty() {
                return Ok(None);
            }
            // The last line may not have a terminating newline
            return Ok(Some((1, self.decode(&chunk))));
        }

        // The carried remainder holds no newline by construction, so counting
        // the whole chunk counts only the fresh bytes.
        let mut newlines = chunk.iter().filter(|&&b| b == b'\n').count();
        let block_end = if newlines == 0 {
            // Extend the read up to the next newline so the block still ends
            // at a line boundary.
            let extended = handle
                .read_until(b'\n', &mut chunk)
                .with_context(|| format!("Read error: {}", self.path.display()))?;
            self.offset += extended as u64;
            newlines = 1;
            chunk.len()
        } else {
            chunk.iter().rposition(|&b| b == b'\n').expect("newline counted above") + 1
        };

        self.pending = chunk.split_off(block_end);
        Ok(Some((newlines, self.decode(&chunk))))
    }

    /// Decode a newline-framed byte block. Since newline bytes never occur
    /// inside a multi-byte UTF-8 sequence, framing cannot split characters;
    /// a strict decode failure means the file genuinely holds invalid
    /// sequences, and decoding falls back to replacement from here on.
    fn decode(&mut self, bytes: &[u8]) -> String {
        if self.lossy {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                tracing::debug!(
                    "Couldn't read {} as utf-8 text ({}). Usually because it's a binary \
                     file, but sometimes single non-unicode characters; continuing with \
                     replacement decoding.",
                    self.path.display(),
                    e
                );
                self.lossy = true;
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_blocks_end_at_newlines() {
        let dir = TempDir::new().unwrap();
        // ~40 bytes per line, enough lines to span several 4KB blocks
        let content: String = (0..1000).map(|i| format!("line number {i:06} with padding\n")).collect();
        let path = write_file(&dir, "many_lines.txt", content.as_bytes());

        let mut f = SearchFile::new(path);
        let mut i = 0;
        let mut total_lines = 0;
        let mut reassembled = String::new();
        while let Some((count, text)) = f.block(i).unwrap() {
            assert!(text.ends_with('\n'), "block {i} does not end at a newline");
            assert_eq!(count, text.matches('\n').count());
            total_lines += count;
            reassembled.push_str(text);
            i += 1;
        }
        assert!(i > 1, "expected multiple blocks");
        assert_eq!(total_lines, 1000);
        assert_eq!(reassembled, content);
    }

    #[test]
    fn test_long_line_extends_block() {
        let dir = TempDir::new().unwrap();
        let long_line = "x".repeat(3 * BLOCK_SIZE);
        let content = format!("{long_line}\nshort\n");
        let path = write_file(&dir, "long.txt", content.as_bytes());

        let mut f = SearchFile::new(path);
        let (count, text) = f.block(0).unwrap().unwrap();
        assert_eq!(count, 1);
        assert!(text.ends_with('\n'));
        assert_eq!(text.trim_end(), long_line);
    }

    #[test]
    fn test_final_block_without_newline() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "no_trailing.txt", b"alpha\nbeta");

        let mut f = SearchFile::new(path);
        let (_, first) = f.block(0).unwrap().unwrap();
        assert_eq!(first, "alpha\n");
        let (count, last) = f.block(1).unwrap().unwrap();
        assert_eq!((count, last), (1, "beta"));
        assert!(f.block(2).unwrap().is_none());
    }

    #[test]
    fn test_cache_replay_reads_no_new_bytes() {
        let dir = TempDir::new().unwrap();
        let content: String = (0..500).map(|i| format!("row {i}\n")).collect();
        let path = write_file(&dir, "replay.txt", content.as_bytes());

        let mut f = SearchFile::new(path);
        let mut i = 0;
        while f.block(i).unwrap().is_some() {
            i += 1;
        }
        let bytes_first_pass = f.bytes_read();
        assert_eq!(bytes_first_pass, content.len() as u64);

        // Second full pass comes entirely from the cache
        let mut j = 0;
        while f.block(j).unwrap().is_some() {
            j += 1;
        }
        assert_eq!(j, i);
        assert_eq!(f.bytes_read(), bytes_first_pass);
    }

    #[test]
    fn test_partial_scan_then_deeper_scan() {
        let dir = TempDir::new().unwrap();
        let content: String = (0..2000).map(|i| format!("data point {i:08}\n")).collect();
        let path = write_file(&dir, "deep.txt", content.as_bytes());

        let mut f = SearchFile::new(path);
        // Shallow pass: only the first block
        f.block(0).unwrap().unwrap();
        let shallow_bytes = f.bytes_read();

        // Deeper pass re-serves block 0 from cache, then continues
        let mut i = 0;
        while f.block(i).unwrap().is_some() {
            i += 1;
        }
        // Total equals one full scan, not shallow + full
        assert_eq!(f.bytes_read(), content.len() as u64);
        assert!(shallow_bytes < content.len() as u64);
    }

    #[test]
    fn test_lossy_fallback_on_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let mut content = Vec::new();
        content.extend_from_slice(b"clean first line\n");
        content.extend_from_slice(&[0xff, 0xfe, b'b', b'a', b'd', b'\n']);
        content.extend_from_slice(b"clean last line\n");
        let path = write_file(&dir, "mixed.bin", &content);

        let mut f = SearchFile::new(path);
        let mut texts = Vec::new();
        let mut i = 0;
        while let Some((_, text)) = f.block(i).unwrap() {
            texts.push(text.to_string());
            i += 1;
        }
        let joined = texts.concat();
        assert!(joined.contains("clean first line"));
        assert!(joined.contains("clean last line"));
        assert!(joined.contains('\u{FFFD}'));
    }

    #[test]
    fn test_close_preserves_cache_and_resumes() {
        let dir = TempDir::new().unwrap();
        let content: String = (0..2000).map(|i| format!("entry {i:08} padded out\n")).collect();
        let path = write_file(&dir, "resume.txt", content.as_bytes());

        let mut f = SearchFile::new(path);
        f.block(0).unwrap().unwrap();
        let cached = f.cached_blocks();
        f.close();

        // Cache survives the close
        assert_eq!(f.cached_blocks(), cached);
        let (_, first) = f.block(0).unwrap().unwrap();
        assert!(first.ends_with('\n'));

        // Reading past the cache reopens at the saved offset
        let mut i = 0;
        let mut reassembled = String::new();
        while let Some((_, text)) = f.block(i).unwrap() {
            reassembled.push_str(text);
            i += 1;
        }
        assert_eq!(reassembled, content);
    }

    #[test]
    fn test_empty_file_yields_no_blocks() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");
        let mut f = SearchFile::new(path);
        assert!(f.block(0).unwrap().is_none());
    }

    #[test]
    fn test_filesize_memoized() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "sized.txt", b"12345\n");
        let mut f = SearchFile::new(path.clone());
        assert_eq!(f.filesize(), Some(6));
        // Deleting the file after the first stat does not change the answer
        fs::remove_file(&path).unwrap();
        assert_eq!(f.filesize(), Some(6));
    }

    #[test]
    fn test_missing_file_filesize_unknown() {
        let mut f = SearchFile::new(PathBuf::from("/nonexistent/definitely/missing.txt"));
        assert_eq!(f.filesize(), None);
        assert!(f.block(0).is_err());
    }
}
