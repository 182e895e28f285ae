//! Reading detached task logs
//!
//! `tail` returns the last lines of a log without reading the whole file;
//! `follow` keeps printing what the task appends.

use crate::error::{DetachError, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Lines shown by `t :logs` unless `-n` says otherwise
pub const DEFAULT_TAIL_LINES: usize = 50;

const CHUNK_SIZE: u64 = 8 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn open_log(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            DetachError::LogMissing(path.to_path_buf()).into()
        } else {
            e.into()
        }
    })
}

/// The last `count` lines of the log at `path`
///
/// A log the task has not written to yet gives an empty list.
pub fn tail(path: &Path, count: usize) -> Result<Vec<String>> {
    let mut file = open_log(path)?;
    let (lines, _) = tail_from(&mut file, count)?;
    Ok(lines)
}

/// Last `count` lines and the offset just past them
fn tail_from<R: Read + Seek>(reader: &mut R, count: usize) -> io::Result<(Vec<String>, u64)> {
    let end = reader.seek(SeekFrom::End(0))?;
    if count == 0 || end == 0 {
        return Ok((Vec::new(), end));
    }

    // Read backwards until more newlines than lines wanted have been seen,
    // so the first line kept is known to be complete.
    let mut pos = end;
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut newlines = 0;
    while pos > 0 && newlines <= count {
        let step = CHUNK_SIZE.min(pos);
        pos -= step;
        reader.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; step as usize];
        reader.read_exact(&mut chunk)?;
        newlines += count_newlines(&chunk);
        chunks.push(chunk);
    }

    let buf: Vec<u8> = chunks.into_iter().rev().flatten().collect();
    let text = String::from_utf8_lossy(&buf);
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(count);
    let lines = all[skip..].iter().map(|l| l.to_string()).collect();
    Ok((lines, end))
}

fn count_newlines(buf: &[u8]) -> usize {
    buf.iter().filter(|b| **b == b'\n').count()
}

/// Print the last `count` lines, then everything appended afterwards
///
/// `done` is checked before every poll; following ends when it returns true
/// or when `out` can no longer be written to.
pub fn follow<W, F>(path: &Path, count: usize, out: &mut W, mut done: F) -> Result<()>
where
    W: Write,
    F: FnMut() -> bool,
{
    let mut file = open_log(path)?;
    let (lines, mut offset) = tail_from(&mut file, count)?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    let mut chunk = Vec::new();
    while !done() {
        let len = file.metadata()?.len();
        if len < offset {
            // Truncated underneath us, start over
            offset = 0;
        }

        if len > offset {
            file.seek(SeekFrom::Start(offset))?;
            chunk.clear();
            let read = (&mut file).take(len - offset).read_to_end(&mut chunk)?;
            offset += read as u64;
            out.write_all(&chunk)?;
            out.flush()?;
        } else {
            thread::sleep(POLL_INTERVAL);
        }
    }

    Ok(())
}
