use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::codec::{self, FieldTrim, Record};
use crate::error::{Result, StoreError};

/// File name and fixed header of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub file_name: &'static str,
    pub header: &'static [&'static str],
}

/// Decode every row of a table. A missing file is an empty table.
///
/// Fields are named by the file's own header line, so rows written under an
/// older header still decode.
pub fn read_all(path: &Path, trim: FieldTrim) -> Result<Vec<Record>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((header_idx, header_line)) = lines.next() else {
        return Ok(Vec::new());
    };
    let header = codec::decode_header(header_line).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        line: header_idx + 1,
        source,
    })?;

    lines
        .map(|(idx, line)| {
            codec::decode_line(line, &header, trim).map_err(|source| StoreError::Decode {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Replace the whole table with `records` under `header`.
///
/// The content is written to a fresh temp file in the same directory and
/// renamed into place.
pub fn write_all(path: &Path, records: &[Record], header: &[&str]) -> Result<()> {
    let mut content = codec::encode_header(header);
    content.push('\n');
    for record in records {
        content.push_str(&codec::encode_line(record, header));
        content.push('\n');
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.flush())
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    debug!("Rewrote {} ({} rows)", path.display(), records.len());
    Ok(())
}

/// Add one row at the end of a table.
///
/// A missing table is created with its header. A table whose header differs
/// from `header` is rewritten in full so that the new row lines up.
pub fn append(path: &Path, record: &Record, header: &[&str], trim: FieldTrim) -> Result<()> {
    match read_header(path)? {
        None => write_all(path, std::slice::from_ref(record), header),
        Some(existing) if existing.iter().map(String::as_str).eq(header.iter().copied()) => {
            append_line(path, &codec::encode_line(record, header))
        }
        Some(existing) => {
            debug!(
                "Upgrading header of {} from {:?} to {:?}",
                path.display(),
                existing,
                header
            );
            let mut records = read_all(path, trim)?;
            records.push(record.clone());
            write_all(path, &records, header)
        }
    }
}

/// The header of an existing table, or `None` if the file is absent or empty.
pub fn read_header(path: &Path) -> Result<Option<Vec<String>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let header = codec::decode_header(&line).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        return Ok(Some(header));
    }
    Ok(None)
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    // Hand-edited files may lack a trailing newline.
    let mut buf = String::new();
    if !ends_with_newline(&mut file).map_err(|e| StoreError::io(path, e))? {
        buf.push('\n');
    }
    buf.push_str(line);
    buf.push('\n');

    file.write_all(buf.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| StoreError::io(path, e))
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
