use crate::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Single-pass line reader over a plain or gzip-compressed log file.
///
/// Yields each line without its terminator. The file is consumed as it is
/// iterated; reading it again requires opening a new `LogLines`.
pub struct LogLines {
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
}

impl LogLines {
    /// Open `path`, decompressing when the name ends in `.gz`
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let compressed = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

        tracing::debug!(
            "Opening log file {} ({})",
            path.display(),
            if compressed { "gzip" } else { "plain" }
        );

        let reader: Box<dyn Read> = if compressed {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self::from_reader(BufReader::new(reader)))
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            buf: Vec::new(),
        }
    }
}

impl Iterator for LogLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}
