use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use log::LevelFilter;

use crate::errors::RegionError;

/// Bases in one-hot column order.
pub const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    let reader = BufReader::new(file);

    Ok(reader)
}

///
/// A file being written, compressed or not. Unlike dropping, [`finish`]
/// reports a failure to write the gzip trailer.
///
/// [`finish`]: DynamicSink::finish
///
pub enum DynamicSink {
    Plain(File),
    Gzip(GzEncoder<File>),
}

impl DynamicSink {
    pub fn create(path: &Path, gzipped: bool) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("Failed to create file: {:?}", path))?;
        Ok(match gzipped {
            true => DynamicSink::Gzip(GzEncoder::new(file, Compression::default())),
            false => DynamicSink::Plain(file),
        })
    }

    pub fn finish(self) -> std::io::Result<()> {
        let mut file = match self {
            DynamicSink::Plain(file) => file,
            DynamicSink::Gzip(encoder) => encoder.finish()?,
        };
        file.flush()
    }
}

impl Write for DynamicSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            DynamicSink::Plain(file) => file.write(buf),
            DynamicSink::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            DynamicSink::Plain(file) => file.flush(),
            DynamicSink::Gzip(encoder) => encoder.flush(),
        }
    }
}

pub type DynamicWriter = BufWriter<DynamicSink>;

///
/// Get a writer that gzips its output when the path ends in `.gz`.
/// Close it with [`finish_dynamic_writer`].
///
pub fn get_dynamic_writer(path: &Path) -> Result<DynamicWriter> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    Ok(BufWriter::new(DynamicSink::create(path, is_gzipped)?))
}

/// Flush the buffer and finish the underlying sink.
pub fn finish_dynamic_writer(writer: DynamicWriter) -> std::io::Result<()> {
    let sink = writer.into_inner().map_err(|e| e.into_error())?;
    sink.finish()
}

///
/// Read a chrom sizes file (`chrom<TAB>size` per line) into a map.
/// Lines too short to hold both fields are skipped.
///
pub fn load_chrom_sizes(path: &Path) -> Result<HashMap<String, u32>> {
    let reader = get_dynamic_reader(path)?;
    let mut chrom_sizes = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.len() <= 2 {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(chrom), Some(size)) = (fields.next(), fields.next()) else {
            return Err(RegionError::RegionParseError(format!(
                "line {} of {:?} is not `chrom size`",
                line_num + 1,
                path
            ))
            .into());
        };
        let size = size.parse::<u32>().map_err(|e| {
            RegionError::RegionParseError(format!("line {}: {}", line_num + 1, e))
        })?;
        chrom_sizes.insert(chrom.to_string(), size);
    }

    Ok(chrom_sizes)
}

///
/// One-hot encode a DNA sequence into `L x 4` rows in ACGT order.
/// Lower-case bases are accepted; anything else is an error.
///
pub fn one_hot_encode(sequence: &[u8]) -> Result<Vec<[f32; 4]>, RegionError> {
    sequence
        .iter()
        .enumerate()
        .map(|(position, base)| {
            let mut row = [0.0; 4];
            match base.to_ascii_uppercase() {
                b'A' => row[0] = 1.0,
                b'C' => row[1] = 1.0,
                b'G' => row[2] = 1.0,
                b'T' => row[3] = 1.0,
                _ => {
                    return Err(RegionError::InvalidBase {
                        base: *base as char,
                        position,
                    });
                }
            }
            Ok(row)
        })
        .collect()
}

///
/// Decode one-hot rows back into bases. Rows that are not exactly one-hot
/// become `N`.
///
pub fn one_hot_decode(one_hot: &[[f32; 4]]) -> String {
    one_hot
        .iter()
        .map(|row| {
            let hot: Vec<usize> = (0..4).filter(|&i| row[i] > 0.5).collect();
            match hot.as_slice() {
                [i] => BASES[*i] as char,
                _ => 'N',
            }
        })
        .collect()
}

///
/// Map a verbosity name (`CRITICAL`, `ERROR`, `WARNING`, `INFO`, `DEBUG`)
/// onto a log level filter.
///
pub fn parse_verbosity(level: &str) -> Result<LevelFilter, RegionError> {
    match level.to_uppercase().as_str() {
        "CRITICAL" | "ERROR" => Ok(LevelFilter::Error),
        "WARNING" | "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        _ => Err(RegionError::UnknownVerbosity(level.to_string())),
    }
}
