//! Reading recordings from column files.
//!
//! A column file is little-endian throughout:
//! * description: `i32` byte length, then UTF-8 bytes
//! * `i32` number of columns, including the time base
//! * `i32` number of samples per column
//! * for each column: name (as the description), then the samples as `f64`
//!
//! Column 0 is the time base, in seconds.
use crate::error::LoadError;
use costim_common::Real;
use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufReader, Error, ErrorKind, Read, Write},
    mem::size_of,
    path::Path,
};

/// A loaded recording.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TraceData {
    pub description: String,
    /// Sample times in seconds.
    pub times: Vec<Real>,
    /// Every column but the time base.
    pub columns: Vec<Vec<Real>>,
    /// Names of `columns`.
    pub names: Vec<String>,
}

impl TraceData {
    /// Seconds between the first two samples.
    pub fn sample_period(&self) -> Option<Real> {
        match self.times.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }

    /// Number of distinct column names, i.e. the number of interleaved
    /// channels recorded per run.
    pub fn unique_column_names(&self) -> usize {
        self.names.iter().collect::<BTreeSet<_>>().len()
    }

    pub fn read<R: Read>(reader: &mut R, path: &Path) -> Result<Self, LoadError> {
        let header_error = |e: Error| LoadError::Header {
            path: path.to_owned(),
            reason: e.to_string(),
        };
        let mut total_bytes = usize::default();

        let description = load_string(reader, &mut total_bytes).map_err(header_error)?;
        let number_of_columns = load_count(reader, &mut total_bytes).map_err(header_error)?;
        let number_of_samples = load_count(reader, &mut total_bytes).map_err(header_error)?;

        let mut columns = Vec::with_capacity(number_of_columns);
        let mut names = Vec::with_capacity(number_of_columns);
        for column in 0..number_of_columns {
            names.push(load_string(reader, &mut total_bytes).map_err(header_error)?);
            columns.push(load_f64_column(reader, number_of_samples, column, path, &mut total_bytes)?);
        }

        if columns.is_empty() {
            return Err(LoadError::MissingTimeBase {
                path: path.to_owned(),
            });
        }
        let times = columns.remove(0);
        names.remove(0);

        Ok(Self {
            description,
            times,
            columns,
            names,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, time_name: &str) -> Result<(), Error> {
        save_string(writer, &self.description)?;
        save_count(writer, self.columns.len() + 1)?;
        save_count(writer, self.times.len())?;
        for (name, column) in std::iter::once((time_name, &self.times))
            .chain(self.names.iter().map(String::as_str).zip(&self.columns))
        {
            save_string(writer, name)?;
            for value in column {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }
}

/// Somewhere recordings can be loaded from.
pub trait TraceSource: Sync {
    fn load(&self, path: &Path) -> Result<TraceData, LoadError>;
}

/// Loads recordings from column files on disk.
#[derive(Default, Debug, Clone, Copy)]
pub struct ColumnFileSource;

impl TraceSource for ColumnFileSource {
    fn load(&self, path: &Path) -> Result<TraceData, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        TraceData::read(&mut BufReader::new(file), path)
    }
}

fn load_scalar<R: Read, const B: usize>(
    reader: &mut R,
    total_bytes: &mut usize,
) -> Result<[u8; B], Error> {
    let mut bytes = [0; B];
    reader.read_exact(&mut bytes)?;
    *total_bytes += B;
    Ok(bytes)
}

pub(crate) fn load_i32<R: Read>(reader: &mut R, total_bytes: &mut usize) -> Result<i32, Error> {
    Ok(i32::from_le_bytes(load_scalar::<_, 4>(reader, total_bytes)?))
}

fn load_count<R: Read>(reader: &mut R, total_bytes: &mut usize) -> Result<usize, Error> {
    let count = load_i32(reader, total_bytes)?;
    usize::try_from(count).map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Expected a non-negative count, got {count}."),
        )
    })
}

pub(crate) fn load_string<R: Read>(
    reader: &mut R,
    total_bytes: &mut usize,
) -> Result<String, Error> {
    let size = load_count(reader, total_bytes)?;
    let mut string_bytes = vec![0; size];
    reader.read_exact(&mut string_bytes)?;
    *total_bytes += size;
    String::from_utf8(string_bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

fn load_f64_column<R: Read>(
    reader: &mut R,
    size: usize,
    column: usize,
    path: &Path,
    total_bytes: &mut usize,
) -> Result<Vec<Real>, LoadError> {
    let expected = size_of::<f64>() * size;
    let mut column_bytes = Vec::with_capacity(expected);
    reader
        .take(expected as u64)
        .read_to_end(&mut column_bytes)
        .map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
    *total_bytes += column_bytes.len();

    if column_bytes.len() != expected {
        return Err(LoadError::Truncated {
            path: path.to_owned(),
            column,
            expected,
            found: column_bytes.len(),
        });
    }
    Ok(column_bytes
        .chunks_exact(size_of::<f64>())
        .filter_map(|chunk| chunk.try_into().ok().map(f64::from_le_bytes))
        .collect())
}

fn save_count<W: Write>(writer: &mut W, count: usize) -> Result<(), Error> {
    let count = i32::try_from(count).map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
    writer.write_all(&count.to_le_bytes())
}

fn save_string<W: Write>(writer: &mut W, string: &str) -> Result<(), Error> {
    save_count(writer, string.len())?;
    writer.write_all(string.as_bytes())
}
