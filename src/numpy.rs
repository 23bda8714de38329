//! Read and write matrices as Numpy arrays
//!
//! Dense `(n, m)` arrays of `f64` go to uncompressed `.npy` files, version
//! 1.0, little-endian, C order. Sparse matrices ride along as `(nnz, 3)`
//! arrays of `(row, col, weight)` triplets; their shape is implied by the
//! label lists stored next to them.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray as nd;
use ndarray::prelude::*;
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str;

use crate::errors::{Error, Result};
use crate::sparse::SparseMatrix;

const MAGIC: &[u8; 8] = b"\x93NUMPY\x01\x00";

/// Write an array as a numpy array
pub fn write_matrix<S, P>(path: P, arr: &ArrayBase<S, Ix2>) -> Result<()>
    where S: nd::Data<Elem=f64>, P: AsRef<Path> {
    let header_nospace = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({},{})}}",
        arr.shape()[0], arr.shape()[1]);
    let virtual_len =
        // Counting every byte before the data, so the data can be aligned
        header_nospace.len()
        + 6 // The magic string
        + 2 // The version number
        + 2 // An unsigned 2-byte integer for header length
        + 1 ; // Because there will be a \n added
    let padding_needed = (((virtual_len + 15) / 16) * 16) - virtual_len; // to get to the next 16

    // Numpy version 1.0
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    writer.write_u16::<LittleEndian>((header_nospace.len()
        + padding_needed
        + 1) // newline
        // Magic string, version number and 2 bytes for the header length number not included.
        as u16
        )?;
    write!(writer, "{}{}\n", header_nospace, " ".repeat(padding_needed))?;
    // Element-wise writes follow the logical order, so any layout works
    for &value in arr.iter() {
        writer.write_f64::<LittleEndian>(value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a Numpy matrix into memory. Be careful if it's large. You could run out of memory.
///
/// Only the format [`write_matrix`] produces is accepted: 2D little-endian
/// `f64` in C order.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let dict_match =
        Regex::new(r"^\{'descr': ?'<f8', ?'fortran_order': ?False, ?'shape': ?\((\d+), ?(\d+)\)\} *\n$")
            .unwrap();
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(header_complaint(path.as_ref(), &magic));
    }
    let header_len = reader.read_u16::<LittleEndian>()? as usize;
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let (rows, cols) = match dict_match.captures(&header) {
        Some(captures) => (parse_dim(&captures[1])?, parse_dim(&captures[2])?),
        None => return Err(header_complaint(path.as_ref(), &header)),
    };
    let len = rows.checked_mul(cols).ok_or_else(|| {
        Error::InvalidDimensions(format!(
            "a {}x{} array does not fit in memory",
            rows, cols
        ))
    })?;
    let mut data = vec![0f64; len];
    reader.read_f64_into::<LittleEndian>(&mut data)?;
    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(Error::InvalidDimensions(format!(
            "the numpy file {} holds more than the {}x{} values its header promises",
            path.as_ref().display(),
            rows,
            cols
        )));
    }
    Ok(Array2::from_shape_vec([rows, cols], data)?)
}

fn parse_dim(digits: &[u8]) -> Result<usize> {
    let text = str::from_utf8(digits)
        .map_err(|_| Error::MalformedRecord("non-ascii shape in numpy header".to_string()))?;
    text.parse::<usize>().map_err(|_| {
        Error::MalformedRecord(format!("numpy shape dimension {} is out of range", text))
    })
}

/// Tell the user more info about the file
///
/// It seems verbose but you can see this error often so it saves you time.
fn header_complaint(path: &Path, header: &[u8]) -> Error {
    let cap = ::std::cmp::min(header.len(), 100);
    let complaint = format!(
        "Expected {} to be an uncompressed numpy (.npy) file, but couldn't \
        parse the header. The first bytes look like:

        {}


        As bytes, the header is as follows:

        {:?}


        It should look something like this example, where . are non-printable characters: \
        .NUMPY..{{'descr': '<f8', 'fortran_order': False, 'shape': (34, 27)}}\
        Note: Iredell only supports 2D little-endian 64-bit float matrices in C order (for \
        simplicity). You may need to change the dtype accordingly.",
        path.display(),
        String::from_utf8_lossy(&header[..cap]),
        &header[..cap]);
    Error::Other(complaint)
}

/// Persist a sparse matrix as an `(nnz, 3)` triplet array
///
/// Explicit zeros are stored like any other cell, so the stored pattern
/// survives the trip.
pub fn save_sparse<P: AsRef<Path>>(path: P, matrix: &SparseMatrix) -> Result<()> {
    let mut triplets = Array2::zeros((matrix.nnz(), 3));
    for (k, (row, col, weight)) in matrix.iter().enumerate() {
        triplets[[k, 0]] = row as f64;
        triplets[[k, 1]] = col as f64;
        triplets[[k, 2]] = weight;
    }
    write_matrix(path, &triplets)
}

/// Load a sparse matrix persisted by [`save_sparse`]
///
/// The triplet file does not carry the matrix shape; it comes from the
/// label lists saved alongside.
pub fn load_sparse<P: AsRef<Path>>(path: P, rows: usize, cols: usize) -> Result<SparseMatrix> {
    let triplets = read_matrix(path)?;
    if triplets.ncols() != 3 {
        return Err(Error::InvalidDimensions(format!(
            "expected an (n, 3) triplet array, found {}x{}",
            triplets.nrows(),
            triplets.ncols()
        )));
    }
    let mut cells = Vec::with_capacity(triplets.nrows());
    for triplet in triplets.rows() {
        cells.push((triplet[0] as usize, triplet[1] as usize, triplet[2]));
    }
    SparseMatrix::from_triplets(rows, cols, cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("iredell-npy-{}-{}", std::process::id(), name))
    }

    #[test]
    fn dense_matrices_round_trip() {
        let path = scratch("dense");
        let arr = ndarray::arr2(&[[1.0, 2.5, -3.0], [0.0, 1e-9, 4.0e12]]);
        write_matrix(&path, &arr).unwrap();
        let back = read_matrix(&path).unwrap();
        assert_eq!(back, arr);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn sparse_matrices_round_trip_with_their_zeros() {
        let path = scratch("sparse");
        let matrix = SparseMatrix::from_triplets(
            3,
            4,
            vec![(0, 1, 2.0), (2, 3, 0.5), (1, 0, 0.0)],
        )
        .unwrap();
        save_sparse(&path, &matrix).unwrap();
        let back = load_sparse(&path, 3, 4).unwrap();
        assert_eq!(back, matrix);
        assert_eq!(back.get(1, 0), Some(0.0));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn empty_matrices_round_trip() {
        let path = scratch("empty");
        let matrix = SparseMatrix::empty(2, 2);
        save_sparse(&path, &matrix).unwrap();
        let back = load_sparse(&path, 2, 2).unwrap();
        assert_eq!(back.nnz(), 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn garbage_files_are_refused() {
        let path = scratch("garbage");
        std::fs::write(&path, b"not numpy at all").unwrap();
        assert!(read_matrix(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncated_files_are_refused() {
        let path = scratch("truncated");
        let arr = ndarray::arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        write_matrix(&path, &arr).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(read_matrix(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
