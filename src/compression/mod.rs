// src/compression/mod.rs
//! Codec detection for source tarballs
//!
//! GNU mirrors publish m4 as `.tar.gz`, `.tar.xz` and `.tar.bz2`; the recipe
//! fetches the gzip release. Gzip, xz and plain tar unpack in-process. Formats
//! we recognise but cannot decode are reported instead of being fed to `tar`
//! as garbage.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("{path}: {format} archives are not supported (use the .tar.gz or .tar.xz release)")]
    Unsupported { path: PathBuf, format: &'static str },

    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Decoders available to the kitchen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Plain,
    Gzip,
    Xz,
}

impl Codec {
    pub fn name(self) -> &'static str {
        match self {
            Codec::Plain => "tar",
            Codec::Gzip => "gzip",
            Codec::Xz => "xz",
        }
    }

    /// Wrap `reader` in this codec's decoder
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Codec::Plain => Box::new(reader),
            Codec::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Codec::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a file name or leading bytes identify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detected {
    Known(Codec),
    Unsupported(&'static str),
}

struct Signature {
    suffixes: &'static [&'static str],
    magic: &'static [u8],
    detected: Detected,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        suffixes: &[".tar.gz", ".tgz", ".gz"],
        magic: &[0x1f, 0x8b],
        detected: Detected::Known(Codec::Gzip),
    },
    Signature {
        suffixes: &[".tar.xz", ".txz", ".xz"],
        magic: &[0xfd, b'7', b'z', b'X', b'Z', 0x00],
        detected: Detected::Known(Codec::Xz),
    },
    Signature {
        suffixes: &[".tar.bz2", ".tbz2", ".bz2"],
        magic: b"BZh",
        detected: Detected::Unsupported("bzip2"),
    },
    Signature {
        suffixes: &[".tar.zst", ".zst"],
        magic: &[0x28, 0xb5, 0x2f, 0xfd],
        detected: Detected::Unsupported("zstd"),
    },
    Signature {
        suffixes: &[".tar.lz", ".lz"],
        magic: b"LZIP",
        detected: Detected::Unsupported("lzip"),
    },
];

/// Longest magic number in the table
const SNIFF_LEN: usize = 6;

/// Identify a codec by file name, or `None` if the name carries no hint
pub fn detect_by_name(name: &str) -> Option<Detected> {
    SIGNATURES
        .iter()
        .find(|sig| sig.suffixes.iter().any(|s| name.ends_with(s)))
        .map(|sig| sig.detected)
}

/// Identify a codec from the first bytes of a file; unknown bytes are plain tar
pub fn detect_by_magic(head: &[u8]) -> Detected {
    SIGNATURES
        .iter()
        .find(|sig| head.starts_with(sig.magic))
        .map(|sig| sig.detected)
        .unwrap_or(Detected::Known(Codec::Plain))
}

/// Open `path` and return its decoded contents
///
/// The file name decides when it has a known suffix; cached downloads
/// named by hash fall back to sniffing.
pub fn open_decoded(path: &Path) -> Result<(Codec, Box<dyn Read>), CompressionError> {
    let io_err = |source: io::Error| CompressionError::Io {
        path: path.to_path_buf(),
        source,
    };

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let detected = match detect_by_name(name) {
        Some(detected) => detected,
        None => {
            let mut head = Vec::with_capacity(SNIFF_LEN);
            File::open(path)
                .map_err(io_err)?
                .take(SNIFF_LEN as u64)
                .read_to_end(&mut head)
                .map_err(io_err)?;
            detect_by_magic(&head)
        }
    };

    match detected {
        Detected::Known(codec) => {
            let file = File::open(path).map_err(io_err)?;
            Ok((codec, codec.decoder(file)))
        }
        Detected::Unsupported(format) => Err(CompressionError::Unsupported {
            path: path.to_path_buf(),
            format,
        }),
    }
}
