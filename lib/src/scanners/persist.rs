use std::fmt::{Display, Formatter};
use std::io::{BufWriter, Read, Write};
#[cfg(feature = "logging")]
use std::time::Instant;

use bincode::Options;
#[cfg(feature = "logging")]
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{DataFormatError, Error};

const MAGIC: &[u8; 4] = b"PIRE";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2;

/// Kinds of scanners that can be saved, as recorded in the header of the
/// saved data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ScannerKind {
    Reloc = 1,
    RelocNoMask = 2,
    Nonreloc = 3,
    NonrelocNoMask = 4,
    Simple = 5,
    Slow = 6,
    Capturing = 7,
    Counting = 8,
}

impl ScannerKind {
    fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Reloc,
            2 => Self::RelocNoMask,
            3 => Self::Nonreloc,
            4 => Self::NonrelocNoMask,
            5 => Self::Simple,
            6 => Self::Slow,
            7 => Self::Capturing,
            8 => Self::Counting,
            _ => return None,
        })
    }

    /// Name of the scanner type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reloc => "RelocScanner",
            Self::RelocNoMask => "RelocScannerNoMask",
            Self::Nonreloc => "NonrelocScanner",
            Self::NonrelocNoMask => "NonrelocScannerNoMask",
            Self::Simple => "SimpleScanner",
            Self::Slow => "SlowScanner",
            Self::Capturing => "CapturingScanner",
            Self::Counting => "CountingScanner",
        }
    }
}

impl Display for ScannerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .reject_trailing_bytes()
}

/// Scanners that can be saved as a sequence of bytes and loaded back.
///
/// The saved data starts with the `PIRE` magic, a format version and the
/// kind of scanner, so loading a scanner as a different type fails cleanly
/// instead of producing garbage.
///
/// ```
/// # use pire::{Lexer, Persist, RelocScanner, Scanner};
/// let fsm = Lexer::new("(foo|bar)+").parse().unwrap();
/// let scanner: RelocScanner = fsm.compile().unwrap();
/// let bytes = scanner.save().unwrap();
/// let loaded = RelocScanner::load(&bytes).unwrap();
/// assert!(loaded.matches("foobarfoo"));
/// ```
pub trait Persist: Serialize + DeserializeOwned {
    /// Kind written in the header.
    const KIND: ScannerKind;

    /// Checks the consistency of a freshly decoded scanner. Loaded data is
    /// untrusted, so every index must be checked before it's used.
    fn validate(&self) -> Result<(), DataFormatError>;

    /// Saves the scanner as a sequence of bytes.
    ///
    /// The scanner can be restored by passing the bytes to
    /// [`Persist::load`].
    fn save(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.save_into(&mut bytes)?;
        Ok(bytes)
    }

    /// Saves the scanner into a `writer`.
    fn save_into<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = BufWriter::new(writer);

        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION, Self::KIND as u8])?;

        bincode_options()
            .serialize_into(&mut writer, self)
            .map_err(DataFormatError::from)?;

        writer.flush()?;
        Ok(())
    }

    /// Loads a scanner from a sequence of bytes produced by
    /// [`Persist::save`].
    fn load<B: AsRef<[u8]>>(bytes: B) -> Result<Self, Error> {
        let bytes = bytes.as_ref();

        if bytes.len() < HEADER_LEN || &bytes[0..MAGIC.len()] != MAGIC {
            return Err(DataFormatError::InvalidFormat.into());
        }

        let version = bytes[MAGIC.len()];
        if version != VERSION {
            return Err(DataFormatError::UnsupportedVersion(version).into());
        }

        let kind = bytes[MAGIC.len() + 1];
        if kind != Self::KIND as u8 {
            return Err(DataFormatError::KindMismatch {
                expected: Self::KIND.name(),
                found: ScannerKind::from_u8(kind)
                    .map(|kind| kind.name().to_string())
                    .unwrap_or_else(|| format!("unknown kind {}", kind)),
            }
            .into());
        }

        #[cfg(feature = "logging")]
        let start = Instant::now();

        let scanner = bincode_options()
            .deserialize::<Self>(&bytes[HEADER_LEN..])
            .map_err(DataFormatError::from)?;

        scanner.validate()?;

        #[cfg(feature = "logging")]
        info!("Deserialization time: {:?}", Instant::elapsed(&start));

        Ok(scanner)
    }

    /// Loads a scanner from a `reader`.
    fn load_from<R: Read>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes)?;
        Self::load(bytes)
    }
}
