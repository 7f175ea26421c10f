use crate::manager::{VsControlManager, VsControlSnapshot};
use bincode::config::{Fixint, LittleEndian};
use bincode::error::{DecodeError, EncodeError};
use std::io;
use std::io::{BufReader, BufWriter, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("error saving state: {source}")]
    Serialization {
        #[from]
        source: EncodeError,
    },
    #[error("error loading state: {source}")]
    Deserialization {
        #[from]
        source: DecodeError,
    },
    #[error("I/O error writing state: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

const BINCODE_CONFIG: bincode::config::Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_little_endian().with_fixed_int_encoding();

/// Write the manager's persistent state.
///
/// # Errors
///
/// Propagates any encoding or I/O errors.
pub fn save_state<W>(manager: &VsControlManager, writer: W) -> Result<(), SaveStateError>
where
    W: io::Write,
{
    let mut writer = BufWriter::new(writer);

    bincode::encode_into_std_write(manager.snapshot(), &mut writer, BINCODE_CONFIG)?;
    writer.flush()?;

    Ok(())
}

/// Read state previously written by [`save_state`] into the manager.
///
/// The manager is left unchanged if decoding fails.
///
/// # Errors
///
/// Propagates any decoding errors.
pub fn load_state<R>(manager: &mut VsControlManager, reader: R) -> Result<(), SaveStateError>
where
    R: io::Read,
{
    let mut reader = BufReader::new(reader);

    let snapshot: VsControlSnapshot = bincode::decode_from_std_read(&mut reader, BINCODE_CONFIG)?;
    manager.restore(snapshot);

    Ok(())
}
