//! Normalizing artifacts to their strict release names and checksumming them
//!
//! Every packaging tool names its output differently (dpkg-deb derives the
//! name from control fields, pkg create writes `{name}-{version}.pkg`, ...).
//! [`normalize_artifact`][] moves whatever the tool made to the one strict
//! release path, and the checksum functions produce its sidecar.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::config::ChecksumStyle;
use crate::errors::DistResult;

/// The precomputed checksum step
#[derive(Debug, Clone)]
pub struct ChecksumStep {
    /// The digest to compute
    pub style: ChecksumStyle,
    /// The artifact to digest, at its strict release path
    pub src: Utf8PathBuf,
    /// The sidecar to write next to it
    pub dest: Utf8PathBuf,
}

/// Move a tool-native artifact to its strict release path
///
/// Rebuilds replace wholesale: exactly one artifact of a given name exists per
/// release dir, and the tool-native file is gone afterwards. The previous
/// build's sidecar goes too; it stops describing anything the moment the
/// artifact changes, and it must not survive a failed checksum step.
pub fn normalize_artifact(src: &Utf8Path, dest: &Utf8Path, sidecar: &Utf8Path) -> DistResult<()> {
    info!("renaming {src} to {dest}");
    if dest.exists() {
        axoasset::LocalAsset::remove_file(dest)?;
    }
    if sidecar.exists() {
        axoasset::LocalAsset::remove_file(sidecar)?;
    }
    axoasset::LocalAsset::copy_file_to_file(src, dest)?;
    axoasset::LocalAsset::remove_file(src)?;
    Ok(())
}

/// Digest an artifact and write its sidecar, returning the digest
pub fn generate_and_write_checksum(
    checksum: ChecksumStyle,
    src_path: &Utf8Path,
    dest_path: &Utf8Path,
) -> DistResult<String> {
    let output = generate_checksum(checksum, src_path)?;
    write_checksum(&output, dest_path)?;
    Ok(output)
}

/// Generate a checksum for the src_path and return it as a string
pub fn generate_checksum(checksum: ChecksumStyle, src_path: &Utf8Path) -> DistResult<String> {
    info!("generating {checksum:?} for {src_path}");
    use sha2::Digest;
    use std::fmt::Write;

    let file_bytes = axoasset::LocalAsset::load_bytes(src_path.as_str())?;

    let hash = match checksum {
        ChecksumStyle::Sha256 => {
            let mut hasher = sha2::Sha256::new();
            hasher.update(&file_bytes);
            hasher.finalize().as_slice().to_owned()
        }
        ChecksumStyle::Sha512 => {
            let mut hasher = sha2::Sha512::new();
            hasher.update(&file_bytes);
            hasher.finalize().as_slice().to_owned()
        }
    };
    let mut output = String::new();
    for byte in hash {
        write!(&mut output, "{:02x}", byte).unwrap();
    }
    Ok(output)
}

/// Write the checksum to dest_path
///
/// The sidecar holds the bare hex digest (plus a trailing newline), and it is
/// only ever written after the digest fully computed: a failed checksum leaves
/// no sidecar behind. Verification is a plain string compare against the
/// file's contents, trimmed.
pub fn write_checksum(checksum: &str, dest_path: &Utf8Path) -> DistResult<()> {
    let line = format!("{checksum}\n");
    axoasset::LocalAsset::write_new(&line, dest_path)?;
    Ok(())
}
