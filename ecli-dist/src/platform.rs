//! The canonical mapping from host CPU to the platform tags in artifact names
//!
//! Every arch-flavored string in the pipeline (artifact name tags, the rpm arch
//! dir, the FreeBSD ABI) derives from [`Arch`][] here. No other module is allowed
//! to hardcode one.

use crate::config::BackendKind;
use crate::errors::{DistError, DistResult};

/// The FreeBSD major release our pkg ABI strings claim
pub const FREEBSD_MAJOR: u32 = 14;

/// A CPU architecture we build packages for
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Arch {
    /// x86_64/amd64
    X86_64,
    /// aarch64/arm64
    Arm64,
}

impl Arch {
    /// Get the arch of the machine we're running on
    pub fn host() -> DistResult<Arch> {
        match std::env::consts::ARCH {
            "x86_64" => Ok(Arch::X86_64),
            "aarch64" => Ok(Arch::Arm64),
            other => Err(DistError::UnsupportedHostArch {
                arch: other.to_owned(),
            }),
        }
    }

    /// The tag debian-style tooling uses (also what we put in .deb/.rpm/.pkg names)
    pub fn linux_tag(self) -> &'static str {
        match self {
            Arch::X86_64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// The arch rpmbuild bakes into its output dir and file names
    pub fn rpm_arch(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "aarch64",
        }
    }

    /// The tag we put in windows installer names
    pub fn windows_tag(self) -> &'static str {
        match self {
            Arch::X86_64 => "win_x64",
            Arch::Arm64 => "win_arm64",
        }
    }

    /// The tag we put in macOS disk image names
    pub fn macos_tag(self) -> &'static str {
        match self {
            Arch::X86_64 => "macos_x86_64",
            Arch::Arm64 => "macos_arm64",
        }
    }

    /// The ABI string FreeBSD's pkg wants in a package manifest
    pub fn freebsd_abi(self) -> String {
        let arch = match self {
            Arch::X86_64 => "amd64",
            Arch::Arm64 => "aarch64",
        };
        format!("FreeBSD:{FREEBSD_MAJOR}:{arch}")
    }
}

/// The platform tag an artifact name carries for this backend/arch pair
pub fn platform_tag(backend: BackendKind, arch: Arch) -> &'static str {
    match backend {
        BackendKind::Deb | BackendKind::Rpm | BackendKind::FreebsdPkg => arch.linux_tag(),
        BackendKind::Nsis => arch.windows_tag(),
        BackendKind::Dmg => arch.macos_tag(),
    }
}

/// The strict artifact file name: `{name}_{version}_{tag}.{ext}`
pub fn artifact_file_name(
    name: &str,
    version: &semver::Version,
    backend: BackendKind,
    arch: Arch,
) -> String {
    let tag = platform_tag(backend, arch);
    let ext = backend.ext();
    format!("{name}_{version}_{tag}.{ext}")
}
