use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The wildcard token of an architecture specification.
pub const ANY: &str = "any";

/// Single-token architecture names and the triple they stand for.
///
/// Two-token names (`kfreebsd-amd64`, `hurd-i386`) are listed too so the
/// implied GNU libc is filled in for them.
static KNOWN_ARCHES: &[(&str, [&str; 3])] = &[
    ("alpha", ["gnu", "linux", "alpha"]),
    ("amd64", ["gnu", "linux", "amd64"]),
    ("arm", ["gnu", "linux", "arm"]),
    ("arm64", ["gnu", "linux", "arm64"]),
    ("armeb", ["gnu", "linux", "armeb"]),
    ("armel", ["gnu", "linux", "armel"]),
    ("armhf", ["gnu", "linux", "armhf"]),
    ("hppa", ["gnu", "linux", "hppa"]),
    ("i386", ["gnu", "linux", "i386"]),
    ("ia64", ["gnu", "linux", "ia64"]),
    ("loong64", ["gnu", "linux", "loong64"]),
    ("m68k", ["gnu", "linux", "m68k"]),
    ("mips", ["gnu", "linux", "mips"]),
    ("mips64", ["gnu", "linux", "mips64"]),
    ("mips64el", ["gnu", "linux", "mips64el"]),
    ("mipsel", ["gnu", "linux", "mipsel"]),
    ("powerpc", ["gnu", "linux", "powerpc"]),
    ("ppc64", ["gnu", "linux", "ppc64"]),
    ("powerpcspe", ["gnu", "linux", "powerpcspe"]),
    ("ppc64el", ["gnu", "linux", "ppc64el"]),
    ("riscv64", ["gnu", "linux", "riscv64"]),
    ("s390", ["gnu", "linux", "s390"]),
    ("s390x", ["gnu", "linux", "s390x"]),
    ("sh4", ["gnu", "linux", "sh4"]),
    ("sparc", ["gnu", "linux", "sparc"]),
    ("sparc64", ["gnu", "linux", "sparc64"]),
    ("x32", ["gnu", "linux", "x32"]),
    ("kfreebsd-amd64", ["gnu", "kfreebsd", "amd64"]),
    ("kfreebsd-i386", ["gnu", "kfreebsd", "i386"]),
    ("hurd-amd64", ["gnu", "hurd", "amd64"]),
    ("hurd-i386", ["gnu", "hurd", "i386"]),
];

/// An architecture specification `<libc>-<kernel>-<cpu>`.
///
/// Every component may be the wildcard `any`. Short forms are completed to
/// a full triple: a known single name such as `i386` becomes
/// `gnu-linux-i386`, `any` becomes `any-any-any`, an unknown single token is
/// taken as a CPU (`any-any-<cpu>` in a pattern, `gnu-linux-<cpu>` for a
/// concrete architecture) and a two-token form is `<kernel>-<cpu>`.
///
/// See Debian Policy §11.1, "Architecture specification strings".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchSpec {
    /// C library component (`gnu`, `musl`, `any`, ...).
    pub libc: String,
    /// Kernel component (`linux`, `kfreebsd`, `hurd`, `any`, ...).
    pub kernel: String,
    /// CPU component (`amd64`, `i386`, `any`, ...).
    pub cpu: String,
}

impl ArchSpec {
    /// Complete an architecture string into a triple.
    ///
    /// `is_pattern` selects what fills the missing slots: a pattern such as
    /// `linux-any` or `avr32` leaves them open (`any`), while a concrete
    /// architecture such as `linux-amd64` implies `gnu` and a lone unknown
    /// CPU implies `gnu-linux`.
    pub fn complete(arch: &str, is_pattern: bool) -> Result<ArchSpec> {
        let arch = arch.trim();
        if let Some((_, [libc, kernel, cpu])) = KNOWN_ARCHES.iter().find(|(name, _)| *name == arch) {
            return Ok(ArchSpec::new(*libc, *kernel, *cpu));
        }

        let tokens: Vec<&str> = arch.split('-').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::InvalidArch(arch.to_string()));
        }
        match tokens.as_slice() {
            [token] if *token == ANY => Ok(ArchSpec::new(ANY, ANY, ANY)),
            [cpu] if is_pattern => Ok(ArchSpec::new(ANY, ANY, *cpu)),
            [cpu] => Ok(ArchSpec::new("gnu", "linux", *cpu)),
            [kernel, cpu] => {
                let libc = if is_pattern { ANY } else { "gnu" };
                Ok(ArchSpec::new(libc, *kernel, *cpu))
            }
            [libc, kernel, cpu] => Ok(ArchSpec::new(*libc, *kernel, *cpu)),
            _ => Err(Error::InvalidArch(arch.to_string())),
        }
    }

    fn new(libc: &str, kernel: &str, cpu: &str) -> ArchSpec {
        ArchSpec {
            libc: libc.to_string(),
            kernel: kernel.to_string(),
            cpu: cpu.to_string(),
        }
    }

    /// Whether two specifications describe compatible architectures.
    ///
    /// Slot by slot, either side being `any` or both sides being equal is a
    /// match. The relation is symmetric.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::ArchSpec;
    ///
    /// let linux_any: ArchSpec = "linux-any".parse().unwrap();
    /// let i386: ArchSpec = "i386".parse().unwrap();
    /// let hurd: ArchSpec = "hurd-i386".parse().unwrap();
    /// assert!(linux_any.matches(&i386));
    /// assert!(!linux_any.matches(&hurd));
    /// ```
    pub fn matches(&self, other: &ArchSpec) -> bool {
        slot_matches(&self.libc, &other.libc)
            && slot_matches(&self.kernel, &other.kernel)
            && slot_matches(&self.cpu, &other.cpu)
    }

    /// Whether any component is the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.libc == ANY || self.kernel == ANY || self.cpu == ANY
    }
}

fn slot_matches(a: &str, b: &str) -> bool {
    a == ANY || b == ANY || a == b
}

impl FromStr for ArchSpec {
    type Err = Error;

    /// Parse as a pattern; see [`ArchSpec::complete`].
    fn from_str(s: &str) -> Result<Self> {
        ArchSpec::complete(s, true)
    }
}

impl fmt::Display for ArchSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}-{}", self.libc, self.kernel, self.cpu)
    }
}
