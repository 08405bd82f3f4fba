use std::sync::Arc;

use glob::Pattern;
use regex::Regex;

use crate::arch::ArchSpec;
use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::pkgcache::{DepCache, Group, Package, Version};

/// Matches package (and group) names against an extended regular expression.
///
/// The expression is compiled once and searched for anywhere in the name;
/// anchor it with `^`/`$` for whole-name matches.
#[derive(Debug, Clone)]
pub struct NameRegexMatcher {
    regex: Regex,
}

impl NameRegexMatcher {
    /// Compile `pattern`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::NameRegexMatcher;
    ///
    /// assert!(NameRegexMatcher::new("^lib.*-dev$").is_ok());
    /// assert!(NameRegexMatcher::new("lib(").is_err());
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(NameRegexMatcher { regex })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Matcher for NameRegexMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.regex.is_match(pkg.name())
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        self.regex.is_match(grp.name())
    }
}

/// Matches package (and group) names against a shell-style glob.
#[derive(Debug, Clone)]
pub struct NameFnmatchMatcher {
    pattern: Pattern,
}

impl NameFnmatchMatcher {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| Error::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(NameFnmatchMatcher { pattern })
    }

    /// The pattern as given.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Matcher for NameFnmatchMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.pattern.matches(pkg.name())
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        self.pattern.matches(grp.name())
    }
}

/// Matches one exact package (and group) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactNameMatcher {
    name: String,
}

impl ExactNameMatcher {
    /// Match packages called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        ExactNameMatcher { name: name.into() }
    }
}

impl Matcher for ExactNameMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        pkg.name() == self.name
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        grp.name() == self.name
    }
}

/// Matches architectures against an architecture specification.
///
/// Strings have the form `<libc>-<kernel>-<cpu>` where any component, or
/// the whole string, can be the wildcard `any`: `i386`, `mipsel`,
/// `musl-linux-amd64`, `linux-any`, `any-amd64`, `any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitectureMatcher {
    literal: String,
    spec: ArchSpec,
    is_pattern: bool,
}

impl ArchitectureMatcher {
    /// Build a matcher around `arch`.
    ///
    /// With `is_pattern` set, `arch` is a specification that concrete
    /// architectures are matched against. Otherwise `arch` is the concrete
    /// architecture and the strings passed to [`matches_arch`] are the
    /// patterns.
    ///
    /// [`matches_arch`]: ArchitectureMatcher::matches_arch
    pub fn new(arch: &str, is_pattern: bool) -> Result<Self> {
        let spec = ArchSpec::complete(arch, is_pattern)?;
        Ok(ArchitectureMatcher {
            literal: arch.trim().to_string(),
            spec,
            is_pattern,
        })
    }

    /// Whether `arch` is compatible with the stored specification.
    ///
    /// A string that cannot be read as a specification never matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::ArchitectureMatcher;
    ///
    /// let linux = ArchitectureMatcher::new("linux-any", true).unwrap();
    /// assert!(linux.matches_arch("amd64"));
    /// assert!(linux.matches_arch("musl-linux-arm64"));
    /// assert!(!linux.matches_arch("hurd-i386"));
    ///
    /// let host = ArchitectureMatcher::new("amd64", false).unwrap();
    /// assert!(host.matches_arch("any-amd64"));
    /// assert!(!host.matches_arch("i386"));
    /// ```
    pub fn matches_arch(&self, arch: &str) -> bool {
        if arch == self.literal {
            return true;
        }
        match ArchSpec::complete(arch, !self.is_pattern) {
            Ok(other) => self.spec.matches(&other),
            Err(_) => false,
        }
    }

    /// The completed specification.
    pub fn spec(&self) -> &ArchSpec {
        &self.spec
    }
}

impl Matcher for ArchitectureMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.matches_arch(pkg.arch())
    }
}

/// Matches packages that are marked for installation and not installed yet.
#[derive(Debug, Clone)]
pub struct NewInstallMatcher {
    depcache: Arc<DepCache>,
}

impl NewInstallMatcher {
    /// Consult `depcache` for install marks.
    pub fn new(depcache: Arc<DepCache>) -> Self {
        NewInstallMatcher { depcache }
    }
}

impl Matcher for NewInstallMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.depcache.is_marked_install(pkg) && pkg.current_version().is_none()
    }
}

/// Matches packages with an installed version.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstalledMatcher;

impl Matcher for InstalledMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        pkg.current_version().is_some()
    }
}

/// Matches packages without any version (purely virtual names).
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualMatcher;

impl Matcher for VirtualMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        pkg.versions().next().is_none()
    }
}

/// Matches version strings against a regular expression.
///
/// This is a version-level matcher: a package matches when any of its
/// versions does.
#[derive(Debug, Clone)]
pub struct VersionRegexMatcher {
    regex: Regex,
}

impl VersionRegexMatcher {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(VersionRegexMatcher { regex })
    }
}

impl Matcher for VersionRegexMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        pkg.versions().any(|v| self.matches_version(&v))
    }

    fn matches_version(&self, ver: &Version<'_>) -> bool {
        self.regex.is_match(ver.version_str())
    }
}
