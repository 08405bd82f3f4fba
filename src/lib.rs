//! Package filters and source record extraction for Debian package caches.
//!
//! Two halves share this crate:
//!
//! - **Matchers** ([`Matcher`]) are composable predicates over packages,
//!   package groups and versions: boolean combinators, name regexes and
//!   globs, architecture specifications such as `linux-any`, and the
//!   "marked for new install" state. [`parse_pattern`] builds a matcher tree
//!   from a query like `?installed ?name(^lib)` or `~i !~v`.
//! - **Source records** ([`SourceRecord`]) wrap one stanza of a `Sources`
//!   index or a `.dsc` file and extract its binary package names, build
//!   relations and file list.
//!
//! # Examples
//!
//! Filter a package cache:
//!
//! ```
//! use deb_cachefilter::{parse_query, CacheFile, DepCache, Matcher, PkgCache};
//!
//! let mut cache = PkgCache::new();
//! let dev = cache.add_package("libssl-dev", "amd64");
//! cache.add_version(dev, "3.0.11-1");
//! let apt = cache.add_package("apt", "arm64");
//! cache.add_version(apt, "2.6.1");
//! let file = CacheFile::new(cache, DepCache::new());
//!
//! let matcher = parse_query("~n^lib ?architecture(any-amd64)", &file).unwrap();
//! let names: Vec<_> = file
//!     .cache()
//!     .packages()
//!     .filter(|p| matcher.matches_package(p))
//!     .map(|p| p.full_name())
//!     .collect();
//! assert_eq!(names, vec!["libssl-dev:amd64"]);
//! ```
//!
//! Read a source record:
//!
//! ```
//! use deb_cachefilter::{BuildDepType, Config, SourceRecord};
//!
//! let input = "\
//! Package: hello
//! Binary: hello
//! Build-Depends: debhelper-compat (= 13), libfoo-dev [!hurd-any]
//! Build-Depends-Indep: texinfo
//! ";
//! let record = SourceRecord::parse(input, Config::default().with_native_arch("amd64")).unwrap();
//! assert_eq!(record.binaries(), vec!["hello"]);
//!
//! let deps = record.build_depends(true, false).unwrap();
//! assert_eq!(deps.len(), 2);
//! assert!(deps.iter().all(|d| d.kind == BuildDepType::Depends));
//! ```

mod arch;
mod clearsign;
mod config;
mod depends;
mod error;
mod filter;
mod hash;
mod matcher;
mod pattern;
mod pkgcache;
mod srcrecords;
mod tagfile;

// Re-export public types
pub use arch::ArchSpec;
pub use clearsign::{is_clearsigned, strip_clearsign};
pub use config::{Config, DEFAULT_COMPRESSOR_EXTENSIONS};
pub use depends::{Dependency, DependsOptions, VersionConstraint, VersionOp};
pub use error::{Error, Result};
pub use filter::{
    ArchitectureMatcher, ExactNameMatcher, InstalledMatcher, NameFnmatchMatcher,
    NameRegexMatcher, NewInstallMatcher, VersionRegexMatcher, VirtualMatcher,
};
pub use hash::{HashKind, HashString};
pub use matcher::{AndMatcher, FalseMatcher, Matcher, NotMatcher, OrMatcher, SharedMatcher, TrueMatcher};
pub use pattern::{parse_pattern, parse_query, PatternNode};
pub use pkgcache::{CacheFile, DepCache, Group, Package, PackageId, PkgCache, Version, VersionId};
pub use srcrecords::{BuildDep, BuildDepType, SourceFile, SourceRecord, SourceRecords};
pub use tagfile::{Section, TagFile};
