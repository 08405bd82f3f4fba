use std::fmt;
use std::path::Path;
use std::sync::Arc;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, delimited, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::clearsign::strip_clearsign;
use crate::config::Config;
use crate::depends::{Dependency, DependsOptions, VersionConstraint};
use crate::error::{Error, Result};
use crate::hash::{HashKind, HashString};
use crate::tagfile::{Section, TagFile};

/// Which build-relation field a [`BuildDep`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildDepType {
    /// `Build-Depends`.
    Depends,
    /// `Build-Depends-Indep`.
    DependsIndep,
    /// `Build-Conflicts`.
    Conflicts,
    /// `Build-Conflicts-Indep`.
    ConflictsIndep,
}

impl BuildDepType {
    /// All types in field processing order.
    pub const ALL: [BuildDepType; 4] = [
        BuildDepType::Depends,
        BuildDepType::DependsIndep,
        BuildDepType::Conflicts,
        BuildDepType::ConflictsIndep,
    ];

    /// The record field holding relations of this type.
    pub fn field_name(self) -> &'static str {
        match self {
            BuildDepType::Depends => "Build-Depends",
            BuildDepType::DependsIndep => "Build-Depends-Indep",
            BuildDepType::Conflicts => "Build-Conflicts",
            BuildDepType::ConflictsIndep => "Build-Conflicts-Indep",
        }
    }

    /// Whether the field only matters for architecture-independent builds.
    pub fn is_indep(self) -> bool {
        matches!(self, BuildDepType::DependsIndep | BuildDepType::ConflictsIndep)
    }
}

impl fmt::Display for BuildDepType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.field_name())
    }
}

/// One build relation of a source package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDep {
    /// Package name (never empty).
    pub package: String,
    /// Version constraint, if any.
    pub constraint: Option<VersionConstraint>,
    /// Whether this relation is or-ed with the following one.
    pub or_next: bool,
    /// Field the relation came from.
    pub kind: BuildDepType,
}

impl fmt::Display for BuildDep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.package)?;
        if let Some(ref c) = self.constraint {
            write!(f, " ({c})")?;
        }
        Ok(())
    }
}

/// One file of a source package, from a checksum field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name prefixed with the record's `Directory`.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Checksum from the highest-priority field present.
    pub hash: HashString,
    /// Type guessed from the file name: `dsc`, `tar`, `diff`, ...
    pub file_type: String,
}

/// A source package stanza from a `Sources` index or a `.dsc` file.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    section: Section,
    config: Arc<Config>,
}

impl SourceRecord {
    /// Wrap an already parsed stanza.
    pub fn new(section: Section, config: impl Into<Arc<Config>>) -> Self {
        SourceRecord {
            section,
            config: config.into(),
        }
    }

    /// Parse a single stanza.
    pub fn parse(text: &str, config: impl Into<Arc<Config>>) -> Result<Self> {
        Ok(SourceRecord::new(Section::parse(text)?, config))
    }

    /// Read the control stanza of a `.dsc` file, clear-signed or not.
    ///
    /// The signature is not verified.
    pub fn from_dsc_file(path: impl AsRef<Path>, config: impl Into<Arc<Config>>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let message = strip_clearsign(&text)?;
        let section = TagFile::new(message.into_owned())
            .next()
            .unwrap_or_else(|| Err(Error::InvalidSection("no stanza in file".to_string())))?;
        tracing::debug!(path = %path.display(), "read source control file");
        Ok(SourceRecord::new(section, config))
    }

    /// The underlying stanza.
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// The stanza text as read.
    pub fn as_str(&self) -> &str {
        self.section.as_str()
    }

    /// Source package name (`Package` in indices, `Source` in `.dsc` files).
    pub fn package(&self) -> Option<&str> {
        self.section
            .find("Package")
            .or_else(|| self.section.find("Source"))
    }

    /// Source version.
    pub fn version(&self) -> Option<&str> {
        self.section.find("Version")
    }

    /// Maintainer.
    pub fn maintainer(&self) -> Option<&str> {
        self.section.find("Maintainer")
    }

    /// Archive section.
    pub fn archive_section(&self) -> Option<&str> {
        self.section.find("Section")
    }

    /// Names of the binary packages built from this source.
    ///
    /// An absent or blank `Binary` field yields an empty list.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::{Config, SourceRecord};
    ///
    /// let record = SourceRecord::parse("Package: x\nBinary:  a, b ,c\n", Config::default()).unwrap();
    /// assert_eq!(record.binaries(), vec!["a", "b", "c"]);
    /// ```
    pub fn binaries(&self) -> Vec<String> {
        self.section
            .find_or_empty("Binary")
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Build relations, in field order then clause order.
    ///
    /// `arch_only` skips the `-Indep` fields. `strip_multi_arch` removes
    /// `:any`, `:native` and `:<native arch>` qualifiers. Clauses whose
    /// package name ends up empty (blank clauses, or restrictions excluding
    /// the configured architecture or profiles) are dropped. Any syntax
    /// error fails the whole call.
    pub fn build_depends(&self, arch_only: bool, strip_multi_arch: bool) -> Result<Vec<BuildDep>> {
        let opts = DependsOptions::from_config(&self.config, strip_multi_arch);
        let mut deps: Vec<BuildDep> = Vec::new();

        for kind in BuildDepType::ALL {
            if arch_only && kind.is_indep() {
                continue;
            }
            let field = kind.field_name();
            let Some(value) = self.section.find(field) else {
                continue;
            };

            let clauses = Dependency::parse_list(value, &opts).map_err(|e| Error::DependencyParse {
                field: field.to_string(),
                reason: e.to_string(),
            })?;
            let field_start = deps.len();
            for dep in clauses {
                if dep.package.is_empty() {
                    tracing::trace!(field, "dropping clause without package");
                    // a dropped last alternative closes the or-group
                    if !dep.or_next && deps.len() > field_start {
                        if let Some(prev) = deps.last_mut() {
                            prev.or_next = false;
                        }
                    }
                    continue;
                }
                deps.push(BuildDep {
                    package: dep.package,
                    constraint: dep.constraint,
                    or_next: dep.or_next,
                    kind,
                });
            }
        }

        Ok(deps)
    }

    /// Files of this source package.
    ///
    /// Only the strongest checksum field present is read (`Checksums-Sha512`,
    /// then `Checksums-Sha256`, `Checksums-Sha1`, `Files`); the others are
    /// ignored. Paths are prefixed with the `Directory` field. A record
    /// without any checksum field has no files.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::{Config, HashKind, SourceRecord};
    ///
    /// let record = SourceRecord::parse("\
    /// Package: foo
    /// Directory: pool/main/f/foo
    /// Checksums-Sha256:
    ///  0a1b2c 1234 foo_1.0.orig.tar.gz
    /// ", Config::default()).unwrap();
    /// let files = record.files().unwrap();
    /// assert_eq!(files[0].path, "pool/main/f/foo/foo_1.0.orig.tar.gz");
    /// assert_eq!(files[0].size, 1234);
    /// assert_eq!(files[0].hash.kind, HashKind::Sha256);
    /// ```
    pub fn files(&self) -> Result<Vec<SourceFile>> {
        for kind in HashKind::PRIORITY {
            let field = kind.field_name();
            let value = self.section.find_or_empty(field);
            if value.trim().is_empty() {
                continue;
            }
            tracing::debug!(field, "reading source file list");

            let mut base = self.section.find_or_empty("Directory").to_string();
            if !base.is_empty() && !base.ends_with('/') {
                base.push('/');
            }

            let mut files = Vec::new();
            let mut input = value.trim_start();
            while !input.is_empty() {
                let (hash, size, name) = file_triplet
                    .parse_next(&mut input)
                    .map_err(|_| Error::MalformedFileList(field.to_string()))?;
                let size = size
                    .parse::<u64>()
                    .map_err(|_| Error::MalformedFileList(field.to_string()))?;
                let file_type = infer_file_type(&name, &self.config);
                files.push(SourceFile {
                    path: format!("{base}{name}"),
                    size,
                    hash: HashString::new(kind, hash),
                    file_type,
                });
                input = input.trim_start();
            }
            return Ok(files);
        }

        Ok(Vec::new())
    }
}

/// Iterator over the source records of a `Sources` index.
#[derive(Debug, Clone)]
pub struct SourceRecords {
    tags: TagFile,
    config: Arc<Config>,
}

impl SourceRecords {
    /// Read records from the text of a `Sources` index.
    pub fn new(text: impl Into<String>, config: impl Into<Arc<Config>>) -> Self {
        SourceRecords {
            tags: TagFile::new(text),
            config: config.into(),
        }
    }

    /// Read a `Sources` index from disk.
    pub fn open(path: impl AsRef<Path>, config: impl Into<Arc<Config>>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(SourceRecords::new(text, config))
    }

    /// Start over from the first record.
    pub fn rewind(&mut self) {
        self.tags.rewind();
    }
}

impl Iterator for SourceRecords {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let section = self.tags.next()?;
        Some(section.map(|s| SourceRecord::new(s, Arc::clone(&self.config))))
    }
}

/// Guess a file's type from its name.
///
/// Compression suffixes and `tar` are peeled off from the right; the first
/// other suffix ends the search. A `debian.tar.*` archive (source format
/// 3.0) counts as `diff`.
///
/// Unlike apt, which scans the `Directory`-prefixed path, only the last
/// path component is inspected, so dots in directory names never leak into
/// the type.
pub(crate) fn infer_file_type(path: &str, config: &Config) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let mut suffixes: Vec<&str> = name.rsplit('.').collect();
    // what precedes the first dot is not a suffix
    suffixes.pop();

    let mut file_type = "";
    for suffix in suffixes {
        if file_type == "tar" {
            if suffix == "debian" {
                file_type = "diff";
            }
            break;
        }
        file_type = suffix;
        if !(config.is_compressor_extension(suffix) || suffix == "tar") {
            break;
        }
    }
    file_type.to_string()
}

// Winnow parsers

/// A whitespace-delimited word; `"..."` quotes may contain whitespace and
/// are removed, `[...]` groups are kept verbatim, `%xx` escapes are decoded.
fn quote_word(input: &mut &str) -> ModalResult<String> {
    multispace0.parse_next(input)?;
    let raw: String = repeat(
        1..,
        alt((
            delimited('"', take_till(0.., '"'), cut_err('"')),
            ('[', take_till(0.., ']'), cut_err(']')).take(),
            take_while(1.., |c: char| !c.is_whitespace() && c != '"' && c != '['),
        )),
    )
    .fold(String::new, |mut acc: String, part: &str| {
        acc.push_str(part);
        acc
    })
    .parse_next(input)?;
    Ok(percent_decode(&raw))
}

fn file_triplet(input: &mut &str) -> ModalResult<(String, String, String)> {
    (quote_word, quote_word, quote_word).parse_next(input)
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                out.push(hex_value(hi) << 4 | hex_value(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
