//! In-memory package cache and resolution state.
//!
//! Matchers only need to ask a handful of questions about the entities they
//! are evaluated against: names, architectures, the owning package of a
//! version, the installed version. [`PkgCache`] answers those for a set of
//! packages built up programmatically; [`Package`], [`Group`] and
//! [`Version`] are cheap borrowed handles into it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Index of a package inside a [`PkgCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(usize);

/// Index of a version inside a [`PkgCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(usize);

#[derive(Debug, Clone)]
struct GroupData {
    name: String,
    packages: Vec<usize>,
}

#[derive(Debug, Clone)]
struct PackageData {
    group: usize,
    arch: String,
    versions: Vec<usize>,
    current: Option<usize>,
}

#[derive(Debug, Clone)]
struct VersionData {
    package: usize,
    version: String,
    arch: String,
}

/// A set of packages grouped by name, each with its known versions.
#[derive(Debug, Clone, Default)]
pub struct PkgCache {
    groups: Vec<GroupData>,
    packages: Vec<PackageData>,
    versions: Vec<VersionData>,
    group_index: HashMap<String, usize>,
}

impl PkgCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the package `name:arch`, creating its group if needed.
    ///
    /// Adding the same name and architecture twice returns the existing id.
    pub fn add_package(&mut self, name: &str, arch: &str) -> PackageId {
        let group = match self.group_index.get(name) {
            Some(&g) => g,
            None => {
                self.groups.push(GroupData {
                    name: name.to_string(),
                    packages: Vec::new(),
                });
                let g = self.groups.len() - 1;
                self.group_index.insert(name.to_string(), g);
                g
            }
        };

        if let Some(&existing) = self.groups[group]
            .packages
            .iter()
            .find(|&&p| self.packages[p].arch == arch)
        {
            return PackageId(existing);
        }

        self.packages.push(PackageData {
            group,
            arch: arch.to_string(),
            versions: Vec::new(),
            current: None,
        });
        let id = self.packages.len() - 1;
        self.groups[group].packages.push(id);
        PackageId(id)
    }

    /// Add a version string to a package.
    pub fn add_version(&mut self, pkg: PackageId, version: &str) -> VersionId {
        let arch = self.packages[pkg.0].arch.clone();
        self.versions.push(VersionData {
            package: pkg.0,
            version: version.to_string(),
            arch,
        });
        let id = self.versions.len() - 1;
        self.packages[pkg.0].versions.push(id);
        VersionId(id)
    }

    /// Record `ver` as the installed version of its package.
    pub fn set_current_version(&mut self, ver: VersionId) {
        let pkg = self.versions[ver.0].package;
        self.packages[pkg].current = Some(ver.0);
    }

    /// Look up a package handle by id.
    pub fn package(&self, id: PackageId) -> Package<'_> {
        Package {
            cache: self,
            id: id.0,
        }
    }

    /// Look up a version handle by id.
    pub fn version(&self, id: VersionId) -> Version<'_> {
        Version {
            cache: self,
            id: id.0,
        }
    }

    /// Find `name:arch`.
    pub fn find_package(&self, name: &str, arch: &str) -> Option<Package<'_>> {
        self.find_group(name)?.find_package(arch)
    }

    /// Find the group of all packages called `name`.
    pub fn find_group(&self, name: &str) -> Option<Group<'_>> {
        self.group_index.get(name).map(|&id| Group { cache: self, id })
    }

    /// All packages, in insertion order.
    pub fn packages(&self) -> impl Iterator<Item = Package<'_>> + '_ {
        (0..self.packages.len()).map(move |id| Package { cache: self, id })
    }

    /// All groups, in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = Group<'_>> + '_ {
        (0..self.groups.len()).map(move |id| Group { cache: self, id })
    }
}

/// All packages sharing a name, across architectures.
#[derive(Clone, Copy)]
pub struct Group<'c> {
    cache: &'c PkgCache,
    id: usize,
}

impl<'c> Group<'c> {
    /// Group (and package) name.
    pub fn name(&self) -> &'c str {
        &self.cache.groups[self.id].name
    }

    /// Packages of this group.
    pub fn packages(&self) -> impl Iterator<Item = Package<'c>> + 'c {
        let cache = self.cache;
        cache.groups[self.id]
            .packages
            .iter()
            .map(move |&id| Package { cache, id })
    }

    /// The member built for `arch`.
    pub fn find_package(&self, arch: &str) -> Option<Package<'c>> {
        self.packages().find(|p| p.arch() == arch)
    }
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Group").field(&self.name()).finish()
    }
}

/// A package: one name built for one architecture.
#[derive(Clone, Copy)]
pub struct Package<'c> {
    cache: &'c PkgCache,
    id: usize,
}

impl<'c> Package<'c> {
    /// Handle id, stable for the lifetime of the cache.
    pub fn id(&self) -> PackageId {
        PackageId(self.id)
    }

    /// Package name.
    pub fn name(&self) -> &'c str {
        self.group().name()
    }

    /// Architecture the package is built for.
    pub fn arch(&self) -> &'c str {
        &self.cache.packages[self.id].arch
    }

    /// `name:arch`.
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.name(), self.arch())
    }

    /// The group this package belongs to.
    pub fn group(&self) -> Group<'c> {
        Group {
            cache: self.cache,
            id: self.cache.packages[self.id].group,
        }
    }

    /// Known versions, in insertion order.
    pub fn versions(&self) -> impl Iterator<Item = Version<'c>> + 'c {
        let cache = self.cache;
        cache.packages[self.id]
            .versions
            .iter()
            .map(move |&id| Version { cache, id })
    }

    /// The installed version, if any.
    pub fn current_version(&self) -> Option<Version<'c>> {
        self.cache.packages[self.id].current.map(|id| Version {
            cache: self.cache,
            id,
        })
    }
}

impl fmt::Debug for Package<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Package").field(&self.full_name()).finish()
    }
}

/// One version of a package.
#[derive(Clone, Copy)]
pub struct Version<'c> {
    cache: &'c PkgCache,
    id: usize,
}

impl<'c> Version<'c> {
    /// Handle id, stable for the lifetime of the cache.
    pub fn id(&self) -> VersionId {
        VersionId(self.id)
    }

    /// Version string.
    pub fn version_str(&self) -> &'c str {
        &self.cache.versions[self.id].version
    }

    /// Architecture of this version.
    pub fn arch(&self) -> &'c str {
        &self.cache.versions[self.id].arch
    }

    /// The package owning this version.
    pub fn parent_package(&self) -> Package<'c> {
        Package {
            cache: self.cache,
            id: self.cache.versions[self.id].package,
        }
    }
}

impl fmt::Debug for Version<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Version")
            .field(&self.parent_package().full_name())
            .field(&self.version_str())
            .finish()
    }
}

/// Resolution state: which packages are marked for installation.
#[derive(Debug, Clone, Default)]
pub struct DepCache {
    install: HashSet<PackageId>,
}

impl DepCache {
    /// Create a state with nothing marked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a package for installation.
    pub fn mark_install(&mut self, pkg: PackageId) {
        self.install.insert(pkg);
    }

    /// Drop an install mark.
    pub fn mark_keep(&mut self, pkg: PackageId) {
        self.install.remove(&pkg);
    }

    /// Whether the package is marked for installation.
    pub fn is_marked_install(&self, pkg: &Package<'_>) -> bool {
        self.install.contains(&pkg.id())
    }
}

/// A package cache together with its resolution state.
#[derive(Debug, Clone, Default)]
pub struct CacheFile {
    cache: Arc<PkgCache>,
    depcache: Arc<DepCache>,
}

impl CacheFile {
    /// Bundle a cache and its resolution state.
    pub fn new(cache: PkgCache, depcache: DepCache) -> Self {
        CacheFile {
            cache: Arc::new(cache),
            depcache: Arc::new(depcache),
        }
    }

    /// The package cache.
    pub fn cache(&self) -> &PkgCache {
        &self.cache
    }

    /// The resolution state.
    pub fn depcache(&self) -> &Arc<DepCache> {
        &self.depcache
    }
}
