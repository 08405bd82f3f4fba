use std::fmt;
use std::sync::Arc;

use crate::pkgcache::{Group, Package, Version};

/// A predicate over packages, groups and versions.
///
/// Implementors only have to answer for packages. The provided methods
/// project that answer onto the other two entity kinds:
///
/// - a version matches when its parent package matches;
/// - a group never matches.
///
/// Matchers that understand groups or versions natively override the
/// corresponding method. Combinators override all three so each kind is
/// evaluated by its own traversal.
pub trait Matcher: fmt::Debug + Send + Sync {
    /// Whether the package satisfies this matcher.
    fn matches_package(&self, pkg: &Package<'_>) -> bool;

    /// Whether the group satisfies this matcher.
    fn matches_group(&self, _grp: &Group<'_>) -> bool {
        false
    }

    /// Whether the version satisfies this matcher.
    fn matches_version(&self, ver: &Version<'_>) -> bool {
        self.matches_package(&ver.parent_package())
    }
}

/// A reference-counted matcher, shareable between several trees.
pub type SharedMatcher = Arc<dyn Matcher>;

/// Matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueMatcher;

impl Matcher for TrueMatcher {
    fn matches_package(&self, _pkg: &Package<'_>) -> bool {
        true
    }

    fn matches_group(&self, _grp: &Group<'_>) -> bool {
        true
    }

    fn matches_version(&self, _ver: &Version<'_>) -> bool {
        true
    }
}

/// Matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FalseMatcher;

impl Matcher for FalseMatcher {
    fn matches_package(&self, _pkg: &Package<'_>) -> bool {
        false
    }

    fn matches_group(&self, _grp: &Group<'_>) -> bool {
        false
    }

    fn matches_version(&self, _ver: &Version<'_>) -> bool {
        false
    }
}

/// Negates its child for every entity kind.
#[derive(Debug, Clone)]
pub struct NotMatcher {
    matcher: SharedMatcher,
}

impl NotMatcher {
    /// Negate `matcher`.
    pub fn new(matcher: SharedMatcher) -> Self {
        NotMatcher { matcher }
    }
}

impl Matcher for NotMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        !self.matcher.matches_package(pkg)
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        !self.matcher.matches_group(grp)
    }

    fn matches_version(&self, ver: &Version<'_>) -> bool {
        !self.matcher.matches_version(ver)
    }
}

/// Matches when every child matches; children are tried in insertion order
/// and evaluation stops at the first failure. With no children it matches
/// everything.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use deb_cachefilter::{AndMatcher, Matcher, NameRegexMatcher, PkgCache, TrueMatcher};
///
/// let mut cache = PkgCache::new();
/// let id = cache.add_package("libfoo1", "amd64");
/// let pkg = cache.package(id);
///
/// let matcher = AndMatcher::default()
///     .and(Arc::new(TrueMatcher))
///     .and(Arc::new(NameRegexMatcher::new("^lib").unwrap()));
/// assert!(matcher.matches_package(&pkg));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AndMatcher {
    matchers: Vec<SharedMatcher>,
}

impl AndMatcher {
    /// Build from an initial sequence of children.
    pub fn new(matchers: impl IntoIterator<Item = SharedMatcher>) -> Self {
        AndMatcher {
            matchers: matchers.into_iter().collect(),
        }
    }

    /// Append a child, returning the combinator for chaining.
    pub fn and(mut self, matcher: SharedMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl FromIterator<SharedMatcher> for AndMatcher {
    fn from_iter<I: IntoIterator<Item = SharedMatcher>>(iter: I) -> Self {
        AndMatcher::new(iter)
    }
}

impl Matcher for AndMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches_package(pkg))
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches_group(grp))
    }

    fn matches_version(&self, ver: &Version<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches_version(ver))
    }
}

/// Matches when any child matches; children are tried in insertion order
/// and evaluation stops at the first success. With no children it matches
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct OrMatcher {
    matchers: Vec<SharedMatcher>,
}

impl OrMatcher {
    /// Build from an initial sequence of children.
    pub fn new(matchers: impl IntoIterator<Item = SharedMatcher>) -> Self {
        OrMatcher {
            matchers: matchers.into_iter().collect(),
        }
    }

    /// Append a child, returning the combinator for chaining.
    pub fn or(mut self, matcher: SharedMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl FromIterator<SharedMatcher> for OrMatcher {
    fn from_iter<I: IntoIterator<Item = SharedMatcher>>(iter: I) -> Self {
        OrMatcher::new(iter)
    }
}

impl Matcher for OrMatcher {
    fn matches_package(&self, pkg: &Package<'_>) -> bool {
        self.matchers.iter().any(|m| m.matches_package(pkg))
    }

    fn matches_group(&self, grp: &Group<'_>) -> bool {
        self.matchers.iter().any(|m| m.matches_group(grp))
    }

    fn matches_version(&self, ver: &Version<'_>) -> bool {
        self.matchers.iter().any(|m| m.matches_version(ver))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pkgcache::PkgCache;

    /// Package-only matcher that counts its evaluations.
    #[derive(Debug, Default)]
    struct Counting {
        answer: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Counting {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Matcher for Counting {
        fn matches_package(&self, _pkg: &Package<'_>) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn cache() -> PkgCache {
        let mut cache = PkgCache::new();
        let pkg = cache.add_package("hello", "amd64");
        cache.add_version(pkg, "2.10-3");
        cache
    }

    #[test]
    fn constants() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let grp = pkg.group();
        let ver = pkg.versions().next().unwrap();
        assert!(TrueMatcher.matches_package(&pkg));
        assert!(TrueMatcher.matches_group(&grp));
        assert!(TrueMatcher.matches_version(&ver));
        assert!(!FalseMatcher.matches_package(&pkg));
        assert!(!FalseMatcher.matches_group(&grp));
        assert!(!FalseMatcher.matches_version(&ver));
    }

    #[test]
    fn package_only_projection() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let ver = pkg.versions().next().unwrap();
        let yes = Counting::new(true);
        assert!(yes.matches_version(&ver));
        assert!(!yes.matches_group(&pkg.group()));
        assert_eq!(yes.calls(), 1);
    }

    #[test]
    fn empty_combinators() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let ver = pkg.versions().next().unwrap();
        let and = AndMatcher::default();
        let or = OrMatcher::default();
        assert!(and.matches_package(&pkg));
        assert!(and.matches_group(&pkg.group()));
        assert!(and.matches_version(&ver));
        assert!(!or.matches_package(&pkg));
        assert!(!or.matches_group(&pkg.group()));
        assert!(!or.matches_version(&ver));
    }

    #[test]
    fn and_short_circuits() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let first = Counting::new(false);
        let second = Counting::new(true);
        let and = AndMatcher::new([first.clone() as SharedMatcher, second.clone()]);
        assert!(!and.matches_package(&pkg));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[test]
    fn or_short_circuits() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let first = Counting::new(true);
        let second = Counting::new(false);
        let or = OrMatcher::new([first.clone() as SharedMatcher]).or(second.clone());
        assert!(or.matches_package(&pkg));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
        assert_eq!(or.len(), 2);
    }

    #[test]
    fn double_negation() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let ver = pkg.versions().next().unwrap();
        for inner in [Arc::new(TrueMatcher) as SharedMatcher, Arc::new(FalseMatcher)] {
            let twice = NotMatcher::new(Arc::new(NotMatcher::new(inner.clone())));
            assert_eq!(twice.matches_package(&pkg), inner.matches_package(&pkg));
            assert_eq!(twice.matches_group(&pkg.group()), inner.matches_group(&pkg.group()));
            assert_eq!(twice.matches_version(&ver), inner.matches_version(&ver));
        }
    }

    #[test]
    fn not_of_package_matcher_on_group() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let not = NotMatcher::new(Counting::new(true));
        assert!(!not.matches_package(&pkg));
        assert!(not.matches_group(&pkg.group()));
    }

    #[test]
    fn shared_child_in_two_trees() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let shared = Counting::new(true);
        let and: SharedMatcher = Arc::new(AndMatcher::new([shared.clone() as SharedMatcher]));
        let or: SharedMatcher = Arc::new(OrMatcher::new([shared.clone() as SharedMatcher]));
        let both = AndMatcher::new([and, or]);
        assert!(both.matches_package(&pkg));
        assert_eq!(shared.calls(), 2);
        drop(both);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn collect_into_combinator() {
        let cache = cache();
        let pkg = cache.packages().next().unwrap();
        let or: OrMatcher = [Arc::new(FalseMatcher) as SharedMatcher, Arc::new(TrueMatcher)]
            .into_iter()
            .collect();
        assert!(or.matches_package(&pkg));
        let and: AndMatcher = std::iter::empty().collect();
        assert!(and.is_empty());
    }
}
