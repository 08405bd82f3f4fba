use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, eof, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{rest, take_while};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::ArchitectureMatcher;

/// Version comparison operator of a dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionOp {
    /// `<<` strictly earlier.
    Less,
    /// `<=` earlier or equal (also the legacy `<`).
    LessEq,
    /// `=` exactly equal.
    Equal,
    /// `>=` later or equal (also the legacy `>`).
    GreaterEq,
    /// `>>` strictly later.
    Greater,
    /// `!=` anything but.
    NotEqual,
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            VersionOp::Less => "<<",
            VersionOp::LessEq => "<=",
            VersionOp::Equal => "=",
            VersionOp::GreaterEq => ">=",
            VersionOp::Greater => ">>",
            VersionOp::NotEqual => "!=",
        })
    }
}

/// `(op version)` part of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Comparison operator.
    pub op: VersionOp,
    /// Version to compare against.
    pub version: String,
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.op, self.version)
    }
}

/// One clause of a dependency field.
///
/// An empty `package` means the clause does not apply: it was empty in the
/// field, or its architecture or build-profile restrictions exclude the
/// current configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Package name, including any multi-arch qualifier that was kept.
    pub package: String,
    /// Version constraint, if any.
    pub constraint: Option<VersionConstraint>,
    /// Whether this clause is or-ed with the following one (`a | b`).
    pub or_next: bool,
}

/// Settings for evaluating dependency clauses.
#[derive(Debug, Clone, Copy)]
pub struct DependsOptions<'a> {
    /// Architecture that `[arch]` restrictions are evaluated against.
    pub native_arch: &'a str,
    /// Active build profiles for `<profile>` restrictions.
    pub build_profiles: &'a [String],
    /// Drop `:any`, `:native` and `:<native arch>` qualifiers.
    pub strip_multi_arch: bool,
}

impl<'a> DependsOptions<'a> {
    /// Options taken from `config`.
    pub fn from_config(config: &'a Config, strip_multi_arch: bool) -> Self {
        DependsOptions {
            native_arch: &config.native_arch,
            build_profiles: &config.build_profiles,
            strip_multi_arch,
        }
    }
}

impl Dependency {
    /// Parse the first clause of `input`.
    ///
    /// Returns the clause and the text after its `,` or `|` separator.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::{Dependency, DependsOptions, VersionOp};
    ///
    /// let opts = DependsOptions {
    ///     native_arch: "amd64",
    ///     build_profiles: &[],
    ///     strip_multi_arch: true,
    /// };
    /// let (dep, rest) = Dependency::parse_clause("debhelper-compat (= 13), libc6-dev", &opts).unwrap();
    /// assert_eq!(dep.package, "debhelper-compat");
    /// assert_eq!(dep.constraint.unwrap().op, VersionOp::Equal);
    /// assert_eq!(rest, " libc6-dev");
    /// ```
    pub fn parse_clause<'s>(input: &'s str, opts: &DependsOptions<'_>) -> Result<(Dependency, &'s str)> {
        let (raw, remaining) = (raw_clause, rest)
            .parse(input)
            .map_err(|e| Error::InvalidDependency(format!("{e}")))?;
        Ok((raw.resolve(opts)?, remaining))
    }

    /// Parse every clause of a dependency field, in order.
    ///
    /// Clauses with an empty package name are kept; callers decide whether
    /// to drop them.
    pub fn parse_list(input: &str, opts: &DependsOptions<'_>) -> Result<Vec<Dependency>> {
        let mut deps = Vec::new();
        let mut remaining = input;
        loop {
            let (dep, next) = Dependency::parse_clause(remaining, opts)?;
            deps.push(dep);
            if next.is_empty() {
                break;
            }
            remaining = next;
        }
        Ok(deps)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.package)?;
        if let Some(ref c) = self.constraint {
            write!(f, " ({c})")?;
        }
        Ok(())
    }
}

/// A clause as written, before restrictions are evaluated.
#[derive(Debug)]
struct RawClause<'s> {
    name: &'s str,
    qualifier: Option<&'s str>,
    constraint: Option<VersionConstraint>,
    arches: Option<Vec<(bool, &'s str)>>,
    profiles: Vec<Vec<(bool, &'s str)>>,
    or_next: bool,
}

impl RawClause<'_> {
    fn resolve(self, opts: &DependsOptions<'_>) -> Result<Dependency> {
        let mut package = match self.qualifier {
            Some(q) if opts.strip_multi_arch && matches!(q, "any" | "native") => self.name.to_string(),
            Some(q) if opts.strip_multi_arch && q == opts.native_arch => self.name.to_string(),
            Some(q) => format!("{}:{}", self.name, q),
            None => self.name.to_string(),
        };

        if let Some(ref arches) = self.arches {
            if !arch_list_allows(arches, opts.native_arch)? {
                package.clear();
            }
        }
        if !self.profiles.is_empty() && !profiles_allow(&self.profiles, opts.build_profiles) {
            package.clear();
        }

        Ok(Dependency {
            package,
            constraint: self.constraint,
            or_next: self.or_next,
        })
    }
}

/// `[a b]` allows the listed architectures, `[!a !b]` all others.
fn arch_list_allows(arches: &[(bool, &str)], native_arch: &str) -> Result<bool> {
    let mut found = false;
    let mut negated = false;
    for (neg, arch) in arches {
        if *neg {
            negated = true;
        }
        if ArchitectureMatcher::new(arch, true)?.matches_arch(native_arch) {
            found = true;
        }
    }
    Ok(found != negated)
}

/// `<a !b> <c>` holds when any group has all its terms satisfied.
fn profiles_allow(formula: &[Vec<(bool, &str)>], active: &[String]) -> bool {
    formula.iter().any(|group| {
        group
            .iter()
            .all(|(neg, profile)| active.iter().any(|a| a == profile) != *neg)
    })
}

// Winnow parsers

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '|' | '[' | ']' | '<' | '>' | ':' | '!')
}

fn version_op(input: &mut &str) -> ModalResult<VersionOp> {
    alt((
        "<<".value(VersionOp::Less),
        "<=".value(VersionOp::LessEq),
        ">>".value(VersionOp::Greater),
        ">=".value(VersionOp::GreaterEq),
        "!=".value(VersionOp::NotEqual),
        "=".value(VersionOp::Equal),
        "<".value(VersionOp::LessEq),
        ">".value(VersionOp::GreaterEq),
    ))
    .parse_next(input)
}

/// `( op version )`; a missing operator means `=`.
fn version_constraint(input: &mut &str) -> ModalResult<VersionConstraint> {
    '('.parse_next(input)?;
    cut_err(|input: &mut &str| -> ModalResult<VersionConstraint> {
        multispace0.parse_next(input)?;
        let op = opt(version_op).parse_next(input)?.unwrap_or(VersionOp::Equal);
        multispace0.parse_next(input)?;
        let version = take_while(1.., |c: char| !c.is_whitespace() && c != ')')
            .context(StrContext::Label("version"))
            .parse_next(input)?;
        multispace0.parse_next(input)?;
        ')'.context(StrContext::Label("closing ')'")).parse_next(input)?;
        Ok(VersionConstraint {
            op,
            version: version.to_string(),
        })
    })
    .parse_next(input)
}

/// A possibly negated word inside a restriction list closed by `close`.
fn restriction_term<'s>(close: char) -> impl Parser<&'s str, (bool, &'s str), ErrMode<ContextError>> {
    (
        opt('!').map(|n: Option<char>| n.is_some()),
        take_while(1.., move |c: char| !c.is_whitespace() && c != close && c != '!'),
    )
}

fn arch_restrictions<'s>(input: &mut &'s str) -> ModalResult<Vec<(bool, &'s str)>> {
    '['.parse_next(input)?;
    cut_err(terminated(
        repeat(1.., preceded(multispace0, restriction_term(']'))),
        (multispace0, ']'),
    ))
    .context(StrContext::Label("architecture restriction list"))
    .parse_next(input)
}

fn profile_group<'s>(input: &mut &'s str) -> ModalResult<Vec<(bool, &'s str)>> {
    '<'.parse_next(input)?;
    cut_err(terminated(
        repeat(1.., preceded(multispace0, restriction_term('>'))),
        (multispace0, '>'),
    ))
    .context(StrContext::Label("build profile list"))
    .parse_next(input)
}

fn raw_clause<'s>(input: &mut &'s str) -> ModalResult<RawClause<'s>> {
    multispace0.parse_next(input)?;
    let name = take_while(0.., is_name_char).parse_next(input)?;
    let qualifier = opt(preceded(':', take_while(1.., is_name_char))).parse_next(input)?;
    multispace0.parse_next(input)?;
    let constraint = opt(version_constraint).parse_next(input)?;
    multispace0.parse_next(input)?;
    let arches = opt(arch_restrictions).parse_next(input)?;
    let profiles: Vec<Vec<(bool, &'s str)>> =
        repeat(0.., preceded(multispace0, profile_group)).parse_next(input)?;
    multispace0.parse_next(input)?;
    let or_next = cut_err(alt(('|'.value(true), ','.value(false), eof.value(false))))
        .context(StrContext::Expected(StrContextValue::Description("',' or '|'")))
        .parse_next(input)?;
    Ok(RawClause {
        name,
        qualifier,
        constraint,
        arches,
        profiles,
        or_next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts<'a>(profiles: &'a [String]) -> DependsOptions<'a> {
        DependsOptions {
            native_arch: "amd64",
            build_profiles: profiles,
            strip_multi_arch: true,
        }
    }

    fn names(input: &str, opts: &DependsOptions<'_>) -> Vec<String> {
        Dependency::parse_list(input, opts)
            .unwrap()
            .into_iter()
            .map(|d| d.package)
            .collect()
    }

    #[test]
    fn parse_plain_names() {
        assert_eq!(names("foo, bar,baz", &opts(&[])), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn parse_version_constraints() {
        let deps = Dependency::parse_list("a (>= 1.0), b (<< 2:3.4-1~bpo1), c(=1), d (> 1), e (1.2)", &opts(&[])).unwrap();
        let ops: Vec<VersionOp> = deps.iter().map(|d| d.constraint.as_ref().unwrap().op).collect();
        assert_eq!(
            ops,
            vec![
                VersionOp::GreaterEq,
                VersionOp::Less,
                VersionOp::Equal,
                VersionOp::GreaterEq,
                VersionOp::Equal
            ]
        );
        assert_eq!(deps[1].constraint.as_ref().unwrap().version, "2:3.4-1~bpo1");
        assert_eq!(deps[0].to_string(), "a (>= 1.0)");
    }

    #[test]
    fn parse_alternatives() {
        let deps = Dependency::parse_list("default-jdk | java-sdk, ant", &opts(&[])).unwrap();
        assert_eq!(deps.len(), 3);
        assert!(deps[0].or_next);
        assert!(!deps[1].or_next);
        assert!(!deps[2].or_next);
    }

    #[test]
    fn multi_arch_qualifiers() {
        let strip = opts(&[]);
        assert_eq!(
            names("python3:any, perl:native, libc6:amd64, libc6:i386", &strip),
            vec!["python3", "perl", "libc6", "libc6:i386"]
        );
        let keep = DependsOptions {
            strip_multi_arch: false,
            ..strip
        };
        assert_eq!(names("python3:any", &keep), vec!["python3:any"]);
    }

    #[test]
    fn arch_restrictions_blank_the_name() {
        let o = opts(&[]);
        assert_eq!(
            names("a [amd64 i386], b [!amd64], c [linux-any], d [hurd-any], e [!hurd-any]", &o),
            vec!["a", "", "c", "", "e"]
        );
    }

    #[test]
    fn invalid_arch_in_restriction() {
        assert!(Dependency::parse_list("a [x-y-z-w]", &opts(&[])).is_err());
    }

    #[test]
    fn build_profiles() {
        let none: Vec<String> = Vec::new();
        let nocheck = vec!["nocheck".to_string()];
        let input = "check <!nocheck>, doc <!nodoc> <cross>, stage <stage1 nocheck>";
        assert_eq!(names(input, &opts(&none)), vec!["check", "doc", ""]);
        assert_eq!(names(input, &opts(&nocheck)), vec!["", "doc", ""]);
    }

    #[test]
    fn arch_and_profiles_together() {
        assert_eq!(
            names("foo (>= 1) [amd64] <!nocheck>", &opts(&[])),
            vec!["foo"]
        );
    }

    #[test]
    fn empty_clauses_are_kept_empty() {
        assert_eq!(names("foo, , bar,", &opts(&[])), vec!["foo", "", "bar"]);
        assert_eq!(names("", &opts(&[])), vec![""]);
    }

    #[test]
    fn multiline_field() {
        let input = "\n debhelper-compat (= 13),\n libssl-dev,\n pkgconf";
        assert_eq!(
            names(input, &opts(&[])),
            vec!["debhelper-compat", "libssl-dev", "pkgconf"]
        );
    }

    #[test]
    fn syntax_errors() {
        for bad in [
            "foo (>= 1.0",
            "foo bar",
            "foo (>= )",
            "foo [amd64",
            "foo [ ]",
            "foo <nocheck",
            "foo:",
        ] {
            assert!(
                matches!(
                    Dependency::parse_list(bad, &opts(&[])),
                    Err(Error::InvalidDependency(_))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn parse_clause_returns_remainder() {
        let (dep, rest) = Dependency::parse_clause("a | b", &opts(&[])).unwrap();
        assert_eq!(dep.package, "a");
        assert!(dep.or_next);
        assert_eq!(rest, " b");
    }
}
