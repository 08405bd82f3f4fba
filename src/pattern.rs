//! Query patterns such as `?installed ?name(^lib)` or `~i !~v`.
//!
//! Parsing yields a [`PatternNode`] tree which is then compiled into a
//! [`SharedMatcher`] against a [`CacheFile`].

use std::fmt;
use std::sync::Arc;

use winnow::ascii::multispace0;
use winnow::combinator::{
    alt, cut_err, delimited, dispatch, empty, fail, opt, peek, preceded, repeat, separated,
};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_till, take_while};

use crate::error::{Error, Result};
use crate::filter::{
    ArchitectureMatcher, ExactNameMatcher, InstalledMatcher, NameFnmatchMatcher,
    NameRegexMatcher, NewInstallMatcher, VersionRegexMatcher, VirtualMatcher,
};
use crate::matcher::{AndMatcher, FalseMatcher, NotMatcher, OrMatcher, SharedMatcher, TrueMatcher};
use crate::pkgcache::CacheFile;

/// A parsed query pattern.
///
/// Short forms (`~i`, `~nfoo`, ...) are expanded to their `?term` spelling
/// while parsing, so `Display` always prints the long form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    /// `?name` or `?name(arg, ...)`.
    Term {
        /// Term name without the `?`.
        name: String,
        /// Arguments, patterns or words.
        args: Vec<PatternNode>,
    },
    /// A bare or quoted word argument.
    Word(String),
    /// `!pattern`.
    Not(Box<PatternNode>),
    /// Whitespace separated patterns.
    And(Vec<PatternNode>),
    /// `|` separated patterns.
    Or(Vec<PatternNode>),
}

impl PatternNode {
    /// Parse a complete pattern string.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::PatternNode;
    ///
    /// let node = PatternNode::parse("~i ~n^lib | ?virtual").unwrap();
    /// assert_eq!(node.to_string(), "?installed ?name(^lib) | ?virtual");
    /// assert!(PatternNode::parse("?name(").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<PatternNode> {
        delimited(multispace0, parse_or, multispace0)
            .parse(input)
            .map_err(|e| Error::InvalidPattern(format!("{e}")))
    }

    /// Build the matcher tree for this pattern.
    pub fn compile(&self, cache: &CacheFile) -> Result<SharedMatcher> {
        match self {
            PatternNode::Term { name, args } => compile_term(name, args, cache),
            PatternNode::Word(word) => Err(Error::InvalidPattern(format!(
                "expected a pattern, found {word:?}"
            ))),
            PatternNode::Not(inner) => Ok(Arc::new(NotMatcher::new(inner.compile(cache)?))),
            PatternNode::And(nodes) => {
                let and = nodes
                    .iter()
                    .map(|n| n.compile(cache))
                    .collect::<Result<AndMatcher>>()?;
                Ok(Arc::new(and))
            }
            PatternNode::Or(nodes) => {
                let or = nodes
                    .iter()
                    .map(|n| n.compile(cache))
                    .collect::<Result<OrMatcher>>()?;
                Ok(Arc::new(or))
            }
        }
    }

    fn term(name: &str, args: Vec<PatternNode>) -> PatternNode {
        PatternNode::Term {
            name: name.to_string(),
            args,
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatternNode::Term { name, args } => {
                write!(f, "?{name}")?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            PatternNode::Word(word) => {
                let bare = !word.is_empty()
                    && word.chars().all(is_word_char)
                    && !word.starts_with(['?', '~', '!']);
                if bare {
                    write!(f, "{word}")
                } else {
                    write!(f, "\"{word}\"")
                }
            }
            PatternNode::Not(inner) => {
                write!(f, "!")?;
                fmt_operand(f, inner, true)
            }
            PatternNode::And(nodes) => fmt_list(f, nodes, " ", true),
            PatternNode::Or(nodes) => fmt_list(f, nodes, " | ", false),
        }
    }
}

fn fmt_list(f: &mut fmt::Formatter, nodes: &[PatternNode], sep: &str, in_and: bool) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        fmt_operand(f, node, in_and)?;
    }
    Ok(())
}

/// Write `node`, parenthesized where it would otherwise bind differently.
fn fmt_operand(f: &mut fmt::Formatter, node: &PatternNode, tight: bool) -> fmt::Result {
    let group = match node {
        PatternNode::Or(_) => true,
        PatternNode::And(_) => tight,
        _ => false,
    };
    if group {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

/// Parse `input` as a query pattern and compile it.
///
/// Strings that do not start with `?` or `~` are not patterns and yield
/// `Ok(None)`, leaving the caller to treat them as package names.
///
/// # Examples
///
/// ```
/// use deb_cachefilter::{parse_pattern, CacheFile, DepCache, Matcher, PkgCache};
///
/// let mut cache = PkgCache::new();
/// let apt = cache.add_package("apt", "amd64");
/// let ver = cache.add_version(apt, "2.6.1");
/// cache.set_current_version(ver);
/// let file = CacheFile::new(cache, DepCache::new());
///
/// let matcher = parse_pattern("?installed", &file).unwrap().unwrap();
/// assert!(matcher.matches_package(&file.cache().package(apt)));
/// assert!(parse_pattern("apt", &file).unwrap().is_none());
/// ```
pub fn parse_pattern(input: &str, cache: &CacheFile) -> Result<Option<SharedMatcher>> {
    if !input.trim_start().starts_with(['?', '~']) {
        return Ok(None);
    }
    let node = PatternNode::parse(input)?;
    let matcher = node.compile(cache)?;
    tracing::debug!(pattern = %node, "compiled query pattern");
    Ok(Some(matcher))
}

/// Like [`parse_pattern`], falling back to name matching for plain strings.
///
/// A string containing `*`, `?` or `[` becomes a glob over package names;
/// anything else must equal the package name.
pub fn parse_query(input: &str, cache: &CacheFile) -> Result<SharedMatcher> {
    if let Some(matcher) = parse_pattern(input, cache)? {
        return Ok(matcher);
    }
    let name = input.trim();
    if name.contains(['*', '?', '[']) {
        Ok(Arc::new(NameFnmatchMatcher::new(name)?))
    } else {
        Ok(Arc::new(ExactNameMatcher::new(name)))
    }
}

fn compile_term(name: &str, args: &[PatternNode], cache: &CacheFile) -> Result<SharedMatcher> {
    let matcher: SharedMatcher = match name {
        "true" => {
            no_args(name, args)?;
            Arc::new(TrueMatcher)
        }
        "false" => {
            no_args(name, args)?;
            Arc::new(FalseMatcher)
        }
        "installed" => {
            no_args(name, args)?;
            Arc::new(InstalledMatcher)
        }
        "virtual" => {
            no_args(name, args)?;
            Arc::new(VirtualMatcher)
        }
        "not" => {
            let mut inner = pattern_args(name, args, cache)?;
            if inner.len() != 1 {
                return Err(unsupported(name, "expected exactly one pattern"));
            }
            Arc::new(NotMatcher::new(inner.remove(0)))
        }
        "and" => Arc::new(AndMatcher::new(pattern_args(name, args, cache)?)),
        "or" => Arc::new(OrMatcher::new(pattern_args(name, args, cache)?)),
        "name" => Arc::new(NameRegexMatcher::new(word_arg(name, args)?)?),
        "exact-name" => Arc::new(ExactNameMatcher::new(word_arg(name, args)?)),
        "architecture" => Arc::new(ArchitectureMatcher::new(word_arg(name, args)?, true)?),
        "version" => Arc::new(VersionRegexMatcher::new(word_arg(name, args)?)?),
        "action" => match word_arg(name, args)? {
            "install" => Arc::new(NewInstallMatcher::new(Arc::clone(cache.depcache()))),
            other => return Err(unsupported(name, &format!("unknown action {other:?}"))),
        },
        _ => return Err(unsupported(name, "unknown term")),
    };
    Ok(matcher)
}

fn unsupported(term: &str, reason: &str) -> Error {
    Error::UnsupportedTerm {
        term: term.to_string(),
        reason: reason.to_string(),
    }
}

fn no_args(name: &str, args: &[PatternNode]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(unsupported(name, "takes no arguments"))
    }
}

fn word_arg<'a>(name: &str, args: &'a [PatternNode]) -> Result<&'a str> {
    match args {
        [PatternNode::Word(word)] => Ok(word.as_str()),
        _ => Err(unsupported(name, "expected exactly one word")),
    }
}

fn pattern_args(name: &str, args: &[PatternNode], cache: &CacheFile) -> Result<Vec<SharedMatcher>> {
    args.iter()
        .map(|arg| match arg {
            PatternNode::Word(word) => Err(unsupported(
                name,
                &format!("expected a pattern, found {word:?}"),
            )),
            _ => arg.compile(cache),
        })
        .collect()
}

// Winnow parsers

fn is_term_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '|' | '"')
}

fn parse_or(input: &mut &str) -> ModalResult<PatternNode> {
    let first = parse_and.parse_next(input)?;
    let mut rest: Vec<PatternNode> = repeat(
        0..,
        preceded(
            (multispace0, '|', multispace0),
            cut_err(parse_and).context(StrContext::Expected(StrContextValue::Description(
                "pattern after '|'",
            ))),
        ),
    )
    .parse_next(input)?;

    if rest.is_empty() {
        return Ok(first);
    }
    rest.insert(0, first);
    Ok(PatternNode::Or(rest))
}

fn parse_and(input: &mut &str) -> ModalResult<PatternNode> {
    let first = parse_unary.parse_next(input)?;
    let mut rest: Vec<PatternNode> =
        repeat(0.., preceded(take_while(1.., char::is_whitespace), parse_unary)).parse_next(input)?;

    if rest.is_empty() {
        return Ok(first);
    }
    rest.insert(0, first);
    Ok(PatternNode::And(rest))
}

fn parse_unary(input: &mut &str) -> ModalResult<PatternNode> {
    alt((
        preceded(('!', multispace0), cut_err(parse_unary))
            .map(|inner| PatternNode::Not(Box::new(inner))),
        parse_primary,
    ))
    .parse_next(input)
}

fn parse_primary(input: &mut &str) -> ModalResult<PatternNode> {
    dispatch! {peek(any);
        '?' => parse_term,
        '~' => parse_short,
        '(' => parse_group,
        _ => fail,
    }
    .parse_next(input)
}

fn parse_group(input: &mut &str) -> ModalResult<PatternNode> {
    delimited(
        ('(', multispace0),
        cut_err(parse_or),
        cut_err((multispace0, ')')).context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .parse_next(input)
}

fn parse_term(input: &mut &str) -> ModalResult<PatternNode> {
    '?'.parse_next(input)?;
    let name = cut_err(take_while(1.., is_term_char))
        .context(StrContext::Label("term name"))
        .parse_next(input)?;
    let args: Option<Vec<PatternNode>> = opt(preceded(
        '(',
        cut_err(delimited(
            multispace0,
            separated(0.., parse_arg, (multispace0, ',', multispace0)),
            (multispace0, ')'),
        ))
        .context(StrContext::Label("term arguments")),
    ))
    .parse_next(input)?;
    Ok(PatternNode::term(name, args.unwrap_or_default()))
}

fn parse_arg(input: &mut &str) -> ModalResult<PatternNode> {
    alt((parse_or, parse_word.map(PatternNode::Word))).parse_next(input)
}

/// `~X`, optionally followed by a word argument, depending on `X`.
fn parse_short(input: &mut &str) -> ModalResult<PatternNode> {
    '~'.parse_next(input)?;
    cut_err(dispatch! {any;
        'i' => empty.map(|_| PatternNode::term("installed", Vec::new())),
        'T' => empty.map(|_| PatternNode::term("true", Vec::new())),
        'F' => empty.map(|_| PatternNode::term("false", Vec::new())),
        'v' => empty.map(|_| PatternNode::term("virtual", Vec::new())),
        'n' => parse_word.map(|w| PatternNode::term("name", vec![PatternNode::Word(w)])),
        'r' => parse_word.map(|w| PatternNode::term("architecture", vec![PatternNode::Word(w)])),
        'V' => parse_word.map(|w| PatternNode::term("version", vec![PatternNode::Word(w)])),
        'a' => parse_word.map(|w| PatternNode::term("action", vec![PatternNode::Word(w)])),
        _ => fail,
    })
    .context(StrContext::Label("short pattern"))
    .parse_next(input)
}

fn parse_word(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), cut_err('"')).map(str::to_string),
        take_while(1.., is_word_char).map(str::to_string),
    ))
    .context(StrContext::Expected(StrContextValue::Description("word")))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkgcache::{DepCache, PackageId, PkgCache};

    struct Fixture {
        file: CacheFile,
        apt: PackageId,
        ssl: PackageId,
        libc: PackageId,
        mta: PackageId,
    }

    fn fixture() -> Fixture {
        let mut cache = PkgCache::new();
        let apt = cache.add_package("apt", "amd64");
        let installed = cache.add_version(apt, "2.6.1");
        cache.add_version(apt, "2.7.3");
        cache.set_current_version(installed);
        let ssl = cache.add_package("libssl-dev", "amd64");
        cache.add_version(ssl, "3.0.11-1");
        let libc = cache.add_package("libc6", "i386");
        cache.add_version(libc, "2.36-9");
        let mta = cache.add_package("mail-transport-agent", "amd64");

        let mut depcache = DepCache::new();
        depcache.mark_install(ssl);

        Fixture {
            file: CacheFile::new(cache, depcache),
            apt,
            ssl,
            libc,
            mta,
        }
    }

    impl Fixture {
        fn matching(&self, pattern: &str) -> Vec<PackageId> {
            let matcher = parse_query(pattern, &self.file).unwrap();
            self.file
                .cache()
                .packages()
                .filter(|p| matcher.matches_package(p))
                .map(|p| p.id())
                .collect()
        }
    }

    #[test]
    fn parse_terms() {
        assert_eq!(
            PatternNode::parse("?installed").unwrap(),
            PatternNode::term("installed", Vec::new())
        );
        assert_eq!(
            PatternNode::parse("?name(^lib)").unwrap(),
            PatternNode::term("name", vec![PatternNode::Word("^lib".to_string())])
        );
        assert_eq!(
            PatternNode::parse("  ?not( ?virtual )  ").unwrap(),
            PatternNode::term("not", vec![PatternNode::term("virtual", Vec::new())])
        );
    }

    #[test]
    fn parse_operators() {
        let node = PatternNode::parse("~i ~v | !~T").unwrap();
        let PatternNode::Or(alts) = node else {
            panic!("expected an alternation");
        };
        assert_eq!(alts.len(), 2);
        assert!(matches!(&alts[0], PatternNode::And(items) if items.len() == 2));
        assert!(matches!(&alts[1], PatternNode::Not(_)));
    }

    #[test]
    fn parse_short_forms() {
        assert_eq!(
            PatternNode::parse("~n\"foo bar\"").unwrap().to_string(),
            "?name(\"foo bar\")"
        );
        assert_eq!(PatternNode::parse("~ri386").unwrap().to_string(), "?architecture(i386)");
        assert_eq!(PatternNode::parse("~ainstall").unwrap().to_string(), "?action(install)");
        assert_eq!(PatternNode::parse("~V^2").unwrap().to_string(), "?version(^2)");
    }

    #[test]
    fn display_round_trip() {
        for input in [
            "?installed",
            "?name(^lib) ?architecture(amd64)",
            "(?true | ?false) ?virtual",
            "!(?installed ?virtual)",
            "?or(?name(a), ?and(?true, ?false))",
            "?exact-name(\"odd,name\")",
            "?true ((?false))",
        ] {
            let node = PatternNode::parse(input).unwrap();
            let printed = node.to_string();
            assert_eq!(PatternNode::parse(&printed).unwrap(), node, "{input} -> {printed}");
        }
    }

    #[test]
    fn syntax_errors() {
        for input in ["?name(", "?", "~x", "?installed |", "(?true", "?true)", "~n", "?name(\"open)"] {
            assert!(
                matches!(PatternNode::parse(input), Err(Error::InvalidPattern(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn not_a_pattern() {
        let f = fixture();
        assert!(parse_pattern("apt", &f.file).unwrap().is_none());
        assert!(parse_pattern("", &f.file).unwrap().is_none());
        assert!(parse_pattern("  ~i", &f.file).unwrap().is_some());
    }

    #[test]
    fn compile_errors() {
        let f = fixture();
        assert!(matches!(
            parse_pattern("?frobnicate", &f.file),
            Err(Error::UnsupportedTerm { ref term, .. }) if term == "frobnicate"
        ));
        assert!(matches!(
            parse_pattern("?installed(x)", &f.file),
            Err(Error::UnsupportedTerm { .. })
        ));
        assert!(matches!(
            parse_pattern("?not(foo)", &f.file),
            Err(Error::UnsupportedTerm { .. })
        ));
        assert!(matches!(
            parse_pattern("?name(?true)", &f.file),
            Err(Error::UnsupportedTerm { .. })
        ));
        assert!(matches!(
            parse_pattern("?action(remove)", &f.file),
            Err(Error::UnsupportedTerm { .. })
        ));
        assert!(matches!(
            parse_pattern("?name(\"lib(\")", &f.file),
            Err(Error::InvalidRegex { .. })
        ));
        assert!(matches!(
            parse_pattern("?architecture(a-b-c-d)", &f.file),
            Err(Error::InvalidArch(_))
        ));
    }

    #[test]
    fn evaluate_patterns() {
        let f = fixture();
        assert_eq!(f.matching("~i"), vec![f.apt]);
        assert_eq!(f.matching("~v"), vec![f.mta]);
        assert_eq!(f.matching("~n^lib"), vec![f.ssl, f.libc]);
        assert_eq!(f.matching("~n^lib ~ramd64"), vec![f.ssl]);
        assert_eq!(f.matching("~i | ~ri386"), vec![f.apt, f.libc]);
        assert_eq!(f.matching("!~n^lib !~v"), vec![f.apt]);
        assert_eq!(f.matching("~ainstall"), vec![f.ssl]);
        assert_eq!(f.matching("?version(^2\\.7)"), vec![f.apt]);
        assert_eq!(f.matching("?and()").len(), 4);
        assert!(f.matching("?or()").is_empty());
        assert_eq!(f.matching("?exact-name(libc6)"), vec![f.libc]);
    }

    #[test]
    fn linux_any_matches_all_linux_packages() {
        let f = fixture();
        assert_eq!(f.matching("?architecture(linux-any)").len(), 4);
    }

    #[test]
    fn version_and_group_projection() {
        let f = fixture();
        let cache = f.file.cache();
        let matcher = parse_query("?version(^2\\.7)", &f.file).unwrap();
        let versions: Vec<&str> = cache
            .package(f.apt)
            .versions()
            .filter(|v| matcher.matches_version(v))
            .map(|v| v.version_str())
            .collect();
        assert_eq!(versions, vec!["2.7.3"]);

        let by_name = parse_query("~n^apt$", &f.file).unwrap();
        let group = cache.find_group("apt").unwrap();
        assert!(by_name.matches_group(&group));
        assert!(!parse_query("~i", &f.file).unwrap().matches_group(&group));
    }

    #[test]
    fn query_fallbacks() {
        let f = fixture();
        assert_eq!(f.matching("lib*"), vec![f.ssl, f.libc]);
        assert_eq!(f.matching("libc[0-9]"), vec![f.libc]);
        assert_eq!(f.matching("apt"), vec![f.apt]);
        assert!(f.matching("ap").is_empty());
        assert!(matches!(
            parse_query("lib[", &f.file),
            Err(Error::InvalidGlob { .. })
        ));
    }
}
