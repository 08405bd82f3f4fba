//! RFC 822 style stanzas as used by Debian `Sources` files and `.dsc`
//! control files.

use crate::error::{Error, Result};

/// One stanza: an ordered list of `Key: value` fields.
///
/// Continuation lines (starting with a space or tab) extend the previous
/// field; lines starting with `#` are comments. Field lookup ignores ASCII
/// case and returns the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    text: String,
    fields: Vec<(String, String)>,
}

impl Section {
    /// Parse a single stanza.
    ///
    /// # Examples
    ///
    /// ```
    /// use deb_cachefilter::Section;
    ///
    /// let section = Section::parse("\
    /// Package: hello
    /// Binary: hello,
    ///  hello-dbg
    /// ").unwrap();
    /// assert_eq!(section.find("package"), Some("hello"));
    /// assert_eq!(section.find("Binary"), Some("hello,\n hello-dbg"));
    /// assert_eq!(section.find("Version"), None);
    /// ```
    pub fn parse(input: &str) -> Result<Section> {
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in input.lines() {
            if line.starts_with('#') {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                let Some((_, value)) = fields.last_mut() else {
                    return Err(Error::InvalidSection(format!(
                        "continuation line before any field: {}",
                        line.trim()
                    )));
                };
                value.push('\n');
                value.push_str(line);
                continue;
            }
            if line.trim().is_empty() {
                return Err(Error::InvalidSection("blank line inside stanza".to_string()));
            }

            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| Error::InvalidSection(format!("missing ':' in line: {line}")))?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(Error::InvalidSection(format!("invalid field name: {key:?}")));
            }
            fields.push((key.to_string(), value.trim_start().to_string()));
        }

        for (_, value) in fields.iter_mut() {
            let trimmed = value.trim_end().len();
            value.truncate(trimmed);
        }

        Ok(Section {
            text: input.to_string(),
            fields,
        })
    }

    /// Value of `key`, or `None` when the field is absent.
    pub fn find(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key`, with an absent field read as empty.
    pub fn find_or_empty(&self, key: &str) -> &str {
        self.find(key).unwrap_or_default()
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Field names in stanza order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the stanza has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The stanza exactly as read.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Iterator over the blank-line separated stanzas of a tag file.
#[derive(Debug, Clone)]
pub struct TagFile {
    text: String,
    pos: usize,
}

impl TagFile {
    /// Read stanzas from `text`.
    pub fn new(text: impl Into<String>) -> Self {
        TagFile {
            text: text.into(),
            pos: 0,
        }
    }

    /// Start over from the first stanza.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Byte offset of the next stanza.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The next raw stanza text, skipping separator lines.
    fn next_chunk(&mut self) -> Option<&str> {
        let rest = &self.text[self.pos..];
        let mut start = None;
        let mut offset = 0;

        for line in rest.split_inclusive('\n') {
            let blank = line.trim().is_empty();
            match (start, blank) {
                (None, true) => {}
                (None, false) => start = Some(offset),
                (Some(_), true) => break,
                (Some(_), false) => {}
            }
            offset += line.len();
        }

        let begin = self.pos + start?;
        let end = self.pos + offset;
        self.pos = end;
        Some(&self.text[begin..end])
    }
}

impl Iterator for TagFile {
    type Item = Result<Section>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.next_chunk()?;
        let section = Section::parse(chunk);
        if let Err(ref e) = section {
            tracing::warn!(offset = self.pos, "skipping stanza: {e}");
        }
        Some(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_fields() {
        let section = Section::parse("Package: hello\nVersion: 2.10-3\n").unwrap();
        assert_eq!(section.len(), 2);
        assert_eq!(section.find("Package"), Some("hello"));
        assert_eq!(section.find("VERSION"), Some("2.10-3"));
        assert!(section.exists("version"));
        assert_eq!(section.find_or_empty("Binary"), "");
    }

    #[test]
    fn first_occurrence_wins() {
        let section = Section::parse("Foo: one\nfoo: two\n").unwrap();
        assert_eq!(section.find("Foo"), Some("one"));
        assert_eq!(section.keys().collect::<Vec<_>>(), vec!["Foo", "foo"]);
    }

    #[test]
    fn multiline_value() {
        let input = "\
Files:
 d41d8cd98f00b204e9800998ecf8427e 0 a.dsc
 d41d8cd98f00b204e9800998ecf8427e 0 a.tar.xz
Package: x
";
        let section = Section::parse(input).unwrap();
        assert_eq!(
            section.find("Files"),
            Some("\n d41d8cd98f00b204e9800998ecf8427e 0 a.dsc\n d41d8cd98f00b204e9800998ecf8427e 0 a.tar.xz")
        );
        assert_eq!(section.as_str(), input);
    }

    #[test]
    fn empty_value() {
        let section = Section::parse("Binary:\nPackage: x\n").unwrap();
        assert_eq!(section.find("Binary"), Some(""));
    }

    #[test]
    fn comments_ignored() {
        let section = Section::parse("# generated\nPackage: x\n").unwrap();
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn invalid_lines() {
        assert!(matches!(
            Section::parse(" leading continuation\n"),
            Err(Error::InvalidSection(_))
        ));
        assert!(matches!(
            Section::parse("Package hello\n"),
            Err(Error::InvalidSection(_))
        ));
        assert!(matches!(
            Section::parse("Bad Key: x\n"),
            Err(Error::InvalidSection(_))
        ));
    }

    #[test]
    fn iterate_stanzas() {
        let text = "\n\nPackage: a\nVersion: 1\n\n\n \nPackage: b\nVersion: 2\n";
        let mut tags = TagFile::new(text);
        let names: Vec<String> = tags
            .by_ref()
            .map(|s| s.unwrap().find("Package").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(tags.next().is_none());
        tags.rewind();
        assert_eq!(tags.offset(), 0);
        assert_eq!(tags.count(), 2);
    }

    #[test]
    fn iterate_reports_bad_stanza_and_continues() {
        let text = "Package: a\n\nnonsense\n\nPackage: c\n";
        let results: Vec<bool> = TagFile::new(text).map(|s| s.is_ok()).collect();
        assert_eq!(results, vec![true, false, true]);
    }

    #[test]
    fn empty_file() {
        assert_eq!(TagFile::new("").count(), 0);
        assert_eq!(TagFile::new("\n \n\t\n").count(), 0);
    }
}
