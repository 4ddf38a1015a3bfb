//! Model manifest parser using nom
//!
//! The manifest tells the daemon which models exist and how the caches are
//! sized. One statement per line, `#` starts a comment:
//!
//! ```text
//! # namespace  variant  parts...
//! pos        ko  models/pos-ko.bin
//! sentiment  ko  shopping=models/sa-shopping.bin movie=models/sa-movie.bin
//!
//! # cache <capacity> <namespace>...
//! cache 1 dep_parse ocr
//! ```
//!
//! A bare path becomes a single part named [`DEFAULT_PART`]. Relative
//! paths resolve against the manifest's own directory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res},
    multi::many1,
    sequence::{preceded, separated_pair, terminated, tuple},
    IResult,
};

use crate::artifact::DEFAULT_PART;
use crate::error::{Error, Result};

/// One named artifact of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    /// Part name
    pub name: String,
    /// Artifact file
    pub path: PathBuf,
}

/// A `(namespace, variant)` and the artifacts that make up its model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Task family, e.g. `pos`
    pub namespace: String,
    /// Configuration within the family, e.g. `ko`
    pub variant: String,
    /// Artifacts, in manifest order
    pub parts: Vec<PartSpec>,
}

/// A dedicated cache for a group of namespaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirective {
    /// Maximum number of models held at once
    pub capacity: usize,
    /// Namespaces sharing this cache
    pub namespaces: Vec<String>,
}

/// Parsed manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Model entries in manifest order
    pub entries: Vec<ManifestEntry>,
    /// Cache directives in manifest order
    pub caches: Vec<CacheDirective>,
}

enum Statement<'a> {
    Entry {
        namespace: &'a str,
        variant: &'a str,
        parts: Vec<(&'a str, &'a str)>,
    },
    Cache {
        capacity: usize,
        namespaces: Vec<&'a str>,
    },
}

impl Manifest {
    /// Read and parse the manifest at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
    }

    /// Parse manifest text, resolving relative paths against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest = Manifest::default();
        let mut seen_keys = HashSet::new();
        let mut cached_namespaces = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let statement = match all_consuming(terminated(statement, space0))(line) {
                Ok((_, statement)) => statement,
                Err(_) => return Err(Error::manifest(line_no, format!("cannot parse '{}'", line))),
            };

            match statement {
                Statement::Entry {
                    namespace,
                    variant,
                    parts,
                } => {
                    if !seen_keys.insert((namespace.to_string(), variant.to_string())) {
                        return Err(Error::manifest(
                            line_no,
                            format!("duplicate entry {}/{}", namespace, variant),
                        ));
                    }

                    let mut names = HashSet::new();
                    let mut specs = Vec::with_capacity(parts.len());
                    for (name, path) in parts {
                        if !names.insert(name) {
                            return Err(Error::manifest(
                                line_no,
                                format!("duplicate part '{}' in {}/{}", name, namespace, variant),
                            ));
                        }
                        specs.push(PartSpec {
                            name: name.to_string(),
                            path: base_dir.join(path),
                        });
                    }

                    manifest.entries.push(ManifestEntry {
                        namespace: namespace.to_string(),
                        variant: variant.to_string(),
                        parts: specs,
                    });
                }
                Statement::Cache {
                    capacity,
                    namespaces,
                } => {
                    if capacity == 0 {
                        return Err(Error::manifest(line_no, "cache capacity must be at least 1"));
                    }
                    for ns in &namespaces {
                        if let Some(previous) = cached_namespaces.insert(ns.to_string(), line_no) {
                            return Err(Error::manifest(
                                line_no,
                                format!("namespace '{}' already assigned a cache on line {}", ns, previous),
                            ));
                        }
                    }
                    manifest.caches.push(CacheDirective {
                        capacity,
                        namespaces: namespaces.into_iter().map(str::to_string).collect(),
                    });
                }
            }
        }

        for (ns, line_no) in &cached_namespaces {
            if !manifest.entries.iter().any(|e| &e.namespace == ns) {
                return Err(Error::manifest(
                    *line_no,
                    format!("cache directive names '{}' which has no entries", ns),
                ));
            }
        }

        Ok(manifest)
    }

    /// Distinct namespaces in first-seen order
    pub fn namespaces(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.namespace.as_str())
            .filter(|ns| seen.insert(*ns))
            .collect()
    }

    /// The directive that owns `namespace`, if any
    pub fn cache_for(&self, namespace: &str) -> Option<&CacheDirective> {
        self.caches
            .iter()
            .find(|c| c.namespaces.iter().any(|ns| ns == namespace))
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')(input)
}

fn path_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn part(input: &str) -> IResult<&str, (&str, &str)> {
    alt((
        separated_pair(ident, char('='), path_token),
        map(path_token, |path| (DEFAULT_PART, path)),
    ))(input)
}

fn cache_directive(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        tuple((
            preceded(tag("cache"), preceded(space1, map_res(digit1, str::parse::<usize>))),
            many1(preceded(space1, ident)),
        )),
        |(capacity, namespaces)| Statement::Cache {
            capacity,
            namespaces,
        },
    )(input)
}

fn entry(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        tuple((ident, preceded(space1, ident), many1(preceded(space1, part)))),
        |(namespace, variant, parts)| Statement::Entry {
            namespace,
            variant,
            parts,
        },
    )(input)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((cache_directive, entry))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# sequence tagging
pos  ko  models/pos-ko.bin
pos  en  models/pos-en.bin   # trailing comment
sentiment ko shopping=models/sa-shop.bin movie=models/sa-movie.bin

cache 1 dep_parse
dep_parse ko /abs/dp-ko.bin
";

    #[test]
    fn test_parse_entries() {
        let manifest = Manifest::parse(SAMPLE, Path::new("/srv")).unwrap();

        assert_eq!(manifest.entries.len(), 4);
        let pos_ko = &manifest.entries[0];
        assert_eq!(pos_ko.namespace, "pos");
        assert_eq!(pos_ko.variant, "ko");
        assert_eq!(
            pos_ko.parts,
            vec![PartSpec {
                name: DEFAULT_PART.to_string(),
                path: PathBuf::from("/srv/models/pos-ko.bin"),
            }]
        );

        let sentiment = &manifest.entries[2];
        let names: Vec<_> = sentiment.parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["shopping", "movie"]);

        assert_eq!(manifest.entries[3].parts[0].path, PathBuf::from("/abs/dp-ko.bin"));
    }

    #[test]
    fn test_parse_cache_directive() {
        let manifest = Manifest::parse(SAMPLE, Path::new("/srv")).unwrap();

        assert_eq!(
            manifest.caches,
            vec![CacheDirective {
                capacity: 1,
                namespaces: vec!["dep_parse".to_string()],
            }]
        );
        assert_eq!(manifest.cache_for("dep_parse").map(|c| c.capacity), Some(1));
        assert!(manifest.cache_for("pos").is_none());
        assert_eq!(manifest.namespaces(), vec!["pos", "sentiment", "dep_parse"]);
    }

    #[test]
    fn test_reject_zero_capacity() {
        let err = Manifest::parse("pos ko a.bin\ncache 0 pos\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 2, .. }));
    }

    #[test]
    fn test_reject_duplicate_entry() {
        let err = Manifest::parse("pos ko a.bin\npos ko b.bin\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 2, .. }));
    }

    #[test]
    fn test_reject_duplicate_part() {
        let err = Manifest::parse("sentiment ko a=x.bin a=y.bin\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 1, .. }));
    }

    #[test]
    fn test_reject_namespace_in_two_caches() {
        let text = "pos ko a.bin\ncache 2 pos\ncache 3 pos\n";
        let err = Manifest::parse(text, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 3, .. }));
    }

    #[test]
    fn test_reject_cache_for_unknown_namespace() {
        let err = Manifest::parse("pos ko a.bin\ncache 2 ner\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 2, .. }));
    }

    #[test]
    fn test_reject_entry_without_parts() {
        let err = Manifest::parse("pos ko\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Manifest { line: 1, .. }));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse("# nothing here\n\n", Path::new(".")).unwrap();
        assert!(manifest.entries.is_empty());
        assert!(manifest.caches.is_empty());
    }
}
