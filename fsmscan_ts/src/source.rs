//! Source resolution: parsed files addressable by path and declared class name.

use crate::literal::property_key;
use crate::syntax::Syntax;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tree_sitter::{Language, Parser, Tree};
use walkdir::{DirEntry, WalkDir};

// `class` covers `export default class X {}` parsed as a class expression
const CLASS_KINDS: [&str; 3] = ["class_declaration", "abstract_class_declaration", "class"];
const FIELD_KINDS: [&str; 2] = ["public_field_definition", "field_definition"];
const SKIPPED_DIRS: [&str; 2] = ["node_modules", ".git"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source file '{}'", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid source glob `{0}`")]
    Glob(String, #[source] globset::Error),
    #[error("failed to load the TypeScript grammar")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("failed to parse source file '{}'", .0.display())]
    Parse(PathBuf),
}

/// One parsed source file.
pub struct SourceFile {
    path: PathBuf,
    text: String,
    tree: Tree,
}

impl SourceFile {
    /// Parses `text` as the content of `path`.
    ///
    /// `.tsx`/`.jsx` files use the TSX grammar, everything else the TypeScript one.
    /// Syntax errors are recovered by the parser: the file is kept and a warning is logged.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<SourceFile, SourceError> {
        let path = path.into();
        let text = text.into();
        let language: Language = match path.extension().and_then(|ext| ext.to_str()) {
            Some("tsx" | "jsx") => tree_sitter_typescript::LANGUAGE_TSX.into(),
            _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        };
        let mut parser = Parser::new();
        parser.set_language(&language)?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| SourceError::Parse(path.clone()))?;
        let file = SourceFile { path, text, tree };
        if file.has_errors() {
            warn!(target: "source", "'{}' contains syntax errors, extraction may be partial", file.path.display());
        }
        Ok(file)
    }

    /// Whether the parser had to recover from syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Reads and parses a file from disk.
    pub fn read(path: &Path) -> Result<SourceFile, SourceError> {
        trace!(target: "source", "reading '{}'", path.display());
        let text = std::fs::read_to_string(path).map_err(|err| SourceError::Io(path.to_path_buf(), err))?;
        SourceFile::parse(path, text)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> Syntax<'_> {
        Syntax::new(self.tree.root_node(), &self.text)
    }

    /// Top-level class declarations, exported or not, in source order.
    pub fn declarations(&self) -> Vec<Declaration<'_>> {
        self.root()
            .named_children()
            .into_iter()
            .flat_map(|statement| {
                if statement.kind() == "export_statement" {
                    statement.named_children()
                } else {
                    vec![statement]
                }
            })
            .filter(|node| CLASS_KINDS.contains(&node.kind()))
            .filter_map(|node| {
                let name = node.field("name")?.text();
                Some(Declaration {
                    name,
                    file: &self.path,
                    node,
                })
            })
            .collect()
    }

    /// The first class declared with the given name.
    pub fn declaration(&self, name: &str) -> Option<Declaration<'_>> {
        self.declarations()
            .into_iter()
            .find(|declaration| declaration.name == name)
    }
}

/// A state definition: a class declaration.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    pub name: &'a str,
    pub file: &'a Path,
    node: Syntax<'a>,
}

/// An instance member of a state definition.
#[derive(Debug, Clone)]
pub struct Member<'a> {
    pub name: String,
    /// Field initializer, `None` for methods and uninitialized fields.
    pub initializer: Option<Syntax<'a>>,
    pub line: usize,
}

impl<'a> Declaration<'a> {
    pub fn syntax(&self) -> Syntax<'a> {
        self.node
    }

    /// Instance members in declaration order. Static members are left out.
    pub fn members(&self) -> Vec<Member<'a>> {
        let Some(body) = self.node.field("body") else {
            return Vec::new();
        };
        body.named_children()
            .into_iter()
            .filter(|member| !member.has_child("static"))
            .filter_map(|member| {
                let kind = member.kind();
                let (name, initializer) = if FIELD_KINDS.contains(&kind) {
                    // TypeScript names the field `name`, JavaScript `property`
                    let name = member.field("name").or_else(|| member.field("property"))?;
                    (name, member.field("value"))
                } else if kind == "method_definition" {
                    (member.field("name")?, None)
                } else {
                    return None;
                };
                let Some(name) = property_key(name) else {
                    debug!(target: "source", "skipping member with computed name {name:?}");
                    return None;
                };
                Some(Member {
                    name,
                    initializer,
                    line: member.line(),
                })
            })
            .collect()
    }
}

/// Outcome of looking up a state definition by name.
#[derive(Debug)]
pub enum Lookup<'a> {
    Found(Declaration<'a>),
    Missing,
    /// Not in the requested file, and declared in more than one other file.
    Ambiguous(Vec<&'a Path>),
}

/// Read-only set of parsed source files shared by all extractions of a run.
#[derive(Default)]
pub struct SourceContext {
    files: BTreeMap<PathBuf, SourceFile>,
}

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parses in-memory text and adds it under `path`.
    pub fn add_source(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Result<(), SourceError> {
        let path: PathBuf = path.into();
        let file = SourceFile::parse(normalize(&path), text)?;
        self.insert(file);
        Ok(())
    }

    /// Reads, parses and adds one file from disk.
    pub fn add_file(&mut self, path: &Path) -> Result<(), SourceError> {
        let path = canonical(path).map_err(|err| SourceError::Io(path.to_path_buf(), err))?;
        let file = SourceFile::read(&path)?;
        self.insert(file);
        Ok(())
    }

    /// Adds every file under `root` whose path relative to `root` matches one of `patterns`.
    ///
    /// Files are parsed in parallel; `node_modules` and `.git` directories are not visited,
    /// symbolic links are followed.
    /// A file that cannot be read is skipped with a warning.
    /// Returns the number of files added.
    pub fn discover(&mut self, root: &Path, patterns: &[String]) -> Result<usize, SourceError> {
        let globs = glob_set(patterns)?;
        let paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(target: "source", "skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .is_ok_and(|relative| globs.is_match(relative))
            })
            .map(|entry| canonical(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf()))
            .collect();
        info!(target: "source", "parsing {} source files under '{}'", paths.len(), root.display());
        let results: Vec<Result<SourceFile, SourceError>> =
            paths.par_iter().map(|path| SourceFile::read(path)).collect();
        let mut count = 0;
        for result in results {
            match result {
                Ok(file) => {
                    self.insert(file);
                    count += 1;
                }
                Err(err) => warn!(target: "source", "{err}, file skipped"),
            }
        }
        Ok(count)
    }

    fn insert(&mut self, file: SourceFile) {
        let mut seen = HashSet::new();
        for declaration in file.declarations() {
            if !seen.insert(declaration.name) {
                warn!(
                    target: "source",
                    "class `{}` is declared more than once in '{}', the first declaration is used",
                    declaration.name,
                    file.path.display()
                );
            }
        }
        if self.files.contains_key(&file.path) {
            debug!(target: "source", "replacing '{}'", file.path.display());
        }
        self.files.insert(file.path.clone(), file);
    }

    /// The file loaded under `path`, if any.
    pub fn file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(&normalize(path)).or_else(|| {
            canonical(path)
                .ok()
                .and_then(|path| self.files.get(&path))
        })
    }

    /// Looks up a state definition, first in `file`, then in the rest of the context.
    pub fn lookup<'a>(&'a self, file: &'a SourceFile, name: &str) -> Lookup<'a> {
        if let Some(declaration) = file.declaration(name) {
            return Lookup::Found(declaration);
        }
        let mut found: Vec<Declaration<'a>> = self
            .files
            .values()
            .filter(|other| other.path != file.path)
            .filter_map(|other| other.declaration(name))
            .collect();
        if found.len() > 1 {
            Lookup::Ambiguous(found.iter().map(|declaration| declaration.file).collect())
        } else if let Some(declaration) = found.pop() {
            debug!(
                target: "source",
                "class `{name}` not in '{}', using the declaration in '{}'",
                file.path.display(),
                declaration.file.display()
            );
            Lookup::Found(declaration)
        } else {
            Lookup::Missing
        }
    }
}

fn glob_set(patterns: &[String]) -> Result<GlobSet, SourceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|err| SourceError::Glob(pattern.clone(), err))?);
    }
    builder
        .build()
        .map_err(|err| SourceError::Glob(patterns.join(", "), err))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Drops `.` components so that `./src/a.ts` and `src/a.ts` are the same key.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn canonical(path: &Path) -> std::io::Result<PathBuf> {
    std::fs::canonicalize(path)
}
