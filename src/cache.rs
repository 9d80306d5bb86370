//! Workspace-wide cache of built objects, keyed by file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::docblock;
use crate::types::{Documentation, ExtensionKind, ObjectKind, Procedure, SourceObject};

/// Concurrent map from workspace-relative file path to the object built from it.
///
/// Entries are immutable snapshots: a rebuild swaps the `Arc`, so readers
/// holding the old snapshot are never disturbed. At most one entry exists
/// per path.
#[derive(Debug, Default)]
pub struct ObjectCache {
    /// Built objects by file.
    objects: DashMap<PathBuf, Arc<SourceObject>>,
}

/// Documentation found by following an `inheritdoc` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritedDocumentation {
    /// The referenced procedure's documentation.
    pub documentation: Documentation,
    /// File holding the referenced interface.
    pub file: PathBuf,
    /// Line of the referenced procedure.
    pub line: usize,
    /// Interface name.
    pub object: String,
    /// Procedure name.
    pub procedure: String,
}

impl ObjectCache {
    /// Empty cache.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Find an object by name (case-insensitive) and kind.
    pub fn find_object(&self, name: &str, kind: ObjectKind) -> Option<Arc<SourceObject>> {
        return self
            .objects
            .iter()
            .find(|entry| return entry.value().kind == kind && entry.value().name.eq_ignore_ascii_case(name))
            .map(|entry| return Arc::clone(entry.value()));
    }

    /// Snapshot of the object built from `path`.
    pub fn get(&self, path: &Path) -> Option<Arc<SourceObject>> {
        return self.objects.get(path).map(|entry| return Arc::clone(entry.value()));
    }

    /// Store `object` under its own file path, replacing any previous entry.
    pub fn insert(&self, object: SourceObject) {
        let path = object.file.clone();
        self.objects.insert(path, Arc::new(object));
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        return self.objects.is_empty();
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        return self.objects.len();
    }

    /// Every cached path, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.objects.iter().map(|entry| return entry.key().clone()).collect();
        paths.sort();
        return paths;
    }

    /// Remove the entry for `path`, returning what was there.
    pub fn remove(&self, path: &Path) -> Option<Arc<SourceObject>> {
        return self.objects.remove(path).map(|(_, object)| return object);
    }

    /// Swap in a rebuilt object for `path`, or drop the entry when the file
    /// no longer declares one.
    pub fn replace(&self, path: &Path, object: Option<SourceObject>) {
        match object {
            Some(object) => {
                self.objects.insert(path.to_path_buf(), Arc::new(object));
            },
            None => {
                self.objects.remove(path);
            },
        }
    }

    /// Follow `inheritdoc` on `procedure` to the documentation it refers to.
    ///
    /// With a `cref` of the form `Interface.Procedure`, that interface is
    /// looked up by name. Without one, every interface named in the owning
    /// object's `implements` clause is searched for a procedure of the same
    /// name. Names compare case-insensitively.
    pub fn resolve_inherited(&self, owner: &SourceObject, procedure: &Procedure) -> Option<InheritedDocumentation> {
        if !procedure.documentation.exists {
            return None;
        }
        let inheritdoc = docblock::parse_tags(&procedure.documentation.raw).inheritdoc?;

        let candidates: Vec<(String, String)> = match inheritdoc.cref.as_deref() {
            Some(cref) => {
                let (interface, name) = cref.rsplit_once('.')?;
                vec![(crate::signature::unquote(interface), crate::signature::unquote(name))]
            },
            None => owner
                .extension
                .iter()
                .filter(|e| return e.kind == ExtensionKind::Implements)
                .flat_map(|e| return e.targets())
                .map(|target| return (target, procedure.name.clone()))
                .collect(),
        };

        for (interface, name) in candidates {
            let Some(object) = self.find_object(&interface, ObjectKind::Interface) else {
                tracing::debug!("inheritdoc target interface {interface} is not cached");
                continue;
            };
            let found = object
                .procedures
                .iter()
                .find(|p| return p.name.eq_ignore_ascii_case(&name) && p.documentation.exists);
            if let Some(target) = found {
                return Some(InheritedDocumentation {
                    documentation: target.documentation.clone(),
                    file: object.file.clone(),
                    line: target.line,
                    object: object.name.clone(),
                    procedure: target.name.clone(),
                });
            }
        }
        return None;
    }
}
