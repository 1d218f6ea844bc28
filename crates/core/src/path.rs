use std::path::{Component, Path, PathBuf};

/// Absolute, symlink-resolved form of `path` when it exists; a lexically
/// cleaned absolute path otherwise.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute
        .canonicalize()
        .unwrap_or_else(|_| lexical_clean(&absolute))
}

/// Resolves `.` and `..` without touching the filesystem.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub fn relativize(base: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(Path::to_path_buf)
}

/// Forward-slash rendering used for every reported path.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::RootDir => Some(String::new()),
            Component::Prefix(p) => Some(p.as_os_str().to_string_lossy().to_string()),
            Component::CurDir => None,
            other => Some(other.as_os_str().to_string_lossy().to_string()),
        })
        .collect::<Vec<_>>()
        .join("/")
        .replace("//", "/")
}

/// One row of the binding table: a logical root inside the session workspace
/// and the external directory it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedRoot {
    pub name: String,
    pub link: PathBuf,
    pub external: PathBuf,
}

/// Translates between source-tree paths, workspace paths and reported paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    tree_root: PathBuf,
    roots: Vec<LinkedRoot>,
    absolute: bool,
}

impl PathResolver {
    pub fn new(tree_root: PathBuf, roots: Vec<LinkedRoot>, absolute: bool) -> Self {
        Self {
            tree_root,
            roots,
            absolute,
        }
    }

    pub fn tree_root(&self) -> &Path {
        &self.tree_root
    }

    pub fn roots(&self) -> &[LinkedRoot] {
        &self.roots
    }

    /// Workspace-side location of a file given by the user. Relative inputs
    /// are taken relative to the tree root.
    pub fn to_workspace(&self, external: &Path) -> Option<PathBuf> {
        let external = if external.is_absolute() {
            normalize(external)
        } else {
            normalize(&self.tree_root.join(external))
        };

        self.roots
            .iter()
            .filter_map(|root| {
                external
                    .strip_prefix(&root.external)
                    .ok()
                    .map(|rest| (root, rest))
            })
            .max_by_key(|(root, _)| root.external.components().count())
            .map(|(root, rest)| join_non_empty(&root.link, rest))
    }

    /// Source-tree location of a workspace path. Paths outside every linked
    /// root come back unchanged.
    pub fn to_external(&self, workspace: &Path) -> PathBuf {
        self.roots
            .iter()
            .filter_map(|root| {
                workspace
                    .strip_prefix(&root.link)
                    .ok()
                    .map(|rest| (root, rest))
            })
            .max_by_key(|(root, _)| root.link.components().count())
            .map(|(root, rest)| join_non_empty(&root.external, rest))
            .unwrap_or_else(|| workspace.to_path_buf())
    }

    /// Path as shown to callers: tree-relative unless absolute paths are configured.
    pub fn report(&self, workspace: &Path) -> String {
        let external = self.to_external(workspace);
        if self.absolute {
            return to_slash(&external);
        }
        match relativize(&self.tree_root, &external) {
            Some(rel) => to_slash(&rel),
            None => to_slash(&external),
        }
    }
}

fn join_non_empty(base: &Path, rest: &Path) -> PathBuf {
    if rest.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(rest)
    }
}
