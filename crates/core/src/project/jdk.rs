//! Locates the platform runtime backing the CONTAINER classpath entry.
//!
//! Sources, in order:
//! - JAVA_HOME environment variable
//! - macOS java_home tool
//! - Common installation paths
//! - SDKMAN

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use stratum_api::{JRE_CONTAINER_ID, RuntimeContainer};

static VERSION_IN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:jdk|java)-?(\d+(?:\.\d+)*)").expect("static regex"));

/// Runtime container for this machine. Resolved once per process.
pub fn runtime_container() -> RuntimeContainer {
    static CONTAINER: Lazy<RuntimeContainer> = Lazy::new(discover_runtime_container);
    CONTAINER.clone()
}

fn discover_runtime_container() -> RuntimeContainer {
    match find_jdk_home() {
        Some(home) => {
            let version = detect_jdk_version(&home);
            tracing::info!(
                "Runtime container: {} (version {})",
                home.display(),
                version.as_deref().unwrap_or("unknown")
            );
            RuntimeContainer {
                id: JRE_CONTAINER_ID.to_string(),
                home: Some(home),
                version,
            }
        }
        None => {
            tracing::warn!("No JDK found; runtime container left unresolved");
            RuntimeContainer::unresolved()
        }
    }
}

pub fn find_jdk_home() -> Option<PathBuf> {
    if let Ok(java_home) = std::env::var("JAVA_HOME") {
        let path = PathBuf::from(&java_home);
        if runtime_asset(&path).is_some() {
            return Some(path);
        }
    }

    #[cfg(target_os = "macos")]
    if let Ok(output) = std::process::Command::new("/usr/libexec/java_home").output() {
        if output.status.success() {
            let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
            if runtime_asset(&path).is_some() {
                return Some(path);
            }
        }
    }

    let mut search_roots = Vec::new();

    #[cfg(target_os = "macos")]
    {
        search_roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines/"));
        search_roots.push(PathBuf::from("/opt/homebrew/opt/openjdk/"));
        search_roots.push(PathBuf::from("/usr/local/opt/openjdk/"));
    }
    #[cfg(target_os = "linux")]
    {
        search_roots.push(PathBuf::from("/usr/lib/jvm/"));
    }
    #[cfg(target_os = "windows")]
    {
        search_roots.push(PathBuf::from("C:\\Program Files\\Java\\"));
    }

    if let Some(mut sdkman) = dirs::home_dir() {
        sdkman.push(".sdkman/candidates/java/");
        search_roots.push(sdkman);
    }

    search_roots
        .iter()
        .filter(|root| root.exists())
        .find_map(|root| find_in_root(root))
}

/// A root is either a JDK itself (Homebrew symlink) or a directory of JDKs.
fn find_in_root(root: &Path) -> Option<PathBuf> {
    if runtime_asset(root).is_some() {
        return Some(root.to_path_buf());
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if cfg!(target_os = "macos") && path.join("Contents/Home").exists() {
                path.join("Contents/Home")
            } else {
                path
            }
        })
        .collect();
    // read_dir order is unspecified
    candidates.sort();
    candidates
        .into_iter()
        .find(|candidate| runtime_asset(candidate).is_some())
}

/// Runtime image of a JDK home: `lib/modules` (9+), `rt.jar` (8), or a `jmods` directory.
pub fn runtime_asset(home: &Path) -> Option<PathBuf> {
    if !home.exists() {
        return None;
    }

    let modules = home.join("lib/modules");
    if modules.exists() {
        return Some(modules);
    }

    for rt in ["jre/lib/rt.jar", "lib/rt.jar"] {
        let rt_jar = home.join(rt);
        if rt_jar.exists() {
            return Some(rt_jar);
        }
    }

    let jmods = home.join("jmods");
    let has_jmod = std::fs::read_dir(&jmods)
        .map(|entries| {
            entries
                .flatten()
                .any(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jmod"))
        })
        .unwrap_or(false);
    has_jmod.then_some(jmods)
}

pub fn detect_jdk_version(jdk_root: &Path) -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(jdk_root.join("release")) {
        for line in content.lines() {
            if let Some(value) = line.strip_prefix("JAVA_VERSION=") {
                return Some(value.trim_matches('"').to_string());
            }
        }
    }

    let path_str = jdk_root.to_string_lossy();
    VERSION_IN_PATH
        .captures(&path_str)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
