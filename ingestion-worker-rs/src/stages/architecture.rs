//! Architecture scanner
//!
//! Picks the files that describe how a repository is built and run, fetches
//! them, and tags each with a language, a structural role and a handful of
//! content signals.

use github_sdk::models::ContentItem;
use github_sdk::{GitHubClient, RepoRef, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::model::{ArchitectureFileRecord, FileRole, Signals};

pub const MAX_CONTENT_CHARS: usize = 25_000;
pub const TRUNCATION_MARKER: &str = "\n\n... [CONTENT TRUNCATED FOR TOKEN EFFICIENCY] ...";

/// Root-level file names that define the architecture skeleton
static ROOT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^README(\.md|\.txt|\.rst)?$",
        r"(?i)^package\.json$",
        r"(?i)^tsconfig.*\.json$",
        r"(?i)^go\.mod$",
        r"(?i)^Cargo\.toml$",
        r"(?i)^Dockerfile.*$",
        r"(?i)^docker-compose.*\.y(a)?ml$",
        r"(?i).*\.config\.(js|ts|mjs|cjs|json)$",
        r"(?i)^\.eslintrc\.(json|js|yml)$",
        r"(?i)^requirements\.txt$",
        r"(?i)^pyproject\.toml$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Paths fetched even though they are not at the root
pub const KNOWN_DEEP_FILES: [&str; 3] = [".github/workflows/main.yml", "src/app.ts", "cmd/main.go"];

const USELESS_SUFFIXES: [&str; 9] = [".lock", ".sum", ".exe", ".bin", ".pyc", ".png", ".jpg", ".svg", ".pdf"];
const USELESS_NAMES: [&str; 2] = ["package-lock.json", "pnpm-lock.yaml"];

const DEPENDENCY_MANIFESTS: [&str; 6] = [
    "package.json",
    "go.mod",
    "requirements.txt",
    "pyproject.toml",
    "pom.xml",
    "cargo.toml",
];

type PathRule = fn(&str) -> bool;

/// Role rules over the lowercased path, first match wins
pub const ROLE_RULES: [(FileRole, PathRule); 9] = [
    (FileRole::Documentation, |p| {
        p.starts_with("readme") || p.ends_with(".md") || p.contains("docs/")
    }),
    (FileRole::CiPipeline, |p| {
        p.contains(".github/workflows") || (p.contains("ci") && p.ends_with(".yml"))
    }),
    (FileRole::RuntimeConfig, |p| p.contains("dockerfile")),
    (FileRole::RuntimeOrchestration, |p| {
        p.contains("docker-compose") || p.contains("compose.")
    }),
    (FileRole::DependencyManifest, |p| DEPENDENCY_MANIFESTS.contains(&p)),
    (FileRole::BuildConfig, |p| {
        ["tsconfig", "babel", "webpack", "vite", "rollup", "jest", "eslint", "prettier"]
            .iter()
            .any(|n| p.contains(n))
    }),
    (FileRole::InfraConfig, |p| {
        p.contains("terraform")
            || p.ends_with(".tf")
            || p.contains("helm")
            || p.ends_with("chart.yaml")
            || p.contains("k8s")
            || p.contains("kubernetes")
    }),
    (FileRole::Entrypoint, |p| {
        ["main.go", "app.go", "server.go", "index.js", "index.ts", "app.ts", "app.js"]
            .iter()
            .any(|s| p.ends_with(s))
    }),
    (FileRole::TestConfig, |p| {
        p.contains("test") && [".js", ".ts", ".go"].iter().any(|s| p.ends_with(s))
    }),
];

/// Total over all paths; unmatched paths are plain `config`
pub fn detect_role(path: &str) -> FileRole {
    let p = path.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|(_, rule)| rule(&p))
        .map(|(role, _)| *role)
        .unwrap_or(FileRole::Config)
}

const LANGUAGE_RULES: [(&str, PathRule); 9] = [
    ("TypeScript", |n| n.ends_with(".ts") || n.ends_with(".tsx") || n.contains("tsconfig")),
    ("Go", |n| n.ends_with(".go") || n == "go.mod"),
    ("JavaScript", |n| {
        n.ends_with(".js") || n.ends_with(".mjs") || n.ends_with(".cjs") || n == "package.json"
    }),
    ("Python", |n| {
        n.ends_with(".py") || n == "requirements.txt" || n == "pyproject.toml"
    }),
    ("Rust", |n| n.ends_with(".rs") || n == "cargo.toml"),
    ("Docker", |n| n.contains("docker")),
    ("YAML", |n| n.ends_with(".yml") || n.ends_with(".yaml")),
    ("TOML", |n| n.ends_with(".toml")),
    ("Markdown", |n| n.ends_with(".md")),
];

pub fn detect_language(name: &str) -> &'static str {
    let n = name.to_lowercase();
    LANGUAGE_RULES
        .iter()
        .find(|(_, rule)| rule(&n))
        .map(|(language, _)| *language)
        .unwrap_or("Config")
}

/// Lock files, binaries and images carry no architecture information
pub fn is_useless(path: &str) -> bool {
    let p = path.to_lowercase();
    USELESS_NAMES.contains(&p.as_str()) || USELESS_SUFFIXES.iter().any(|s| p.ends_with(s))
}

/// Cut to `limit` characters and append the marker when content is longer
pub fn truncate_with_flag(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => (format!("{}{}", &text[..cut], TRUNCATION_MARKER), true),
        None => (text.to_string(), false),
    }
}

/// Lightweight facts mined from file content
pub fn extract_signals(path: &str, content: &str) -> Option<Signals> {
    let p = path.to_lowercase();
    let c = content.to_lowercase();
    let mut signals = Signals::new();

    if p.contains("dockerfile") {
        if c.contains("node") {
            signals.insert("runtime".into(), Value::from("node"));
        }
        if c.contains("python") {
            signals.insert("runtime".into(), Value::from("python"));
        }
        if c.contains("expose") {
            signals.insert("exposes_port".into(), Value::from(true));
        }
    }

    if p == "package.json" {
        if c.contains("\"express\"") {
            signals.insert("framework".into(), Value::from("express"));
        }
        if c.contains("\"jest\"") {
            signals.insert("test_runner".into(), Value::from("jest"));
        }
    }

    if p == "cargo.toml" {
        if c.contains("axum") {
            signals.insert("framework".into(), Value::from("axum"));
        } else if c.contains("actix-web") {
            signals.insert("framework".into(), Value::from("actix"));
        }
    }

    if p == "go.mod" {
        if let Some(version) = c.lines().find_map(|l| l.trim().strip_prefix("go ")) {
            signals.insert("go_version".into(), Value::from(version.trim()));
        }
    }

    if p.starts_with("readme") {
        if c.contains("backend") {
            signals.insert("project_type".into(), Value::from("backend"));
        }
        if c.contains("payment") {
            signals.insert("domain".into(), Value::from("payments"));
        }
    }

    (!signals.is_empty()).then_some(signals)
}

/// Root matches first, then known deep paths not already present. Useless
/// files are removed before anything is fetched.
pub fn select_targets(root: &[ContentItem]) -> Vec<String> {
    let mut targets: Vec<String> = root
        .iter()
        .filter(|item| item.is_file())
        .filter(|item| ROOT_PATTERNS.iter().any(|re| re.is_match(&item.name)))
        .map(|item| item.path.clone())
        .collect();

    for deep in KNOWN_DEEP_FILES {
        if !targets.iter().any(|t| t == deep) {
            targets.push(deep.to_string());
        }
    }

    targets.retain(|t| !is_useless(t));
    targets
}

fn to_record(item: ContentItem, raw: &str) -> ArchitectureFileRecord {
    let (content, is_truncated) = truncate_with_flag(raw, MAX_CONTENT_CHARS);
    let role = detect_role(&item.path);
    ArchitectureFileRecord {
        language: detect_language(&item.name).to_string(),
        importance: role.importance(),
        signals: extract_signals(&item.path, &content),
        html_url: item.html_url.unwrap_or_default(),
        path: item.path,
        name: item.name,
        content,
        size: item.size,
        role,
        is_truncated,
    }
}

pub async fn scan_architecture(client: &GitHubClient, repo: &RepoRef) -> Result<Vec<ArchitectureFileRecord>> {
    info!("architecture scan for {}", repo);

    let root = client.list_directory(repo, "").await?;
    let targets = select_targets(&root);
    let mut out = Vec::with_capacity(targets.len());

    for path in targets {
        let item = match client.get_file(repo, &path).await {
            Ok(item) => item,
            Err(e) if e.is_not_found() => {
                debug!("{} not present", path);
                continue;
            }
            Err(e) => {
                warn!("{}", PipelineError::degraded("architecture", format!("{} skipped: {}", path, e)));
                continue;
            }
        };

        let raw = match item.decoded_content() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}", PipelineError::degraded("architecture", format!("{} undecodable: {}", path, e)));
                continue;
            }
        };

        debug!("indexed {} ({} bytes)", item.path, item.size);
        out.push(to_record(item, &raw));
    }

    info!("architecture scan completed for {} | files={}", repo, out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: &str) -> ContentItem {
        ContentItem {
            name: name.to_string(),
            path: name.to_string(),
            kind: kind.to_string(),
            size: 10,
            html_url: None,
            content: None,
            encoding: None,
        }
    }

    #[test]
    fn test_role_detection() {
        assert_eq!(detect_role(".github/workflows/ci.yml"), FileRole::CiPipeline);
        assert_eq!(detect_role("Dockerfile"), FileRole::RuntimeConfig);
        assert_eq!(detect_role("package.json"), FileRole::DependencyManifest);
        assert_eq!(detect_role("foo.cfg"), FileRole::Config);
    }

    #[test]
    fn test_role_precedence() {
        assert_eq!(detect_role("README.md"), FileRole::Documentation);
        assert_eq!(detect_role("docs/Dockerfile"), FileRole::Documentation);
        assert_eq!(detect_role("docker-compose.yml"), FileRole::RuntimeOrchestration);
        assert_eq!(detect_role("Dockerfile.compose.dev"), FileRole::RuntimeConfig);
        assert_eq!(detect_role("tsconfig.json"), FileRole::BuildConfig);
        assert_eq!(detect_role("jest.config.ts"), FileRole::BuildConfig);
        assert_eq!(detect_role("infra/main.tf"), FileRole::InfraConfig);
        assert_eq!(detect_role("cmd/main.go"), FileRole::Entrypoint);
        assert_eq!(detect_role("src/app.ts"), FileRole::Entrypoint);
        assert_eq!(detect_role("pkg/store_test.go"), FileRole::TestConfig);
        assert_eq!(detect_role("Cargo.toml"), FileRole::DependencyManifest);
    }

    #[test]
    fn test_importance_per_role() {
        assert_eq!(FileRole::Entrypoint.importance(), 1.0);
        assert_eq!(FileRole::RuntimeOrchestration.importance(), 0.9);
        assert_eq!(FileRole::CiPipeline.importance(), 0.85);
        assert_eq!(FileRole::Config.importance(), 0.4);
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(detect_language("tsconfig.base.json"), "TypeScript");
        assert_eq!(detect_language("go.mod"), "Go");
        assert_eq!(detect_language("package.json"), "JavaScript");
        assert_eq!(detect_language("Cargo.toml"), "Rust");
        assert_eq!(detect_language("docker-compose.yml"), "Docker");
        assert_eq!(detect_language("main.yml"), "YAML");
        assert_eq!(detect_language("pyproject.toml"), "Python");
        assert_eq!(detect_language("rustfmt.toml"), "TOML");
        assert_eq!(detect_language("README.md"), "Markdown");
        assert_eq!(detect_language(".eslintrc.json"), "Config");
    }

    #[test]
    fn test_truncation() {
        let long = "x".repeat(30_000);
        let (content, truncated) = truncate_with_flag(&long, MAX_CONTENT_CHARS);
        assert!(truncated);
        assert_eq!(content.len(), MAX_CONTENT_CHARS + TRUNCATION_MARKER.len());
        assert!(content.ends_with(TRUNCATION_MARKER));

        let short = "y".repeat(10_000);
        let (content, truncated) = truncate_with_flag(&short, MAX_CONTENT_CHARS);
        assert!(!truncated);
        assert_eq!(content, short);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let text = "é".repeat(5);
        let (content, truncated) = truncate_with_flag(&text, 3);
        assert!(truncated);
        assert!(content.starts_with("ééé\n"));
    }

    #[test]
    fn test_target_selection() {
        let root = vec![
            entry("README.md", "file"),
            entry("package.json", "file"),
            entry("package-lock.json", "file"),
            entry("src", "dir"),
            entry("vite.config.ts", "file"),
            entry("notes.txt", "file"),
        ];

        let targets = select_targets(&root);
        assert_eq!(
            targets,
            vec![
                "README.md",
                "package.json",
                "vite.config.ts",
                ".github/workflows/main.yml",
                "src/app.ts",
                "cmd/main.go",
            ]
        );
    }

    #[test]
    fn test_useless_files() {
        assert!(is_useless("yarn.lock"));
        assert!(is_useless("go.sum"));
        assert!(is_useless("docs/logo.PNG"));
        assert!(!is_useless("go.mod"));
    }

    #[test]
    fn test_signals() {
        let docker = extract_signals("Dockerfile", "FROM node:20\nEXPOSE 8080").unwrap();
        assert_eq!(docker["runtime"], Value::from("node"));
        assert_eq!(docker["exposes_port"], Value::from(true));

        let package = extract_signals("package.json", r#"{"dependencies":{"express":"4"},"devDependencies":{"jest":"29"}}"#).unwrap();
        assert_eq!(package["framework"], Value::from("express"));
        assert_eq!(package["test_runner"], Value::from("jest"));

        let gomod = extract_signals("go.mod", "module example.com/app\n\ngo 1.22\n").unwrap();
        assert_eq!(gomod["go_version"], Value::from("1.22"));

        let readme = extract_signals("README.md", "A backend for payment processing").unwrap();
        assert_eq!(readme["project_type"], Value::from("backend"));
        assert_eq!(readme["domain"], Value::from("payments"));

        assert!(extract_signals("foo.cfg", "anything").is_none());
    }
}
