//! Bundler plugin contract.
//!
//! The packager does not transpile or minify scripts itself. It drives an
//! external [`Bundler`] and supplies the two hooks the bundler needs to see
//! the virtual filesystem:
//!
//! - **resolve**: `(import, importer)` → resolved path or external marker
//! - **load**: resolved path → contents plus a [`SourceKind`]
//!
//! Hooks report failure as a list of [`Message`]s, the same shape bundlers
//! use for their own diagnostics, so every problem in a build surfaces in
//! one aggregated error.
//!
//! [`ConcatBundler`] is a minimal built-in implementation used by the CLI
//! and tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Hook Types
// =============================================================================

/// A diagnostic reported by a hook or the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Human-readable text.
    pub text: String,
}

impl Message {
    /// Creates a message.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Outcome of a hook: a value, or the diagnostics explaining why not.
pub type HookResult<T> = std::result::Result<T, Vec<Message>>;

/// Arguments passed to the resolve hook.
#[derive(Debug, Clone)]
pub struct ResolveArgs {
    /// Import specifier as written.
    pub path: String,
    /// Resolved path of the importing file; `None` for entry points.
    pub importer: Option<String>,
}

/// Result of the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Resolved path, or the original specifier for externals.
    pub path: String,
    /// External imports are left in the output for the runtime to resolve.
    pub external: bool,
}

/// How the bundler should interpret loaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// JavaScript (`.js`, `.jsx`).
    Script,
    /// TypeScript (`.ts`, `.tsx`).
    TypedScript,
    /// JSON data (`.json`).
    Json,
    /// Stylesheet (`.css`).
    Stylesheet,
    /// Plain text (`.txt`).
    Text,
    /// Anything else; the bundler's default handling.
    Binary,
}

impl SourceKind {
    /// Selects a kind from a path's extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("");
        match ext {
            "ts" | "tsx" => Self::TypedScript,
            "js" | "jsx" => Self::Script,
            "json" => Self::Json,
            "css" => Self::Stylesheet,
            "txt" => Self::Text,
            _ => Self::Binary,
        }
    }

    /// Returns true for kinds that can contain import statements.
    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script | Self::TypedScript)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script => write!(f, "js"),
            Self::TypedScript => write!(f, "ts"),
            Self::Json => write!(f, "json"),
            Self::Stylesheet => write!(f, "css"),
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "default"),
        }
    }
}

/// Result of the load hook.
#[derive(Debug, Clone)]
pub struct Loaded {
    /// File contents.
    pub contents: Arc<[u8]>,
    /// Interpretation hint.
    pub kind: SourceKind,
}

/// Hooks a bundler calls back into while building.
pub trait BundlerHooks: Send + Sync {
    /// Resolves an import specifier.
    fn resolve(&self, args: &ResolveArgs) -> HookResult<Resolved>;

    /// Loads a resolved, non-external path.
    fn load(&self, path: &str) -> HookResult<Loaded>;
}

// =============================================================================
// Bundler Trait
// =============================================================================

/// Parameters of a single build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Entry point path, already resolved against the scripts root.
    pub entry_point: String,
    /// Ask the bundler to minify.
    pub minify: bool,
    /// Output file name.
    pub outfile: String,
}

/// Output of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Bundled ES module code.
    pub code: Vec<u8>,
    /// All diagnostics; non-empty means the build failed.
    pub errors: Vec<Message>,
}

/// An engine that bundles scripts into a single ES module.
///
/// Implementations must route every module lookup through `hooks`; the
/// hooks enforce confinement and supply file contents.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Returns the bundler name.
    fn name(&self) -> &str;

    /// Bundles the graph reachable from `request.entry_point`.
    async fn build(&self, request: &BuildRequest, hooks: &dyn BundlerHooks) -> BuildOutput;
}

// =============================================================================
// Concat Bundler
// =============================================================================

/// Minimal bundler that concatenates scripts in dependency order.
///
/// Follows static `import … from "…"`, `import "…"` and `export … from "…"`
/// statements, including ones spanning several lines. Internal imports are
/// dropped from the output and replaced by the imported module's code,
/// emitted earlier; external imports are kept verbatim. Non-script modules
/// are resolved and loaded (so confinement and existence are still checked)
/// but not emitted. There is no transpilation and no minification.
///
/// Every `import(…)` call is resolved too. Only external dynamic imports are
/// kept; internal or non-literal ones are reported, as is any import
/// statement whose specifier cannot be read.
#[derive(Debug, Default, Clone)]
pub struct ConcatBundler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Import,
    Reexport,
}

impl ConcatBundler {
    /// Creates the bundler.
    pub fn new() -> Self {
        Self
    }

    /// Classifies a line that opens an import or re-export statement.
    fn statement_start(line: &str) -> Option<Statement> {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("import") {
            let opens = match rest.chars().next() {
                None => true,
                Some(c) => c.is_whitespace() || matches!(c, '{' | '*' | '"' | '\''),
            };
            return opens.then_some(Statement::Import);
        }
        let rest = trimmed.strip_prefix("export")?;
        let opens = rest.starts_with(char::is_whitespace)
            && rest.trim_start().starts_with(['{', '*']);
        opens.then_some(Statement::Reexport)
    }

    /// Returns the text after the last `from` keyword that is followed by a
    /// string literal.
    fn from_clause(text: &str) -> Option<&str> {
        text.rmatch_indices("from").find_map(|(idx, _)| {
            let before = text[..idx].chars().next_back()?;
            if !(before.is_whitespace() || before == '}' || before == '*') {
                return None;
            }
            let after = text[idx + "from".len()..].trim_start();
            after.starts_with(['"', '\'']).then_some(after)
        })
    }

    fn string_literal(text: &str) -> Option<&str> {
        let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let rest = &text[1..];
        rest.find(quote).map(|end| &rest[..end])
    }

    /// Extracts the module specifier from a complete import/export statement.
    fn import_specifier(statement: &str) -> Option<&str> {
        let trimmed = statement.trim_start();
        let tail = match Self::from_clause(trimmed) {
            Some(tail) => tail,
            None => trimmed.strip_prefix("import")?.trim_start(),
        };
        Self::string_literal(tail)
    }

    fn statement_complete(statement: &str) -> bool {
        statement.contains(';') || Self::import_specifier(statement).is_some()
    }

    /// Finds `import(…)` calls in a line. `None` marks a call whose argument
    /// is not a plain string literal.
    fn dynamic_imports(line: &str) -> Vec<Option<&str>> {
        line.match_indices("import")
            .filter_map(|(idx, _)| {
                let before = line[..idx].chars().next_back();
                if before.is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.')) {
                    return None;
                }
                let arg = line[idx + "import".len()..]
                    .trim_start()
                    .strip_prefix('(')?
                    .trim_start();
                Some(Self::string_literal(arg))
            })
            .collect()
    }

    fn check_dynamic(
        &self,
        line: &str,
        path: &str,
        hooks: &dyn BundlerHooks,
        state: &mut ConcatState,
    ) {
        for specifier in Self::dynamic_imports(line) {
            let Some(specifier) = specifier else {
                state.errors.push(Message::new(format!(
                    "{}: dynamic import with a non-literal specifier cannot be checked",
                    path
                )));
                continue;
            };

            let args = ResolveArgs {
                path: specifier.to_string(),
                importer: Some(path.to_string()),
            };
            match hooks.resolve(&args) {
                Ok(resolved) if resolved.external => {}
                Ok(resolved) => state.errors.push(Message::new(format!(
                    "{}: dynamic import of {} cannot be bundled, use a static import",
                    path, resolved.path
                ))),
                Err(errors) => state.errors.extend(errors),
            }
        }
    }

    fn link(
        &self,
        specifier: &str,
        path: &str,
        statement: &str,
        hooks: &dyn BundlerHooks,
        state: &mut ConcatState,
        body: &mut String,
    ) {
        let args = ResolveArgs {
            path: specifier.to_string(),
            importer: Some(path.to_string()),
        };
        match hooks.resolve(&args) {
            Ok(resolved) if resolved.external => {
                body.push_str(statement);
                body.push('\n');
            }
            Ok(resolved) => match hooks.load(&resolved.path) {
                Ok(loaded) => self.visit(&resolved.path, loaded.kind, &loaded.contents, hooks, state),
                Err(errors) => state.errors.extend(errors),
            },
            Err(errors) => state.errors.extend(errors),
        }
    }

    fn visit(
        &self,
        path: &str,
        kind: SourceKind,
        contents: &[u8],
        hooks: &dyn BundlerHooks,
        state: &mut ConcatState,
    ) {
        if !state.visited.insert(path.to_string()) {
            return;
        }
        if !kind.is_script() {
            return;
        }

        let source = String::from_utf8_lossy(contents);
        let lines: Vec<&str> = source.lines().collect();
        let mut body = String::new();
        let mut i = 0;

        while i < lines.len() {
            let Some(statement_kind) = Self::statement_start(lines[i]) else {
                self.check_dynamic(lines[i], path, hooks, state);
                body.push_str(lines[i]);
                body.push('\n');
                i += 1;
                continue;
            };

            let start = i;
            while !Self::statement_complete(&lines[start..=i].join("\n")) && i + 1 < lines.len() {
                i += 1;
            }
            i += 1;
            let statement = lines[start..i].join("\n");

            match (Self::import_specifier(&statement), statement_kind) {
                (Some(specifier), _) => {
                    self.link(specifier, path, &statement, hooks, state, &mut body)
                }
                // `export { a, b };` re-exports local bindings.
                (None, Statement::Reexport) => {
                    body.push_str(&statement);
                    body.push('\n');
                }
                (None, Statement::Import) => state.errors.push(Message::new(format!(
                    "{}:{}: cannot read module specifier of import statement",
                    path,
                    start + 1
                ))),
            }
        }

        state.output.push_str(&format!("// {}\n", path));
        state.output.push_str(&body);
    }
}

#[derive(Default)]
struct ConcatState {
    visited: HashSet<String>,
    output: String,
    errors: Vec<Message>,
}

#[async_trait]
impl Bundler for ConcatBundler {
    fn name(&self) -> &str {
        "concat"
    }

    async fn build(&self, request: &BuildRequest, hooks: &dyn BundlerHooks) -> BuildOutput {
        let mut state = ConcatState::default();

        let args = ResolveArgs {
            path: request.entry_point.clone(),
            importer: None,
        };
        match hooks.resolve(&args).and_then(|r| hooks.load(&r.path).map(|l| (r, l))) {
            Ok((resolved, loaded)) => {
                self.visit(&resolved.path, loaded.kind, &loaded.contents, hooks, &mut state)
            }
            Err(errors) => state.errors.extend(errors),
        }

        debug!(
            "concat bundler: {} modules, {} errors",
            state.visited.len(),
            state.errors.len()
        );

        BuildOutput {
            code: state.output.into_bytes(),
            errors: state.errors,
        }
    }
}
