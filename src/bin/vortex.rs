//! Vortex - Game Artifact CLI
//!
//! Packs a project directory into a single artifact and inspects or
//! test-loads artifacts.
//!
//! ## Usage
//!
//! ```sh
//! vortex pack <project-dir> [--out <dir>] [--minify]
//! vortex inspect <artifact>
//! vortex run <artifact> [--digest <sha256:hex>] [--debug]
//! vortex version
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vortex::{
    Artifact, ConcatBundler, Container, FileSource, HeadlessHost, LoadOptions, Loader,
    NativeRegistry, PackageOptions, Packager, Vfs,
};

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    Pack {
        project: PathBuf,
        out: PathBuf,
        minify: bool,
    },
    Inspect {
        artifact: PathBuf,
    },
    Run {
        artifact: PathBuf,
        digest: Option<String>,
        debug: bool,
    },
    Version,
    Help,
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "pack" => {
            if args.len() < 3 {
                return Err("pack requires <project-dir>".to_string());
            }
            let project = PathBuf::from(&args[2]);
            let mut out = PathBuf::from(".");
            let mut minify = false;
            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--out" | "-o" => {
                        if i + 1 < args.len() {
                            out = PathBuf::from(&args[i + 1]);
                            i += 2;
                        } else {
                            return Err("--out requires a path".to_string());
                        }
                    }
                    "--minify" | "-m" => {
                        minify = true;
                        i += 1;
                    }
                    other => return Err(format!("unknown option: {}", other)),
                }
            }
            Ok(Command::Pack {
                project,
                out,
                minify,
            })
        }
        "inspect" => {
            if args.len() < 3 {
                return Err("inspect requires <artifact>".to_string());
            }
            Ok(Command::Inspect {
                artifact: PathBuf::from(&args[2]),
            })
        }
        "run" => {
            if args.len() < 3 {
                return Err("run requires <artifact>".to_string());
            }
            let artifact = PathBuf::from(&args[2]);
            let mut digest = None;
            let mut debug = false;
            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--digest" => {
                        if i + 1 < args.len() {
                            digest = Some(args[i + 1].clone());
                            i += 2;
                        } else {
                            return Err("--digest requires a value".to_string());
                        }
                    }
                    "--debug" => {
                        debug = true;
                        i += 1;
                    }
                    other => return Err(format!("unknown option: {}", other)),
                }
            }
            Ok(Command::Run {
                artifact,
                digest,
                debug,
            })
        }
        "version" | "--version" | "-V" => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {}", other)),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {}", e))
}

fn cmd_pack(project: PathBuf, out: PathBuf, minify: bool) -> Result<(), String> {
    let vfs = Vfs::from_dir(&project).map_err(|e| e.to_string())?;
    let packager = Packager::with_options(Arc::new(ConcatBundler::new()), PackageOptions { minify });

    let artifact = runtime()?
        .block_on(packager.package(&vfs))
        .map_err(|e| e.to_string())?;
    let path = artifact.write_to(&out).map_err(|e| e.to_string())?;

    eprintln!(
        "Packed {} ({} assets, {} bytes)",
        path.display(),
        artifact.manifest.paths().len(),
        artifact.bytes.len()
    );
    println!("{}", artifact.digest);
    Ok(())
}

fn cmd_inspect(artifact: PathBuf) -> Result<(), String> {
    let bytes = std::fs::read(&artifact)
        .map_err(|e| format!("failed to read {}: {}", artifact.display(), e))?;
    let container = Container::decode(&bytes).map_err(|e| e.to_string())?;

    let assets: Vec<serde_json::Value> = container
        .assets
        .iter()
        .map(|(path, data)| serde_json::json!({ "path": path, "size": data.len() }))
        .collect();
    let report = serde_json::json!({
        "version": container.manifest.version(),
        "digest": Artifact::compute_digest(&bytes),
        "compressedSize": bytes.len(),
        "bundleSize": container.bundle.len(),
        "assets": assets,
    });

    let json = serde_json::to_string_pretty(&report).map_err(|e| format!("serialize: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_run(artifact: PathBuf, digest: Option<String>, debug: bool) -> Result<(), String> {
    let host = Arc::new(HeadlessHost::new());
    let loader = Loader::new(
        host.clone(),
        Arc::new(NativeRegistry::new()),
        LoadOptions {
            debug,
            expected_digest: digest,
            ..LoadOptions::default()
        },
    );

    let session = runtime()?
        .block_on(loader.launch(&FileSource::new(&artifact)))
        .map_err(|e| e.to_string())?;

    eprintln!(
        "Loaded {} (version {}, bundle {} bytes)",
        artifact.display(),
        session.version(),
        host.last_bundle_len()
    );
    Ok(())
}

fn cmd_version() {
    println!("vortex version {}", env!("CARGO_PKG_VERSION"));
    println!("format: {}", vortex::FORMAT_VERSION);
}

fn cmd_help() {
    println!(
        r#"vortex - single-artifact game packager

USAGE:
    vortex <command> [options]

COMMANDS:
    pack <project-dir>     Package a project into an artifact
    inspect <artifact>     Show manifest and entry sizes (JSON)
    run <artifact>         Decode and load an artifact headlessly
    version                Show version info
    help                   Show this help

OPTIONS:
    --out, -o <dir>        Output directory for pack (default: current dir)
    --minify, -m           Ask the bundler to minify
    --digest <sha256:hex>  Refuse to run an artifact with another digest
    --debug                Set the session debug flag

EXAMPLES:
    vortex pack ./my-game --out ./dist
    vortex inspect ./dist/MyGame.vortex
    vortex run ./dist/MyGame.vortex --digest sha256:...
"#
    );
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match parse_args() {
        Ok(cmd) => {
            let result = match cmd {
                Command::Pack {
                    project,
                    out,
                    minify,
                } => cmd_pack(project, out, minify),
                Command::Inspect { artifact } => cmd_inspect(artifact),
                Command::Run {
                    artifact,
                    digest,
                    debug,
                } => cmd_run(artifact, digest, debug),
                Command::Version => {
                    cmd_version();
                    Ok(())
                }
                Command::Help => {
                    cmd_help();
                    Ok(())
                }
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            cmd_help();
            ExitCode::FAILURE
        }
    }
}
