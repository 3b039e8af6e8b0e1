//! CLI entrypoint for the libcbind conformance harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;

use libcbind_abi::{BINDINGS, Ownership, audit, check_mode};
use libcbind_harness::structured_log::{ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome};
use libcbind_harness::{FixtureSet, Probe, TestRunner, VerificationSummary};

/// Conformance tooling for libcbind.
#[derive(Debug, Parser)]
#[command(name = "harness")]
#[command(about = "Conformance testing harness for the libc bindings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the bindings against fixture files.
    Verify {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// Probe executable (defaults to the one next to this binary).
        #[arg(long)]
        probe: Option<PathBuf>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// JSON report output path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Artifact index output path (hashes of log and report).
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Run identifier used in trace ids.
        #[arg(long, default_value = "local")]
        run_id: String,
    },
    /// Print the binding table as JSON.
    Bindings,
    /// Resolve every bound symbol in the running process and print the result as JSON.
    Audit,
}

fn load_fixture_sets(fixture: &Path) -> Result<Vec<FixtureSet>, Box<dyn std::error::Error>> {
    if fixture.is_file() {
        return Ok(vec![FixtureSet::from_file(fixture)?]);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(fixture)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();

    // A fixture that fails to load would silently drop its cases.
    let mut sets = Vec::with_capacity(paths.len());
    for path in paths {
        let set = FixtureSet::from_file(&path)
            .map_err(|err| format!("Invalid fixture {}: {err}", path.display()))?;
        sets.push(set);
    }
    if sets.is_empty() {
        return Err(format!("No fixture JSON files found in {}", fixture.display()).into());
    }
    Ok(sets)
}

fn ownership_name(ownership: Ownership) -> &'static str {
    match ownership {
        Ownership::BorrowedForCall => "borrowed_for_call",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            probe,
            log,
            report,
            artifact_index,
            run_id,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let sets = load_fixture_sets(&fixture)?;

            let probe = match probe {
                Some(path) => Probe::new(path),
                None => Probe::sibling_of_current_exe()?,
            };
            let runner = TestRunner::new("fixture-verify").with_probe(probe);

            let mut results = Vec::new();
            match &log {
                Some(log_path) => {
                    if let Some(parent) = log_path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let mut emitter = LogEmitter::to_file(log_path, "fixture-verify", &run_id)?;
                    emitter.emit_entry(
                        LogEntry::new(
                            String::new(),
                            LogLevel::Info,
                            "run_start",
                        )
                        .with_mode(check_mode().as_str()),
                    )?;
                    for set in &sets {
                        results.extend(runner.run_logged(set, &mut emitter)?);
                    }
                    let failed = results.iter().filter(|r| !r.passed).count();
                    let artifacts = report
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect();
                    emitter.emit_entry(
                        LogEntry::new(
                            String::new(),
                            if failed == 0 {
                                LogLevel::Info
                            } else {
                                LogLevel::Error
                            },
                            "run_end",
                        )
                        .with_outcome(if failed == 0 {
                            Outcome::Pass
                        } else {
                            Outcome::Fail
                        })
                        .with_artifacts(artifacts)
                        .with_details(json!({"total": results.len(), "failed": failed})),
                    )?;
                    emitter.flush()?;
                }
                None => {
                    for set in &sets {
                        results.extend(runner.run(set));
                    }
                }
            }

            results.sort_by(|a, b| {
                a.function
                    .cmp(&b.function)
                    .then_with(|| a.case_name.cmp(&b.case_name))
            });
            let summary = VerificationSummary::from_results(results);

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                summary.total, summary.passed, summary.failed
            );
            for failure in summary.results.iter().filter(|r| !r.passed) {
                eprintln!("FAIL {} ({})", failure.case_name, failure.function);
                if let Some(diff) = &failure.diff {
                    eprintln!("{diff}");
                }
            }

            if let Some(report_path) = &report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(report_path, serde_json::to_string_pretty(&summary)?)?;
            }

            if let Some(index_path) = artifact_index {
                let mut index = ArtifactIndex::new(&run_id);
                if let Some(log_path) = &log {
                    index.add_file(log_path, "log")?;
                }
                if let Some(report_path) = &report {
                    index.add_file(report_path, "report")?;
                }
                std::fs::write(&index_path, index.to_json()?)?;
            }

            if !summary.all_passed() {
                return Err("Conformance verification failed".into());
            }
        }
        Command::Bindings => {
            let table: Vec<_> = BINDINGS
                .iter()
                .map(|decl| {
                    json!({
                        "local_name": decl.local_name,
                        "native_symbol": decl.native_symbol,
                        "signature": decl.signature.to_string(),
                        "variadic": decl.signature.variadic,
                        "ownership": ownership_name(decl.ownership),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Command::Audit => {
            let reports = audit();
            let table: Vec<_> = reports
                .iter()
                .map(|report| {
                    json!({
                        "local_name": report.local_name,
                        "native_symbol": report.native_symbol,
                        "resolved": report.is_resolved(),
                        "address": report.resolved.as_ref().map(|r| format!("{:#x}", r.address)),
                        "object": report.resolved.as_ref().and_then(|r| r.object.clone()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
            if reports.iter().any(|r| !r.is_resolved()) {
                return Err("Unresolved bound symbols".into());
            }
        }
    }

    Ok(())
}
