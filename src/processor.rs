//! Core generation orchestration for sourcegen.
//! Drives guard evaluation, output path resolution, fragment composition,
//! and atomic writes for every manifest entry.

use crate::composer::compose;
use crate::config::VariableMap;
use crate::constants::TEMP_FILE_PREFIX;
use crate::error::{Error, Result};
use crate::loader::TemplateLoader;
use crate::manifest::{Guard, Manifest, ManifestEntry};
use crate::resolver::{ensure_parent_dir, resolve_output_path, PathRegistry};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters for one generator run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Files written (or, on a dry run, files that would have been written)
    pub written: usize,
    /// Entries skipped because their guard evaluated false
    pub skipped: usize,
    /// Whether the run stopped early on the cancellation flag
    pub cancelled: bool,
}

/// Cooperative cancellation handle.
///
/// Checked between manifest entries; an in-flight entry runs to completion
/// before the run stops.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives end-to-end generation for one manifest.
///
/// The run happens in two phases: first every selected entry's output path
/// is resolved and claimed, so collisions and path escapes are caught before
/// anything touches the disk; then entries are composed and written. A
/// failing entry aborts the run, leaving earlier outputs in place.
pub struct Processor<'a> {
    loader: &'a TemplateLoader,
    variables: &'a VariableMap,
    out_root: PathBuf,
    dry_run: bool,
    jobs: usize,
    cancel: CancelFlag,
}

impl<'a> Processor<'a> {
    pub fn new(
        loader: &'a TemplateLoader,
        variables: &'a VariableMap,
        out_root: impl Into<PathBuf>,
        dry_run: bool,
        jobs: usize,
    ) -> Self {
        Self {
            loader,
            variables,
            out_root: out_root.into(),
            dry_run,
            jobs: jobs.max(1),
            cancel: CancelFlag::new(),
        }
    }

    /// Returns a handle that cancels the run between entries.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs generation over the whole manifest.
    pub fn run(&self, manifest: &Manifest) -> Result<RunSummary> {
        let mut registry = PathRegistry::new();
        let mut planned: Vec<(&ManifestEntry, PathBuf)> = Vec::new();
        let mut skipped = 0usize;

        for entry in &manifest.entries {
            if entry.fragments.is_empty() {
                return Err(Error::EmptyFragmentList { output: entry.output.clone() });
            }
            let selected = match &entry.when {
                Some(expression) => Guard::parse(expression)?.eval(self.variables)?,
                None => true,
            };
            if !selected {
                debug!(
                    "Skipping entry \"{}\": guard '{}' is false",
                    entry.output,
                    entry.when.as_deref().unwrap_or_default()
                );
                skipped += 1;
                continue;
            }
            let path = resolve_output_path(&self.out_root, &manifest.origin, entry, self.variables)?;
            registry.claim(&path, &entry.output)?;
            planned.push((entry, path));
        }

        if self.jobs > 1 {
            self.run_parallel(&planned, skipped)
        } else {
            self.run_sequential(&planned, skipped)
        }
    }

    fn run_sequential(
        &self,
        planned: &[(&ManifestEntry, PathBuf)],
        skipped: usize,
    ) -> Result<RunSummary> {
        let mut written = 0usize;
        let mut cancelled = false;

        for (entry, path) in planned {
            if self.cancel.is_cancelled() {
                debug!("Run cancelled after {} entries", written);
                cancelled = true;
                break;
            }
            self.emit(entry, path)?;
            written += 1;
        }

        Ok(RunSummary { written, skipped, cancelled })
    }

    /// Processes entries on scoped worker threads.
    ///
    /// Indices are pulled from a shared counter in manifest order; after a
    /// failure no new entries are started, and the first failure in manifest
    /// order is the one reported.
    fn run_parallel(
        &self,
        planned: &[(&ManifestEntry, PathBuf)],
        skipped: usize,
    ) -> Result<RunSummary> {
        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let results: Mutex<Vec<Option<Result<()>>>> =
            Mutex::new((0..planned.len()).map(|_| None).collect());
        let workers = self.jobs.min(planned.len().max(1));

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if failed.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= planned.len() {
                        break;
                    }
                    let (entry, path) = &planned[index];
                    let result = self.emit(entry, path);
                    if result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    results.lock().unwrap()[index] = Some(result);
                });
            }
        });

        let mut written = 0usize;
        for slot in results.lock().unwrap().iter_mut() {
            match slot.take() {
                Some(Ok(())) => written += 1,
                Some(Err(error)) => return Err(error),
                None => {}
            }
        }

        Ok(RunSummary { written, skipped, cancelled: self.cancel.is_cancelled() })
    }

    /// Composes one entry and writes it to its resolved path.
    fn emit(&self, entry: &ManifestEntry, path: &Path) -> Result<()> {
        let body = compose(self.loader, &entry.fragments, self.variables)?;

        if self.dry_run {
            println!("Planned: '{}'", path.display());
            return Ok(());
        }

        ensure_parent_dir(path)?;
        write_atomic(path, body.as_bytes())?;
        println!("Generated: '{}'", path.display());
        Ok(())
    }
}

/// Writes the body to a sibling temporary file, syncs it, and renames it
/// over the target, so a crashed run never leaves a torn file at the target
/// path.
fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let write_failed = |e: std::io::Error| Error::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(directory)
        .map_err(write_failed)?;

    temp.write_all(body).map_err(write_failed)?;
    temp.as_file().sync_all().map_err(write_failed)?;
    temp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
