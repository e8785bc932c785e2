use anyhow::{Context, Result};
use facematch_engine::{loader, Matcher, PairClass};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;
use crate::filelist;
use crate::storage::{self, OutputPaths, RunSummary};

/// One matching run: probe list against gallery list (or itself).
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub probe_list: PathBuf,
    pub gallery_list: Option<PathBuf>,
    pub output: PathBuf,
    pub group: String,
    pub config: Config,
}

/// Load, classify, score and persist.
///
/// Nothing is written to the output directory unless the configuration is
/// valid, every feature file loads and the match matrix fits the configured
/// cell budget.
pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    let start = Instant::now();
    let cfg = &opts.config;
    cfg.validate()?;

    let probe_files = filelist::read(&opts.probe_list, cfg.sort_inputs)?;
    let gallery_files = opts
        .gallery_list
        .as_deref()
        .map(|path| filelist::read(path, cfg.sort_inputs))
        .transpose()?;

    std::fs::create_dir_all(&opts.output)
        .with_context(|| format!("creating output directory {}", opts.output.display()))?;

    let workers = cfg.workers();
    log::info!("Collecting features ({} dataset)...", cfg.dataset);
    let probe = loader::load(&probe_files, cfg.dataset, workers)
        .with_context(|| format!("loading probe list {}", opts.probe_list.display()))?;

    let gallery = match (&opts.gallery_list, gallery_files) {
        (Some(list), Some(files)) => {
            log::info!(
                "Matching {} to {}",
                opts.probe_list.display(),
                list.display()
            );
            let set = loader::load(&files, cfg.dataset, workers)
                .with_context(|| format!("loading gallery list {}", list.display()))?;
            Some(set)
        }
        _ => {
            log::info!(
                "Matching {} to {}",
                opts.probe_list.display(),
                opts.probe_list.display()
            );
            None
        }
    };

    let matcher = Matcher::new(probe, gallery, cfg.max_cells)?;
    let scores = matcher.score();

    let paths = OutputPaths::new(&opts.output, &opts.group, cfg.format);
    for (class, path) in [
        (PairClass::Genuine, paths.genuine()),
        (PairClass::Impostor, paths.impostor()),
    ] {
        let pairs = matcher.pairs(&scores, class, cfg.precision);
        storage::save_scores(&path, matcher.count(class), pairs, cfg.format)?;
    }
    storage::save_labels(&paths.labels(), matcher.probe().labels())?;
    if !matcher.probe_equals_gallery() {
        storage::save_labels(&paths.gallery_labels(), matcher.gallery().labels())?;
    }

    let summary = RunSummary {
        group: opts.group.clone(),
        dataset: cfg.dataset.to_string(),
        probe_count: matcher.probe().len(),
        gallery_count: matcher.gallery().len(),
        probe_equals_gallery: matcher.probe_equals_gallery(),
        genuine: matcher.count(PairClass::Genuine),
        impostor: matcher.count(PairClass::Impostor),
        excluded: matcher.count(PairClass::Excluded),
        elapsed_ms: start.elapsed().as_millis(),
    };
    storage::save_summary(&paths.summary(), &summary)?;
    log::info!("Finished in {:.1?}", start.elapsed());

    Ok(summary)
}
