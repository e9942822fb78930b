use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::alignment::{concatenate, split_into_blocks, Block, BlockAligner};
use crate::app_config::Config;
use crate::corpus::{Corpus, CorpusStore};
use crate::errors::AppError;
use crate::oracle::{CachingOracle, FixtureOracle, LlmOracle, Oracle};
use crate::providers::create_provider;
use crate::series::Series;

/// Main application controller for subtitle alignment
pub struct Controller {
    config: Config,
}

impl Controller {
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Align `candidate_file` to `anchor_file` and write the result to `output_file`.
    ///
    /// `name` identifies the run in the corpus when new cases are recorded.
    pub async fn run(
        &self,
        anchor_file: &Path,
        candidate_file: &Path,
        output_file: &Path,
        name: &str,
        force_overwrite: bool,
    ) -> Result<()> {
        let start_time = Instant::now();

        if output_file.exists() && !force_overwrite {
            warn!("Skipping, output already exists (use -f to force overwrite): {}", output_file.display());
            return Ok(());
        }

        for input in [anchor_file, candidate_file] {
            if !input.exists() {
                return Err(AppError::File(format!("Input file not found: {}", input.display())).into());
            }
        }

        let anchor = Series::read_srt(anchor_file).context("Failed to read anchor subtitles")?;
        let candidate = Series::read_srt(candidate_file).context("Failed to read candidate subtitles")?;
        info!(
            "Aligning {} candidate segments to {} anchor segments",
            candidate.len(),
            anchor.len()
        );

        let store = self.config.corpus.directory.as_ref().map(CorpusStore::new);

        let aligned = if self.config.corpus.replay_only {
            let store = store.ok_or_else(|| anyhow!("Replay-only mode needs a corpus directory"))?;
            let oracle = FixtureOracle::from_store(&store)?;
            info!("Replaying {} recorded answers", oracle.corpus().len());
            self.align_series(anchor, candidate, &oracle).await?
        } else {
            let examples = match &store {
                Some(store) => store.load_merged()?,
                None => Corpus::new(),
            };
            let provider_config = self.config.oracle.resolved_provider_config();
            let provider = create_provider(&self.config.oracle.provider, &provider_config);
            provider
                .test_connection()
                .await
                .map_err(AppError::from)
                .with_context(|| format!("Cannot reach {} provider", self.config.oracle.provider.display_name()))?;
            info!(
                "Oracle: {} - {}",
                self.config.oracle.provider.display_name(),
                provider_config.model
            );

            let llm = LlmOracle::new(provider, &self.config).with_examples(examples);
            let oracle = if self.config.corpus.record_new_cases {
                CachingOracle::new(llm).with_recording()
            } else {
                CachingOracle::new(llm)
            };

            let aligned = match &store {
                Some(store) if self.config.corpus.record_new_cases => {
                    self.align_and_record(anchor, candidate, &oracle, store, name).await?
                }
                None if self.config.corpus.record_new_cases => {
                    warn!("Recording is enabled but no corpus directory is configured; dropping new cases");
                    self.align_series(anchor, candidate, &oracle).await?
                }
                _ => self.align_series(anchor, candidate, &oracle).await?,
            };

            let (hits, misses, hit_rate) = oracle.stats();
            info!(
                "Oracle cache: {} hits, {} misses ({:.1}% hit rate)",
                hits,
                misses,
                hit_rate * 100.0
            );
            aligned
        };

        aligned
            .write_srt(output_file)
            .with_context(|| format!("Failed to write aligned subtitles to {}", output_file.display()))?;

        info!(
            "Wrote {} aligned segments to {} in {}",
            aligned.len(),
            output_file.display(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(())
    }

    /// Split into blocks, align them with a progress bar and join the results
    pub async fn align_series(&self, anchor: Series, candidate: Series, oracle: &dyn Oracle) -> Result<Series> {
        let blocks = split_into_blocks(&anchor, &candidate, self.config.aligner.block_gap_ms);
        self.align_blocks(blocks, oracle).await
    }

    /// Like `align_series`, then append the cases `oracle` recorded to one
    /// corpus file per block, named `{name}/block-NNN`.
    ///
    /// Cases are written even when a block fails.
    pub async fn align_and_record<O: Oracle>(
        &self,
        anchor: Series,
        candidate: Series,
        oracle: &CachingOracle<O>,
        store: &CorpusStore,
        name: &str,
    ) -> Result<Series> {
        let blocks = split_into_blocks(&anchor, &candidate, self.config.aligner.block_gap_ms);
        let block_names: BTreeMap<usize, String> = blocks
            .iter()
            .map(|block| (block.index, block.name(name)))
            .collect();

        let aligned = self.align_blocks(blocks, oracle).await;

        let mut written = 0;
        for (index, cases) in oracle.take_recorded_by_block() {
            if cases.is_empty() {
                continue;
            }
            let block_name = index.and_then(|i| block_names.get(&i)).map_or(name, String::as_str);
            written += store
                .append(block_name, cases)
                .map_err(AppError::from)
                .with_context(|| format!("Failed to record new test cases for {}", block_name))?;
        }
        info!("Recorded {} new test cases under {}", written, store.root().display());

        aligned
    }

    async fn align_blocks(&self, blocks: Vec<Block>, oracle: &dyn Oracle) -> Result<Series> {
        info!("Split into {} blocks", blocks.len());

        let progress_bar = ProgressBar::new(blocks.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Aligning");

        let block_aligner = BlockAligner::new(&self.config.aligner);
        let pb = progress_bar.clone();
        let results = block_aligner
            .align_blocks(blocks, oracle, move |completed, _total| {
                pb.set_position(completed as u64);
            })
            .await;
        progress_bar.finish_and_clear();

        let aligned = concatenate(results).map_err(|e| {
            error!("Alignment failed: {}", e);
            AppError::from(e)
        })?;
        Ok(aligned)
    }

    /// Validate every case below `directory`; returns the number of failures
    pub fn check_corpus(directory: &Path) -> Result<usize> {
        let store = CorpusStore::new(directory);
        let failures = store.validate_all()?;
        for failure in &failures {
            error!("{}", failure);
        }
        if failures.is_empty() {
            info!("All test cases in {} are valid", directory.display());
        } else {
            warn!("{} invalid test cases in {}", failures.len(), directory.display());
        }
        Ok(failures.len())
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
