use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use log::{debug, error, info};

use crate::config::BatchConfig;
use crate::embedding::{EmbeddingVector, TextEmbedder};
use crate::error::PipelineError;

/// Distinct texts in first-seen order, plus, for every input position, the
/// index of its distinct text.
fn dedup<S: AsRef<str>>(texts: &[S]) -> (Vec<&str>, Vec<usize>) {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut unique = Vec::new();
    let positions = texts
        .iter()
        .map(|text| {
            let text = text.as_ref();
            *slots.entry(text).or_insert_with(|| {
                unique.push(text);
                unique.len() - 1
            })
        })
        .collect();
    (unique, positions)
}

/// Counts distinct texts embedded; `inputs` is the caller's batch size.
struct Progress<'a> {
    done: AtomicUsize,
    total: usize,
    inputs: usize,
    interval: usize,
    label: &'a str,
}

impl Progress<'_> {
    fn line(&self, done: usize) -> String {
        format!(
            "{}: embedded {}/{} distinct texts ({} inputs)",
            self.label, done, self.total, self.inputs
        )
    }

    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.interval > 0 && (done % self.interval == 0 || done == self.total) {
            info!("{}", self.line(done));
        }
    }
}

/// Embeds one contiguous run of texts, stopping at the first failure.
///
/// On failure returns the offset within `chunk` that failed alongside the error.
fn embed_chunk(
    chunk: &[&str],
    embedder: &dyn TextEmbedder,
    progress: &Progress<'_>,
) -> Result<Vec<EmbeddingVector>, (usize, PipelineError)> {
    let dimension = embedder.dimension();
    let mut vectors = Vec::with_capacity(chunk.len());
    for (offset, text) in chunk.iter().enumerate() {
        let vector = embedder.embed(text).map_err(|e| (offset, e))?;
        if vector.len() != dimension {
            return Err((
                offset,
                PipelineError::DimensionMismatchError {
                    expected: dimension,
                    actual: vector.len(),
                },
            ));
        }
        vectors.push(vector);
        progress.tick();
    }
    Ok(vectors)
}

/// Embeds every text, returning vectors in exactly the input order.
///
/// Identical texts are embedded once and their vector reused. With
/// `config.workers > 1` the distinct texts are split into contiguous chunks
/// embedded on scoped threads and reassembled by position.
///
/// The batch fails fast: the first failing text (lowest position) aborts the
/// whole call and its error is returned unmodified, so callers never see an
/// embedding list shorter than their label list.
///
/// # Errors
/// - Whatever `embedder.embed` returns for the first failing text
/// - `DimensionMismatchError` if a vector's width differs from `embedder.dimension()`
pub fn embed_all<S: AsRef<str>>(
    texts: &[S],
    embedder: &dyn TextEmbedder,
    config: &BatchConfig,
) -> Result<Vec<EmbeddingVector>, PipelineError> {
    embed_all_labeled(texts, embedder, config, "Embedding")
}

/// Same as `embed_all`, tagging progress lines with `label`.
pub fn embed_all_labeled<S: AsRef<str>>(
    texts: &[S],
    embedder: &dyn TextEmbedder,
    config: &BatchConfig,
    label: &str,
) -> Result<Vec<EmbeddingVector>, PipelineError> {
    let (unique, positions) = dedup(texts);
    if unique.len() < texts.len() {
        debug!(
            "{}: {} texts, {} distinct after caching duplicates",
            label,
            texts.len(),
            unique.len()
        );
    }

    let progress = Progress {
        done: AtomicUsize::new(0),
        total: unique.len(),
        inputs: texts.len(),
        interval: config.progress_interval,
        label,
    };

    let workers = config.workers.clamp(1, unique.len().max(1));
    let embedded = if workers == 1 {
        embed_chunk(&unique, embedder, &progress)
    } else {
        let chunk_size = unique.len().div_ceil(workers);
        let progress = &progress;
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = unique
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || embed_chunk(chunk, embedder, progress)))
                .collect();
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        let mut vectors = Vec::with_capacity(unique.len());
        let mut failure = None;
        for (chunk_idx, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(chunk_vectors)) => vectors.extend(chunk_vectors),
                Ok(Err((offset, e))) => {
                    failure = Some((chunk_idx * chunk_size + offset, e));
                    break;
                }
                Err(_) => {
                    failure = Some((
                        chunk_idx * chunk_size,
                        PipelineError::EncodingError("Embedding worker panicked".into()),
                    ));
                    break;
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(vectors),
        }
    };

    let unique_vectors = embedded.map_err(|(unique_idx, e)| {
        // Report the first input position holding the failing text
        let position = positions.iter().position(|&p| p == unique_idx).unwrap_or(unique_idx);
        error!("{}: text {} of {} failed, aborting batch: {}", label, position + 1, texts.len(), e);
        e
    })?;

    Ok(positions.into_iter().map(|p| unique_vectors[p].clone()).collect())
}
