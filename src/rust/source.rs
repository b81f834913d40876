use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::dataset::Review;
use crate::error::PipelineError;

/// Supplies raw reviews to the pipeline, in a stable order.
pub trait ReviewSource {
    fn load(&self) -> Result<Vec<Review>, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct RawReview {
    text: Option<String>,
    stars: Option<f64>,
}

/// Reads reviews from a JSON-lines file such as the Yelp `review.json` dump.
///
/// Each line is an object with at least `text` and `stars`; other fields are
/// ignored. Records where either is null or missing, or whose text is blank,
/// are skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    limit: Option<usize>,
}

impl JsonLinesSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limit: None,
        }
    }

    /// Stop after this many usable reviews
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn parse_line(line_no: usize, line: &str) -> Result<Option<Review>, PipelineError> {
        let raw: RawReview = serde_json::from_str(line).map_err(|e| PipelineError::SourceError {
            line: line_no,
            message: e.to_string(),
        })?;

        let (text, stars) = match (raw.text, raw.stars) {
            (Some(text), Some(stars)) if !text.trim().is_empty() => (text, stars),
            _ => return Ok(None),
        };

        if !stars.is_finite() || stars.fract() != 0.0 {
            return Err(PipelineError::SourceError {
                line: line_no,
                message: format!("stars must be a whole number, got {}", stars),
            });
        }

        Ok(Some(Review::new(text, stars as i64)))
    }
}

impl ReviewSource for JsonLinesSource {
    fn load(&self) -> Result<Vec<Review>, PipelineError> {
        info!("Reading reviews from {:?}", self.path);
        let reader = BufReader::new(File::open(&self.path)?);

        let mut reviews = Vec::new();
        let mut skipped = 0usize;
        for (i, line) in reader.lines().enumerate() {
            if self.limit.is_some_and(|limit| reviews.len() >= limit) {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match Self::parse_line(i + 1, &line)? {
                Some(review) => reviews.push(review),
                None => skipped += 1,
            }
        }

        debug!("Skipped {} records with null or blank text, or null stars", skipped);
        info!("Fetched {} reviews", reviews.len());
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        for line in lines {
            writeln!(file, "{}", line).expect("write");
        }
        file
    }

    #[test]
    fn test_reads_yelp_shaped_records() -> Result<(), PipelineError> {
        let file = write_lines(&[
            r#"{"review_id": "a", "stars": 5.0, "text": "Loved it", "date": "2018-07-07"}"#,
            r#"{"review_id": "b", "stars": 1, "text": "Never again"}"#,
        ]);

        let reviews = JsonLinesSource::new(file.path()).load()?;
        assert_eq!(reviews, vec![Review::new("Loved it", 5), Review::new("Never again", 1)]);
        Ok(())
    }

    #[test]
    fn test_null_fields_and_blank_lines_skipped() -> Result<(), PipelineError> {
        let file = write_lines(&[
            r#"{"stars": null, "text": "no rating"}"#,
            "",
            r#"{"stars": 4}"#,
            r#"{"stars": 2, "text": "kept"}"#,
        ]);

        let reviews = JsonLinesSource::new(file.path()).load()?;
        assert_eq!(reviews, vec![Review::new("kept", 2)]);
        Ok(())
    }

    #[test]
    fn test_blank_text_skipped() -> Result<(), PipelineError> {
        let file = write_lines(&[
            r#"{"stars": 5, "text": ""}"#,
            r#"{"stars": 1, "text": "   "}"#,
            r#"{"stars": 1, "text": "\n\t"}"#,
            r#"{"stars": 4, "text": " padded "}"#,
        ]);

        let reviews = JsonLinesSource::new(file.path()).load()?;
        assert_eq!(reviews, vec![Review::new(" padded ", 4)]);
        Ok(())
    }

    #[test]
    fn test_limit_counts_usable_reviews() -> Result<(), PipelineError> {
        let file = write_lines(&[
            r#"{"stars": 5, "text": "one"}"#,
            r#"{"stars": null, "text": "skip"}"#,
            r#"{"stars": 4, "text": "two"}"#,
            r#"{"stars": 3, "text": "three"}"#,
        ]);

        let reviews = JsonLinesSource::new(file.path()).with_limit(2).load()?;
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].text, "two");
        Ok(())
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let file = write_lines(&[r#"{"stars": 5, "text": "ok"}"#, "{broken"]);

        let result = JsonLinesSource::new(file.path()).load();
        assert!(matches!(result, Err(PipelineError::SourceError { line: 2, .. })));
    }

    #[test]
    fn test_fractional_stars_rejected() {
        let file = write_lines(&[r#"{"stars": 3.5, "text": "half"}"#]);

        let result = JsonLinesSource::new(file.path()).load();
        assert!(matches!(result, Err(PipelineError::SourceError { line: 1, .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = JsonLinesSource::new("/nonexistent/reviews.jsonl").load();
        assert!(matches!(result, Err(PipelineError::IoError(_))));
    }
}
