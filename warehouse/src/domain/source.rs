//! Validated object-storage locations for bulk-load sources.

use std::fmt;

use url::Url;

/// An `s3://bucket/prefix` location holding source data files.
///
/// Parsing rejects anything that is not an absolute S3 URL so statement
/// builders and the storage adapter never see a malformed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    raw: String,
    bucket: String,
    prefix: String,
}

/// Validation errors returned when parsing a [`SourceLocation`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceLocationError {
    /// The value is not a parseable URL.
    #[error("source location is not a valid URL: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },
    /// The URL scheme is not `s3`.
    #[error("source location must use the s3 scheme, got '{scheme}'")]
    UnsupportedScheme {
        /// Observed scheme.
        scheme: String,
    },
    /// The URL has no bucket component.
    #[error("source location is missing a bucket name")]
    MissingBucket,
}

impl SourceLocation {
    /// Parse and validate an S3 URL.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceLocationError`] when the value is not an
    /// `s3://bucket[/prefix]` URL.
    ///
    /// # Examples
    /// ```
    /// use warehouse::domain::SourceLocation;
    ///
    /// let location = SourceLocation::parse("s3://data-lake/events").expect("valid");
    /// assert_eq!(location.bucket(), "data-lake");
    /// assert_eq!(location.prefix(), "events");
    /// ```
    pub fn parse(raw: &str) -> Result<Self, SourceLocationError> {
        let url = Url::parse(raw).map_err(|error| SourceLocationError::Malformed {
            message: error.to_string(),
        })?;
        if url.scheme() != "s3" {
            return Err(SourceLocationError::UnsupportedScheme {
                scheme: url.scheme().to_owned(),
            });
        }
        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(SourceLocationError::MissingBucket)?
            .to_owned();
        let prefix = url.path().trim_start_matches('/').to_owned();
        Ok(Self {
            raw: raw.to_owned(),
            bucket,
            prefix,
        })
    }

    /// The original URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Bucket component.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.bucket.as_str()
    }

    /// Key prefix under the bucket; empty for whole-bucket locations.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for source location validation.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn parses_bucket_and_prefix() {
        let location = SourceLocation::parse("s3://data-lake/events/2018/11").expect("valid");
        assert_eq!(location.bucket(), "data-lake");
        assert_eq!(location.prefix(), "events/2018/11");
        assert_eq!(location.as_str(), "s3://data-lake/events/2018/11");
    }

    #[rstest]
    fn accepts_whole_bucket_locations() {
        let location = SourceLocation::parse("s3://data-lake").expect("valid");
        assert_eq!(location.prefix(), "");
    }

    #[rstest]
    #[case("https://data-lake/events", "https")]
    #[case("file:///tmp/events", "file")]
    fn rejects_non_s3_schemes(#[case] raw: &str, #[case] scheme: &str) {
        let error = SourceLocation::parse(raw).expect_err("scheme must fail");
        assert_eq!(
            error,
            SourceLocationError::UnsupportedScheme {
                scheme: scheme.to_owned()
            }
        );
    }

    #[rstest]
    fn rejects_unparseable_values() {
        let error = SourceLocation::parse("not a url").expect_err("must fail");
        assert!(matches!(error, SourceLocationError::Malformed { .. }));
    }
}
