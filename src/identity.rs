//! Job identity derivation
//!
//! A backup job is identified by its (source, nested path, destination)
//! tuple. The identity token locates the job's checkpoint file, so it has to
//! be deterministic, filesystem-legal on every platform, and collision-free
//! for arbitrarily nested paths.

use std::fmt;

/// Segment separator in the final token. `+` is always percent-encoded
/// inside a segment, so it can never be produced by segment content.
const SEPARATOR: char = '+';

/// Token used in place of an empty nested path (whole-source backup).
/// `@` is always percent-encoded inside a segment, so no real folder name
/// can encode to this value.
const ROOT_SENTINEL: &str = "@root";

/// Identity of one backup job.
///
/// Two runs with the same effective (source, path, destination) always
/// resolve to the same [`JobIdentity::token`], which is what makes resume
/// possible; any difference in the tuple yields a different token.
///
/// # Examples
///
/// ```
/// use coldpack::identity::JobIdentity;
///
/// let id = JobIdentity::new("s3://studies-db-prod", "Bermuda/", "s3://archive").unwrap();
/// assert_eq!(id.token(), JobIdentity::new("s3://studies-db-prod", "Bermuda", "s3://archive").unwrap().token());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentity {
    source: String,
    path: String,
    destination: String,
    token: String,
}

impl JobIdentity {
    /// Build the identity for a (source, nested path, destination) tuple.
    ///
    /// The nested path is normalized before encoding: surrounding `/` are
    /// trimmed, so `Bermuda` and `Bermuda/` are the same job. An empty path
    /// means "back up the whole source" and maps to a reserved sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the source or destination descriptor is empty.
    pub fn new(source: &str, path: &str, destination: &str) -> Result<Self, IdentityError> {
        let source = source.trim();
        let destination = destination.trim();
        if source.is_empty() {
            return Err(IdentityError::EmptyDescriptor("source"));
        }
        if destination.is_empty() {
            return Err(IdentityError::EmptyDescriptor("destination"));
        }

        let path = path.trim().trim_matches('/').to_string();
        let path_segment = if path.is_empty() {
            ROOT_SENTINEL.to_string()
        } else {
            encode_segment(&path)
        };

        let token = format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            encode_segment(source),
            path_segment,
            encode_segment(destination)
        );

        Ok(Self {
            source: source.to_string(),
            path,
            destination: destination.to_string(),
            token,
        })
    }

    /// Source descriptor (trimmed, as supplied).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Normalized nested path. Empty for a whole-source job.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Destination descriptor (trimmed, as supplied).
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The flat checkpoint key for this job.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Percent-encode one descriptor segment into a flat, filesystem-legal form.
///
/// Alphanumerics plus `.` and `-` pass through, `/` becomes `_`, and every
/// other byte (including a literal `_`, which would otherwise collide with
/// an encoded `/`) becomes `%XX`. The mapping is injective: distinct inputs
/// always produce distinct outputs.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' => out.push(byte as char),
            b'/' => out.push('_'),
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}

/// Errors that can occur while deriving a job identity
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// A required descriptor was empty
    #[error("{0} descriptor cannot be empty")]
    EmptyDescriptor(&'static str),
}
