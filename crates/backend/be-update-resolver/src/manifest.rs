//! Squirrel `RELEASES` manifest rewriting.
//!
//! Each manifest line has the shape `<sha1> <file name> <size>`. The file
//! names are relative to the directory the manifest was downloaded from,
//! which only holds the latest release. Delta updates need packages from
//! older releases too, so every file name is turned into an absolute URL
//! pointing at the release that produced it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{UpdateResult, UpdateServiceError};

/// Version enclosed by hyphens, e.g. `MyApp-1.2.2-full.nupkg`
static LINE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+\.\d+\.\d+)-").expect("valid version regex"));

/// Rewrite a `RELEASES` body so file names become absolute download URLs.
///
/// `releases_url` is the download URL of the manifest asset itself and
/// `latest_version` the cleaned version of the release it belongs to.
/// The output has exactly as many lines as the input; empty lines are kept
/// as they are.
#[instrument(skip(body), fields(body_len = body.len()))]
pub fn rewrite_releases(
    body: &str,
    releases_url: &str,
    latest_version: &str,
) -> UpdateResult<String> {
    // Only the first "\n\r" is folded, and it is not the usual "\r\n".
    let normalized = body.replacen("\n\r", "\n", 1);

    let lines = normalized
        .split('\n')
        .map(|line| rewrite_line(line, releases_url, latest_version))
        .collect::<UpdateResult<Vec<_>>>()?;

    debug!("Rewrote {} RELEASES lines", lines.len());
    Ok(lines.join("\n"))
}

fn rewrite_line(line: &str, releases_url: &str, latest_version: &str) -> UpdateResult<String> {
    if line.is_empty() {
        return Ok(String::new());
    }

    let file_name = line
        .split(' ')
        .nth(1)
        .ok_or_else(|| UpdateServiceError::MalformedManifestLine(line.to_string()))?;

    let version = LINE_VERSION
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| UpdateServiceError::MalformedManifestLine(line.to_string()))?;

    // Raw substring substitution: the first occurrence of the latest version
    // anywhere in the URL is swapped, not a specific path segment.
    let download_path = releases_url
        .replacen(latest_version, version, 1)
        .replacen("/RELEASES", "/", 1);

    let rewritten = format!("{}{}", download_path, file_name);
    let fields: Vec<&str> = line
        .split(' ')
        .enumerate()
        .map(|(i, field)| if i == 1 { rewritten.as_str() } else { field })
        .collect();
    Ok(fields.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEASES_URL: &str = "https://github.com/acme/myapp/releases/download/v1.2.3/RELEASES";

    #[test]
    fn rewrites_file_names_to_version_specific_urls() {
        let body = "A1B2 MyApp-1.2.2-full.nupkg 1024\nC3D4 MyApp-1.2.3-delta.nupkg 512";
        let out = rewrite_releases(body, RELEASES_URL, "1.2.3").unwrap();
        let lines: Vec<&str> = out.split('\n').collect();

        assert_eq!(
            lines[0],
            "A1B2 https://github.com/acme/myapp/releases/download/v1.2.2/MyApp-1.2.2-full.nupkg 1024"
        );
        assert_eq!(
            lines[1],
            "C3D4 https://github.com/acme/myapp/releases/download/v1.2.3/MyApp-1.2.3-delta.nupkg 512"
        );
    }

    #[test]
    fn preserves_line_count_and_other_fields() {
        let body = "H1 MyApp-1.0.0-full.nupkg 10\nH2 MyApp-1.1.0-delta.nupkg 20\nH3 MyApp-1.2.3-full.nupkg 30\n";
        let out = rewrite_releases(body, RELEASES_URL, "1.2.3").unwrap();

        assert_eq!(out.split('\n').count(), body.split('\n').count());
        for (input, output) in body.split('\n').zip(out.split('\n')) {
            let input: Vec<&str> = input.split(' ').collect();
            let output: Vec<&str> = output.split(' ').collect();
            assert_eq!(input.len(), output.len());
            if input.len() > 1 {
                assert_eq!(input[0], output[0]);
                assert_eq!(input[2..], output[2..]);
                assert!(output[1].ends_with(input[1]));
            }
        }
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn folds_only_the_first_newline_carriage_return() {
        // "\n\r" is folded once; "\r\n" endings are left untouched
        let body = "H1 MyApp-1.2.2-full.nupkg 10\n\rH2 MyApp-1.2.3-full.nupkg 20\r\nH3 MyApp-1.2.3-delta.nupkg 30";
        let out = rewrite_releases(body, RELEASES_URL, "1.2.3").unwrap();
        let lines: Vec<&str> = out.split('\n').collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" 10"));
        assert!(lines[1].starts_with("H2 "));
        assert!(lines[1].ends_with(" 20\r"));
    }

    #[test]
    fn second_newline_carriage_return_is_kept() {
        let body = "H1 MyApp-1.2.2-full.nupkg 10\n\rH2 MyApp-1.2.3-full.nupkg 20\n\rH3 MyApp-1.2.3-delta.nupkg 30";
        let out = rewrite_releases(body, RELEASES_URL, "1.2.3").unwrap();
        let lines: Vec<&str> = out.split('\n').collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("H2 "));
        assert!(lines[2].starts_with("\rH3 "));
    }

    #[test]
    fn rejects_lines_without_version_in_file_name() {
        let body = "H1 MyApp-full.nupkg 10";
        let err = rewrite_releases(body, RELEASES_URL, "1.2.3").unwrap_err();
        assert!(
            matches!(err, UpdateServiceError::MalformedManifestLine(ref line) if line == body)
        );
    }

    #[test]
    fn rejects_lines_without_file_name() {
        let err = rewrite_releases("H1", RELEASES_URL, "1.2.3").unwrap_err();
        assert!(matches!(err, UpdateServiceError::MalformedManifestLine(_)));
    }

    #[test]
    fn substitutes_only_the_first_version_occurrence() {
        // Known limitation: an unrelated earlier "1.2.3" in the URL is the one replaced
        let url = "https://cdn.example.com/1.2.3/myapp/v1.2.3/RELEASES";
        let out = rewrite_releases("H1 MyApp-1.0.0-full.nupkg 10", url, "1.2.3").unwrap();
        assert_eq!(
            out,
            "H1 https://cdn.example.com/1.0.0/myapp/v1.2.3/MyApp-1.0.0-full.nupkg 10"
        );
    }

    #[test]
    fn empty_manifest_stays_empty() {
        assert_eq!(rewrite_releases("", RELEASES_URL, "1.2.3").unwrap(), "");
    }
}
