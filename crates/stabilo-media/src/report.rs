//! HTML report comparing the original region with its temporal mean.

use stabilo_core::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Path to `target` as the report at `html_path` should reference it:
/// relative when both share a directory tree, unchanged otherwise.
fn link_from(html_path: &Path, target: &Path) -> PathBuf {
    let base = html_path.parent().unwrap_or(Path::new(""));
    if base.as_os_str().is_empty() {
        return target.to_path_buf();
    }
    target
        .strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| target.to_path_buf())
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the report markup.
pub fn render_html_report(original: &Path, mean: &Path, html_path: &Path) -> String {
    let original = escape_attr(&link_from(html_path, original).to_string_lossy());
    let mean = escape_attr(&link_from(html_path, mean).to_string_lossy());
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Report</title>
</head>
<body>
    <h1>Video Stabilization Report</h1>
    <h2>Original Image</h2>
    <img src="{original}" alt="Original Image" width="50%">
    <h2>Mean Image</h2>
    <img src="{mean}" alt="Mean Image" width="50%">
</body>
</html>
"#
    )
}

/// Write the report to `html_path`.
pub fn write_html_report(original: &Path, mean: &Path, html_path: &Path) -> Result<()> {
    fs::write(html_path, render_html_report(original, mean, html_path))?;
    info!(path = %html_path.display(), "Saved HTML report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_relative_to_report() {
        let html = render_html_report(
            Path::new("/out/run1/mean_original.jpg"),
            Path::new("/out/run1/mean.jpg"),
            Path::new("/out/run1/report.html"),
        );
        assert!(html.contains(r#"src="mean_original.jpg""#));
        assert!(html.contains(r#"src="mean.jpg""#));
        assert_eq!(html.matches("width=\"50%\"").count(), 2);
    }

    #[test]
    fn test_bare_paths_are_kept() {
        let html = render_html_report(
            Path::new("a&b.jpg"),
            Path::new("mean.jpg"),
            Path::new("report.html"),
        );
        assert!(html.contains(r#"src="a&amp;b.jpg""#));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let html_path = dir.path().join("report.html");
        write_html_report(
            &dir.path().join("orig.png"),
            &dir.path().join("mean.png"),
            &html_path,
        )
        .unwrap();
        let content = fs::read_to_string(&html_path).unwrap();
        assert!(content.starts_with("<!DOCTYPE html>"));
        assert!(content.contains(r#"src="orig.png""#));
    }
}
