use std::path::Path;

use anyhow::Context;
use bunny_stream_core::ResponseEnvelope;
use serde::Serialize;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print the envelope, then fail if it carries an error.
pub fn print_envelope<T: Serialize>(envelope: &ResponseEnvelope<T>) -> anyhow::Result<()> {
    print_json(envelope)?;
    if let Some(error) = envelope.error() {
        anyhow::bail!(
            "Request failed with status {}: {}",
            envelope.status_code(),
            error.error
        );
    }
    Ok(())
}

/// Upload progress line, e.g. `12.5 MiB / 100.0 MiB (12%)`.
pub fn format_progress(uploaded: u64, total: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    let percent = if total == 0 {
        100
    } else {
        uploaded.saturating_mul(100) / total
    };
    format!(
        "{:.1} MiB / {:.1} MiB ({}%)",
        uploaded as f64 / MIB,
        total as f64 / MIB,
        percent
    )
}

/// Best-effort MIME type from the file extension.
pub fn guess_filetype(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        Some("ts") => "video/mp2t",
        _ => "application/octet-stream",
    }
}

/// Title derived from the file name when none is given.
pub fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunny_stream_core::ErrorPayload;

    #[test]
    fn progress_reports_percent() {
        assert_eq!(format_progress(0, 1024 * 1024), "0.0 MiB / 1.0 MiB (0%)");
        assert_eq!(
            format_progress(512 * 1024, 1024 * 1024),
            "0.5 MiB / 1.0 MiB (50%)"
        );
        assert_eq!(format_progress(0, 0), "0.0 MiB / 0.0 MiB (100%)");
    }

    #[test]
    fn filetype_from_extension() {
        assert_eq!(guess_filetype(Path::new("clip.MP4")), "video/mp4");
        assert_eq!(guess_filetype(Path::new("/tmp/a.mov")), "video/quicktime");
        assert_eq!(guess_filetype(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn title_from_file_stem() {
        assert_eq!(default_title(Path::new("/videos/holiday.mp4")), "holiday");
        assert_eq!(default_title(Path::new("/")), "Untitled");
    }

    #[test]
    fn failed_envelope_is_an_error() {
        let ok: ResponseEnvelope<u32> = ResponseEnvelope::success(200, 1);
        assert!(print_envelope(&ok).is_ok());

        let failed: ResponseEnvelope<u32> =
            ResponseEnvelope::failure(404, ErrorPayload::local("Not found"));
        let err = print_envelope(&failed).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 404: Not found");
    }
}
