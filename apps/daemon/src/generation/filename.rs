//! Artifact filename rendering from the user's name-format template.

use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Renders a filename from the template (placeholders `{job_title}`,
/// `{name}`, `{company}`), appends `.pdf` when absent, and prefixes the
/// sanitized save-location folder when one is configured.
pub fn render_filename(
    format: &str,
    job_title: &str,
    full_name: &str,
    company_name: &str,
    save_location: &str,
) -> String {
    let mut filename = format
        .replace("{job_title}", &sanitize_component(job_title))
        .replace("{name}", &whitespace_re().replace_all(full_name, "_"))
        .replace("{company}", &sanitize_component(company_name));

    if !filename.to_lowercase().ends_with(".pdf") {
        filename.push_str(".pdf");
    }

    let folder = save_location.trim();
    if !folder.is_empty() {
        filename = format!("{}/{filename}", sanitize_folder(folder));
    }

    filename
}

/// Every non-word character becomes an underscore.
fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Folder names additionally allow hyphens.
fn sanitize_folder(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_default_template() {
        let name = render_filename(
            "{job_title}_Resume_{name}",
            "Senior Rust Engineer",
            "Jane Doe",
            "Acme",
            "",
        );
        assert_eq!(name, "Senior_Rust_Engineer_Resume_Jane_Doe.pdf");
    }

    #[test]
    fn company_placeholder_and_folder_prefix() {
        let name = render_filename(
            "{company}-{job_title}",
            "Dev (Remote)",
            "Jane",
            "Acme, Inc.",
            "my cvs",
        );
        assert_eq!(name, "my_cvs/Acme__Inc_-Dev__Remote_.pdf");
    }

    #[test]
    fn existing_pdf_extension_is_kept() {
        let name = render_filename("cv.PDF", "x", "y", "z", "");
        assert_eq!(name, "cv.PDF");
    }
}
