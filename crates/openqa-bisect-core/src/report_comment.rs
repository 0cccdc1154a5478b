//! Markdown bodies posted back to the origin job.

pub const BISECT_REPORT_HEADER: &str = "Automatic bisect jobs:";
pub const REPOSITORIES_UNAVAILABLE_LEAD: &str =
    "Automatic bisect jobs could not be created because required update repositories are unavailable:";

/// Render the aggregate comment from `(derived test name, url)` rows.
///
/// Rows are rendered in the order given; callers pass them in candidate order.
pub fn render_bisect_report<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut rendered = format!("{BISECT_REPORT_HEADER}\n\n");
    for (name, url) in rows {
        rendered.push_str(&format!("* **{name}**: {url}\n"));
    }
    rendered
}

pub fn render_repositories_unavailable_comment(error_output: &str) -> String {
    format!(
        "{REPOSITORIES_UNAVAILABLE_LEAD}\n\n```\n{}\n```\n",
        error_output.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::{render_bisect_report, render_repositories_unavailable_comment};

    #[test]
    fn functional_render_bisect_report_lists_one_bullet_per_job() {
        let rendered = render_bisect_report([
            (
                "foo:investigate:bisect_without_3",
                "https://openqa.opensuse.org/t234567",
            ),
            (
                "foo:investigate:bisect_without_21637",
                "https://openqa.opensuse.org/t234568",
            ),
        ]);
        assert_eq!(
            rendered,
            "Automatic bisect jobs:\n\n\
             * **foo:investigate:bisect_without_3**: https://openqa.opensuse.org/t234567\n\
             * **foo:investigate:bisect_without_21637**: https://openqa.opensuse.org/t234568\n"
        );
    }

    #[test]
    fn unit_render_bisect_report_without_rows_is_header_only() {
        assert_eq!(render_bisect_report([]), "Automatic bisect jobs:\n\n");
    }

    #[test]
    fn functional_render_repositories_unavailable_comment_quotes_error_output() {
        let rendered = render_repositories_unavailable_comment(
            "\nThe repositories for the below updates are unavailable:\n - 5\n",
        );
        assert!(rendered.starts_with("Automatic bisect jobs could not be created"));
        assert!(rendered.contains(
            "```\nThe repositories for the below updates are unavailable:\n - 5\n```"
        ));
    }
}
