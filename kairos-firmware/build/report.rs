//! Boxed error report for build failures
//!
//! Plain std only, so the checks below also run with
//! `rustc --edition 2021 --test build/report.rs`.

/// Widest line that fits inside the box
pub const LINE_WIDTH: usize = 62;

/// Abort the build with a boxed error report
pub fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        format_error_lines(lines)
    );
}

/// Cut `line` to at most `width` characters, marking the cut with "..."
pub fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let keep = width.saturating_sub(3);
    let end = line
        .char_indices()
        .nth(keep)
        .map_or(line.len(), |(index, _)| index);
    format!("{}...", &line[..end])
}

/// Format error message lines with box drawing
pub fn format_error_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("║  • {:<62} ║", truncate(line, LINE_WIDTH)))
        .collect::<Vec<_>>()
        .join("\n")
}
