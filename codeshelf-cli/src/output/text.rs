//! Text output formatting with colors.

use chrono::{DateTime, Duration, Local, Utc};
use codeshelf_core::{CodeRecord, prettify};
use codeshelf_scan::ScanEvent;

use super::json::{CleanOutput, ResolutionOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

/// Characters of record text shown in list views.
const LIST_TEXT_WIDTH: usize = 60;

/// Leading characters of a record id shown in list views.
const SHORT_ID_LEN: usize = 8;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Formats a list of records, one per line.
    pub fn format_history(&self, records: &[CodeRecord]) -> String {
        if records.is_empty() {
            return format!("{}\n", self.dim("No history yet"));
        }
        let mut out = String::new();
        for record in records {
            out.push_str(&self.format_record_line(record));
            out.push('\n');
        }
        out
    }

    /// Formats a record as a single list line:
    /// `* 1b4e28ba  Scanned  example.com/page  5m ago`.
    pub fn format_record_line(&self, record: &CodeRecord) -> String {
        let pin = if record.is_pinned() {
            self.yellow("*")
        } else {
            " ".to_string()
        };
        let id = record.id().to_string();
        let short_id = &id[..SHORT_ID_LEN.min(id.len())];
        let label = format!("{:<8}", record.provenance_label());
        let text = truncate(&prettify(record.display_text()), LIST_TEXT_WIDTH);

        format!(
            "{} {}  {}  {}  {}",
            pin,
            self.dim(short_id),
            self.label_color(record, &label),
            text,
            self.dim(&format_age(record.created_at()))
        )
    }

    /// Formats every field of a record.
    pub fn format_record(&self, record: &CodeRecord) -> String {
        let mut lines = vec![
            self.bold(record.display_text()),
            format!("Id:       {}", record.id()),
            format!(
                "Kind:     {}",
                self.label_color(record, record.provenance_label())
            ),
        ];
        if record.original_text() != record.display_text() {
            lines.push(format!("Original: {}", self.dim(record.original_text())));
        }
        if let Some(location) = record.scan_location() {
            lines.push(format!("Location: {location}"));
        }
        let created = record.created_at().with_timezone(&Local);
        lines.push(format!(
            "Created:  {} ({})",
            created.format("%Y-%m-%d %H:%M"),
            format_age(record.created_at())
        ));
        if record.is_pinned() {
            lines.push(format!("Pinned:   {}", self.yellow("yes")));
        }
        if let Some(image) = record.image_bytes() {
            lines.push(format!("Image:    {} bytes", image.len()));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Scan Events
    // ========================================================================

    /// Formats a scan session event as one line.
    pub fn format_event(&self, event: &ScanEvent) -> String {
        match event {
            ScanEvent::Accepted { payload } => {
                format!("{} {}", self.cyan("▸"), truncate(payload, LIST_TEXT_WIDTH))
            }
            ScanEvent::Duplicate { payload } => self.dim(&format!(
                "= {} (duplicate)",
                truncate(payload, LIST_TEXT_WIDTH)
            )),
            ScanEvent::DecodeFailed => self.dim("? nothing decoded"),
            ScanEvent::Resolving { payload } => self.dim(&format!(
                "… resolving {}",
                truncate(payload, LIST_TEXT_WIDTH)
            )),
            ScanEvent::ResolutionFailed { payload, reason } => format!(
                "{} {}: {}",
                self.red("✗"),
                truncate(payload, LIST_TEXT_WIDTH),
                reason
            ),
            ScanEvent::Recorded(record) => {
                format!("{} {}", self.green("✓"), self.format_record_line(record))
            }
            ScanEvent::RecordFailed { payload, reason } => format!(
                "{} {} not saved: {}",
                self.red("✗"),
                truncate(payload, LIST_TEXT_WIDTH),
                reason
            ),
        }
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Formats a redirect chain.
    pub fn format_resolution(&self, output: &ResolutionOutput) -> String {
        let mut lines = vec![self.dim(&output.start)];
        for hop in &output.hops {
            lines.push(format!("  → {}", self.dim(hop)));
        }
        lines.push(self.bold(&output.final_url));
        lines.join("\n")
    }

    /// Formats an offline cleaning result.
    pub fn format_clean(&self, output: &CleanOutput) -> String {
        match &output.link {
            None => format!("{}\n{}", output.cleaned, self.dim("(no link found)")),
            Some(link) if *link == output.cleaned => {
                format!("{}\n{}", self.bold(&output.cleaned), self.dim("(nothing to strip)"))
            }
            Some(link) => format!(
                "{}\n{}\n{}",
                self.dim(link),
                self.bold(&output.cleaned),
                self.blue(&output.pretty)
            ),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn label_color(&self, record: &CodeRecord, text: &str) -> String {
        if record.was_edited() {
            self.yellow(text)
        } else if record.was_scanned() {
            self.green(text)
        } else if record.was_created() {
            self.cyan(text)
        } else {
            self.blue(text)
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            format!("{BOLD}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            format!("{DIM}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        if self.use_colors {
            format!("{GREEN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn yellow(&self, text: &str) -> String {
        if self.use_colors {
            format!("{YELLOW}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.use_colors {
            format!("{RED}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn blue(&self, text: &str) -> String {
        if self.use_colors {
            format!("{BLUE}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn cyan(&self, text: &str) -> String {
        if self.use_colors {
            format!("{CYAN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Shortens `text` to `max` characters, ending in an ellipsis when cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Formats a timestamp relative to now.
pub(crate) fn format_age(at: DateTime<Utc>) -> String {
    let age = Utc::now() - at;
    if age < Duration::minutes(1) {
        "just now".to_string()
    } else if age < Duration::hours(1) {
        format!("{}m ago", age.num_minutes())
    } else if age < Duration::hours(24) {
        format!("{}h ago", age.num_hours())
    } else if age < Duration::days(7) {
        format!("{}d ago", age.num_days())
    } else {
        at.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}
