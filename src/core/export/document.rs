// src/core/export/document.rs

//! Paginated PDF rendering.
//!
//! Layout happens in two pure steps, building styled lines from the report
//! and splitting them into pages, before anything is drawn. That keeps page
//! numbering ("Page n/N") exact and the layout testable without a PDF reader.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use strum::IntoEnumIterator;

use super::{format_name, or_na};
use crate::core::error::{ReconError, ReconResult};
use crate::core::models::{DnsResult, ProbeOutcome, RecordKind, ReportDocument, TlsResult, WhoisResult};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const HEADER_BASELINE: f32 = PAGE_HEIGHT - MARGIN;
const CONTENT_TOP: f32 = HEADER_BASELINE - 10.0;
const CONTENT_BOTTOM: f32 = 22.0;
const FOOTER_BASELINE: f32 = 10.0;
const TITLE: &str = "Recon Scan Report";
const LAYER_NAME: &str = "Layer 1";

/// Visual role of a line; decides font, size and vertical advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Heading,
    Section,
    Label,
    Body,
    Mono,
    Spacer,
}

impl LineStyle {
    fn font_size(self) -> f32 {
        match self {
            Self::Heading => 12.0,
            Self::Section => 14.0,
            Self::Label | Self::Body => 10.0,
            Self::Mono => 9.0,
            Self::Spacer => 0.0,
        }
    }

    /// Vertical advance in millimetres.
    fn height(self) -> f32 {
        match self {
            Self::Heading | Self::Section => 10.0,
            Self::Label => 8.0,
            Self::Body => 6.0,
            Self::Mono => 5.0,
            Self::Spacer => 4.0,
        }
    }

    /// Characters that fit in the text column at this style's size.
    fn wrap_width(self) -> usize {
        match self {
            Self::Mono => 92,
            _ => 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub style: LineStyle,
    pub text: String,
}

impl Line {
    fn spacer() -> Self {
        Self { style: LineStyle::Spacer, text: String::new() }
    }
}

/// Replaces every character the built-in PDF fonts cannot show with `?`.
///
/// Built-in fonts are WinAnsi encoded, so printable Latin-1 survives.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c,
            '\t' => ' ',
            _ => '?',
        })
        .collect()
}

/// Splits `text` into chunks of at most `width` characters, preferring to
/// break at the last space of each chunk.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest: Vec<char> = text.chars().collect();
    while rest.len() > width {
        let split = rest[..width]
            .iter()
            .rposition(|c| *c == ' ')
            .filter(|pos| *pos > 0)
            .unwrap_or(width);
        let head: String = rest[..split].iter().collect();
        lines.push(head.trim_end().to_string());
        let skip = if rest[split] == ' ' { split + 1 } else { split };
        rest = rest[skip..].to_vec();
    }
    lines.push(rest.into_iter().collect());
    lines
}

struct LineBuilder {
    lines: Vec<Line>,
}

impl LineBuilder {
    fn push(&mut self, style: LineStyle, text: &str) {
        for raw in text.lines() {
            for chunk in wrap(&sanitize(raw), style.wrap_width()) {
                self.lines.push(Line { style, text: chunk });
            }
        }
    }

    fn spacer(&mut self) {
        self.lines.push(Line::spacer());
    }

    fn outcome<T>(&mut self, title: &str, outcome: &ProbeOutcome<T>, body: fn(&mut Self, &T)) {
        self.push(LineStyle::Section, title);
        match outcome {
            ProbeOutcome::Success(value) => body(self, value),
            ProbeOutcome::Failure { error } => self.push(LineStyle::Body, &format!("Error: {error}")),
        }
        self.spacer();
    }

    fn dns(&mut self, dns: &DnsResult) {
        for kind in RecordKind::iter() {
            let records = dns.records(kind);
            if records.is_empty() {
                continue;
            }
            self.push(LineStyle::Label, &kind.to_string());
            for record in records {
                self.push(LineStyle::Mono, &format!("- {record}"));
            }
        }
        for (record_type, error) in &dns.errors {
            self.push(LineStyle::Body, &format!("{record_type} lookup error: {error}"));
        }
        self.push(LineStyle::Body, &format!("SPF Present: {}", dns.spf_present));
        self.push(LineStyle::Body, &format!("DMARC Present: {}", dns.dmarc_present));
    }

    fn tls(&mut self, tls: &TlsResult) {
        self.push(LineStyle::Body, &format!("Subject: {}", format_name(&tls.subject)));
        self.push(LineStyle::Body, &format!("Issuer: {}", format_name(&tls.issuer)));
        self.push(LineStyle::Body, &format!("Serial Number: {}", tls.serial_number));
        self.push(LineStyle::Body, &format!("Valid From: {}", tls.not_before));
        self.push(LineStyle::Body, &format!("Valid To: {}", tls.not_after));
        self.push(LineStyle::Body, &format!("Days to Expire: {}", tls.days_to_expire));
        self.push(LineStyle::Body, &format!("Expired: {}", tls.is_expired));
        self.push(LineStyle::Body, &format!("Expiring Soon: {}", tls.expiring_soon));
    }

    fn whois(&mut self, whois: &WhoisResult) {
        self.push(LineStyle::Body, &format!("Registrar: {}", or_na(whois.registrar.as_ref())));
        self.push(LineStyle::Body, &format!("Creation Date: {}", or_na(whois.creation_date.as_ref())));
        self.push(LineStyle::Body, &format!("Updated Date: {}", or_na(whois.updated_date.as_ref())));
        self.push(LineStyle::Body, &format!("Expiration Date: {}", or_na(whois.expiration_date.as_ref())));
        self.push(LineStyle::Body, &format!("Org: {}", or_na(whois.org.as_ref())));
        self.push(LineStyle::Body, &format!("Country: {}", or_na(whois.country.as_ref())));
    }
}

/// Flattens the report into styled, sanitized, wrapped lines.
pub fn layout(doc: &ReportDocument) -> Vec<Line> {
    let mut builder = LineBuilder { lines: Vec::new() };
    builder.push(LineStyle::Heading, &format!("Domain: {}", doc.domain));
    builder.push(LineStyle::Heading, &format!("Timestamp: {}", doc.timestamp));
    builder.push(LineStyle::Heading, &format!("Run ID: {}", doc.run_id));
    builder.spacer();
    builder.outcome("DNS Results", &doc.dns, LineBuilder::dns);
    builder.outcome("TLS Certificate", &doc.tls, LineBuilder::tls);
    builder.outcome("WHOIS Info", &doc.whois, LineBuilder::whois);
    builder.lines
}

/// Distributes lines over pages so that no page overflows its text area.
pub fn paginate(lines: Vec<Line>) -> Vec<Vec<Line>> {
    let capacity = CONTENT_TOP - CONTENT_BOTTOM;
    let mut pages = vec![Vec::new()];
    let mut used = 0.0;
    for line in lines {
        let height = line.style.height();
        if used + height > capacity {
            pages.push(Vec::new());
            used = 0.0;
        }
        used += height;
        if let Some(page) = pages.last_mut() {
            page.push(line);
        }
    }
    pages
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn load(pdf: &PdfDocumentReference) -> ReconResult<Self> {
        let font = |builtin: BuiltinFont| pdf.add_builtin_font(builtin).map_err(render_error);
        Ok(Self {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
            mono: font(BuiltinFont::Courier)?,
        })
    }

    fn for_style(&self, style: LineStyle) -> &IndirectFontRef {
        match style {
            LineStyle::Heading | LineStyle::Section | LineStyle::Label => &self.bold,
            LineStyle::Mono => &self.mono,
            LineStyle::Body | LineStyle::Spacer => &self.regular,
        }
    }
}

fn render_error(e: impl std::fmt::Display) -> ReconError {
    ReconError::Render(e.to_string())
}

/// Approximate x offset that centres `text` (Helvetica averages half an em per glyph).
fn centered_x(text: &str, font_size: f32) -> f32 {
    let width_mm = text.chars().count() as f32 * font_size * 0.5 * 0.3528;
    ((PAGE_WIDTH - width_mm) / 2.0).max(MARGIN)
}

fn draw_page(layer: &PdfLayerReference, fonts: &Fonts, lines: &[Line], number: usize, total: usize) {
    layer.use_text(TITLE, 15.0, Mm(centered_x(TITLE, 15.0)), Mm(HEADER_BASELINE), &fonts.bold);

    let mut y = CONTENT_TOP;
    for line in lines {
        y -= line.style.height();
        if line.text.is_empty() {
            continue;
        }
        layer.use_text(
            line.text.as_str(),
            line.style.font_size(),
            Mm(MARGIN),
            Mm(y),
            fonts.for_style(line.style),
        );
    }

    let footer = format!("Page {number}/{total}");
    layer.use_text(footer.as_str(), 8.0, Mm(centered_x(&footer, 8.0)), Mm(FOOTER_BASELINE), &fonts.italic);
}

/// Renders the report as an A4 PDF with a title header and page-numbered footer.
pub fn render(doc: &ReportDocument) -> ReconResult<Vec<u8>> {
    let pages = paginate(layout(doc));
    let total = pages.len();

    let title = sanitize(&format!("{TITLE}: {}", doc.domain));
    let (pdf, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
    let fonts = Fonts::load(&pdf)?;

    let mut first = Some((first_page, first_layer));
    for (index, lines) in pages.iter().enumerate() {
        let (page, layer) = match first.take() {
            Some(indices) => indices,
            None => pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME),
        };
        let layer = pdf.get_page(page).get_layer(layer);
        draw_page(&layer, &fonts, lines, index + 1, total);
    }

    pdf.save_to_bytes().map_err(render_error)
}
