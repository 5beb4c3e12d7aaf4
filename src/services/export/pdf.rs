//! PDF export built directly on `lopdf` objects.
//!
//! Text is set in the standard Courier font so line width is exact
//! (every glyph advances 0.6 em) and wrapping never runs past the margin.
//! The font uses WinAnsiEncoding; characters outside it print as `?`.

use super::ExportError;
use crate::models::config::PdfLayout;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const MM_TO_PT: f32 = 72.0 / 25.4;
const COURIER_ADVANCE_EM: f32 = 0.6;
const FONT_RESOURCE: &str = "F1";
const TAB_WIDTH: usize = 4;

/// Render `text` into a PDF document and return its bytes
pub fn export_as_pdf(text: &str, layout: &PdfLayout) -> Result<Vec<u8>, ExportError> {
    layout.validate().map_err(ExportError::Pdf)?;

    let lines = layout_lines(text, layout);
    let pages = paginate(lines, layout);
    build_document(&pages, layout)
}

/// Characters that fit between the left and right margins
fn max_chars_per_line(layout: &PdfLayout) -> usize {
    let (page_width, _) = layout.page_size.points();
    let usable = page_width - 2.0 * layout.origin_x_mm * MM_TO_PT;
    let advance = layout.font_size * COURIER_ADVANCE_EM;
    ((usable / advance).floor() as usize).max(1)
}

/// Baselines that fit between the first baseline and the bottom margin
fn lines_per_page(layout: &PdfLayout) -> usize {
    let (_, page_height) = layout.page_size.points();
    let margin = layout.origin_y_mm * MM_TO_PT;
    let usable = page_height - 2.0 * margin;
    let leading = layout.font_size * layout.line_height_factor;
    if usable <= 0.0 {
        return 1;
    }
    (usable / leading).floor() as usize + 1
}

fn layout_lines(text: &str, layout: &PdfLayout) -> Vec<String> {
    let max_chars = max_chars_per_line(layout);
    let tab = " ".repeat(TAB_WIDTH);

    text.split('\n')
        .map(|line| line.trim_end_matches('\r').replace('\t', &tab))
        .flat_map(|line| {
            if layout.wrap_lines {
                wrap_line(&line, max_chars)
            } else {
                vec![line]
            }
        })
        .collect()
}

/// Greedy word wrap; words longer than a line are split hard
fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut wrapped = Vec::new();
    let mut current = String::new();
    // No word placed on `current` yet
    let mut fresh = true;

    for word in line.split(' ') {
        let word_len = word.chars().count();
        let needed = if fresh {
            word_len
        } else {
            current.chars().count() + 1 + word_len
        };

        if needed <= max_chars {
            if !fresh {
                current.push(' ');
            }
            current.push_str(word);
            fresh = false;
            continue;
        }

        if !fresh {
            wrapped.push(std::mem::take(&mut current));
        }

        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_chars {
            wrapped.push(chars.drain(..max_chars).collect());
        }
        current = chars.into_iter().collect();
        fresh = current.is_empty();
    }

    if !fresh || wrapped.is_empty() {
        wrapped.push(current);
    }
    wrapped
}

fn paginate(lines: Vec<String>, layout: &PdfLayout) -> Vec<Vec<String>> {
    if !layout.paginate {
        return vec![lines];
    }

    let mut pages: Vec<Vec<String>> = lines
        .chunks(lines_per_page(layout))
        .map(|chunk| chunk.to_vec())
        .collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

/// Map to WinAnsiEncoding bytes; unmappable characters become `?`
fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .filter_map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
            c if c.is_control() => None,
            c => Some(win_ansi_special(c).unwrap_or(b'?')),
        })
        .collect()
}

fn win_ansi_special(c: char) -> Option<u8> {
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

fn page_content(lines: &[String], x: f32, y: f32, font_size: f32, leading: f32) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), Object::Real(font_size)]),
        Operation::new("TL", vec![Object::Real(leading)]),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
    ];

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(line))]));
    }

    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

fn build_document(pages: &[Vec<String>], layout: &PdfLayout) -> Result<Vec<u8>, ExportError> {
    let (page_width, page_height) = layout.page_size.points();
    let x = layout.origin_x_mm * MM_TO_PT;
    // PDF y grows upwards; the origin offset is measured from the top edge
    let y = page_height - layout.origin_y_mm * MM_TO_PT;
    let leading = layout.font_size * layout.line_height_factor;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let content = page_content(lines, x, y, layout.font_size, leading)
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width),
                Object::Real(page_height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Extracted text"),
        "Producer" => Object::string_literal(concat!("ocr-converter ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    tracing::debug!(pages = pages.len(), bytes = bytes.len(), "pdf rendered");
    Ok(bytes)
}
