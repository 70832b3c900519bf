use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

/// Paragraphs must be longer than this (in characters) to be considered.
const MIN_PARAGRAPH_CHARS: usize = 50;
const PARAGRAPH_KEYWORDS: &[&str] = &["година", "век", "битка", "война", "въстание"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug)]
enum Node {
    Element(usize),
    Text(String),
}

#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

/// Lenient element tree built from rendered page markup.
///
/// Elements are stored in the order their start tags appear, so iterating
/// `elements` is a document-order walk.
#[derive(Debug)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    pub fn parse(html: &str) -> Document {
        let mut elements = vec![Element {
            name: String::new(),
            children: Vec::new(),
        }];
        let mut open: Vec<usize> = vec![0];

        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            let top = *open.last().unwrap_or(&0);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = tag_name(e.name().as_ref());
                    let idx = push_element(&mut elements, top, name.clone());
                    if !VOID_ELEMENTS.contains(&name.as_str()) {
                        open.push(idx);
                    }
                }
                Ok(Event::Empty(e)) => {
                    push_element(&mut elements, top, tag_name(e.name().as_ref()));
                }
                Ok(Event::End(e)) => {
                    let name = tag_name(e.name().as_ref());
                    // close up to the nearest matching open element, ignore strays
                    if let Some(pos) = open.iter().rposition(|&i| i != 0 && elements[i].name == name) {
                        open.truncate(pos);
                    }
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape_with(html_entity)
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    elements[top].children.push(Node::Text(text));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    elements[top].children.push(Node::Text(text));
                }
                Ok(Event::Eof) => break,
                Err(err) => {
                    debug!("markup parse stopped at byte {}: {}", reader.buffer_position(), err);
                    break;
                }
                _ => {}
            }
        }

        Document { elements }
    }

    /// All text below element `idx`, concatenated in document order.
    fn text_of(&self, idx: usize) -> String {
        let mut out = String::new();
        self.collect_text(idx, &mut out);
        out
    }

    fn collect_text(&self, idx: usize, out: &mut String) {
        for child in &self.elements[idx].children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(c) => self.collect_text(*c, out),
            }
        }
    }

    fn named<'a>(&'a self, names: &'a [&'a str]) -> impl Iterator<Item = usize> + 'a {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, el)| names.contains(&el.name.as_str()))
            .map(|(i, _)| i)
    }

    /// Text of the direct `li` children of every `ul`/`ol`, blanks skipped.
    pub fn list_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        for list in self.named(&["ul", "ol"]) {
            for child in &self.elements[list].children {
                if let Node::Element(c) = child {
                    if self.elements[*c].name == "li" {
                        let text = self.text_of(*c).trim().to_string();
                        if !text.is_empty() {
                            items.push(text);
                        }
                    }
                }
            }
        }
        items
    }

    /// Paragraphs long enough and mentioning a period or a conflict.
    pub fn event_paragraphs(&self) -> Vec<String> {
        self.named(&["p"])
            .map(|p| self.text_of(p).trim().to_string())
            .filter(|text| is_event_paragraph(text))
            .collect()
    }
}

fn push_element(elements: &mut Vec<Element>, parent: usize, name: String) -> usize {
    let idx = elements.len();
    elements.push(Element {
        name,
        children: Vec::new(),
    });
    elements[parent].children.push(Node::Element(idx));
    idx
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn is_event_paragraph(text: &str) -> bool {
    if text.chars().count() <= MIN_PARAGRAPH_CHARS {
        return false;
    }
    let lowered = text.to_lowercase();
    PARAGRAPH_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "shy" => "\u{ad}",
        "ndash" => "–",
        "mdash" => "—",
        "laquo" => "«",
        "raquo" => "»",
        "bdquo" => "„",
        "ldquo" => "“",
        "rdquo" => "”",
        "hellip" => "…",
        "middot" => "·",
        "deg" => "°",
        _ => return None,
    })
}

/// Candidate fragments of a page: list items first, then qualifying paragraphs.
pub fn candidate_fragments(html: &str) -> Vec<String> {
    let doc = Document::parse(html);
    let mut fragments = doc.list_items();
    fragments.extend(doc.event_paragraphs());
    fragments
}

// ── Tests ──
