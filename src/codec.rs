use crate::fonts::{FontRegistry, StandardFont};
use crate::lopdf_utils::{as_rectangle, Rectangle};
use crate::pdf_object::PdfObjectDeref;
use crate::Error;
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use std::collections::HashMap;

/// A single page of a loaded document with its size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    id: ObjectId,
    index: usize,
    width: f64,
    height: f64,
}

impl Page {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// A font added to the document object list, ready to be used on any page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontHandle {
    font: StandardFont,
    object_id: ObjectId,
}

impl FontHandle {
    pub fn font(&self) -> StandardFont {
        self.font
    }
}

/// The whole PDF document, kept as a parsed object graph until it is serialized again.
#[derive(Debug, Clone)]
pub struct PDFStampDocument {
    raw_document: Document,
    /// Link between the standard font and the objectId of its font dictionary.
    /// This is used so a font is only added once, no matter how often it is drawn with.
    embedded_fonts: HashMap<StandardFont, ObjectId>,
}

impl PDFStampDocument {
    pub fn new(raw_document: Document) -> Self {
        PDFStampDocument {
            raw_document,
            embedded_fonts: HashMap::new(),
        }
    }

    /// Parse a PDF byte stream.
    pub fn load(bytes: &[u8]) -> Result<Self, Error> {
        let raw_document = Document::load_mem(bytes).map_err(Error::CorruptDocument)?;
        Ok(Self::new(raw_document))
    }

    pub fn get_document_ref(&self) -> &Document {
        &self.raw_document
    }

    pub fn page_count(&self) -> usize {
        self.raw_document.get_pages().len()
    }

    /// Get a page by its 0-based index.
    pub fn page(&self, index: i64) -> Result<Page, Error> {
        let pages = self.raw_document.get_pages();
        let out_of_range = || Error::PageOutOfRange {
            index,
            page_count: pages.len(),
        };
        let position = usize::try_from(index).map_err(|_| out_of_range())?;
        // `get_pages` is keyed by 1-based page number.
        let page_number = u32::try_from(position + 1).map_err(|_| out_of_range())?;
        let page_id = *pages.get(&page_number).ok_or_else(out_of_range)?;

        let media_box = self
            .inherited_attribute(page_id, b"MediaBox")?
            .ok_or_else(|| Error::Other(format!("Page {} has no MediaBox.", index)))?;
        let rect: Rectangle = as_rectangle(media_box, &self.raw_document)?;
        Ok(Page {
            id: page_id,
            index: position,
            width: rect.width(),
            height: rect.height(),
        })
    }

    /// Add the font a logical family name maps to. Unknown names get the default font.
    pub fn embed_font(&mut self, logical_name: Option<&str>) -> FontHandle {
        let font = FontRegistry::standard().resolve(logical_name);
        self.embed_standard_font(font)
    }

    pub fn embed_standard_font(&mut self, font: StandardFont) -> FontHandle {
        if let Some(object_id) = self.embedded_fonts.get(&font) {
            // Font was already added so we can reuse it.
            return FontHandle {
                font,
                object_id: *object_id,
            };
        }
        let mut font_dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
        };
        if !font.is_symbolic() {
            font_dict.set("Encoding", "WinAnsiEncoding");
        }
        let object_id = self.raw_document.add_object(font_dict);
        self.embedded_fonts.insert(font, object_id);
        FontHandle { font, object_id }
    }

    /// Draw `text` on the page with its baseline starting at `(x, y)` in user space.
    /// Line breaks start a new line below the previous one.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text(
        &mut self,
        page: &Page,
        text: &str,
        x: f64,
        y: f64,
        font: &FontHandle,
        size: f64,
        color: (f64, f64, f64),
    ) -> Result<(), Error> {
        let resource_name = self.add_font_to_page(page.id, font)?;

        let mut content = Content {
            operations: Vec::<Operation>::new(),
        };
        // The following lines use commands: see p643 (Table A.1) for more info
        // `q` = Save graphics state
        content.operations.push(Operation::new("q", vec![]));
        // `rg` = Set fill color (RGB)
        content.operations.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        // `BT` = Begin text object
        content.operations.push(Operation::new("BT", vec![]));
        // `Tf` = Set font and size
        content.operations.push(Operation::new(
            "Tf",
            vec![Object::Name(resource_name.into_bytes()), size.into()],
        ));
        // `TL` = Set leading
        content
            .operations
            .push(Operation::new("TL", vec![(size * 1.2).into()]));
        // `Td` = Move to start of next line (here: the start position)
        content
            .operations
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        for (line_nr, line) in split_lines(text).into_iter().enumerate() {
            if line_nr > 0 {
                // `T*` = Move to start of next line, using the leading
                content.operations.push(Operation::new("T*", vec![]));
            }
            let encoded = encode_text(line, font.font);
            // `Tj` = Show text
            content.operations.push(Operation::new(
                "Tj",
                vec![Object::String(encoded, StringFormat::Hexadecimal)],
            ));
        }
        // `ET` = End text object
        content.operations.push(Operation::new("ET", vec![]));
        // `Q` = Restore graphics state
        content.operations.push(Operation::new("Q", vec![]));

        self.append_to_page_content(page.id, content.encode()?)
    }

    /// Write the document graph back to bytes.
    pub fn serialize(&mut self) -> Result<Vec<u8>, Error> {
        let mut output = Vec::new();
        self.raw_document.save_to(&mut output)?;
        Ok(output)
    }

    /// Look up a page attribute, walking up the page tree for inheritable ones.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<&Object>, Error> {
        let mut node = self.raw_document.get_object(page_id)?.as_dict()?;
        // Guard against malformed trees where `Parent` loops.
        for _ in 0..64 {
            if let Ok(value) = node.get(key) {
                return Ok(Some(value));
            }
            match node.get(b"Parent") {
                Ok(parent) => node = parent.deref_dict(&self.raw_document)?,
                Err(_) => return Ok(None),
            }
        }
        log::warn!("Page tree is deeper than expected, giving up on `{}`.", String::from_utf8_lossy(key));
        Ok(None)
    }

    /// Make the font available to the page under a name that does not clash with
    /// fonts already used on it. Returns that name.
    ///
    /// The page gets its own copy of the resource dictionary so other pages sharing
    /// the original resources are not touched.
    fn add_font_to_page(&mut self, page_id: ObjectId, font: &FontHandle) -> Result<String, Error> {
        let mut resources = match self.inherited_attribute(page_id, b"Resources")? {
            Some(obj) => obj.deref_dict(&self.raw_document)?.clone(),
            None => Dictionary::new(),
        };
        let mut fonts = match resources.get(b"Font") {
            Ok(obj) => obj.deref_dict(&self.raw_document)?.clone(),
            Err(_) => Dictionary::new(),
        };

        let base_name = font.font.resource_name();
        let mut name = base_name.to_owned();
        let mut counter = 1;
        loop {
            match fonts.get(name.as_bytes()) {
                Ok(existing) if existing.get_object_id() == Some(font.object_id) => break,
                Ok(_) => {
                    name = format!("{}{}", base_name, counter);
                    counter += 1;
                }
                Err(_) => {
                    fonts.set(name.clone(), Object::Reference(font.object_id));
                    break;
                }
            }
        }

        resources.set("Font", Object::Dictionary(fonts));
        self.raw_document
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    /// Append a content stream to the page. The existing content is wrapped in
    /// `q`/`Q` so any graphics state it leaves behind does not leak into ours.
    fn append_to_page_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<(), Error> {
        let existing: Vec<Object> = {
            let page = self.raw_document.get_object(page_id)?.as_dict()?;
            match page.get(b"Contents") {
                Ok(contents) => match contents.deref(&self.raw_document)? {
                    Object::Array(list) => list.clone(),
                    Object::Stream(_) if contents.get_object_id().is_some() => {
                        vec![contents.clone()]
                    }
                    _ => {
                        return Err(Error::Other(
                            "Page `Contents` is not a stream or array.".to_owned(),
                        ))
                    }
                },
                Err(_) => Vec::new(),
            }
        };

        let mut new_contents = Vec::with_capacity(existing.len() + 3);
        if !existing.is_empty() {
            let save_id = self
                .raw_document
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let restore_id = self
                .raw_document
                .add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            new_contents.push(Object::Reference(save_id));
            new_contents.extend(existing);
            new_contents.push(Object::Reference(restore_id));
        }
        let stamp_id = self
            .raw_document
            .add_object(Stream::new(Dictionary::new(), content));
        new_contents.push(Object::Reference(stamp_id));

        self.raw_document
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(new_contents));
        Ok(())
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    for line in text.split('\n') {
        lines.push(line.strip_suffix('\r').unwrap_or(line));
    }
    lines
}

/// Encode text for a standard font. Symbolic fonts take the character code as is,
/// the others use `WinAnsiEncoding`. Characters that can not be encoded become `?`.
pub(crate) fn encode_text(text: &str, font: StandardFont) -> Vec<u8> {
    let mut replaced = 0;
    let encoded = text
        .chars()
        .map(|c| {
            let code = if font.is_symbolic() {
                u8::try_from(u32::from(c)).ok().filter(|b| *b >= 0x20)
            } else {
                win_ansi_code(c)
            };
            code.unwrap_or_else(|| {
                replaced += 1;
                b'?'
            })
        })
        .collect();
    if replaced > 0 {
        log::warn!(
            "{} character(s) can not be shown with {}, replaced by `?`.",
            replaced,
            font.base_font()
        );
    }
    encoded
}

fn win_ansi_code(c: char) -> Option<u8> {
    let code = match c {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => return u8::try_from(u32::from(c)).ok(),
        '\t' => 0x20,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(code)
}
