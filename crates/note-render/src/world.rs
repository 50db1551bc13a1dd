//! In-memory Typst world for note compilation
//!
//! Notes are compiled from a single generated source with no assets, so the
//! world is just that source, the embedded fonts, and the `sys.inputs`
//! dictionary carrying the document/comment tables.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Datelike, Timelike, Utc};
use typst::diag::{FileError, FileResult};
use typst::foundations::{Array, Bytes, Datetime, Dict, Value};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, World};

use crate::error::RenderError;

struct EmbeddedFonts {
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

fn embedded_fonts() -> &'static EmbeddedFonts {
    static FONTS: OnceLock<EmbeddedFonts> = OnceLock::new();
    FONTS.get_or_init(|| {
        let mut book = FontBook::new();
        let mut fonts = Vec::new();
        for data in typst_assets::fonts() {
            for font in Font::iter(Bytes::from_static(data)) {
                book.push(font.info().clone());
                fonts.push(font);
            }
        }
        tracing::debug!(count = fonts.len(), "embedded fonts loaded");
        EmbeddedFonts {
            book: LazyHash::new(book),
            fonts,
        }
    })
}

/// Single-source world for one note compilation.
pub struct NoteWorld {
    main: Source,
    library: LazyHash<Library>,
    time: chrono::DateTime<Utc>,
}

impl NoteWorld {
    pub fn new(
        source: String,
        inputs: HashMap<String, serde_json::Value>,
    ) -> Result<Self, RenderError> {
        let id = FileId::new(None, VirtualPath::new("/main.typ"));
        let mut dict = Dict::new();
        for (key, value) in inputs {
            dict.insert(key.into(), json_to_value(&value)?);
        }

        Ok(Self {
            main: Source::new(id, source),
            library: LazyHash::new(Library::builder().with_inputs(dict).build()),
            time: Utc::now(),
        })
    }
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, RenderError> {
    match json {
        serde_json::Value::Null => Ok(Value::None),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(RenderError::InvalidInput(format!("invalid number: {}", n)))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Str(s.as_str().into())),
        serde_json::Value::Array(items) => {
            let values: Vec<Value> = items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(Array::from(values.as_slice())))
        }
        serde_json::Value::Object(map) => {
            let mut dict = Dict::new();
            for (k, v) in map {
                dict.insert(k.as_str().into(), json_to_value(v)?);
            }
            Ok(Value::Dict(dict))
        }
    }
}

impl World for NoteWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &embedded_fonts().book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        embedded_fonts().fonts.get(index).cloned()
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let adjusted = self.time + chrono::Duration::hours(offset.unwrap_or(0));
        Datetime::from_ymd_hms(
            adjusted.year(),
            adjusted.month() as u8,
            adjusted.day() as u8,
            adjusted.hour() as u8,
            adjusted.minute() as u8,
            adjusted.second() as u8,
        )
    }
}
