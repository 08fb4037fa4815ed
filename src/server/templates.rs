//! Template rendering using minijinja with embedded templates.

use minijinja::{Environment, Error as JinjaError, ErrorKind};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rust_embed::Embed;
use serde::Serialize;

use crate::files::Entry;

/// Embedded HTML templates.
#[derive(Embed)]
#[folder = "templates/"]
pub struct Templates;

/// Characters left alone when a name is put into a URL path segment.
///
/// Matches what browsers' `encodeURIComponent` leaves unescaped, so `/`
/// inside a name is escaped too.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a name for use in `/download/...` and `/delete/...` links.
pub fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// A template engine for rendering the file manager page.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates.
    pub fn new() -> Result<Self, JinjaError> {
        let mut env = Environment::new();

        for file in Templates::iter() {
            let filename = file.to_string();
            if let Some(content) = Templates::get(&filename) {
                let template_str = std::str::from_utf8(content.data.as_ref())
                    .map_err(|_| JinjaError::from(ErrorKind::InvalidOperation))?;
                env.add_template_owned(filename, template_str.to_string())?;
            }
        }

        Ok(Self { env })
    }

    /// Render the listing page for `entries`, advertising `urls`.
    pub fn render_index(&self, entries: &[Entry], urls: &[String]) -> Result<String, JinjaError> {
        let template = self.env.get_template("index.html")?;
        let view = IndexView::new(entries, urls);
        template.render(minijinja::context! { page => view })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new().expect("failed to initialize template engine")
    }
}

/// A view model for the listing page.
#[derive(Debug, Clone, Serialize)]
pub struct IndexView {
    pub entries: Vec<EntryView>,
    pub urls: Vec<String>,
}

impl IndexView {
    pub fn new(entries: &[Entry], urls: &[String]) -> Self {
        Self {
            entries: entries.iter().map(EntryView::from_entry).collect(),
            urls: urls.to_vec(),
        }
    }
}

/// A view model for one row of the listing.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub name: String,
    pub size: String,
    pub is_directory: bool,
    /// Name encoded for a URL path segment.
    pub encoded_name: String,
}

impl EntryView {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            size: entry.display_size(),
            is_directory: entry.is_directory,
            encoded_name: encode_name(&entry.name),
        }
    }
}
