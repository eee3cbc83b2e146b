//! XML report of a read project.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <content valid="true" flat="false">
//!   <SOURCES>
//!     <file>main.cpp</file>
//!   </SOURCES>
//!   <HEADERS/>
//!   <RESOURCES/>
//!   <FORMS/>
//! </content>
//! ```

use std::fmt::Write as _;
use std::io;

use crate::reader::ProjectReader;

/// Elements in report order.
const SECTIONS: [&str; 4] = ["SOURCES", "HEADERS", "RESOURCES", "FORMS"];

/// Snapshot of a [`ProjectReader`] ready for output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Whether the read succeeded.
    pub valid: bool,
    /// Whether `CONFIG` contains `flat`.
    pub flat: bool,
    /// `SOURCES`
    pub sources: Vec<String>,
    /// `HEADERS`
    pub headers: Vec<String>,
    /// `RESOURCES`
    pub resources: Vec<String>,
    /// `FORMS`
    pub forms: Vec<String>,
}

impl Report {
    /// Captures the reader's current state.
    #[must_use]
    pub fn from_reader(reader: &ProjectReader) -> Self {
        Self {
            valid: reader.is_valid(),
            flat: reader.is_flat(),
            sources: reader.source_files().to_vec(),
            headers: reader.header_files().to_vec(),
            resources: reader.resource_files().to_vec(),
            forms: reader.form_files().to_vec(),
        }
    }

    fn section(&self, name: &str) -> &[String] {
        match name {
            "SOURCES" => &self.sources,
            "HEADERS" => &self.headers,
            "RESOURCES" => &self.resources,
            _ => &self.forms,
        }
    }

    /// Renders the report.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(xml, "<content valid=\"{}\" flat=\"{}\">", self.valid, self.flat);
        for name in SECTIONS {
            let files = self.section(name);
            if files.is_empty() {
                let _ = writeln!(xml, "  <{name}/>");
                continue;
            }
            let _ = writeln!(xml, "  <{name}>");
            for file in files {
                let _ = writeln!(xml, "    <file>{}</file>", escape(file));
            }
            let _ = writeln!(xml, "  </{name}>");
        }
        xml.push_str("</content>\n");
        xml
    }

    /// Writes the rendered report to `out`.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn write_to(&self, out: &mut impl io::Write) -> io::Result<()> {
        out.write_all(self.to_xml().as_bytes())?;
        out.flush()
    }
}

/// Escapes XML character data.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
