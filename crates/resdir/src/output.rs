//! Report sinks.
//!
//! Operations only ever produce label/value pairs and plain lines; an
//! [`Output`] decides how they are rendered. Labels may start with a newline
//! to request a blank separator line, which structured formats ignore.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Destination of report items.
pub trait Output {
    /// Start a document. Called once before any item.
    fn open_document(&mut self) -> io::Result<()>;

    /// Report a labelled value.
    fn emit(&mut self, label: &str, value: &str) -> io::Result<()>;

    /// Report a line of free text.
    fn line(&mut self, text: &str) -> io::Result<()>;

    /// Finish the document and flush.
    fn close_document(&mut self) -> io::Result<()>;
}

/// Available report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    #[cfg(feature = "json-output")]
    Json,
    #[cfg(feature = "xml-output")]
    Xml,
}

impl OutputFormat {
    /// Every format compiled in.
    pub const ALL: &'static [OutputFormat] = &[
        OutputFormat::Text,
        OutputFormat::Csv,
        #[cfg(feature = "json-output")]
        OutputFormat::Json,
        #[cfg(feature = "xml-output")]
        OutputFormat::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            #[cfg(feature = "json-output")]
            OutputFormat::Json => "json",
            #[cfg(feature = "xml-output")]
            OutputFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = OutputFormat::ALL.iter().map(|f| f.name()).collect();
                format!("invalid format '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Create a sink of the given format writing to `writer`.
pub fn create_output<'w>(format: OutputFormat, writer: Box<dyn Write + 'w>) -> Box<dyn Output + 'w> {
    match format {
        OutputFormat::Text => Box::new(TextOutput::new(writer)),
        OutputFormat::Csv => Box::new(CsvOutput::new(writer)),
        #[cfg(feature = "json-output")]
        OutputFormat::Json => Box::new(JsonOutput::new(writer)),
        #[cfg(feature = "xml-output")]
        OutputFormat::Xml => Box::new(XmlOutput::new(writer)),
    }
}

fn strip_separator(label: &str) -> &str {
    label.trim_start_matches('\n')
}

/// Column the values of text reports are aligned to.
const TEXT_LABEL_WIDTH: usize = 32;

/// Human-readable `label: value` lines.
pub struct TextOutput<W: Write> {
    writer: W,
}

impl<W: Write> TextOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Output for TextOutput<W> {
    fn open_document(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn emit(&mut self, label: &str, value: &str) -> io::Result<()> {
        let trimmed = strip_separator(label);
        for _ in 0..label.len() - trimmed.len() {
            writeln!(self.writer)?;
        }
        let key = format!("{trimmed}:");
        writeln!(self.writer, "{key:<width$} {value}", width = TEXT_LABEL_WIDTH)
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{text}")
    }

    fn close_document(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// `label,value` records.
pub struct CsvOutput<W: Write> {
    writer: W,
}

impl<W: Write> CsvOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn csv_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

impl<W: Write> Output for CsvOutput<W> {
    fn open_document(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn emit(&mut self, label: &str, value: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{}",
            csv_field(strip_separator(label)),
            csv_field(value)
        )
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.emit("line", text)
    }

    fn close_document(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(feature = "json-output")]
mod json {
    use std::io::{self, Write};

    use serde::Serialize;

    use super::{strip_separator, Output};

    #[derive(Debug, Serialize)]
    struct Item {
        label: String,
        value: String,
    }

    /// A JSON array of `{ "label", "value" }` objects, written on close.
    pub struct JsonOutput<W: Write> {
        writer: W,
        items: Vec<Item>,
    }

    impl<W: Write> JsonOutput<W> {
        pub fn new(writer: W) -> Self {
            Self {
                writer,
                items: Vec::new(),
            }
        }

        pub fn into_inner(self) -> W {
            self.writer
        }
    }

    impl<W: Write> Output for JsonOutput<W> {
        fn open_document(&mut self) -> io::Result<()> {
            self.items.clear();
            Ok(())
        }

        fn emit(&mut self, label: &str, value: &str) -> io::Result<()> {
            self.items.push(Item {
                label: strip_separator(label).to_string(),
                value: value.to_string(),
            });
            Ok(())
        }

        fn line(&mut self, text: &str) -> io::Result<()> {
            self.emit("line", text)
        }

        fn close_document(&mut self) -> io::Result<()> {
            serde_json::to_writer_pretty(&mut self.writer, &self.items)?;
            writeln!(self.writer)?;
            self.items.clear();
            self.writer.flush()
        }
    }
}

#[cfg(feature = "json-output")]
pub use json::JsonOutput;

#[cfg(feature = "xml-output")]
mod xml {
    use std::io::{self, Write};

    use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
    use quick_xml::Writer;

    use super::{strip_separator, Output};

    const ROOT: &str = "document";
    const ITEM: &str = "item";

    fn xml_error<E>(e: E) -> io::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        io::Error::other(e)
    }

    /// `<document>` with one `<item label="...">` element per value.
    pub struct XmlOutput<W: Write> {
        writer: Writer<W>,
    }

    impl<W: Write> XmlOutput<W> {
        pub fn new(writer: W) -> Self {
            Self {
                writer: Writer::new_with_indent(writer, b' ', 2),
            }
        }

        pub fn into_inner(self) -> W {
            self.writer.into_inner()
        }
    }

    impl<W: Write> Output for XmlOutput<W> {
        fn open_document(&mut self) -> io::Result<()> {
            self.writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(xml_error)?;
            self.writer
                .write_event(Event::Start(BytesStart::new(ROOT)))
                .map_err(xml_error)
        }

        fn emit(&mut self, label: &str, value: &str) -> io::Result<()> {
            let mut item = BytesStart::new(ITEM);
            item.push_attribute(("label", strip_separator(label)));

            self.writer
                .write_event(Event::Start(item))
                .map_err(xml_error)?;
            self.writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(xml_error)?;
            self.writer
                .write_event(Event::End(BytesEnd::new(ITEM)))
                .map_err(xml_error)
        }

        fn line(&mut self, text: &str) -> io::Result<()> {
            self.emit("line", text)
        }

        fn close_document(&mut self) -> io::Result<()> {
            self.writer
                .write_event(Event::End(BytesEnd::new(ROOT)))
                .map_err(xml_error)?;
            let inner = self.writer.get_mut();
            writeln!(inner)?;
            inner.flush()
        }
    }
}

#[cfg(feature = "xml-output")]
pub use xml::XmlOutput;
