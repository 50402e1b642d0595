//! Minimal HTML writers for the settings form.
//!
//! Everything goes through `core::fmt::Write`, so the same code renders into
//! a `String` on desktop or a fixed `heapless::String` chunk on a device.

use core::fmt::{self, Write};

/// `fmt::Write` adapter that escapes HTML special characters.
///
/// ```rust
/// use core::fmt::Write;
/// use esp_core_kit::settings::html::Escaper;
///
/// let mut out = String::new();
/// write!(Escaper(&mut out), "<b>\"Tom & Jerry\"</b>").unwrap();
/// assert_eq!(out, "&lt;b&gt;&quot;Tom &amp; Jerry&quot;&lt;/b&gt;");
/// ```
pub struct Escaper<'a, W: Write + ?Sized>(pub &'a mut W);

impl<W: Write + ?Sized> Write for Escaper<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s;
        while let Some(pos) = rest.find(|c: char| matches!(c, '<' | '>' | '&' | '"' | '\'')) {
            self.0.write_str(&rest[..pos])?;
            let entity = match rest.as_bytes()[pos] {
                b'<' => "&lt;",
                b'>' => "&gt;",
                b'&' => "&amp;",
                b'"' => "&quot;",
                _ => "&#39;",
            };
            self.0.write_str(entity)?;
            rest = &rest[pos + 1..];
        }
        self.0.write_str(rest)
    }
}

/// Writes `s` with HTML special characters escaped.
pub fn escape<W: Write + ?Sized>(w: &mut W, s: &str) -> fmt::Result {
    Escaper(&mut *w).write_str(s)
}

/// Opens a form row: `<tr><td><label for=id>label</label></td><td>`.
pub fn row_start<W: Write + ?Sized>(w: &mut W, id: &str, label: &str) -> fmt::Result {
    w.write_str("<tr><td><label for=\"")?;
    escape(w, id)?;
    w.write_str("\">")?;
    escape(w, label)?;
    w.write_str("</label></td><td>")
}

/// Closes a row opened by [`row_start`].
pub fn row_end<W: Write + ?Sized>(w: &mut W) -> fmt::Result {
    w.write_str("</td></tr>\n")
}

/// Writes the opening of an `<input>` tag with its type, id and name.
///
/// The caller appends any extra attributes and then calls [`input_end`].
pub fn input_start<W: Write + ?Sized>(w: &mut W, kind: &str, id: &str) -> fmt::Result {
    write!(w, "<input type=\"{kind}\" id=\"")?;
    escape(w, id)?;
    w.write_str("\" name=\"")?;
    escape(w, id)?;
    w.write_str("\"")
}

/// Writes ` value="…"` using the `Display` output of `value`, escaped.
pub fn value_attr<W: Write + ?Sized>(w: &mut W, value: &dyn fmt::Display) -> fmt::Result {
    w.write_str(" value=\"")?;
    write!(Escaper(&mut *w), "{value}")?;
    w.write_str("\"")
}

/// Closes an `<input>` tag.
pub fn input_end<W: Write + ?Sized>(w: &mut W) -> fmt::Result {
    w.write_str(">")
}
