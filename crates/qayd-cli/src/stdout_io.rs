use std::io::{self, Write};

/// Writes raw text (help screens) to stdout.
pub fn write_stdout_text(text: &str) -> io::Result<()> {
    write_parts(&mut io::stdout().lock(), &[text.as_bytes()])
}

/// Writes a rendered report or envelope followed by a newline.
pub fn write_stdout_line(text: &str) -> io::Result<()> {
    write_parts(&mut io::stdout().lock(), &[text.as_bytes(), b"\n"])
}

/// A reader closing the pipe early (`qayd backup list | head`) is not an error.
fn write_parts(writer: &mut dyn Write, parts: &[&[u8]]) -> io::Result<()> {
    for part in parts {
        if pipe_closed(writer.write_all(part))? {
            return Ok(());
        }
    }
    pipe_closed(writer.flush()).map(|_| ())
}

fn pipe_closed(result: io::Result<()>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(false),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(true),
        Err(error) => Err(error),
    }
}
