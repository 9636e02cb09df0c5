use std::cmp;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const MAX_CELL_WIDTH: usize = 48;

/// Widths are counted in chars so Arabic headers line up with Latin ones.
fn width_of(value: &str) -> usize {
    value.chars().count()
}

fn pad(value: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(width_of(value)));
    match align {
        Align::Left => format!("{value}{fill}"),
        Align::Right => format!("{fill}{value}"),
    }
}

fn clip(value: &str) -> String {
    if width_of(value) <= MAX_CELL_WIDTH {
        return value.to_string();
    }
    let mut clipped = value.chars().take(MAX_CELL_WIDTH - 1).collect::<String>();
    clipped.push('…');
    clipped
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| width_of(label))
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| {
            format!("{padding}{}  {value}", pad(label, label_width, Align::Left))
        })
        .collect()
}

pub fn render_table(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let clipped = rows
        .iter()
        .map(|row| row.iter().map(|cell| clip(cell)).collect::<Vec<String>>())
        .collect::<Vec<Vec<String>>>();

    let mut widths = columns
        .iter()
        .map(|column| width_of(column.name))
        .collect::<Vec<usize>>();
    for row in &clipped {
        for (index, cell) in row.iter().enumerate() {
            if let Some(slot) = widths.get_mut(index) {
                *slot = cmp::max(*slot, width_of(cell));
            }
        }
    }

    let format_row = |cells: &[String]| {
        let pieces = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let value = cells.get(index).map(String::as_str).unwrap_or("");
                pad(value, widths[index], column.align)
            })
            .collect::<Vec<String>>();
        format!("{}{}", " ".repeat(INDENT), pieces.join("  ").trim_end())
    };

    let mut output = vec![format_row(
        &columns
            .iter()
            .map(|column| column.name.to_string())
            .collect::<Vec<String>>(),
    )];
    for row in &clipped {
        output.push(format_row(row));
    }
    output
}
