//! Plain-text table rendering for console output.

/// A box-drawing table. Columns size themselves to the widest cell;
/// the header row is optional (key/value listings omit it).
///
/// Example output:
/// ```text
/// ┌──────┬────┐
/// │ Name │ ID │
/// ├──────┼────┤
/// │ tea  │ 1  │
/// └──────┴────┘
/// ```
#[derive(Debug, Default)]
pub struct Table {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<R, C>(columns: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            header: Some(columns.into_iter().map(Into::into).collect()),
            rows: Vec::new(),
        }
    }

    pub fn push<R, C>(&mut self, row: R)
    where
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn render(&self) -> String {
        let widths = self.column_widths();
        if widths.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        border(&mut output, &widths, '┌', '┬', '┐');
        if let Some(header) = &self.header {
            row_line(&mut output, header, &widths);
            border(&mut output, &widths, '├', '┼', '┤');
        }
        for row in &self.rows {
            row_line(&mut output, row, &widths);
        }
        border(&mut output, &widths, '└', '┴', '┘');
        output
    }

    fn column_widths(&self) -> Vec<usize> {
        let columns = self
            .header
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut widths = vec![0; columns];
        for row in self.header.iter().chain(self.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        widths
    }
}

fn border(output: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    output.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            output.push(mid);
        }
        for _ in 0..width + 2 {
            output.push('─');
        }
    }
    output.push(right);
    output.push('\n');
}

fn row_line(output: &mut String, row: &[String], widths: &[usize]) {
    output.push('│');
    for (i, width) in widths.iter().enumerate() {
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        output.push(' ');
        output.push_str(cell);
        for _ in 0..width - cell.chars().count() + 1 {
            output.push(' ');
        }
        output.push('│');
    }
    output.push('\n');
}
