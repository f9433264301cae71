//! Plain column-aligned tables which stay easy to consume with `awk` and
//! `cut`: headers never contain whitespace, columns are separated by two
//! spaces.

use std::fmt::{self, Write};

pub(crate) struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new<const N: usize>(header: [&str; N]) -> Table {
        assert!(
            header.iter().all(|h| !h.contains(char::is_whitespace)),
            "table header must not contain whitespace"
        );

        Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            print_header: true,
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row<const N: usize>(&mut self, row: [String; N]) {
        assert_eq!(
            N,
            self.header.len(),
            "row width does not match the table header"
        );

        self.rows.push(row.into());
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        let header = self.print_header.then_some(&self.header);

        header.into_iter().chain(self.rows.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.header.len()];

        for row in self.visible_rows() {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            let last = row.len() - 1;

            for (i, cell) in row.iter().enumerate() {
                if i == last {
                    f.write_str(cell)?;
                } else {
                    write!(f, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}
