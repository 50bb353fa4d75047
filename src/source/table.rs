//! Minimal HTML-table extraction shared by the tabular-markup adapters.

use scraper::{Html, Selector};

/// One parsed table: first row as headers, remaining rows as body.
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of the first column whose lowercased header satisfies `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| pred(&header.to_lowercase()))
    }
}

/// Parse every `<table>` in the document into rows of trimmed cell text.
pub(crate) fn parse_tables(html: &str) -> Vec<Table> {
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td, th"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut tables = Vec::new();

    for table in document.select(&table_sel) {
        let mut rows: Vec<Vec<String>> = table
            .select(&row_sel)
            .map(|row| {
                row.select(&cell_sel)
                    .map(|cell| {
                        cell.text()
                            .collect::<String>()
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect()
            })
            .collect();

        if rows.is_empty() {
            continue;
        }
        let headers = rows.remove(0);
        tables.push(Table { headers, rows });
    }

    tables
}
