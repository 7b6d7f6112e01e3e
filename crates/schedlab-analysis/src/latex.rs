/// One table cell. Floats print with two decimals, integers verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format!("{:.2}", v),
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, Cell::Text(_))
    }
}

/// Renders a booktabs `tabular`. Text columns are left aligned, numeric
/// columns right aligned. Cell text is emitted as-is.
pub fn tabular(headers: &[&str], rows: &[Vec<Cell>]) -> String {
    let align: String = (0..headers.len())
        .map(|col| {
            let numeric = !rows.is_empty()
                && rows
                    .iter()
                    .all(|row| row.get(col).map(Cell::is_numeric).unwrap_or(false));
            if numeric {
                'r'
            } else {
                'l'
            }
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", align));
    out.push_str("\\toprule\n");
    out.push_str(&headers.join(" & "));
    out.push_str(" \\\\\n");
    out.push_str("\\midrule\n");
    for row in rows {
        let cells: Vec<String> = row.iter().map(Cell::render).collect();
        out.push_str(&cells.join(" & "));
        out.push_str(" \\\\\n");
    }
    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabular}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_booktabs_with_two_decimal_floats() {
        let rows = vec![
            vec![Cell::Text("DFS".into()), Cell::Float(1.0)],
            vec![Cell::Text("RPT-T, E = 1.75".into()), Cell::Float(12.3456)],
        ];
        let tex = tabular(&["algorithm", "time"], &rows);
        assert_eq!(
            tex,
            "\\begin{tabular}{lr}\n\
             \\toprule\n\
             algorithm & time \\\\\n\
             \\midrule\n\
             DFS & 1.00 \\\\\n\
             RPT-T, E = 1.75 & 12.35 \\\\\n\
             \\bottomrule\n\
             \\end{tabular}\n"
        );
    }

    #[test]
    fn integers_are_not_decimalized() {
        let rows = vec![vec![Cell::Text("DFS".into()), Cell::Int(2147483647)]];
        let tex = tabular(&["algorithm", "makespan"], &rows);
        assert!(tex.contains("DFS & 2147483647 \\\\"));
    }

    #[test]
    fn empty_table_keeps_header_and_rules() {
        let tex = tabular(&["algorithm", "conf"], &[]);
        assert!(tex.starts_with("\\begin{tabular}{ll}\n"));
        assert!(tex.contains("algorithm & conf \\\\\n\\midrule\n\\bottomrule\n"));
    }
}
