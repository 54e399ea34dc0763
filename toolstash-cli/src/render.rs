//! Tool catalog listing as an ASCII table or markdown.

use clap::ValueEnum;
use toolstash_core::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Markdown,
}

const HEADERS: [&str; 2] = ["TOOL", "DESCRIPTION"];

/// Formats `tools` followed by a one-line summary.
pub fn tools(tools: &[Tool], format: OutputFormat) -> String {
    let rows: Vec<[&str; 2]> = tools
        .iter()
        .map(|t| [t.name.as_str(), t.description.as_str()])
        .collect();

    let mut out = match format {
        OutputFormat::Table => table(&rows),
        OutputFormat::Markdown => markdown(&rows),
    };
    out.push_str(&format!(
        "There are {} tools, use `toolstash get NAME` to download one.\n",
        tools.len()
    ));
    out
}

fn widths(rows: &[[&str; 2]]) -> [usize; 2] {
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn table(rows: &[[&str; 2]]) -> String {
    let widths = widths(rows);
    let border = format!(
        "+{}+{}+\n",
        "-".repeat(widths[0] + 2),
        "-".repeat(widths[1] + 2)
    );
    let line = |cells: &[&str; 2]| {
        format!(
            "| {:<w0$} | {:<w1$} |\n",
            cells[0],
            cells[1],
            w0 = widths[0],
            w1 = widths[1]
        )
    };

    let mut out = border.clone();
    out.push_str(&line(&HEADERS));
    out.push_str(&border);
    for row in rows {
        out.push_str(&line(row));
    }
    out.push_str(&border);
    out
}

fn markdown(rows: &[[&str; 2]]) -> String {
    let escape = |cell: &str| cell.replace('|', "\\|");

    let mut out = format!("| {} | {} |\n", HEADERS[0], HEADERS[1]);
    out.push_str("|------|-------------|\n");
    for row in rows {
        out.push_str(&format!("| {} | {} |\n", escape(row[0]), escape(row[1])));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolstash_core::Catalog;

    fn sample() -> Vec<Tool> {
        vec![
            Tool::new("gh", "GitHub's official command line tool.", "https://x/gh"),
            Tool::new("kind", "Run local Kubernetes clusters.", "https://x/kind"),
        ]
    }

    #[test]
    fn test_table() {
        let out = tools(&sample(), OutputFormat::Table);
        let expected = "\
+------+--------------------------------------+
| TOOL | DESCRIPTION                          |
+------+--------------------------------------+
| gh   | GitHub's official command line tool. |
| kind | Run local Kubernetes clusters.       |
+------+--------------------------------------+
There are 2 tools, use `toolstash get NAME` to download one.
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_markdown() {
        let mut list = sample();
        list.push(Tool::new("pipe", "a | b", "https://x/pipe"));
        let out = tools(&list, OutputFormat::Markdown);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| TOOL | DESCRIPTION |");
        assert_eq!(lines[1], "|------|-------------|");
        assert_eq!(lines[2], "| gh | GitHub's official command line tool. |");
        assert_eq!(lines[4], "| pipe | a \\| b |");
        assert!(lines[5].starts_with("There are 3 tools"));
    }

    #[test]
    fn test_builtin_table_is_rectangular() {
        let out = tools(Catalog::builtin().list_all(), OutputFormat::Table);
        let widths: Vec<usize> = out
            .lines()
            .filter(|l| l.starts_with('|') || l.starts_with('+'))
            .map(|l| l.chars().count())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert!(out.contains("| kubectl "));
    }
}
