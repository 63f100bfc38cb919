use std::io::Write;

use ::csv as csv_crate;

use super::{Cell, ConsolidatedReport, Table};
use crate::leads::Exclusion;

pub mod human {
    use super::*;

    /// Prints the report as a column-aligned text table. Number columns are
    /// right-aligned, text columns left-aligned.
    pub fn print_report<W>(report: &ConsolidatedReport, mut out: W) -> std::io::Result<()>
    where
        W: Write,
    {
        let Table { columns, rows } = report.to_table();
        let rendered: Vec<Vec<String>> =
            rows.iter().map(|row| row.iter().map(|cell| cell.to_string()).collect()).collect();

        let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header: Vec<String> =
            columns.iter().zip(&widths).map(|(c, w)| format!("{:<w$}", c, w = *w)).collect();
        writeln!(out, "{}", header.join(" | ").trim_end())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(out, "{}", rule.join("-+-"))?;

        for (row, cells) in rows.iter().zip(&rendered) {
            if row.iter().all(|cell| *cell == Cell::Empty) {
                writeln!(out)?;
                continue;
            }
            let line: Vec<String> = row
                .iter()
                .zip(cells)
                .zip(&widths)
                .map(|((cell, text), w)| match cell {
                    Cell::Number(_) => format!("{:>w$}", text, w = *w),
                    _ => format!("{:<w$}", text, w = *w),
                })
                .collect();
            writeln!(out, "{}", line.join(" | ").trim_end())?;
        }
        Ok(())
    }

    pub fn print_exclusions<W>(exclusions: &[Exclusion], mut out: W) -> std::io::Result<()>
    where
        W: Write,
    {
        writeln!(out, "Excluded rows: ================")?;
        for exclusion in exclusions {
            writeln!(out, "row {}: {}", exclusion.row_number, reasons(exclusion))?;
        }
        Ok(())
    }
}

pub mod csv {
    use super::*;

    pub fn print_report<W>(report: &ConsolidatedReport, out: W) -> std::io::Result<()>
    where
        W: Write,
    {
        let Table { columns, rows } = report.to_table();
        let mut writer = csv_crate::Writer::from_writer(out);
        writer.write_record(&columns)?;
        for row in rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn print_exclusions<W>(exclusions: &[Exclusion], out: W) -> std::io::Result<()>
    where
        W: Write,
    {
        let mut writer = csv_crate::Writer::from_writer(out);
        writer.write_record(["Row", "Reasons"])?;
        for exclusion in exclusions {
            writer.write_record([exclusion.row_number.to_string(), reasons(exclusion)])?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub mod json {
    use super::*;

    /// Writes `{"columns": [...], "rows": [[...], ...]}`. Blank cells are
    /// empty strings, numbers stay numbers.
    pub fn print_report<W>(report: &ConsolidatedReport, mut out: W) -> std::io::Result<()>
    where
        W: Write,
    {
        serde_json::to_writer_pretty(&mut out, &report.to_table())?;
        writeln!(out)?;
        Ok(())
    }
}

fn reasons(exclusion: &Exclusion) -> String {
    exclusion.reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("; ")
}
