use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use mzdata::spectrum::utils::Collator;
use serde::Serialize;
use tracing::{debug, error, info};

use mzformula::composition::Composition;

use crate::args::OutputFormat;
use crate::proc::QueryResult;

/// Forward items to `sender` in index order as they arrive out of order on `receiver`
pub(crate) fn collate_results<T: Send>(receiver: Receiver<(usize, T)>, sender: Sender<(usize, T)>) {
    let mut collator = Collator::default();
    while !collator.done {
        match receiver.recv() {
            Ok((key, item)) => collator.receive(key, item),
            Err(_) => {
                collator.done = true;
            }
        }
        while let Some((key, item)) = collator.try_next() {
            if let Err(e) = sender.send((key, item)) {
                error!("Failed to send {key} for writing: {e}");
                return;
            }
        }
    }

    let n = collator.waiting.len();
    if n > 0 {
        debug!("Draining output queue, {n} items");
        let mut waiting_items: Vec<_> = collator.waiting.drain().collect();
        waiting_items.sort_by(|(i, _), (j, _)| i.cmp(j));
        for (key, item) in waiting_items {
            if let Err(e) = sender.send((key, item)) {
                error!("Failed to send {key} for writing: {e}");
                break;
            }
        }
    }
    debug!("Query collator done");
}

/// Format a number the way a default C++ output stream does, with six significant
/// digits and no trailing zeros, switching to scientific notation for very large or
/// very small magnitudes
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    const PRECISION: i32 = 6;
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map(|(m, e)| (m.to_string(), e.parse::<i32>().unwrap_or(0)))
        .unwrap_or((scientific.clone(), 0));
    if exponent < -4 || exponent >= PRECISION {
        let mantissa = trim_fraction(&mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

pub(crate) const CSV_HEADER: &str = "Formula;RDB;LEWIS;Mass_Da;Mass_Error_mDa \n";

pub(crate) fn write_csv_block<W: Write>(writer: &mut W, result: &QueryResult) -> io::Result<()> {
    writer.write_all(b"\n")?;
    writer.write_all(CSV_HEADER.as_bytes())?;
    for formula in result.formulas.iter() {
        writeln!(
            writer,
            "{};{};{};{};{} ",
            formula.composition,
            format_general(formula.rdb),
            format_general(formula.lewis),
            format_general(formula.mass),
            format_general(formula.mass_error_milli),
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct FormulaRecord<'a> {
    query: usize,
    comment: &'a str,
    target: f64,
    formula: String,
    composition: &'a Composition,
    mass: f64,
    rdb: f64,
    lewis: f64,
    mass_error_milli: f64,
    mass_error_ppm: f64,
}

pub(crate) fn write_json_lines<W: Write>(writer: &mut W, result: &QueryResult) -> io::Result<()> {
    for formula in result.formulas.iter() {
        let record = FormulaRecord {
            query: result.query.index,
            comment: &result.query.comment,
            target: result.window.target,
            formula: formula.formula(),
            composition: &formula.composition,
            mass: formula.mass,
            rdb: formula.rdb,
            lewis: formula.lewis,
            mass_error_milli: formula.mass_error_milli,
            mass_error_ppm: formula.mass_error_ppm(),
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write collated query results in order until the channel closes.
///
/// On a write failure, `cancellation` is raised so in-flight searches stop early.
pub(crate) fn write_output<W: Write>(
    mut writer: W,
    receiver: Receiver<(usize, QueryResult)>,
    format: OutputFormat,
    cancellation: Arc<AtomicBool>,
) -> io::Result<W> {
    let mut checkpoint = 0usize;
    let mut query_counter = 0usize;
    let mut formula_counter = 0usize;
    while let Ok((query_idx, result)) = receiver.recv() {
        query_counter += 1;
        formula_counter += result.formulas.len();
        if (query_idx - checkpoint) >= 1000 {
            let queue_size = receiver.len();
            info!(
                "Completed Query {} | Formulas={formula_counter} | {queue_size} items in the write queue",
                query_idx + 1
            );
            checkpoint = query_idx;
        }
        let outcome = match format {
            OutputFormat::Csv => write_csv_block(&mut writer, &result),
            OutputFormat::Json => write_json_lines(&mut writer, &result),
        };
        if let Err(e) = outcome {
            cancellation.store(true, Ordering::Relaxed);
            return Err(e);
        }
    }
    if let Err(e) = writer.flush() {
        cancellation.store(true, Ordering::Relaxed);
        return Err(e);
    }
    info!("Finished | Queries={query_counter} Formulas={formula_counter}");
    Ok(writer)
}
