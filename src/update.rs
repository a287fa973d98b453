//! The update-all orchestrator: every pipeline in dependency order with a
//! summary report. Gold prices run first because every other dataset joins
//! against them; a gold failure aborts the remaining steps.

use crate::core::config::AppConfig;
use crate::output;
use crate::ui;
use crate::wages::WageKind;
use crate::{gold, property, stocks, wages};
use anyhow::{Result, bail};
use comfy_table::Cell;
use std::time::Instant;
use tracing::{error, info};

struct StepResult {
    name: &'static str,
    ok: bool,
}

pub async fn run(config: &AppConfig, skip_checks: bool) -> Result<()> {
    let started = Instant::now();
    info!(
        "Starting full data update into {}",
        config.data_dir.display()
    );

    let mut steps: Vec<StepResult> = Vec::new();

    let yearly_ok = run_step(
        "Gold prices (yearly)",
        gold::update_history(config, None, false, None).await,
        &mut steps,
    );
    if yearly_ok && !skip_checks {
        output::validate_series_file(&config.gold_yearly_path(), &["year", "price"]);
    }

    let monthly_ok = run_step(
        "Gold prices (monthly)",
        gold::update_history(config, None, true, None).await,
        &mut steps,
    );
    if monthly_ok && !skip_checks {
        output::validate_series_file(&config.gold_monthly_path(), &["year", "month", "price"]);
    }

    if !(yearly_ok && monthly_ok) {
        print_summary(&steps, started);
        bail!("Primary data (gold prices) failed - remaining pipelines skipped");
    }

    let mut all_ok = true;

    all_ok &= run_step(
        "Warsaw m2 prices",
        property::refresh(config, None).await,
        &mut steps,
    );
    if !skip_checks {
        output::validate_series_file(&config.property_path(), &["year", "month", "priceM2_pln"]);
    }

    all_ok &= run_step(
        "Minimum wages",
        wages::refresh(config, WageKind::Minimum, None, None, None).await,
        &mut steps,
    );
    if !skip_checks {
        output::validate_series_file(&config.min_wages_path(), &["year", "wage", "price"]);
    }

    all_ok &= run_step(
        "Average wages",
        wages::refresh(config, WageKind::Average, None, None, None).await,
        &mut steps,
    );
    if !skip_checks {
        output::validate_series_file(&config.avg_wages_path(), &["year", "wage", "price"]);
    }

    all_ok &= run_step("Stock prices", stocks::refresh(config).await, &mut steps);

    all_ok &= run_step(
        "Update timestamp",
        output::write_stamp(&config.data_dir).map(|_| ()),
        &mut steps,
    );

    print_summary(&steps, started);
    if !all_ok {
        bail!("Some data pipelines failed");
    }
    println!(
        "{}",
        ui::style_text("All data updated successfully.", ui::StyleType::Success)
    );
    Ok(())
}

fn run_step(name: &'static str, result: Result<()>, steps: &mut Vec<StepResult>) -> bool {
    let ok = match result {
        Ok(()) => {
            info!("{} completed", name);
            true
        }
        Err(e) => {
            error!("{} failed: {:#}", name, e);
            false
        }
    };
    steps.push(StepResult { name, ok });
    ok
}

fn print_summary(steps: &[StepResult], started: Instant) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Step"), ui::header_cell("Result")]);
    for step in steps {
        table.add_row(vec![Cell::new(step.name), ui::status_cell(step.ok)]);
    }

    println!("\n{table}");
    println!("Elapsed: {:.1}s", started.elapsed().as_secs_f64());
}
