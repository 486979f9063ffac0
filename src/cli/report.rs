use colored::Colorize;
use comfy_table::{Cell, Table};

use super::FilterArgs;
use crate::error::{Result, SmartMedError};
use crate::filter::{apply_filters, FilterCriteria};
use crate::fmt::{money, number};
use crate::reports::{summarize, SalesSummary};
use crate::settings::{load_settings, Settings};

pub fn run(file: &str, filters: &FilterArgs, json: bool) -> Result<()> {
    let settings = load_settings();
    let table = super::load_table(file, &settings)?;
    let criteria = filters.criteria(&table)?;
    let view = apply_filters(&table, &criteria);
    let now = chrono::Local::now().naive_local();
    let summary = summarize(&view, now, &settings.summary_options());

    if json {
        let out = serde_json::to_string_pretty(&summary)
            .map_err(|e| SmartMedError::Other(format!("Could not encode summary: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    print_summary(&summary, &criteria, &settings);
    Ok(())
}

fn filter_label(criteria: &FilterCriteria) -> String {
    let mut parts = Vec::new();
    if let Some(range) = &criteria.date_range {
        parts.push(format!("{} to {}", range.start, range.end));
    }
    if let Some(c) = &criteria.customer {
        parts.push(format!("customer = {c}"));
    }
    if let Some(p) = &criteria.product {
        parts.push(format!("product = {p}"));
    }
    if parts.is_empty() {
        "all records".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn print_summary(summary: &SalesSummary, criteria: &FilterCriteria, settings: &Settings) {
    let sym = settings.currency_symbol.as_str();

    println!(
        "Showing {} records after applying filters ({}).\n",
        summary.record_count.to_string().bold(),
        filter_label(criteria)
    );

    let mut kpis = Table::new();
    kpis.set_header(vec!["Metric", "Value"]);
    kpis.add_row(vec![Cell::new("Total Sales"), Cell::new(money(summary.total_amount, sym))]);
    if let Some(qty) = summary.total_qty {
        kpis.add_row(vec![Cell::new("Quantity Sold"), Cell::new(number(qty))]);
    }
    let avg = summary
        .avg_discount
        .map(|d| money(d, sym))
        .unwrap_or_else(|| "-".to_string());
    kpis.add_row(vec![Cell::new("Avg Discount"), Cell::new(avg)]);
    if let Some(n) = summary.expiring_batches {
        let value = if n > 0 {
            n.to_string().red().bold()
        } else {
            n.to_string().normal()
        };
        kpis.add_row(vec![Cell::new("Expiring Batches"), Cell::new(value)]);
    }
    println!("{}\n{kpis}", "Sales Overview".bold());

    if !summary.monthly_trend.is_empty() {
        let mut trend = Table::new();
        trend.set_header(vec!["Month", "Sales"]);
        for m in &summary.monthly_trend {
            trend.add_row(vec![Cell::new(&m.label), Cell::new(money(m.amount, sym))]);
        }
        println!("\n{}\n{trend}", "Monthly Sales Trend".bold());
    }

    if !summary.top_customers.is_empty() {
        let mut customers = Table::new();
        customers.set_header(vec!["Customer", "Revenue"]);
        for c in &summary.top_customers {
            customers.add_row(vec![Cell::new(&c.name), Cell::new(money(c.total, sym))]);
        }
        println!(
            "\n{}\n{customers}",
            format!("Top {} Customers by Revenue", settings.top_n).bold()
        );
    }

    if let Some(products) = summary.top_products.as_ref().filter(|p| !p.is_empty()) {
        let mut table = Table::new();
        table.set_header(vec!["Product", "Quantity"]);
        for p in products {
            table.add_row(vec![Cell::new(&p.name), Cell::new(number(p.total as i64))]);
        }
        println!(
            "\n{}\n{table}",
            format!("Top {} Products by Quantity Sold", settings.top_n).bold()
        );
    }

    let mut buckets = Table::new();
    buckets.set_header(vec!["Discount Level", "Lines", "Sales"]);
    for b in &summary.discount_buckets {
        buckets.add_row(vec![
            Cell::new(format!("{} ({sym}{})", b.level.name(), b.level.range())),
            Cell::new(b.count),
            Cell::new(money(b.amount, sym)),
        ]);
    }
    println!("\n{}\n{buckets}", "Discount Effectiveness".bold());

    if let Some(groups) = &summary.expiring_soon {
        let heading = format!(
            "Products Nearing Expiry (Next {} Days)",
            settings.expiry_window_days
        );
        if groups.is_empty() {
            println!(
                "\n{}\nNo stock expiring in the next {} days.",
                heading.bold(),
                settings.expiry_window_days
            );
        } else {
            let mut table = Table::new();
            table.set_header(vec!["Expiry", "Product", "Value"]);
            for g in groups {
                table.add_row(vec![
                    Cell::new(g.exp_date),
                    Cell::new(&g.product),
                    Cell::new(money(g.amount, sym)),
                ]);
            }
            println!("\n{}\n{table}", heading.red().bold());
        }
    }
}
