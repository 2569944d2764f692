use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use gen2to3_cli::pipeline::{ConvertResult, TranslateOutcome};
use gen2to3_core::FailureStage;
use gen2to3_standards::RuleCatalog;

pub fn print_convert_summary(result: &ConvertResult) {
    let report = &result.report;
    println!("Source: {}", result.source.display());
    println!("Destination: {}", result.dest.display());
    println!("Registry: {}", result.registry.display());
    println!("Instrument: {}", result.instrument);
    println!("Default run: {}", result.default_run);
    if report.dry_run {
        println!("Dry run: nothing was written");
    }
    if report.cancelled {
        println!("Cancelled before the walk finished");
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset type"),
        header_cell("Translated"),
        header_cell(if report.dry_run { "Checked" } else { "Written" }),
        header_cell("Failed"),
        header_cell("Skipped"),
    ]);
    apply_summary_table_style(&mut table);
    for column in 1..5 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for (dataset_type, counts) in &report.by_dataset_type {
        table.add_row(vec![
            Cell::new(dataset_type).fg(Color::Blue),
            count_cell(counts.translated, Color::Green),
            count_cell(counts.written, Color::Green),
            count_cell(counts.failed, Color::Red),
            count_cell(counts.skipped, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(report.translated).add_attribute(Attribute::Bold),
        Cell::new(report.written).add_attribute(Attribute::Bold),
        count_cell(report.failed(), Color::Red).add_attribute(Attribute::Bold),
        count_cell(report.skipped, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if !report.by_run.is_empty() {
        let mut runs = Table::new();
        runs.set_header(vec![header_cell("Run"), header_cell("Datasets")]);
        apply_table_style(&mut runs);
        align_column(&mut runs, 1, CellAlignment::Right);
        for (run, count) in &report.by_run {
            runs.add_row(vec![Cell::new(run), Cell::new(count)]);
        }
        println!("{runs}");
    }

    let walk = result.walk;
    println!(
        "Files: {} seen, {} matched a template, {} ignored",
        walk.files, walk.matched, walk.unmatched
    );
    if walk.skipped_links > 0 {
        println!("Directory links not followed: {}", walk.skipped_links);
    }

    print_failure_table(result);
}

fn print_failure_table(result: &ConvertResult) {
    let failures = &result.report.failures;
    if failures.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Dataset type"),
        header_cell("Data ID"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for failure in failures {
        table.add_row(vec![
            stage_cell(failure.stage),
            failure
                .dataset_type
                .as_ref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            failure
                .data_id
                .as_ref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&failure.message),
        ]);
    }
    eprintln!("Failures:");
    eprintln!("{table}");
}

pub fn print_translation(outcome: &TranslateOutcome, explain: bool) {
    println!("{}", outcome.record);
    match &outcome.result {
        Ok(data_id) => println!("=> {data_id}"),
        Err(error) => println!("=> {} error: {error}", error.kind().as_str()),
    }
    if !explain {
        return;
    }
    let Some(trace) = &outcome.trace else {
        return;
    };

    let rules = outcome.rules.rules();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Rule"),
        header_cell("Handler"),
        header_cell("Value"),
        header_cell("Consumed"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    for (step, fired) in trace.fired.iter().enumerate() {
        let rule = &rules[fired.rule_index];
        let value = if fired.newly_set {
            Cell::new(format!("{} = {}", fired.dimension, fired.value))
        } else {
            dim_cell(format!("{} = {} (unchanged)", fired.dimension, fired.value))
        };
        table.add_row(vec![
            Cell::new(step + 1),
            Cell::new(&rule.name).fg(Color::Blue),
            Cell::new(&rule.handler),
            value,
            Cell::new(fired.consumed_count),
        ]);
    }
    println!("{table}");

    let consumed: Vec<&str> = trace.consumed.iter().map(String::as_str).collect();
    let unconsumed: Vec<&str> = outcome
        .record
        .data_id
        .keys()
        .filter(|key| !trace.consumed.contains(*key))
        .collect();
    println!("Consumed: {}", join_or_dash(&consumed));
    println!("Not consumed: {}", join_or_dash(&unconsumed));
}

pub fn print_rules(catalog: &RuleCatalog) {
    println!("Catalog: {}", catalog.origins().join(" + "));
    if let Some(instrument) = catalog.instrument() {
        println!("Instrument: {instrument}");
    }

    let mut rules = Table::new();
    rules.set_header(vec![
        header_cell("#"),
        header_cell("Rule"),
        header_cell("Matches"),
        header_cell("Handler"),
        header_cell("Consumes"),
    ]);
    apply_table_style(&mut rules);
    align_column(&mut rules, 0, CellAlignment::Right);
    for (index, rule) in catalog.rule_set().rules().iter().enumerate() {
        let consumes: Vec<&str> = rule.consumes.iter().map(String::as_str).collect();
        rules.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&rule.name).fg(Color::Blue),
            Cell::new(&rule.predicate),
            Cell::new(&rule.handler),
            Cell::new(join_or_dash(&consumes)),
        ]);
    }
    println!("{rules}");

    let mut types = Table::new();
    types.set_header(vec![
        header_cell("Dataset type"),
        header_cell("Dimensions"),
        header_cell("Run"),
        header_cell("Template"),
    ]);
    apply_table_style(&mut types);
    for def in catalog.dataset_types() {
        let dimensions: Vec<&str> = def.dimensions.iter().map(String::as_str).collect();
        let name = if catalog.is_ignored(&def.name) {
            dim_cell(format!("{} (ignored)", def.name))
        } else {
            Cell::new(&def.name).fg(Color::Blue)
        };
        types.add_row(vec![
            name,
            Cell::new(join_or_dash(&dimensions)),
            catalog
                .run_for(&def.name)
                .map_or_else(|| dim_cell("default"), Cell::new),
            def.template
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{types}");
}

fn join_or_dash(items: &[&str]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn stage_cell(stage: FailureStage) -> Cell {
    let color = match stage {
        FailureStage::Walk => Color::Magenta,
        FailureStage::Conflict => Color::Red,
        FailureStage::Unresolved => Color::Yellow,
        FailureStage::Write => Color::DarkRed,
    };
    Cell::new(stage.as_str())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
