use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use cohort_ai::discovery::{Message, Suggestion};
use cohort_ai::{HarmonisationReport, SimilarityMatches};
use cohort_catalog::{Catalog, CohortGroup};
use cohort_ingest::FileFailure;
use cohort_model::Variable;

/// Values longer than this are cut in the browse table.
const MAX_VALUES_WIDTH: usize = 60;

pub fn print_cohorts(catalog: &Catalog) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Cohort"),
        header_cell("Variables"),
        header_cell("Tables"),
        header_cell("Uploaded"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for cohort in catalog.cohorts() {
        table.add_row(vec![
            cohort_cell(&cohort.name),
            Cell::new(cohort.variable_count),
            Cell::new(cohort.tables.join(", ")),
            dim_cell(cohort.upload_date),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(catalog.variable_count()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");
}

pub fn print_failures(failures: &[FileFailure]) {
    if failures.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("File"), header_cell("Error")]);
    apply_table_style(&mut table);
    for failure in failures {
        table.add_row(vec![
            Cell::new(&failure.file).fg(Color::Red),
            Cell::new(failure.error.to_string()),
        ]);
    }
    eprintln!("Files that failed to load:");
    eprintln!("{table}");
}

pub fn print_variables(groups: &[CohortGroup<'_>]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Cohort"),
        header_cell("Table"),
        header_cell("Variable"),
        header_cell("Description"),
        header_cell("Type"),
        header_cell("Complete %"),
        header_cell("Values"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 5, CellAlignment::Right);
    let mut total = 0usize;
    for group in groups {
        for table_group in &group.tables {
            for variable in &table_group.variables {
                total += 1;
                table.add_row(vec![
                    cohort_cell(group.cohort),
                    Cell::new(table_group.table),
                    Cell::new(&variable.variable_name).add_attribute(Attribute::Bold),
                    Cell::new(&variable.variable_description),
                    dim_cell(&variable.datatype),
                    completeness_cell(variable.completeness),
                    values_cell(variable),
                ]);
            }
        }
    }
    println!("{table}");
    println!("{total} variable(s) in {} cohort(s)", groups.len());
}

pub fn print_reply(message: &Message, resolved: &[(&Suggestion, &Variable)]) {
    println!("{}", message.content);
    if message.suggestions.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Variable"),
        header_cell("Cohort"),
        header_cell("Table"),
        header_cell("Score"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for suggestion in &message.suggestions {
        let table_name = resolved
            .iter()
            .find(|(s, _)| std::ptr::eq(*s, suggestion))
            .map(|(_, v)| v.table_name.as_str());
        table.add_row(vec![
            Cell::new(&suggestion.variable_name).add_attribute(Attribute::Bold),
            cohort_cell(&suggestion.cohort_name),
            match table_name {
                Some(name) => Cell::new(name),
                None => dim_cell("not in catalog"),
            },
            Cell::new(format_score(suggestion.score)),
            Cell::new(&suggestion.reason),
        ]);
    }
    println!();
    println!("Suggested variables:");
    println!("{table}");
}

pub fn print_similar(source: &Variable, matches: &SimilarityMatches) {
    println!(
        "Matches for {} ({}) from {} candidate(s){}",
        source.variable_name,
        source.cohort_name,
        matches.candidates_offered,
        if matches.truncated {
            ", candidate list truncated"
        } else {
            ""
        }
    );
    if matches.results.is_empty() {
        println!("No similar variables found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Variable"),
        header_cell("Cohort"),
        header_cell("Table"),
        header_cell("Score"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for result in &matches.results {
        table.add_row(vec![
            Cell::new(&result.variable.variable_name).add_attribute(Attribute::Bold),
            cohort_cell(&result.variable.cohort_name),
            Cell::new(&result.variable.table_name),
            Cell::new(format_score(result.similarity_score)).fg(Color::Green),
            Cell::new(&result.reason),
        ]);
    }
    println!("{table}");
}

pub fn print_harmonisation(report: &HarmonisationReport) {
    if report.groups.is_empty() {
        println!("No cross-cohort groups proposed.");
    }
    for group in &report.groups {
        println!();
        println!("{}: {}", group.harmonised_name, group.description);
        if !group.standardized_values.is_empty() {
            println!("Standardized values: {}", group.standardized_values);
        }
        if !group.reasoning.is_empty() {
            println!("Reasoning: {}", group.reasoning);
        }
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Variable"),
            header_cell("Cohort"),
            header_cell("Mapping"),
        ]);
        apply_table_style(&mut table);
        for member in &group.variables {
            table.add_row(vec![
                Cell::new(&member.original_name).add_attribute(Attribute::Bold),
                cohort_cell(&member.cohort),
                Cell::new(&member.mapping),
            ]);
        }
        println!("{table}");
    }
    if report.dropped > 0 {
        println!();
        println!(
            "{} proposed group(s) ignored: unreadable, too few variables or a single cohort",
            report.dropped
        );
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 7 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(14)),
            ColumnConstraint::UpperBoundary(Width::Fixed(14)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
        ]);
    }
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

fn cohort_cell(name: &str) -> Cell {
    Cell::new(name).fg(Color::Blue)
}

fn completeness_cell(completeness: f64) -> Cell {
    let color = if completeness >= 90.0 {
        Color::Green
    } else if completeness >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{completeness:.1}")).fg(color)
}

fn values_cell(variable: &Variable) -> Cell {
    let text = if variable.is_categorical() {
        variable.sorted_values().join(", ")
    } else {
        variable.values.clone()
    };
    if text.is_empty() {
        return dim_cell("-");
    }
    Cell::new(truncate(&text, MAX_VALUES_WIDTH))
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
