//! Terminal output formatter

use super::display_path;
use std::path::Path;
use threatcl_core::{Stats, ThreatModel};

pub fn format_model_table<'a>(
    models: impl IntoIterator<Item = &'a ThreatModel>,
    root: &Path,
) -> String {
    let rows: Vec<[String; 5]> = models
        .into_iter()
        .map(|m| {
            [
                m.name.clone(),
                m.author.clone(),
                m.threat_count().to_string(),
                m.control_count().to_string(),
                display_path(&m.source_file, root),
            ]
        })
        .collect();
    if rows.is_empty() {
        return "No threat models found\n".to_string();
    }

    let header = ["NAME", "AUTHOR", "THREATS", "CONTROLS", "FILE"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_row(&mut output, &header.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut output, row, &widths);
    }
    output
}

fn push_row(output: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    output.push_str(line.trim_end());
    output.push('\n');
}

pub fn format_model_detail(model: &ThreatModel, root: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("Name:        {}\n", model.name));
    out.push_str(&format!("Author:      {}\n", model.author));
    if let Some(status) = &model.status {
        out.push_str(&format!("Status:      {}\n", status));
    }
    out.push_str(&format!(
        "File:        {}\n",
        display_path(&model.source_file, root)
    ));
    if let Some(link) = &model.link {
        out.push_str(&format!("Link:        {}\n", link));
    }
    if let Some(link) = &model.diagram_link {
        out.push_str(&format!("Diagram:     {}\n", link));
    }
    if let Some(description) = &model.description {
        out.push_str(&format!("\n{}\n", description.trim()));
    }

    if let Some(attrs) = &model.attributes {
        out.push_str("\nAttributes:\n");
        out.push_str(&format!("  New initiative:  {}\n", attrs.new_initiative));
        out.push_str(&format!("  Internet facing: {}\n", attrs.internet_facing));
        out.push_str(&format!("  Size:            {}\n", attrs.initiative_size));
    }

    if !model.information_assets.is_empty() {
        out.push_str("\nInformation assets:\n");
        for asset in &model.information_assets {
            match &asset.information_classification {
                Some(class) => out.push_str(&format!("  - {} ({})\n", asset.name, class)),
                None => out.push_str(&format!("  - {}\n", asset.name)),
            }
        }
    }

    if !model.use_cases.is_empty() {
        out.push_str("\nUse cases:\n");
        for use_case in &model.use_cases {
            out.push_str(&format!("  - {}\n", use_case.description));
        }
    }

    if !model.exclusions.is_empty() {
        out.push_str("\nExclusions:\n");
        for exclusion in &model.exclusions {
            out.push_str(&format!("  - {}\n", exclusion.description));
        }
    }

    if !model.third_party_dependencies.is_empty() {
        out.push_str("\nThird-party dependencies:\n");
        for dep in &model.third_party_dependencies {
            out.push_str(&format!(
                "  - {} (uptime: {})\n",
                dep.name,
                dep.uptime_dependency.as_str()
            ));
        }
    }

    out.push_str(&format!(
        "\nThreats: {}  Controls: {} ({} implemented)\n",
        model.threat_count(),
        model.control_count(),
        model.implemented_control_count()
    ));
    for (i, threat) in model.threats.iter().enumerate() {
        let title = threat.name.as_deref().unwrap_or(&threat.description);
        out.push_str(&format!("  {}. {}\n", i + 1, title));
        if !threat.stride.is_empty() {
            out.push_str(&format!("     STRIDE:  {}\n", threat.stride.join(", ")));
        }
        if !threat.impacts.is_empty() {
            out.push_str(&format!("     Impacts: {}\n", threat.impacts.join(", ")));
        }
        for control in &threat.controls {
            let mark = if control.implemented { "x" } else { " " };
            out.push_str(&format!("     [{}] {}\n", mark, control.name));
        }
    }
    out
}

pub fn format_stats(stats: &Stats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Threat models:   {}\n", stats.total_threat_models));
    out.push_str(&format!("Files:           {}\n", stats.total_files));
    out.push_str(&format!("Threats:         {}\n", stats.total_threats));
    out.push_str(&format!(
        "Controls:        {} ({} implemented)\n",
        stats.total_controls, stats.implemented_controls
    ));
    out.push_str(&format!("Assets:          {}\n", stats.total_information_assets));
    out.push_str(&format!("Use cases:       {}\n", stats.total_use_cases));
    out.push_str(&format!(
        "Dependencies:    {}\n",
        stats.total_third_party_dependencies
    ));
    out.push_str(&format!("Internet facing: {}\n", stats.internet_facing_models));

    for (title, counts) in [
        ("By author", &stats.by_author),
        ("By impact", &stats.by_impact),
        ("By STRIDE", &stats.by_stride),
    ] {
        if counts.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:\n"));
        for (key, count) in counts {
            out.push_str(&format!("  {key:<24} {count}\n"));
        }
    }
    out
}
