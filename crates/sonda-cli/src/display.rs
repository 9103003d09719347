//! Terminal rendering for company cards and the question catalog.
//!
//! Records are printed as vertical cards grouped into sections, with
//! empty sections and unset fields skipped entirely.

use sonda_core::{Catalog, CompanyRecord, Question, Section};

// ── Company card ──

/// Print a resolved company record as a grouped card.
pub fn print_company_card(record: &CompanyRecord) {
    println!("=== {} ===", record.legal_name);
    if let Some(trade) = &record.trade_name {
        println!("{trade}");
    }
    if record.synthetic {
        println!();
        println!("!! synthetic sample data ({}), not a registry record", record.source);
    }

    println!();
    println!("Identity");
    field("cnpj", Some(&record.cnpj.formatted()));
    field("registration status", record.registration_status.as_deref());
    field("size", record.size_class.as_deref());
    field("founded", record.founded.as_deref());
    field("legal nature", record.legal_nature.as_deref());
    field("share capital", record.share_capital.as_deref());
    field("source", Some(&record.source));

    let has_contact = record.phone.is_some() || record.email.is_some() || record.address.is_some();
    if has_contact {
        println!();
        println!("Address");
        if let Some(address) = &record.address {
            let mut line = address.street.clone();
            if !address.number.is_empty() {
                line = format!("{line}, {}", address.number);
            }
            if let Some(complement) = &address.complement {
                line = format!("{line} {complement}");
            }
            field("address", Some(&line));
            field("district", Some(&address.district));
            field("city", Some(&format!("{} / {}", address.city, address.state)));
            field("postal code", Some(&address.postal_code));
        }
        field("phone", record.phone.as_deref());
        field("email", record.email.as_deref());
    }

    if !record.primary_activities.is_empty() || !record.secondary_activities.is_empty() {
        println!();
        println!("Activities");
        for activity in &record.primary_activities {
            println!("  {:<20} {} {}", "primary", activity.code, activity.description);
        }
        for activity in &record.secondary_activities {
            println!("  {:<20} {} {}", "secondary", activity.code, activity.description);
        }
    }

    if !record.shareholders.is_empty() {
        println!();
        println!("Ownership");
        for shareholder in &record.shareholders {
            println!("  {:<20} {}", shareholder.role, shareholder.name);
        }
    }
}

/// Print one labelled row, skipping unset or blank values.
fn field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            println!("  {:<20} {}", label, value);
        }
    }
}

// ── Catalog ──

/// Print the one-line-per-section catalog summary.
pub fn print_catalog_summary(catalog: &Catalog) {
    let required = catalog.questions().iter().filter(|q| q.required).count();
    println!(
        "{} sections, {} questions ({} required)",
        catalog.sections().len(),
        catalog.total_questions(),
        required
    );
    println!();
    for section in catalog.sections() {
        let count = catalog.questions_in_section(section.id).count();
        println!(
            "{:>4}. {:<36} {:>3} questions  [{}]",
            section.id,
            section.title,
            count,
            section.priority.as_str()
        );
    }
}

/// Print one section with its full question list.
pub fn print_section(section: &Section, questions: &[&Question]) {
    println!("=== {}. {} ===", section.id, section.title);
    field("suggested role", Some(&section.suggested_role));
    field("department", Some(&section.department));
    field("priority", Some(section.priority.as_str()));
    println!();
    for question in questions {
        println!("{:>4}. [{}] {}", question.id, question.kind.as_str(), question.text);
        for option in &question.options {
            println!("        - {option}");
        }
    }
}
